//! Property-based tests for the chain engine and record identity

mod retry_backoff;
