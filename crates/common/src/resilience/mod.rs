//! Resilience patterns for transient failures
//!
//! Only retry/backoff lives here. The decision of *whether* an error is
//! retryable belongs to the caller (the domain error knows that); this module
//! answers *how long* to wait and *how many* times.

pub mod backoff;

pub use backoff::{BackoffStrategy, RetryDecision, RetryPolicy, RetryPolicyError};
