//! Common utilities shared across ErpSync crates.
//!
//! - [`resilience`]: retry policy and backoff strategies used by the paging
//!   loop and the ERP HTTP client
//! - [`time`]: wall-clock abstraction so scheduling decisions can be tested
//!   without real time passing

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;
pub mod time;
