//! ERP gateway adapter

pub mod client;
pub mod errors;

pub use client::ErpClient;
pub use errors::{ErpError, ErpErrorCategory};
