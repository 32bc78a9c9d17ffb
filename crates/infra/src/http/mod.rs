//! Retrying HTTP client shared by the ERP adapter

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
