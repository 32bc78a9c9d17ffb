//! Shared test helpers for `erpsync-core` integration tests.
//!
//! In-memory implementations of every core port plus record fixtures, so
//! the scheduling and reconciliation tests can focus on behaviour.

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;
