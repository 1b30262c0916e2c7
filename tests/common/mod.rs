//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - In-memory server fixtures
//! - Connected test clients
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use fixtures::*;
