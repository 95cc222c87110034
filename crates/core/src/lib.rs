//! Core types and utilities for themegate
//!
//! This crate provides the foundation types shared by every other crate:
//! the base error type and cached platform detection.

pub mod error;
pub mod platform;

pub use error::{Error, Result};
