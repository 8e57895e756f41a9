//! # Wasl Support
//!
//! Shared utilities for the Wasl DI framework.
//!
//! This crate provides:
//! - Text rendering for resolution chains and error messages
//! - Type-name helpers shared between wasl crates

pub mod rendering;
