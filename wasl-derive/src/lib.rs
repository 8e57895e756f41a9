//! Derive macros for Wasl.
//!
//! Depend on the `wasl` facade rather than on this crate directly: the
//! generated code refers to `::wasl` unless told otherwise with
//! `#[injectable(crate = "...")]`.

pub use wasl_macros::Injectable;
