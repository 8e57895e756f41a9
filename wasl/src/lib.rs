//! # Wasl: dependency injection container for Rust
//!
//! Contracts are registered with a lifetime and resolved lazily through
//! their declared dependencies. Singletons live in the root container,
//! scoped instances live in the [`Scope`] that built them, and transients
//! are built on every resolve. Disposing a scope releases its instances
//! newest first.
//!
//! ```rust
//! use std::sync::Arc;
//! use wasl::prelude::*;
//! use wasl::Injectable;
//!
//! #[derive(Default)]
//! struct Settings {
//!     greeting: String,
//! }
//!
//! #[derive(Injectable)]
//! struct Greeter {
//!     settings: Arc<Settings>,
//! }
//!
//! let container = Container::builder()
//!     .instance(Arc::new(Settings { greeting: "hello".into() }))
//!     .scoped::<Greeter>()
//!     .build()?;
//!
//! let scope = container.create_scope()?;
//! let greeter = scope.resolve::<Greeter>()?;
//! assert_eq!(greeter.settings.greeting, "hello");
//! # Ok::<(), WaslError>(())
//! ```

pub use wasl_container::*;
pub use wasl_derive::*;
pub use wasl_support;
