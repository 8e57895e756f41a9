//! Modules: groups of related registrations.
//!
//! Modules group related contracts together, similar to Laravel's
//! ServiceProvider or DIshka's Provider class.
//!
//! # Examples
//! ```rust,ignore
//! struct MailModule;
//!
//! impl Module for MailModule {
//!     fn register(&self, registry: &Registry) {
//!         registry
//!             .register::<SmtpTransport>(Lifetime::Singleton)
//!             .register_as::<dyn Mailer, SmtpMailer>(Lifetime::Scoped, |m| m);
//!     }
//! }
//! ```
//!
//! A module can also announce itself at link time so that
//! [`ContainerBuilder::discover_modules`](crate::container::ContainerBuilder::discover_modules)
//! picks it up without being named:
//!
//! ```rust,ignore
//! fn register_mail(registry: &Registry) { /* ... */ }
//!
//! inventory::submit! { ModuleEntry::new("mail", register_mail) }
//! ```

use crate::registry::Registry;

/// A unit of registrations applied to a [`Registry`].
///
/// Split registrations by domain instead of one giant block:
///
/// ```rust,ignore
/// Container::builder()
///     .add_module(&StorageModule)
///     .add_module(&MailModule)
///     .build()?;
/// ```
pub trait Module: Send + Sync {
    /// Register contracts into the registry.
    fn register(&self, registry: &Registry);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A module registered at link time through [`inventory`].
#[derive(Debug)]
pub struct ModuleEntry {
    pub name: &'static str,
    pub register: fn(&Registry),
}

impl ModuleEntry {
    pub const fn new(name: &'static str, register: fn(&Registry)) -> Self {
        Self { name, register }
    }
}

impl Module for ModuleEntry {
    fn register(&self, registry: &Registry) {
        (self.register)(registry)
    }

    fn name(&self) -> &str {
        self.name
    }
}

inventory::collect!(ModuleEntry);

/// Every [`ModuleEntry`] submitted anywhere in the binary.
pub fn discovered_modules() -> Vec<&'static ModuleEntry> {
    let mut entries: Vec<&'static ModuleEntry> = Vec::new();
    for entry in inventory::iter::<ModuleEntry> {
        entries.push(entry);
    }
    entries.sort_by_key(|entry| entry.name);
    entries
}
