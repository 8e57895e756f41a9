use std::sync::Arc;

use wasl::Injectable;
use wasl::prelude::*;

#[derive(Injectable)]
struct Mailer;

#[derive(Injectable)]
struct Signup {
    mailer: Arc<Mailer>,
}

fn register_mail(registry: &Registry) {
    registry.register::<Mailer>(Lifetime::Singleton);
}

fn register_accounts(registry: &Registry) {
    registry.register::<Signup>(Lifetime::Scoped);
}

inventory::submit! {
    ModuleEntry::new("integration-mail", register_mail)
}

inventory::submit! {
    ModuleEntry::new("integration-accounts", register_accounts)
}

#[test]
fn discovered_modules_are_sorted_by_name() {
    let names: Vec<&str> = wasl::module::discovered_modules()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["integration-accounts", "integration-mail"]);
}

#[test]
fn discover_modules_wires_the_container() {
    let container = Container::builder()
        .options(ContainerOptions {
            validate_on_build: true,
            ..ContainerOptions::default()
        })
        .discover_modules()
        .build()
        .unwrap();

    let scope = container.create_scope().unwrap();
    let signup = scope.resolve::<Signup>().unwrap();
    assert!(Arc::ptr_eq(&signup.mailer, &container.resolve::<Mailer>().unwrap()));
}

struct AuditModule {
    prefix: &'static str,
}

struct AuditPrefix(&'static str);

impl Module for AuditModule {
    fn register(&self, registry: &Registry) {
        registry.register_instance(Arc::new(AuditPrefix(self.prefix)));
    }

    fn name(&self) -> &str {
        "audit"
    }
}

#[test]
fn hand_written_module_is_applied() {
    let container = Container::builder()
        .add_module(&AuditModule { prefix: "audit:" })
        .build()
        .unwrap();

    assert_eq!(container.resolve::<AuditPrefix>().unwrap().0, "audit:");
}

