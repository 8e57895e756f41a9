//! Basic example of the Wasl DI container.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use wasl::prelude::*;
use wasl::{BoxError, Injectable};

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

#[derive(Injectable)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
    debug: bool,
}

#[derive(Injectable)]
#[injectable(dispose)]
struct Database {
    config: Arc<Config>,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.config.database_url)
    }
}

impl Dispose for Database {
    fn dispose(&self) -> std::result::Result<(), BoxError> {
        self.logger.log("Closing database pool");
        Ok(())
    }
}

#[derive(Injectable)]
#[injectable(dispose)]
struct UserRepository {
    db: Arc<Database>,
    #[inject(default)]
    queries: AtomicUsize,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

impl Dispose for UserRepository {
    fn dispose(&self) -> std::result::Result<(), BoxError> {
        println!(
            "Request finished after {} queries",
            self.queries.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

#[derive(Injectable)]
struct UserService {
    repo: Arc<UserRepository>,
    logger: Arc<dyn Logger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("basic=info,wasl_container=debug")
        .init();

    let container = Container::builder()
        .options(ContainerOptions {
            validate_on_build: true,
            ..ContainerOptions::default()
        })
        // Config: an already-built singleton
        .instance(Arc::new(Config {
            database_url: "postgres://localhost/myapp".to_string(),
            debug: true,
        }))
        // Logger: singleton behind a trait
        .bind::<dyn Logger, ConsoleLogger>(Lifetime::Singleton, |l| l as Arc<dyn Logger>)
        // Database: singleton (depends on Config + Logger)
        .singleton::<Database>()
        // UserRepository: scoped (one per request)
        .scoped::<UserRepository>()
        // UserService: transient (new each time)
        .transient::<UserService>()
        .build()?;

    tracing::info!(?container, "container built");

    let config = container.resolve::<Config>()?;
    tracing::info!(database_url = %config.database_url, debug = config.debug, "config resolved");

    // === Create a scope (e.g., for an HTTP request) ===
    {
        let scope = container.create_scope()?;
        tracing::info!(scope = %scope.id(), "request started");

        let service = scope.resolve::<UserService>()?;
        println!("{}", service.get_user(42));

        // Same scope, same UserRepository
        let service2 = scope.resolve::<UserService>()?;
        println!("{}", service2.get_user(7));

        scope.dispose()?;
    }

    container.dispose()?;
    Ok(())
}
