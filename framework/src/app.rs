//! Application builder and CLI
//!
//! ```rust,ignore
//! use campus::Application;
//!
//! #[tokio::main]
//! async fn main() {
//!     Application::new()
//!         .config(config::register_all)
//!         .bootstrap(bootstrap::register)
//!         .routes(routes::register)
//!         .migrations::<migrations::Migrator>()
//!         .seeder(seeders::run)
//!         .run()
//!         .await;
//! }
//! ```

use crate::database::DB;
use crate::error::FrameworkError;
use crate::logging::init_tracing;
use crate::queue::{self, Worker};
use crate::{Config, Router, Server};
use clap::{Parser, Subcommand};
use sea_orm_migration::prelude::*;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus school management server and utilities")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default command)
    Serve {
        /// Skip running migrations on startup
        #[arg(long)]
        no_migrate: bool,
    },
    /// Run pending database migrations
    Migrate,
    /// Show migration status
    #[command(name = "migrate:status")]
    MigrateStatus,
    /// Rollback the last migration(s)
    #[command(name = "migrate:rollback")]
    MigrateRollback {
        #[arg(default_value = "1")]
        steps: u32,
    },
    /// Drop all tables and re-run all migrations
    #[command(name = "migrate:fresh")]
    MigrateFresh,
    /// Process queued jobs until stopped
    #[command(name = "queue:work")]
    QueueWork,
    /// Put a failed job back on the queue
    #[command(name = "queue:retry")]
    QueueRetry { id: i64 },
    /// Seed demo data
    #[command(name = "db:seed")]
    DbSeed,
}

type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type BootstrapFn = Box<dyn FnOnce() -> BoxedFuture<()> + Send>;
type RoutesFn = Box<dyn FnOnce() -> Router + Send>;
type SeederFn = Box<dyn FnOnce() -> BoxedFuture<Result<(), FrameworkError>> + Send>;

pub struct Application<M = NoMigrator>
where
    M: MigratorTrait,
{
    config_fn: Option<Box<dyn FnOnce()>>,
    bootstrap_fn: Option<BootstrapFn>,
    routes_fn: Option<RoutesFn>,
    seeder_fn: Option<SeederFn>,
    _migrator: std::marker::PhantomData<M>,
}

/// Placeholder type for when no migrator is configured
pub struct NoMigrator;

impl MigratorTrait for NoMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![]
    }
}

impl Application<NoMigrator> {
    pub fn new() -> Self {
        Application {
            config_fn: None,
            bootstrap_fn: None,
            routes_fn: None,
            seeder_fn: None,
            _migrator: std::marker::PhantomData,
        }
    }
}

impl Default for Application<NoMigrator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Application<M>
where
    M: MigratorTrait,
{
    /// Register application configs; runs right after `.env` loading
    pub fn config<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.config_fn = Some(Box::new(f));
        self
    }

    /// Register services and global middleware; runs once the database is up
    pub fn bootstrap<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.bootstrap_fn = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub fn routes<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Router + Send + 'static,
    {
        self.routes_fn = Some(Box::new(f));
        self
    }

    /// Seeder run by `db:seed`
    pub fn seeder<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), FrameworkError>> + Send + 'static,
    {
        self.seeder_fn = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub fn migrations<NewM>(self) -> Application<NewM>
    where
        NewM: MigratorTrait,
    {
        Application {
            config_fn: self.config_fn,
            bootstrap_fn: self.bootstrap_fn,
            routes_fn: self.routes_fn,
            seeder_fn: self.seeder_fn,
            _migrator: std::marker::PhantomData,
        }
    }

    /// Parse the command line and run the command; exits 1 on failure
    pub async fn run(self) {
        let cli = Cli::parse();
        init_tracing();
        let environment = Config::init(Path::new("."));
        tracing::debug!(?environment, "configuration loaded");

        if let Err(err) = self.execute(cli.command).await {
            tracing::error!(error = %err, "command failed");
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }

    async fn execute(self, command: Option<Commands>) -> Result<(), FrameworkError> {
        let Application {
            config_fn,
            bootstrap_fn,
            routes_fn,
            seeder_fn,
            _migrator,
        } = self;

        if let Some(config_fn) = config_fn {
            config_fn();
        }
        DB::init().await?;
        let db = DB::connection()?;

        match command.unwrap_or(Commands::Serve { no_migrate: false }) {
            Commands::Serve { no_migrate } => {
                if !no_migrate {
                    M::up(db.inner(), None).await?;
                }
                if let Some(bootstrap_fn) = bootstrap_fn {
                    bootstrap_fn().await;
                }
                let router = routes_fn.map(|f| f()).unwrap_or_default();
                Server::from_config(router)
                    .run()
                    .await
                    .map_err(|e| FrameworkError::internal(e.to_string()))
            }
            Commands::Migrate => {
                M::up(db.inner(), None).await?;
                println!("Migrations completed successfully!");
                Ok(())
            }
            Commands::MigrateStatus => {
                M::status(db.inner()).await?;
                Ok(())
            }
            Commands::MigrateRollback { steps } => {
                M::down(db.inner(), Some(steps)).await?;
                println!("Rolled back {} migration(s).", steps);
                Ok(())
            }
            Commands::MigrateFresh => {
                tracing::warn!("dropping all tables");
                M::fresh(db.inner()).await?;
                println!("Database refreshed successfully!");
                Ok(())
            }
            Commands::QueueWork => {
                if let Some(bootstrap_fn) = bootstrap_fn {
                    bootstrap_fn().await;
                }
                Worker::new().run().await
            }
            Commands::QueueRetry { id } => {
                queue::retry(id).await?;
                println!("Job {} queued for retry.", id);
                Ok(())
            }
            Commands::DbSeed => {
                if let Some(bootstrap_fn) = bootstrap_fn {
                    bootstrap_fn().await;
                }
                match seeder_fn {
                    Some(seed) => {
                        seed().await?;
                        println!("Database seeded.");
                    }
                    None => println!("No seeder registered."),
                }
                Ok(())
            }
        }
    }
}
