//! Ordered, checksummed and rule-gated schema migrations for document databases.
//!
//! A migration is a versioned unit of schema change with two processes,
//! upgrade and downgrade. Each process is an ordered list of [`Command`]s gated
//! by [`BusinessRule`]s that are checked against the live database before any
//! command runs. Source content is hashed so an applied migration whose script
//! changed afterwards is reported as drift and blocked until re-baselined.
//!
//! # Features
//!
//! - **`memory`** - In-memory [`MemoryClient`] and store engine, for tests and demos
//!
//! # Usage
//!
//! ```rust,ignore
//! use runway::{
//!     ConfigBuilder, CreateCollection, DropCollection, MemoryClient, ProcessBuilder, Runway,
//!     Scripts, StartupHook, Store,
//! };
//!
//! let config = ConfigBuilder::new("app")
//!     .scripts_dir("migrations")
//!     .startup_hook(StartupHook::SyncScriptsWithStore)
//!     .build();
//!
//! // The catalogue must be rooted at the configured scripts_dir.
//! let mut scripts = Scripts::new(&config.scripts_dir);
//! scripts.add(
//!     scripts
//!         .module("create_users.rs")
//!         .with_description("users collection")
//!         .upgrade(ProcessBuilder::upgrade().command(CreateCollection::new("app", "users")))
//!         .downgrade(ProcessBuilder::downgrade().command(DropCollection::new("app", "users"))),
//! );
//!
//! let runway = Runway::new(config, MemoryClient::new(), Store::memory(), scripts)?;
//!
//! runway.startup().await?;
//! runway.upgrade_all().await?;
//! ```

#![forbid(unsafe_code)]

mod app;
mod auditlog;
mod checksum;
mod client;
mod command;
mod config;
mod error;
mod filename;
mod hook;
mod migration;
mod module;
mod process;
mod rule;
mod scripts;
mod transaction;

pub use app::*;
pub use auditlog::*;
pub use checksum::*;
pub use client::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use filename::*;
pub use hook::*;
pub use migration::*;
pub use module::*;
pub use process::*;
pub use rule::*;
pub use runway_store::{Document, Store, ID_KEY};
pub use scripts::*;
pub use transaction::*;

/// Last path segment of `T`'s name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);

    name.rsplit("::").next().unwrap_or(name).to_owned()
}
