//! Hooks run by [`Runway::startup`](crate::Runway::startup) before any
//! migration is applied.
//!
//! Hooks with a priority run first, highest priority first. The others follow
//! in the order they were declared.

use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Reverse;
use tracing::info;

use crate::{app::Runway, error::Result, short_type_name};

#[async_trait]
pub trait MigrationHook<C>: Send + Sync {
    fn name(&self) -> String {
        short_type_name::<Self>()
    }

    async fn apply(&self, runway: &Runway<C>) -> Result<()>;
}

/// Records scripts the store does not know yet as pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncScriptsWithStore;

#[async_trait]
impl<C: Send + Sync> MigrationHook<C> for SyncScriptsWithStore {
    async fn apply(&self, runway: &Runway<C>) -> Result<()> {
        runway.sync_scripts().await?;

        Ok(())
    }
}

/// Accepts the current content of every drifted migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalculateMigrationsChecksum;

#[async_trait]
impl<C: Send + Sync> MigrationHook<C> for RecalculateMigrationsChecksum {
    async fn apply(&self, runway: &Runway<C>) -> Result<()> {
        runway.rebaseline_all().await?;

        Ok(())
    }
}

/// Fails startup on the first drifted migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiseIfMigrationChecksumMismatch;

#[async_trait]
impl<C: Send + Sync> MigrationHook<C> for RaiseIfMigrationChecksumMismatch {
    async fn apply(&self, runway: &Runway<C>) -> Result<()> {
        runway.verify_checksums().await
    }
}

/// Built-in hooks, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupHook {
    SyncScriptsWithStore,
    RecalculateMigrationsChecksum,
    RaiseIfMigrationChecksumMismatch,
}

impl StartupHook {
    pub fn hook<C: Send + Sync>(&self) -> Box<dyn MigrationHook<C>> {
        match self {
            StartupHook::SyncScriptsWithStore => Box::new(SyncScriptsWithStore),
            StartupHook::RecalculateMigrationsChecksum => Box::new(RecalculateMigrationsChecksum),
            StartupHook::RaiseIfMigrationChecksumMismatch => {
                Box::new(RaiseIfMigrationChecksumMismatch)
            }
        }
    }
}

/// A configured hook, either a bare name or `{ "hook": ..., "priority": ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StartupHookConfig {
    Plain(StartupHook),
    Prioritized { hook: StartupHook, priority: u32 },
}

impl StartupHookConfig {
    pub fn hook(&self) -> StartupHook {
        match self {
            StartupHookConfig::Plain(hook) => *hook,
            StartupHookConfig::Prioritized { hook, .. } => *hook,
        }
    }

    pub fn priority(&self) -> Option<u32> {
        match self {
            StartupHookConfig::Plain(_) => None,
            StartupHookConfig::Prioritized { priority, .. } => Some(*priority),
        }
    }
}

impl From<StartupHook> for StartupHookConfig {
    fn from(hook: StartupHook) -> Self {
        StartupHookConfig::Plain(hook)
    }
}

/// A hook with its optional priority.
pub struct PrioritizedHook<C> {
    pub priority: Option<u32>,
    pub hook: Box<dyn MigrationHook<C>>,
}

/// Sorts `hooks` into execution order.
pub fn startup_order<C>(hooks: &mut [&PrioritizedHook<C>]) {
    hooks.sort_by_key(|hook| Reverse(hook.priority));
}

pub(crate) async fn run_hooks<C>(runway: &Runway<C>, hooks: &[&PrioritizedHook<C>]) -> Result<()> {
    for prioritized in hooks {
        let name = prioritized.hook.name();
        info!("{}: applying startup hook {name}...", runway.config().app_name);

        prioritized.hook.apply(runway).await?;
    }

    Ok(())
}
