use std::collections::HashSet;
use tracing::info;

use crate::{
    command::Command,
    error::{Error, Result},
    rule::{self, BusinessRule, Verdict},
};

pub const UPGRADE: &str = "upgrade";
pub const DOWNGRADE: &str = "downgrade";

/// Assembles a [`MigrationProcess`]. Commands and rules may only be added
/// here, [`ProcessBuilder::build`] freezes them.
pub struct ProcessBuilder<C> {
    name: String,
    commands: Vec<Box<dyn Command<C>>>,
    rules: Vec<Box<dyn BusinessRule<C>>>,
}

impl<C> Clone for ProcessBuilder<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            commands: self.commands.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<C> ProcessBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn upgrade() -> Self {
        Self::new(UPGRADE)
    }

    pub fn downgrade() -> Self {
        Self::new(DOWNGRADE)
    }

    pub fn command(mut self, command: impl Command<C> + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn commands(mut self, commands: Vec<Box<dyn Command<C>>>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Appends a rule. Rules are evaluated in the order they are added, so a
    /// rule must be added after every rule it depends on.
    pub fn add_rule(mut self, rule: impl BusinessRule<C> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Freezes the process for `migration_version`.
    ///
    /// Fails with [`Error::RuleDependency`] when a rule depends on a rule that
    /// is not added before it.
    pub fn build(self, migration_version: u64) -> Result<MigrationProcess<C>> {
        let mut seen = HashSet::new();

        for rule in self.rules.iter() {
            let name = rule.name();

            if let Some(dependency) = rule
                .depends_on()
                .iter()
                .find(|dependency| !seen.contains(*dependency))
            {
                return Err(Error::RuleDependency {
                    rule: name,
                    dependency: dependency.to_owned(),
                });
            }

            seen.insert(name);
        }

        Ok(MigrationProcess {
            name: self.name,
            commands: self.commands,
            migration_version,
            rules: self.rules,
        })
    }
}

/// One direction of a migration: commands gated by business rules.
pub struct MigrationProcess<C> {
    name: String,
    commands: Vec<Box<dyn Command<C>>>,
    migration_version: u64,
    rules: Vec<Box<dyn BusinessRule<C>>>,
}

impl<C> Clone for MigrationProcess<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            commands: self.commands.clone(),
            migration_version: self.migration_version,
            rules: self.rules.clone(),
        }
    }
}

impl<C> MigrationProcess<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Box<dyn Command<C>>] {
        &self.commands
    }

    pub fn migration_version(&self) -> u64 {
        self.migration_version
    }

    pub fn rules(&self) -> &[Box<dyn BusinessRule<C>>] {
        &self.rules
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Runs the business rules. A process without rules is clear without
    /// touching the client.
    pub async fn validate(&self, client: &C) -> Result<Verdict> {
        if !self.has_rules() {
            return Ok(Verdict::Clear);
        }

        info!(
            "Starting validation of {} process with version {}...",
            self.name, self.migration_version
        );

        rule::evaluate(&self.rules, client).await
    }
}
