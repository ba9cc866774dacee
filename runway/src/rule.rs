//! Business rules gating a migration process.
//!
//! Rules are evaluated in the order they were added to the process. A rule
//! naming a dependency that was not evaluated earlier in the same pass, or that
//! was found broken, is reported broken without being checked.

use async_trait::async_trait;
use dyn_clone::DynClone;
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::{
    client::DocumentClient,
    error::{Error, Result},
    short_type_name,
};

#[async_trait]
pub trait BusinessRule<C>: DynClone + Send + Sync {
    /// Defaults to the implementing type's name.
    fn name(&self) -> String {
        short_type_name::<Self>()
    }

    /// Names of the rules that must pass before this one is checked.
    fn depends_on(&self) -> &[String] {
        &[]
    }

    fn is_independent(&self) -> bool {
        self.depends_on().is_empty()
    }

    /// `Ok(true)` when the rule is violated. An `Err` means the check itself
    /// could not be performed.
    async fn check_is_broken(&self, client: &C) -> anyhow::Result<bool>;

    fn render_broken_rule(&self) -> String {
        format!("Business rule {} is broken.", self.name())
    }
}

dyn_clone::clone_trait_object!(<C> BusinessRule<C>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokenCause {
    /// `check_is_broken` reported a violation.
    Violated,
    /// The named dependency was evaluated and found broken.
    Dependency(String),
    /// The named dependency was not evaluated before this rule.
    UnresolvedDependency(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenRule {
    pub name: String,
    pub diagnostic: String,
    pub cause: BrokenCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clear,
    Broken(Vec<BrokenRule>),
}

impl Verdict {
    pub fn is_clear(&self) -> bool {
        matches!(self, Verdict::Clear)
    }

    pub fn broken(&self) -> &[BrokenRule] {
        match self {
            Verdict::Clear => &[],
            Verdict::Broken(rules) => rules,
        }
    }
}

/// Evaluates `rules` in sequence order against `client`.
///
/// Every rule is visited so the verdict lists all broken rules, but
/// `check_is_broken` is only invoked for rules whose dependencies all passed.
/// The first infrastructure fault aborts the pass with
/// [`Error::RuleEvaluation`].
pub async fn evaluate<C>(rules: &[Box<dyn BusinessRule<C>>], client: &C) -> Result<Verdict> {
    let mut evaluated: HashMap<String, bool> = HashMap::new();
    let mut broken = Vec::new();

    for rule in rules {
        let name = rule.name();

        let unmet = rule
            .depends_on()
            .iter()
            .find_map(|dependency| match evaluated.get(dependency) {
                None => Some(BrokenCause::UnresolvedDependency(dependency.to_owned())),
                Some(true) => Some(BrokenCause::Dependency(dependency.to_owned())),
                Some(false) => None,
            });

        let cause = match unmet {
            Some(cause) => {
                warn!("{name} rule skipped, dependency not satisfied: {cause:?}");
                Some(cause)
            }
            None => {
                let is_broken = rule
                    .check_is_broken(client)
                    .await
                    .map_err(|source| Error::RuleEvaluation {
                        rule: name.to_owned(),
                        source,
                    })?;

                is_broken.then_some(BrokenCause::Violated)
            }
        };

        let is_broken = cause.is_some();
        *evaluated.entry(name.to_owned()).or_insert(false) |= is_broken;

        match cause {
            Some(cause) => {
                error!("{name} rule is broken");
                broken.push(BrokenRule {
                    diagnostic: rule.render_broken_rule(),
                    name,
                    cause,
                });
            }
            None => info!("{name} rule successfully passed"),
        }
    }

    if broken.is_empty() {
        Ok(Verdict::Clear)
    } else {
        Ok(Verdict::Broken(broken))
    }
}

/// Broken when `collection` does not exist in `database`.
#[derive(Debug, Clone)]
pub struct RequiredCollection {
    pub database: String,
    pub collection: String,
    name: Option<String>,
    depends_on: Vec<String>,
}

impl RequiredCollection {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            name: None,
            depends_on: Vec::new(),
        }
    }

    /// Overrides the type name, needed when one process checks several
    /// collections and other rules depend on a specific one.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn rule_name(&self) -> String {
        self.name.clone().unwrap_or_else(short_type_name::<Self>)
    }

    /// Requires `rule` to pass before this collection is checked.
    pub fn after(mut self, rule: impl Into<String>) -> Self {
        self.depends_on.push(rule.into());
        self
    }
}

#[async_trait]
impl<C: DocumentClient> BusinessRule<C> for RequiredCollection {
    fn name(&self) -> String {
        self.rule_name()
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    async fn check_is_broken(&self, client: &C) -> anyhow::Result<bool> {
        let names = client.list_collection_names(&self.database).await?;

        Ok(!names.contains(&self.collection))
    }

    fn render_broken_rule(&self) -> String {
        format!(
            "Business rule {} is broken. Collection '{}.{}' is not created.",
            self.rule_name(),
            self.database,
            self.collection
        )
    }
}
