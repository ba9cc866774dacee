use tracing::{debug, error, info};

use crate::{
    error::{Error, Result},
    migration::Migration,
    rule::Verdict,
};
use runway_store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    pub fn transaction_name(&self) -> &'static str {
        match self {
            Direction::Upgrade => "UpgradeTransaction",
            Direction::Downgrade => "DowngradeTransaction",
        }
    }

    /// Value of the applied flag once a transaction in this direction succeeds.
    pub fn applied_after(&self) -> bool {
        matches!(self, Direction::Upgrade)
    }
}

/// Runs one process of `migration` against `client` and records the outcome.
///
/// Rules are checked first, any broken rule aborts before the first command.
/// Commands run in order, the first failure aborts and leaves both the
/// migration and the store untouched.
pub async fn apply<C>(
    migration: &mut Migration<C>,
    direction: Direction,
    client: &C,
    store: &Store,
) -> Result<()> {
    {
        let process = migration.process(direction);

        if process.has_rules() {
            if let Verdict::Broken(broken) = process.validate(client).await? {
                error!(
                    "{} of migration {} with version {} blocked by {} broken rule(s)",
                    process.name(),
                    migration.name(),
                    migration.version(),
                    broken.len()
                );

                return Err(Error::RulesBroken {
                    name: migration.name().to_owned(),
                    version: migration.version(),
                    process: process.name().to_owned(),
                    broken,
                });
            }
        }

        for command in process.commands() {
            let command_name = command.name();
            debug!("Executing {command_name} of migration {}", migration.name());

            command
                .execute(client)
                .await
                .map_err(|source| Error::Command {
                    name: migration.name().to_owned(),
                    version: migration.version(),
                    command: command_name,
                    source,
                })?;
        }
    }

    migration.set_is_applied(direction.applied_after());
    store.upsert(migration.to_dict(true)).await?;

    info!(
        "{} of migration {} with version {} committed",
        direction.transaction_name(),
        migration.name(),
        migration.version()
    );

    Ok(())
}
