use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auditlog::{AuditlogEntry, AuditlogJournal, HistoryArgs},
    checksum::{detect_drift, Drift},
    config::RunwayConfig,
    error::{Error, Result},
    hook::{run_hooks, startup_order, MigrationHook, PrioritizedHook},
    migration::{Migration, MigrationReadModel},
    scripts::{LoadFailure, Loaded, Scripts},
    transaction::{apply, Direction},
};
use runway_store::Store;

/// Migrations runnable in one direction, in execution order.
struct Queue<C> {
    migrations: Vec<Migration<C>>,
    /// Unloaded migration every queued migration past it waits for.
    blocker: Option<LoadFailure>,
}

impl<C> Queue<C> {
    fn is_blocked(&self, migration: &Migration<C>, direction: Direction) -> bool {
        self.blocker.as_ref().map_or(false, |blocker| match direction {
            Direction::Upgrade => migration.version() > blocker.version,
            Direction::Downgrade => migration.version() < blocker.version,
        })
    }
}

/// Migration application bound to one database and one scripts catalogue.
///
/// Only one runner may operate on a given store at a time.
pub struct Runway<C> {
    config: RunwayConfig,
    client: C,
    store: Store,
    scripts: Scripts<C>,
    journal: Option<Box<dyn AuditlogJournal>>,
    hooks: Vec<PrioritizedHook<C>>,
    session_id: Uuid,
}

impl<C> Runway<C> {
    /// Fails when the config is invalid or `scripts` is not rooted at the
    /// configured `scripts_dir`.
    pub fn new(config: RunwayConfig, client: C, store: Store, scripts: Scripts<C>) -> Result<Self> {
        config.validate()?;

        if scripts.dir() != config.scripts_dir.as_path() {
            return Err(Error::ScriptsDir {
                configured: config.scripts_dir,
                catalogue: scripts.dir().to_path_buf(),
            });
        }

        Ok(Self {
            config,
            client,
            store,
            scripts,
            journal: None,
            hooks: Vec::new(),
            session_id: Uuid::new_v4(),
        })
    }

    /// Journal receiving an entry per transaction when `use_auditlog` is set.
    pub fn journal<J: AuditlogJournal + 'static>(mut self, journal: J) -> Self {
        self.journal = Some(Box::new(journal));
        self
    }

    /// Registers a hook for [`Runway::startup`] next to the configured ones.
    pub fn startup_hook<H: MigrationHook<C> + 'static>(
        mut self,
        priority: Option<u32>,
        hook: H,
    ) -> Self {
        self.hooks.push(PrioritizedHook {
            priority,
            hook: Box::new(hook),
        });
        self
    }

    pub fn config(&self) -> &RunwayConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn scripts(&self) -> &Scripts<C> {
        &self.scripts
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn enabled_journal(&self) -> Option<&dyn AuditlogJournal> {
        if !self.config.use_auditlog {
            return None;
        }

        self.journal.as_deref()
    }

    /// Loads every script and takes its applied flag from the store.
    async fn load(&self) -> Result<Loaded<C>> {
        let strategy = self.config.filename_strategy.strategy();
        let mut loaded = self.scripts.load(
            strategy.as_ref(),
            self.config.strict_naming,
            self.config.versioning_starts_from,
        )?;

        for migration in loaded.migrations.iter_mut() {
            if let Some(model) = self.model(migration.version()).await? {
                migration.set_is_applied(model.is_applied);
            }
        }

        Ok(loaded)
    }

    async fn model(&self, version: u64) -> Result<Option<MigrationReadModel>> {
        self.store
            .find(version)
            .await?
            .map(MigrationReadModel::from_dict)
            .transpose()
    }

    async fn is_recorded_applied(&self, version: u64) -> Result<bool> {
        Ok(self
            .model(version)
            .await?
            .map_or(false, |model| model.is_applied))
    }

    /// Records scripts the store does not know yet as pending and returns
    /// how many were added.
    pub async fn sync_scripts(&self) -> Result<usize> {
        let mut synced = 0;

        for migration in self.load().await?.migrations {
            if self.store.contains(migration.version()).await? {
                continue;
            }

            self.store.upsert(migration.to_dict(true)).await?;
            synced += 1;

            info!(
                "{}: migration {} with version {} added as pending",
                self.config.app_name,
                migration.name(),
                migration.version()
            );
        }

        Ok(synced)
    }

    /// Every recorded migration, ascending by version.
    pub async fn models(&self) -> Result<Vec<MigrationReadModel>> {
        self.store
            .find_all()
            .await?
            .into_iter()
            .map(MigrationReadModel::from_dict)
            .collect()
    }

    /// Upgrade queue ascending, downgrade queue latest first. The blocker is
    /// the first unloaded migration the direction would have to go through.
    async fn queue(&self, direction: Direction) -> Result<Queue<C>> {
        self.sync_scripts().await?;

        let loaded = self.load().await?;
        let applied = !direction.applied_after();

        let mut migrations = loaded
            .migrations
            .into_iter()
            .filter(|migration| migration.is_applied() == applied)
            .collect::<Vec<_>>();

        let mut blocker: Option<LoadFailure> = None;

        for failure in loaded.failures {
            if self.is_recorded_applied(failure.version).await? != applied {
                continue;
            }

            let replaces = blocker.as_ref().map_or(true, |current| match direction {
                Direction::Upgrade => failure.version < current.version,
                Direction::Downgrade => failure.version > current.version,
            });

            if replaces {
                blocker = Some(failure);
            }
        }

        if direction == Direction::Downgrade {
            migrations.reverse();
        }

        Ok(Queue {
            migrations,
            blocker,
        })
    }

    /// Migrations waiting to be applied, ascending by version.
    pub async fn pending(&self) -> Result<Vec<Migration<C>>> {
        Ok(self.queue(Direction::Upgrade).await?.migrations)
    }

    /// Applied migrations, latest first.
    pub async fn applied(&self) -> Result<Vec<Migration<C>>> {
        Ok(self.queue(Direction::Downgrade).await?.migrations)
    }

    /// Version of the latest applied migration.
    pub async fn current_version(&self) -> Result<Option<u64>> {
        Ok(self
            .models()
            .await?
            .into_iter()
            .filter(|model| model.is_applied)
            .map(|model| model.version)
            .max())
    }

    /// Recorded migrations whose script changed since they were recorded.
    pub async fn detect_drift(&self) -> Result<Vec<Drift>> {
        let mut drifts = Vec::new();

        for migration in self.load().await?.migrations {
            let Some(model) = self.model(migration.version()).await? else {
                continue;
            };

            drifts.extend(detect_drift(&model, migration.checksum()));
        }

        Ok(drifts)
    }

    pub async fn verify_checksums(&self) -> Result<()> {
        match self.detect_drift().await?.into_iter().next() {
            Some(drift) => Err(drift.into()),
            None => Ok(()),
        }
    }

    /// Accepts the current content of migration `version` as its recorded
    /// checksum, unblocking it after drift.
    pub async fn rebaseline(&self, version: u64) -> Result<()> {
        let migration = self
            .load()
            .await?
            .migrations
            .into_iter()
            .find(|migration| migration.version() == version)
            .ok_or(Error::MigrationNotFound(version))?;

        let mut model = self
            .model(version)
            .await?
            .ok_or(Error::MigrationNotFound(version))?;

        warn!(
            "{}: rebaselining migration {} with version {} from {} to {}",
            self.config.app_name,
            model.name,
            version,
            model.checksum,
            migration.checksum()
        );

        model.checksum = migration.checksum().to_owned();
        self.store.upsert(model.to_dict(true)).await?;

        Ok(())
    }

    /// Rebaselines every drifted migration and returns how many there were.
    pub async fn rebaseline_all(&self) -> Result<usize> {
        let drifts = self.detect_drift().await?;

        for drift in drifts.iter() {
            self.rebaseline(drift.version).await?;
        }

        Ok(drifts.len())
    }

    async fn transact(&self, mut migration: Migration<C>, direction: Direction) -> Result<()> {
        let result = self.guarded_apply(&mut migration, direction).await;

        if let Some(journal) = self.enabled_journal() {
            let mut entry = AuditlogEntry::new(
                self.session_id,
                direction.transaction_name(),
                MigrationReadModel::from_migration(&migration),
            );

            if let Err(error) = &result {
                entry = entry.with_error(error);
            }

            journal
                .append_entries(vec![entry])
                .await
                .map_err(Error::Journal)?;
        }

        result
    }

    async fn guarded_apply(
        &self,
        migration: &mut Migration<C>,
        direction: Direction,
    ) -> Result<()> {
        if let Some(model) = self.model(migration.version()).await? {
            if let Some(drift) = detect_drift(&model, migration.checksum()) {
                return Err(drift.into());
            }
        }

        apply(migration, direction, &self.client, &self.store).await
    }

    fn nothing(&self, error: Error) -> Result<usize> {
        if self.config.raise_on_nothing {
            return Err(error);
        }

        Ok(0)
    }

    /// Runs the queue of `direction` while `predicate` holds.
    ///
    /// Stops before a migration queued past an unloaded one. That load
    /// failure is returned when nothing could run at all.
    async fn run_while<P>(&self, direction: Direction, mut predicate: P) -> Result<usize>
    where
        P: FnMut(&Migration<C>) -> bool,
    {
        let queue = self.queue(direction).await?;

        if queue.migrations.is_empty() {
            if let Some(blocker) = queue.blocker {
                return Err(blocker.error);
            }

            return self.nothing(match direction {
                Direction::Upgrade => Error::NothingToUpgrade,
                Direction::Downgrade => Error::NothingToDowngrade,
            });
        }

        let mut done = 0;
        let mut blocked = false;

        for migration in queue.migrations.iter() {
            if !predicate(migration) {
                break;
            }

            if queue.is_blocked(migration, direction) {
                blocked = true;
                break;
            }

            let version = migration.version();
            info!(
                "{}: {} migration (#{version})...",
                self.config.app_name,
                match direction {
                    Direction::Upgrade => "upgrading waiting",
                    Direction::Downgrade => "downgrading applied",
                }
            );

            self.transact(migration.clone(), direction).await?;
            done += 1;

            if direction == Direction::Upgrade {
                info!("{}: successfully upgraded to (#{version}).", self.config.app_name);
            } else {
                let current = self.current_version().await?.unwrap_or_default();
                info!("{}: successfully downgraded to (#{current}).", self.config.app_name);
            }
        }

        match queue.blocker {
            Some(blocker) if blocked => {
                error!(
                    "{}: stopped at migration {} with version {}, it failed to load",
                    self.config.app_name, blocker.filename, blocker.version
                );

                if done == 0 {
                    return Err(blocker.error);
                }

                Ok(done)
            }
            _ => Ok(done),
        }
    }

    /// Applies pending migrations in ascending order while `predicate` holds
    /// and returns how many were applied.
    pub async fn upgrade_while<P>(&self, predicate: P) -> Result<usize>
    where
        P: FnMut(&Migration<C>) -> bool,
    {
        self.run_while(Direction::Upgrade, predicate).await
    }

    /// Reverts applied migrations, latest first, while `predicate` holds and
    /// returns how many were reverted.
    pub async fn downgrade_while<P>(&self, predicate: P) -> Result<usize>
    where
        P: FnMut(&Migration<C>) -> bool,
    {
        self.run_while(Direction::Downgrade, predicate).await
    }

    pub async fn upgrade_once(&self) -> Result<usize> {
        let mut first = true;
        self.upgrade_while(|_| std::mem::replace(&mut first, false)).await
    }

    pub async fn downgrade_once(&self) -> Result<usize> {
        let mut first = true;
        self.downgrade_while(|_| std::mem::replace(&mut first, false)).await
    }

    pub async fn upgrade_all(&self) -> Result<usize> {
        self.upgrade_while(|_| true).await
    }

    pub async fn downgrade_all(&self) -> Result<usize> {
        self.downgrade_while(|_| true).await
    }

    /// Applies pending migrations up to and including `version`.
    pub async fn upgrade_to(&self, version: u64) -> Result<usize> {
        let pending = self.pending().await?;

        if pending.is_empty() {
            return self.upgrade_all().await;
        }

        if !pending.iter().any(|migration| migration.version() == version) {
            return Err(self.missing(version, Error::AlreadyApplied(version)).await?);
        }

        self.upgrade_while(|migration| migration.version() <= version).await
    }

    /// Reverts applied migrations above `version`, which stays applied. `0`
    /// reverts everything.
    pub async fn downgrade_to(&self, version: u64) -> Result<usize> {
        if version == 0 {
            return self.downgrade_all().await;
        }

        let applied = self.applied().await?;

        if applied.is_empty() {
            return self.downgrade_all().await;
        }

        if !applied.iter().any(|migration| migration.version() == version) {
            return Err(self.missing(version, Error::AlreadyPending(version)).await?);
        }

        self.downgrade_while(|migration| migration.version() > version).await
    }

    /// `known` when the store records `version`, otherwise not found.
    async fn missing(&self, version: u64, known: Error) -> Result<Error> {
        if self.store.contains(version).await? {
            return Ok(known);
        }

        Ok(Error::MigrationNotFound(version))
    }

    pub async fn history(&self, args: HistoryArgs) -> Result<Vec<AuditlogEntry>> {
        let journal = self.enabled_journal().ok_or(Error::AuditlogDisabled)?;

        journal.history(args).await.map_err(Error::Journal)
    }
}

impl<C: Send + Sync> Runway<C> {
    /// Applies the configured startup hooks and the registered ones, in
    /// priority order.
    pub async fn startup(&self) -> Result<()> {
        let configured = self
            .config
            .startup_hooks
            .iter()
            .map(|configured| PrioritizedHook {
                priority: configured.priority(),
                hook: configured.hook().hook::<C>(),
            })
            .collect::<Vec<_>>();

        let mut hooks = configured
            .iter()
            .chain(self.hooks.iter())
            .collect::<Vec<_>>();
        startup_order(&mut hooks);

        run_hooks(self, &hooks).await
    }
}
