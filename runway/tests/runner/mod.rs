use async_trait::async_trait;
use runway::{
    checksum_bytes, BrokenCause, BusinessRule, ConfigBuilder, CreateCollection, DropCollection,
    Error, FilenameStrategyKind, HistoryArgs, MemoryClient, MemoryJournal, MigrationHook,
    ProcessBuilder, RequiredCollection, Runway, RunwayConfig, Scripts, StartupHook, Store,
};
use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tempfile::TempDir;

fn config(dir: &TempDir) -> ConfigBuilder {
    ConfigBuilder::new("runway-test")
        .scripts_dir(dir.path())
        .filename_strategy(FilenameStrategyKind::Missing)
}

fn write(dir: &Path, filename: &str, content: &str) -> anyhow::Result<()> {
    fs::write(dir.join(filename), content)?;

    Ok(())
}

/// One script per collection, each creating it on upgrade and dropping it on
/// downgrade.
fn collections(dir: &TempDir, names: &[&str]) -> anyhow::Result<Scripts<MemoryClient>> {
    let mut scripts = Scripts::new(dir.path());

    for (position, name) in names.iter().enumerate() {
        let filename = format!("{:03}_{name}.rs", position + 1);
        write(dir.path(), &filename, &format!("create {name}"))?;

        scripts.add(
            scripts
                .module(&filename)
                .with_description(format!("{name} collection"))
                .upgrade(ProcessBuilder::upgrade().command(CreateCollection::new("app", *name)))
                .downgrade(
                    ProcessBuilder::downgrade()
                        .add_rule(RequiredCollection::new("app", *name))
                        .command(DropCollection::new("app", *name)),
                ),
        );
    }

    Ok(scripts)
}

fn build_runway(
    config: RunwayConfig,
    scripts: Scripts<MemoryClient>,
    store: Store,
) -> anyhow::Result<Runway<MemoryClient>> {
    Ok(Runway::new(config, MemoryClient::new(), store, scripts)?)
}

pub async fn test_create_users(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "create_users.rs", "create users")?;

    let mut scripts = Scripts::new(dir.path());
    scripts.add(
        scripts
            .module("create_users.rs")
            .upgrade(ProcessBuilder::upgrade().command(CreateCollection::new("app", "users"))),
    );

    let runway = build_runway(config(&dir).build(), scripts, store)?;

    assert_eq!(runway.pending().await?.len(), 1);
    assert_eq!(runway.current_version().await?, None);

    assert_eq!(runway.upgrade_all().await?, 1);

    assert!(runway.client().has_collection("app", "users"));
    assert!(runway.pending().await?.is_empty());

    let applied = runway.applied().await?;
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].name(), "create_users");
    assert!(applied[0].is_applied());

    let models = runway.models().await?;
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].version, 1);
    assert!(models[0].is_applied);
    assert_eq!(models[0].checksum, checksum_bytes(b"create users"));
    assert_eq!(runway.current_version().await?, Some(1));

    Ok(())
}

pub async fn test_broken_rules_block_commands(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "create_users.rs", "create users")?;

    let mut scripts = Scripts::new(dir.path());
    scripts.add(
        scripts.module("create_users.rs").upgrade(
            ProcessBuilder::upgrade()
                .add_rule(RequiredCollection::new("app", "accounts").named("R1"))
                .add_rule(RequiredCollection::new("app", "users").named("R2").after("R1"))
                .command(CreateCollection::new("app", "users")),
        ),
    );

    let runway = build_runway(config(&dir).use_auditlog(true).build(), scripts, store)?
        .journal(MemoryJournal::new());

    let err = runway.upgrade_all().await.unwrap_err();

    let Error::RulesBroken {
        name,
        version,
        process,
        broken,
    } = &err
    else {
        anyhow::bail!("expected broken rules, got {err}");
    };

    assert_eq!(name, "create_users");
    assert_eq!(*version, 1);
    assert_eq!(process, "upgrade");
    assert_eq!(
        broken.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["R1", "R2"]
    );
    assert_eq!(broken[0].cause, BrokenCause::Violated);
    assert_eq!(broken[1].cause, BrokenCause::Dependency("R1".to_owned()));
    assert!(err.to_string().contains("Business rule R2 is broken."));

    assert!(!runway.client().has_collection("app", "users"));
    assert_eq!(runway.pending().await?.len(), 1);

    let history = runway.history(HistoryArgs::new()).await?;
    assert_eq!(history.len(), 1);
    assert!(history[0].is_failed());
    assert_eq!(history[0].exc_name.as_deref(), Some("RulesBroken"));
    assert!(!history[0].migration.is_applied);

    Ok(())
}

pub async fn test_drift_blocks_until_rebaseline(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scripts = collections(&dir, &["users", "posts"])?;
    let runway = build_runway(config(&dir).build(), scripts, store)?;

    assert_eq!(runway.upgrade_once().await?, 1);
    runway.verify_checksums().await?;

    write(dir.path(), "001_users.rs", "create users with index")?;

    let drifts = runway.detect_drift().await?;
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].version, 1);
    assert_eq!(drifts[0].name, "001_users");

    assert!(matches!(
        runway.verify_checksums().await,
        Err(Error::ChecksumMismatch { version: 1, .. })
    ));
    assert!(matches!(
        runway.downgrade_once().await,
        Err(Error::ChecksumMismatch { version: 1, .. })
    ));
    assert!(runway.client().has_collection("app", "users"));

    // Unaffected migrations still run.
    assert_eq!(runway.upgrade_all().await?, 1);

    runway.rebaseline(1).await?;
    assert!(runway.detect_drift().await?.is_empty());

    assert_eq!(runway.downgrade_all().await?, 2);
    assert!(!runway.client().has_collection("app", "users"));
    assert!(matches!(
        runway.rebaseline(7).await,
        Err(Error::MigrationNotFound(7))
    ));

    Ok(())
}

pub async fn test_upgrade_to_and_downgrade_to(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scripts = collections(&dir, &["users", "posts", "comments"])?;
    let runway = build_runway(config(&dir).build(), scripts, store)?;

    assert_eq!(runway.upgrade_to(2).await?, 2);
    assert_eq!(runway.current_version().await?, Some(2));
    assert!(!runway.client().has_collection("app", "comments"));

    assert!(matches!(
        runway.upgrade_to(2).await,
        Err(Error::AlreadyApplied(2))
    ));
    assert!(matches!(
        runway.upgrade_to(9).await,
        Err(Error::MigrationNotFound(9))
    ));
    assert!(matches!(
        runway.downgrade_to(3).await,
        Err(Error::AlreadyPending(3))
    ));

    let applied = runway
        .applied()
        .await?
        .iter()
        .map(|m| m.version())
        .collect::<Vec<_>>();
    assert_eq!(applied, vec![2, 1]);

    assert_eq!(runway.downgrade_to(1).await?, 1);
    assert_eq!(runway.current_version().await?, Some(1));
    assert!(!runway.client().has_collection("app", "posts"));

    assert_eq!(runway.upgrade_all().await?, 2);
    assert_eq!(runway.current_version().await?, Some(3));

    assert_eq!(runway.downgrade_to(0).await?, 3);
    assert_eq!(runway.current_version().await?, None);
    assert!(!runway.client().has_collection("app", "users"));

    Ok(())
}

pub async fn test_nothing_to_do(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let strict = build_runway(config(&dir).build(), Scripts::new(dir.path()), store.clone())?;
    assert!(matches!(
        strict.upgrade_all().await,
        Err(Error::NothingToUpgrade)
    ));
    assert!(matches!(
        strict.downgrade_once().await,
        Err(Error::NothingToDowngrade)
    ));
    assert!(matches!(
        strict.history(HistoryArgs::new()).await,
        Err(Error::AuditlogDisabled)
    ));

    let lenient = build_runway(
        config(&dir).raise_on_nothing(false).build(),
        Scripts::new(dir.path()),
        store,
    )?;
    assert_eq!(lenient.upgrade_all().await?, 0);
    assert_eq!(lenient.downgrade_to(0).await?, 0);

    assert!(matches!(
        build_runway(
            ConfigBuilder::new("").scripts_dir(dir.path()).build(),
            Scripts::new(dir.path()),
            Store::memory()
        )
        .err()
        .and_then(|err| err.downcast::<Error>().ok()),
        Some(Error::Config(_))
    ));

    Ok(())
}

pub async fn test_auditlog(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scripts = collections(&dir, &["users", "posts"])?;
    let journal = MemoryJournal::new();
    let runway = build_runway(config(&dir).use_auditlog(true).build(), scripts, store)?
        .journal(journal.clone());

    runway.upgrade_all().await?;
    runway.downgrade_once().await?;

    let history = runway.history(HistoryArgs::new()).await?;
    assert_eq!(
        history
            .iter()
            .map(|e| (e.transaction_name.as_str(), e.migration.version))
            .collect::<Vec<_>>(),
        vec![
            ("UpgradeTransaction", 1),
            ("UpgradeTransaction", 2),
            ("DowngradeTransaction", 2)
        ]
    );
    assert!(history.iter().all(|e| !e.is_failed()));
    assert!(history.iter().all(|e| e.session_id == runway.session_id()));
    assert!(!history[2].migration.is_applied);

    let latest = runway
        .history(HistoryArgs::new().descending().limit(1))
        .await?;
    assert_eq!(latest[0].transaction_name, "DowngradeTransaction");

    Ok(())
}

pub async fn test_non_strict_naming(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "users.rs", "create users")?;
    write(dir.path(), "accounts.rs", "create accounts")?;

    let mut scripts = Scripts::new(dir.path());
    scripts.add(
        scripts
            .module("users.rs")
            .with_version(10)
            .upgrade(ProcessBuilder::upgrade().command(CreateCollection::new("app", "users"))),
    );
    scripts.add(
        scripts.module("accounts.rs").with_version(11).upgrade(
            ProcessBuilder::upgrade()
                .add_rule(RequiredCollection::new("app", "users"))
                .command(CreateCollection::new("app", "accounts")),
        ),
    );

    let runway = build_runway(
        config(&dir).strict_naming(false).versioning_starts_from(10).build(),
        scripts,
        store,
    )?;

    let pending = runway
        .pending()
        .await?
        .iter()
        .map(|m| (m.name().to_owned(), m.version()))
        .collect::<Vec<_>>();
    assert_eq!(
        pending,
        vec![("users".to_owned(), 10), ("accounts".to_owned(), 11)]
    );

    assert_eq!(runway.upgrade_all().await?, 2);
    assert!(runway.client().has_collection("app", "accounts"));

    Ok(())
}

pub async fn test_unloaded_script_blocks_only_later_migrations(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scripts = collections(&dir, &["users", "posts", "comments"])?;
    fs::remove_file(dir.path().join("002_posts.rs"))?;

    let runway = build_runway(config(&dir).build(), scripts, store)?;

    assert_eq!(
        runway
            .pending()
            .await?
            .iter()
            .map(|m| m.version())
            .collect::<Vec<_>>(),
        vec![1, 3]
    );

    assert_eq!(runway.upgrade_once().await?, 1);
    assert!(runway.client().has_collection("app", "users"));

    assert!(matches!(runway.upgrade_all().await, Err(Error::Load { .. })));
    assert!(!runway.client().has_collection("app", "comments"));
    assert_eq!(runway.current_version().await?, Some(1));

    write(dir.path(), "002_posts.rs", "create posts")?;
    assert_eq!(runway.upgrade_all().await?, 2);
    assert_eq!(runway.current_version().await?, Some(3));

    fs::remove_file(dir.path().join("002_posts.rs"))?;
    assert_eq!(runway.downgrade_all().await?, 1);
    assert!(!runway.client().has_collection("app", "comments"));
    assert!(runway.client().has_collection("app", "posts"));

    assert!(matches!(
        runway.downgrade_all().await,
        Err(Error::Load { .. })
    ));
    assert!(runway.client().has_collection("app", "users"));

    Ok(())
}

pub async fn test_scripts_dir_must_match_config(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let other = tempfile::tempdir()?;

    let err = build_runway(config(&dir).build(), Scripts::new(other.path()), store)
        .err()
        .and_then(|err| err.downcast::<Error>().ok());

    let Some(Error::ScriptsDir {
        configured,
        catalogue,
    }) = err
    else {
        anyhow::bail!("expected a scripts dir mismatch");
    };

    assert_eq!(configured, dir.path());
    assert_eq!(catalogue, other.path());

    Ok(())
}

#[derive(Clone)]
struct CountingHook(Arc<AtomicUsize>);

#[async_trait]
impl MigrationHook<MemoryClient> for CountingHook {
    async fn apply(&self, runway: &Runway<MemoryClient>) -> Result<(), Error> {
        // Configured hooks with a priority have already synced the store.
        self.0.store(runway.models().await?.len(), Ordering::SeqCst);

        Ok(())
    }
}

pub async fn test_startup_hooks(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let seen = Arc::new(AtomicUsize::new(0));

    let runway = build_runway(
        config(&dir)
            .prioritized_startup_hook(1, StartupHook::SyncScriptsWithStore)
            .build(),
        collections(&dir, &["users", "posts"])?,
        store.clone(),
    )?
    .startup_hook(None, CountingHook(seen.clone()));

    runway.startup().await?;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(runway
        .models()
        .await?
        .iter()
        .all(|model| !model.is_applied));

    runway.upgrade_all().await?;
    write(dir.path(), "001_users.rs", "create users with index")?;
    write(dir.path(), "002_posts.rs", "create posts with index")?;

    let raising = build_runway(
        config(&dir)
            .startup_hook(StartupHook::RaiseIfMigrationChecksumMismatch)
            .build(),
        collections_on_disk(&dir, &["users", "posts"]),
        store.clone(),
    )?;
    assert!(matches!(
        raising.startup().await,
        Err(Error::ChecksumMismatch { version: 1, .. })
    ));

    let recalculating = build_runway(
        config(&dir)
            .startup_hook(StartupHook::RaiseIfMigrationChecksumMismatch)
            .prioritized_startup_hook(1, StartupHook::RecalculateMigrationsChecksum)
            .build(),
        collections_on_disk(&dir, &["users", "posts"]),
        store,
    )?;
    recalculating.startup().await?;

    assert!(recalculating.detect_drift().await?.is_empty());
    assert_eq!(recalculating.downgrade_all().await?, 2);

    Ok(())
}

/// Same catalogue as [`collections`], over scripts already on disk.
fn collections_on_disk(dir: &TempDir, names: &[&str]) -> Scripts<MemoryClient> {
    let mut scripts = Scripts::new(dir.path());

    for (position, name) in names.iter().enumerate() {
        scripts.add(
            scripts
                .module(format!("{:03}_{name}.rs", position + 1))
                .upgrade(ProcessBuilder::upgrade().command(CreateCollection::new("app", *name)))
                .downgrade(ProcessBuilder::downgrade().command(DropCollection::new("app", *name))),
        );
    }

    scripts
}

/// A rule whose check cannot reach the database.
#[derive(Clone)]
struct Unreachable;

#[async_trait]
impl BusinessRule<MemoryClient> for Unreachable {
    async fn check_is_broken(&self, _client: &MemoryClient) -> anyhow::Result<bool> {
        anyhow::bail!("connection reset")
    }
}

pub async fn test_failing_rule_check_aborts_upgrade(store: Store) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "create_users.rs", "create users")?;

    let mut scripts = Scripts::new(dir.path());
    scripts.add(
        scripts.module("create_users.rs").upgrade(
            ProcessBuilder::upgrade()
                .add_rule(Unreachable)
                .command(CreateCollection::new("app", "users")),
        ),
    );

    let runway = build_runway(config(&dir).use_auditlog(true).build(), scripts, store)?
        .journal(MemoryJournal::new());

    runway.sync_scripts().await?;
    let recorded = runway.store().find(1).await?;

    let err = runway.upgrade_once().await.unwrap_err();
    assert!(matches!(err, Error::RuleEvaluation { .. }), "got {err}");

    assert!(!runway.client().has_collection("app", "users"));
    assert_eq!(runway.store().find(1).await?, recorded);

    let history = runway.history(HistoryArgs::new()).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].exc_name.as_deref(), Some("RuleEvaluation"));
    assert!(!history[0].migration.is_applied);

    Ok(())
}
