use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Error, migration::MigrationReadModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditlogEntry {
    pub session_id: Uuid,
    pub transaction_name: String,
    pub migration: MigrationReadModel,
    pub date: DateTime<Utc>,
    pub exc_name: Option<String>,
    pub exc_message: Option<String>,
}

impl AuditlogEntry {
    pub fn new(
        session_id: Uuid,
        transaction_name: impl Into<String>,
        migration: MigrationReadModel,
    ) -> Self {
        Self {
            session_id,
            transaction_name: transaction_name.into(),
            migration,
            date: Utc::now(),
            exc_name: None,
            exc_message: None,
        }
    }

    pub fn with_error(mut self, error: &Error) -> Self {
        self.exc_name = Some(error.name().to_owned());
        self.exc_message = Some(error.to_string());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.exc_name.is_some() || self.exc_message.is_some()
    }
}

/// Filters for [`AuditlogJournal::history`]. Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct HistoryArgs {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub ascending_date: bool,
}

impl HistoryArgs {
    pub fn new() -> Self {
        Self {
            ascending_date: true,
            ..Default::default()
        }
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending_date = false;
        self
    }

    fn matches(&self, entry: &AuditlogEntry) -> bool {
        self.start.map_or(true, |start| entry.date >= start)
            && self.end.map_or(true, |end| entry.date <= end)
    }
}

#[async_trait]
pub trait AuditlogJournal: DynClone + Send + Sync {
    async fn append_entries(&self, entries: Vec<AuditlogEntry>) -> anyhow::Result<()>;

    async fn history(&self, args: HistoryArgs) -> anyhow::Result<Vec<AuditlogEntry>>;
}

dyn_clone::clone_trait_object!(AuditlogJournal);

#[cfg(feature = "memory")]
mod memory {
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use std::sync::Arc;

    use super::{AuditlogEntry, AuditlogJournal, HistoryArgs};

    #[derive(Debug, Clone, Default)]
    pub struct MemoryJournal(Arc<RwLock<Vec<AuditlogEntry>>>);

    impl MemoryJournal {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl AuditlogJournal for MemoryJournal {
        async fn append_entries(&self, entries: Vec<AuditlogEntry>) -> anyhow::Result<()> {
            self.0.write().extend(entries);

            Ok(())
        }

        async fn history(&self, args: HistoryArgs) -> anyhow::Result<Vec<AuditlogEntry>> {
            let mut entries = self
                .0
                .read()
                .iter()
                .filter(|entry| args.matches(entry))
                .cloned()
                .collect::<Vec<_>>();

            entries.sort_by_key(|entry| entry.date);

            if !args.ascending_date {
                entries.reverse();
            }

            if let Some(limit) = args.limit {
                entries.truncate(limit);
            }

            Ok(entries)
        }
    }
}

#[cfg(feature = "memory")]
pub use memory::MemoryJournal;
