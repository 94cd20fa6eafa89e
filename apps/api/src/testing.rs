//! In-memory stand-ins for the storage and collaborator ports. Test builds only.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::derivation::signals::{Signal, SignalScope, SignalSource};
use crate::errors::ProgressionError;
use crate::identity::IdentityDirectory;
use crate::models::mentee::MenteeProfile;
use crate::models::progress::ProgressRecord;
use crate::sequencer::store::{ProgressStore, UpsertOutcome};

#[derive(Default)]
pub struct InMemoryProgressStore {
    records: Mutex<HashMap<(Uuid, i16), ProgressRecord>>,
    writes: AtomicUsize,
}

impl InMemoryProgressStore {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn snapshot(&self, mentee_id: Uuid, stage_number: i16) -> Option<ProgressRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(mentee_id, stage_number))
            .cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<Option<ProgressRecord>, ProgressionError> {
        Ok(self.snapshot(mentee_id, stage_number))
    }

    async fn insert_if_absent(
        &self,
        record: &ProgressRecord,
    ) -> Result<ProgressRecord, ProgressionError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .entry((record.mentee_id, record.stage_number))
            .or_insert_with(|| {
                self.writes.fetch_add(1, Ordering::SeqCst);
                record.clone()
            });
        Ok(stored.clone())
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<UpsertOutcome, ProgressionError> {
        let mut records = self.records.lock().unwrap();
        let key = (record.mentee_id, record.stage_number);
        if let Some(existing) = records.get(&key) {
            if existing.completed || existing.step_index > record.step_index {
                return Ok(UpsertOutcome::Rejected(existing.clone()));
            }
        }
        records.insert(key, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(UpsertOutcome::Applied(record.clone()))
    }
}

/// Fixed answers per signal, with optional failures and delays.
#[derive(Default)]
pub struct StaticSignalSource {
    sets: HashMap<Signal, HashSet<Uuid>>,
    failing: HashSet<Signal>,
    slow: HashMap<Signal, Duration>,
    calls: AtomicUsize,
}

impl StaticSignalSource {
    pub fn with(mut self, signal: Signal, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.sets.entry(signal).or_default().extend(ids);
        self
    }

    pub fn failing(mut self, signal: Signal) -> Self {
        self.failing.insert(signal);
        self
    }

    pub fn slow(mut self, signal: Signal, delay: Duration) -> Self {
        self.slow.insert(signal, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalSource for StaticSignalSource {
    async fn collect(
        &self,
        signal: Signal,
        scope: SignalScope,
    ) -> Result<HashSet<Uuid>, ProgressionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.slow.get(&signal) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&signal) {
            return Err(ProgressionError::SignalSourceFailure {
                signal,
                reason: "collection unavailable".to_string(),
            });
        }
        let ids = self.sets.get(&signal).cloned().unwrap_or_default();
        Ok(match scope {
            SignalScope::AllMentees => ids,
            SignalScope::Mentee(id) => ids.into_iter().filter(|m| *m == id).collect(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryIdentityDirectory {
    profiles: Vec<MenteeProfile>,
    admins: HashSet<Uuid>,
    unavailable: bool,
}

impl InMemoryIdentityDirectory {
    pub fn add_mentee(&mut self, name: &str, email: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.profiles.push(MenteeProfile {
            user_id,
            display_name: Some(name.to_string()),
            email: email.to_string(),
        });
        user_id
    }

    pub fn add_admin(&mut self, name: &str, email: &str) -> Uuid {
        let user_id = self.add_mentee(name, email);
        self.admins.insert(user_id);
        user_id
    }

    pub fn admins(&self) -> HashSet<Uuid> {
        self.admins.clone()
    }

    /// Every lookup fails as if the database were down.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn list_profiles(&self) -> Result<Vec<MenteeProfile>, ProgressionError> {
        if self.unavailable {
            return Err(ProgressionError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.profiles.clone())
    }

    async fn admin_identities(&self) -> Result<HashSet<Uuid>, ProgressionError> {
        if self.unavailable {
            return Err(ProgressionError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.admins.clone())
    }
}
