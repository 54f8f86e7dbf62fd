//! In-memory stores
//!
//! Used by the test suites and by `database.backend = "memory"`. They honour
//! the same contracts as the PostgreSQL repositories: unique `call_id`,
//! unique username, and `start_time DESC, id DESC` ordering.

use async_trait::async_trait;
use cdr_core::{
    models::{CallRecord, StoredCallRecord, User},
    traits::{CallRecordFilter, CallRecordStore, NewUser, UserRepository},
    AppError, AppResult,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Default)]
struct CallRecordTable {
    next_id: i64,
    rows: BTreeMap<i64, StoredCallRecord>,
}

impl CallRecordTable {
    fn call_id_taken(&self, call_id: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|r| r.record.call_id == call_id && Some(r.id) != except)
    }
}

/// Call record store kept in process memory
#[derive(Default)]
pub struct InMemoryCallRecordStore {
    table: RwLock<CallRecordTable>,
}

impl InMemoryCallRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallRecordStore {
    async fn create(&self, record: &CallRecord) -> AppResult<StoredCallRecord> {
        let mut table = self.table.write();

        if table.call_id_taken(&record.call_id, None) {
            return Err(AppError::AlreadyExists(format!(
                "Call record {} already exists",
                record.call_id
            )));
        }

        table.next_id += 1;
        let now = Utc::now();
        let stored = StoredCallRecord {
            id: table.next_id,
            record: record.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(stored.id, stored.clone());

        debug!(id = stored.id, call_id = %record.call_id, "Stored call record in memory");
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<StoredCallRecord>> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    async fn find_by_call_id(&self, call_id: &str) -> AppResult<Option<StoredCallRecord>> {
        Ok(self
            .table
            .read()
            .rows
            .values()
            .find(|r| r.record.call_id == call_id)
            .cloned())
    }

    async fn query(
        &self,
        filter: &CallRecordFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<StoredCallRecord>, i64)> {
        let table = self.table.read();

        let mut matching: Vec<&StoredCallRecord> = table
            .rows
            .values()
            .filter(|r| filter.matches(&r.record))
            .collect();
        matching.sort_by(|a, b| {
            b.record
                .start_time
                .cmp(&a.record.start_time)
                .then(b.id.cmp(&a.id))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn update(&self, id: i64, record: &CallRecord) -> AppResult<StoredCallRecord> {
        let mut table = self.table.write();

        if !table.rows.contains_key(&id) {
            return Err(AppError::RecordNotFound(id.to_string()));
        }
        if table.call_id_taken(&record.call_id, Some(id)) {
            return Err(AppError::AlreadyExists(format!(
                "Call record {} already exists",
                record.call_id
            )));
        }

        let stored = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))?;
        stored.record = record.clone();
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.table
            .write()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))
    }
}

#[derive(Default)]
struct UserTable {
    next_id: i32,
    rows: BTreeMap<i32, User>,
}

/// User repository kept in process memory
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .table
            .read()
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut table = self.table.write();

        if table.rows.values().any(|u| u.username == user.username) {
            return Err(AppError::AlreadyExists(format!(
                "User {} already exists",
                user.username
            )));
        }

        table.next_id += 1;
        let created = User {
            id: table.next_id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            ..Default::default()
        };
        table.rows.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update_last_login(&self, id: i32) -> AppResult<()> {
        let mut table = self.table.write();
        let user = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;
        user.last_login = Some(Utc::now());
        Ok(())
    }
}
