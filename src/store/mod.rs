//! Record store adapter
//!
//! Lookup/update operations over user, account, movement and loan records,
//! keyed by the user's stable identifier. Summaries come back pre-formatted.

use crate::error::StoreError;
use crate::models::{Account, Loan, Movement, User, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod format;
pub mod seed;
pub mod sqlite;

pub use sqlite::SqliteRecordStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Number of movements included in an accounts summary.
pub const RECENT_MOVEMENTS: usize = 5;

/// Trait for the persistent record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Insert the user if unknown; an existing row is left untouched.
    async fn upsert_user(&self, id: UserId, display_name: &str) -> StoreResult<()>;

    /// Returns `false` when no user row was updated.
    async fn set_access_code(&self, id: UserId, code: &str) -> StoreResult<bool>;

    async fn accounts_summary(&self, id: UserId) -> StoreResult<Option<String>>;

    async fn loans_summary(&self, id: UserId) -> StoreResult<Option<String>>;
}

#[derive(Debug, Clone)]
struct UserRecords {
    user: User,
    accounts: Vec<Account>,
    movements: Vec<Movement>,
    loans: Vec<Loan>,
}

/// In-memory record store for development and tests
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<UserId, UserRecords>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store pre-populated with the demo customer.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        let demo = seed::demo_customer();

        store.insert_user(demo.user).await;
        for account in demo.accounts {
            store.add_account(seed::DEMO_USER_ID, account).await;
        }
        for movement in demo.movements {
            store.add_movement(seed::DEMO_USER_ID, movement).await;
        }
        for loan in demo.loans {
            store.add_loan(seed::DEMO_USER_ID, loan).await;
        }

        store
    }

    pub async fn insert_user(&self, user: User) {
        let mut records = self.records.write().await;
        records.insert(
            user.id,
            UserRecords {
                user,
                accounts: Vec::new(),
                movements: Vec::new(),
                loans: Vec::new(),
            },
        );
    }

    pub async fn add_account(&self, id: UserId, account: Account) {
        if let Some(entry) = self.records.write().await.get_mut(&id) {
            entry.accounts.push(account);
        }
    }

    /// Movements are kept newest first.
    pub async fn add_movement(&self, id: UserId, movement: Movement) {
        if let Some(entry) = self.records.write().await.get_mut(&id) {
            entry.movements.insert(0, movement);
        }
    }

    pub async fn add_loan(&self, id: UserId, loan: Loan) {
        if let Some(entry) = self.records.write().await.get_mut(&id) {
            entry.loans.push(loan);
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let records = self.records.read().await;
        Ok(records.get(&id).map(|entry| entry.user.clone()))
    }

    async fn upsert_user(&self, id: UserId, display_name: &str) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.entry(id).or_insert_with(|| UserRecords {
            user: User {
                id,
                display_name: display_name.to_string(),
                access_code: None,
            },
            accounts: Vec::new(),
            movements: Vec::new(),
            loans: Vec::new(),
        });
        Ok(())
    }

    async fn set_access_code(&self, id: UserId, code: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(entry) => {
                entry.user.access_code = Some(code.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accounts_summary(&self, id: UserId) -> StoreResult<Option<String>> {
        let records = self.records.read().await;
        Ok(records.get(&id).map(|entry| {
            let recent: Vec<Movement> = entry
                .movements
                .iter()
                .take(RECENT_MOVEMENTS)
                .cloned()
                .collect();
            format::accounts_summary(&entry.accounts, &recent)
        }))
    }

    async fn loans_summary(&self, id: UserId) -> StoreResult<Option<String>> {
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .map(|entry| format::loans_summary(&entry.loans)))
    }
}
