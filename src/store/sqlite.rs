//! SQLite-backed record store
//!
//! Tables: `users`, `cuentas` (accounts), `hmovimientos` (movement history)
//! and `prestamos` (loans), all keyed by `telegram_id`.

use super::{format, seed, RecordStore, StoreResult, RECENT_MOVEMENTS};
use crate::error::StoreError;
use crate::models::{Account, Loan, Movement, User, UserId};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{error, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id INTEGER UNIQUE NOT NULL,
        name TEXT,
        pin TEXT DEFAULT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cuentas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        dinero REAL NOT NULL DEFAULT 0,
        currency TEXT,
        FOREIGN KEY (telegram_id) REFERENCES users (telegram_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hmovimientos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id INTEGER NOT NULL,
        account_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        dinero REAL NOT NULL,
        timestamp TEXT DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (telegram_id) REFERENCES users (telegram_id),
        FOREIGN KEY (account_id) REFERENCES cuentas (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prestamos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        dinero REAL NOT NULL,
        dineroEntregado REAL DEFAULT 0,
        due_date TEXT,
        FOREIGN KEY (telegram_id) REFERENCES users (telegram_id)
    )
    "#,
];

/// Record store over a SQLite database
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Record store backend: sqlite ({})", database_url);
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Drop every table, recreate the schema and insert the demo customer.
    /// Runs in one transaction; nothing is kept if any statement fails.
    pub async fn seed_demo_data(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Err(e) = Self::reset_and_seed(&mut tx).await {
            error!("Demo seed failed, rolling back: {}", e);
            tx.rollback().await?;
            return Err(e);
        }

        tx.commit().await?;
        info!(user = %seed::DEMO_USER_ID, "Demo records inserted");
        Ok(())
    }

    async fn reset_and_seed(tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        for table in ["hmovimientos", "prestamos", "cuentas", "users"] {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                .execute(&mut **tx)
                .await?;
        }
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut **tx).await?;
        }

        let demo = seed::demo_customer();
        let owner = demo.user.id.0;

        sqlx::query("INSERT INTO users (telegram_id, name, pin) VALUES (?, ?, ?)")
            .bind(owner)
            .bind(&demo.user.display_name)
            .bind(&demo.user.access_code)
            .execute(&mut **tx)
            .await?;

        let mut account_ids = Vec::with_capacity(demo.accounts.len());
        for account in &demo.accounts {
            let result = sqlx::query(
                "INSERT INTO cuentas (telegram_id, name, dinero, currency) VALUES (?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(&account.name)
            .bind(account.amount)
            .bind(&account.currency)
            .execute(&mut **tx)
            .await?;
            account_ids.push((account.name.clone(), result.last_insert_rowid()));
        }

        for movement in &demo.movements {
            let account_id = account_ids
                .iter()
                .find(|(name, _)| *name == movement.account_name)
                .map(|(_, id)| *id)
                .ok_or_else(|| StoreError::not_found("cuenta", &movement.account_name))?;

            sqlx::query(
                "INSERT INTO hmovimientos (telegram_id, account_id, name, dinero, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(account_id)
            .bind(&movement.description)
            .bind(movement.amount)
            .bind(movement.timestamp.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()))
            .execute(&mut **tx)
            .await?;
        }

        for loan in &demo.loans {
            sqlx::query(
                "INSERT INTO prestamos (telegram_id, name, dinero, dineroEntregado, due_date) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(&loan.name)
            .bind(loan.total)
            .bind(loan.paid)
            .bind(loan.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn user_exists(&self, id: UserId) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE telegram_id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn load_accounts(&self, id: UserId) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, name, dinero, currency FROM cuentas WHERE telegram_id = ? ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<Account> {
                Ok(Account {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    amount: row.try_get("dinero")?,
                    currency: row.try_get("currency")?,
                })
            })
            .collect()
    }

    async fn load_recent_movements(&self, id: UserId) -> StoreResult<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS account_name, h.name AS description, h.dinero AS amount, h.timestamp AS ts
            FROM hmovimientos h
            JOIN cuentas c ON h.account_id = c.id
            WHERE h.telegram_id = ?
            ORDER BY h.timestamp DESC, h.id DESC
            LIMIT ?
            "#,
        )
        .bind(id.0)
        .bind(RECENT_MOVEMENTS as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<Movement> {
                let ts: Option<String> = row.try_get("ts")?;
                Ok(Movement {
                    account_name: row.try_get("account_name")?,
                    description: row.try_get("description")?,
                    amount: row.try_get("amount")?,
                    timestamp: ts.as_deref().and_then(parse_timestamp),
                })
            })
            .collect()
    }

    async fn load_loans(&self, id: UserId) -> StoreResult<Vec<Loan>> {
        let rows = sqlx::query(
            "SELECT name, dinero, dineroEntregado, due_date FROM prestamos WHERE telegram_id = ? ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<Loan> {
                let due: Option<String> = row.try_get("due_date")?;
                Ok(Loan {
                    name: row.try_get("name")?,
                    total: row.try_get("dinero")?,
                    paid: row.try_get("dineroEntregado")?,
                    due_date: due.as_deref().and_then(parse_date),
                })
            })
            .collect()
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| warn!("Unreadable movement timestamp {:?}: {}", raw, e))
        .ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| warn!("Unreadable loan due date {:?}: {}", raw, e))
        .ok()
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT name, pin FROM users WHERE telegram_id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let name: Option<String> = row.try_get("name")?;
        let pin: Option<String> = row.try_get("pin")?;

        Ok(Some(User {
            id,
            display_name: name.unwrap_or_default(),
            access_code: pin.filter(|p| !p.is_empty()),
        }))
    }

    async fn upsert_user(&self, id: UserId, display_name: &str) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO users (telegram_id, name) VALUES (?, ?)")
            .bind(id.0)
            .bind(display_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_access_code(&self, id: UserId, code: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET pin = ? WHERE telegram_id = ?")
            .bind(code)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn accounts_summary(&self, id: UserId) -> StoreResult<Option<String>> {
        if !self.user_exists(id).await? {
            return Ok(None);
        }
        let accounts = self.load_accounts(id).await?;
        let movements = self.load_recent_movements(id).await?;
        Ok(Some(format::accounts_summary(&accounts, &movements)))
    }

    async fn loans_summary(&self, id: UserId) -> StoreResult<Option<String>> {
        if !self.user_exists(id).await? {
            return Ok(None);
        }
        let loans = self.load_loans(id).await?;
        Ok(Some(format::loans_summary(&loans)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteRecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteRecordStore::from_pool(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let store = memory_store().await;
        let id = UserId(42);

        assert!(store.get_user(id).await.unwrap().is_none());
        assert!(!store.set_access_code(id, "1234").await.unwrap());

        store.upsert_user(id, "Ana").await.unwrap();
        store.upsert_user(id, "Ignored").await.unwrap();

        let user = store.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.display_name, "Ana");
        assert_eq!(user.access_code, None);

        assert!(store.set_access_code(id, "7788").await.unwrap());
        let user = store.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.access_code.as_deref(), Some("7788"));
    }

    #[tokio::test]
    async fn test_summaries_for_unknown_and_empty_user() {
        let store = memory_store().await;
        assert!(store.accounts_summary(UserId(9)).await.unwrap().is_none());

        store.upsert_user(UserId(9), "Leo").await.unwrap();
        let accounts = store.accounts_summary(UserId(9)).await.unwrap().unwrap();
        assert!(accounts.contains("No tienes cuentas registradas"));
        let loans = store.loans_summary(UserId(9)).await.unwrap().unwrap();
        assert!(loans.contains("No tienes préstamos activos"));
    }

    #[tokio::test]
    async fn test_seeded_summaries() {
        let store = memory_store().await;
        store.seed_demo_data().await.unwrap();

        let user = store.get_user(seed::DEMO_USER_ID).await.unwrap().unwrap();
        assert_eq!(user.access_code.as_deref(), Some(seed::DEMO_ACCESS_CODE));

        let accounts = store
            .accounts_summary(seed::DEMO_USER_ID)
            .await
            .unwrap()
            .unwrap();
        assert!(accounts.contains("- Ahorro Pesos IceCash: $17000.00 UYU"));
        // newest movement first
        let retiro = accounts.find("Retiro Cajero").unwrap();
        let compra = accounts.find("Compra Supermercado").unwrap();
        assert!(retiro < compra);
        assert!(accounts.contains("(04/06/2024 21:30)"));

        let loans = store
            .loans_summary(seed::DEMO_USER_ID)
            .await
            .unwrap()
            .unwrap();
        assert!(loans.contains(
            "- Préstamo Consumo Rápido: Total $50000.00, Pagado $10000.00, Pendiente $40000.00. Vence: 31/12/2024"
        ));
        assert!(loans.contains("Resumen: Total $70000.00, Pagado $10000.00, Pendiente $60000.00"));
    }

    #[tokio::test]
    async fn test_seed_is_repeatable() {
        let store = memory_store().await;
        store.seed_demo_data().await.unwrap();
        store.seed_demo_data().await.unwrap();

        let loans = store
            .loans_summary(seed::DEMO_USER_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loans.matches("Adelanto Vacaciones").count(), 1);
    }
}
