//! Postgres-backed account and refresh-token stores.
//!
//! Schema lives in `schema.sql` next to this file and is applied with
//! [`apply_schema`] at startup. Every statement is idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use gatehouse_auth::{
    Account, AccountPage, AccountQuery, AccountStore, NewAccount, RefreshTokenRecord, RefreshTokenStore, Role,
    SortDirection, SortField, SortOrder, StoreError,
};
use gatehouse_core::{AccountId, RefreshTokenId};

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Create the tables if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(unavailable)?;
    tracing::info!("database schema applied");
    Ok(())
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "database operation failed");
    StoreError::Unavailable(err.to_string())
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `$1` is a `LIKE` pattern or NULL for no filter.
const SEARCH_FILTER: &str = "($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)";

fn order_by(order: SortOrder) -> &'static str {
    match (order.field, order.direction) {
        (SortField::Id, SortDirection::Asc) => "id ASC",
        (SortField::Id, SortDirection::Desc) => "id DESC",
        (SortField::CreatedAt, SortDirection::Asc) => "created_at ASC, id ASC",
        (SortField::CreatedAt, SortDirection::Desc) => "created_at DESC, id DESC",
    }
}

/// Substring pattern with `LIKE` metacharacters escaped.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role").map_err(corrupt)?;
    Ok(Account {
        id: AccountId::new(row.try_get::<i64, _>("id").map_err(corrupt)?),
        email: row.try_get("email").map_err(corrupt)?,
        password_hash: row.try_get("password_hash").map_err(corrupt)?,
        name: row.try_get("name").map_err(corrupt)?,
        role: role.parse::<Role>().map_err(corrupt)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, name, role, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, name, role, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (email, password_hash, name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, name, role, created_at
            "#,
        )
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(account.role.as_str())
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::DuplicateEmail
            } else {
                unavailable(err)
            }
        })?;

        account_from_row(&row)
    }

    async fn list(&self, query: &AccountQuery) -> Result<AccountPage, StoreError> {
        let pattern = query.search.as_deref().map(contains_pattern);

        let sql = format!(
            r#"
            SELECT id, email, password_hash, name, role, created_at
            FROM accounts
            WHERE {SEARCH_FILTER}
            ORDER BY {}
            OFFSET $2 LIMIT $3
            "#,
            order_by(query.order)
        );
        let rows = sqlx::query(&sql)
            .bind(pattern.as_deref())
            .bind(i64::from(query.page.skip))
            .bind(i64::from(query.page.take))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM accounts WHERE {SEARCH_FILTER}"))
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?
            .try_get("total")
            .map_err(corrupt)?;

        let items = rows.iter().map(account_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(AccountPage {
            items,
            total: u64::try_from(total).map_err(corrupt)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh tokens
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PostgresRefreshTokenStore {
    pool: PgPool,
}

impl PostgresRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> Result<RefreshTokenRecord, StoreError> {
    Ok(RefreshTokenRecord {
        id: RefreshTokenId::from_uuid(row.try_get::<Uuid, _>("id").map_err(corrupt)?),
        account_id: AccountId::new(row.try_get::<i64, _>("account_id").map_err(corrupt)?),
        token_hash: row.try_get("token_hash").map_err(corrupt)?,
        expires_at: row.try_get::<DateTime<Utc>, _>("expires_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    /// Delete + insert in one transaction. The account row is locked first so
    /// concurrent rotations for the same account serialize.
    async fn replace(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(record.account_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(unavailable)?;

        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(record.account_id.get())
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, account_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(record.account_id.get())
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)
    }

    async fn find_active(&self, account_id: AccountId) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, token_hash, expires_at
            FROM refresh_tokens
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, id: RefreshTokenId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn revoke_all(&self, account_id: AccountId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(account_id.get())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
