use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use gatehouse_auth::{
    Account, AccountPage, AccountQuery, AccountStore, NewAccount, RefreshTokenRecord, RefreshTokenStore, SortDirection,
    SortField, StoreError,
};
use gatehouse_core::{AccountId, RefreshTokenId};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct AccountTable {
    next_id: i64,
    rows: BTreeMap<AccountId, Account>,
}

/// In-memory account store for tests/dev. Ids start at 1.
#[derive(Debug)]
pub struct InMemoryAccountStore {
    inner: RwLock<AccountTable>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AccountTable {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Remove an account outright (admin action outside the session core).
    pub fn remove(&self, id: AccountId) -> Option<Account> {
        self.inner.write().ok()?.rows.remove(&id)
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.rows.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut table = self.inner.write().map_err(|_| poisoned())?;
        if table.rows.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let id = AccountId::new(table.next_id);
        table.next_id += 1;

        let account = Account {
            id,
            email: account.email,
            password_hash: account.password_hash,
            name: account.name,
            role: account.role,
            created_at: account.created_at,
        };
        table.rows.insert(id, account.clone());
        Ok(account)
    }

    async fn list(&self, query: &AccountQuery) -> Result<AccountPage, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&Account> = table
            .rows
            .values()
            .filter(|a| match &needle {
                Some(n) => {
                    a.email.to_lowercase().contains(n)
                        || a.name.as_deref().is_some_and(|name| name.to_lowercase().contains(n))
                }
                None => true,
            })
            .collect();

        // Rows iterate in id order already.
        if query.order.field == SortField::CreatedAt {
            matches.sort_by_key(|a| (a.created_at, a.id));
        }
        if query.order.direction == SortDirection::Desc {
            matches.reverse();
        }

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(query.page.skip as usize)
            .take(query.page.take as usize)
            .cloned()
            .collect();
        Ok(AccountPage { items, total })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh tokens
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory refresh token store for tests/dev.
///
/// One write lock covers delete + insert in `replace`, so readers never see
/// an account without its record mid-rotation.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    inner: RwLock<HashMap<AccountId, Vec<RefreshTokenRecord>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held for an account (rotation invariant checks).
    pub fn count_for(&self, account_id: AccountId) -> usize {
        self.inner
            .read()
            .map(|map| map.get(&account_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn replace(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(record.account_id, vec![record]);
        Ok(())
    }

    async fn find_active(&self, account_id: AccountId) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&account_id).and_then(|records| records.first().cloned()))
    }

    async fn delete(&self, id: RefreshTokenId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        for records in map.values_mut() {
            records.retain(|r| r.id != id);
        }
        map.retain(|_, records| !records.is_empty());
        Ok(())
    }

    async fn revoke_all(&self, account_id: AccountId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use gatehouse_auth::{Page, Role, SortOrder};

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: None,
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    fn query(skip: u32, take: u32, search: Option<&str>, order: &str) -> AccountQuery {
        AccountQuery::new(
            Page::new(Some(skip), Some(take)),
            search.map(str::to_string),
            order.parse::<SortOrder>().unwrap(),
        )
    }

    fn record(account_id: AccountId, hash: &str) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: RefreshTokenId::new(),
            account_id,
            token_hash: hash.to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn accounts_get_sequential_ids_and_unique_emails() {
        let store = InMemoryAccountStore::new();
        let a = store.create(new_account("a@x.com")).await.unwrap();
        let b = store.create(new_account("b@x.com")).await.unwrap();
        assert_eq!(a.id, AccountId::new(1));
        assert_eq!(b.id, AccountId::new(2));

        let dup = store.create(new_account("a@x.com")).await;
        assert_eq!(dup, Err(StoreError::DuplicateEmail));

        assert_eq!(store.find_by_email("b@x.com").await.unwrap().unwrap().id, b.id);
        assert!(store.find_by_id(AccountId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = InMemoryAccountStore::new();
        for i in 0..5 {
            store.create(new_account(&format!("u{i}@x.com"))).await.unwrap();
        }
        let page = store.list(&query(1, 2, None, "id:asc")).await.unwrap();
        assert_eq!(page.total, 5);
        let ids: Vec<i64> = page.items.iter().map(|a| a.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);

        let page = store.list(&query(0, 2, None, "id:desc")).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|a| a.id.get()).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[tokio::test]
    async fn search_matches_email_or_name_and_total_counts_matches() {
        let store = InMemoryAccountStore::new();
        store.create(new_account("ada@x.com")).await.unwrap();
        store
            .create(NewAccount {
                name: Some("Grace Ada Hopper".into()),
                ..new_account("grace@x.com")
            })
            .await
            .unwrap();
        store.create(new_account("bob@x.com")).await.unwrap();

        let page = store.list(&query(0, 1, Some("ADA"), "id:asc")).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].email, "ada@x.com");

        let page = store.list(&query(0, 20, Some("nobody"), "id:asc")).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn created_at_order_breaks_ties_by_id() {
        let store = InMemoryAccountStore::new();
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for (email, offset) in [("a@x.com", 2), ("b@x.com", 0), ("c@x.com", 2)] {
            store
                .create(NewAccount {
                    created_at: t + Duration::minutes(offset),
                    ..new_account(email)
                })
                .await
                .unwrap();
        }

        let emails = |page: AccountPage| page.items.into_iter().map(|a| a.email).collect::<Vec<_>>();
        assert_eq!(
            emails(store.list(&query(0, 20, None, "createdAt:asc")).await.unwrap()),
            vec!["b@x.com", "a@x.com", "c@x.com"]
        );
        assert_eq!(
            emails(store.list(&query(0, 20, None, "createdAt:desc")).await.unwrap()),
            vec!["c@x.com", "a@x.com", "b@x.com"]
        );
    }

    #[tokio::test]
    async fn replace_keeps_exactly_one_record() {
        let store = InMemoryRefreshTokenStore::new();
        let account = AccountId::new(1);

        store.replace(record(account, "first")).await.unwrap();
        store.replace(record(account, "second")).await.unwrap();

        assert_eq!(store.count_for(account), 1);
        let active = store.find_active(account).await.unwrap().unwrap();
        assert_eq!(active.token_hash, "second");
    }

    #[tokio::test]
    async fn delete_and_revoke() {
        let store = InMemoryRefreshTokenStore::new();
        let a = AccountId::new(1);
        let b = AccountId::new(2);
        let ra = record(a, "a");
        store.replace(ra.clone()).await.unwrap();
        store.replace(record(b, "b")).await.unwrap();

        store.delete(ra.id).await.unwrap();
        assert!(store.find_active(a).await.unwrap().is_none());
        assert!(store.find_active(b).await.unwrap().is_some());

        store.revoke_all(b).await.unwrap();
        store.revoke_all(b).await.unwrap();
        assert!(store.find_active(b).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_gap_during_replace() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let account = AccountId::new(1);
        store.replace(record(account, "seed")).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..2_000 {
                    store.replace(record(account, &format!("gen-{i}"))).await.unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..2_000 {
                        assert!(store.find_active(account).await.unwrap().is_some());
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.count_for(account), 1);
        assert_eq!(store.find_active(account).await.unwrap().unwrap().token_hash, "gen-1999");
    }
}
