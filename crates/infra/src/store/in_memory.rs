use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use albiero_auth::{ProfileUpdate, User, UserRecord};
use albiero_core::{sort_newest_first, Email, LeadId, UserId};
use albiero_leads::{Lead, LeadNote, LeadQuery, LeadUpdate, Page, Pagination};

use super::{LeadStore, StoreError, UserStore};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<UserId, UserRecord>,
    by_email: HashMap<Email, UserId>,
}

/// In-memory user store.
///
/// Intended for tests/dev. The email index lives under the same lock as the
/// records, so the uniqueness check and the insert are one critical section.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Users>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Users>, StoreError> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Users>, StoreError> {
        self.inner.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, record: UserRecord) -> Result<User, StoreError> {
        let mut users = self.write()?;
        if users.by_email.contains_key(&record.user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = record.user.clone();
        users.by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(user.id, record);
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.by_id.get(&id).map(|r| r.user.clone()))
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        let users = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| users.by_id.get(id))
            .map(|r| r.user.clone())
            .collect())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.find_credentials(email).await?.map(|r| r.user))
    }

    async fn find_credentials(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        let users = self.read()?;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.write()?;
        Ok(users.by_id.get_mut(&id).map(|record| {
            update.apply(&mut record.user, now);
            record.user.clone()
        }))
    }

    async fn set_active(
        &self,
        id: UserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.write()?;
        Ok(users.by_id.get_mut(&id).map(|record| {
            record.user.is_active = active;
            record.user.updated_at = now;
            record.user.clone()
        }))
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.write()?;
        if let Some(record) = users.by_id.get_mut(&id) {
            record.user.last_login = Some(at);
            record.user.updated_at = at;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut all: Vec<User> = self.read()?.by_id.values().map(|r| r.user.clone()).collect();
        sort_newest_first(&mut all);
        Ok(all)
    }
}

/// In-memory lead store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<LeadId, Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn insert(&self, lead: Lead) -> Result<Lead, StoreError> {
        let mut leads = self.leads.write().map_err(|_| poisoned())?;
        leads.insert(lead.id, lead.clone());
        Ok(lead)
    }

    async fn get(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        let leads = self.leads.read().map_err(|_| poisoned())?;
        Ok(leads.get(&id).cloned())
    }

    async fn query(&self, query: &LeadQuery) -> Result<Page<Lead>, StoreError> {
        let mut matching: Vec<Lead> = {
            let leads = self.leads.read().map_err(|_| poisoned())?;
            leads.values().filter(|l| query.matches(l)).cloned().collect()
        };
        sort_newest_first(&mut matching);

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn update(
        &self,
        id: LeadId,
        update: &LeadUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        let mut leads = self.leads.write().map_err(|_| poisoned())?;
        Ok(leads.get_mut(&id).map(|lead| {
            update.apply(lead, now);
            lead.clone()
        }))
    }

    async fn add_note(&self, id: LeadId, note: LeadNote) -> Result<Option<Lead>, StoreError> {
        let mut leads = self.leads.write().map_err(|_| poisoned())?;
        Ok(leads.get_mut(&id).map(|lead| {
            lead.add_note(note);
            lead.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use albiero_auth::{PasswordHash, Registration};
    use albiero_leads::{LeadStatus, LeadSubmission};

    fn record(name: &str, email: &str) -> UserRecord {
        let new_user = Registration {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some("secret1".to_string()),
            phone: None,
        }
        .validate()
        .unwrap();
        UserRecord::create(&new_user, PasswordHash::from_stored("$argon2id$stub"), Utc::now())
    }

    fn lead_at(name: &str, at: DateTime<Utc>) -> Lead {
        let new_lead = LeadSubmission {
            name: Some(name.to_string()),
            email: Some(format!("{}@x.com", name.to_lowercase())),
            service: Some("web design".to_string()),
            phone: Some("123456".to_string()),
            message: None,
            source: None,
        }
        .validate()
        .unwrap();
        Lead::create(new_lead, at)
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(record("Ana", "ana@x.com")).await.unwrap();
        let err = store.insert(record("Other", "ANA@x.com")).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateEmail);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_exactly_one() {
        let store = Arc::new(InMemoryUserStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(record(&format!("User{i}"), "same@x.com")).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, StoreError::DuplicateEmail),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn credentials_carry_the_hash() {
        let store = InMemoryUserStore::new();
        let user = store.insert(record("Ana", "ana@x.com")).await.unwrap();
        let email = user.email.clone();

        let found = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        let creds = store.find_credentials(&email).await.unwrap().unwrap();
        assert_eq!(creds.password_hash.as_str(), "$argon2id$stub");
    }

    #[tokio::test]
    async fn last_login_and_active_flag_persist() {
        let store = InMemoryUserStore::new();
        let user = store.insert(record("Ana", "ana@x.com")).await.unwrap();
        let at = user.created_at + chrono::Duration::seconds(3);

        store.touch_last_login(user.id, at).await.unwrap();
        store.set_active(user.id, false, at).await.unwrap();

        let stored = store.get(user.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(at));
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn query_pages_newest_first() {
        let store = InMemoryLeadStore::new();
        let base = Utc::now();
        for i in 0..25 {
            let lead = lead_at(&format!("Lead{i:02}"), base + chrono::Duration::seconds(i));
            store.insert(lead).await.unwrap();
        }

        let first = store.query(&LeadQuery::default()).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].name, "Lead24");
        assert_eq!(first.pagination.total, 25);
        assert_eq!(first.pagination.total_pages, 3);

        let last = store
            .query(&LeadQuery { page: 3, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 5);
        assert_eq!(last.items[4].name, "Lead00");
        assert!(!last.pagination.has_next);

        let beyond = store
            .query(&LeadQuery { page: 9, ..Default::default() })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.pagination.total, 25);
    }

    #[tokio::test]
    async fn update_and_notes_on_missing_lead_return_none() {
        let store = InMemoryLeadStore::new();
        let id = LeadId::new();
        let update = LeadUpdate { status: Some(LeadStatus::Lost), ..Default::default() };
        assert!(store.update(id, &update, Utc::now()).await.unwrap().is_none());
        let note = LeadNote::new("x".to_string(), UserId::new(), Utc::now());
        assert!(store.add_note(id, note).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_notes_are_all_kept() {
        let store = Arc::new(InMemoryLeadStore::new());
        let lead = store.insert(lead_at("Bob", Utc::now())).await.unwrap();
        let author = UserId::new();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let note = LeadNote::new(format!("note {i}"), author, Utc::now());
                store.add_note(lead.id, note).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let stored = store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.len(), 20);
    }
}
