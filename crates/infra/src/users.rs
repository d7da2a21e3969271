//! User account store and directory.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aegis_auth::{Credential, Principal, UserDirectory, hash_password, verify_password};
use aegis_core::{DomainError, DomainResult, UserId};

use crate::paging::PageRequest;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Stored user account. The digest never leaves this module.
#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    username: String,
    email: String,
    password_digest: String,
    is_active: bool,
    is_superadmin: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
        }
    }

    fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User shape exposed over the API (no credential material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub is_superadmin: bool,
}

fn default_active() -> bool {
    true
}

/// Partial account update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superadmin: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory user account store.
#[derive(Debug, Default)]
pub struct UserStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, input: NewUser) -> DomainResult<UserView> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username", "username cannot be empty"));
        }

        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("email", "invalid email format"));
        }

        let password_digest = hash_password(&input.password)
            .map_err(|e| DomainError::validation("password", e.to_string()))?;

        let mut map = self.write();
        if map.values().any(|u| u.username == username) {
            return Err(DomainError::validation("username", "username already exists"));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            username,
            email,
            password_digest,
            is_active: input.is_active,
            is_superadmin: input.is_superadmin,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let view = record.view();
        map.insert(record.id, record);
        Ok(view)
    }

    pub fn update(&self, id: UserId, patch: UserPatch) -> DomainResult<UserView> {
        let password_digest = match &patch.password {
            Some(password) => Some(
                hash_password(password)
                    .map_err(|e| DomainError::validation("password", e.to_string()))?,
            ),
            None => None,
        };

        let mut map = self.write();
        let record = map.get_mut(&id).ok_or(DomainError::NotFound)?;

        if let Some(email) = patch.email {
            let email = email.trim().to_lowercase();
            if email.is_empty() || !email.contains('@') {
                return Err(DomainError::validation("email", "invalid email format"));
            }
            record.email = email;
        }
        if let Some(digest) = password_digest {
            record.password_digest = digest;
        }
        if let Some(is_active) = patch.is_active {
            record.is_active = is_active;
        }
        if let Some(is_superadmin) = patch.is_superadmin {
            record.is_superadmin = is_superadmin;
        }
        record.updated_at = Utc::now();

        Ok(record.view())
    }

    pub fn delete(&self, id: UserId) -> DomainResult<()> {
        self.write()
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::NotFound)
    }

    pub fn get(&self, id: UserId) -> Option<UserView> {
        self.read().get(&id).map(UserRecord::view)
    }

    pub fn get_by_username(&self, username: &str) -> Option<UserView> {
        self.read()
            .values()
            .find(|u| u.username == username)
            .map(UserRecord::view)
    }

    /// List accounts sorted by username, optionally filtered by a username
    /// substring.
    pub fn list(&self, username_filter: Option<&str>, page: PageRequest) -> (Vec<UserView>, usize) {
        let mut views: Vec<UserView> = self
            .read()
            .values()
            .filter(|u| match username_filter {
                Some(fragment) => u.username.contains(fragment),
                None => true,
            })
            .map(UserRecord::view)
            .collect();
        views.sort_by(|a, b| a.username.cmp(&b.username));

        page.slice(views)
    }

    /// Change a password after proving knowledge of the current one.
    pub fn change_password(&self, id: UserId, current: &str, new: &str) -> DomainResult<()> {
        let digest = hash_password(new)
            .map_err(|e| DomainError::validation("password", e.to_string()))?;

        let mut map = self.write();
        let record = map.get_mut(&id).ok_or(DomainError::NotFound)?;

        if !verify_password(current, &record.password_digest) {
            return Err(DomainError::validation("old_password", "incorrect password"));
        }

        record.password_digest = digest;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// Overwrite a password without the current-password proof (admin reset).
    pub fn reset_password(&self, id: UserId, new: &str) -> DomainResult<()> {
        let digest = hash_password(new)
            .map_err(|e| DomainError::validation("password", e.to_string()))?;

        let mut map = self.write();
        let record = map.get_mut(&id).ok_or(DomainError::NotFound)?;
        record.password_digest = digest;
        record.updated_at = Utc::now();
        Ok(())
    }

    pub fn touch_last_login(&self, id: UserId) {
        if let Some(record) = self.write().get_mut(&id) {
            record.last_login = Some(Utc::now());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<UserId, UserRecord>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<UserId, UserRecord>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserDirectory for UserStore {
    fn find_by_id(&self, id: UserId) -> Option<Principal> {
        self.read().get(&id).map(UserRecord::principal)
    }

    fn find_by_username(&self, username: &str) -> Option<Credential> {
        self.read()
            .values()
            .find(|u| u.username == username)
            .map(|record| Credential {
                principal: record.principal(),
                password_digest: record.password_digest.clone(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "secret123".to_string(),
            is_active: true,
            is_superadmin: false,
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "alice@example.com");
        assert!(fetched.is_active);
        assert!(fetched.last_login.is_none());
    }

    #[test]
    fn duplicate_username_is_a_validation_error() {
        let store = UserStore::new();
        store.create(new_user("alice")).unwrap();

        let err = store.create(new_user("alice")).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field, .. } if field == "username"));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let store = UserStore::new();
        let mut input = new_user("alice");
        input.email = "not-an-email".to_string();

        assert!(store.create(input).is_err());
    }

    #[test]
    fn directory_lookup_hides_nothing_needed_for_login() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        let credential = store.find_by_username("alice").unwrap();
        assert_eq!(credential.principal.id, created.id);
        assert!(verify_password("secret123", &credential.password_digest));

        let principal = store.find_by_id(created.id).unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[test]
    fn update_patches_only_provided_fields() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        let updated = store
            .update(
                created.id,
                UserPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(updated.email, "alice@example.com");
    }

    #[test]
    fn delete_then_lookup_misses() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        store.delete(created.id).unwrap();
        assert!(store.get(created.id).is_none());
        assert_eq!(store.delete(created.id), Err(DomainError::NotFound));
    }

    #[test]
    fn list_filters_and_paginates() {
        let store = UserStore::new();
        for name in ["alice", "alan", "bob"] {
            store.create(new_user(name)).unwrap();
        }

        let (all, total) = store.list(None, PageRequest::default());
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].username, "alan"); // sorted

        let (filtered, total) = store.list(Some("al"), PageRequest::default());
        assert_eq!(total, 2);
        assert!(filtered.iter().all(|u| u.username.starts_with("al")));

        let (paged, total) = store.list(None, PageRequest::new(2, 2));
        assert_eq!(total, 3);
        assert_eq!(paged.len(), 1);
    }

    #[test]
    fn change_password_requires_the_current_one() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        let err = store
            .change_password(created.id, "wrong", "newpass456")
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field, .. } if field == "old_password"));

        store
            .change_password(created.id, "secret123", "newpass456")
            .unwrap();
        let credential = store.find_by_username("alice").unwrap();
        assert!(verify_password("newpass456", &credential.password_digest));
    }

    #[test]
    fn touch_last_login_stamps_the_record() {
        let store = UserStore::new();
        let created = store.create(new_user("alice")).unwrap();

        store.touch_last_login(created.id);
        assert!(store.get(created.id).unwrap().last_login.is_some());
    }
}
