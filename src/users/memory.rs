//! In-memory `UserRepository` used by tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::UserRepository;
use super::repo_types::{NewUser, User, UserChanges};
use crate::db::fake::unique_violation;

struct Stored {
    user: User,
    deleted_at: Option<OffsetDateTime>,
}

impl Stored {
    fn live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Email is unique across tombstoned rows too, like the `users_email_key` index.
#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: Mutex<Vec<Stored>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.user.id == id && s.live())
            .map(|s| s.user.clone()))
    }

    async fn find_by_email(&self, email: &str, include_deleted: bool) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.user.email == email && (include_deleted || s.live()))
            .map(|s| s.user.clone()))
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|s| s.live()).map(|s| s.user.clone()).collect())
    }

    async fn count(&self, include_deleted: bool) -> anyhow::Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|s| include_deleted || s.live()).count() as i64)
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|s| s.user.email == user.email) {
            return Err(unique_violation("users_email_key"));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rows.push(Stored {
            user: created.clone(),
            deleted_at: None,
        });
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(email) = &changes.email {
            if rows.iter().any(|s| s.user.id != id && s.user.email == *email) {
                return Err(unique_violation("users_email_key"));
            }
        }
        let Some(stored) = rows.iter_mut().find(|s| s.user.id == id && s.live()) else {
            return Ok(None);
        };
        let user = &mut stored.user;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|s| s.user.id == id && s.live()) {
            Some(stored) => {
                stored.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
