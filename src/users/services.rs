use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateUserRequest, UpdateUserRequest, UserView};
use super::repo::UserRepository;
use super::repo_types::{NewUser, Role, User, UserChanges};
use crate::auth::password::hash_password;
use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};

const EMAIL_TAKEN: &str = "El email ya está en uso";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Usuario con ID {id} no encontrado"))
}

fn map_write_error(e: anyhow::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(EMAIL_TAKEN.into())
    } else {
        AppError::Internal(e)
    }
}

/// CRUD over users with email uniqueness and password hashing.
pub struct UserDirectory {
    repo: Arc<dyn UserRepository>,
}

impl UserDirectory {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateUserRequest) -> AppResult<UserView> {
        let email = normalize_email(&input.email);

        if self.repo.find_by_email(&email, true).await?.is_some() {
            warn!(%email, "email already in use");
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }

        let role = if self.repo.count(true).await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let password_hash = hash_password(&input.password)?;
        let user = self
            .repo
            .insert(NewUser {
                name: input.name.trim().to_string(),
                email,
                password_hash,
                role,
            })
            .await
            .map_err(map_write_error)?;

        info!(user_id = %user.id, role = user.role.as_str(), "user created");
        Ok(user.into())
    }

    pub async fn find_all(&self) -> AppResult<Vec<UserView>> {
        let users = self.repo.list().await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn find_one(&self, id: Uuid) -> AppResult<UserView> {
        self.find_record(id).await.map(UserView::from)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: UpdateUserRequest) -> AppResult<UserView> {
        let current = self.find_record(id).await?;

        let mut changes = UserChanges {
            name: patch.name.map(|n| n.trim().to_string()),
            is_active: patch.is_active,
            ..Default::default()
        };

        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != current.email {
                if self.repo.find_by_email(&email, true).await?.is_some() {
                    warn!(%email, "email already in use");
                    return Err(AppError::Conflict(EMAIL_TAKEN.into()));
                }
                changes.email = Some(email);
            }
        }

        if let Some(password) = patch.password {
            changes.password_hash = Some(hash_password(&password)?);
        }

        let user = self
            .repo
            .update(id, changes)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| not_found(id))?;

        info!(user_id = %user.id, "user updated");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.soft_delete(id, OffsetDateTime::now_utc()).await? {
            return Err(not_found(id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Live user by normalized email, hash included.
    pub(crate) async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.repo.find_by_email(&normalize_email(email), false).await?)
    }

    /// Live user by id, hash included.
    pub(crate) async fn find_record(&self, id: Uuid) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    pub(crate) async fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let changes = UserChanges {
            password_hash: Some(password_hash),
            ..Default::default()
        };
        self.repo
            .update(id, changes)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::users::memory::InMemoryUserRepository;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(InMemoryUserRepository::default()))
    }

    /// Lets another writer insert `rival` right after the first email lookup,
    /// so the directory's pre-check passes and the store rejects the write.
    #[derive(Default)]
    struct RacingRepo {
        inner: InMemoryUserRepository,
        rival: std::sync::Mutex<Option<NewUser>>,
    }

    #[async_trait::async_trait]
    impl UserRepository for RacingRepo {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str, include_deleted: bool) -> anyhow::Result<Option<User>> {
            let found = self.inner.find_by_email(email, include_deleted).await?;
            let rival = self.rival.lock().unwrap().take();
            if let Some(rival) = rival {
                self.inner.insert(rival).await?;
            }
            Ok(found)
        }

        async fn list(&self) -> anyhow::Result<Vec<User>> {
            self.inner.list().await
        }

        async fn count(&self, include_deleted: bool) -> anyhow::Result<i64> {
            self.inner.count(include_deleted).await
        }

        async fn insert(&self, user: NewUser) -> anyhow::Result<User> {
            self.inner.insert(user).await
        }

        async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
            self.inner.update(id, changes).await
        }

        async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
            self.inner.soft_delete(id, at).await
        }
    }

    fn rival(email: &str) -> NewUser {
        NewUser {
            name: "Rival".into(),
            email: email.into(),
            password_hash: "not-a-real-hash".into(),
            role: Role::User,
        }
    }

    fn req(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.into(),
            email: email.into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn first_user_is_admin_then_user() {
        let dir = directory();
        let first = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let second = dir.create(req("Bruno", "bruno@example.com")).await.unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::User);
    }

    #[tokio::test]
    async fn first_user_deleted_does_not_reopen_admin() {
        let dir = directory();
        let first = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        dir.remove(first.id).await.unwrap();
        let next = dir.create(req("Bruno", "bruno@example.com")).await.unwrap();
        assert_eq!(next.role, Role::User);
    }

    #[tokio::test]
    async fn email_is_normalized_and_unique_case_insensitively() {
        let dir = directory();
        let user = dir.create(req("Ana", "  Ana@Example.COM ")).await.unwrap();
        assert_eq!(user.email, "ana@example.com");

        let err = dir.create(req("Otra", "ANA@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn deleted_email_still_blocks_creation() {
        let dir = directory();
        let user = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        dir.remove(user.id).await.unwrap();

        let err = dir.create(req("Ana", "ana@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let dir = directory();
        let user = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let record = dir.find_record(user.id).await.unwrap();
        assert_ne!(record.password_hash, "secret1");
        assert!(verify_password("secret1", &record.password_hash).unwrap());
    }

    #[tokio::test]
    async fn deleted_user_is_hidden_from_reads() {
        let dir = directory();
        let keep = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let gone = dir.create(req("Bruno", "bruno@example.com")).await.unwrap();
        dir.remove(gone.id).await.unwrap();

        let all = dir.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, keep.id);
        assert!(matches!(dir.find_one(gone.id).await, Err(AppError::NotFound(_))));
        assert!(dir.find_by_email("bruno@example.com").await.unwrap().is_none());
        assert!(matches!(dir.remove(gone.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn find_one_unknown_id() {
        let dir = directory();
        let id = Uuid::new_v4();
        let err = dir.find_one(id).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Usuario con ID {id} no encontrado"));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let dir = directory();
        let user = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let patch = UpdateUserRequest {
            name: Some("Ana María".into()),
            ..Default::default()
        };
        let updated = dir.update(user.id, patch).await.unwrap();
        assert_eq!(updated.name, "Ana María");
        assert_eq!(updated.email, "ana@example.com");
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn update_email_conflicts_with_other_user() {
        let dir = directory();
        dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let bruno = dir.create(req("Bruno", "bruno@example.com")).await.unwrap();

        let patch = UpdateUserRequest {
            email: Some("ANA@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(dir.update(bruno.id, patch).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_to_own_email_is_not_a_conflict() {
        let dir = directory();
        let ana = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let patch = UpdateUserRequest {
            email: Some("Ana@Example.com".into()),
            ..Default::default()
        };
        let updated = dir.update(ana.id, patch).await.unwrap();
        assert_eq!(updated.email, "ana@example.com");
    }

    #[tokio::test]
    async fn update_rehashes_password() {
        let dir = directory();
        let user = dir.create(req("Ana", "ana@example.com")).await.unwrap();
        let patch = UpdateUserRequest {
            password: Some("brand-new".into()),
            ..Default::default()
        };
        dir.update(user.id, patch).await.unwrap();
        let record = dir.find_record(user.id).await.unwrap();
        assert!(verify_password("brand-new", &record.password_hash).unwrap());
        assert!(!verify_password("secret1", &record.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_unknown_user() {
        let dir = directory();
        let res = dir.update(Uuid::new_v4(), UpdateUserRequest::default()).await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn store_duplicate_on_create_is_conflict() {
        let repo = Arc::new(RacingRepo::default());
        *repo.rival.lock().unwrap() = Some(rival("ana@example.com"));
        let dir = UserDirectory::new(repo.clone());

        let err = dir.create(req("Ana", "ana@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == EMAIL_TAKEN));
        assert_eq!(repo.inner.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_duplicate_on_update_is_conflict() {
        let repo = Arc::new(RacingRepo::default());
        let dir = UserDirectory::new(repo.clone());
        let user = dir.create(req("Ana", "ana@example.com")).await.unwrap();

        *repo.rival.lock().unwrap() = Some(rival("nuevo@example.com"));
        let patch = UpdateUserRequest {
            email: Some("nuevo@example.com".into()),
            ..Default::default()
        };
        let err = dir.update(user.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(dir.find_one(user.id).await.unwrap().email, "ana@example.com");
    }
}
