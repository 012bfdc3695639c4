//! Shared fixtures for the integration tests: an in-memory application state and
//! principals for each seeded role.
#![allow(dead_code)]

use std::sync::Arc;

use morphe_cms::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    crypto,
    mailer::MemoryMailer,
    models::NewUser,
    repository::{InMemoryRepository, Repository},
    storage::MockStorageService,
};

pub const PASSWORD: &str = "Str0ng!Pass";

/// Handles onto the in-memory backends behind an `AppState`, so tests can inspect
/// what a request did.
pub struct TestContext {
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
    pub mailer: MemoryMailer,
    pub config: AppConfig,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            repo: Arc::new(InMemoryRepository::new()),
            storage: MockStorageService::new(),
            mailer: MemoryMailer::new(),
            config: AppConfig::default(),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            repo: self.repo.clone(),
            storage: Arc::new(self.storage.clone()),
            mailer: Arc::new(self.mailer.clone()),
            config: self.config.clone(),
        }
    }

    /// Inserts an active account with `PASSWORD` and returns its resolved principal.
    pub async fn principal(&self, role_slug: &str, email: &str) -> AuthUser {
        let role = self
            .repo
            .find_role_by_slug(role_slug)
            .await
            .unwrap()
            .expect("seeded role");
        let user = self
            .repo
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: crypto::hash_password(PASSWORD, self.config.bcrypt_cost).unwrap(),
                full_name: format!("{} User", role.name),
                role_id: role.id,
                is_active: true,
            })
            .await
            .unwrap();

        AuthUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role_id: role.id,
            role: role.slug,
            permissions: role.permissions,
        }
    }

    /// Bearer header value for `principal`.
    pub fn bearer(&self, principal: &AuthUser) -> String {
        let token = crypto::issue_access_token(
            &self.config,
            principal.id,
            &principal.email,
            &principal.role,
        )
        .unwrap();
        format!("Bearer {token}")
    }
}
