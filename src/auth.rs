use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    config::AppConfig,
    crypto::verify_access_token,
    error::ApiError,
    models::Visibility,
    permissions::{Action, CONTENT_WRITERS, Module, PermissionMap, SUPER_ADMIN},
    repository::RepositoryState,
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. User and role are re-read from
/// the store on every request, so a deactivated account or a changed role takes effect
/// immediately even while old tokens are still unexpired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role_id: i32,
    /// Role slug, e.g. `super-admin`.
    pub role: String,
    pub permissions: PermissionMap,
}

impl AuthUser {
    /// Role allow-list gate.
    pub fn require_role(&self, roles: &[&str]) -> Result<(), ApiError> {
        if roles.contains(&self.role.as_str()) {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    /// Fine-grained gate over the role's permission map.
    pub fn require_permission(&self, module: Module, action: Action) -> Result<(), ApiError> {
        if self.permissions.allows(module, action) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "You do not have permission to {action} {module}"
            )))
        }
    }

    /// Content-write gate: staff role plus the module permission.
    pub fn require_writer(&self, module: Module, action: Action) -> Result<(), ApiError> {
        self.require_role(CONTENT_WRITERS)?;
        self.require_permission(module, action)
    }

    /// Ownership gate: the owner or a super-admin.
    pub fn require_owner_or_super_admin(&self, owner_id: i32) -> Result<(), ApiError> {
        if self.id == owner_id || self.is_super_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("You can only access your own resources"))
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == SUPER_ADMIN
    }

    /// Super-admins and editors.
    pub fn is_staff(&self) -> bool {
        CONTENT_WRITERS.contains(&self.role.as_str())
    }

    pub fn visibility(&self) -> Visibility {
        if self.is_staff() {
            Visibility::All
        } else {
            Visibility::Public
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// resolve
///
/// Loads the principal behind a verified token. Soft-deleted users are invisible to
/// `find_user` and therefore read as "not found".
async fn resolve(repo: &RepositoryState, user_id: i32) -> Result<AuthUser, ApiError> {
    let user = repo
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("User account is deactivated"));
    }

    let role = repo
        .find_role(user.role_id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("user {} has no role row", user.id)))?;

    Ok(AuthUser {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        role_id: role.id,
        role: role.slug,
        permissions: role.permissions,
    })
}

/// AuthUser Extractor Implementation
///
/// 1. Pulls the repository and config out of the application state.
/// 2. Reads the `Authorization: Bearer` header.
/// 3. Verifies the access token (expired → `TOKEN_EXPIRED`, otherwise `INVALID_TOKEN`).
/// 4. Reloads user and role, rejecting missing or deactivated accounts.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("No authentication token provided"))?;
        let claims = verify_access_token(&config, token)?;
        let user = resolve(&repo, claims.sub).await?;

        // Later extractors in the same request reuse the resolved principal.
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// MaybeAuthUser
///
/// Optional authentication for public read routes. A missing, malformed or expired
/// token yields an anonymous caller instead of a rejection. Store failures still
/// propagate.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn visibility(&self) -> Visibility {
        self.0
            .as_ref()
            .map(AuthUser::visibility)
            .unwrap_or(Visibility::Public)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(err) if err.status().is_server_error() => Err(err),
            Err(err) => {
                tracing::debug!(code = err.code(), "optional auth fell back to anonymous");
                Ok(Self(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{EDITOR, VIEWER, editor_permissions, super_admin_permissions, viewer_permissions};

    fn principal(id: i32, role: &str, permissions: PermissionMap) -> AuthUser {
        AuthUser {
            id,
            email: format!("{role}@morphelabs.com"),
            full_name: role.to_string(),
            role_id: 1,
            role: role.to_string(),
            permissions,
        }
    }

    #[test]
    fn role_gate_checks_allow_list() {
        let editor = principal(2, EDITOR, editor_permissions());
        assert!(editor.require_role(CONTENT_WRITERS).is_ok());
        let err = editor.require_role(&[SUPER_ADMIN]).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn permission_gate_names_the_denied_pair() {
        let editor = principal(2, EDITOR, editor_permissions());
        assert!(editor.require_permission(Module::Blog, Action::Update).is_ok());
        let err = editor
            .require_permission(Module::Blog, Action::Delete)
            .unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission to delete blog");
    }

    #[test]
    fn writer_gate_needs_staff_role_even_with_permission() {
        // A viewer whose map was widened still cannot write.
        let viewer = principal(
            3,
            VIEWER,
            viewer_permissions().grant(Module::Blog, &[Action::Create]),
        );
        assert!(viewer.require_writer(Module::Blog, Action::Create).is_err());
    }

    #[test]
    fn ownership_gate_admits_owner_and_super_admin() {
        let editor = principal(2, EDITOR, editor_permissions());
        let admin = principal(1, SUPER_ADMIN, super_admin_permissions());
        assert!(editor.require_owner_or_super_admin(2).is_ok());
        assert!(editor.require_owner_or_super_admin(9).is_err());
        assert!(admin.require_owner_or_super_admin(9).is_ok());
    }

    #[test]
    fn visibility_follows_role() {
        assert_eq!(
            principal(1, EDITOR, editor_permissions()).visibility(),
            Visibility::All
        );
        assert_eq!(
            principal(3, VIEWER, viewer_permissions()).visibility(),
            Visibility::Public
        );
        assert_eq!(MaybeAuthUser(None).visibility(), Visibility::Public);
    }
}
