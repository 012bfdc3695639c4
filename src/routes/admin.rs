use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Account and role management. Mounted behind the authentication middleware; every
/// handler then requires the `super-admin` role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // GET /users/roles
        // Static segment, matched before `/users/{id}`.
        .route("/users/roles", get(handlers::users::list_roles))
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
}
