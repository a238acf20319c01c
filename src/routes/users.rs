use axum::{
    routing::{get, patch, post},
    Extension, Router,
};

use crate::handlers::users;
use crate::models::user::Role;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(users::create_user))
        .route("/all", get(users::list_users))
        .route("/update-academic-year", post(users::update_academic_year))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(Extension(Role::Admin))
}

pub fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/:id/lock", patch(users::set_lock))
        .layer(Extension(Role::Department))
}

pub fn office_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(Extension(Role::Office))
}
