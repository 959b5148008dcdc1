/// Prelude module for importing common route symbols. This reduces boilerplate
/// and time to set up new routes.
pub use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
pub use anyhow::Context;
pub use askama_actix::{Template, TemplateToResponse};
pub use chrono::Utc;
pub use log::{info, trace, warn};
pub use serde::Deserialize;
pub use tokio::try_join;
pub use uuid::Uuid;
pub use validator::Validate;

pub use crate::app_state::{AppConfig, AppState, CurrentUser, SessionInfo};
pub use crate::error::{Error, Result};
pub use crate::models::*;
pub use crate::partials::*;
pub(crate) use crate::{lifecycle, permissions, validation};

/// Redirect after a successful form post.
pub fn see_other(location: String) -> web::Redirect {
    web::Redirect::to(location).see_other()
}

/// Maps a unique constraint violation to a conflict error with `message`.
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::InternalError(anyhow::Error::new(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_modules_are_reachable() {
        assert!(lifecycle::check_can_cancel(RegistrationStatus::Pending).is_ok());
        assert!(validation::reset_token(&"ab".repeat(32)));
        let admin = permissions::tests::user_with(Role::Admin);
        assert!(permissions::require_admin(&admin).is_ok());
    }

    #[test]
    fn conflicts_only_for_unique_violations() {
        assert!(matches!(
            conflict_on_unique(sqlx::Error::RowNotFound, "taken"),
            Error::InternalError(_)
        ));
    }
}
