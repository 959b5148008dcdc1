use std::collections::HashMap;

use actix_web::HttpRequest;
use anyhow::Context;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use fred::{
    clients::RedisPool,
    interfaces::{HashesInterface, KeysInterface},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::email::Mailer;
use crate::error::{Error, Result};
use crate::key;
use crate::models::{AccountStatus, Role};
use crate::session::SESSION_ID_COOKIE;

/// Data associated with a session.
pub struct SessionInfo {
    pub user: CurrentUser,
}

impl SessionInfo {
    pub fn account_id(&self) -> Uuid {
        self.user.id
    }
}

/// Data necessary for rendering a page with a logged in user, and for
/// permission checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub unread_notifications: i64,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Account row looked up for a session. Status is checked but not kept.
#[derive(sqlx::FromRow)]
struct SessionAccount {
    #[sqlx(flatten)]
    user: CurrentUser,
    status: AccountStatus,
}

/// Actix state object that all route handlers will have access to.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: sqlx::postgres::PgPool,
    pub redis_pool: RedisPool,
    pub mailer: Mailer,
    pub regex: CompiledRegexes,
    pub uuid_seed: [u8; 6],
}

impl AppState {
    /// Helper to get a user's session details.
    pub async fn get_session(&self, request: &HttpRequest) -> Option<Result<SessionInfo>> {
        if let Some(session_cookie) = request.cookie(SESSION_ID_COOKIE) {
            Some(self.get_session_for(session_cookie.value()).await)
        } else {
            None
        }
    }

    /// Helper to get a user's session details that also requires that they be
    /// logged in.
    pub async fn require_session(&self, request: &HttpRequest) -> Result<SessionInfo> {
        match self.get_session(request).await {
            Some(session_info) => session_info,
            None => Err(Error::AuthenticationError(
                "You must be logged in to access this page.".to_string(),
            )),
        }
    }

    /// Current user for rendering, if any. Broken sessions are treated as
    /// logged out on public pages.
    pub async fn current_user(&self, request: &HttpRequest) -> Option<CurrentUser> {
        match self.get_session(request).await {
            Some(Ok(session_info)) => Some(session_info.user),
            Some(Err(err)) => {
                log::trace!("Ignoring unusable session on public page: {err}");
                None
            }
            None => None,
        }
    }

    /// New time-ordered id.
    pub fn new_id(&self) -> Uuid {
        Uuid::now_v6(&self.uuid_seed)
    }

    /// Helper function for clearing the server's session record. This has to be
    /// done if we notice it's corrupted in some way.
    fn background_clear_session(&self, session_id: &str) {
        let session_id = session_id.to_string();
        let redis_pool = self.redis_pool.clone();
        tokio::spawn(async move {
            if let Err(err) = redis_pool.del::<i64, _>(key::session(&session_id)).await {
                log::warn!("Ignored error clearing invalid session entry: {err}");
            }
        });
    }

    pub fn valid_session_id(&self, session_id: &str) -> bool {
        session_id.len() == 32 && self.regex.alphanumeric.is_match(session_id)
    }

    async fn get_session_for(&self, session_id: &str) -> Result<SessionInfo> {
        if !self.valid_session_id(session_id) {
            return Err(Error::AuthenticationError(
                "Your session was corrupted. Try logging in again.".to_string(),
            ));
        }

        let raw = self
            .redis_pool
            .hgetall::<HashMap<String, String>, _>(key::session(session_id))
            .await
            .context("Failed to retrieve session info")?;
        let account_id = match raw.get("account_id") {
            Some(account_id) => match Uuid::try_parse(account_id) {
                Ok(account_id) => account_id,
                Err(_) => {
                    log::error!("Unparseable account_id: {}", account_id);
                    self.background_clear_session(session_id);
                    return Err(Error::AuthenticationError(
                        "Your session was corrupted. Try logging in again.".to_string(),
                    ));
                }
            },
            None => {
                if !raw.is_empty() {
                    // A session hash with no account_id is invalid. Delete it.
                    self.background_clear_session(session_id);
                }
                return Err(Error::AuthenticationError(
                    "Your session expired or was corrupted. Try logging in again.".to_string(),
                ));
            }
        };

        let account: Option<SessionAccount> = sqlx::query_as(
            r#"
            select
              id, email, name, role, status,
              (
                select count(*)
                from notification
                where user_id = account.id and not is_read
              ) as unread_notifications
            from account
            where id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Failed to fetch session account")?;

        match account {
            Some(SessionAccount {
                status: AccountStatus::Active,
                user,
            }) => Ok(SessionInfo { user }),
            Some(_) => {
                self.background_clear_session(session_id);
                Err(Error::AuthorizationError(
                    "Your account has been locked.".to_string(),
                ))
            }
            None => {
                self.background_clear_session(session_id);
                Err(Error::AuthenticationError(
                    "Your account no longer exists.".to_string(),
                ))
            }
        }
    }
}

/// Struct for storing compiled regexes.
#[derive(Clone)]
pub struct CompiledRegexes {
    pub alphanumeric: regex::Regex,
}

impl CompiledRegexes {
    pub fn new() -> std::result::Result<Self, regex::Error> {
        Ok(CompiledRegexes {
            alphanumeric: regex::Regex::new(r"^[0-9A-Za-z]+$")?,
        })
    }
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub bind_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub redis_url: String,
    pub site_name: String,
    pub smtp_from: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_user: Option<String>,
}

/// Create a config builder with default values set.
pub fn config_with_defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("site_name", "VolunteerHub")?
        .set_default("base_url", "http://localhost:8080")?
        .set_default("bind_address", "127.0.0.1")?
        .set_default("db_max_connections", 5)?
        .set_default("port", 8080)?)
}

/// Load config from defaults, then `volunteerhub.toml` if present, then `VH_*`
/// environment variables.
pub fn load_config() -> std::result::Result<AppConfig, ConfigError> {
    config_with_defaults()?
        .add_source(File::with_name("volunteerhub").required(false))
        .add_source(Environment::with_prefix("VH"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_keys() {
        let config: AppConfig = config_with_defaults()
            .unwrap()
            .set_override("database_url", "postgres://localhost/volunteerhub")
            .unwrap()
            .set_override("redis_url", "redis://localhost")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.site_name, "VolunteerHub");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.smtp_host.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = config_with_defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn regexes() {
        let regex = CompiledRegexes::new().unwrap();
        assert!(regex.alphanumeric.is_match("abcDEF123"));
        assert!(!regex.alphanumeric.is_match("abc-def"));
    }
}
