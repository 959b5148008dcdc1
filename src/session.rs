use std::collections::HashMap;

use actix_web::cookie::{self, Cookie};
use fred::clients::RedisPool;
use fred::error::RedisError;
use fred::interfaces::{HashesInterface, KeysInterface};
use log::trace;
use rand::distributions::{Alphanumeric, DistString};
use uuid::Uuid;

use crate::key;

pub const SESSION_ID_COOKIE: &str = "sid";
const SESSION_TTL_DAYS: i64 = 30;
const SESSION_TTL_SEC: i64 = SESSION_TTL_DAYS * 24 * 60 * 60;

/// Records a new session for the account and returns the cookie to set. Any
/// previous session on this browser is removed.
pub async fn create_session<'a>(
    redis_pool: &RedisPool,
    account_id: Uuid,
    previous_session: Option<Cookie<'_>>,
) -> std::result::Result<Cookie<'a>, RedisError> {
    let session_id = Alphanumeric.sample_string(&mut rand::thread_rng(), 32);
    if let Some(previous_session) = previous_session {
        trace!("Also cleaning up previous session as part of login");
        redis_pool
            .del::<i64, _>(key::session(previous_session.value()))
            .await?;
    }
    redis_pool
        .hset::<i64, _, _>(
            key::session(&session_id),
            HashMap::from([("account_id", account_id.simple().to_string())]),
        )
        .await?;
    redis_pool
        .expire::<i64, _>(key::session(&session_id), SESSION_TTL_SEC)
        .await?;

    Ok(session_cookie(session_id))
}

/// Removes the server side record of a session.
pub async fn destroy_session(
    redis_pool: &RedisPool,
    session_id: &str,
) -> std::result::Result<(), RedisError> {
    redis_pool.del::<i64, _>(key::session(session_id)).await?;
    Ok(())
}

fn session_cookie<'a>(session_id: String) -> Cookie<'a> {
    let mut cookie_builder = Cookie::build(SESSION_ID_COOKIE, session_id)
        .path("/")
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(SESSION_TTL_SEC))
        // Must be lax to be sent when navigating from externally linked pages.
        .same_site(cookie::SameSite::Lax);
    if !cfg!(debug_assertions) {
        // In production, we will likely use a reverse proxy like Nginx or
        // Cloudflare to implement SSL.
        cookie_builder = cookie_builder.secure(true);
    }
    cookie_builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("a".repeat(32));
        assert_eq!(cookie.name(), SESSION_ID_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(cookie::SameSite::Lax));
        assert_eq!(
            cookie.max_age(),
            Some(cookie::time::Duration::days(SESSION_TTL_DAYS))
        );
    }
}
