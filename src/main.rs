use actix_web::{http::StatusCode, middleware, web, App, HttpServer};
use anyhow::Context;
use concat_arrays::concat_arrays;
use env_logger::Env;
use fred::{clients::RedisPool, interfaces::ClientLike, types::RedisConfig};
use listenfd::ListenFd;
use log::info;

use crate::app_state::{AppState, CompiledRegexes};
use crate::email::Mailer;

mod app_state;
mod email;
mod error;
mod key;
mod lifecycle;
mod models;
mod partials;
mod permissions;
mod routes;
mod session;
mod validation;

const REDIS_POOL_SIZE: usize = 8;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = app_state::load_config().context("Failed to load config")?;

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    let redis_config =
        RedisConfig::from_url(&config.redis_url).context("Failed to parse redis_url")?;
    let redis_pool = RedisPool::new(redis_config, None, None, None, REDIS_POOL_SIZE)
        .context("Failed to create Redis pool")?;
    redis_pool
        .init()
        .await
        .context("Failed to connect to Redis")?;

    let mailer = Mailer::from_config(&config)?;
    let regex = CompiledRegexes::new().context("Failed to compile regexes")?;
    let uuid_seed = concat_arrays!(std::process::id().to_ne_bytes(), [0; 2]);

    let bind_address = (config.bind_address.clone(), config.port);
    let app_state = AppState {
        config,
        db_pool,
        redis_pool,
        mailer,
        regex,
        uuid_seed,
    };

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::ErrorHandlers::new().handler(StatusCode::NOT_FOUND, error::custom_404),
            )
            .app_data(web::Data::new(app_state.clone()))
            .configure(routes::configure)
            .wrap(middleware::Logger::default())
    });

    // Reuse a socket handed over by systemfd/cargo-watch if there is one.
    let mut listenfd = ListenFd::from_env();
    let server = if let Some(listener) = listenfd.take_tcp_listener(0)? {
        info!("Listening on inherited socket {:?}", listener.local_addr());
        server.listen(listener)?
    } else {
        info!("Listening on {}:{}", bind_address.0, bind_address.1);
        server.bind(bind_address)?
    };
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use actix_web::{cookie::Cookie, test};

    use super::*;
    use crate::session::SESSION_ID_COOKIE;

    /// State that never connects anywhere. Good for requests that are rejected
    /// before touching storage.
    fn offline_state() -> AppState {
        let config: app_state::AppConfig = app_state::config_with_defaults()
            .unwrap()
            .set_override("database_url", "postgres://localhost/volunteerhub_test")
            .unwrap()
            .set_override("redis_url", "redis://localhost")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let redis_pool = RedisPool::new(RedisConfig::default(), None, None, None, 1).unwrap();
        AppState {
            config,
            db_pool,
            redis_pool,
            mailer: Mailer::disabled(),
            regex: CompiledRegexes::new().unwrap(),
            uuid_seed: [1, 2, 3, 4, 5, 6],
        }
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .wrap(
                        middleware::ErrorHandlers::new()
                            .handler(StatusCode::NOT_FOUND, error::custom_404),
                    )
                    .app_data(web::Data::new(offline_state()))
                    .configure(routes::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn logged_out_users_are_rejected() {
        let app = test_app!();
        for uri in ["/me/registered", "/me/created", "/notifications/", "/admin/users"] {
            let request = test::TestRequest::get().uri(uri).to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[actix_web::test]
    async fn malformed_session_cookie_is_rejected() {
        let app = test_app!();
        let request = test::TestRequest::get()
            .uri("/me/registered")
            .cookie(Cookie::new(SESSION_ID_COOKIE, "not-a-session"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = test::read_body(response).await;
        assert!(String::from_utf8_lossy(&body).contains("corrupted"));
    }

    #[actix_web::test]
    async fn unknown_pages_get_the_custom_404() {
        let app = test_app!();
        let request = test::TestRequest::get().uri("/no/such/page").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = test::read_body(response).await;
        assert!(String::from_utf8_lossy(&body).contains("such"));
    }

    #[actix_web::test]
    async fn stylesheet_is_served() {
        let app = test_app!();
        let request = test::TestRequest::get().uri("/style.css").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
