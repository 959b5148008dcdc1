use crate::routes::prelude::*;

const LIST_LIMIT: i64 = 50;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(list).service(mark_all_read)
}

/// Write a notification for `user_id`. Works inside or outside a transaction.
pub async fn create<'c, E: sqlx::Executor<'c, Database = sqlx::Postgres>>(
    db: E,
    id: Uuid,
    user_id: Uuid,
    message: &str,
    href: Option<&str>,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into notification (id, user_id, message, href)
        values ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(message)
    .bind(href)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Template)]
#[template(path = "notifications.html")]
struct NotificationsTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    notifications: &'a Vec<Notification>,
}

#[get("/")]
async fn list(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;

    let notifications: Vec<Notification> = sqlx::query_as(
        r#"
        select id, user_id, message, href, is_read, created_at
        from notification
        where user_id = $1
        order by created_at desc
        limit $2
        "#,
    )
    .bind(user.id)
    .bind(LIST_LIMIT)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch notifications")?;

    Ok(NotificationsTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        notifications: &notifications,
    }
    .to_response())
}

#[post("/read")]
async fn mark_all_read(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let session_info = app_state.require_session(&request).await?;

    let updated = sqlx::query(
        r#"
        update notification
        set is_read = true
        where user_id = $1 and not is_read
        "#,
    )
    .bind(session_info.account_id())
    .execute(&app_state.db_pool)
    .await
    .context("Failed to mark notifications read")?
    .rows_affected();
    trace!("Marked {updated} notifications read");

    Ok(see_other("/notifications/".to_string()))
}
