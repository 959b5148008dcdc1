use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(registered_events).service(created_events)
}

/// One of the user's registrations, with the event it is for.
#[derive(sqlx::FromRow, Debug)]
struct RegisteredEvent {
    #[sqlx(flatten)]
    event: Event,
    registration_status: RegistrationStatus,
}

#[derive(Template)]
#[template(path = "events/registered.html")]
struct RegisteredEventsTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    upcoming: &'a Vec<RegisteredEvent>,
    past: &'a Vec<RegisteredEvent>,
}

/// Events the user signed up for, split into upcoming and past.
#[get("/registered")]
async fn registered_events(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;

    let registrations: Vec<RegisteredEvent> = sqlx::query_as(
        r#"
        select event.*, registration.status as registration_status
        from registration
          join event on event.id = registration.event_id
        where registration.user_id = $1
        order by event.start_date_time desc
        "#,
    )
    .bind(user.id)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch registered events")?;

    let now = Utc::now();
    let (upcoming, past): (Vec<_>, Vec<_>) = registrations
        .into_iter()
        .partition(|registered| registered.event.is_upcoming(now));

    Ok(RegisteredEventsTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        upcoming: &upcoming,
        past: &past,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "events/created.html")]
struct CreatedEventsTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    events: &'a Vec<Event>,
}

/// Events the current event manager created, newest first.
#[get("/created")]
async fn created_events(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_event_creator_role(&user)?;

    let events: Vec<Event> = sqlx::query_as(
        r#"
        select *
        from event
        where creator_id = $1
        order by created_at desc
        "#,
    )
    .bind(user.id)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch created events")?;

    Ok(CreatedEventsTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        events: &events,
    }
    .to_response())
}
