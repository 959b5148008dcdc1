use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(view_event)
}

#[derive(Template)]
#[template(path = "events/view.html")]
struct ViewEventTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    event: &'a Event,
    creator_name: &'a str,
    registration: Option<RegistrationStatus>,
    active_registrations: i64,
    can_manage: bool,
    has_ended: bool,
}

impl<'a> ViewEventTemplate<'a> {
    fn is_full(&self) -> bool {
        self.active_registrations >= i64::from(self.event.max_attendees)
    }

    fn can_register(&self) -> bool {
        self.registration.is_none()
            && self.event.status.is_published()
            && !self.has_ended
            && !self.is_full()
    }

    fn can_cancel(&self) -> bool {
        self.registration
            .is_some_and(|status| lifecycle::check_can_cancel(status).is_ok())
    }
}

#[get("/{event_id}")]
async fn view_event(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let current_user = app_state.current_user(&request).await;

    let listing: EventListing = sqlx::query_as(
        r#"
        select event.*, account.name as creator_name
        from event
          join account on account.id = event.creator_id
        where event.id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(&app_state.db_pool)
    .await
    .context("Failed to fetch event")?
    .ok_or_else(|| Error::not_found("Event"))?;
    // Unpublished events don't exist as far as the public is concerned.
    if !permissions::can_view_event(current_user.as_ref(), &listing.event) {
        return Err(Error::not_found("Event"));
    }

    let active_registrations = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)
        from registration
        where event_id = $1 and status <> 'REJECTED'
        "#,
    )
    .bind(event_id)
    .fetch_one(&app_state.db_pool);
    let registration = sqlx::query_as::<_, (RegistrationStatus,)>(
        r#"
        select status
        from registration
        where event_id = $1 and user_id = $2
        "#,
    )
    .bind(event_id)
    .bind(current_user.as_ref().map(|user| user.id))
    .fetch_optional(&app_state.db_pool);
    let ((active_registrations,), registration) = try_join!(active_registrations, registration)
        .context("Failed to fetch registrations")?;

    let event = &listing.event;
    Ok(ViewEventTemplate {
        config: &app_state.config,
        current_user: &current_user,
        event,
        creator_name: listing.creator_name.as_deref().unwrap_or("Unknown"),
        registration: registration.map(|(status,)| status),
        active_registrations,
        can_manage: current_user
            .as_ref()
            .is_some_and(|user| permissions::can_manage_event(user, event)),
        has_ended: event.has_ended(Utc::now()),
    }
    .to_response())
}
