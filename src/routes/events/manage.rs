use super::fetch_event;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(manage_event)
}

/// A registration with the volunteer's contact details.
#[derive(sqlx::FromRow, Debug)]
struct Registrant {
    #[sqlx(flatten)]
    registration: Registration,
    name: Option<String>,
    email: String,
}

impl Registrant {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn registered_display(&self) -> String {
        self.registration.created_at.format("%d/%m/%Y").to_string()
    }
}

#[derive(Template)]
#[template(path = "events/manage.html")]
struct ManageEventTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    event: &'a Event,
    registrants: &'a Vec<Registrant>,
    has_ended: bool,
}

impl<'a> ManageEventTemplate<'a> {
    fn statuses(&self) -> &'static [RegistrationStatus] {
        RegistrationStatus::ALL
    }
}

#[get("/{event_id}/manage")]
async fn manage_event(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;

    let event = fetch_event(&app_state.db_pool, event_id).await?;
    permissions::require_manage(&user, event.creator_id)?;

    let registrants: Vec<Registrant> = sqlx::query_as(
        r#"
        select registration.*, account.name, account.email
        from registration
          join account on account.id = registration.user_id
        where registration.event_id = $1
        order by registration.created_at asc
        "#,
    )
    .bind(event_id)
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch registrations")?;

    Ok(ManageEventTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        event: &event,
        registrants: &registrants,
        has_ended: event.has_ended(Utc::now()),
    }
    .to_response())
}
