mod admin;
mod auth;
mod events;
mod home;
mod me;
mod notifications;
mod prelude;
mod registrations;

use actix_web::web;

/// Register every route. The root scope goes last because it matches any path.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::add_routes(web::scope("/auth")))
        .service(events::add_routes(web::scope("/events")))
        .service(registrations::add_routes(web::scope("/registrations")))
        .service(me::add_routes(web::scope("/me")))
        .service(admin::add_routes(web::scope("/admin")))
        .service(notifications::add_routes(web::scope("/notifications")))
        .service(home::add_routes(web::scope("")));
}
