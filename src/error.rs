use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Display;

/// Error handling code, specifically for actix-web. Without this, we won't be
/// able to use '?' to return errors and will have to construct responses for
/// all of them manually. Some general info on error handling in actix-web can
/// be found at:
/// https://woile.github.io/actix-website/docs/errors/
use actix_web::{
    body::{BodySize, MessageBody},
    error,
    http::{header::ContentType, StatusCode},
    middleware::ErrorHandlerResponse,
    HttpResponse,
};
use askama::Template;

/// Common errors that can be unwrapped in handlers.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // We can't use #[error] because of special handling for InternalError.
    InternalError(#[from] anyhow::Error),
    /// Form fields failed validation.
    ValidationError(#[from] validator::ValidationErrors),
    /// Not logged in, or the session is unusable.
    AuthenticationError(String),
    /// Logged in, but not allowed to do this.
    AuthorizationError(String),
    NotFound(String),
    Conflict(String),
    AppError(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(what: &str) -> Self {
        Error::NotFound(format!("{what} not found."))
    }

    pub fn forbidden() -> Self {
        Error::AuthorizationError("You don't have permission to do that.".to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // For security reasons, we shouldn't show detailed error
            // messages in production:
            // https://owasp.org/www-community/Improper_Error_Handling
            Error::InternalError(err) => {
                if cfg!(debug_assertions) {
                    write!(f, "Internal error: {:?}", err)?;
                } else {
                    write!(f, "An internal error occurred.")?;
                }
            }
            Error::ValidationError(errors) => {
                write!(f, "Invalid input: {errors}")?;
            }
            Error::AuthenticationError(err)
            | Error::AuthorizationError(err)
            | Error::NotFound(err)
            | Error::Conflict(err)
            | Error::AppError(err) => {
                write!(f, "{err}")?;
            }
        }
        Ok(())
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub backtrace: &'a Backtrace,
    pub status: &'a StatusCode,
    pub message: &'a String,
}

impl<'a> ErrorTemplate<'a> {
    fn show_backtrace(&self) -> bool {
        cfg!(debug_assertions) && self.backtrace.status() == BacktraceStatus::Captured
    }
}

impl error::ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        let disabled = Backtrace::disabled();
        let backtrace = if let Error::InternalError(anyhow_err) = &self {
            log::error!("{:?}", anyhow_err);
            anyhow_err.backtrace()
        } else {
            &disabled
        };
        let status_code = self.status_code();
        HttpResponse::build(status_code)
            .content_type(ContentType::html())
            .body(
                ErrorTemplate {
                    backtrace,
                    status: &status_code,
                    message: &self.to_string(),
                }
                .to_string(),
            )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ValidationError(_) => StatusCode::BAD_REQUEST,
            Error::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Error::AuthorizationError(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::AppError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Magic function to serve a custom 404 page. Responses that already carry a
/// body (from [`Error::NotFound`]) are passed through.
pub fn custom_404<B: MessageBody>(
    res: actix_web::dev::ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    if !matches!(res.response().body().size(), BodySize::None | BodySize::Sized(0)) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    // Decompose the existing response, override the body, and reconstruct it.
    let (req, res) = res.into_parts();
    let res = res.set_body(
        ErrorTemplate {
            backtrace: &Backtrace::disabled(),
            status: &StatusCode::NOT_FOUND,
            message: &format!("The page \"{}\" doesn't exist.", req.path()),
        }
        .to_string(),
    );

    let mut res = actix_web::dev::ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    res.headers_mut().insert(
        actix_web::http::header::CONTENT_TYPE,
        actix_web::http::header::HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Ok(ErrorHandlerResponse::Response(res))
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;

    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::AuthenticationError("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::forbidden().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("Event").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::AppError("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::from(anyhow::anyhow!("db down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_page_shows_message() {
        let response = Error::not_found("Event").error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::not_found("Event").to_string(), "Event not found.");
    }
}
