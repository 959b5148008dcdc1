use actix_web::cookie::Cookie;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;

use crate::key;
use crate::routes::prelude::*;
use crate::session::{self, SESSION_ID_COOKIE};

const PASSWORD_RESET_TTL_SEC: i64 = 60 * 60;
const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent to it.";

/// Add auth-related routes.
pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(register_form)
        .service(register_submit)
        .service(email_available)
        .service(login_form)
        .service(login_submit)
        .service(logout)
        .service(forgot_password_form)
        .service(forgot_password_submit)
        .service(reset_password_form)
        .service(reset_password_submit)
}

#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
}

#[get("/register")]
async fn register_form(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let current_user = app_state.current_user(&request).await;
    Ok(RegisterTemplate {
        config: &app_state.config,
        current_user: &current_user,
    }
    .to_response())
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterForm {
    #[validate(email(message = "Enter a valid email address"))]
    email: String,
    #[validate(length(max = 100, message = "Name is too long"))]
    name: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

#[post("/register")]
async fn register_submit(
    app_state: web::Data<AppState>,
    form: web::Form<RegisterForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let form = form.into_inner();
    form.validate()?;
    let email = validation::normalize_email(&form.email);
    let name = validation::optional_text(form.name);
    let password_hash = hash_password(form.password).await?;

    let (account_id,): (Uuid,) = sqlx::query_as(
        r#"
        insert into account (id, email, name, password_hash)
        values ($1, $2, $3, $4)
        returning id
        "#,
    )
    .bind(app_state.new_id())
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .fetch_one(&app_state.db_pool)
    .await
    .map_err(|err| conflict_on_unique(err, "That email is already in use."))?;
    info!("Registered account {account_id}");

    logged_in_response(
        &app_state,
        account_id,
        request.cookie(SESSION_ID_COOKIE),
        "Account created successfully. You are now logged in.",
    )
    .await
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: String,
}

/// Inline availability check for the registration form.
#[get("/email_available")]
async fn email_available(
    app_state: web::Data<AppState>,
    params: web::Query<EmailQuery>,
) -> impl Responder {
    let email = validation::normalize_email(&params.email);
    match sqlx::query_as(
        r#"
        select exists(
          select 1
          from account
          where email = $1
          limit 1
        )
        "#,
    )
    .bind(&email)
    .fetch_one(&app_state.db_pool)
    .await
    {
        Ok((true,)) => FailureTemplate {
            text: format!("{email} is already registered").as_str(),
        }
        .to_response(),
        Ok((false,)) => SuccessTemplate {
            text: format!("{email} is available").as_str(),
        }
        .to_response(),
        Err(err) => {
            warn!("Failed to check email availability: {err}");
            HttpResponse::InternalServerError().body("database error")
        }
    }
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
}

#[get("/login")]
async fn login_form(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let current_user = app_state.current_user(&request).await;
    Ok(LoginTemplate {
        config: &app_state.config,
        current_user: &current_user,
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(sqlx::FromRow)]
struct Credentials {
    id: Uuid,
    password_hash: String,
    status: AccountStatus,
}

#[post("/login")]
async fn login_submit(
    app_state: web::Data<AppState>,
    form: web::Form<LoginForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let LoginForm { email, password } = form.into_inner();
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::AppError(
            "Please enter your email and password.".to_string(),
        ));
    }

    let credentials: Option<Credentials> = sqlx::query_as(
        r#"
        select id, password_hash, status
        from account
        where email = $1
        "#,
    )
    .bind(validation::normalize_email(&email))
    .fetch_optional(&app_state.db_pool)
    .await
    .context("Failed to look up account")?;

    let bad_credentials =
        || Error::AuthenticationError("Incorrect email or password.".to_string());
    let Some(credentials) = credentials else {
        return Err(bad_credentials());
    };
    let password_hash = credentials.password_hash;
    let password_ok = web::block(move || bcrypt::verify(password, &password_hash))
        .await
        .context("Password check was cancelled")?
        .context("Failed to check password")?;
    if !password_ok {
        return Err(bad_credentials());
    }
    if credentials.status == AccountStatus::Locked {
        return Err(Error::AuthorizationError(
            "Your account has been locked.".to_string(),
        ));
    }

    let previous_session = request.cookie(SESSION_ID_COOKIE);
    if previous_session.is_some() {
        trace!("Clearing a previous session on new login");
    }
    logged_in_response(
        &app_state,
        credentials.id,
        previous_session,
        "You are now logged in.",
    )
    .await
}

#[get("/logout")]
async fn logout(app_state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    if let Some(mut session_id) = request.cookie(SESSION_ID_COOKIE) {
        trace!("Logging out session {:?}", session_id);
        session::destroy_session(&app_state.redis_pool, session_id.value())
            .await
            .context("Failed to clear session")?;

        let mut response = MessagePageTemplate {
            config: &app_state.config,
            current_user: &None,
            page_title: &Some("Logged out"),
            message: "You are now logged out. Goodbye.",
        }
        .to_response();

        // We must re-set some attributes that aren't transmitted with the
        // cookie in the request, otherwise removal won't work.
        session_id.set_path("/");
        response
            .add_removal_cookie(&session_id)
            .context("Failed to set removal cookie")?;
        Ok(response)
    } else {
        Ok(MessagePageTemplate {
            config: &app_state.config,
            current_user: &None,
            page_title: &Some("Logged out"),
            message: "You were already logged out.",
        }
        .to_response())
    }
}

#[derive(Template)]
#[template(path = "auth/forgot_password.html")]
struct ForgotPasswordTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
}

#[get("/forgot_password")]
async fn forgot_password_form(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let current_user = app_state.current_user(&request).await;
    Ok(ForgotPasswordTemplate {
        config: &app_state.config,
        current_user: &current_user,
    }
    .to_response())
}

#[derive(Debug, Deserialize, Validate)]
struct ForgotPasswordForm {
    #[validate(email(message = "Enter a valid email address"))]
    email: String,
}

#[post("/forgot_password")]
async fn forgot_password_submit(
    app_state: web::Data<AppState>,
    form: web::Form<ForgotPasswordForm>,
) -> Result<impl Responder> {
    form.validate()?;
    let email = validation::normalize_email(&form.email);

    let account: Option<(Uuid,)> = sqlx::query_as("select id from account where email = $1")
        .bind(&email)
        .fetch_optional(&app_state.db_pool)
        .await
        .context("Failed to look up account")?;

    // Respond the same way whether or not the account exists.
    if let Some((account_id,)) = account {
        let token = new_reset_token();
        store_reset_token(&app_state, account_id, &token).await?;

        let reset_url = format!(
            "{}/auth/reset_password?token={token}",
            app_state.config.base_url.trim_end_matches('/')
        );
        let body = PasswordResetEmail {
            site_name: &app_state.config.site_name,
            reset_url: &reset_url,
        }
        .render()
        .context("Failed to render reset email")?;
        app_state.mailer.send(
            &email,
            &format!("Password reset for {}", app_state.config.site_name),
            body,
        );
        info!("Issued password reset token for account {account_id}");
    }

    Ok(MessagePageTemplate {
        config: &app_state.config,
        current_user: &None,
        page_title: &Some("Check your email"),
        message: FORGOT_PASSWORD_MESSAGE,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "auth/reset_password_email.html")]
struct PasswordResetEmail<'a> {
    site_name: &'a str,
    reset_url: &'a str,
}

/// Replaces any outstanding token for the account, so only the newest link
/// works.
async fn store_reset_token(app_state: &AppState, account_id: Uuid, token: &str) -> Result<()> {
    let redis = &app_state.redis_pool;
    if let Some(previous) = redis
        .getdel::<Option<String>, _>(key::password_reset_account(account_id))
        .await
        .context("Failed to look up previous reset token")?
    {
        redis
            .del::<i64, _>(key::password_reset(&previous))
            .await
            .context("Failed to revoke previous reset token")?;
    }
    redis
        .set::<(), _, _>(
            key::password_reset(token),
            account_id.simple().to_string(),
            Some(Expiration::EX(PASSWORD_RESET_TTL_SEC)),
            None,
            false,
        )
        .await
        .context("Failed to store reset token")?;
    redis
        .set::<(), _, _>(
            key::password_reset_account(account_id),
            token.to_string(),
            Some(Expiration::EX(PASSWORD_RESET_TTL_SEC)),
            None,
            false,
        )
        .await
        .context("Failed to store reset token owner")?;
    Ok(())
}

#[derive(Template)]
#[template(path = "auth/reset_password.html")]
struct ResetPasswordTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordQuery {
    token: String,
}

#[get("/reset_password")]
async fn reset_password_form(
    app_state: web::Data<AppState>,
    query: web::Query<ResetPasswordQuery>,
) -> Result<impl Responder> {
    if !validation::reset_token(&query.token) {
        return Err(invalid_reset_token());
    }
    Ok(ResetPasswordTemplate {
        config: &app_state.config,
        current_user: &None,
        token: &query.token,
    }
    .to_response())
}

#[derive(Debug, Deserialize, Validate)]
struct ResetPasswordForm {
    token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

#[post("/reset_password")]
async fn reset_password_submit(
    app_state: web::Data<AppState>,
    form: web::Form<ResetPasswordForm>,
) -> Result<impl Responder> {
    let form = form.into_inner();
    if !validation::reset_token(&form.token) {
        return Err(invalid_reset_token());
    }
    form.validate()?;

    let account_id = match app_state
        .redis_pool
        .getdel::<Option<String>, _>(key::password_reset(&form.token))
        .await
        .context("Failed to look up reset token")?
    {
        Some(account_id) => Uuid::try_parse(&account_id).context("Corrupted reset token")?,
        None => return Err(invalid_reset_token()),
    };
    if let Err(err) = app_state
        .redis_pool
        .del::<i64, _>(key::password_reset_account(account_id))
        .await
    {
        warn!("Ignored error clearing reset token owner: {err}");
    }

    let password_hash = hash_password(form.password).await?;
    let updated = sqlx::query("update account set password_hash = $1 where id = $2")
        .bind(&password_hash)
        .bind(account_id)
        .execute(&app_state.db_pool)
        .await
        .context("Failed to update password")?
        .rows_affected();
    if updated == 0 {
        return Err(invalid_reset_token());
    }
    info!("Reset password for account {account_id}");

    Ok(MessagePageTemplate {
        config: &app_state.config,
        current_user: &None,
        page_title: &Some("Password updated"),
        message: "Your password has been updated. You can now log in.",
    }
    .to_response())
}

fn invalid_reset_token() -> Error {
    Error::AppError("This reset link is invalid or has expired.".to_string())
}

/// 32 random bytes, hex encoded.
fn new_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

async fn hash_password(password: String) -> Result<String> {
    Ok(
        web::block(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await
            .context("Password hashing was cancelled")?
            .context("Failed to hash password")?,
    )
}

/// Starts a session and shows a confirmation page carrying the new cookie.
async fn logged_in_response(
    app_state: &AppState,
    account_id: Uuid,
    previous_session: Option<Cookie<'_>>,
    message: &str,
) -> Result<HttpResponse> {
    let cookie = session::create_session(&app_state.redis_pool, account_id, previous_session)
        .await
        .context("Failed to record new session")?;

    let mut response = MessagePageTemplate {
        config: &app_state.config,
        current_user: &None,
        page_title: &Some("Logged in"),
        message,
    }
    .to_response();
    response
        .add_cookie(&cookie)
        .context("Error setting session cookie on request")?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_well_formed() {
        let token = new_reset_token();
        assert!(validation::reset_token(&token));
        assert_ne!(token, new_reset_token());
    }

    #[test]
    fn register_form_validation() {
        let form = RegisterForm {
            email: "not-an-email".to_string(),
            name: None,
            password: "secret1".to_string(),
        };
        assert!(form.validate().is_err());

        let form = RegisterForm {
            email: "ana@example.com".to_string(),
            name: Some("Ana".to_string()),
            password: "12345".to_string(),
        };
        assert!(form.validate().is_err());

        let form = RegisterForm {
            email: "ana@example.com".to_string(),
            name: None,
            password: "123456".to_string(),
        };
        assert!(form.validate().is_ok());
    }
}
