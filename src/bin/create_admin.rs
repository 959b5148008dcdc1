//! Bootstraps an administrator. Promotes an existing account, or creates one
//! when a password is given.

use anyhow::{bail, Context};
use concat_arrays::concat_arrays;
use uuid::Uuid;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 && args.len() != 3 {
        eprintln!("Usage: create_admin <email> [password]");
        std::process::exit(1);
    }
    let email = args[1].trim().to_lowercase();
    let password = args.get(2);

    let database_url =
        std::env::var("VH_DATABASE_URL").context("VH_DATABASE_URL env var not set")?;
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let promoted = sqlx::query(
        r#"
        update account
        set role = 'ADMIN', status = 'ACTIVE'
        where email = $1
        "#,
    )
    .bind(&email)
    .execute(&db_pool)
    .await
    .context("Failed to update account")?
    .rows_affected();
    if promoted > 0 {
        println!("Promoted [{email}] to administrator");
        return Ok(());
    }

    let Some(password) = password else {
        bail!("No account with email [{email}]. Pass a password to create one.");
    };
    let password_hash =
        bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
    sqlx::query(
        r#"
        insert into account (id, email, password_hash, role)
        values ($1, $2, $3, 'ADMIN')
        "#,
    )
    .bind(Uuid::now_v6(&concat_arrays!(
        std::process::id().to_ne_bytes(),
        [0; 2]
    )))
    .bind(&email)
    .bind(password_hash)
    .execute(&db_pool)
    .await
    .context("Failed to create account")?;
    println!("Created administrator [{email}]");

    Ok(())
}
