//! Creates the first super-admin account.
//!
//! ```text
//! seed-admin <email> <password> <full name>
//! ```
//!
//! Reads `DATABASE_URL` (and the rest of the server configuration) from the
//! environment or `.env`, applies pending migrations and inserts the account through
//! the same user service the API uses.

use std::process::ExitCode;

use morphe_cms::{
    config::AppConfig,
    crypto::password_strength_errors,
    mailer::LogMailer,
    models::CreateUserRequest,
    permissions::SUPER_ADMIN,
    repository::{PostgresRepository, Repository},
    services::users,
};
use sqlx::postgres::PgPoolOptions;
use validator::Validate;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morphe_cms=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [email, password, full_name @ ..] = args.as_slice() else {
        eprintln!("usage: seed-admin <email> <password> <full name>");
        return ExitCode::from(2);
    };
    let full_name = full_name.join(" ");

    let weaknesses = password_strength_errors(password);
    if !weaknesses.is_empty() {
        for weakness in weaknesses {
            eprintln!("password rejected: {weakness}");
        }
        return ExitCode::from(2);
    }

    match seed(email, password, &full_name).await {
        Ok(id) => {
            tracing::info!(user_id = id, %email, "super-admin created");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("seed-admin failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn seed(email: &str, password: &str, full_name: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let config = AppConfig::load();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let repo = PostgresRepository::new(pool);

    let role = repo
        .find_role_by_slug(SUPER_ADMIN)
        .await?
        .ok_or("the super-admin role is missing; migrations did not seed roles")?;

    let request = CreateUserRequest {
        email: email.to_string(),
        password: password.to_string(),
        full_name: full_name.to_string(),
        role_id: role.id,
        is_active: Some(true),
    };
    request.validate()?;

    let profile = users::create(&repo, &LogMailer, &config, request).await?;
    Ok(profile.id)
}
