use std::str::FromStr;

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgSslMode},
};

pub mod memory;
pub mod user;

pub mod models {
    pub mod user;
}

pub use memory::InMemoryUserStore;
pub use user::{PgUserStore, UserStore};

type SetupError = Box<dyn std::error::Error>;

/// Connects to the database, creating it first when it does not exist yet,
/// and runs the embedded migrations.
pub async fn setup(database_url: &str, require_ssl: bool) -> Result<PgPool, SetupError> {
    let options = connect_options(database_url, require_ssl)?;
    create_database_if_missing(&options).await?;

    let pool = PgPool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

fn connect_options(database_url: &str, require_ssl: bool) -> Result<PgConnectOptions, SetupError> {
    let options = PgConnectOptions::from_str(database_url)?;
    Ok(if require_ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

/// The maintenance database `postgres` is used to create the target one.
async fn create_database_if_missing(options: &PgConnectOptions) -> Result<(), SetupError> {
    let name = options
        .get_database()
        .ok_or("DATABASE_URL does not name a database")?
        .to_string();
    if name.contains('"') {
        return Err(format!("Unsupported database name {}", name).into());
    }

    let maintenance = PgPool::connect_with(options.clone().database("postgres")).await?;
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&name)
            .fetch_one(&maintenance)
            .await?;
    if !exists {
        sqlx::query(&format!("CREATE DATABASE \"{}\"", name))
            .execute(&maintenance)
            .await?;
    }
    maintenance.close().await;
    Ok(())
}
