//! Migration CLI tool.
//!
//! `DATABASE_URL` selects the database; run with `up`, `down`, `status`,
//! `fresh` or `refresh`.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter("info").init();

    tracing::info!("Running Blogicum migrations");
    cli::run_cli(migration::Migrator).await;
}
