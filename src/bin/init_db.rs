use anyhow::{Context, Result};
use dotenvy::dotenv;
use research_metrics::{db, init_tracing, seed};
use tracing::error;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        error!(?err, "database initialization failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;
    let pool = db::connect(&database_url).await?;

    seed::reset_and_seed(&pool).await?;

    println!("Database initialized with demo data.");
    Ok(())
}
