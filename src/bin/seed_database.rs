use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tsness::config::{run_migrations, DatabaseConfig, DatabaseSeeder, SeedConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== tsness database seeder ===");

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;

    DatabaseSeeder::new(pool, SeedConfig::from_env()).seed_all().await?;

    info!("Seeding finished");
    Ok(())
}
