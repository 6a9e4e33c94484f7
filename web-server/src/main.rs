use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor::config::Settings;
use advisor_web_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "advisor=info,advisor_web_server=info,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    info!("connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    let state = AppState::new(pool, &settings);
    let app = build_router(state);

    info!(addr = %settings.bind_addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
