use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradeplan_backend::config::AppConfig;
use tradeplan_backend::routes;
use tradeplan_backend::services::broadcast_hub::BroadcastHub;
use tradeplan_backend::services::channel_client::ChannelClient;
use tradeplan_backend::services::ingestion::{spawn_supervised, IngestionPipeline};
use tradeplan_backend::services::listener_health::ListenerHealth;
use tradeplan_backend::services::telegram::TelegramChannelClient;
use tradeplan_backend::store::{PlanStore, SeaOrmPlanStore};
use tradeplan_backend::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tradeplan_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let store: Arc<dyn PlanStore> = Arc::new(SeaOrmPlanStore::new(db));
    let hub = BroadcastHub::new();
    let listener = ListenerHealth::new();
    let channel: Arc<dyn ChannelClient> = Arc::new(TelegramChannelClient::new(config.telegram.clone()));

    // Start the channel listener (backfill, then live updates)
    tracing::info!(
        channel_id = config.telegram.channel_id,
        backfill_limit = config.backfill_limit,
        "Starting channel listener..."
    );
    let pipeline = Arc::new(IngestionPipeline::new(store.clone(), hub.clone(), listener.clone()));
    spawn_supervised(pipeline, channel.clone(), config.backfill_limit);

    let state = AppState {
        store,
        hub,
        channel,
        listener,
        stream_heartbeat: config.stream_heartbeat,
    };

    let app = routes::app(state, &config.cors_origins);

    // Start server
    let tcp = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", tcp.local_addr()?);

    axum::serve(tcp, app).await?;

    Ok(())
}
