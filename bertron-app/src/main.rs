use axum::Router;
use dotenv::dotenv;
use error_stack::ResultExt;
use error_stack::fmt::ColorMode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use bertron_routes::service::EntityService;
use bertron_routes::state::{BertronAppState, VersionInfo};
use repositories::mongodb::entities::{ConnectionDetails, EntityRepo};

use crate::config::Settings;
use crate::server::{AppError, AppProperties, AppResult};

mod config;
mod server;

#[tokio::main]
async fn main() {
    match try_main().await {
        Ok(_) => info!("bertron api shutting down"),
        Err(e) => {
            error!("bertron api exited with error: {e:?}");
        }
    }
}

fn init_logging() {
    error_stack::Report::set_color_mode(ColorMode::None);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("BERTRON_LOG"))
        .init();
}

async fn try_main() -> AppResult<()> {
    init_logging();

    if let Err(e) = dotenv() {
        warn!("failed to load .env file: {e}");
    }

    let settings = Settings::from_env();
    let port = settings.port;

    let routes = build_routes(settings).await?;

    server::run(routes, AppProperties { port }).await
}

async fn build_routes(settings: Settings) -> AppResult<Router> {
    info!(
        "connecting to MongoDB at {}:{}, database {}",
        settings.mongo_host, settings.mongo_port, settings.mongo_database
    );

    let repo = EntityRepo::init(
        ConnectionDetails::Url(settings.mongo_uri()),
        &settings.mongo_database,
    )
    .await
    .change_context(AppError)?;

    debug!("building routes..");
    Ok(bertron_routes::routes::build(BertronAppState::new(
        EntityService::new(repo),
        VersionInfo::from_env(),
    )))
    .inspect(|_| debug!("routes built"))
}
