use std::path::PathBuf;

use clap::Parser;
use error_stack::{Report, ResultExt};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use bertron_core::EntityRepository;
use bertron_ingest::{Ingestor, SchemaDocument};
use repositories::mongodb::entities::{ConnectionDetails, EntityRepo};

const DEFAULT_SCHEMA_URL: &str = "https://raw.githubusercontent.com/ber-data/bertron-schema/v0.1.0-alpha.11/src/schema/jsonschema/bertron_schema.json";

/// Ingest BERtron entity records into MongoDB.
#[derive(Debug, Parser)]
#[command(name = "bertron-ingest")]
struct Args {
    /// MongoDB connection URI
    #[arg(long, default_value = "mongodb://localhost:27017")]
    mongo_uri: String,

    /// MongoDB database name
    #[arg(long, default_value = "bertron")]
    db_name: String,

    /// Path or URL to the BERtron schema JSON file
    #[arg(long, default_value = DEFAULT_SCHEMA_URL)]
    schema_path: String,

    /// Path to the input JSON file or directory
    #[arg(long)]
    input: PathBuf,

    /// Delete the existing entity collection before ingesting new data
    #[arg(long)]
    clean: bool,
}

#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error("failed to connect to MongoDB")]
    Connect,
    #[error("failed to load the entity schema")]
    Schema,
    #[error("failed to prepare the entity collection")]
    Collection,
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = try_main().await {
        error!("ingestion aborted: {e:?}");
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("BERTRON_LOG"))
        .init();
}

async fn try_main() -> Result<(), Report<SetupError>> {
    let args = Args::parse();

    info!("connecting to MongoDB at {}", args.mongo_uri);
    let repo = EntityRepo::init(ConnectionDetails::Url(args.mongo_uri), &args.db_name)
        .await
        .change_context(SetupError::Connect)?;

    if !repo.ping().await {
        return Err(Report::new(SetupError::Connect).attach("database did not answer a ping"));
    }

    let schema = SchemaDocument::load(&args.schema_path)
        .await
        .change_context(SetupError::Schema)?;

    let ingestor = Ingestor::new(repo, schema);

    if args.clean {
        info!("clean flag enabled - removing existing collection");
        ingestor.clean().await.change_context(SetupError::Collection)?;
    }

    // indexes go in before the data so geo queries work from the first batch
    ingestor
        .ensure_indexes()
        .await
        .change_context(SetupError::Collection)?;

    let stats = if args.input.is_dir() {
        ingestor.ingest_directory(&args.input).await
    } else {
        info!("processing file: {}", args.input.display());
        ingestor.ingest_file(&args.input).await
    };

    info!("ingestion completed");
    info!("total processed: {}", stats.processed);
    info!("valid entities: {}", stats.valid);
    info!("invalid entities: {}", stats.invalid);
    info!("inserted entities: {}", stats.inserted);
    info!("errors: {}", stats.error);

    Ok(())
}
