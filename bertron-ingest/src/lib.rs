pub mod pipeline;
pub mod projector;
pub mod schema;
pub mod stats;

pub use pipeline::Ingestor;
pub use schema::SchemaDocument;
pub use stats::IngestStats;
