pub mod ingestion_ctx;
pub mod ingestion_flow;

pub use ingestion_ctx::IngestionCtx;
pub use ingestion_flow::{FlowResult, Ingested, IngestionFlow};
