pub mod document_ai_client;
pub mod llm_client;

pub use document_ai_client::{DocumentAiClient, DocumentProcessor};
pub use llm_client::LlmClient;
