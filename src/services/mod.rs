pub mod competency_matrix;
pub mod llm_json;
pub mod question_generator;
pub mod review_service;
pub mod scoring_service;
pub mod topic_extractor;
pub mod upload_validator;

pub use competency_matrix::CompetencyMatrix;
pub use question_generator::{GeneratedQuestion, LlmQuestionGenerator, QuestionGenerator};
pub use review_service::ReviewService;
pub use topic_extractor::{LlmTopicExtractor, TopicExtractor};
pub use upload_validator::{DocumentKind, UploadValidator};
