pub mod attempt;
pub mod job;
pub mod loaders;
pub mod question;
pub mod taxonomy;

pub use attempt::{AttemptStatus, CategoryScore, ExamAttempt, PracticalScores};
pub use job::{JobStatus, JobStatusReport, OperationId, UploadJob};
pub use loaders::{load_exam_sheet, ExamSheet, SheetQuestion};
pub use question::{DraftQuestion, ReviewStatus, Topic};
pub use taxonomy::{CognitiveLevel, KnowledgeType};
