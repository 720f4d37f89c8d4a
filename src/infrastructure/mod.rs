//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（HTTP 连接池、内存状态），只暴露存储能力

pub mod backend;
pub mod memory;
pub mod store;

pub use backend::BackendClient;
pub use memory::MemoryBackend;
pub use store::{AttemptStore, JobStore, ObjectStorage, QuestionStore};
