//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把各项能力串成完整流程并管理后台任务，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `uploader` - 上传器
//! - 校验文件，写入对象存储
//! - 提交后台解析任务，创建任务记录
//!
//! ### `status_poller` - 任务状态轮询器
//! - 固定间隔查询任务状态，单飞
//! - 句柄停止或丢弃即停止轮询
//!
//! ### `pipeline` - 文档流水线
//! - 上传 → 轮询 → 提取 → 生成
//!
//! ### `app` - 命令行应用
//! - 持有对外连接，驱动各子命令
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! pipeline (uploader + status_poller)
//!     ↓
//! workflow::IngestionFlow (处理单个已完成任务)
//!     ↓
//! services (能力层：校验 / 主题 / 题目 / 评分)
//!     ↓
//! clients + infrastructure (外部服务与存储)
//! ```

pub mod app;
pub mod pipeline;
pub mod status_poller;
pub mod uploader;

// 重新导出主要类型
pub use app::App;
pub use pipeline::{DocumentPipeline, PipelineDeps, PipelineRun, WatchResult};
pub use status_poller::{PollEvent, PollOutcome, PollStats, PollerHandle, StatusPoller};
pub use uploader::{storage_path, UploadOutcome, UploadRequest, Uploader};
