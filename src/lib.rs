//! # Lean Exam Pipeline
//!
//! 精益（Lean）培训考试系统的后台流水线
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露存储能力
//! - `BackendClient` - 托管后端（对象存储 + 数据表）
//! - `MemoryBackend` - 内存实现，用于测试
//!
//! ### ② 外部客户端（Clients）
//! - `LlmClient` - OpenAI 兼容的聊天接口
//! - `DocumentAiClient` - 文档 AI 后台解析任务
//!
//! ### ③ 业务能力层（Services）
//! - `UploadValidator` - 文件校验
//! - `TopicExtractor` / `QuestionGenerator` - 主题提取与题目生成
//! - `scoring_service` / `ReviewService` - 理论分与最终成绩
//! - `CompetencyMatrix` - 知识类型 × 认知层级覆盖
//!
//! ### ④ 流程层（Workflow）
//! - `IngestionFlow` - 一个已完成任务的提取与生成
//!
//! ### ⑤ 编排层（Orchestration）
//! - `Uploader` - 上传与提交
//! - `StatusPoller` - 单飞的任务状态轮询
//! - `DocumentPipeline` - 端到端流水线
//! - `App` - 命令行应用
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::MemoryBackend;
pub use models::{ExamAttempt, JobStatus, OperationId, PracticalScores, UploadJob};
pub use orchestrator::{App, DocumentPipeline, PollOutcome, StatusPoller, UploadOutcome, Uploader};
pub use workflow::{FlowResult, IngestionCtx, IngestionFlow};
