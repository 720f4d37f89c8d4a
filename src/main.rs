use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lean_exam_pipeline::models::PracticalScores;
use lean_exam_pipeline::utils::logging;
use lean_exam_pipeline::{App, Config};

#[derive(Parser)]
#[command(name = "lean-exam")]
#[command(about = "精益培训考试：文档出题流水线与成绩评审")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 上传 PDF 培训资料并生成草稿题目
    Upload { file: PathBuf },

    /// 跟进一个已提交的解析任务
    Poll { operation_id: String },

    /// 根据 TOML 答题卡统计理论成绩
    Grade { sheet: PathBuf },

    /// 顾问提交五项实操分数
    Review {
        attempt_id: String,
        #[arg(long)]
        perfil: f64,
        #[arg(long)]
        kaizen: f64,
        #[arg(long)]
        herramientas: f64,
        #[arg(long)]
        involucramiento: f64,
        #[arg(long)]
        sostenimiento: f64,
    },

    /// 打印知识类型 × 认知层级的题目分布
    Matrix {
        #[arg(long)]
        job: Option<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Upload { .. } => "upload",
            Commands::Poll { .. } => "poll",
            Commands::Grade { .. } => "grade",
            Commands::Review { .. } => "review",
            Commands::Matrix { .. } => "matrix",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::initialize(config, cli.command.name())?;

    match cli.command {
        Commands::Upload { file } => app.upload(&file).await,
        Commands::Poll { operation_id } => app.poll(&operation_id).await,
        Commands::Grade { sheet } => app.grade(&sheet).await,
        Commands::Review {
            attempt_id,
            perfil,
            kaizen,
            herramientas,
            involucramiento,
            sostenimiento,
        } => {
            let scores = PracticalScores {
                perfil,
                kaizen,
                herramientas,
                involucramiento,
                sostenimiento,
            };
            app.review(&attempt_id, scores).await
        }
        Commands::Matrix { job } => app.matrix(job.as_deref()).await,
    }
}
