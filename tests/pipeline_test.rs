//! 端到端流水线测试：内存后端 + 假的文档服务 / 主题提取 / 题目生成

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lean_exam_pipeline::clients::DocumentProcessor;
use lean_exam_pipeline::error::{ApiError, AppError, AppResult, PipelineError};
use lean_exam_pipeline::infrastructure::{JobStore, MemoryBackend, ObjectStorage, QuestionStore};
use lean_exam_pipeline::models::{JobStatus, JobStatusReport, OperationId, Topic, UploadJob};
use lean_exam_pipeline::orchestrator::{
    DocumentPipeline, PipelineDeps, PollEvent, PollOutcome, UploadOutcome, UploadRequest, Uploader,
};
use lean_exam_pipeline::services::question_generator::CorrectOption;
use lean_exam_pipeline::services::{
    GeneratedQuestion, QuestionGenerator, TopicExtractor, UploadValidator,
};
use lean_exam_pipeline::Config;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";

struct FakeProcessor {
    statuses: Mutex<VecDeque<JobStatusReport>>,
    submits: AtomicUsize,
    status_checks: AtomicUsize,
    reject_submit: bool,
}

impl FakeProcessor {
    fn new(statuses: Vec<JobStatusReport>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            submits: AtomicUsize::new(0),
            status_checks: AtomicUsize::new(0),
            reject_submit: false,
        }
    }

    fn rejecting_submit() -> Self {
        Self {
            reject_submit: true,
            ..Self::new(vec![])
        }
    }

    fn running_then(last: JobStatusReport) -> Self {
        let mut statuses: Vec<JobStatusReport> =
            (0..5).map(|_| JobStatusReport::running()).collect();
        statuses.push(last);
        Self::new(statuses)
    }
}

#[async_trait]
impl DocumentProcessor for FakeProcessor {
    async fn submit(&self, _storage_path: &str, _mime: &str) -> AppResult<OperationId> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.reject_submit {
            return Err(AppError::bad_response(
                "/v1/documents:batchProcess",
                400,
                "unsupported document layout",
            ));
        }
        Ok(OperationId::new("op-1"))
    }

    async fn status(&self, _operation_id: &OperationId) -> AppResult<JobStatusReport> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(JobStatusReport::running))
    }

    async fn list_output_shards(&self, output_location: &str) -> AppResult<Vec<String>> {
        Ok(vec![
            format!("{}shard-0.json", output_location),
            format!("{}shard-1.json", output_location),
        ])
    }

    async fn fetch_shard_text(&self, shard: &str) -> AppResult<String> {
        if shard.ends_with("shard-0.json") {
            Ok("Las 5S: clasificar, ordenar, limpiar.".to_string())
        } else {
            Ok("Kaizen es la mejora continua.".to_string())
        }
    }
}

/// 对象存储写入一律失败
struct UnwritableStorage;

#[async_trait]
impl ObjectStorage for UnwritableStorage {
    async fn put_object(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> AppResult<()> {
        Err(AppError::bad_response(
            format!("/storage/v1/object/documents/{}", path),
            507,
            "bucket quota exceeded",
        ))
    }
}

/// 建档时报主键冲突，其余操作交给内存后端
struct ConflictingJobStore {
    inner: MemoryBackend,
}

#[async_trait]
impl JobStore for ConflictingJobStore {
    async fn create_job(&self, _job: &UploadJob) -> AppResult<()> {
        Err(AppError::bad_response(
            "/rest/v1/upload_jobs",
            409,
            "duplicate key value violates unique constraint \"upload_jobs_pkey\"",
        ))
    }

    async fn get_job(&self, operation_id: &OperationId) -> AppResult<UploadJob> {
        self.inner.get_job(operation_id).await
    }

    async fn update_status(&self, operation_id: &OperationId, status: JobStatus) -> AppResult<()> {
        self.inner.update_status(operation_id, status).await
    }

    async fn record_ingestion(
        &self,
        operation_id: &OperationId,
        output_location: &str,
        topics: &[Topic],
    ) -> AppResult<()> {
        self.inner
            .record_ingestion(operation_id, output_location, topics)
            .await
    }
}

struct FakeExtractor {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeExtractor {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl TopicExtractor for FakeExtractor {
    async fn extract_topics(&self, text: &str) -> AppResult<Vec<Topic>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(text.contains("5S") && text.contains("Kaizen"));
        if self.fail {
            return Err(AppError::Other("model unavailable".to_string()));
        }
        Ok(vec![
            Topic {
                name: "5S".to_string(),
                description: String::new(),
            },
            Topic {
                name: "Kaizen".to_string(),
                description: String::new(),
            },
        ])
    }
}

struct FakeGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeGenerator {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate(
        &self,
        topics: &[Topic],
        _context: &str,
        count: usize,
    ) -> AppResult<Vec<GeneratedQuestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Other("generation quota exceeded".to_string()));
        }
        Ok((0..count)
            .map(|i| GeneratedQuestion {
                prompt: format!("Pregunta {} sobre {}", i + 1, topics[i % topics.len()].name),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option: CorrectOption::Index(i % 4),
                rationale: String::new(),
                knowledge_type: "conceptual".to_string(),
                cognitive_level: "understand".to_string(),
                topic: Some(topics[i % topics.len()].name.clone()),
            })
            .collect())
    }
}

struct Harness {
    store: Arc<MemoryBackend>,
    processor: Arc<FakeProcessor>,
    extractor: Arc<FakeExtractor>,
    generator: Arc<FakeGenerator>,
    pipeline: DocumentPipeline,
}

fn config() -> Config {
    Config {
        poll_interval_secs: 20,
        question_batch_size: 4,
        ..Config::default()
    }
}

fn harness(processor: FakeProcessor, extractor_fails: bool, generator_fails: bool) -> Harness {
    let store = Arc::new(MemoryBackend::new());
    let processor = Arc::new(processor);
    let extractor = Arc::new(FakeExtractor::new(extractor_fails));
    let generator = Arc::new(FakeGenerator::new(generator_fails));
    let pipeline = DocumentPipeline::new(
        &config(),
        PipelineDeps {
            storage: store.clone(),
            processor: processor.clone(),
            jobs: store.clone(),
            questions: store.clone(),
            extractor: extractor.clone(),
            generator: generator.clone(),
        },
    );
    Harness {
        store,
        processor,
        extractor,
        generator,
        pipeline,
    }
}

fn pdf_request() -> UploadRequest {
    UploadRequest {
        file_name: "manual_5s.pdf".to_string(),
        mime: Some("application/pdf".to_string()),
        bytes: PDF.to_vec(),
        user_id: "consultor-7".to_string(),
    }
}

#[tokio::test]
async fn text_file_is_rejected_without_side_effects() {
    let h = harness(FakeProcessor::new(vec![]), false, false);

    let run = h
        .pipeline
        .process(
            UploadRequest {
                file_name: "notes.txt".to_string(),
                mime: Some("text/plain".to_string()),
                bytes: b"just some notes".to_vec(),
                user_id: "consultor-7".to_string(),
            },
            None,
        )
        .await;

    assert!(matches!(run.upload, UploadOutcome::Rejected(_)));
    assert!(run.watch.is_none());
    assert!(h.store.object_paths().is_empty());
    assert_eq!(h.store.job_count(), 0);
    assert_eq!(h.processor.submits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn accepted_upload_creates_exactly_one_queued_job() {
    let store = Arc::new(MemoryBackend::new());
    let processor = Arc::new(FakeProcessor::new(vec![]));
    let uploader = Uploader::new(
        UploadValidator::new(config().max_upload_bytes),
        store.clone(),
        processor.clone(),
        store.clone(),
    );

    let outcome = uploader.submit(pdf_request()).await;
    let job = outcome.job().expect("upload accepted").clone();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(store.job_count(), 1);
    assert_eq!(processor.submits.load(Ordering::SeqCst), 1);
    assert_eq!(processor.status_checks.load(Ordering::SeqCst), 0);

    let paths = store.object_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("consultor-7/"));
    assert!(paths[0].ends_with("_manual_5s.pdf"));
    assert_eq!(job.storage_path, paths[0]);
}

#[tokio::test]
async fn storage_failure_aborts_before_submitting() {
    let store = Arc::new(MemoryBackend::new());
    let processor = Arc::new(FakeProcessor::new(vec![]));
    let uploader = Uploader::new(
        UploadValidator::new(config().max_upload_bytes),
        Arc::new(UnwritableStorage),
        processor.clone(),
        store.clone(),
    );

    let outcome = uploader.submit(pdf_request()).await;

    assert!(matches!(outcome, UploadOutcome::Aborted(_)));
    assert!(outcome.user_message().contains("bucket quota exceeded"));
    assert_eq!(processor.submits.load(Ordering::SeqCst), 0);
    assert_eq!(store.job_count(), 0);
}

#[tokio::test]
async fn submit_failure_aborts_and_leaves_stored_object() {
    let store = Arc::new(MemoryBackend::new());
    let processor = Arc::new(FakeProcessor::rejecting_submit());
    let uploader = Uploader::new(
        UploadValidator::new(config().max_upload_bytes),
        store.clone(),
        processor.clone(),
        store.clone(),
    );

    let outcome = uploader.submit(pdf_request()).await;

    assert!(matches!(outcome, UploadOutcome::Aborted(_)));
    assert!(outcome.job().is_none());
    assert_eq!(processor.submits.load(Ordering::SeqCst), 1);
    // 已写入的对象不做清理
    assert_eq!(store.object_paths().len(), 1);
    assert_eq!(store.job_count(), 0);
}

#[tokio::test]
async fn job_record_failure_reports_service_detail() {
    let store = Arc::new(MemoryBackend::new());
    let processor = Arc::new(FakeProcessor::new(vec![]));
    let jobs = Arc::new(ConflictingJobStore {
        inner: MemoryBackend::new(),
    });
    let uploader = Uploader::new(
        UploadValidator::new(config().max_upload_bytes),
        store.clone(),
        processor.clone(),
        jobs.clone(),
    );

    let outcome = uploader.submit(pdf_request()).await;

    match &outcome {
        UploadOutcome::Aborted(AppError::Api(ApiError::BadResponse { status, .. })) => {
            assert_eq!(*status, 409)
        }
        other => panic!("expected aborted upload, got {:?}", other),
    }
    assert!(outcome
        .user_message()
        .contains("duplicate key value violates unique constraint"));
    assert_eq!(processor.submits.load(Ordering::SeqCst), 1);
    assert_eq!(store.object_paths().len(), 1);
    assert_eq!(jobs.inner.job_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn completed_job_is_ingested_and_generated_once() {
    let h = harness(
        FakeProcessor::running_then(JobStatusReport::completed("gs://out/op-1/")),
        false,
        false,
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let run = h.pipeline.process(pdf_request(), Some(tx)).await;
    let watch = run.watch.expect("upload accepted");

    assert!(matches!(watch.poll, PollOutcome::Completed { .. }));
    let flow = assert_ok!(watch.flow.expect("flow ran"));
    assert_eq!(flow.review_path, "/review/op-1");
    assert_eq!(flow.questions.len(), 4);

    assert_eq!(h.processor.status_checks.load(Ordering::SeqCst), 6);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);

    let job = h.store.get_job(&OperationId::new("op-1")).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_location.as_deref(), Some("gs://out/op-1/"));
    assert_eq!(job.topics.as_ref().map(Vec::len), Some(2));

    let drafts = h.store.list_by_job(&OperationId::new("op-1")).await.unwrap();
    assert_eq!(drafts.len(), 4);
    assert_eq!(drafts[0].id, "op-1-q01");

    let mut still_processing = 0;
    while let Ok(event) = rx.try_recv() {
        if let PollEvent::StillProcessing { .. } = event {
            still_processing += 1;
        }
    }
    assert_eq!(still_processing, 5);
}

#[tokio::test(start_paused = true)]
async fn failed_job_skips_ingestion_and_generation() {
    let h = harness(
        FakeProcessor::running_then(JobStatusReport::failed("corrupted document")),
        false,
        false,
    );

    let run = h.pipeline.process(pdf_request(), None).await;
    let watch = run.watch.expect("upload accepted");

    assert_eq!(
        watch.poll,
        PollOutcome::Failed {
            reason: Some("corrupted document".to_string())
        }
    );
    assert!(watch.flow.is_none());
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);

    let job = h.store.get_job(&OperationId::new("op-1")).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.topics.is_none());
}

#[tokio::test(start_paused = true)]
async fn ingestion_failure_prevents_generation() {
    let h = harness(
        FakeProcessor::new(vec![JobStatusReport::completed("gs://out/op-1/")]),
        true,
        false,
    );

    let run = h.pipeline.process(pdf_request(), None).await;
    let err = assert_err!(run.watch.expect("upload accepted").flow.expect("flow ran"));

    assert!(matches!(err, PipelineError::Ingestion { .. }));
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.list_all().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn generation_failure_keeps_ingested_topics() {
    let h = harness(
        FakeProcessor::new(vec![JobStatusReport::completed("gs://out/op-1/")]),
        false,
        true,
    );

    let run = h.pipeline.process(pdf_request(), None).await;
    let err = assert_err!(run.watch.expect("upload accepted").flow.expect("flow ran"));

    assert!(matches!(err, PipelineError::Generation { .. }));
    let job = h.store.get_job(&OperationId::new("op-1")).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.topics.as_ref().map(Vec::len), Some(2));
    assert!(h.store.list_all().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watching_an_ingested_job_again_is_refused() {
    let h = harness(
        FakeProcessor::new(vec![
            JobStatusReport::completed("gs://out/op-1/"),
            JobStatusReport::completed("gs://out/op-1/"),
        ]),
        false,
        false,
    );

    let run = h.pipeline.process(pdf_request(), None).await;
    assert!(run.watch.expect("upload accepted").is_success());

    let again = h.pipeline.watch(&OperationId::new("op-1"), None).await.unwrap();
    let err = assert_err!(again.flow.expect("flow ran"));
    assert!(matches!(err, PipelineError::AlreadyIngested { .. }));
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
}
