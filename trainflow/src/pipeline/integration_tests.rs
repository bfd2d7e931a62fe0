//! End-to-end pipeline scenarios against a filesystem object store.

use super::*;
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{PipelineEvent, PipelineState, StageKind};
use crate::errors::{IngestionError, PipelineError, StorageError, TrainingEngineError, TrainingError};
use crate::events::{CollectingEventSink, EventSink};
use crate::storage::{FsObjectStore, StorageClient};
use crate::testing::{
    assert_ingestion_materialized, assert_published, assert_training_materialized, write_weights,
    DatasetFixture, FailingTrainingEngine, FakeTrainingEngine, RecordingStorageClient,
};
use crate::training::TrainingEngine;
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Harness {
    _dir: tempfile::TempDir,
    config: PipelineConfig,
    store: FsObjectStore,
    recorder: Arc<RecordingStorageClient>,
    events: Arc<CollectingEventSink>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("remote")).unwrap();
        let weights_url = write_weights(&dir.path().join("upstream"), "yolo11n.pt").unwrap();

        let mut config = PipelineConfig::under_root(dir.path().join("artifacts"));
        config.ingestion = config
            .ingestion
            .with_data_bucket("datasets")
            .with_dataset_key("dataset.zip");
        config.training = config.training.with_weights_url(weights_url).with_epochs(1);
        config.publish = config
            .publish
            .with_model_bucket("models")
            .with_model_key("detector/best.pt");
        config.validate().unwrap();

        let recorder = Arc::new(RecordingStorageClient::new(Arc::new(store.clone())));
        Self {
            _dir: dir,
            config,
            store,
            recorder,
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    fn with_dataset(self) -> Self {
        DatasetFixture::animals()
            .publish(&self.store, "datasets", "dataset.zip")
            .unwrap();
        self
    }

    fn pipeline(&self, engine: Arc<dyn TrainingEngine>) -> TrainingPipeline {
        let storage: Arc<dyn StorageClient> = self.recorder.clone();
        TrainingPipeline::new(self.config.clone(), storage, engine).with_event_sink(self.events.clone())
    }
}

#[tokio::test]
async fn test_end_to_end_run_completes() {
    let h = Harness::new().with_dataset();
    let pipeline = h.pipeline(Arc::new(FakeTrainingEngine::new(b"trained-weights".to_vec())));

    let report = pipeline.run().await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(report.publish.bucket_name, "models");
    assert_eq!(report.publish.remote_model_key, "detector/best.pt");
    assert_eq!(report.ingestion.file_count, DatasetFixture::animals().len());
    assert_ingestion_materialized(&report.ingestion);
    assert_training_materialized(&report.training);
    assert_published(&h.store, &report.publish);

    let remote = h.store.object_path("models", "detector/best.pt").unwrap();
    assert_eq!(
        std::fs::read(remote).unwrap(),
        std::fs::read(&report.training.trained_model_path).unwrap()
    );
}

#[tokio::test]
async fn test_report_records_ordered_transitions() {
    let h = Harness::new().with_dataset();
    let pipeline = h.pipeline(Arc::new(FakeTrainingEngine::default()));

    let report = pipeline.run().await.unwrap();

    let states: Vec<PipelineState> = report.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            PipelineState::Ingesting,
            PipelineState::Training,
            PipelineState::Publishing,
            PipelineState::Completed,
        ]
    );
    assert!(report.duration_ms >= 0.0);
    assert!(report.to_json().unwrap().contains("detector/best.pt"));
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let h = Harness::new().with_dataset();
    let pipeline = h.pipeline(Arc::new(FakeTrainingEngine::default()));

    pipeline.run().await.unwrap();

    let types = h.events.event_types();
    assert_eq!(types.first().map(String::as_str), Some("pipeline.started"));
    assert_eq!(types.last().map(String::as_str), Some("pipeline.completed"));

    let completed: Vec<String> = h
        .events
        .events_of_type("stage.completed")
        .iter()
        .map(|e| e.get("stage").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(completed, vec!["ingestion", "training", "publishing"]);
    assert!(h.events.events_of_type("stage.failed").is_empty());
}

#[tokio::test]
async fn test_training_failure_never_publishes() {
    let h = Harness::new().with_dataset();
    let engine = Arc::new(FailingTrainingEngine::new("CUDA error: out of memory"));
    let pipeline = h.pipeline(engine.clone());

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(err.stage(), StageKind::Training);
    assert_eq!(err.cause_kind(), "TrainingEngineError");
    assert!(matches!(
        err,
        PipelineError::Training(TrainingError::Engine(TrainingEngineError::Failed { .. }))
    ));
    assert_eq!(engine.calls(), 1);
    assert!(h.recorder.puts().is_empty());
    assert!(!h.store.object_path("models", "detector/best.pt").unwrap().exists());

    let failed = h.events.events_of_type("pipeline.failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].get("stage").unwrap(), "training");
}

#[tokio::test]
async fn test_missing_dataset_fails_in_ingestion() {
    let h = Harness::new();
    let engine = Arc::new(FakeTrainingEngine::default());
    let pipeline = h.pipeline(engine.clone());

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.stage(), StageKind::Ingestion);
    assert_eq!(err.cause_kind(), "StorageNotFound");
    match err {
        PipelineError::Ingestion(IngestionError::Download { source, .. }) => {
            assert!(matches!(source, StorageError::NotFound { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.calls(), 0);
    assert_eq!(
        pipeline.transitions().iter().map(|t| t.to).collect::<Vec<_>>(),
        vec![PipelineState::Ingesting, PipelineState::Failed]
    );
}

#[tokio::test]
async fn test_missing_model_output_fails_training() {
    let h = Harness::new().with_dataset();
    let pipeline = h.pipeline(Arc::new(FakeTrainingEngine::without_output()));

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Training(TrainingError::Engine(TrainingEngineError::MissingOutput { .. }))
    ));
    assert!(h.recorder.puts().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let h = Harness::new().with_dataset();
    let token = CancellationToken::new();
    token.cancel("operator abort");
    let pipeline = h
        .pipeline(Arc::new(FakeTrainingEngine::default()))
        .with_cancellation(token);

    let err = pipeline.run().await.unwrap_err();

    match &err {
        PipelineError::Cancelled { stage, reason } => {
            assert_eq!(*stage, StageKind::Ingestion);
            assert_eq!(reason, "operator abort");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(h.recorder.gets().is_empty());
    assert_eq!(h.events.events_of_type("pipeline.cancelled").len(), 1);
}

#[tokio::test]
async fn test_cancelled_between_stages() {
    struct CancellingEngine {
        inner: FakeTrainingEngine,
        token: CancellationToken,
    }

    #[async_trait::async_trait]
    impl TrainingEngine for CancellingEngine {
        async fn train(
            &self,
            request: &crate::training::TrainingRequest,
        ) -> Result<(), TrainingEngineError> {
            let result = self.inner.train(request).await;
            self.token.cancel("shutdown requested");
            result
        }
    }

    let h = Harness::new().with_dataset();
    let token = CancellationToken::new();
    let engine = Arc::new(CancellingEngine {
        inner: FakeTrainingEngine::default(),
        token: token.clone(),
    });
    let pipeline = h.pipeline(engine).with_cancellation(token);

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.stage(), StageKind::Publishing);
    assert!(matches!(err, PipelineError::Cancelled { .. }));
    assert!(h.recorder.puts().is_empty());
}

#[tokio::test]
async fn test_rerun_overwrites_published_model() {
    let h = Harness::new().with_dataset();

    h.pipeline(Arc::new(FakeTrainingEngine::new(b"first".to_vec())))
        .run()
        .await
        .unwrap();
    let second = h
        .pipeline(Arc::new(FakeTrainingEngine::new(b"second".to_vec())))
        .run()
        .await
        .unwrap();

    let remote = h.store.object_path("models", "detector/best.pt").unwrap();
    assert_eq!(std::fs::read(remote).unwrap(), b"second");
    assert_published(&h.store, &second.publish);
    assert_eq!(h.recorder.puts().len(), 2);
    assert!(h.recorder.puts().iter().all(|p| !p.remove_local_after));
}

#[tokio::test]
async fn test_state_changes_are_emitted_synchronously() {
    #[derive(Default)]
    struct ModeRecordingSink {
        records: parking_lot::Mutex<Vec<(String, bool)>>,
    }

    #[async_trait::async_trait]
    impl EventSink for ModeRecordingSink {
        async fn emit(&self, event: PipelineEvent) {
            self.records.lock().push((event.event_type, false));
        }

        fn try_emit(&self, event: PipelineEvent) {
            self.records.lock().push((event.event_type, true));
        }
    }

    let h = Harness::new().with_dataset();
    let sink = Arc::new(ModeRecordingSink::default());
    let storage: Arc<dyn StorageClient> = h.recorder.clone();
    let pipeline = TrainingPipeline::new(
        h.config.clone(),
        storage,
        Arc::new(FakeTrainingEngine::default()),
    )
    .with_event_sink(sink.clone());

    let report = pipeline.run().await.unwrap();

    let records = sink.records.lock().clone();
    let synchronous: Vec<&str> = records
        .iter()
        .filter(|(_, sync)| *sync)
        .map(|(event_type, _)| event_type.as_str())
        .collect();
    assert_eq!(synchronous.len(), report.transitions.len());
    assert!(synchronous.iter().all(|t| *t == "pipeline.state_changed"));
    assert!(records
        .iter()
        .filter(|(_, sync)| !*sync)
        .all(|(event_type, _)| event_type != "pipeline.state_changed"));
}
