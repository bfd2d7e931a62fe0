//! The three-stage training pipeline.

use super::{PipelineReport, StateMachine, Transition};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{PipelineEvent, PipelineState, StageArtifact};
use crate::errors::PipelineError;
use crate::events::{EventSink, NoOpEventSink};
use crate::ingestion::DataIngestion;
use crate::observability::{duration_ms, StageTimer};
use crate::publishing::ModelPublisher;
use crate::stages::Stage;
use crate::storage::StorageClient;
use crate::training::{ModelTrainer, TrainingEngine};
use crate::utils::generate_run_id;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs ingestion, training and publishing in order.
///
/// Each stage starts only after the previous one returned an artifact; the
/// first failure ends the run in [`PipelineState::Failed`] and no later
/// stage is invoked. Files already written stay where they are.
pub struct TrainingPipeline {
    config: PipelineConfig,
    ingestion: DataIngestion,
    trainer: ModelTrainer,
    publisher: ModelPublisher,
    event_sink: Arc<dyn EventSink>,
    cancellation: CancellationToken,
    machine: Mutex<StateMachine>,
}

impl std::fmt::Debug for TrainingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingPipeline")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl TrainingPipeline {
    /// Creates a pipeline whose stages share `storage`.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        storage: Arc<dyn StorageClient>,
        engine: Arc<dyn TrainingEngine>,
    ) -> Self {
        Self {
            ingestion: DataIngestion::new(config.ingestion.clone(), storage.clone()),
            trainer: ModelTrainer::new(config.training.clone(), engine),
            publisher: ModelPublisher::new(config.publish.clone(), storage),
            config,
            event_sink: Arc::new(NoOpEventSink),
            cancellation: CancellationToken::new(),
            machine: Mutex::new(StateMachine::new()),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the token checked before each stage.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the state of the current or last run.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.machine.lock().state()
    }

    /// Returns the transitions of the current or last run.
    #[must_use]
    pub fn transitions(&self) -> Vec<Transition> {
        self.machine.lock().transitions().to_vec()
    }

    /// Executes one run.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let run_id = generate_run_id().to_string();
        let started_at = Utc::now();
        let started = Instant::now();
        *self.machine.lock() = StateMachine::new();

        info!(run_id = %run_id, run_name = %self.config.training.run_name, "Pipeline started");
        self.event_sink
            .emit(PipelineEvent::pipeline_started(&run_id, &self.config.training.run_name))
            .await;

        let span = info_span!("pipeline", run_id = %run_id);
        let outcome = async {
            let ingestion = self
                .run_stage(&run_id, &self.ingestion, (), PipelineError::Ingestion)
                .await?;
            let training = self
                .run_stage(&run_id, &self.trainer, ingestion.clone(), PipelineError::Training)
                .await?;
            let publish = self
                .run_stage(&run_id, &self.publisher, training.clone(), PipelineError::Publishing)
                .await?;
            Ok::<_, PipelineError>((ingestion, training, publish))
        }
        .instrument(span)
        .await;

        let elapsed = duration_ms(started.elapsed());
        match outcome {
            Ok((ingestion, training, publish)) => {
                self.enter(&run_id, PipelineState::Completed);
                info!(run_id = %run_id, duration_ms = elapsed, "Pipeline completed");
                self.event_sink
                    .emit(PipelineEvent::pipeline_completed(&run_id, elapsed))
                    .await;
                Ok(PipelineReport {
                    run_id,
                    started_at,
                    duration_ms: elapsed,
                    ingestion,
                    training,
                    publish,
                    transitions: self.transitions(),
                })
            }
            Err(err) => {
                self.enter(&run_id, PipelineState::Failed);
                if let PipelineError::Cancelled { stage, reason } = &err {
                    warn!(run_id = %run_id, stage = %stage, reason = %reason, "Pipeline cancelled");
                    self.event_sink
                        .emit(PipelineEvent::pipeline_cancelled(&run_id, *stage, reason))
                        .await;
                } else {
                    error!(
                        run_id = %run_id,
                        stage = %err.stage(),
                        cause = err.cause_kind(),
                        error = %err,
                        "Pipeline failed"
                    );
                }
                self.event_sink
                    .emit(PipelineEvent::pipeline_failed(&run_id, err.to_dict()))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_stage<S, F>(
        &self,
        run_id: &str,
        stage: &S,
        input: S::Input,
        wrap: F,
    ) -> Result<S::Artifact, PipelineError>
    where
        S: Stage,
        F: FnOnce(S::Error) -> PipelineError,
    {
        let kind = S::KIND;
        if self.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: kind,
                reason: self.cancellation.reason().unwrap_or_default(),
            });
        }

        self.enter(run_id, kind.running_state());
        self.event_sink
            .emit(PipelineEvent::stage_started(run_id, kind))
            .await;

        let span = info_span!("stage", run_id = %run_id, stage = %kind);
        let timer = StageTimer::start(kind);
        let result = stage.execute(input).instrument(span).await;
        let elapsed = timer.finish();

        match result {
            Ok(artifact) => {
                info!(stage = %kind, duration_ms = elapsed, "Stage completed");
                self.event_sink
                    .emit(PipelineEvent::stage_completed(run_id, kind, elapsed, artifact.to_value()))
                    .await;
                Ok(artifact)
            }
            Err(e) => {
                let message = e.to_string();
                error!(stage = %kind, duration_ms = elapsed, error = %message, "Stage failed");
                self.event_sink
                    .emit(PipelineEvent::stage_failed(run_id, kind, elapsed, &message))
                    .await;
                Err(wrap(e))
            }
        }
    }

    /// Moves the state machine and reports the change without yielding.
    fn enter(&self, run_id: &str, to: PipelineState) {
        let change = self.machine.lock().transition(to);
        match change {
            Ok(transition) => {
                self.event_sink
                    .try_emit(PipelineEvent::state_changed(run_id, transition.from, transition.to));
            }
            Err(e) => warn!(run_id = %run_id, error = %e, "Ignoring state change"),
        }
    }
}
