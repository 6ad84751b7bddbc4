use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ExecutorError;
use crate::runner::{ProcessOutcome, ProcessRunner, TokioProcessRunner};

use super::cancel::CancelToken;
use super::graph::StageGraph;
use super::output::trace_event;
use super::progress::ProgressMonitor;
use super::scheduler::WaveDispatcher;
use super::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin};
use super::types::{ExecutionOpts, Run, RunResult, RunStatus, Stage, StageStatus};

/// Execution engine for stage dependency graphs
pub struct ExecutionEngine {
    opts: ExecutionOpts,
    runner: Arc<dyn ProcessRunner>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    cancel: CancelToken,
}

pub struct ExecutionEngineBuilder {
    opts: ExecutionOpts,
    runner: Option<Arc<dyn ProcessRunner>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    cancel: Option<CancelToken>,
}

impl ExecutionEngine {
    pub fn new(opts: ExecutionOpts) -> Self {
        Self::builder(opts).build()
    }

    pub fn builder(opts: ExecutionOpts) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(opts)
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    /// Token that cancels every run driven by this engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Validate and layer the stages without executing anything.
    pub fn plan(&self, stages: &[Stage]) -> Result<Vec<Vec<String>>, ExecutorError> {
        StageGraph::from_stages(stages)?.plan()
    }

    /// Run the stages to completion.
    ///
    /// Graph errors are returned before any process is spawned. Stage
    /// failures never surface as `Err`; they are recorded in the result.
    pub async fn execute(&self, stages: &[Stage]) -> Result<RunResult, ExecutorError> {
        let graph = StageGraph::from_stages(stages)?;
        self.execute_graph(&graph).await
    }

    pub async fn execute_graph(
        &self,
        graph: &StageGraph<Stage>,
    ) -> Result<RunResult, ExecutorError> {
        let waves = graph.plan()?;
        let run_id = Uuid::new_v4().to_string();
        tracing::debug!(
            %run_id,
            stages = graph.len(),
            waves = waves.len(),
            max_parallel = self.opts.max_parallel,
            runner = self.runner.name(),
            "executing stage graph"
        );

        Ok(Coordinator::new(self, graph, run_id, waves).drive().await)
    }

    fn emit(&self, event: RenderEvent) {
        match &self.renderer {
            Some(renderer) => renderer.render(&event),
            None => trace_event(&event),
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_strategy
            .as_ref()
            .map(|strategy| strategy.next_delay(attempt))
            .unwrap_or(Duration::ZERO)
    }
}

impl ExecutionEngineBuilder {
    pub fn new(opts: ExecutionOpts) -> Self {
        Self {
            opts,
            runner: None,
            renderer: None,
            retry_strategy: None,
            cancel: None,
        }
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> ExecutionEngine {
        ExecutionEngine {
            opts: self.opts,
            runner: self
                .runner
                .unwrap_or_else(|| Arc::new(TokioProcessRunner::new())),
            renderer: self.renderer,
            retry_strategy: self.retry_strategy,
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

/// What an in-flight wave slot resolves to.
enum Completion {
    Finished {
        stage_id: String,
        outcome: ProcessOutcome,
    },
    BackoffElapsed {
        stage_id: String,
    },
}

/// Single control path of a run. Only this type mutates the `Run`; worker
/// futures own their process and report back through `Completion`.
struct Coordinator<'e> {
    engine: &'e ExecutionEngine,
    graph: &'e StageGraph<Stage>,
    run: Run,
    run_id: String,
    wave_of: HashMap<String, usize>,
    progress: ProgressMonitor,
    halted_by: Option<String>,
}

impl<'e> Coordinator<'e> {
    fn new(
        engine: &'e ExecutionEngine,
        graph: &'e StageGraph<Stage>,
        run_id: String,
        waves: Vec<Vec<String>>,
    ) -> Self {
        let wave_of = waves
            .iter()
            .enumerate()
            .flat_map(|(i, wave)| wave.iter().map(move |id| (id.clone(), i)))
            .collect();
        Self {
            engine,
            graph,
            run: Run::new(run_id.clone(), waves),
            run_id,
            wave_of,
            progress: ProgressMonitor::new(graph.len(), engine.opts.progress_bar),
            halted_by: None,
        }
    }

    async fn drive(mut self) -> RunResult {
        let waves = self.run.waves().to_vec();
        self.engine.emit(RenderEvent::RunStart {
            run_id: self.run_id.clone(),
            total_stages: self.graph.len(),
            total_waves: waves.len(),
        });
        self.engine.emit(RenderEvent::Plan {
            run_id: self.run_id.clone(),
            waves: waves.clone(),
        });

        for (wave, stage_ids) in waves.iter().enumerate() {
            if self.engine.cancel.is_cancelled() || self.halted_by.is_some() {
                break;
            }

            self.progress.set_wave(wave, waves.len());
            self.engine.emit(RenderEvent::WaveStart {
                run_id: self.run_id.clone(),
                wave,
                stage_ids: stage_ids.clone(),
            });
            self.run_wave(wave, stage_ids).await;
            self.engine.emit(RenderEvent::WaveEnd {
                run_id: self.run_id.clone(),
                wave,
            });
        }

        if self.engine.cancel.is_cancelled() {
            tracing::warn!(run_id = %self.run_id, "run cancelled");
            self.run.mark_cancelled();
            self.skip_pending("cancelled");
        } else if let Some(failed) = self.halted_by.clone() {
            self.skip_pending(&format!("halted by {failed}"));
        }

        let result = self.run.finalize();
        self.progress.finish(result.status == RunStatus::Succeeded);
        self.engine.emit(RenderEvent::RunEnd {
            run_id: self.run_id.clone(),
            result: result.clone(),
        });
        result
    }

    /// Dispatch one wave and return once every stage in it is terminal.
    async fn run_wave(&mut self, wave: usize, stage_ids: &[String]) {
        let mut queue: VecDeque<&str> = stage_ids.iter().map(String::as_str).collect();
        let mut dispatcher = WaveDispatcher::new(self.engine.opts.max_parallel);

        loop {
            while dispatcher.has_capacity() && !self.engine.cancel.is_cancelled() {
                let Some(stage_id) = queue.pop_front() else {
                    break;
                };
                // Stages skipped by an earlier failure are no longer Pending.
                if self.run.status_of(stage_id) == Some(StageStatus::Pending) {
                    self.launch(&mut dispatcher, stage_id, wave);
                }
            }

            let Some(completion) = dispatcher.next().await else {
                break;
            };
            match completion {
                Completion::Finished { stage_id, outcome } => {
                    self.on_finished(&mut dispatcher, &stage_id, wave, outcome)
                }
                Completion::BackoffElapsed { stage_id } => {
                    if self.engine.cancel.is_cancelled() {
                        if let Some(result) = self.run.result_mut(&stage_id) {
                            result.cancel_waiting();
                        }
                        self.complete(&stage_id, wave);
                    } else {
                        self.launch(&mut dispatcher, &stage_id, wave);
                    }
                }
            }
        }
    }

    fn launch(&mut self, dispatcher: &mut WaveDispatcher<Completion>, stage_id: &str, wave: usize) {
        let graph = self.graph;
        let Some(stage) = graph.stage(stage_id) else {
            return;
        };
        let Some(result) = self.run.result_mut(stage_id) else {
            return;
        };
        if !result.begin_attempt() {
            return;
        }
        let attempt = result.attempt;

        self.progress.start_stage(stage_id, attempt);
        self.engine.emit(RenderEvent::StageStart {
            run_id: self.run_id.clone(),
            stage_id: stage_id.to_string(),
            wave,
            attempt,
            command: stage.command.display(),
        });

        let runner = Arc::clone(&self.engine.runner);
        let cancel = self.engine.cancel.clone();
        let command = stage.command.clone();
        let limits = self.engine.opts.launch_limits(stage.timeout);
        let stage_id = stage_id.to_string();
        dispatcher.push(async move {
            let outcome = runner.run(&command, &limits, &cancel).await;
            Completion::Finished { stage_id, outcome }
        });
    }

    fn on_finished(
        &mut self,
        dispatcher: &mut WaveDispatcher<Completion>,
        stage_id: &str,
        wave: usize,
        outcome: ProcessOutcome,
    ) {
        let graph = self.graph;
        let Some(stage) = graph.stage(stage_id) else {
            return;
        };
        let attempt_status = outcome.status();
        let cancelled = self.engine.cancel.is_cancelled();
        let Some(result) = self.run.result_mut(stage_id) else {
            return;
        };

        // maxRetries = n allows n + 1 attempts in total.
        let retry_allowed = !cancelled && result.attempt <= stage.max_retries;
        let status = result.finish_attempt(outcome, retry_allowed);
        let attempt = result.attempt;

        if status == StageStatus::Pending {
            let delay = self.engine.retry_delay(attempt);
            self.engine.emit(RenderEvent::StageRetry {
                run_id: self.run_id.clone(),
                stage_id: stage_id.to_string(),
                attempt,
                status: attempt_status,
                delay_ms: delay.as_millis() as u64,
            });

            if delay.is_zero() {
                self.launch(dispatcher, stage_id, wave);
            } else {
                let cancel = self.engine.cancel.clone();
                let stage_id = stage_id.to_string();
                dispatcher.push(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                    Completion::BackoffElapsed { stage_id }
                });
            }
            return;
        }

        self.complete(stage_id, wave);
        if status.is_failure() {
            self.propagate_failure(stage, wave);
        }
    }

    /// Skip everything downstream of a terminal failure and, unless the stage
    /// tolerates failure, halt the run after the current wave.
    fn propagate_failure(&mut self, stage: &Stage, wave: usize) {
        let reason = format!("dependency failed: {}", stage.id);
        for dependent in self.graph.dependents_closure(&stage.id) {
            let skipped = self
                .run
                .result_mut(&dependent)
                .map(|result| result.skip(reason.clone()))
                .unwrap_or(false);
            if skipped {
                let dependent_wave = self.wave_of.get(&dependent).copied().unwrap_or(wave);
                self.complete(&dependent, dependent_wave);
            }
        }

        if !stage.continue_on_failure && self.halted_by.is_none() {
            tracing::warn!(
                run_id = %self.run_id,
                stage = %stage.id,
                "stage failed, halting after the current wave"
            );
            self.halted_by = Some(stage.id.clone());
        }
    }

    fn skip_pending(&mut self, reason: &str) {
        for stage_id in self.run.skip_remaining(reason) {
            let wave = self.wave_of.get(&stage_id).copied().unwrap_or_default();
            self.complete(&stage_id, wave);
        }
    }

    /// Report a terminal stage. Called exactly once per stage.
    fn complete(&mut self, stage_id: &str, wave: usize) {
        let Some(result) = self.run.result(stage_id) else {
            return;
        };
        if !result.status.is_terminal() {
            return;
        }
        self.progress
            .finish_stage(stage_id, result.status, result.duration_ms());
        self.engine.emit(RenderEvent::StageComplete {
            run_id: self.run_id.clone(),
            wave,
            result: result.clone(),
        });
    }
}
