//! Generic pipeline execution framework.
//!
//! Runs stages in order; within a stage tasks run in parallel or sequential
//! mode. A task returning [`TaskFlow::Finish`] ends the pipeline successfully
//! once its stage completes.

use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::{ExecutionMode, Stage};
use super::task::{BoxedTask, TaskFlow};
use devstart_shared::errors::{DevstartError, DevstartResult};
use futures::future::try_join_all;
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }

    pub fn stages(self) -> Vec<Stage<BoxedTask<Ctx>>> {
        self.stages
    }
}

pub struct Pipeline<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }
}

pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn from_plan<Ctx>(plan: ExecutionPlan<Ctx>) -> Pipeline<Ctx> {
        Pipeline::new(plan.stages())
    }
}

/// Pipeline executor framework.
///
/// Provides the generic loop; the actual work lives in task implementations.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a pipeline.
    ///
    /// Generic over:
    /// - `Ctx`: Shared pipeline context (use interior mutability for writes)
    pub async fn execute<Ctx>(
        pipeline: Pipeline<Ctx>,
        ctx: Ctx,
    ) -> DevstartResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut stage_metrics = Vec::new();
        let mut finished_by = None;

        for (index, stage) in pipeline.stages.into_iter().enumerate() {
            let execution = stage.execution;
            let label = stage.label;
            let stage_start = Instant::now();
            tracing::debug!(stage = label, ?execution, tasks = stage.tasks.len(), "Running stage");

            let results: Vec<(TaskMetrics, TaskFlow)> = match execution {
                ExecutionMode::Parallel => {
                    let futures = stage.tasks.into_iter().map(|task| {
                        let ctx = ctx.clone();
                        async move {
                            let name = task.name().to_string();
                            let task_start = Instant::now();
                            let flow = task.run(ctx).await?;
                            Ok::<_, DevstartError>((
                                TaskMetrics {
                                    name,
                                    duration_ms: task_start.elapsed().as_millis(),
                                },
                                flow,
                            ))
                        }
                    });
                    try_join_all(futures).await?
                }
                ExecutionMode::Sequential => {
                    let mut results = Vec::new();
                    for task in stage.tasks {
                        let name = task.name().to_string();
                        let task_start = Instant::now();
                        let flow = task.run(ctx.clone()).await?;
                        results.push((
                            TaskMetrics {
                                name,
                                duration_ms: task_start.elapsed().as_millis(),
                            },
                            flow,
                        ));
                        if flow == TaskFlow::Finish {
                            break;
                        }
                    }
                    results
                }
            };

            if finished_by.is_none() {
                finished_by = results
                    .iter()
                    .find(|(_, flow)| *flow == TaskFlow::Finish)
                    .map(|(metrics, _)| metrics.name.clone());
            }

            stage_metrics.push(StageMetrics {
                index,
                label,
                execution,
                duration_ms: stage_start.elapsed().as_millis(),
                tasks: results.into_iter().map(|(metrics, _)| metrics).collect(),
            });

            if finished_by.is_some() {
                break;
            }
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            stages: stage_metrics,
            finished_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineTask;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Record {
        name: &'static str,
        flow: TaskFlow,
        fail: bool,
    }

    impl Record {
        fn ok(name: &'static str) -> Box<Self> {
            Box::new(Self {
                name,
                flow: TaskFlow::Continue,
                fail: false,
            })
        }

        fn finish(name: &'static str) -> Box<Self> {
            Box::new(Self {
                name,
                flow: TaskFlow::Finish,
                fail: false,
            })
        }

        fn failing(name: &'static str) -> Box<Self> {
            Box::new(Self {
                name,
                flow: TaskFlow::Continue,
                fail: true,
            })
        }
    }

    #[async_trait]
    impl PipelineTask<Log> for Record {
        async fn run(self: Box<Self>, ctx: Log) -> DevstartResult<TaskFlow> {
            ctx.lock().unwrap().push(self.name.to_string());
            if self.fail {
                return Err(DevstartError::Internal(format!("{} failed", self.name)));
            }
            Ok(self.flow)
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn run(stages: Vec<Stage<BoxedTask<Log>>>) -> (DevstartResult<PipelineMetrics>, Vec<String>) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = rt.block_on(PipelineExecutor::execute(
            PipelineBuilder::from_plan(ExecutionPlan::new(stages)),
            Arc::clone(&log),
        ));
        let seen = log.lock().unwrap().clone();
        (result, seen)
    }

    #[test]
    fn test_runs_all_stages_in_order() {
        let (result, seen) = run(vec![
            Stage::sequential("first", vec![Record::ok("a") as BoxedTask<Log>]),
            Stage::parallel("middle", vec![Record::ok("b") as BoxedTask<Log>, Record::ok("c")]),
            Stage::sequential("last", vec![Record::ok("d") as BoxedTask<Log>]),
        ]);

        let metrics = result.unwrap();
        assert_eq!(seen.first().map(String::as_str), Some("a"));
        assert_eq!(seen.last().map(String::as_str), Some("d"));
        assert_eq!(metrics.stages.len(), 3);
        assert_eq!(metrics.stages[1].label, "middle");
        assert_eq!(metrics.stages[1].execution, ExecutionMode::Parallel);
        assert_eq!(metrics.task_names(), vec!["a", "b", "c", "d"]);
        assert!(metrics.finished_by.is_none());
    }

    #[test]
    fn test_finish_skips_remaining_tasks_and_stages() {
        let (result, seen) = run(vec![
            Stage::sequential("guarded", vec![
                Record::ok("a") as BoxedTask<Log>,
                Record::finish("b"),
                Record::ok("c"),
            ]),
            Stage::sequential("skipped", vec![Record::ok("d") as BoxedTask<Log>]),
        ]);

        let metrics = result.unwrap();
        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(metrics.stages.len(), 1);
        assert_eq!(metrics.finished_by.as_deref(), Some("b"));
        assert!(metrics.task_duration_ms("c").is_none());
    }

    #[test]
    fn test_error_aborts_pipeline() {
        let (result, seen) = run(vec![
            Stage::sequential("broken", vec![Record::failing("a") as BoxedTask<Log>]),
            Stage::sequential("unreached", vec![Record::ok("b") as BoxedTask<Log>]),
        ]);

        assert_eq!(result.unwrap_err().to_string(), "internal error: a failed");
        assert_eq!(seen, vec!["a"]);
    }
}
