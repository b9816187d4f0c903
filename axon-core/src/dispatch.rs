//! Concurrent sub-task fan-out, shared by the orchestrator's `execute` node
//! and the sub-agent runner's own internal parallelism.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::OrchError;
use crate::id::SubTaskId;

/// One unit of retrieval work handed to a sub-agent.
#[derive(Debug, Clone)]
pub struct SubTask {
    /// Identifier, stable for the lifetime of the turn.
    pub id: SubTaskId,
    /// Natural-language description of the work.
    pub task: String,
    /// Optional hint at which tool should be preferred.
    pub tool_hint: Option<String>,
}

/// Executes one sub-task end to end and returns its Final Answer text.
///
/// Implemented by the sub-agent's ReAct runner (`axon-subagent`). Kept as a
/// trait here so the fan-out helper below doesn't depend on that crate.
#[async_trait]
pub trait SubTaskRunner: Send + Sync {
    /// Run one sub-task to completion.
    async fn run_sub_task(&self, task: SubTask) -> Result<String, OrchError>;
}

/// Run every sub-task concurrently under `concurrency` permits, returning
/// `(sub_task_id, result)` pairs in submission order regardless of
/// completion order.
///
/// A sub-task whose runner call fails is caught and converted to an
/// `"ERROR: sub-task failed"` result rather than propagated, so that one
/// failing sub-task never aborts the others or the turn. The id travels
/// alongside each result so callers can attribute it (spec glossary:
/// "The Final Answer string produced by one sub-task, prefixed for
/// attribution") before folding it into aggregated evidence.
pub async fn dispatch_many(
    runner: Arc<dyn SubTaskRunner>,
    tasks: Vec<SubTask>,
    concurrency: usize,
) -> Vec<(SubTaskId, String)> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let runner = Arc::clone(&runner);
        let semaphore = Arc::clone(&semaphore);
        let id = task.id.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed while handles are outstanding");
            match runner.run_sub_task(task.clone()).await {
                Ok(result) => result,
                Err(err) => format!("ERROR: sub-task failed: {err}"),
            }
        });
        handles.push((id, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => format!("ERROR: sub-task failed: {join_err}"),
        };
        results.push((id, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRunner;

    #[async_trait]
    impl SubTaskRunner for EchoRunner {
        async fn run_sub_task(&self, task: SubTask) -> Result<String, OrchError> {
            if task.task == "fail" {
                Err(OrchError::SubTaskFailed {
                    sub_task: task.id.to_string(),
                    message: "boom".into(),
                })
            } else {
                Ok(format!("OK {}", task.task))
            }
        }
    }

    #[tokio::test]
    async fn results_preserve_submission_order() {
        let runner: Arc<dyn SubTaskRunner> = Arc::new(EchoRunner);
        let tasks = vec![
            SubTask {
                id: SubTaskId::new("1"),
                task: "fail".into(),
                tool_hint: None,
            },
            SubTask {
                id: SubTaskId::new("2"),
                task: "OK result".into(),
                tool_hint: None,
            },
        ];
        let results = dispatch_many(runner, tasks, 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, SubTaskId::new("1"));
        assert!(results[0].1.contains("ERROR"));
        assert_eq!(results[1].0, SubTaskId::new("2"));
        assert!(results[1].1.contains("OK result"));
    }

    #[tokio::test]
    async fn concurrency_cap_of_one_still_completes_all() {
        let runner: Arc<dyn SubTaskRunner> = Arc::new(EchoRunner);
        let tasks = (0..5)
            .map(|i| SubTask {
                id: SubTaskId::new(i.to_string()),
                task: format!("task-{i}"),
                tool_hint: None,
            })
            .collect();
        let results = dispatch_many(runner, tasks, 1).await;
        assert_eq!(results.len(), 5);
        for (i, (id, result)) in results.iter().enumerate() {
            assert_eq!(*id, SubTaskId::new(i.to_string()));
            assert!(result.contains(&format!("task-{i}")));
        }
    }
}
