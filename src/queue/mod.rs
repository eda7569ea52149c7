pub mod task;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::Result;
use crate::server::AppState;
use crate::workflow;
use crate::workflow::types::WorkflowOutcome;

use task::Task;

/// Pending work, one FIFO per repository.
pub struct TaskQueue {
    queues: HashMap<String, VecDeque<Task>>,
    /// Wakes the processor.
    notify: Option<tokio::sync::mpsc::UnboundedSender<()>>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
            notify: None,
        }
    }

    pub fn set_notifier(&mut self, tx: tokio::sync::mpsc::UnboundedSender<()>) {
        self.notify = Some(tx);
    }

    pub fn enqueue(&mut self, task: Task) {
        let repo = task.repo_full_name().to_string();
        tracing::info!(repo = %repo, task = %task.description(), "Enqueuing task");

        let queue = self.queues.entry(repo.clone()).or_default();
        if let Task::ReviewPullRequest(request) = &task {
            // Only the newest head of a pull request is worth reviewing.
            let before = queue.len();
            queue.retain(|pending| {
                !matches!(pending, Task::ReviewPullRequest(r) if r.pr_number == request.pr_number)
            });
            let superseded = before - queue.len();
            if superseded > 0 {
                tracing::info!(
                    repo = %repo,
                    pr = request.pr_number,
                    superseded,
                    "Dropped queued reviews superseded by a newer push"
                );
            }
        }
        queue.push_back(task);

        if let Some(ref tx) = self.notify {
            let _ = tx.send(());
        }
    }

    /// Take the next task from any repo that has pending work.
    pub fn take_next(&mut self) -> Option<Task> {
        let repo = self
            .queues
            .iter()
            .find(|(_, q)| !q.is_empty())
            .map(|(k, _)| k.clone())?;

        let task = self.queues.get_mut(&repo).and_then(|q| q.pop_front());
        if self.queues.get(&repo).map_or(false, |q| q.is_empty()) {
            self.queues.remove(&repo);
        }
        task
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run one task to completion.
pub async fn process_task(state: &AppState, task: &Task) -> Result<WorkflowOutcome> {
    match task {
        Task::ReviewPullRequest(request) => {
            workflow::review::handle_pull_request_event(state, request).await
        }
        Task::Fix(trigger) => workflow::fix::handle_fix_request(state, trigger).await,
    }
}

/// Run the background queue processor.
pub async fn run_queue_processor(state: Arc<AppState>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    {
        let mut queue = state.task_queue.write().await;
        queue.set_notifier(tx);
    }

    tracing::info!("Queue processor started");

    while rx.recv().await.is_some() {
        // Drain everything queued so far.
        loop {
            let task = {
                let mut queue = state.task_queue.write().await;
                queue.take_next()
            };
            let Some(task) = task else { break };

            tracing::info!(task = %task.description(), "Processing task");

            match process_task(&state, &task).await {
                Ok(outcome) => {
                    tracing::info!(task = %task.description(), outcome = ?outcome, "Task completed");
                }
                Err(e) => {
                    tracing::error!(task = %task.description(), error = %e, "Task failed");
                }
            }
        }
    }
}
