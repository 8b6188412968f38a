//! Cooperative scheduler
//!
//! One logical thread of control. An async foreign call is queued as a task
//! and does not start until the evaluator reaches a suspension point: awaiting
//! a task, a `Sleep`, or the end of the run. Queued tasks then run one at a
//! time, in issue order, each to completion before the next starts.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

use super::errors::{EvalError, EvalResult};
use super::foreign::{ForeignError, LocalBoxFuture};
use super::types::Value;

type TaskOutcome = Result<Value, ForeignError>;

enum TaskState {
    Queued(LocalBoxFuture<'static, TaskOutcome>),
    Running,
    Finished(TaskOutcome),
}

struct TaskInner {
    id: Uuid,
    name: String,
    state: RefCell<TaskState>,
}

/// Handle to an issued foreign task; clones refer to the same task
#[derive(Clone)]
pub struct TaskHandle(Rc<TaskInner>);

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_finished(&self) -> bool {
        matches!(&*self.0.state.borrow(), TaskState::Finished(_))
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        match &*self.0.state.borrow() {
            TaskState::Finished(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Drive a queued task to completion; no-op for any other state
    async fn run(&self) {
        let future = match self.0.state.replace(TaskState::Running) {
            TaskState::Queued(future) => future,
            other => {
                self.0.state.replace(other);
                return;
            }
        };
        debug!(task = %self.0.name, id = %self.0.id, "running task");
        let outcome = future.await;
        self.0.state.replace(TaskState::Finished(outcome));
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

fn into_eval(task: &TaskHandle, outcome: TaskOutcome) -> EvalResult {
    outcome.map_err(|err| EvalError::Foreign {
        function: task.name().to_string(),
        message: err.message,
    })
}

/// FIFO of issued tasks plus the full issue log for the end-of-run check
#[derive(Default)]
pub struct Scheduler {
    issued: Vec<TaskHandle>,
    queue: VecDeque<TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task; it starts at the next suspension point
    pub fn spawn(&mut self, name: String, future: LocalBoxFuture<'static, TaskOutcome>) -> TaskHandle {
        let id = Uuid::new_v4();
        debug!(task = %name, %id, "issuing task");
        let task = TaskHandle(Rc::new(TaskInner {
            id,
            name,
            state: RefCell::new(TaskState::Queued(future)),
        }));
        self.issued.push(task.clone());
        self.queue.push_back(task.clone());
        task
    }

    /// Tasks issued so far that have not finished
    pub fn outstanding(&self) -> usize {
        self.issued.iter().filter(|task| !task.is_finished()).count()
    }

    /// Run queued tasks in issue order until none are left
    pub async fn run_pending(&mut self) {
        while let Some(task) = self.queue.pop_front() {
            task.run().await;
        }
    }

    /// Wait for a task and return its value
    ///
    /// Tasks issued before `task` run first. A task can be joined any number
    /// of times; later joins return the stored outcome.
    pub async fn join(&mut self, task: &TaskHandle) -> EvalResult {
        while !task.is_finished() {
            match self.queue.pop_front() {
                Some(next) => next.run().await,
                None => break,
            }
        }
        match task.outcome() {
            Some(outcome) => into_eval(task, outcome),
            None => Err(EvalError::type_mismatch(format!(
                "task {} is already being awaited",
                task.name()
            ))),
        }
    }

    /// Run every queued task, then report the first failure in issue order
    pub async fn drain(&mut self) -> EvalResult<()> {
        self.run_pending().await;
        let issued = std::mem::take(&mut self.issued);
        for task in &issued {
            if let Some(outcome) = task.outcome() {
                into_eval(task, outcome)?;
            }
        }
        Ok(())
    }
}
