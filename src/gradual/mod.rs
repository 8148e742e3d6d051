//! Cooperative, resumable execution of long operations.
//!
//! A [`GradualTask`] does a bounded batch of work per [`GradualTask::step`]
//! and reports whether more remains. The host drives a [`TaskRunner`] once
//! per frame; the runner keeps one FIFO queue per object and steps at most
//! one task per object per tick, so two operations never interleave on the
//! same object. Cancellation is observed between steps only and always
//! ends in [`GradualTask::rollback`].

mod recompute;

pub use recompute::RecomputeNormalsTask;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::object::{GeomDataObject, ObjectId, ObjectProvider};

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More batches remain.
    More,
    /// The task is complete.
    Done,
}

/// A long operation split into batches.
///
/// A step must leave the object structurally consistent: batches never
/// stop in the middle of one subobject's mutation.
pub trait GradualTask {
    /// Object the task operates on.
    fn object_id(&self) -> ObjectId;

    /// Processes the next batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be applied; the runner then
    /// rolls the task back.
    fn step(&mut self, obj: &mut GeomDataObject) -> Result<Progress>;

    /// Undoes every effect of the steps taken so far.
    fn rollback(&mut self, obj: &mut GeomDataObject);

    /// Short name for logging.
    fn name(&self) -> &'static str {
        "task"
    }
}

/// Shared flag requesting cancellation of one task.
///
/// Cloning creates another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Handle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task{}", self.0)
    }
}

/// Terminal event of a task, reported by [`TaskRunner::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Finished { task: TaskId, object: ObjectId },
    /// Cancelled and rolled back. Not an error.
    Cancelled { task: TaskId, object: ObjectId },
    /// Failed and rolled back.
    Failed {
        task: TaskId,
        object: ObjectId,
        error: String,
    },
}

struct QueuedTask {
    id: TaskId,
    task: Box<dyn GradualTask>,
    token: CancellationToken,
    started: bool,
}

/// Host-driven scheduler for gradual tasks.
#[derive(Default)]
pub struct TaskRunner {
    queues: BTreeMap<ObjectId, VecDeque<QueuedTask>>,
    next_id: u64,
}

impl TaskRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task behind any other task on the same object.
    pub fn submit(&mut self, task: Box<dyn GradualTask>) -> (TaskId, CancellationToken) {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        let token = CancellationToken::new();
        let object = task.object_id();
        debug!(%id, %object, name = task.name(), "task submitted");
        self.queues.entry(object).or_default().push_back(QueuedTask {
            id,
            task,
            token: token.clone(),
            started: false,
        });
        (id, token)
    }

    /// Requests cancellation of a queued task. Returns `false` if the task
    /// is unknown or already finished.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        for queue in self.queues.values() {
            if let Some(entry) = queue.iter().find(|entry| entry.id == id) {
                entry.token.cancel();
                return true;
            }
        }
        false
    }

    /// Returns `true` if no task is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queues.values().all(VecDeque::is_empty)
    }

    /// Number of tasks queued for `object`.
    #[must_use]
    pub fn pending(&self, object: ObjectId) -> usize {
        self.queues.get(&object).map_or(0, VecDeque::len)
    }

    /// Advances the front task of every object by one step.
    ///
    /// Returns the tasks that ended during this tick.
    pub fn tick(&mut self, objects: &mut dyn ObjectProvider) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        for (&object, queue) in &mut self.queues {
            let Some(front) = queue.front_mut() else {
                continue;
            };
            let Some(obj) = objects.object_mut(object) else {
                warn!(%object, task = %front.id, "object vanished; dropping its tasks");
                for entry in queue.drain(..) {
                    events.push(TaskEvent::Failed {
                        task: entry.id,
                        object,
                        error: format!("object {object} not found"),
                    });
                }
                continue;
            };

            if front.token.is_cancelled() {
                if front.started {
                    front.task.rollback(obj);
                }
                debug!(task = %front.id, %object, "task cancelled");
                events.push(TaskEvent::Cancelled {
                    task: front.id,
                    object,
                });
                queue.pop_front();
                continue;
            }

            front.started = true;
            match front.task.step(obj) {
                Ok(Progress::More) => {}
                Ok(Progress::Done) => {
                    events.push(TaskEvent::Finished {
                        task: front.id,
                        object,
                    });
                    queue.pop_front();
                }
                Err(err) => {
                    warn!(task = %front.id, %object, %err, "task failed; rolling back");
                    front.task.rollback(obj);
                    events.push(TaskEvent::Failed {
                        task: front.id,
                        object,
                        error: err.to_string(),
                    });
                    queue.pop_front();
                }
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
        events
    }

    /// Ticks until every queue is empty.
    pub fn run_to_completion(&mut self, objects: &mut dyn ObjectProvider) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while !self.is_idle() {
            events.extend(self.tick(objects));
        }
        events
    }
}

/// Drives `task` to completion synchronously.
///
/// # Errors
///
/// Returns the first step error, after rolling the task back.
pub fn run_to_end(task: &mut dyn GradualTask, obj: &mut GeomDataObject) -> Result<()> {
    loop {
        match task.step(obj) {
            Ok(Progress::More) => {}
            Ok(Progress::Done) => return Ok(()),
            Err(err) => {
                task.rollback(obj);
                return Err(err);
            }
        }
    }
}
