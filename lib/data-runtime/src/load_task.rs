use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::ResourceIdentifier;

/// Id of a load task, chosen by the caller.
pub type TaskId = u32;

/// Completion state shared between a task and the job loading its batch.
#[derive(Debug, Default)]
pub(crate) struct TaskCompletion {
    completed: AtomicBool,
    end_time: Mutex<Option<Instant>>,
}

impl TaskCompletion {
    /// Stamps the end time, then publishes completion.
    pub(crate) fn finish(&self) {
        self.end_time.lock().get_or_insert_with(Instant::now);
        self.completed.store(true, Ordering::Release);
    }
}

/// A batch of resources loaded together.
///
/// The task is complete once every resource of the batch went through its
/// load job. Listeners are notified once per task, never per resource.
#[derive(Debug)]
pub struct ResourceLoadTask {
    id: TaskId,
    identifiers: Vec<ResourceIdentifier>,
    completion: Arc<TaskCompletion>,
    start_time: Instant,
}

impl ResourceLoadTask {
    pub(crate) fn new(id: TaskId, identifiers: Vec<ResourceIdentifier>) -> Self {
        Self {
            id,
            identifiers,
            completion: Arc::default(),
            start_time: Instant::now(),
        }
    }

    /// Id the task was submitted with.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Resources of the batch, without duplicates.
    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        &self.identifiers
    }

    /// Returns true once every load job of the batch finished.
    pub fn is_completed(&self) -> bool {
        self.completion.completed.load(Ordering::Acquire)
    }

    /// Time between submission and the end of the last load job, if
    /// completed.
    pub fn duration(&self) -> Option<Duration> {
        let end_time = *self.completion.end_time.lock();
        end_time.map(|end| end - self.start_time)
    }

    pub(crate) fn completion(&self) -> Arc<TaskCompletion> {
        Arc::clone(&self.completion)
    }
}
