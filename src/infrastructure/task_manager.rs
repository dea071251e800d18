use tokio::task::JoinHandle;

/// Background tasks a channel owns. Each slot holds at most one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSlot {
    /// Reads frames from the live socket
    Reader,
    /// Periodic ping
    Heartbeat,
    /// Pending backoff timer
    Retry,
}

/// Manages background tasks with proper lifecycle handling
#[derive(Default)]
pub struct TaskManager {
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, slot: TaskSlot) -> &mut Option<JoinHandle<()>> {
        match slot {
            TaskSlot::Reader => &mut self.reader,
            TaskSlot::Heartbeat => &mut self.heartbeat,
            TaskSlot::Retry => &mut self.retry,
        }
    }

    /// Spawn a task into `slot`, aborting whatever ran there before
    pub fn spawn<F>(&mut self, slot: TaskSlot, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if let Some(previous) = self.slot_mut(slot).replace(handle) {
            previous.abort();
        }
    }

    /// Abort the task in `slot`, if any
    pub fn abort(&mut self, slot: TaskSlot) {
        if let Some(handle) = self.slot_mut(slot).take() {
            handle.abort();
        }
    }

    /// Forget the task in `slot` without aborting it.
    ///
    /// A task must detach itself this way before touching its own slot,
    /// otherwise the abort lands on its next await point.
    pub fn detach(&mut self, slot: TaskSlot) {
        self.slot_mut(slot).take();
    }

    pub fn is_running(&self, slot: TaskSlot) -> bool {
        match slot {
            TaskSlot::Reader => &self.reader,
            TaskSlot::Heartbeat => &self.heartbeat,
            TaskSlot::Retry => &self.retry,
        }
        .as_ref()
        .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort all tasks, retry timer first, then heartbeat, then reader
    pub fn abort_all(&mut self) {
        self.abort(TaskSlot::Retry);
        self.abort(TaskSlot::Heartbeat);
        self.abort(TaskSlot::Reader);
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
