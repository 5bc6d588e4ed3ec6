//! Deadline-ordered task queue shared between the loop thread and posters

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic point in time at which a task becomes due
pub type TaskTimePoint = Instant;

/// Convert an engine-clock target (nanoseconds on the engine's monotonic
/// clock) into a local deadline. Targets already in the past map to `now`.
pub fn deadline_from_engine_time(target_nanos: u64, engine_now_nanos: u64) -> TaskTimePoint {
    let now = Instant::now();
    let delta = target_nanos.saturating_sub(engine_now_nanos);
    now + Duration::from_nanos(delta)
}

struct QueuedTask<T> {
    deadline: TaskTimePoint,
    order: u64,
    task: T,
}

impl<T> PartialEq for QueuedTask<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.order == other.order
    }
}

impl<T> Eq for QueuedTask<T> {}

impl<T> PartialOrd for QueuedTask<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap: the earliest deadline (then the lowest sequence
// number) has to compare greatest.
impl<T> Ord for QueuedTask<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.order.cmp(&self.order))
    }
}

struct QueueInner<T> {
    heap: BinaryHeap<QueuedTask<T>>,
    next_order: u64,
}

/// Thread-safe priority queue of tasks keyed by deadline.
///
/// Tasks sharing a deadline come out in submission order.
pub struct TaskQueue<T> {
    inner: Mutex<QueueInner<T>>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                next_order: 0,
            }),
        }
    }

    /// Insert a task due at `deadline`
    pub fn push(&self, task: T, deadline: TaskTimePoint) {
        let mut inner = self.inner.lock();
        let order = inner.next_order;
        inner.next_order += 1;
        inner.heap.push(QueuedTask {
            deadline,
            order,
            task,
        });
    }

    /// Remove every task due at or before `now`, earliest first
    pub fn pop_expired(&self, now: TaskTimePoint) -> Vec<T> {
        let mut inner = self.inner.lock();
        let mut expired = Vec::new();
        while inner.heap.peek().map_or(false, |top| top.deadline <= now) {
            if let Some(entry) = inner.heap.pop() {
                expired.push(entry.task);
            }
        }
        expired
    }

    /// Deadline of the earliest queued task
    pub fn next_deadline(&self) -> Option<TaskTimePoint> {
        self.inner.lock().heap.peek().map(|top| top.deadline)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }
}
