//! Timed event loop
//!
//! A single-thread cooperative scheduler that runs engine tasks at their
//! deadlines while keeping the compositor connection serviced.
//!
//! # Architecture
//!
//! ```text
//!  any thread                     loop thread
//! ┌────────────┐  push   ┌──────────────┐  pop expired  ┌──────────────────┐
//! │ TaskRunner │───────►│  TaskQueue   │──────────────►│ on_task_expired  │
//! └────────────┘         └──────────────┘               └──────────────────┘
//!       │ ping                                  ▲
//!       ▼                                       │ wait_until(next deadline)
//! ┌────────────┐       ┌────────────────────────┴─┐
//! │ wakeup fd  │──────►│ calloop dispatch(timeout)│◄──── display fd
//! └────────────┘       └──────────────────────────┘
//! ```
//!
//! The wait watches the display descriptor as well as the wakeup channel, so
//! protocol traffic (input, frame callbacks) is never held back behind a
//! distant task deadline, and a task posted from another thread preempts an
//! open-ended wait.

pub mod task_queue;

use std::fmt;
use std::io;
use std::os::fd::OwnedFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;

use calloop::generic::Generic;
use calloop::ping::{make_ping, Ping};
use calloop::{EventLoop, Interest, Mode, PostAction};
use log::{debug, error, info, trace, warn};

use crate::error::{is_transient, Error, Result};

pub use task_queue::{deadline_from_engine_time, TaskQueue, TaskTimePoint};

/// A pollable message source the loop keeps serviced while it waits.
///
/// Implemented by the compositor connection; the loop only relies on these
/// operations.
pub trait DisplaySource {
    /// A duplicate of the connection descriptor to poll for readability
    fn poll_fd(&self) -> io::Result<OwnedFd>;

    /// Dispatch messages that were already read into local buffers
    fn dispatch_pending(&mut self) -> io::Result<usize>;

    /// Read what the descriptor has ready and dispatch one round of messages
    fn dispatch_readable(&mut self) -> io::Result<usize>;

    /// Send queued outgoing requests
    fn flush(&mut self) -> io::Result<()>;

    fn is_valid(&self) -> bool;

    /// Mark the connection unusable after an unrecoverable error
    fn invalidate(&mut self);
}

/// State handed to calloop callbacks
struct LoopState<S> {
    display: S,
    wakeups: u64,
}

impl<S: DisplaySource> LoopState<S> {
    fn on_display_ready(&mut self, readiness: calloop::Readiness) -> PostAction {
        // POLLIN and POLLHUP can arrive together; only give up when there is
        // nothing left to read.
        if readiness.error && !readiness.readable {
            error!("💥 Display connection reported an error or hang-up");
            self.display.invalidate();
            return PostAction::Remove;
        }

        if readiness.readable {
            match self.display.dispatch_readable() {
                Ok(count) => trace!("📨 Dispatched {} display events", count),
                Err(e) if is_transient(&e) => {}
                Err(e) => {
                    error!("❌ Display dispatch failed: {}", e);
                    self.display.invalidate();
                    return PostAction::Remove;
                }
            }

            if let Err(e) = self.display.flush() {
                if !is_transient(&e) {
                    error!("❌ Display flush failed: {}", e);
                    self.display.invalidate();
                    return PostAction::Remove;
                }
            }
        }

        PostAction::Continue
    }
}

/// Cross-thread handle for scheduling work on a [`TimedEventLoop`].
pub struct TaskRunner<T> {
    queue: Arc<TaskQueue<T>>,
    wakeup: Ping,
    owner: ThreadId,
    stop: Arc<AtomicBool>,
}

impl<T> Clone for TaskRunner<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            wakeup: self.wakeup.clone(),
            owner: self.owner,
            stop: self.stop.clone(),
        }
    }
}

impl<T> fmt::Debug for TaskRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("owner", &self.owner)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl<T> TaskRunner<T> {
    /// Queue `task` to run on the loop thread no earlier than `deadline`.
    ///
    /// Safe to call from any thread; a blocked loop is woken immediately.
    pub fn post_task(&self, task: T, deadline: TaskTimePoint) {
        self.queue.push(task, deadline);
        self.wakeup.ping();
    }

    /// Whether the calling thread is the one that runs the tasks
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Ask the loop to return from [`TimedEventLoop::run`]
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.wakeup.ping();
    }
}

/// Single-thread scheduler multiplexing engine tasks with display traffic.
pub struct TimedEventLoop<S: DisplaySource + 'static, T> {
    event_loop: EventLoop<'static, LoopState<S>>,
    state: LoopState<S>,
    queue: Arc<TaskQueue<T>>,
    wakeup: Ping,
    owner: ThreadId,
    stop: Arc<AtomicBool>,
    /// Set when the poller itself fails; ends `run`
    failure: Option<Error>,
    on_task_expired: Box<dyn FnMut(T)>,
}

impl<S: DisplaySource + 'static, T> TimedEventLoop<S, T> {
    /// Create a loop owned by the calling thread.
    ///
    /// `on_task_expired` runs every task once its deadline has passed.
    pub fn new<F>(display: S, on_task_expired: F) -> Result<Self>
    where
        F: FnMut(T) + 'static,
    {
        let event_loop: EventLoop<'static, LoopState<S>> = EventLoop::try_new()?;
        let handle = event_loop.handle();

        let (wakeup, wakeup_source) = make_ping()?;
        handle
            .insert_source(wakeup_source, |_, _, state: &mut LoopState<S>| {
                state.wakeups += 1;
                trace!("🔔 Wakeup #{}", state.wakeups);
            })
            .map_err(|e| Error::EventLoop(format!("wakeup channel: {}", e.error)))?;

        let fd = display.poll_fd()?;
        handle
            .insert_source(
                Generic::new(fd, Interest::READ, Mode::Level),
                |readiness, _fd, state: &mut LoopState<S>| Ok(state.on_display_ready(readiness)),
            )
            .map_err(|e| Error::EventLoop(format!("display source: {}", e.error)))?;

        debug!("🔁 Event loop created on {:?}", thread::current().id());

        Ok(Self {
            event_loop,
            state: LoopState {
                display,
                wakeups: 0,
            },
            queue: Arc::new(TaskQueue::new()),
            wakeup,
            owner: thread::current().id(),
            stop: Arc::new(AtomicBool::new(false)),
            failure: None,
            on_task_expired: Box::new(on_task_expired),
        })
    }

    /// A handle that can post tasks from any thread
    pub fn task_runner(&self) -> TaskRunner<T> {
        TaskRunner {
            queue: self.queue.clone(),
            wakeup: self.wakeup.clone(),
            owner: self.owner,
            stop: self.stop.clone(),
        }
    }

    pub fn post_task(&self, task: T, deadline: TaskTimePoint) {
        self.queue.push(task, deadline);
        self.wakeup.ping();
    }

    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn display(&self) -> &S {
        &self.state.display
    }

    /// Run tasks and service the display until stopped.
    ///
    /// Returns `Ok` after [`TaskRunner::stop`], or [`Error::ConnectionLost`]
    /// once the display connection has become invalid. A failing poll ends
    /// the run with that error.
    pub fn run(&mut self) -> Result<()> {
        debug_assert!(self.runs_tasks_on_current_thread());
        info!("🔁 Event loop running ({} tasks queued)", self.queue.len());

        while self.should_continue() {
            self.run_expired_tasks();
            if !self.should_continue() {
                break;
            }
            let deadline = self.queue.next_deadline();
            self.wait_until(deadline);

            if let Some(failure) = self.failure.take() {
                self.stop.store(false, Ordering::Release);
                return Err(failure);
            }
        }

        self.stop.store(false, Ordering::Release);

        if !self.state.display.is_valid() {
            warn!("⚠️ Event loop exiting: display connection is no longer valid");
            return Err(Error::ConnectionLost);
        }

        info!("🛑 Event loop stopped");
        Ok(())
    }

    fn should_continue(&self) -> bool {
        !self.stop.load(Ordering::Acquire) && self.state.display.is_valid()
    }

    fn run_expired_tasks(&mut self) {
        let expired = self.queue.pop_expired(Instant::now());
        if !expired.is_empty() {
            trace!("⏰ Running {} expired tasks", expired.len());
        }
        for task in expired {
            (self.on_task_expired)(task);
        }
    }

    /// Block until `deadline`, a wakeup, or display readability.
    fn wait_until(&mut self, deadline: Option<TaskTimePoint>) {
        if !self.prepare_wait() {
            return;
        }

        loop {
            let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match self.event_loop.dispatch(timeout, &mut self.state) {
                Ok(()) => return,
                Err(calloop::Error::IoError(e)) if e.kind() == io::ErrorKind::Interrupted => {
                    trace!("🔁 Wait interrupted, retrying");
                }
                Err(e) => {
                    error!("❌ Waiting for events failed: {}", e);
                    self.failure = Some(e.into());
                    return;
                }
            }
        }
    }

    /// Drain buffered messages and flush before blocking.
    ///
    /// A readiness wait cannot see messages a previous read already pulled
    /// into the local buffer.
    fn prepare_wait(&mut self) -> bool {
        let display = &mut self.state.display;

        match display.dispatch_pending() {
            Ok(count) if count > 0 => trace!("📨 Dispatched {} buffered display events", count),
            Ok(_) => {}
            Err(e) if is_transient(&e) => {}
            Err(e) => {
                error!("❌ Dispatching buffered display events failed: {}", e);
                display.invalidate();
                return false;
            }
        }
        if !display.is_valid() {
            return false;
        }

        match display.flush() {
            Ok(()) => true,
            Err(e) if is_transient(&e) => true,
            Err(e) => {
                error!("❌ Display flush failed: {}", e);
                display.invalidate();
                false
            }
        }
    }
}
