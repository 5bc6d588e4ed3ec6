//! Rendering engine boundary
//!
//! The shell drives an engine it knows only through [`RenderingEngine`];
//! the engine draws through the [`RenderDelegate`] the shell hands it and
//! schedules its work through a [`TaskRunner`].
//!
//! ```text
//!   ApplicationShell ──launch──► RenderingEngine ──post_task──► TaskRunner
//!          │                          │
//!          │ run_task / metrics /     │ make_current / present
//!          │ pointer events           ▼
//!          └──────────────────► RenderDelegate (SurfaceBinder)
//! ```

pub mod preview;

use std::ffi::c_void;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::error::Result;
use crate::event_loop::TaskRunner;
use crate::input::PointerEvent;

pub use preview::{PreviewEngine, PreviewTask};

/// Window geometry reported to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMetrics {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

/// GPU operations the engine may call during a frame.
///
/// Implementations never panic; failures are logged and reported as
/// `false`, a null pointer, or a sentinel framebuffer id.
pub trait RenderDelegate {
    fn make_current(&self) -> bool;
    fn clear_current(&self) -> bool;
    fn present(&self) -> bool;
    fn onscreen_framebuffer_id(&self) -> u32;
    fn resolve_proc_address(&self, name: &str) -> *const c_void;
}

/// Everything an engine needs to start
pub struct LaunchArgs<T> {
    /// Asset bundle directory
    pub assets_path: PathBuf,
    /// Engine data file next to the executable
    pub icu_data_path: PathBuf,
    pub command_line_args: Vec<String>,
    /// Requested pacing between frames
    pub frame_interval: Duration,
    pub task_runner: TaskRunner<T>,
    pub renderer: Rc<dyn RenderDelegate>,
}

/// An embedded, task-driven rendering engine
pub trait RenderingEngine: Sized {
    /// Opaque unit of work the engine schedules on the loop thread
    type Task: Send + 'static;

    fn launch(args: LaunchArgs<Self::Task>) -> Result<Self>;

    /// Execute a task whose deadline has passed
    fn run_task(&mut self, task: Self::Task) -> bool;

    fn send_window_metrics(&mut self, metrics: WindowMetrics) -> bool;

    fn send_pointer_event(&mut self, event: &PointerEvent) -> bool;
}
