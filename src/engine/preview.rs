//! Built-in preview engine
//!
//! Paints a solid frame on a fixed cadence through the [`RenderDelegate`],
//! tinted by the pointer state, so the shell can run without an external
//! engine library.

use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Duration;

use glow::HasContext;
use log::{debug, info, trace, warn};

use super::{LaunchArgs, RenderDelegate, RenderingEngine, WindowMetrics};
use crate::error::{Error, Result};
use crate::event_loop::{deadline_from_engine_time, TaskRunner};
use crate::input::{monotonic_micros, PointerEvent, PointerPhase};

/// Work items the preview engine schedules for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTask {
    Frame,
}

pub struct PreviewEngine {
    runner: TaskRunner<PreviewTask>,
    renderer: Rc<dyn RenderDelegate>,
    /// Loaded on the first frame, once a context is current
    gl: Option<glow::Context>,
    frame_interval: Duration,
    metrics: Option<WindowMetrics>,
    pointer: (f64, f64),
    pressed: bool,
    frames: u64,
    failed_frames: u64,
}

impl PreviewEngine {
    fn schedule_frame(&self, delay: Duration) {
        let now_nanos = monotonic_micros().saturating_mul(1_000);
        let target = now_nanos.saturating_add(delay.as_nanos() as u64);
        self.runner
            .post_task(PreviewTask::Frame, deadline_from_engine_time(target, now_nanos));
    }

    /// Frames presented successfully
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    pub fn metrics(&self) -> Option<WindowMetrics> {
        self.metrics
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Clear colour for the current pointer state
    pub fn clear_color(&self) -> [f32; 4] {
        let (width, height) = self
            .metrics
            .map(|m| (m.width.max(1) as f64, m.height.max(1) as f64))
            .unwrap_or((1.0, 1.0));
        let red = (self.pointer.0 / width).clamp(0.0, 1.0) as f32;
        let green = (self.pointer.1 / height).clamp(0.0, 1.0) as f32;
        let blue = if self.pressed { 0.9 } else { 0.3 };
        [red * 0.6, green * 0.6, blue, 1.0]
    }

    fn draw_frame(&mut self) -> bool {
        if !self.renderer.make_current() {
            return false;
        }

        let [r, g, b, a] = self.clear_color();
        let (width, height) = self
            .metrics
            .map(|m| (m.width as i32, m.height as i32))
            .unwrap_or((0, 0));
        let framebuffer =
            NonZeroU32::new(self.renderer.onscreen_framebuffer_id()).map(glow::NativeFramebuffer);

        let renderer = self.renderer.clone();
        let gl = self.gl.get_or_insert_with(|| {
            debug!("🎨 Loading GL entry points");
            // SAFETY: the delegate's context is current on this thread
            unsafe {
                glow::Context::from_loader_function(|name| renderer.resolve_proc_address(name))
            }
        });

        // SAFETY: a context is current on this thread and `gl` was loaded from it
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            gl.viewport(0, 0, width, height);
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }

        let presented = self.renderer.present();
        self.renderer.clear_current();
        presented
    }
}

impl RenderingEngine for PreviewEngine {
    type Task = PreviewTask;

    fn launch(args: LaunchArgs<PreviewTask>) -> Result<Self> {
        if !args.assets_path.is_dir() {
            return Err(Error::EngineLaunch(format!(
                "assets path {} is not a directory",
                args.assets_path.display()
            )));
        }
        if args.frame_interval.is_zero() {
            return Err(Error::EngineLaunch("frame interval must be non-zero".into()));
        }

        info!(
            "🚀 Preview engine launched (assets: {}, {} args)",
            args.assets_path.display(),
            args.command_line_args.len()
        );
        debug!("📄 Engine data file: {}", args.icu_data_path.display());

        let engine = Self {
            runner: args.task_runner,
            renderer: args.renderer,
            gl: None,
            frame_interval: args.frame_interval,
            metrics: None,
            pointer: (0.0, 0.0),
            pressed: false,
            frames: 0,
            failed_frames: 0,
        };
        engine.schedule_frame(Duration::ZERO);
        Ok(engine)
    }

    fn run_task(&mut self, task: PreviewTask) -> bool {
        match task {
            PreviewTask::Frame => {
                let drawn = self.metrics.is_some() && self.draw_frame();
                if drawn {
                    self.frames += 1;
                    trace!("🎨 Frame {} presented", self.frames);
                } else {
                    self.failed_frames += 1;
                }
                self.schedule_frame(self.frame_interval);
                drawn
            }
        }
    }

    fn send_window_metrics(&mut self, metrics: WindowMetrics) -> bool {
        if metrics.width == 0 || metrics.height == 0 || !(metrics.pixel_ratio > 0.0) {
            warn!("⚠️ Rejecting window metrics {:?}", metrics);
            return false;
        }
        debug!(
            "📐 Window metrics {}x{} @{}",
            metrics.width, metrics.height, metrics.pixel_ratio
        );
        self.metrics = Some(metrics);
        true
    }

    fn send_pointer_event(&mut self, event: &PointerEvent) -> bool {
        self.pointer = (event.x, event.y);
        self.pressed = matches!(event.phase, PointerPhase::Down | PointerPhase::Move);
        trace!("🖱️ Engine pointer {:?} at ({:.1}, {:.1})", event.phase, event.x, event.y);
        true
    }
}
