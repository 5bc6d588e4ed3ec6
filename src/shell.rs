//! Application shell
//!
//! Composition root that owns the event loop, the drawing surface and the
//! rendering engine, and wires them together:
//!
//! ```text
//!   compositor ──► DisplayConnection ──► InputRouter ──► EnginePointerSink ─┐
//!                        │                                                   ▼
//!                  TimedEventLoop ──── task due ──────────────────► RenderingEngine
//!                                                                         │
//!                                               SurfaceBinder ◄── frame ──┘
//! ```
//!
//! Construction validates every resource up front; a shell that exists is
//! ready to [`run`](ApplicationShell::run).

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::{CursorConfig, WayhostConfig};
use crate::display::DisplayConnection;
use crate::engine::{LaunchArgs, RenderDelegate, RenderingEngine, WindowMetrics};
use crate::error::{Error, Result};
use crate::event_loop::{TaskRunner, TimedEventLoop};
use crate::input::{InputRouter, PointerEvent, PointerEventSink};
use crate::surface::SurfaceBinder;

/// Title of the toplevel window
pub const WINDOW_TITLE: &str = "Wayhost";

/// Everything needed to bring up a shell
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOptions {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
    /// Asset bundle directory handed to the engine
    pub bundle_path: PathBuf,
    /// Engine data file name, resolved next to the executable
    pub icu_data_file: String,
    pub engine_args: Vec<String>,
    pub frame_interval: Duration,
    pub cursor: CursorConfig,
}

impl ShellOptions {
    pub fn from_config(config: &WayhostConfig, bundle_path: PathBuf) -> Self {
        Self {
            width: config.window.width,
            height: config.window.height,
            pixel_ratio: config.window.pixel_ratio,
            bundle_path,
            icu_data_file: config.engine.icu_data_file.clone(),
            engine_args: config.engine.args.clone(),
            frame_interval: Duration::from_millis(config.engine.frame_interval_ms),
            cursor: config.cursor.clone(),
        }
    }
}

/// Engine slot shared by the task callback and the pointer sink
type EngineSlot<E> = Rc<RefCell<Option<E>>>;

/// Log a rejected engine call and pass the result through
fn engine_accepted(call: &str, accepted: bool) -> bool {
    if !accepted {
        warn!("⚠️ {}", Error::Engine(format!("{} rejected", call)));
    }
    accepted
}

/// Forwards routed pointer events into the engine
struct EnginePointerSink<E> {
    engine: EngineSlot<E>,
}

impl<E: RenderingEngine> PointerEventSink for EnginePointerSink<E> {
    fn send_pointer_event(&self, event: &PointerEvent) -> bool {
        match self.engine.try_borrow_mut() {
            Ok(mut slot) => match slot.as_mut() {
                Some(engine) => {
                    engine_accepted("send_pointer_event", engine.send_pointer_event(event))
                }
                None => {
                    debug!("🖱️ Pointer event before the engine is running");
                    false
                }
            },
            Err(_) => {
                warn!("⚠️ Engine busy, dropping pointer event");
                false
            }
        }
    }
}

/// Check that the data file and the asset bundle exist
pub fn resolve_resources(options: &ShellOptions, executable_dir: &Path) -> Result<PathBuf> {
    let icu_data_path = executable_dir.join(&options.icu_data_file);
    if !icu_data_path.is_file() {
        error!(
            "❌ {} not found next to the executable",
            icu_data_path.display()
        );
        return Err(Error::MissingResource(icu_data_path));
    }

    if !options.bundle_path.is_dir() {
        error!(
            "❌ Asset bundle {} is not a directory",
            options.bundle_path.display()
        );
        return Err(Error::InvalidAssetBundle(options.bundle_path.clone()));
    }

    Ok(icu_data_path)
}

fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::MissingResource(exe.clone()))
}

/// Owns and wires the embedding.
///
/// Field order matters for teardown: the engine goes first, then EGL, then
/// the loop and its display connection.
pub struct ApplicationShell<E: RenderingEngine + 'static> {
    engine: EngineSlot<E>,
    surface: Rc<SurfaceBinder>,
    event_loop: TimedEventLoop<DisplayConnection, E::Task>,
    metrics: WindowMetrics,
}

impl<E: RenderingEngine + 'static> ApplicationShell<E> {
    pub fn new(options: ShellOptions) -> Result<Self> {
        if options.width == 0 || options.height == 0 {
            return Err(Error::InvalidDimensions {
                width: options.width,
                height: options.height,
            });
        }

        let icu_data_path = resolve_resources(&options, &executable_dir()?)?;

        let engine: EngineSlot<E> = Rc::new(RefCell::new(None));
        let sink: Rc<dyn PointerEventSink> = Rc::new(EnginePointerSink {
            engine: engine.clone(),
        });
        let router = InputRouter::new(Some(sink));

        let mut display = DisplayConnection::connect(&options.cursor, Box::new(router))?;
        let wl_surface = display.create_window(options.width, options.height, WINDOW_TITLE)?;
        let surface = Rc::new(SurfaceBinder::new(
            display.display_ptr(),
            &wl_surface,
            options.width,
            options.height,
        )?);

        let task_engine = engine.clone();
        let event_loop = TimedEventLoop::new(display, move |task: E::Task| {
            match task_engine.try_borrow_mut() {
                Ok(mut slot) => match slot.as_mut() {
                    Some(engine) => {
                        engine.run_task(task);
                    }
                    None => warn!("⚠️ Dropping task: engine is not running"),
                },
                Err(_) => error!("❌ Engine re-entered while running a task"),
            }
        })?;

        let renderer: Rc<dyn RenderDelegate> = surface.clone();
        let launched = E::launch(LaunchArgs {
            assets_path: options.bundle_path.clone(),
            icu_data_path,
            command_line_args: options.engine_args.clone(),
            frame_interval: options.frame_interval,
            task_runner: event_loop.task_runner(),
            renderer,
        })?;
        *engine.borrow_mut() = Some(launched);

        let metrics = WindowMetrics {
            width: options.width,
            height: options.height,
            pixel_ratio: options.pixel_ratio,
        };

        let shell = Self {
            engine,
            surface,
            event_loop,
            metrics,
        };
        if !shell.send_window_metrics(metrics) {
            warn!("⚠️ Engine rejected the initial window metrics");
        }

        info!(
            "✅ Shell ready ({}x{} @{})",
            options.width, options.height, options.pixel_ratio
        );
        Ok(shell)
    }

    /// Handle for posting engine tasks from any thread
    pub fn task_runner(&self) -> TaskRunner<E::Task> {
        self.event_loop.task_runner()
    }

    pub fn metrics(&self) -> WindowMetrics {
        self.metrics
    }

    pub fn send_window_metrics(&self, metrics: WindowMetrics) -> bool {
        let Ok(mut slot) = self.engine.try_borrow_mut() else {
            warn!("⚠️ Engine busy, dropping window metrics");
            return false;
        };
        match slot.as_mut() {
            Some(engine) => {
                engine_accepted("send_window_metrics", engine.send_window_metrics(metrics))
            }
            None => {
                warn!("⚠️ Window metrics sent before the engine is running");
                false
            }
        }
    }

    /// Report a new window size to the engine
    pub fn set_window_size(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            warn!("⚠️ Ignoring window size {}x{}", width, height);
            return false;
        }
        self.metrics.width = width;
        self.metrics.height = height;
        self.send_window_metrics(self.metrics)
    }

    /// Inject a pointer event as if it came from the compositor
    pub fn send_pointer_event(&self, event: &PointerEvent) -> bool {
        EnginePointerSink {
            engine: self.engine.clone(),
        }
        .send_pointer_event(event)
    }

    /// Run until stopped or until the compositor goes away.
    ///
    /// A compositor close request ends the run normally.
    pub fn run(&mut self) -> Result<()> {
        info!("🚀 Running");
        match self.event_loop.run() {
            Err(Error::ConnectionLost) if self.event_loop.display().close_requested() => {
                info!("👋 Window closed");
                self.surface.invalidate();
                Ok(())
            }
            Err(e) => {
                self.surface.invalidate();
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }
}

impl<E: RenderingEngine + 'static> Drop for ApplicationShell<E> {
    fn drop(&mut self) {
        self.engine.borrow_mut().take();
        debug!("🧹 Shell torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DeviceKind, PointerPhase};
    use std::fs;
    use tempfile::tempdir;

    fn options(bundle: PathBuf) -> ShellOptions {
        ShellOptions::from_config(&WayhostConfig::default(), bundle)
    }

    #[test]
    fn test_engine_results_pass_through() {
        assert!(engine_accepted("send_window_metrics", true));
        assert!(!engine_accepted("send_pointer_event", false));
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = WayhostConfig::default();
        config.window.width = 1024;
        config.engine.frame_interval_ms = 8;
        config.engine.args = vec!["--trace".into()];

        let options = ShellOptions::from_config(&config, "bundle".into());
        assert_eq!(options.width, 1024);
        assert_eq!(options.frame_interval, Duration::from_millis(8));
        assert_eq!(options.engine_args, vec!["--trace"]);
        assert_eq!(options.icu_data_file, "icudtl.dat");
    }

    #[test]
    fn test_missing_data_file_is_setup_failure() -> Result<()> {
        let exe_dir = tempdir()?;
        let bundle = tempdir()?;

        let err = resolve_resources(&options(bundle.path().into()), exe_dir.path())
            .expect_err("data file is missing");
        assert!(matches!(err, Error::MissingResource(_)));
        assert!(err.is_fatal());
        Ok(())
    }

    #[test]
    fn test_bundle_must_be_directory() -> Result<()> {
        let exe_dir = tempdir()?;
        fs::write(exe_dir.path().join("icudtl.dat"), b"data")?;
        let not_a_dir = exe_dir.path().join("icudtl.dat");

        let err =
            resolve_resources(&options(not_a_dir), exe_dir.path()).expect_err("bundle is a file");
        assert!(matches!(err, Error::InvalidAssetBundle(_)));
        Ok(())
    }

    #[test]
    fn test_resources_resolve_next_to_executable() -> Result<()> {
        let exe_dir = tempdir()?;
        let bundle = tempdir()?;
        fs::write(exe_dir.path().join("icudtl.dat"), b"data")?;

        let path = resolve_resources(&options(bundle.path().into()), exe_dir.path())?;
        assert_eq!(path, exe_dir.path().join("icudtl.dat"));
        Ok(())
    }

    #[test]
    fn test_zero_size_rejected_before_connecting() {
        let mut options = options("bundle".into());
        options.height = 0;

        let result = ApplicationShell::<crate::engine::PreviewEngine>::new(options);
        assert!(matches!(
            result,
            Err(Error::InvalidDimensions {
                width: 800,
                height: 0
            })
        ));
    }

    struct CountingEngine {
        events: Vec<PointerPhase>,
    }

    impl RenderingEngine for CountingEngine {
        type Task = ();

        fn launch(_args: LaunchArgs<()>) -> Result<Self> {
            Ok(Self { events: Vec::new() })
        }

        fn run_task(&mut self, _task: ()) -> bool {
            true
        }

        fn send_window_metrics(&mut self, _metrics: WindowMetrics) -> bool {
            true
        }

        fn send_pointer_event(&mut self, event: &PointerEvent) -> bool {
            self.events.push(event.phase);
            true
        }
    }

    #[test]
    fn test_pointer_sink_requires_running_engine() {
        let slot: EngineSlot<CountingEngine> = Rc::new(RefCell::new(None));
        let sink = EnginePointerSink {
            engine: slot.clone(),
        };
        let event = PointerEvent::new(PointerPhase::Down, DeviceKind::Touch, 1.0, 2.0, 3);

        assert!(!sink.send_pointer_event(&event));

        *slot.borrow_mut() = Some(CountingEngine { events: Vec::new() });
        assert!(sink.send_pointer_event(&event));
        assert_eq!(
            slot.borrow().as_ref().map(|e| e.events.clone()),
            Some(vec![PointerPhase::Down])
        );
    }

    #[test]
    fn test_pointer_sink_rejects_reentrant_delivery() {
        let slot: EngineSlot<CountingEngine> =
            Rc::new(RefCell::new(Some(CountingEngine { events: Vec::new() })));
        let sink = EnginePointerSink {
            engine: slot.clone(),
        };
        let event = PointerEvent::new(PointerPhase::Move, DeviceKind::Mouse, 0.0, 0.0, 0);

        let _held = slot.borrow_mut();
        assert!(!sink.send_pointer_event(&event));
    }
}
