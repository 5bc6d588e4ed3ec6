//! # Wayhost Embedding Shell Library
//!
//! Hosts a task-driven rendering engine inside a Wayland compositor window.
//!
//! ## Architecture
//!
//! Wayhost is built on a modular architecture:
//! - `event_loop`: Single-thread scheduler for engine tasks, multiplexed with
//!   the compositor connection and a cross-thread wakeup
//! - `display`: Compositor connection, globals and protocol dispatch
//! - `input`: Pointer and touch state machines producing pointer events
//! - `surface`: EGL surface and context for the window
//! - `engine`: Rendering engine boundary plus a built-in preview engine
//! - `shell`: Composition root wiring everything together
//! - `config`: Configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wayhost::{ApplicationShell, PreviewEngine, ShellOptions, WayhostConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = WayhostConfig::default();
//!     let options = ShellOptions::from_config(&config, "build/flutter_assets".into());
//!     let mut shell = ApplicationShell::<PreviewEngine>::new(options)?;
//!     shell.run()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod logging;
pub mod shell;
pub mod surface;

// Re-export main types for easy access
pub use config::WayhostConfig;
pub use display::DisplayConnection;
pub use engine::{PreviewEngine, RenderDelegate, RenderingEngine, WindowMetrics};
pub use error::{Error, ErrorKind, Result};
pub use event_loop::{DisplaySource, TaskRunner, TaskTimePoint, TimedEventLoop};
pub use input::{InputRouter, PointerEvent, PointerEventSink, SeatEventHandler};
pub use shell::{ApplicationShell, ShellOptions};
pub use surface::SurfaceBinder;

/// Version information for Wayhost
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
