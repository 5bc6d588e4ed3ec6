//! Compositor connection
//!
//! Owns the client [`Connection`], its event queue and every bound global.
//!
//! # Architecture
//!
//! ```text
//!   connect_to_env ──► registry ──► roundtrip ──► globals bound
//!                                                  │
//!        ┌────────────────┬────────────────┬───────┴────────┐
//!        ▼                ▼                ▼                ▼
//!   wl_compositor   xdg_wm_base/wl_shell  wl_seat         wl_shm
//!   (window)        (toplevel role)       (input)         (cursor)
//! ```
//!
//! Protocol callbacks are [`Dispatch`](wayland_client::Dispatch) impls on
//! [`WaylandState`] (see `dispatch.rs`). Seat input is forwarded to a
//! [`SeatEventHandler`].

pub mod cursor;
mod dispatch;

use std::ffi::c_void;
use std::io;
use std::os::fd::OwnedFd;

use log::{debug, error, info, warn};
use wayland_client::protocol::{
    wl_compositor::WlCompositor, wl_keyboard::WlKeyboard, wl_pointer::WlPointer,
    wl_seat::WlSeat, wl_shell::WlShell, wl_shell_surface::WlShellSurface, wl_shm::WlShm,
    wl_surface::WlSurface, wl_touch::WlTouch,
};
use wayland_backend::client::WaylandError;
use wayland_client::{Connection, DispatchError, EventQueue, Proxy};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::XdgSurface, xdg_toplevel::XdgToplevel, xdg_wm_base::XdgWmBase,
};

use crate::config::CursorConfig;
use crate::error::{Error, Result};
use crate::event_loop::DisplaySource;
use crate::input::SeatEventHandler;

use cursor::CursorImage;

/// Highest interface versions this client speaks
pub(crate) const COMPOSITOR_VERSION: u32 = 4;
pub(crate) const XDG_WM_BASE_VERSION: u32 = 2;
pub(crate) const WL_SHELL_VERSION: u32 = 1;
pub(crate) const SEAT_VERSION: u32 = 5;
pub(crate) const SHM_VERSION: u32 = 1;

/// Toplevel role given to the window surface
enum WindowRole {
    Xdg {
        surface: XdgSurface,
        toplevel: XdgToplevel,
    },
    Legacy(WlShellSurface),
}

#[derive(Default)]
struct WindowState {
    surface: Option<WlSurface>,
    role: Option<WindowRole>,
    width: u32,
    height: u32,
    configured: bool,
    close_requested: bool,
}

/// The seat's input devices
#[derive(Default)]
struct SeatDevices {
    pointer: Option<WlPointer>,
    touch: Option<WlTouch>,
    keyboard: Option<WlKeyboard>,
}

/// Protocol state mutated by the dispatch callbacks
pub struct WaylandState {
    compositor: Option<WlCompositor>,
    xdg_wm_base: Option<XdgWmBase>,
    wl_shell: Option<WlShell>,
    /// Registry name and proxy of the bound seat
    seat: Option<(u32, WlSeat)>,
    shm: Option<WlShm>,
    devices: SeatDevices,
    cursor_config: CursorConfig,
    cursor: Option<CursorImage>,
    window: WindowState,
    handler: Box<dyn SeatEventHandler>,
}

impl WaylandState {
    fn new(cursor_config: CursorConfig, handler: Box<dyn SeatEventHandler>) -> Self {
        Self {
            compositor: None,
            xdg_wm_base: None,
            wl_shell: None,
            seat: None,
            shm: None,
            devices: SeatDevices::default(),
            cursor_config,
            cursor: None,
            window: WindowState::default(),
            handler,
        }
    }

    /// Drop every input device and tell the handler
    fn release_devices(&mut self) {
        if let Some(pointer) = self.devices.pointer.take() {
            if pointer.version() >= 3 {
                pointer.release();
            }
            self.handler.pointer_detached();
        }
        if let Some(touch) = self.devices.touch.take() {
            if touch.version() >= 3 {
                touch.release();
            }
            self.handler.touch_detached();
        }
        if let Some(keyboard) = self.devices.keyboard.take() {
            if keyboard.version() >= 3 {
                keyboard.release();
            }
        }
    }
}

/// A live connection to the compositor
pub struct DisplayConnection {
    conn: Connection,
    queue: EventQueue<WaylandState>,
    state: WaylandState,
    valid: bool,
}

impl DisplayConnection {
    /// Connect using `WAYLAND_DISPLAY` and bind the globals the shell needs.
    ///
    /// Fails when the compositor offers no `wl_compositor` or no shell.
    pub fn connect(cursor: &CursorConfig, handler: Box<dyn SeatEventHandler>) -> Result<Self> {
        info!("🔌 Connecting to the Wayland display...");

        let conn = Connection::connect_to_env()?;
        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        let _registry = conn.display().get_registry(&qh, ());

        let mut state = WaylandState::new(cursor.clone(), handler);
        queue
            .roundtrip(&mut state)
            .map_err(|e| Error::Protocol(format!("initial roundtrip: {}", e)))?;

        if state.compositor.is_none() {
            error!("❌ Compositor did not advertise wl_compositor");
            return Err(Error::MissingGlobal("wl_compositor"));
        }
        if state.xdg_wm_base.is_none() && state.wl_shell.is_none() {
            error!("❌ Compositor advertised neither xdg_wm_base nor wl_shell");
            return Err(Error::MissingGlobal("xdg_wm_base or wl_shell"));
        }
        if state.seat.is_none() {
            warn!("⚠️ No wl_seat advertised, input will not be available");
        }

        info!(
            "✅ Connected (shell: {})",
            if state.xdg_wm_base.is_some() {
                "xdg_wm_base"
            } else {
                "wl_shell"
            }
        );

        Ok(Self {
            conn,
            queue,
            state,
            valid: true,
        })
    }

    /// Create the toplevel window surface.
    ///
    /// With `xdg_wm_base` this blocks until the first configure is acked.
    pub fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<WlSurface> {
        if !self.is_valid() {
            return Err(Error::ConnectionLost);
        }

        let qh = self.queue.handle();
        let compositor = self
            .state
            .compositor
            .as_ref()
            .ok_or(Error::MissingGlobal("wl_compositor"))?;
        let surface = compositor.create_surface(&qh, ());

        self.state.window.width = width;
        self.state.window.height = height;

        if let Some(wm_base) = self.state.xdg_wm_base.clone() {
            let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
            let toplevel = xdg_surface.get_toplevel(&qh, ());
            toplevel.set_title(title.to_string());
            surface.commit();

            self.state.window.role = Some(WindowRole::Xdg {
                surface: xdg_surface,
                toplevel,
            });

            while !self.state.window.configured {
                self.blocking_dispatch()?;
                if !self.is_valid() {
                    return Err(Error::ConnectionLost);
                }
            }
        } else if let Some(shell) = self.state.wl_shell.clone() {
            let shell_surface = shell.get_shell_surface(&surface, &qh, ());
            shell_surface.set_title(title.to_string());
            shell_surface.set_toplevel();
            self.state.window.role = Some(WindowRole::Legacy(shell_surface));
        } else {
            return Err(Error::MissingGlobal("xdg_wm_base or wl_shell"));
        }

        self.state.window.surface = Some(surface.clone());
        debug!("🪟 Window surface created ({}x{})", width, height);
        Ok(surface)
    }

    /// Block until at least one event has been dispatched
    pub fn blocking_dispatch(&mut self) -> Result<usize> {
        self.queue.blocking_dispatch(&mut self.state).map_err(|e| {
            self.valid = false;
            Error::Protocol(e.to_string())
        })
    }

    /// Native `wl_display` pointer for EGL
    pub fn display_ptr(&self) -> *mut c_void {
        self.conn.backend().display_ptr() as *mut c_void
    }

    /// Whether the compositor asked the window to close
    pub fn close_requested(&self) -> bool {
        self.state.window.close_requested
    }
}

impl DisplaySource for DisplayConnection {
    fn poll_fd(&self) -> io::Result<OwnedFd> {
        self.conn.backend().poll_fd().try_clone_to_owned()
    }

    fn dispatch_pending(&mut self) -> io::Result<usize> {
        self.queue
            .dispatch_pending(&mut self.state)
            .map_err(dispatch_io_error)
    }

    fn dispatch_readable(&mut self) -> io::Result<usize> {
        if let Some(guard) = self.queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(wayland_io_error(e)),
            }
        }
        self.dispatch_pending()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.conn.flush().map_err(wayland_io_error)
    }

    fn is_valid(&self) -> bool {
        self.valid && !self.state.window.close_requested
    }

    fn invalidate(&mut self) {
        if self.valid {
            warn!("⚠️ Display connection invalidated");
        }
        self.valid = false;
    }
}

impl Drop for DisplayConnection {
    fn drop(&mut self) {
        self.state.release_devices();

        match self.state.window.role.take() {
            Some(WindowRole::Xdg { surface, toplevel }) => {
                toplevel.destroy();
                surface.destroy();
            }
            Some(WindowRole::Legacy(_)) | None => {}
        }
        if let Some(surface) = self.state.window.surface.take() {
            surface.destroy();
        }

        if self.valid {
            let _ = self.conn.flush();
        }
        debug!("🔌 Display connection closed");
    }
}

fn wayland_io_error(err: WaylandError) -> io::Error {
    match err {
        WaylandError::Io(e) => e,
        WaylandError::Protocol(p) => io::Error::new(io::ErrorKind::Other, p.to_string()),
    }
}

fn dispatch_io_error(err: DispatchError) -> io::Error {
    match err {
        DispatchError::Backend(e) => wayland_io_error(e),
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}
