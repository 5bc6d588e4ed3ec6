//! Protocol event handlers

use log::{debug, info, trace, warn};
use wayland_client::protocol::{
    wl_compositor::WlCompositor,
    wl_keyboard::{self, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_registry::{self, WlRegistry},
    wl_seat::{self, WlSeat},
    wl_shell::WlShell,
    wl_shell_surface::{self, WlShellSurface},
    wl_shm::{self, WlShm},
    wl_surface::{self, WlSurface},
    wl_touch::{self, WlTouch},
};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

use super::cursor::CursorImage;
use super::{
    WaylandState, COMPOSITOR_VERSION, SEAT_VERSION, SHM_VERSION, WL_SHELL_VERSION,
    XDG_WM_BASE_VERSION,
};

impl Dispatch<WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => match interface.as_str() {
                "wl_compositor" => {
                    let version = version.min(COMPOSITOR_VERSION);
                    state.compositor = Some(registry.bind(name, version, qh, ()));
                    debug!("🔗 Bound wl_compositor v{}", version);
                }
                "xdg_wm_base" => {
                    let version = version.min(XDG_WM_BASE_VERSION);
                    state.xdg_wm_base = Some(registry.bind(name, version, qh, ()));
                    debug!("🔗 Bound xdg_wm_base v{}", version);
                }
                "wl_shell" => {
                    state.wl_shell = Some(registry.bind(name, WL_SHELL_VERSION, qh, ()));
                    debug!("🔗 Bound wl_shell v{}", WL_SHELL_VERSION);
                }
                "wl_seat" if state.seat.is_none() => {
                    let version = version.min(SEAT_VERSION);
                    let seat: WlSeat = registry.bind(name, version, qh, ());
                    state.seat = Some((name, seat));
                    debug!("🔗 Bound wl_seat v{}", version);
                }
                "wl_shm" => {
                    let shm: WlShm = registry.bind(name, SHM_VERSION, qh, ());
                    state.cursor = CursorImage::load(conn, &shm, &state.cursor_config);
                    state.shm = Some(shm);
                    debug!("🔗 Bound wl_shm v{}", SHM_VERSION);
                }
                _ => trace!("Ignoring global {} v{}", interface, version),
            },
            wl_registry::Event::GlobalRemove { name } => {
                if state.seat.as_ref().map(|(seat_name, _)| *seat_name) == Some(name) {
                    info!("🔌 Seat removed, releasing input devices");
                    state.release_devices();
                    if let Some((_, seat)) = state.seat.take() {
                        if seat.version() >= 5 {
                            seat.release();
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlCompositor, ()> for WaylandState {
    fn event(
        _: &mut Self,
        _: &WlCompositor,
        _: <WlCompositor as Proxy>::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<WlSurface, ()> for WaylandState {
    fn event(
        _: &mut Self,
        _: &WlSurface,
        event: wl_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        trace!("Surface event: {:?}", event);
    }
}

impl Dispatch<WlShm, ()> for WaylandState {
    fn event(
        _: &mut Self,
        _: &WlShm,
        event: wl_shm::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            trace!("Shm format available: {:?}", format);
        }
    }
}

impl Dispatch<XdgWmBase, ()> for WaylandState {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for WaylandState {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            if !state.window.configured {
                debug!("🪟 First configure acked");
            }
            state.window.configured = true;
        }
    }
}

impl Dispatch<XdgToplevel, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                let requested = (width as u32, height as u32);
                if width > 0
                    && height > 0
                    && requested != (state.window.width, state.window.height)
                {
                    info!(
                        "📐 Compositor requested {}x{}, resizing is not handled",
                        width, height
                    );
                }
            }
            xdg_toplevel::Event::Close => {
                info!("🚪 Compositor asked the window to close");
                state.window.close_requested = true;
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShell, ()> for WaylandState {
    fn event(
        _: &mut Self,
        _: &WlShell,
        _: <WlShell as Proxy>::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<WlShellSurface, ()> for WaylandState {
    fn event(
        _: &mut Self,
        shell_surface: &WlShellSurface,
        event: wl_shell_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_shell_surface::Event::Ping { serial } => shell_surface.pong(serial),
            wl_shell_surface::Event::Configure { width, height, .. } => {
                info!(
                    "📐 Compositor requested {}x{}, resizing is not handled",
                    width, height
                );
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSeat, ()> for WaylandState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_seat::Event::Capabilities {
                capabilities: WEnum::Value(capabilities),
            } => {
                debug!("💺 Seat capabilities: {:?}", capabilities);

                let has_pointer = capabilities.contains(wl_seat::Capability::Pointer);
                if has_pointer && state.devices.pointer.is_none() {
                    state.devices.pointer = Some(seat.get_pointer(qh, ()));
                    state.handler.pointer_attached();
                } else if !has_pointer {
                    if let Some(pointer) = state.devices.pointer.take() {
                        if pointer.version() >= 3 {
                            pointer.release();
                        }
                        state.handler.pointer_detached();
                    }
                }

                let has_touch = capabilities.contains(wl_seat::Capability::Touch);
                if has_touch && state.devices.touch.is_none() {
                    state.devices.touch = Some(seat.get_touch(qh, ()));
                    state.handler.touch_attached();
                } else if !has_touch {
                    if let Some(touch) = state.devices.touch.take() {
                        if touch.version() >= 3 {
                            touch.release();
                        }
                        state.handler.touch_detached();
                    }
                }

                let has_keyboard = capabilities.contains(wl_seat::Capability::Keyboard);
                if has_keyboard && state.devices.keyboard.is_none() {
                    state.devices.keyboard = Some(seat.get_keyboard(qh, ()));
                } else if !has_keyboard {
                    if let Some(keyboard) = state.devices.keyboard.take() {
                        if keyboard.version() >= 3 {
                            keyboard.release();
                        }
                    }
                }
            }
            wl_seat::Event::Capabilities {
                capabilities: WEnum::Unknown(raw),
            } => warn!("⚠️ Unknown seat capabilities 0x{:x}", raw),
            wl_seat::Event::Name { name } => debug!("💺 Seat name: {}", name),
            _ => {}
        }
    }
}

impl Dispatch<WlPointer, ()> for WaylandState {
    fn event(
        state: &mut Self,
        pointer: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter {
                serial,
                surface_x,
                surface_y,
                ..
            } => {
                if let (Some(cursor), Some(compositor)) =
                    (state.cursor.as_mut(), state.compositor.as_ref())
                {
                    cursor.apply(pointer, serial, compositor, qh);
                }
                state.handler.pointer_enter(surface_x, surface_y);
            }
            wl_pointer::Event::Leave { .. } => state.handler.pointer_leave(),
            wl_pointer::Event::Motion {
                surface_x,
                surface_y,
                ..
            } => state.handler.pointer_motion(surface_x, surface_y),
            wl_pointer::Event::Button {
                button,
                state: button_state,
                ..
            } => {
                let pressed = button_state == WEnum::Value(wl_pointer::ButtonState::Pressed);
                state.handler.pointer_button(button, pressed);
            }
            wl_pointer::Event::Axis { .. } => state.handler.pointer_axis(),
            _ => {}
        }
    }
}

impl Dispatch<WlTouch, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlTouch,
        event: wl_touch::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_touch::Event::Down { id, x, y, .. } => state.handler.touch_down(id, x, y),
            wl_touch::Event::Up { id, .. } => state.handler.touch_up(id),
            wl_touch::Event::Motion { id, x, y, .. } => state.handler.touch_motion(id, x, y),
            wl_touch::Event::Frame => state.handler.touch_frame(),
            wl_touch::Event::Cancel => state.handler.touch_cancel(),
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for WaylandState {
    fn event(
        _: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                trace!("⌨️ Keymap {:?} ({} bytes), closing", format, size);
                drop(fd);
            }
            wl_keyboard::Event::Key { key, state, .. } => {
                trace!("⌨️ Key {} {:?}", key, state);
            }
            other => trace!("⌨️ Keyboard event: {:?}", other),
        }
    }
}
