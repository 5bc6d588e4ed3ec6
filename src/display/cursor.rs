//! Pointer image from the system cursor theme

use log::{debug, warn};
use wayland_client::protocol::{
    wl_compositor::WlCompositor, wl_pointer::WlPointer, wl_shm::WlShm, wl_surface::WlSurface,
};
use wayland_client::{Connection, QueueHandle};
use wayland_cursor::CursorTheme;

use super::WaylandState;
use crate::config::CursorConfig;

/// Loaded cursor theme plus the surface the cursor image is drawn on
pub struct CursorImage {
    theme: CursorTheme,
    name: String,
    surface: Option<WlSurface>,
}

impl CursorImage {
    /// Load the configured theme. Failures are logged and yield `None`.
    pub fn load(conn: &Connection, shm: &WlShm, config: &CursorConfig) -> Option<Self> {
        let theme = if config.theme.is_empty() || config.theme == "default" {
            CursorTheme::load(conn, shm.clone(), config.size)
        } else {
            CursorTheme::load_from_name(conn, shm.clone(), &config.theme, config.size)
        };

        match theme {
            Ok(theme) => {
                debug!(
                    "🖱️ Loaded cursor theme '{}' at size {}",
                    config.theme, config.size
                );
                Some(Self {
                    theme,
                    name: config.name.clone(),
                    surface: None,
                })
            }
            Err(e) => {
                warn!("⚠️ Could not load cursor theme '{}': {}", config.theme, e);
                None
            }
        }
    }

    /// Show the cursor for `pointer` after an enter event with `serial`
    pub fn apply(
        &mut self,
        pointer: &WlPointer,
        serial: u32,
        compositor: &WlCompositor,
        qh: &QueueHandle<WaylandState>,
    ) {
        let Some(cursor) = self.theme.get_cursor(&self.name) else {
            warn!("⚠️ Cursor '{}' not found in theme", self.name);
            return;
        };

        let image = &cursor[0];
        let (hotspot_x, hotspot_y) = image.hotspot();
        let (width, height) = image.dimensions();

        let surface = self
            .surface
            .get_or_insert_with(|| compositor.create_surface(qh, ()));

        pointer.set_cursor(serial, Some(surface), hotspot_x as i32, hotspot_y as i32);
        surface.attach(Some(&**image), 0, 0);
        surface.damage(0, 0, width as i32, height as i32);
        surface.commit();
    }
}

impl Drop for CursorImage {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            surface.destroy();
        }
    }
}
