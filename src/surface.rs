//! On-screen drawing surface
//!
//! Binds the window's `wl_surface` to an EGL window surface and an OpenGL ES
//! 2 context. Setup fails fast: any failing EGL step aborts construction and
//! releases what was already created.
//!
//! After [`SurfaceBinder::invalidate`] every operation is rejected with a
//! logged diagnostic instead of touching EGL.

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

use khronos_egl as egl;
use log::{debug, error, info, warn};
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::Proxy;
use wayland_egl::WlEglSurface;

use crate::engine::RenderDelegate;
use crate::error::{Error, Result};

/// Framebuffer id reported once the binder is unusable
pub const INVALID_FRAMEBUFFER_ID: u32 = 999;

/// Default on-screen framebuffer
pub const ONSCREEN_FRAMEBUFFER_ID: u32 = 0;

/// RGBA 8888, no depth or stencil, window-capable, ES2 renderable
pub(crate) const CONFIG_ATTRIBUTES: [egl::Int; 17] = [
    egl::RED_SIZE,
    8,
    egl::GREEN_SIZE,
    8,
    egl::BLUE_SIZE,
    8,
    egl::ALPHA_SIZE,
    8,
    egl::DEPTH_SIZE,
    0,
    egl::STENCIL_SIZE,
    0,
    egl::SURFACE_TYPE,
    egl::WINDOW_BIT,
    egl::RENDERABLE_TYPE,
    egl::OPENGL_ES2_BIT,
    egl::NONE,
];

pub(crate) const CONTEXT_ATTRIBUTES: [egl::Int; 3] = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];

type EglInstance = egl::DynamicInstance<egl::EGL1_4>;

/// Name and numeric code of an EGL error, for diagnostics
pub(crate) fn describe_egl_error(err: egl::Error) -> String {
    format!("{:?} (0x{:04x})", err, err.native())
}

fn setup_error(stage: &'static str, err: egl::Error) -> Error {
    let detail = describe_egl_error(err);
    error!("❌ {} failed: {}", stage, detail);
    Error::Egl { stage, detail }
}

/// EGL display, surface and context for the window
pub struct SurfaceBinder {
    egl: EglInstance,
    display: egl::Display,
    surface: egl::Surface,
    context: egl::Context,
    /// Native window the EGL surface draws into; must outlive it
    _window: WlEglSurface,
    width: u32,
    height: u32,
    valid: Cell<bool>,
}

impl SurfaceBinder {
    /// Create the EGL triple for `surface` on the connection behind
    /// `display_ptr` (a native `wl_display`).
    pub fn new(
        display_ptr: *mut c_void,
        surface: &WlSurface,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if display_ptr.is_null() {
            return Err(Error::Surface("no native display".into()));
        }
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let window = WlEglSurface::new(surface.id(), width as i32, height as i32)
            .map_err(|e| Error::Surface(format!("wl_egl_window: {:?}", e)))?;

        // SAFETY: loads libEGL; the instance only hands out function pointers
        let egl = unsafe { EglInstance::load_required() }
            .map_err(|e| Error::Surface(format!("could not load libEGL: {:?}", e)))?;

        egl.bind_api(egl::OPENGL_ES_API)
            .map_err(|e| setup_error("eglBindAPI", e))?;

        // SAFETY: `display_ptr` is the live wl_display of the connection that
        // owns `surface`, which outlives this binder
        let display = unsafe { egl.get_display(display_ptr as egl::NativeDisplayType) }
            .ok_or_else(|| Error::Egl {
                stage: "eglGetDisplay",
                detail: "no display for the wayland connection".into(),
            })?;

        let (major, minor) = egl
            .initialize(display)
            .map_err(|e| setup_error("eglInitialize", e))?;
        debug!("🎨 EGL {}.{} initialized", major, minor);

        match Self::create_surface_and_context(&egl, display, &window) {
            Ok((surface, context)) => {
                info!("✅ EGL surface bound ({}x{})", width, height);
                Ok(Self {
                    egl,
                    display,
                    surface,
                    context,
                    _window: window,
                    width,
                    height,
                    valid: Cell::new(true),
                })
            }
            Err(e) => {
                let _ = egl.terminate(display);
                Err(e)
            }
        }
    }

    fn create_surface_and_context(
        egl: &EglInstance,
        display: egl::Display,
        window: &WlEglSurface,
    ) -> Result<(egl::Surface, egl::Context)> {
        let config = egl
            .choose_first_config(display, &CONFIG_ATTRIBUTES)
            .map_err(|e| setup_error("eglChooseConfig", e))?
            .ok_or_else(|| Error::Egl {
                stage: "eglChooseConfig",
                detail: "no matching RGBA8888 ES2 config".into(),
            })?;

        // SAFETY: `window` is a live wl_egl_window owned by the binder
        let surface = unsafe {
            egl.create_window_surface(
                display,
                config,
                window.ptr() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(|e| setup_error("eglCreateWindowSurface", e))?;

        match egl.create_context(display, config, None, &CONTEXT_ATTRIBUTES) {
            Ok(context) => Ok((surface, context)),
            Err(e) => {
                let _ = egl.destroy_surface(display, surface);
                Err(setup_error("eglCreateContext", e))
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Stop using EGL, typically after the display connection was lost
    pub fn invalidate(&self) {
        if self.valid.replace(false) {
            warn!("⚠️ Surface binder invalidated");
        }
    }

    fn check_valid(&self, operation: &str) -> bool {
        check_valid(&self.valid, operation)
    }
}

fn check_valid(valid: &Cell<bool>, operation: &str) -> bool {
    if !valid.get() {
        warn!("⚠️ {} rejected: invalid display", operation);
    }
    valid.get()
}

fn framebuffer_id(valid: &Cell<bool>) -> u32 {
    if check_valid(valid, "onscreen_framebuffer_id") {
        ONSCREEN_FRAMEBUFFER_ID
    } else {
        INVALID_FRAMEBUFFER_ID
    }
}

impl RenderDelegate for SurfaceBinder {
    fn make_current(&self) -> bool {
        if !self.check_valid("make_current") {
            return false;
        }
        match self.egl.make_current(
            self.display,
            Some(self.surface),
            Some(self.surface),
            Some(self.context),
        ) {
            Ok(()) => true,
            Err(e) => {
                error!("❌ eglMakeCurrent failed: {}", describe_egl_error(e));
                false
            }
        }
    }

    fn clear_current(&self) -> bool {
        if !self.check_valid("clear_current") {
            return false;
        }
        match self.egl.make_current(self.display, None, None, None) {
            Ok(()) => true,
            Err(e) => {
                error!("❌ eglMakeCurrent(none) failed: {}", describe_egl_error(e));
                false
            }
        }
    }

    fn present(&self) -> bool {
        if !self.check_valid("present") {
            return false;
        }
        match self.egl.swap_buffers(self.display, self.surface) {
            Ok(()) => true,
            Err(e) => {
                error!("❌ eglSwapBuffers failed: {}", describe_egl_error(e));
                false
            }
        }
    }

    fn onscreen_framebuffer_id(&self) -> u32 {
        framebuffer_id(&self.valid)
    }

    fn resolve_proc_address(&self, name: &str) -> *const c_void {
        if !self.check_valid("resolve_proc_address") {
            return ptr::null();
        }
        match self.egl.get_proc_address(name) {
            Some(f) => f as *const c_void,
            None => {
                warn!("⚠️ Could not resolve GL entry point {}", name);
                ptr::null()
            }
        }
    }
}

impl Drop for SurfaceBinder {
    fn drop(&mut self) {
        let _ = self.egl.make_current(self.display, None, None, None);
        let _ = self.egl.destroy_context(self.display, self.context);
        let _ = self.egl.destroy_surface(self.display, self.surface);
        let _ = self.egl.terminate(self.display);
        debug!(
            "🧹 EGL resources released ({}x{} window)",
            self.width, self.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(list: &[egl::Int], key: egl::Int) -> Option<egl::Int> {
        list.chunks(2)
            .find(|pair| pair[0] == key)
            .and_then(|pair| pair.get(1).copied())
    }

    #[test]
    fn test_config_requests_rgba8888_without_depth_or_stencil() {
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::RED_SIZE), Some(8));
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::GREEN_SIZE), Some(8));
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::BLUE_SIZE), Some(8));
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::ALPHA_SIZE), Some(8));
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::DEPTH_SIZE), Some(0));
        assert_eq!(attribute(&CONFIG_ATTRIBUTES, egl::STENCIL_SIZE), Some(0));
        assert_eq!(
            attribute(&CONFIG_ATTRIBUTES, egl::RENDERABLE_TYPE),
            Some(egl::OPENGL_ES2_BIT)
        );
        assert_eq!(CONFIG_ATTRIBUTES.last(), Some(&egl::NONE));
    }

    #[test]
    fn test_context_requests_es2() {
        assert_eq!(
            attribute(&CONTEXT_ATTRIBUTES, egl::CONTEXT_CLIENT_VERSION),
            Some(2)
        );
        assert_eq!(CONTEXT_ATTRIBUTES.last(), Some(&egl::NONE));
    }

    #[test]
    fn test_egl_error_description_names_the_error() {
        let text = describe_egl_error(egl::Error::BadSurface);
        assert!(text.contains("BadSurface"));
        assert!(text.contains("0x300d"));
    }

    #[test]
    fn test_sentinel_framebuffer_id() {
        assert_eq!(INVALID_FRAMEBUFFER_ID, 999);
        assert_eq!(ONSCREEN_FRAMEBUFFER_ID, 0);
    }

    #[test]
    fn test_invalidated_binder_reports_sentinel_framebuffer() {
        let valid = Cell::new(true);
        assert_eq!(framebuffer_id(&valid), ONSCREEN_FRAMEBUFFER_ID);
        assert!(check_valid(&valid, "present"));

        valid.set(false);
        assert_eq!(framebuffer_id(&valid), INVALID_FRAMEBUFFER_ID);
        assert!(!check_valid(&valid, "present"));
    }
}
