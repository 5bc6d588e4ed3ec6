//! Pointer and touch state machines

use std::rc::Rc;

use log::{debug, trace, warn};

use super::{
    monotonic_micros, DeviceKind, PointerEvent, PointerEventSink, PointerPhase,
    SeatEventHandler,
};

/// Tracked state of the seat's pointer device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerDeviceState {
    pub x: f64,
    pub y: f64,
    /// Button code currently held, `0` when none
    pub last_button: u32,
}

impl PointerDeviceState {
    pub fn motion(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Apply a button transition and return the phase to report, if any.
    ///
    /// A second button pressed while one is held reports `Up`, and the newly
    /// pressed code becomes the held button.
    pub fn button(&mut self, code: u32, pressed: bool) -> Option<PointerPhase> {
        let button = if pressed { code } else { 0 };

        let phase = if self.last_button == 0 && button == 0 {
            None
        } else if self.last_button == 0 {
            Some(PointerPhase::Down)
        } else if button == self.last_button {
            Some(PointerPhase::Move)
        } else {
            Some(PointerPhase::Up)
        };

        self.last_button = button;
        phase
    }
}

/// Tracked state of the single touch contact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchContactState {
    pub active_id: Option<i32>,
    pub x: f64,
    pub y: f64,
}

impl TouchContactState {
    pub fn down(&mut self, id: i32, x: f64, y: f64) -> Option<PointerPhase> {
        if self.active_id.is_some() {
            return None;
        }
        self.x = x;
        self.y = y;
        self.active_id = Some(id);
        Some(PointerPhase::Down)
    }

    pub fn motion(&mut self, id: i32, x: f64, y: f64) -> Option<PointerPhase> {
        if self.active_id != Some(id) {
            return None;
        }
        self.x = x;
        self.y = y;
        Some(PointerPhase::Move)
    }

    pub fn up(&mut self, id: i32) -> Option<PointerPhase> {
        if self.active_id != Some(id) {
            return None;
        }
        self.active_id = None;
        Some(PointerPhase::Up)
    }

    pub fn cancel(&mut self) -> PointerPhase {
        self.x = 0.0;
        self.y = 0.0;
        self.active_id = None;
        PointerPhase::Cancel
    }
}

/// Translates seat callbacks into [`PointerEvent`]s.
pub struct InputRouter {
    pointer: Option<PointerDeviceState>,
    touch: Option<TouchContactState>,
    sink: Option<Rc<dyn PointerEventSink>>,
    clock: fn() -> u64,
    emitted: u64,
}

impl InputRouter {
    pub fn new(sink: Option<Rc<dyn PointerEventSink>>) -> Self {
        Self::with_clock(sink, monotonic_micros)
    }

    /// Router stamping events with `clock` (microseconds)
    pub fn with_clock(sink: Option<Rc<dyn PointerEventSink>>, clock: fn() -> u64) -> Self {
        Self {
            pointer: None,
            touch: None,
            sink,
            clock,
            emitted: 0,
        }
    }

    pub fn set_sink(&mut self, sink: Option<Rc<dyn PointerEventSink>>) {
        self.sink = sink;
    }

    pub fn pointer(&self) -> Option<&PointerDeviceState> {
        self.pointer.as_ref()
    }

    pub fn touch(&self) -> Option<&TouchContactState> {
        self.touch.as_ref()
    }

    /// Number of events handed to the sink so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self, phase: PointerPhase, device_kind: DeviceKind, x: f64, y: f64) {
        let event = PointerEvent::new(phase, device_kind, x, y, (self.clock)());
        self.emitted += 1;

        match &self.sink {
            Some(sink) => {
                if !sink.send_pointer_event(&event) {
                    warn!(
                        "⚠️ Pointer event {:?} ({:?}) at ({:.1}, {:.1}) was not delivered",
                        phase, device_kind, x, y
                    );
                }
            }
            None => debug!("🖱️ No pointer sink, dropping {:?} event", phase),
        }
    }
}

impl SeatEventHandler for InputRouter {
    fn pointer_attached(&mut self) {
        if self.pointer.is_none() {
            debug!("🖱️ Pointer attached");
            self.pointer = Some(PointerDeviceState::default());
        }
    }

    fn pointer_detached(&mut self) {
        if self.pointer.take().is_some() {
            debug!("🖱️ Pointer detached");
        }
    }

    fn pointer_enter(&mut self, x: f64, y: f64) {
        match self.pointer.as_mut() {
            Some(pointer) => pointer.motion(x, y),
            None => debug!("🖱️ Pointer enter without a pointer device"),
        }
    }

    fn pointer_leave(&mut self) {
        trace!("🖱️ Pointer left the surface");
    }

    fn pointer_motion(&mut self, x: f64, y: f64) {
        match self.pointer.as_mut() {
            Some(pointer) => pointer.motion(x, y),
            None => debug!("🖱️ Pointer motion without a pointer device"),
        }
    }

    fn pointer_button(&mut self, code: u32, pressed: bool) {
        let Some(pointer) = self.pointer.as_mut() else {
            debug!("🖱️ Pointer button without a pointer device");
            return;
        };

        let (x, y) = (pointer.x, pointer.y);
        if let Some(phase) = pointer.button(code, pressed) {
            self.emit(phase, DeviceKind::Mouse, x, y);
        }
    }

    fn touch_attached(&mut self) {
        if self.touch.is_none() {
            debug!("👆 Touch attached");
            self.touch = Some(TouchContactState::default());
        }
    }

    fn touch_detached(&mut self) {
        let Some(touch) = self.touch.take() else {
            return;
        };
        debug!("👆 Touch detached");
        if touch.active_id.is_some() {
            self.emit(PointerPhase::Cancel, DeviceKind::Touch, 0.0, 0.0);
        }
    }

    fn touch_down(&mut self, id: i32, x: f64, y: f64) {
        let Some(touch) = self.touch.as_mut() else {
            debug!("👆 Touch down without a touch device");
            return;
        };
        match touch.down(id, x, y) {
            Some(phase) => self.emit(phase, DeviceKind::Touch, x, y),
            None => trace!("👆 Ignoring touch {} while another contact is active", id),
        }
    }

    fn touch_up(&mut self, id: i32) {
        let Some(touch) = self.touch.as_mut() else {
            debug!("👆 Touch up without a touch device");
            return;
        };
        let (x, y) = (touch.x, touch.y);
        if let Some(phase) = touch.up(id) {
            self.emit(phase, DeviceKind::Touch, x, y);
        }
    }

    fn touch_motion(&mut self, id: i32, x: f64, y: f64) {
        let Some(touch) = self.touch.as_mut() else {
            debug!("👆 Touch motion without a touch device");
            return;
        };
        if let Some(phase) = touch.motion(id, x, y) {
            self.emit(phase, DeviceKind::Touch, x, y);
        }
    }

    fn touch_cancel(&mut self) {
        let Some(touch) = self.touch.as_mut() else {
            debug!("👆 Touch cancel without a touch device");
            return;
        };
        let phase = touch.cancel();
        self.emit(phase, DeviceKind::Touch, 0.0, 0.0);
    }
}
