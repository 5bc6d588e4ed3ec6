//! Input translation
//!
//! Compositor seat callbacks (pointer and touch) are reduced to a single
//! pointer-event model the rendering engine understands.
//!
//! # Features
//!
//! - **Pointer**: button presses become `Down`/`Move`/`Up` phases, motion
//!   only updates the tracked position
//! - **Touch**: one contact at a time; other contacts are ignored until the
//!   active one lifts
//! - **Cancel**: a compositor cancel always reaches the engine, even with no
//!   contact down
//!
//! The display layer calls into [`SeatEventHandler`]; the [`InputRouter`]
//! implements it and emits [`PointerEvent`]s to a [`PointerEventSink`].

pub mod router;

pub use router::{InputRouter, PointerDeviceState, TouchContactState};

/// Button mask carried by every mouse event
pub const PRIMARY_BUTTON: u64 = 1;

/// Phase of a pointer interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Up,
    Down,
    Move,
    Cancel,
}

/// Physical source of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Mouse,
    Touch,
}

impl DeviceKind {
    /// Button mask the engine expects for this kind of device
    pub fn buttons(self) -> u64 {
        match self {
            DeviceKind::Mouse => PRIMARY_BUTTON,
            DeviceKind::Touch => 0,
        }
    }
}

/// A pointer event in surface-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub device_kind: DeviceKind,
    pub x: f64,
    pub y: f64,
    pub buttons: u64,
    /// Monotonic clock, microseconds
    pub timestamp_micros: u64,
}

impl PointerEvent {
    pub fn new(
        phase: PointerPhase,
        device_kind: DeviceKind,
        x: f64,
        y: f64,
        timestamp_micros: u64,
    ) -> Self {
        Self {
            phase,
            device_kind,
            x,
            y,
            buttons: device_kind.buttons(),
            timestamp_micros,
        }
    }
}

/// Receiver of translated pointer events, normally the rendering engine.
///
/// Returns `false` when the event could not be delivered.
pub trait PointerEventSink {
    fn send_pointer_event(&self, event: &PointerEvent) -> bool;
}

/// Seat callbacks forwarded by the display connection.
///
/// Coordinates are surface-local. Touch ids are the compositor's contact ids.
pub trait SeatEventHandler {
    /// The seat gained a pointer device
    fn pointer_attached(&mut self);
    /// The seat lost its pointer device
    fn pointer_detached(&mut self);
    fn pointer_enter(&mut self, x: f64, y: f64);
    fn pointer_leave(&mut self) {}
    fn pointer_motion(&mut self, x: f64, y: f64);
    fn pointer_button(&mut self, code: u32, pressed: bool);
    fn pointer_axis(&mut self) {}

    fn touch_attached(&mut self);
    fn touch_detached(&mut self);
    fn touch_down(&mut self, id: i32, x: f64, y: f64);
    fn touch_up(&mut self, id: i32);
    fn touch_motion(&mut self, id: i32, x: f64, y: f64);
    fn touch_frame(&mut self) {}
    fn touch_cancel(&mut self);
}

/// Current `CLOCK_MONOTONIC` reading in microseconds
pub fn monotonic_micros() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return 0;
    }
    (ts.tv_sec as u64) * 1_000_000 + (ts.tv_nsec as u64) / 1_000
}
