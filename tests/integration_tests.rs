//! Integration tests for Wayhost
//!
//! These tests drive the public API end to end without a compositor: a
//! socket pair stands in for the display connection, its bytes are decoded
//! into seat callbacks, and the routed pointer events reach an engine through
//! tasks on the timed event loop.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use wayhost::input::{DeviceKind, PointerPhase};
use wayhost::{
    DisplaySource, Error, InputRouter, PointerEvent, PointerEventSink, SeatEventHandler,
    TaskRunner, TimedEventLoop,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// One byte per seat callback
fn decode(router: &mut InputRouter, byte: u8) {
    match byte {
        b'p' => router.pointer_attached(),
        b't' => router.touch_attached(),
        b'm' => router.pointer_motion(10.0, 20.0),
        b'b' => router.pointer_button(0x110, true),
        b'r' => router.pointer_button(0x110, false),
        b'd' => router.touch_down(1, 5.0, 6.0),
        b'D' => router.touch_down(2, 7.0, 8.0),
        b'u' => router.touch_up(1),
        b'c' => router.touch_cancel(),
        _ => {}
    }
}

struct ScriptedDisplay {
    stream: UnixStream,
    router: InputRouter,
    valid: bool,
}

impl DisplaySource for ScriptedDisplay {
    fn poll_fd(&self) -> io::Result<OwnedFd> {
        self.stream.as_fd().try_clone_to_owned()
    }

    fn dispatch_pending(&mut self) -> io::Result<usize> {
        Ok(0)
    }

    fn dispatch_readable(&mut self) -> io::Result<usize> {
        let mut buf = [0u8; 32];
        let count = self.stream.read(&mut buf)?;
        if count == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        for byte in &buf[..count] {
            decode(&mut self.router, *byte);
        }
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// Engine stand-in: pointer events are deferred as tasks, the way an engine
/// hands input to its own scheduler
enum EngineTask {
    Deliver(PointerEvent),
}

struct DeferringSink {
    runner: Rc<RefCell<Option<TaskRunner<EngineTask>>>>,
}

impl PointerEventSink for DeferringSink {
    fn send_pointer_event(&self, event: &PointerEvent) -> bool {
        match self.runner.borrow().as_ref() {
            Some(runner) => {
                runner.post_task(EngineTask::Deliver(*event), Instant::now());
                true
            }
            None => false,
        }
    }
}

struct Running {
    runner: TaskRunner<EngineTask>,
    compositor: UnixStream,
    delivered: mpsc::Receiver<PointerEvent>,
    handle: thread::JoinHandle<Result<(), Error>>,
}

fn start() -> Running {
    let (ours, compositor) = UnixStream::pair().expect("socket pair");
    ours.set_nonblocking(true).expect("nonblocking");

    let (delivered_tx, delivered) = mpsc::channel();
    let (runner_tx, runner_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let runner_slot = Rc::new(RefCell::new(None));
        let sink: Rc<dyn PointerEventSink> = Rc::new(DeferringSink {
            runner: runner_slot.clone(),
        });
        let display = ScriptedDisplay {
            stream: ours,
            router: InputRouter::new(Some(sink)),
            valid: true,
        };

        let mut event_loop = TimedEventLoop::new(display, move |task: EngineTask| match task {
            EngineTask::Deliver(event) => {
                let _ = delivered_tx.send(event);
            }
        })?;
        *runner_slot.borrow_mut() = Some(event_loop.task_runner());
        runner_tx
            .send(event_loop.task_runner())
            .expect("test thread alive");
        event_loop.run()
    });

    let runner = runner_rx.recv_timeout(RECV_TIMEOUT).expect("loop started");
    Running {
        runner,
        compositor,
        delivered,
        handle,
    }
}

fn collect(running: &Running, count: usize) -> Vec<PointerEvent> {
    (0..count)
        .map(|_| {
            running
                .delivered
                .recv_timeout(RECV_TIMEOUT)
                .expect("event delivered")
        })
        .collect()
}

#[test]
fn test_mouse_click_reaches_engine() {
    let mut running = start();

    running.compositor.write_all(b"pmmbr").expect("write");

    let events = collect(&running, 2);
    assert_eq!(events[0].phase, PointerPhase::Down);
    assert_eq!(events[1].phase, PointerPhase::Up);
    assert!(events.iter().all(|e| e.device_kind == DeviceKind::Mouse));
    assert_eq!((events[0].x, events[0].y), (10.0, 20.0));
    assert!(events[0].timestamp_micros <= events[1].timestamp_micros);

    running.runner.stop();
    assert!(running.handle.join().expect("loop thread").is_ok());
}

#[test]
fn test_second_touch_is_ignored_until_release() {
    let mut running = start();

    running.compositor.write_all(b"tdDuD").expect("write");

    let events = collect(&running, 3);
    let phases: Vec<_> = events.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![PointerPhase::Down, PointerPhase::Up, PointerPhase::Down]
    );
    assert_eq!((events[2].x, events[2].y), (7.0, 8.0));
    assert!(running
        .delivered
        .recv_timeout(Duration::from_millis(50))
        .is_err());

    running.runner.stop();
    assert!(running.handle.join().expect("loop thread").is_ok());
}

#[test]
fn test_compositor_hangup_stops_the_loop() {
    let mut running = start();

    running.compositor.write_all(b"tc").expect("write");
    let events = collect(&running, 1);
    assert_eq!(events[0].phase, PointerPhase::Cancel);

    let Running {
        compositor, handle, ..
    } = running;
    drop(compositor);

    let result = handle.join().expect("loop thread");
    assert!(matches!(result, Err(Error::ConnectionLost)));
}
