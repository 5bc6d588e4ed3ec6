//! Performance benchmarks for Wayhost scheduling and input
//!
//! These benchmarks cover the paths that run on every frame or every input
//! event: queueing tasks and translating seat callbacks.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use wayhost::event_loop::TaskQueue;
use wayhost::input::{InputRouter, PointerEvent, PointerEventSink, SeatEventHandler};

/// Benchmark pushing tasks with spread-out deadlines
fn bench_task_queue_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue_push");

    for task_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            format!("push_{}_tasks", task_count),
            task_count,
            |b, &task_count| {
                b.iter_batched(
                    || (TaskQueue::new(), Instant::now()),
                    |(queue, base)| {
                        for i in 0..task_count {
                            let offset = Duration::from_micros((i * 7919 % 1000) as u64);
                            queue.push(black_box(i), base + offset);
                        }
                        queue
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark draining every expired task
fn bench_task_queue_pop_expired(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue_pop_expired");

    for task_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            format!("pop_{}_tasks", task_count),
            task_count,
            |b, &task_count| {
                b.iter_batched(
                    || {
                        let queue = TaskQueue::new();
                        let base = Instant::now();
                        for i in 0..task_count {
                            queue.push(i, base + Duration::from_micros(i as u64));
                        }
                        (queue, base + Duration::from_secs(1))
                    },
                    |(queue, now)| black_box(queue.pop_expired(now)),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

struct CountingSink(Cell<u64>);

impl PointerEventSink for CountingSink {
    fn send_pointer_event(&self, event: &PointerEvent) -> bool {
        black_box(event);
        self.0.set(self.0.get() + 1);
        true
    }
}

/// Benchmark a drag gesture through the pointer state machine
fn bench_pointer_drag(c: &mut Criterion) {
    c.bench_function("pointer_drag_100_motions", |b| {
        b.iter_batched(
            || {
                let sink: Rc<dyn PointerEventSink> = Rc::new(CountingSink(Cell::new(0)));
                let mut router = InputRouter::new(Some(sink));
                router.pointer_attached();
                router
            },
            |mut router| {
                router.pointer_button(1, true);
                for i in 0..100 {
                    router.pointer_motion(i as f64, (i * 2) as f64);
                    router.pointer_button(1, true);
                }
                router.pointer_button(1, false);
                router
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_task_queue_push,
    bench_task_queue_pop_expired,
    bench_pointer_drag
);
criterion_main!(benches);
