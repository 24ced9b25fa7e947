//! The farm: one controller thread, N worker threads, one collector
//! thread, driven by the state machine in §4.5 and the shared primitives
//! in §5 — a single mutex guarding `{state, completed_tasks}`, two
//! condition variables on it (one the controller waits on, one the
//! collector waits on), and the task queue's own independent mutex/CV.

use crate::partition::Batches;
use crate::planet::{Params, Planet};
use crate::rect::{self, Rectangle, SkipMap};
use crate::rules::Counts;
use crate::snapshot::{encode_cells, CheckpointSink, SnapshotSink};
use crate::queue::TaskQueue;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// The farm's state machine (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmState {
    DispatchB1,
    DispatchB2,
    DispatchB3,
    Collecting,
    Terminating,
}

struct Core {
    state: FarmState,
    completed_tasks: usize,
}

struct Shared {
    core: Mutex<Core>,
    controller_cv: Condvar,
    collector_cv: Condvar,
}

impl Shared {
    /// Called by a worker after finishing one rectangle. Advances the
    /// state machine and wakes the relevant waiter exactly at each batch
    /// boundary (§4.5, §5 ordering guarantees).
    fn complete_one(&self, boundary_b1: usize, boundary_b1_b2: usize, total: usize) {
        let mut core = self.core.lock().unwrap();
        core.completed_tasks += 1;
        match (core.state, core.completed_tasks) {
            (FarmState::DispatchB1, n) if n == boundary_b1 => {
                core.state = FarmState::DispatchB2;
                self.controller_cv.notify_all();
            }
            (FarmState::DispatchB2, n) if n == boundary_b1_b2 => {
                core.state = FarmState::DispatchB3;
                self.controller_cv.notify_all();
            }
            (FarmState::DispatchB3, n) if n == total => {
                core.state = FarmState::Collecting;
                self.collector_cv.notify_all();
            }
            _ => {}
        }
    }
}

/// Externally-visible control surface (§6 lifecycle signals). Every
/// request is idempotent: calling it twice, or calling it when it
/// doesn't apply yet, is harmless.
#[derive(Clone)]
pub struct FarmHandle {
    shutdown: Arc<AtomicBool>,
    checkpoint: Arc<AtomicBool>,
    snapshot_now: Arc<AtomicBool>,
    chronon: Arc<AtomicU64>,
    counts: Arc<Mutex<Option<Arc<Counts>>>>,
}

impl FarmHandle {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn request_checkpoint(&self) {
        self.checkpoint.store(true, Ordering::SeqCst);
    }

    pub fn request_snapshot_now(&self) {
        self.snapshot_now.store(true, Ordering::SeqCst);
    }

    pub fn chronon(&self) -> u64 {
        self.chronon.load(Ordering::SeqCst)
    }

    /// `(fish, shark)` population, advisory counters updated alongside
    /// the grid by the rules engine. `None` before `run` has started.
    pub fn population(&self) -> Option<(i64, i64)> {
        self.counts
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| (c.fish(), c.shark()))
    }
}

/// The running farm: owns the threads for one simulation's lifetime.
/// `run` blocks until shutdown is requested and all threads have joined.
pub struct Farm {
    planet: Arc<Planet>,
    batches: Batches,
    params: Params,
    handle: FarmHandle,
    on_chronon_completed: Box<dyn Fn(u64) + Send + Sync>,
}

impl Farm {
    pub fn new(
        planet: Arc<Planet>,
        batches: Batches,
        params: Params,
        on_chronon_completed: impl Fn(u64) + Send + Sync + 'static,
    ) -> Farm {
        let handle = FarmHandle {
            shutdown: Arc::new(AtomicBool::new(false)),
            checkpoint: Arc::new(AtomicBool::new(false)),
            snapshot_now: Arc::new(AtomicBool::new(false)),
            chronon: Arc::new(AtomicU64::new(0)),
            counts: Arc::new(Mutex::new(None)),
        };
        Farm {
            planet,
            batches,
            params,
            handle,
            on_chronon_completed: Box::new(on_chronon_completed),
        }
    }

    pub fn handle(&self) -> FarmHandle {
        self.handle.clone()
    }

    /// Run the farm to completion. Consumes `self`: a farm is single-use.
    /// `snapshot_sink`/`checkpoint_sink` are driven exclusively by the
    /// collector thread.
    pub fn run(
        self,
        mut snapshot_sink: Box<dyn SnapshotSink>,
        mut checkpoint_sink: Box<dyn CheckpointSink>,
    ) {
        let nrow = self.planet.nrow();
        let ncol = self.planet.ncol();
        let skip_map = Arc::new(SkipMap::new(nrow, ncol));
        let counts = Arc::new(Counts::new(
            self.planet.fish_count() as i64,
            self.planet.shark_count() as i64,
        ));
        *self.handle.counts.lock().unwrap() = Some(Arc::clone(&counts));
        let queue: Arc<TaskQueue<Rectangle>> = Arc::new(TaskQueue::new());
        let shared = Arc::new(Shared {
            core: Mutex::new(Core {
                state: FarmState::DispatchB1,
                completed_tasks: 0,
            }),
            controller_cv: Condvar::new(),
            collector_cv: Condvar::new(),
        });

        let boundary_b1 = self.batches.batch1.len();
        let boundary_b1_b2 = boundary_b1 + self.batches.batch2.len();
        let total = self.batches.total_rectangles();

        let workers: Vec<_> = (0..self.params.total_workers)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let shared = Arc::clone(&shared);
                let planet = Arc::clone(&self.planet);
                let skip_map = Arc::clone(&skip_map);
                let counts = Arc::clone(&counts);
                let params = self.params;
                thread::Builder::new()
                    .name(format!("wator-worker-{id}"))
                    .spawn(move || {
                        let mut rng = StdRng::seed_from_u64(0x5741_544f_5200 ^ id as u64);
                        while let Some(rect) = queue.dequeue() {
                            trace!(worker = id, ?rect, "sweeping rectangle");
                            rect::sweep(&planet, &skip_map, &counts, &params, &rect, &mut rng);
                            shared.complete_one(boundary_b1, boundary_b1_b2, total);
                        }
                        trace!(worker = id, "queue destroyed, worker exiting");
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        let collector = {
            let shared = Arc::clone(&shared);
            let queue = Arc::clone(&queue);
            let planet = Arc::clone(&self.planet);
            let params = self.params;
            let handle = self.handle.clone();
            let on_chronon_completed = self.on_chronon_completed;
            thread::Builder::new()
                .name("wator-collector".to_string())
                .spawn(move || {
                    loop {
                        let mut core = shared.core.lock().unwrap();
                        while !matches!(core.state, FarmState::Collecting | FarmState::Terminating) {
                            core = shared.collector_cv.wait(core).unwrap();
                        }
                        if core.state == FarmState::Terminating {
                            break;
                        }
                        drop(core);

                        if params.chron_delay_us > 0 {
                            thread::sleep(Duration::from_micros(params.chron_delay_us));
                        }
                        let chronon = handle.chronon.fetch_add(1, Ordering::SeqCst) + 1;

                        let want_snapshot = params.chron_interval > 0
                            && chronon % params.chron_interval as u64 == 0;
                        if want_snapshot || handle.snapshot_now.swap(false, Ordering::SeqCst) {
                            let cells = encode_cells(&planet);
                            if let Err(err) = snapshot_sink.publish(planet.nrow(), planet.ncol(), &cells) {
                                warn!(%err, chronon, "snapshot publish failed, continuing");
                            }
                        }
                        if handle.checkpoint.swap(false, Ordering::SeqCst) {
                            if let Err(err) = checkpoint_sink.checkpoint(&planet) {
                                warn!(%err, chronon, "checkpoint write failed, continuing");
                            }
                        }

                        on_chronon_completed(chronon);
                        debug!(chronon, "chronon completed");

                        let mut core = shared.core.lock().unwrap();
                        if handle.shutdown.load(Ordering::SeqCst) {
                            queue.destroy();
                            core.state = FarmState::Terminating;
                            drop(core);
                            shared.controller_cv.notify_all();
                            shared.collector_cv.notify_all();
                            info!("farm terminating");
                            break;
                        } else {
                            core.completed_tasks = 0;
                            core.state = FarmState::DispatchB1;
                            drop(core);
                            shared.controller_cv.notify_all();
                        }
                    }
                })
                .expect("failed to spawn collector thread")
        };

        // Controller runs on this thread.
        loop {
            let mut core = shared.core.lock().unwrap();
            while !matches!(core.state, FarmState::DispatchB1 | FarmState::Terminating) {
                core = shared.controller_cv.wait(core).unwrap();
            }
            if core.state == FarmState::Terminating {
                break;
            }
            drop(core);

            skip_map.reset();
            debug!(count = self.batches.batch1.len(), "dispatching batch 1");
            for rect in &self.batches.batch1 {
                queue.enqueue(*rect);
            }

            let mut core = shared.core.lock().unwrap();
            while !matches!(core.state, FarmState::DispatchB2 | FarmState::Terminating) {
                core = shared.controller_cv.wait(core).unwrap();
            }
            if core.state == FarmState::Terminating {
                break;
            }
            drop(core);

            debug!(count = self.batches.batch2.len(), "dispatching batch 2");
            for rect in &self.batches.batch2 {
                queue.enqueue(*rect);
            }

            let mut core = shared.core.lock().unwrap();
            while !matches!(core.state, FarmState::DispatchB3 | FarmState::Terminating) {
                core = shared.controller_cv.wait(core).unwrap();
            }
            if core.state == FarmState::Terminating {
                break;
            }
            drop(core);

            debug!("dispatching batch 3");
            queue.enqueue(self.batches.batch3);
            // Loop back to the top: waits for DispatchB1 (set by the
            // collector after it finishes this chronon) or Terminating.
        }

        for worker in workers {
            let _ = worker.join();
        }
        let _ = collector.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use crate::planet::CellState;
    use crate::snapshot::BufferSink;
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc as StdArc, Mutex as StdMutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: StdArc<StdMutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, StdArc<StdMutex<Vec<u8>>>) {
            let buf = StdArc::new(StdMutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    /// A sink whose `publish` always fails, for exercising the
    /// collector's "log and continue" transient-error path (§7).
    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn publish(&mut self, _nrow: usize, _ncol: usize, _cells: &[u8]) -> Result<(), crate::error::PublishError> {
            Err(crate::error::PublishError(std::io::Error::other("no consumer connected")))
        }
    }

    #[test]
    fn failing_snapshot_sink_is_logged_and_does_not_halt_the_farm() {
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let completed = StdArc::new(AtomicUsize::new(0));

        with_default(subscriber, || {
            let planet = Arc::new(Planet::new(20, 20).unwrap());
            planet.set(
                5,
                5,
                CellState {
                    kind: crate::planet::Cell::Fish,
                    btime: 0,
                    dtime: 0,
                },
            );
            let batches = partition(20, 20, 2).unwrap();
            let params = Params {
                sd: 5,
                sb: 5,
                fb: 5,
                chron_interval: 1,
                chron_delay_us: 0,
                total_workers: 2,
            };

            let completed_cb = StdArc::clone(&completed);
            let farm = Farm::new(planet, batches, params, move |_chronon| {
                completed_cb.fetch_add(1, Ordering::SeqCst);
            });
            let handle = farm.handle();

            let stopper = {
                let handle = handle.clone();
                thread::spawn(move || {
                    while handle.chronon() < 3 {
                        thread::sleep(Duration::from_millis(5));
                    }
                    handle.request_shutdown();
                })
            };

            farm.run(Box::new(FailingSink), Box::new(BufferSink::default()));
            stopper.join().unwrap();
        });

        assert!(completed.load(Ordering::SeqCst) >= 3);
        let log = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log.contains("snapshot publish failed"));
        assert!(log.contains("WARN"));
    }

    #[test]
    fn runs_fixed_number_of_chronons_then_shuts_down() {
        let planet = Arc::new(Planet::new(20, 20).unwrap());
        planet.set(
            5,
            5,
            CellState {
                kind: crate::planet::Cell::Fish,
                btime: 0,
                dtime: 0,
            },
        );
        let batches = partition(20, 20, 2).unwrap();
        let params = Params {
            sd: 5,
            sb: 5,
            fb: 5,
            chron_interval: 1,
            chron_delay_us: 0,
            total_workers: 2,
        };

        let completed = Arc::new(AtomicUsize::new(0));
        let completed_cb = Arc::clone(&completed);
        let farm = Farm::new(planet, batches, params, move |_chronon| {
            completed_cb.fetch_add(1, Ordering::SeqCst);
        });
        let handle = farm.handle();

        let stopper = {
            let handle = handle.clone();
            thread::spawn(move || {
                while handle.chronon() < 3 {
                    thread::sleep(Duration::from_millis(5));
                }
                handle.request_shutdown();
            })
        };

        farm.run(Box::new(BufferSink::default()), Box::new(BufferSink::default()));
        stopper.join().unwrap();

        assert!(completed.load(Ordering::SeqCst) >= 3);
    }
}
