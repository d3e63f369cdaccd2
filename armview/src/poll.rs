//! Periodically fetch the latest snapshot and publish it for the renderer.

use std::thread;
use std::time::{Duration, Instant};

use armview_lib::{RunFlag, Timestamp};
use log::{error, info, warn};

use crate::normalize::normalize;
use crate::snapshot_manager::SnapshotManager;
use crate::source::SnapshotSource;

/// Never sleep longer than this between run flag checks.
const SLEEP_QUANTUM: Duration = Duration::from_millis(50);

/// What happened during a single poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Published,
    /// A newer request had already been published.
    Stale,
    NoData,
    Failed,
}

/// Fetch, normalize, publish.
pub struct PollWorker<S> {
    source: S,
    slot: SnapshotManager,
    /// Sequence number of the most recently issued request.
    seq: u64,
}

impl<S: SnapshotSource> PollWorker<S> {
    pub fn new(source: S, slot: SnapshotManager) -> Self {
        Self {
            source,
            slot,
            seq: 0,
        }
    }

    /// Perform one request and publish its result.
    /// Failures are logged and reported to the slot; the last good frame stays put.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.seq += 1;
        let seq = self.seq;
        match self.source.fetch() {
            Err(e) => {
                error!("Snapshot request {} failed: {}.", seq, e);
                self.slot.report_failure(e.to_string());
                PollOutcome::Failed
            }
            Ok(raw) => match normalize(&raw, Timestamp::now()) {
                Some(frame) => {
                    if self.slot.publish(seq, frame) {
                        PollOutcome::Published
                    } else {
                        PollOutcome::Stale
                    }
                }
                None => {
                    self.slot.report_no_data();
                    PollOutcome::NoData
                }
            },
        }
    }
}

/// Run a PollWorker on a fixed period in its own thread.
/// The thread runs until the poller is dropped.
pub struct Poller {
    join_handle: Option<thread::JoinHandle<()>>,
    run: RunFlag,
}

impl Poller {
    /// Start polling source every interval, publishing into slot.
    pub fn start<S>(source: S, slot: SnapshotManager, interval: Duration) -> std::io::Result<Self>
    where
        S: SnapshotSource + Send + 'static,
    {
        let run = RunFlag::new();
        let run_local = run.clone();
        let mut worker = PollWorker::new(source, slot);

        let jh = thread::Builder::new()
            .name("poller".to_string())
            .spawn(move || {
                let mut next_tick = Instant::now();
                while run.should_run() {
                    let now = Instant::now();
                    if now < next_tick {
                        thread::sleep((next_tick - now).min(SLEEP_QUANTUM));
                        continue;
                    }
                    worker.poll_once();
                    next_tick += interval;
                    let now = Instant::now();
                    if next_tick < now {
                        warn!("Snapshot request took longer than the poll interval.");
                        next_tick = now;
                    }
                }
            })?;
        info!("Poller started with a {:?} interval.", interval);
        Ok(Self {
            join_handle: Some(jh),
            run: run_local,
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        info!("Poller shutting down...");
        self.run.stop();
        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                error!("Poller thread panicked.");
            }
        }
        info!("Poller shut down.");
    }
}
