//! Run loop for the sync job.
//!
//! Two triggers drive the job: a one-shot shortly after start and a
//! repeating one on a fixed interval. Each firing runs the job in its own
//! task, so a slow run never delays the next trigger. Runs may overlap
//! unless `skip_overlapping_runs` is enabled.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use schedsync_core::SyncConfig;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::SyncOrchestrator;

/// Work triggered by the scheduler.
pub trait SyncJob: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = ()> + Send;
}

impl SyncJob for SyncOrchestrator {
    fn run(&self) -> impl Future<Output = ()> + Send {
        async move {
            let outcome = self.run_sync().await;
            tracing::debug!(?outcome, "Sync run finished");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    NotStarted,
    Running,
    Stopped,
}

struct Shared<J> {
    job: Arc<J>,
    initial_delay: Duration,
    interval: Duration,
    skip_overlapping: bool,
    in_flight: AtomicBool,
    cancel: CancellationToken,
    state: Mutex<SchedulerState>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

/// Owns the job and both timer handles.
///
/// Must be started from within a tokio runtime. A stopped scheduler cannot
/// be restarted; build a new one instead.
pub struct SyncScheduler<J: SyncJob> {
    shared: Arc<Shared<J>>,
}

impl<J: SyncJob> SyncScheduler<J> {
    pub fn new(job: Arc<J>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                initial_delay,
                interval,
                skip_overlapping: false,
                in_flight: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                state: Mutex::new(SchedulerState::NotStarted),
                timers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_config(job: Arc<J>, config: &SyncConfig) -> Self {
        Self::new(job, config.initial_delay(), config.interval())
            .skip_overlapping_runs(config.skip_overlapping_runs)
    }

    /// Skip a trigger while the previous run is still in flight.
    ///
    /// Only takes effect before the scheduler is started.
    pub fn skip_overlapping_runs(mut self, skip: bool) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.skip_overlapping = skip;
        }
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.lock()
    }

    /// Register both triggers now.
    pub fn start(&self) {
        if !self.begin() {
            return;
        }
        register(&self.shared);
    }

    /// Register both triggers once `ready` resolves.
    ///
    /// The delay of the one-shot trigger counts from readiness, not from
    /// this call.
    pub fn start_when<F>(&self, ready: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.begin() {
            return;
        }

        let shared = self.shared.clone();
        let gate = tokio::spawn(async move {
            tokio::select! {
                _ = shared.cancel.cancelled() => {}
                _ = ready => {
                    tracing::debug!("Host ready, registering sync triggers");
                    register(&shared);
                }
            }
        });
        self.shared.timers.lock().push(gate);
    }

    /// Cancel both triggers. Runs already in flight are left to finish.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state != SchedulerState::Running {
                return;
            }
            *state = SchedulerState::Stopped;
        }

        self.shared.cancel.cancel();
        for handle in self.shared.timers.lock().drain(..) {
            handle.abort();
        }
        tracing::info!("Sync scheduler stopped");
    }

    fn begin(&self) -> bool {
        let mut state = self.shared.state.lock();
        match *state {
            SchedulerState::NotStarted => {
                *state = SchedulerState::Running;
                tracing::info!(
                    initial_delay = ?self.shared.initial_delay,
                    interval = ?self.shared.interval,
                    skip_overlapping = self.shared.skip_overlapping,
                    "Sync scheduler started"
                );
                true
            }
            SchedulerState::Running => {
                tracing::warn!("Sync scheduler already running");
                false
            }
            SchedulerState::Stopped => {
                tracing::warn!("Sync scheduler was stopped and cannot be restarted");
                false
            }
        }
    }
}

impl<J: SyncJob> Drop for SyncScheduler<J> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

fn register<J: SyncJob>(shared: &Arc<Shared<J>>) {
    let one_shot = tokio::spawn(one_shot(shared.clone()));
    let repeating = tokio::spawn(repeating(shared.clone()));
    shared.timers.lock().extend([one_shot, repeating]);
}

async fn one_shot<J: SyncJob>(shared: Arc<Shared<J>>) {
    tokio::select! {
        _ = shared.cancel.cancelled() => {}
        _ = tokio::time::sleep(shared.initial_delay) => trigger(&shared, "startup"),
    }
}

async fn repeating<J: SyncJob>(shared: Arc<Shared<J>>) {
    if shared.interval.is_zero() {
        tracing::warn!("Sync interval is zero, repeating trigger disabled");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + shared.interval, shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = ticker.tick() => trigger(&shared, "interval"),
        }
    }
}

/// Clears the in-flight flag even if the run panics.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn trigger<J: SyncJob>(shared: &Arc<Shared<J>>, reason: &'static str) {
    if shared.skip_overlapping && shared.in_flight.swap(true, Ordering::SeqCst) {
        tracing::warn!(trigger = reason, "Previous sync still running, skipping this one");
        return;
    }

    let shared = shared.clone();
    tokio::spawn(async move {
        let _guard = shared.skip_overlapping.then(|| InFlight(&shared.in_flight));
        tracing::debug!(trigger = reason, "Starting sync run");
        shared.job.run().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingJob {
        started: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
        duration: Duration,
    }

    impl CountingJob {
        fn taking(duration: Duration) -> Arc<Self> {
            Arc::new(Self {
                duration,
                ..Self::default()
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    impl SyncJob for CountingJob {
        fn run(&self) -> impl Future<Output = ()> + Send {
            async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_running.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.duration).await;
                self.running.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    async fn sleep_until(start: Instant, at: Duration) {
        tokio::time::sleep_until(start + at).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_then_interval() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Running);

        sleep_until(t0, Duration::from_millis(2900)).await;
        assert_eq!(job.started(), 0);

        sleep_until(t0, Duration::from_millis(3100)).await;
        assert_eq!(job.started(), 1);

        sleep_until(t0, secs(299)).await;
        assert_eq!(job.started(), 1);

        sleep_until(t0, secs(301)).await;
        assert_eq!(job.started(), 2);

        sleep_until(t0, secs(901)).await;
        assert_eq!(job.started(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_triggers() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();
        sleep_until(t0, secs(4)).await;
        assert_eq!(job.started(), 1);

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        sleep_until(t0, secs(1000)).await;
        assert_eq!(job.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_trigger() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();
        scheduler.stop();

        sleep_until(t0, secs(700)).await;
        assert_eq!(job.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_noop() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();
        scheduler.start();

        sleep_until(t0, secs(4)).await;
        assert_eq!(job.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cannot_restart_after_stop() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();
        scheduler.stop();
        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        sleep_until(t0, secs(10)).await;
        assert_eq!(job.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_when_waits_for_ready() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
        let t0 = Instant::now();

        scheduler.start_when(async move {
            let _ = ready_rx.await;
        });

        sleep_until(t0, secs(10)).await;
        assert_eq!(job.started(), 0);

        ready_tx.send(()).unwrap();

        sleep_until(t0, Duration::from_millis(12900)).await;
        assert_eq!(job.started(), 0);

        sleep_until(t0, Duration::from_millis(13100)).await;
        assert_eq!(job.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_ready() {
        let job = CountingJob::taking(Duration::ZERO);
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
        let t0 = Instant::now();

        scheduler.start_when(async move {
            let _ = ready_rx.await;
        });
        scheduler.stop();
        let _ = ready_tx.send(());

        sleep_until(t0, secs(400)).await;
        assert_eq!(job.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_overlap_by_default() {
        let job = CountingJob::taking(secs(400));
        let scheduler = SyncScheduler::new(job.clone(), secs(3), secs(300));
        let t0 = Instant::now();

        scheduler.start();

        sleep_until(t0, secs(301)).await;
        assert_eq!(job.started(), 2);
        assert_eq!(job.max_running.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_overlapping_runs() {
        let job = CountingJob::taking(secs(400));
        let scheduler =
            SyncScheduler::new(job.clone(), secs(3), secs(300)).skip_overlapping_runs(true);
        let t0 = Instant::now();

        scheduler.start();

        sleep_until(t0, secs(301)).await;
        assert_eq!(job.started(), 1);

        // First run ends at 403s, so the 600s tick goes ahead.
        sleep_until(t0, secs(601)).await;
        assert_eq!(job.started(), 2);
        assert_eq!(job.max_running.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config() {
        let config = SyncConfig {
            interval_secs: 60,
            initial_delay_secs: 1,
            skip_overlapping_runs: true,
            request_timeout_secs: 0,
        };
        let scheduler = SyncScheduler::from_config(CountingJob::taking(Duration::ZERO), &config);

        assert_eq!(scheduler.shared.interval, secs(60));
        assert_eq!(scheduler.shared.initial_delay, secs(1));
        assert!(scheduler.shared.skip_overlapping);
        assert_eq!(scheduler.state(), SchedulerState::NotStarted);
    }
}
