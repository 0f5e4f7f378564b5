//! Elapsed-time counter for a running interview.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::events::SessionEvent;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Zero-padded `MM:SS`, as shown while the interview runs.
pub fn format_clock(elapsed_seconds: u64) -> String {
    format!("{:02}:{:02}", elapsed_seconds / 60, elapsed_seconds % 60)
}

/// `{m}m {s}s`, as shown in the scorecard header.
pub fn format_duration(elapsed_seconds: u64) -> String {
    format!("{}m {}s", elapsed_seconds / 60, elapsed_seconds % 60)
}

pub struct Timer {
    period: Duration,
    elapsed: Arc<AtomicU64>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Timer {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self::with_period(events, TICK_PERIOD)
    }

    pub(crate) fn with_period(events: broadcast::Sender<SessionEvent>, period: Duration) -> Self {
        Self {
            period,
            elapsed: Arc::new(AtomicU64::new(0)),
            ticker: Mutex::new(None),
            events,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub async fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts ticking once per second. A running ticker is replaced, never doubled.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if let Some(previous) = ticker.take() {
            debug!("restarting interview timer");
            halt(previous).await;
        }

        let period = self.period;
        let elapsed = self.elapsed.clone();
        let events = self.events.clone();
        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let elapsed_seconds = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = events.send(SessionEvent::TimerTick {
                    elapsed_seconds,
                    display: format_clock(elapsed_seconds),
                });
            }
        }));
    }

    /// Cancels the tick. The elapsed value is kept for later display and does
    /// not change once this returns.
    pub async fn stop(&self) {
        let mut ticker = self.ticker.lock().await;
        if let Some(handle) = ticker.take() {
            halt(handle).await;
        }
    }

    /// Stops the tick and zeroes the counter.
    pub async fn reset(&self) {
        self.stop().await;
        self.elapsed.store(0, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::TimerTick {
            elapsed_seconds: 0,
            display: format_clock(0),
        });
    }
}

// A tick already past `interval.tick()` on another worker finishes before the
// join resolves.
async fn halt(handle: JoinHandle<()>) {
    handle.abort();
    let _ = handle.await;
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}
