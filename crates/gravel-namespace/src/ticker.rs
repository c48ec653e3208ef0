//! Tickers pacing the garbage collector.
//!
//! [`IntervalTicker`] is the production pacer. [`ManualTicker`] hands control
//! of every tick to a [`ManualTickerHandle`], which waits until the consumer
//! has finished reacting to the tick before returning.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Shortest accepted period; tokio intervals panic on zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest accepted period. Keeps `Instant` arithmetic from overflowing.
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A source of periodic tick events.
pub trait Ticker: Send {
    /// Wait for the next tick. Resolves to `None` once the ticker is stopped.
    ///
    /// Must be cancel-safe: dropping the future loses no tick.
    fn tick(&mut self) -> impl Future<Output = Option<Instant>> + Send;

    /// Change the period. The next tick fires one full period from now.
    fn reset(&mut self, period: Duration);

    /// Stop ticking. Subsequent [`Ticker::tick`] calls resolve to `None`.
    fn stop(&mut self);
}

/// Ticker backed by a tokio interval.
///
/// The first tick fires one period after construction, and ticks missed
/// while the consumer was busy are delayed rather than burst.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            interval: Some(delayed_interval(period)),
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let period = period.clamp(MIN_PERIOD, MAX_PERIOD);
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> impl Future<Output = Option<Instant>> + Send {
        async move {
            match self.interval.as_mut() {
                Some(interval) => Some(interval.tick().await),
                None => None,
            }
        }
    }

    fn reset(&mut self, period: Duration) {
        if self.interval.is_some() {
            self.interval = Some(delayed_interval(period));
        }
    }

    fn stop(&mut self) {
        self.interval = None;
    }
}

struct ManualTick {
    at: Instant,
    done: oneshot::Sender<()>,
}

/// Ticker driven explicitly through a [`ManualTickerHandle`].
#[derive(Debug)]
pub struct ManualTicker {
    ticks: mpsc::UnboundedReceiver<ManualTick>,
    /// Acknowledgement for the tick currently being handled.
    pending: Option<oneshot::Sender<()>>,
    stopped: bool,
}

/// Sending side of a [`ManualTicker`].
#[derive(Debug, Clone)]
pub struct ManualTickerHandle {
    ticks: mpsc::UnboundedSender<ManualTick>,
}

impl std::fmt::Debug for ManualTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTick").field("at", &self.at).finish()
    }
}

impl ManualTicker {
    pub fn new() -> (Self, ManualTickerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ticker = Self {
            ticks: rx,
            pending: None,
            stopped: false,
        };
        (ticker, ManualTickerHandle { ticks: tx })
    }

    /// The consumer came back for another tick (or stopped), so it is done
    /// with the previous one.
    fn acknowledge(&mut self) {
        if let Some(done) = self.pending.take() {
            let _ = done.send(());
        }
    }
}

impl Ticker for ManualTicker {
    fn tick(&mut self) -> impl Future<Output = Option<Instant>> + Send {
        async move {
            self.acknowledge();
            if self.stopped {
                return None;
            }
            let tick = self.ticks.recv().await?;
            self.pending = Some(tick.done);
            Some(tick.at)
        }
    }

    fn reset(&mut self, _period: Duration) {}

    fn stop(&mut self) {
        self.acknowledge();
        self.stopped = true;
        self.ticks.close();
    }
}

impl ManualTickerHandle {
    /// Deliver one tick and wait until the consumer has handled it.
    ///
    /// Returns `false` if the ticker was stopped or dropped before the tick
    /// was handled.
    pub async fn tick(&self) -> bool {
        let (done, handled) = oneshot::channel();
        let tick = ManualTick {
            at: Instant::now(),
            done,
        };
        if self.ticks.send(tick).is_err() {
            return false;
        }
        handled.await.is_ok()
    }
}
