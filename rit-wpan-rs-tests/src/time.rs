use std::sync::atomic::{AtomicU64, Ordering};

use rit_wpan_rs::time::{Duration, Instant};

/// The virtual clock of one simulation.
///
/// Delays register their end times; [SimulationTime::tick] jumps the clock
/// to the earliest registered end time and wakes every sleeper. Driven by
/// the runner only when no task can make progress, which is exactly the
/// discrete-event rule: time advances from one scheduled instant to the
/// next.
pub struct SimulationTime {
    now_ticks: AtomicU64,
    delay_waits: maitake_sync::WaitQueue,
    next_deadline: AtomicU64,
}

impl SimulationTime {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            now_ticks: AtomicU64::new(0),
            delay_waits: maitake_sync::WaitQueue::new(),
            next_deadline: AtomicU64::new(u64::MAX),
        }
    }

    pub fn now(&self) -> Instant {
        Instant::from_ticks(self.now_ticks.load(Ordering::SeqCst))
    }

    /// Advance to the earliest pending deadline. Returns false when no delay
    /// is registered, i.e. the simulation has run dry.
    pub fn tick(&self) -> bool {
        let next = self.next_deadline.swap(u64::MAX, Ordering::SeqCst);
        if next == u64::MAX {
            return false;
        }

        self.now_ticks.fetch_max(next, Ordering::SeqCst);
        self.delay_waits.wake_all();
        true
    }

    pub async fn delay(&self, duration: Duration) -> Instant {
        assert!(
            !duration.ticks().is_negative(),
            "cannot delay a negative amount of time"
        );
        self.delay_until(self.now() + duration).await
    }

    /// Sleep until the virtual clock reaches `end`. Returns immediately when
    /// it already has.
    pub async fn delay_until(&self, end: Instant) -> Instant {
        self.delay_waits
            .wait_for_value(|| {
                if self.now() >= end {
                    Some(())
                } else {
                    self.next_deadline.fetch_min(end.ticks(), Ordering::SeqCst);
                    None
                }
            })
            .await
            .expect("the wait queue is never closed");

        self.now()
    }
}

/// The delay provider handed to the MAC and NWK tasks.
#[derive(Clone, Copy)]
pub struct Delay(pub &'static SimulationTime);

impl embedded_hal_async::delay::DelayNs for Delay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.delay(Duration::from_nanos(ns as i64)).await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.0.delay(Duration::from_micros(us as i64)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.delay(Duration::from_millis(ms as i64)).await;
    }
}

/// Convert a simulation duration into the std form used by the pcap writer.
pub fn into_std_duration(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_nanos(duration.ticks().max(0) as u64)
}
