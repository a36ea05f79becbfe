use core::{
    fmt::Display,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign},
};

use embedded_hal_async::delay::DelayNs;

pub const TICKS_PER_SECOND: u64 = 1_000_000_000;
pub const TICKS_PER_MILLI: u64 = TICKS_PER_SECOND / 1000;
pub const TICKS_PER_MICRO: u64 = TICKS_PER_SECOND / 1_000_000;

/// Duration of one O-QPSK symbol (16 µs).
pub const SYMBOL_PERIOD: Duration =
    Duration::from_ticks((crate::consts::SYMBOL_PERIOD_US as u64 * TICKS_PER_MICRO) as i64);

/// An instant of virtual time. Every tick is one nanosecond.
///
/// Wraps after ~584 years of simulated time, which no scenario reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    ticks: u64,
}

impl Instant {
    pub const fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    pub const fn from_seconds(seconds: u64) -> Self {
        Self::from_ticks(seconds * TICKS_PER_SECOND)
    }

    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The number of whole 16 µs symbol periods since the epoch.
    pub const fn symbols(&self) -> u64 {
        self.ticks / (crate::consts::SYMBOL_PERIOD_US as u64 * TICKS_PER_MICRO)
    }

    #[must_use]
    pub const fn checked_duration_since(&self, other: Self) -> Option<Duration> {
        let negative = other.ticks > self.ticks;
        let diff = self.ticks.abs_diff(other.ticks);

        if diff > i64::MAX as u64 {
            return None;
        }

        Some(Duration {
            ticks: diff as i64 * if negative { -1 } else { 1 },
        })
    }

    #[must_use]
    pub fn duration_since(&self, other: Self) -> Duration {
        unwrap!(self.checked_duration_since(other))
    }

    #[must_use]
    pub fn duration_since_epoch(&self) -> Duration {
        self.duration_since(Instant { ticks: 0 })
    }

    #[must_use]
    pub const fn checked_add_duration(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_add_signed(duration.ticks) {
            Some(ticks) => Some(Self { ticks }),
            None => None,
        }
    }

    #[must_use]
    pub const fn checked_sub_duration(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_add_signed(-duration.ticks) {
            Some(ticks) => Some(Self { ticks }),
            None => None,
        }
    }
}

impl Display for Instant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.duration_since_epoch())
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Self::Output {
        unwrap!(self.checked_add_duration(rhs))
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Self::Output {
        unwrap!(self.checked_sub_duration(rhs))
    }
}

impl SubAssign<Duration> for Instant {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Div<Duration> for Instant {
    type Output = i64;

    fn div(self, rhs: Duration) -> Self::Output {
        let div = self.ticks / rhs.ticks.unsigned_abs();
        i64::try_from(div).expect("Overflow") * rhs.ticks.signum()
    }
}

/// A span of virtual time. Every tick is one nanosecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    ticks: i64,
}

impl Display for Duration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let neg = self.ticks < 0;

        let value = self.abs();

        let s = value.secs();
        let ms = (value - Self::from_seconds(s)).millis();

        if neg {
            write!(f, "-{s}.{ms:03} secs")
        } else {
            write!(f, "{s}.{ms:03} secs")
        }
    }
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for Duration {
    fn format(&self, f: defmt::Formatter) {
        let neg = self.ticks < 0;

        let value = self.abs();

        let s = value.secs();
        let ms = (value - Self::from_seconds(s)).millis();

        if neg {
            defmt::write!(f, "-{}.{} secs", s, ms)
        } else {
            defmt::write!(f, "{}.{} secs", s, ms)
        }
    }
}

impl Duration {
    pub const ZERO: Duration = Duration::from_ticks(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self::from_ticks(seconds * TICKS_PER_SECOND as i64)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self::from_ticks(millis * TICKS_PER_MILLI as i64)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self::from_ticks(micros * TICKS_PER_MICRO as i64)
    }

    pub const fn from_nanos(nanos: i64) -> Self {
        Self::from_ticks(nanos)
    }

    /// The duration of `symbols` O-QPSK symbol periods.
    pub const fn from_symbols(symbols: i64) -> Self {
        Self::from_micros(symbols * crate::consts::SYMBOL_PERIOD_US as i64)
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// The amount of *full* seconds in this duration. Always rounds down.
    pub const fn secs(&self) -> i64 {
        if self.ticks().is_negative() {
            -(self.ticks().unsigned_abs().div_ceil(TICKS_PER_SECOND) as i64)
        } else {
            self.ticks() / TICKS_PER_SECOND as i64
        }
    }

    /// The amount of *full* milliseconds in this duration. Always rounds down.
    pub const fn millis(&self) -> i64 {
        if self.ticks().is_negative() {
            -(self.ticks().unsigned_abs().div_ceil(TICKS_PER_MILLI) as i64)
        } else {
            self.ticks() / TICKS_PER_MILLI as i64
        }
    }

    /// This duration expressed in (possibly fractional) seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.ticks as f64 / TICKS_PER_SECOND as f64
    }

    /// A duration of `seconds` fractional seconds, saturating at zero for
    /// non-finite or negative input.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }

        Self::from_ticks((seconds * TICKS_PER_SECOND as f64) as i64)
    }

    pub const fn is_positive(&self) -> bool {
        self.ticks > 0
    }

    pub const fn is_zero(&self) -> bool {
        self.ticks == 0
    }

    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_add(duration.ticks) {
            Some(ticks) => Some(Self { ticks }),
            None => None,
        }
    }

    #[must_use]
    pub const fn checked_sub(self, duration: Duration) -> Option<Self> {
        match self.ticks.checked_sub(duration.ticks) {
            Some(ticks) => Some(Self { ticks }),
            None => None,
        }
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self {
            ticks: self.ticks.abs(),
        }
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Self::Output {
        unwrap!(self.checked_add(rhs))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Self::Output {
        unwrap!(self.checked_sub(rhs))
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Duration {
    type Output = Duration;

    fn mul(self, rhs: i64) -> Self::Output {
        Self {
            ticks: unwrap!(self.ticks.checked_mul(rhs)),
        }
    }
}

impl Mul<Duration> for i64 {
    type Output = Duration;

    fn mul(self, rhs: Duration) -> Self::Output {
        rhs * self
    }
}

impl MulAssign<i64> for Duration {
    fn mul_assign(&mut self, rhs: i64) {
        *self = *self * rhs;
    }
}

impl Div<i64> for Duration {
    type Output = Duration;

    fn div(self, rhs: i64) -> Self::Output {
        Self {
            ticks: unwrap!(self.ticks.checked_div(rhs)),
        }
    }
}

impl DivAssign<i64> for Duration {
    fn div_assign(&mut self, rhs: i64) {
        *self = *self / rhs;
    }
}

pub trait DelayNsExt: DelayNs + Clone {
    /// Delay for the duration. Accurate to the microsecond.
    /// Negative durations return immediately.
    async fn delay_duration(&mut self, mut duration: Duration) {
        if duration.ticks().is_negative() {
            return;
        }

        let limit = u32::MAX as i64 - 1;

        let mut micros = duration.ticks() / TICKS_PER_MICRO as i64;
        if duration.ticks() % TICKS_PER_MICRO as i64 != 0 {
            // Wait *at least* the requested duration
            micros += 1;
        }

        while micros > limit {
            self.delay_us(limit as u32).await;
            micros -= limit;
        }

        self.delay_us(micros as u32).await;
    }
}

impl<T: DelayNs + Clone> DelayNsExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since() {
        assert_eq!(
            Instant::from_ticks(0).duration_since(Instant::from_ticks(5)),
            Duration::from_ticks(-5)
        );
        assert_eq!(
            Instant::from_ticks(10).duration_since(Instant::from_ticks(5)),
            Duration::from_ticks(5)
        );
    }

    #[test]
    fn add_sub() {
        assert_eq!(
            Instant::from_ticks(0) + Duration::from_ticks(5),
            Instant::from_ticks(5)
        );
        assert_eq!(
            Instant::from_ticks(10) + Duration::from_ticks(-5),
            Instant::from_ticks(5)
        );
        assert_eq!(
            Instant::from_ticks(10) - Duration::from_ticks(5),
            Instant::from_ticks(5)
        );
        assert_eq!(
            Duration::from_ticks(10) - Duration::from_ticks(-5),
            Duration::from_ticks(15)
        );
    }

    #[test]
    fn symbols() {
        assert_eq!(SYMBOL_PERIOD, Duration::from_micros(16));
        assert_eq!(Duration::from_symbols(20), Duration::from_micros(320));
        assert_eq!(Instant::from_seconds(1).symbols(), 62_500);
    }

    #[test]
    fn float_seconds() {
        assert_eq!(Duration::from_secs_f64(1.5), Duration::from_millis(1500));
        assert_eq!(Duration::from_secs_f64(-1.0), Duration::ZERO);
        assert_eq!(Duration::from_seconds(2).as_secs_f64(), 2.0);
    }
}
