//! # BackOff
//!
//! Exponential backoff for the contended path of the spinlock.
//!
//! Each failed lock attempt waits for a number of processor pause iterations
//! that doubles on every retry, starting from a configured floor and clamped
//! at a configured ceiling. Once the ceiling is reached the waiter also yields
//! to the scheduler (on `std` builds), so sustained contention stops burning a
//! core exclusively. The pause itself uses [`core::hint::spin_loop`], which
//! lowers pipeline and power cost and lets a sibling hardware thread run.
//!
//! ## Features
//! - ✅ `no_std` compatible (yielding requires the `std` feature)
//! - ⚙️ Doubling spin delay between a configurable floor and ceiling
//! - 🧩 Per-lock configuration via [`SpinConfig`] — no process-wide globals
//!
//! ## Behavior
//! - Each call to [`BackOff::wait`] spins for the current delay, then doubles
//!   it. When the doubled delay would exceed [`SpinConfig::spin_max`], the
//!   delay is clamped there and the thread yields instead of spinning harder.
//! - `spin_min == spin_max` gives a fixed delay with no growth.
//! - `spin_min == 0 && spin_max == 0` disables the delay entirely, degrading
//!   the caller to a pure test-and-test-and-set loop.

use core::{cell::Cell, hint::spin_loop};

/// Default starting spin delay, in pause iterations.
pub const DEFAULT_SPIN_MIN: u32 = 4;

/// Default ceiling on the spin delay before falling back to a yield.
pub const DEFAULT_SPIN_MAX: u32 = 16_000;

/// Backoff tuning for a lock instance: the initial spin delay and the ceiling
/// it doubles up to.
///
/// A config is plain data and carries no validity guarantee of its own; use
/// [`validate`](SpinConfig::validate) to reject `spin_max < spin_min` before
/// accepting one from user input. An inverted config is still safe to use —
/// the delay merely clamps to `spin_max` on the first retry.
///
/// # Examples
/// ```
/// use hybrid_spinlock::SpinConfig;
///
/// let cfg = SpinConfig::new(8, 1024).validate().unwrap();
/// assert_eq!(cfg.spin_min, 8);
///
/// assert!(SpinConfig::new(1024, 8).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpinConfig {
    /// Initial backoff delay, in pause iterations.
    pub spin_min: u32,
    /// Ceiling on the backoff delay; past it, waiters yield to the scheduler.
    pub spin_max: u32,
}

/// Error returned by [`SpinConfig::validate`] for an inverted backoff range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("spin_max ({spin_max}) must be >= spin_min ({spin_min})")]
pub struct InvalidSpinConfig {
    spin_min: u32,
    spin_max: u32,
}

impl SpinConfig {
    /// The default tuning: start at 4 pause iterations, cap at 16000.
    pub const DEFAULT: Self = Self {
        spin_min: DEFAULT_SPIN_MIN,
        spin_max: DEFAULT_SPIN_MAX,
    };

    /// Creates a config with the given floor and ceiling.
    #[inline(always)]
    pub const fn new(spin_min: u32, spin_max: u32) -> Self {
        Self { spin_min, spin_max }
    }

    /// Checks that the ceiling is not below the floor.
    ///
    /// Call this wherever a config crosses a trust boundary (CLI flags,
    /// config files) so bad ranges are rejected before any thread spins.
    pub fn validate(self) -> Result<Self, InvalidSpinConfig> {
        if self.spin_max < self.spin_min {
            Err(InvalidSpinConfig {
                spin_min: self.spin_min,
                spin_max: self.spin_max,
            })
        } else {
            Ok(self)
        }
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The per-acquire backoff state: the current spin delay, doubling on every
/// [`wait`](BackOff::wait) up to the configured ceiling.
///
/// A `BackOff` is created fresh for each acquire attempt, so an uncontended
/// lock always starts back at `spin_min`.
///
/// # Examples
/// ```
/// use hybrid_spinlock::{BackOff, SpinConfig};
///
/// let backoff = BackOff::new(SpinConfig::new(4, 64));
/// loop {
///     if try_acquire() {
///         break;
///     }
///     backoff.wait();
/// }
///
/// fn try_acquire() -> bool {
///     true
/// }
/// ```
pub struct BackOff {
    spin: Cell<u32>,
    max: u32,
}

impl BackOff {
    /// Creates a new [`BackOff`] starting at the config's `spin_min`.
    #[inline(always)]
    pub const fn new(config: SpinConfig) -> Self {
        Self {
            spin: Cell::new(config.spin_min),
            max: config.spin_max,
        }
    }

    /// Spins for the current delay, then doubles it.
    ///
    /// When the doubled delay exceeds the ceiling it is clamped there and the
    /// thread additionally yields to the scheduler (`std` builds only), so a
    /// long wait stops monopolizing the core.
    #[inline]
    pub fn wait(&self) {
        let spins = self.spin.get();

        for _ in 0..spins {
            spin_loop();
        }

        let next = spins.saturating_mul(2);
        if next > self.max {
            self.spin.set(self.max);
            #[cfg(feature = "std")]
            std::thread::yield_now();
        } else {
            self.spin.set(next);
        }
    }

    /// Returns the delay the next [`wait`](BackOff::wait) will spin for.
    #[inline(always)]
    pub fn current(&self) -> u32 {
        self.spin.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_clamps_at_ceiling() {
        let b = BackOff::new(SpinConfig::new(4, 100));

        let mut prev = b.current();
        assert_eq!(prev, 4);
        for _ in 0..16 {
            b.wait();
            let curr = b.current();
            assert!(curr >= prev, "delay shrank from {prev} to {curr}");
            assert!(curr <= 100, "delay {curr} exceeded the ceiling");
            prev = curr;
        }
        assert_eq!(b.current(), 100);
    }

    #[test]
    fn equal_floor_and_ceiling_is_a_fixed_delay() {
        let b = BackOff::new(SpinConfig::new(16, 16));
        for _ in 0..8 {
            b.wait();
            assert_eq!(b.current(), 16);
        }
    }

    #[test]
    fn zero_config_never_delays() {
        let b = BackOff::new(SpinConfig::new(0, 0));
        for _ in 0..8 {
            b.wait();
            assert_eq!(b.current(), 0);
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(SpinConfig::new(100, 4).validate().is_err());
        assert!(SpinConfig::new(4, 4).validate().is_ok());
        assert!(SpinConfig::new(0, 0).validate().is_ok());
    }

    #[test]
    fn inverted_range_still_clamps_safely() {
        // Not validated, but wait() must never spin more than spin_max after
        // the first retry.
        let b = BackOff::new(SpinConfig::new(100, 4));
        b.wait();
        assert_eq!(b.current(), 4);
        b.wait();
        assert_eq!(b.current(), 4);
    }

    #[test]
    fn default_matches_documented_tunables() {
        assert_eq!(SpinConfig::default(), SpinConfig::new(4, 16_000));
    }
}
