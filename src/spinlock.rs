//! # SpinLock
//!
//! A hybrid test-and-test-and-set spinlock for short critical sections under
//! contention.
//!
//! The lock state is a single atomic word aligned to (and padded out to) a
//! full cache line, so concurrently used lock instances never false-share.
//! Waiters spin on a plain load of that word — observing, not contending for
//! exclusive cache-line ownership — and only attempt the atomic
//! compare-and-swap once the lock is seen free. Failed attempts back off
//! exponentially via [`BackOff`], and past the configured ceiling the waiter
//! yields to the scheduler, which keeps sustained contention from pinning a
//! core at 100%.
//!
//! Two layers are exposed:
//! - [`RawSpinLock`] — the bare state word with `lock`/`try_lock`/`unlock`,
//!   for callers that manage the protected data themselves.
//! - [`SpinLock<T>`] — the RAII wrapper most code wants, returning a
//!   [`SpinGuard`] that releases on drop.
//!
//! ## Safety
//! - The lock is **not fair** — any waiter may win when the lock frees, and
//!   starvation under pathological scheduling is possible by design.
//! - It is **not reentrant**; re-acquiring from the holding thread deadlocks.
//! - Keep critical sections short. Do not hold the lock across blocking calls.
//!
//! ## Example
//! ```rust
//! use hybrid_spinlock::SpinLock;
//!
//! static COUNTER: SpinLock<u64> = SpinLock::new(0);
//!
//! fn increment() {
//!     let mut guard = COUNTER.lock();
//!     *guard += 1;
//! }
//!
//! increment();
//! assert_eq!(*COUNTER.lock(), 1);
//! ```

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

use crate::backoff::{BackOff, SpinConfig};

/// State-word value for a free lock.
const UNLOCKED: u32 = 0;

/// State-word value for a held lock.
const LOCKED: u32 = 1;

/// The bare lock: one atomic state word owning an entire cache line.
///
/// The alignment attribute both places the word at the start of a line and
/// rounds the struct's size up to a full line, which is what prevents two
/// locks (or a lock and its protected data) from false-sharing. The alignment
/// literal must agree with [`crate::cache::CACHE_LINE_SIZE`]; a unit test
/// pins the two together.
///
/// `state` only ever holds `UNLOCKED` or `LOCKED`, and every write to it
/// goes through [`try_lock`](RawSpinLock::try_lock) (CAS) or
/// [`unlock`](RawSpinLock::unlock) (release store).
#[cfg_attr(target_arch = "aarch64", repr(align(128)))]
#[cfg_attr(not(target_arch = "aarch64"), repr(align(64)))]
pub struct RawSpinLock {
    state: AtomicU32,
    config: SpinConfig,
}

impl RawSpinLock {
    /// Creates an unlocked lock with the default backoff tuning.
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_config(SpinConfig::DEFAULT)
    }

    /// Creates an unlocked lock with the given backoff tuning.
    #[inline(always)]
    pub const fn with_config(config: SpinConfig) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            config,
        }
    }

    /// Acquires the lock, spinning until it is held by the calling thread.
    ///
    /// Test phase: spin on a relaxed load until the lock is observed free,
    /// issuing only read traffic. Test-and-set phase: a single
    /// compare-and-swap with acquire ordering, which establishes the
    /// happens-before edge from the previous holder's release. A lost CAS
    /// race costs one [`BackOff::wait`] before re-entering the test phase,
    /// which thins out the retry storm when many waiters see the lock free
    /// at once.
    #[inline]
    pub fn lock(&self) {
        let backoff = BackOff::new(self.config);
        loop {
            while self.state.load(Relaxed) == LOCKED {
                core::hint::spin_loop();
            }

            if self
                .state
                .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
                .is_ok()
            {
                return;
            }

            backoff.wait();
        }
    }

    /// Attempts to acquire the lock with a single compare-and-swap.
    ///
    /// Returns `true` if the lock is now held by the caller. Never spins.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// A release-ordered store: every write made while holding the lock is
    /// published before the state word reads as free.
    ///
    /// # Safety
    /// The calling thread must currently hold the lock. Releasing a lock held
    /// by another thread (or not held at all) breaks mutual exclusion.
    #[inline]
    pub unsafe fn unlock(&self) {
        self.state.store(UNLOCKED, Release);
    }

    /// Returns whether the lock is currently held by some thread.
    ///
    /// A momentary observation, stale by the time the caller acts on it.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.state.load(Relaxed) == LOCKED
    }

    /// The backoff tuning this lock was built with.
    #[inline(always)]
    pub fn config(&self) -> SpinConfig {
        self.config
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A spin-based mutual exclusion lock protecting a value of type `T`.
///
/// The acquire/release protocol lives in [`RawSpinLock`]; this wrapper adds
/// the data cell and RAII guard. See the [module docs](self) for the
/// contention-handling details and caveats.
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

/// A guard that releases the [`SpinLock`] when dropped.
///
/// Returned from [`SpinLock::lock`] and [`SpinLock::try_lock`]; implements
/// [`Deref`] and [`DerefMut`] to access the protected data.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // The guard's existence proves this thread holds the lock.
        unsafe { self.lock.raw.unlock() }
    }
}

impl<T> SpinLock<T> {
    /// Creates a new unlocked [`SpinLock`] with the default backoff tuning.
    ///
    /// # Example
    /// ```
    /// use hybrid_spinlock::SpinLock;
    ///
    /// let lock = SpinLock::new(123);
    /// assert_eq!(*lock.lock(), 123);
    /// ```
    #[inline(always)]
    pub const fn new(data: T) -> Self {
        Self::with_config(data, SpinConfig::DEFAULT)
    }

    /// Creates a new unlocked [`SpinLock`] with explicit backoff tuning.
    ///
    /// Passing the tuning at construction keeps independent locks in the same
    /// process independently tunable; there is no global knob to race on.
    #[inline(always)]
    pub const fn with_config(data: T, config: SpinConfig) -> Self {
        Self {
            raw: RawSpinLock::with_config(config),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, spinning until it becomes available.
    ///
    /// Returns a [`SpinGuard`] which releases the lock on drop. There is no
    /// timeout: the calling thread commits to waiting indefinitely.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.raw.lock();
        SpinGuard { lock: self }
    }

    /// Attempts to acquire the lock without spinning.
    ///
    /// Returns `Some(SpinGuard)` if the lock was free, or `None` otherwise.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.raw.try_lock() {
            Some(SpinGuard { lock: self })
        } else {
            None
        }
    }

    /// Checks whether the lock is currently held.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Runs a closure with exclusive access to the data.
    ///
    /// A convenience wrapper around [`lock()`](SpinLock::lock) that releases
    /// the lock when the closure returns.
    ///
    /// # Example
    /// ```
    /// use hybrid_spinlock::SpinLock;
    /// let lock = SpinLock::new(0i32);
    /// lock.with_lock(|data| {
    ///     *data += 1;
    /// });
    /// ```
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Consumes the lock, returning the protected data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

// Safety: SpinLock enforces mutual exclusion via atomic operations, so `&Self`
// hands out access to the data to at most one thread at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}
