//! # hybrid-spinlock 🌀
//!
//! A **cache-line-aligned, test-and-test-and-set spinlock** with exponential
//! backoff and a scheduler-yield fallback, built for short critical sections
//! under contention.
//!
//! The crate includes:
//!
//! - [`SpinLock<T>`] — the RAII lock most code wants, with a [`SpinGuard`]
//!   that releases on drop.
//! - [`RawSpinLock`] — the bare acquire/release protocol over a single padded
//!   state word, for callers managing their own data.
//! - [`BackOff`] / [`SpinConfig`] — the adaptive exponential backoff and its
//!   per-lock tuning (`spin_min`/`spin_max`).
//! - [`cache`] — the compile-time cache-line size and a runtime probe of what
//!   the OS reports, so padding mismatches can be surfaced.
//!
//! ## ✨ Features
//!
//! - ✅ `no_std` compatible (core-only; disable default features)
//! - ⚙️ `std` feature adds the scheduler-yield fallback and line-size probe
//! - 🔒 Test-and-test-and-set: waiters observe with plain loads and only CAS
//!   when the lock is seen free, keeping cache-invalidation traffic down
//! - 🧩 Each lock owns a full cache line, so independent locks never
//!   false-share
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use hybrid_spinlock::{SpinConfig, SpinLock};
//!
//! let lock = SpinLock::new(0);
//! {
//!     let mut guard = lock.lock();
//!     *guard += 1;
//! } // automatically unlocked when the guard is dropped
//! assert_eq!(*lock.lock(), 1);
//!
//! // Independent tuning per lock, no process-wide globals.
//! let tuned = SpinLock::with_config(0u64, SpinConfig::new(8, 4096));
//! tuned.with_lock(|v| *v += 1);
//! ```
//!
//! ## 🧠 Design
//!
//! `SpinLock` keeps its state in a single atomic word whose struct is aligned
//! and padded to the target's cache-line size ([`cache::CACHE_LINE_SIZE`]).
//! Acquire spins on a relaxed load until the lock looks free, then attempts a
//! compare-and-swap with acquire ordering; release is a single store with
//! release ordering, so every critical-section write is visible to the next
//! holder. Lost CAS races back off exponentially ([`BackOff`]), doubling from
//! `spin_min` pause-hint iterations up to `spin_max`, after which each retry
//! also yields the thread to the scheduler.
//!
//! ## ⚠️ Safety & Usage Notes
//!
//! - Not fair: waiters race for the lock, and starvation is possible under
//!   pathological scheduling.
//! - Not reentrant: a second `lock()` from the holding thread deadlocks.
//! - Prefer it for short critical sections only; never hold it across
//!   blocking or long-running operations.
//!
//! ## 📦 Modules
//!
//! - [`backoff`] — adaptive exponential backoff and [`SpinConfig`].
//! - [`spinlock`] — the lock primitive and RAII guard.
//! - [`cache`] — cache-line geometry.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod backoff;
pub mod cache;
pub mod spinlock;

pub use backoff::{BackOff, InvalidSpinConfig, SpinConfig};
pub use spinlock::{RawSpinLock, SpinGuard, SpinLock};
