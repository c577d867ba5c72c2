//! `spinlock-bench` — benchmarks the hybrid spinlock against `std::sync::Mutex`.
//!
//! Spawns N worker threads that each repeatedly acquire a lock, increment a
//! shared counter, spin through a configurable busy-work loop, and release.
//! Runs the same workload once over [`SpinLock`] and once over the standard
//! blocking mutex, reports elapsed wall-clock time for each, and verifies
//! that the final counter equals `threads * iterations` exactly — anything
//! else means mutual exclusion broke and the run fails.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{self, ensure, WrapErr};
use hybrid_spinlock::{cache, SpinConfig, SpinLock};
use tracing::{debug, info, warn};

/// Upper bound on worker threads; beyond this the run is a configuration
/// mistake, not a benchmark.
const MAX_THREADS: usize = 1024;

#[derive(Debug, Parser)]
#[command(
    name = "spinlock-bench",
    about = "Benchmark the hybrid spinlock against std::sync::Mutex"
)]
struct Options {
    /// Number of worker threads.
    #[arg(short = 't', long, default_value_t = 4)]
    threads: usize,

    /// Lock/increment/unlock iterations per thread.
    #[arg(short = 'i', long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Busy-work loop count inside each critical section (0 = short section).
    #[arg(short = 'l', long = "load", default_value_t = 500)]
    load: u32,

    /// Initial spin-backoff delay, in pause iterations.
    #[arg(short = 'm', long, default_value_t = 4)]
    spin_min: u32,

    /// Ceiling on the spin-backoff delay before waiters yield.
    #[arg(short = 'M', long, default_value_t = 16_000)]
    spin_max: u32,

    /// Configures benchmark logging.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

impl Options {
    /// Rejects invalid configurations before any worker thread is spawned.
    fn validate(&self) -> eyre::Result<()> {
        ensure!(
            (1..=MAX_THREADS).contains(&self.threads),
            "thread count must be between 1 and {MAX_THREADS}, got {}",
            self.threads
        );
        ensure!(
            self.iterations >= 1,
            "iteration count must be at least 1, got {}",
            self.iterations
        );
        self.spin_config()
            .validate()
            .wrap_err("invalid backoff configuration")?;
        Ok(())
    }

    fn spin_config(&self) -> SpinConfig {
        SpinConfig::new(self.spin_min, self.spin_max)
    }

    fn expected_count(&self) -> u64 {
        self.threads as u64 * self.iterations
    }
}

/// The lock shapes the benchmark can drive: one critical section over a
/// shared counter, and a way to read the final value afterward.
trait BenchLock: Sync {
    fn with_locked(&self, f: impl FnOnce(&mut u64));
    fn value(&self) -> u64;
}

impl BenchLock for SpinLock<u64> {
    fn with_locked(&self, f: impl FnOnce(&mut u64)) {
        self.with_lock(f);
    }

    fn value(&self) -> u64 {
        *self.lock()
    }
}

impl BenchLock for Mutex<u64> {
    fn with_locked(&self, f: impl FnOnce(&mut u64)) {
        // A poisoned mutex means a worker already panicked; the counter check
        // below reports the damage, so keep going with the inner value.
        f(&mut self.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn value(&self) -> u64 {
        *self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Simulated workload held inside the critical section.
#[inline(always)]
fn busy_work(loops: u32) {
    for _ in 0..loops {
        std::hint::black_box(());
    }
}

/// Runs the full workload over `lock` and returns the elapsed wall-clock time.
///
/// `thread::scope` joins every spawned worker on exit, including when one of
/// them panics, so no handle is ever leaked.
fn run_bench<L: BenchLock>(lock: &L, opts: &Options) -> Duration {
    let start = Instant::now();

    std::thread::scope(|s| {
        for _ in 0..opts.threads {
            s.spawn(|| {
                for _ in 0..opts.iterations {
                    lock.with_locked(|counter| {
                        *counter += 1;
                        busy_work(opts.load);
                    });
                }
            });
        }
    });

    start.elapsed()
}

/// Prints one algorithm's report block and fails the run on a counter
/// mismatch, which would mean mutual exclusion broke.
fn report(name: &str, elapsed: Duration, counted: u64, expected: u64) -> eyre::Result<()> {
    let verdict = if counted == expected { "OK" } else { "FAIL" };
    println!("[ {name:<22} ]");
    println!("  - Elapsed Time : {:>10.3} ms", elapsed.as_secs_f64() * 1e3);
    println!("  - Atomic Count : {counted:>10} / {expected} ({verdict})");

    ensure!(
        counted == expected,
        "{name}: counter is {counted}, expected {expected} — mutual exclusion is broken"
    );
    Ok(())
}

/// Warns when the padding compiled into the lock does not match the line size
/// the OS reports. The lock still excludes correctly; only the false-sharing
/// protection may be imperfect.
fn check_cache_line() {
    match cache::detected_line_size() {
        Some(detected) if detected != cache::CACHE_LINE_SIZE => warn!(
            detected,
            compiled = cache::CACHE_LINE_SIZE,
            "cache line size mismatch; lock padding may not prevent false sharing"
        ),
        Some(detected) => debug!(detected, "cache line size matches the compiled constant"),
        None => debug!("cache line size not reported by the OS"),
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let opts = Options::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&opts.log))
        .with_writer(std::io::stderr)
        .init();

    opts.validate()?;
    check_cache_line();

    println!("--- SPINLOCK BENCHMARK SUITE ---");
    println!("  Threads        : {}", opts.threads);
    println!("  Iterations     : {}", opts.iterations);
    println!("  Workload loops : {}", opts.load);
    println!("  Backoff range  : {} ~ {}", opts.spin_min, opts.spin_max);
    println!("  Cache line     : {} bytes (compiled)", cache::CACHE_LINE_SIZE);
    println!();

    info!(threads = opts.threads, iterations = opts.iterations, "running spinlock pass");
    let spinlock = SpinLock::with_config(0u64, opts.spin_config());
    let t_spin = run_bench(&spinlock, &opts);
    report("Hybrid Spinlock", t_spin, spinlock.value(), opts.expected_count())?;
    println!();

    info!(threads = opts.threads, iterations = opts.iterations, "running mutex pass");
    let mutex = Mutex::new(0u64);
    let t_mutex = run_bench(&mutex, &opts);
    report("std::sync::Mutex", t_mutex, mutex.value(), opts.expected_count())?;

    println!();
    println!("--------------------------------");
    println!(
        "  Speedup        : {:.2}x (mutex/spinlock)",
        t_mutex.as_secs_f64() / t_spin.as_secs_f64()
    );
    println!(
        "  Winner         : {}",
        if t_spin < t_mutex { "Hybrid Spinlock" } else { "std::sync::Mutex" }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(threads: usize, iterations: u64, spin_min: u32, spin_max: u32) -> Options {
        Options {
            threads,
            iterations,
            load: 0,
            spin_min,
            spin_max,
            log: "warn".into(),
        }
    }

    #[test]
    fn valid_configurations_pass() {
        assert!(options(1, 1, 0, 0).validate().is_ok());
        assert!(options(4, 1_000_000, 4, 16_000).validate().is_ok());
        assert!(options(1024, 1, 16, 16).validate().is_ok());
    }

    #[test]
    fn inverted_backoff_range_is_rejected() {
        assert!(options(4, 1000, 16_000, 4).validate().is_err());
    }

    #[test]
    fn out_of_range_thread_and_iteration_counts_are_rejected() {
        assert!(options(0, 1000, 4, 16).validate().is_err());
        assert!(options(1025, 1000, 4, 16).validate().is_err());
        assert!(options(4, 0, 4, 16).validate().is_err());
    }

    #[test]
    fn bench_counts_exactly_for_both_locks() {
        let opts = options(4, 5_000, 4, 64);

        let spinlock = SpinLock::with_config(0u64, opts.spin_config());
        run_bench(&spinlock, &opts);
        assert_eq!(spinlock.value(), opts.expected_count());

        let mutex = Mutex::new(0u64);
        run_bench(&mutex, &opts);
        assert_eq!(mutex.value(), opts.expected_count());
    }

    #[test]
    fn zero_backoff_bench_still_excludes() {
        let opts = options(4, 5_000, 0, 0);
        let spinlock = SpinLock::with_config(0u64, opts.spin_config());
        run_bench(&spinlock, &opts);
        assert_eq!(spinlock.value(), opts.expected_count());
    }
}
