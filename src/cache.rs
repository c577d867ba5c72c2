//! # Cache geometry
//!
//! The compile-time cache-line size used to align and pad the lock, plus a
//! best-effort runtime probe of what the operating system actually reports.
//!
//! [`RawSpinLock`](crate::spinlock::RawSpinLock) is aligned to
//! [`CACHE_LINE_SIZE`] so that each lock instance owns a full cache line and
//! two locks touched by different threads can never false-share. The constant
//! is selected per target architecture rather than hardcoded at use sites,
//! because line sizes vary (several aarch64 cores use 128-byte lines).
//!
//! A mismatch between [`CACHE_LINE_SIZE`] and [`detected_line_size`] does not
//! affect correctness of the lock, only the quality of its false-sharing
//! protection, so callers should treat it as a warning condition.

/// Cache-line size assumed at compile time for the current target, in bytes.
///
/// 128 on `aarch64`, 64 everywhere else.
#[cfg(target_arch = "aarch64")]
pub const CACHE_LINE_SIZE: usize = 128;

/// Cache-line size assumed at compile time for the current target, in bytes.
///
/// 128 on `aarch64`, 64 everywhere else.
#[cfg(not(target_arch = "aarch64"))]
pub const CACHE_LINE_SIZE: usize = 64;

/// Returns the L1 data-cache line size reported by the operating system, if
/// it can be determined on this platform.
///
/// Currently implemented for Linux via sysfs. Returns `None` on other
/// platforms or when the probe fails (e.g. in a container that masks sysfs).
#[cfg(feature = "std")]
pub fn detected_line_size() -> Option<usize> {
    imp::detected_line_size()
}

#[cfg(all(feature = "std", target_os = "linux"))]
mod imp {
    const SYSFS_PATH: &str = "/sys/devices/system/cpu/cpu0/cache/index0/coherency_line_size";

    pub(super) fn detected_line_size() -> Option<usize> {
        let raw = std::fs::read_to_string(SYSFS_PATH).ok()?;
        raw.trim().parse().ok().filter(|&size| size > 0)
    }
}

#[cfg(all(feature = "std", not(target_os = "linux")))]
mod imp {
    pub(super) fn detected_line_size() -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_size_is_a_power_of_two() {
        assert!(CACHE_LINE_SIZE.is_power_of_two());
        assert!(CACHE_LINE_SIZE >= core::mem::size_of::<u32>());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn detection_reports_sane_values() {
        // Sysfs may be unavailable (containers), so only check the value when
        // the probe succeeds.
        if let Some(size) = detected_line_size() {
            assert!(size.is_power_of_two(), "reported line size {size} not a power of two");
            assert!((16..=1024).contains(&size));
        }
    }
}
