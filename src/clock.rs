//! Per-architecture hardware cycle counters.
//!
//! The counter is chosen at build time. Targets without a user-space readable
//! counter fail to compile instead of silently reporting zero.

/// Source of monotonically increasing per-core ticks.
///
/// Implementors are zero-sized; the counter is read through an associated
/// function so a capture never touches `self`.
pub trait CycleCounter {
    fn now() -> u64;
}

/// The hardware time-stamp counter of the current core.
///
/// Not synchronized across cores: keep every capture of one channel on the
/// same core.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tsc;

impl CycleCounter for Tsc {
    #[inline(always)]
    fn now() -> u64 {
        read_ticks()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
#[allow(unused_unsafe)]
fn read_ticks() -> u64 {
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

#[cfg(target_arch = "x86")]
#[inline(always)]
#[allow(unused_unsafe)]
fn read_ticks() -> u64 {
    unsafe {
        core::arch::x86::_rdtsc()
    }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_ticks() -> u64 {
    // Virtual counter, readable from EL0. Fixed frequency, not core clock.
    let val: u64;
    unsafe {
        core::arch::asm!("mrs {}, cntvct_el0", out(reg) val, options(nomem, nostack));
    }
    val
}

#[cfg(target_arch = "riscv64")]
#[inline(always)]
fn read_ticks() -> u64 {
    let val: u64;
    unsafe {
        core::arch::asm!("rdcycle {}", out(reg) val, options(nomem, nostack));
    }
    val
}

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "x86",
    target_arch = "aarch64",
    target_arch = "riscv64"
)))]
compile_error!("cyclestat has no cycle counter for this target architecture");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsc_is_monotonic_on_one_thread() {
        let mut prev = Tsc::now();
        for _ in 0..10_000 {
            let now = Tsc::now();
            assert!(now >= prev);
            prev = now;
        }
    }
}
