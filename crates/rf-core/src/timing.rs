//! Lightweight phase timing.
//!
//! Off by default; enable programmatically or with the `RF_TIMING`
//! environment variable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable performance timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Check if timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("RF_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    start: Instant,
    enabled: bool,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            enabled: is_enabled(),
        }
    }

    /// Stop the timer and return elapsed seconds, or None when timing is off.
    pub fn stop(self) -> Option<f64> {
        self.enabled.then(|| self.start.elapsed().as_secs_f64())
    }

    /// Stop and add the elapsed time to an accumulator.
    pub fn stop_into(self, acc: &AccumulatingTimer) {
        if let Some(elapsed) = self.stop() {
            acc.record(elapsed);
        }
    }
}

/// Accumulating timer for tracking total time across multiple calls.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Solver phase timers.
pub mod phases {
    use super::AccumulatingTimer;

    /// Momentum assembly, relaxation and solve
    pub static MOMENTUM: AccumulatingTimer = AccumulatingTimer::new();
    /// Pressure-correction engine, all non-orthogonal passes
    pub static PRESSURE: AccumulatingTimer = AccumulatingTimer::new();
    /// Linear solver calls (momentum components and pressure)
    pub static LINEAR_SOLVE: AccumulatingTimer = AccumulatingTimer::new();
    /// Turbulence model correction
    pub static TURBULENCE: AccumulatingTimer = AccumulatingTimer::new();

    pub fn reset_all() {
        MOMENTUM.reset();
        PRESSURE.reset();
        LINEAR_SOLVE.reset();
        TURBULENCE.reset();
    }

    pub fn print_summary() {
        if !super::is_enabled() {
            return;
        }

        println!("\n=== Solver Phase Breakdown ===");
        for (label, timer) in [
            ("momentum", &MOMENTUM),
            ("pressure", &PRESSURE),
            ("linear solve", &LINEAR_SOLVE),
            ("turbulence", &TURBULENCE),
        ] {
            let count = timer.count();
            if count > 0 {
                println!(
                    "{:<14} {} calls, {:.3}s total, {:.4}ms avg",
                    label,
                    count,
                    timer.total_seconds(),
                    timer.average_seconds() * 1000.0
                );
            }
        }
        println!("==============================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_averages() {
        let t = AccumulatingTimer::new();
        t.record(0.5);
        t.record(1.5);
        assert_eq!(t.count(), 2);
        assert!((t.total_seconds() - 2.0).abs() < 1e-6);
        assert!((t.average_seconds() - 1.0).abs() < 1e-6);
        t.reset();
        assert_eq!(t.count(), 0);
        assert_eq!(t.average_seconds(), 0.0);
    }

    #[test]
    fn enabled_timer_reports_elapsed() {
        enable_timing();
        let timer = Timer::start();
        assert!(timer.stop().is_some());
    }
}
