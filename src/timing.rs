use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};

use crate::structs::SimulationRecord;

/// A value that varies uniformly around its base.
///
/// Nothing is cached: every call to [`Jitter::sample`] draws a new deviate, so two
/// reads of the same jitter usually differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    base: f64,
    deviation: f64,
}

impl Jitter {
    pub fn new(base: f64, deviation: f64) -> Self {
        Jitter {
            base,
            deviation: deviation.abs(),
        }
    }

    /// base ± uniform(deviation), truncated toward zero. A NaN or infinite deviation is
    /// ignored.
    pub fn sample(&self, rng: &mut impl RngCore) -> i64 {
        if self.deviation == 0.0 || !self.deviation.is_finite() {
            return self.base.trunc() as i64;
        }
        let deviate = Uniform::new_inclusive(-self.deviation, self.deviation).sample(rng);
        (self.base + deviate).trunc() as i64
    }
}

/// Logical clock of the simulation.
///
/// Each emitted frame is stamped, then the clock moves forward by the caller's delay,
/// a jittered round-trip time and the time needed to push the bytes at a jittered
/// throughput.
#[derive(Debug, Clone)]
pub struct Simulator {
    clock_ms: u64,
    ping_ms: Jitter,
    throughput: Jitter,
    records: Vec<SimulationRecord>,
}

impl Simulator {
    /// `throughput` is in bytes per ms
    pub fn new(start_ms: u64, ping_ms: Jitter, throughput: Jitter) -> Self {
        Simulator {
            clock_ms: start_ms,
            ping_ms,
            throughput,
            records: vec![],
        }
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Record `data` at the current time plus `delay_ms`, and return that timestamp.
    pub fn emit(&mut self, rng: &mut impl RngCore, data: Vec<u8>, delay_ms: u64) -> u64 {
        let timestamp_ms = self.clock_ms.saturating_add(delay_ms);
        // a negative ping or a null throughput would break the clock
        let ping_ms = self.ping_ms.sample(rng).max(0) as u64;
        let throughput = self.throughput.sample(rng).max(1) as u64;
        let transfer_ms = data.len() as u64 / throughput;
        log::trace!(
            "Frame of {} bytes at {timestamp_ms} ms (ping {ping_ms} ms, throughput {throughput} B/ms)",
            data.len()
        );

        self.records.push(SimulationRecord { timestamp_ms, data });
        self.clock_ms = timestamp_ms.saturating_add(ping_ms).saturating_add(transfer_ms);
        timestamp_ms
    }

    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SimulationRecord> {
        self.records
    }
}
