use crate::clock::CycleCounter;
use crate::sample_store::Channel;
use crate::stats::SummaryRecord;
use spdlog::warn;

/// Attempts before a noisy calibration is accepted anyway.
pub const MAX_ATTEMPTS: u32 = 10;
/// Highest 75% band std dev, as a percentage of its average, for a clean run.
pub const NOISE_THRESHOLD_PERC: f64 = 10.0;

/// The measured cost of an empty capture.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    /// Cycles to subtract from every raw sample.
    pub correction: u64,
    pub attempts: u32,
    pub noise_perc: f64,
    pub summary: SummaryRecord,
}

impl Calibration {
    /// Runs `iterations` empty captures on `channel` and takes the average of
    /// the 75% in-band samples as the correction, retrying while the run is noisy.
    ///
    /// Leaves the channel's correction at 0 and its first `iterations`
    /// samples overwritten.
    pub fn measure<C: CycleCounter>(channel: &mut Channel<C>, iterations: usize, owner_id: usize) -> Self {
        assert!(iterations > 0, "calibration needs at least one iteration");
        channel.set_correction(0);

        let mut attempts = 0;
        loop {
            attempts += 1;
            for entry in 0..iterations {
                channel.begin();
                channel.end(entry);
            }

            let summary = channel.compute(iterations);
            let noise_perc = noise_perc(&summary);
            if noise_perc <= NOISE_THRESHOLD_PERC || attempts >= MAX_ATTEMPTS {
                return Self {
                    correction: summary.rest.avg.round() as u64,
                    attempts,
                    noise_perc,
                    summary,
                };
            }

            warn!(
                "[{:02}] calibration attempt {}/{} too noisy: 75% band std dev {:.1}% of {:.1} cycles, retrying",
                owner_id, attempts, MAX_ATTEMPTS, noise_perc, summary.band_75p.avg
            );
        }
    }
}

fn noise_perc(summary: &SummaryRecord) -> f64 {
    let band = &summary.band_75p;
    if band.avg > 0.0 {
        100.0 * band.std_dev / band.avg
    } else {
        0.0
    }
}
