//! Cycle-accurate latency sampling for microbenchmarks.
//!
//! A [`SampleStore`] holds per-channel buffers of elapsed-cycle samples. Each
//! sample is taken with a [`Channel::begin`]/[`Channel::end`] pair around the
//! measured region and corrected for the cost of the capture itself. Once a
//! channel is filled, [`SampleStore::compute`] reduces it to a
//! [`SummaryRecord`] with trimmed views that separate typical latency from
//! outliers.
//!
//! ```no_run
//! use cyclestat::{SampleStore, SampleStoreOptions, report};
//!
//! let mut store = SampleStore::new(SampleStoreOptions::new(1, 1000, 0));
//! store.calibrate(1000);
//! for i in 0..1000 {
//!     store.begin(0);
//!     std::hint::spin_loop();
//!     store.end(0, i);
//! }
//! report::print_stats(&store.compute(0, 1000));
//! store.terminate();
//! ```

mod calibration;
mod clock;
pub mod report;
mod sample_store;
pub mod stats;
mod storage;

pub use crate::calibration::{Calibration, MAX_ATTEMPTS, NOISE_THRESHOLD_PERC};
pub use crate::clock::{CycleCounter, Tsc};
pub use crate::sample_store::{Channel, SampleStore, SampleStoreError, SampleStoreOptions};
pub use crate::stats::{Percentiles, SummaryRecord, TrimView};
