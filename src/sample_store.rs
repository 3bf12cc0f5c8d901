use crate::calibration::Calibration;
use crate::clock::{CycleCounter, Tsc};
use crate::report;
use crate::stats::{self, Percentiles, SummaryRecord};
use crate::storage::sample_mmap::SampleMmap;
use spdlog::{debug, info};
use std::marker::PhantomData;
#[cfg(feature = "timings")]
use std::sync::atomic::{Ordering, compiler_fence};

pub struct SampleStoreOptions {
    pub num_channels: usize,
    /// Samples per channel.
    pub capacity: usize,
    /// Label used to tag log lines and reports.
    pub owner_id: usize,
    /// Touch every page up front so captures never take a page fault.
    pub prefault: bool,
}

impl SampleStoreOptions {
    pub fn new(num_channels: usize, capacity: usize, owner_id: usize) -> Self {
        Self {
            num_channels,
            capacity,
            owner_id,
            prefault: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleStoreError {
    #[error("failed to map {capacity} samples for channel {channel}: {source}")]
    Allocation {
        channel: usize,
        capacity: usize,
        #[source]
        source: std::io::Error,
    },
}

/// One independent buffer of corrected elapsed-cycle samples.
///
/// A channel must only be captured into from one thread at a time; hand out
/// disjoint channels with [`SampleStore::channels_mut`].
pub struct Channel<C: CycleCounter = Tsc> {
    samples: SampleMmap,
    #[cfg_attr(not(feature = "timings"), allow(dead_code))]
    start: u64,
    correction: u64,
    _counter: PhantomData<C>,
}

impl<C: CycleCounter> Channel<C> {
    fn new(capacity: usize, prefault: bool) -> Result<Self, std::io::Error> {
        let mut samples = SampleMmap::new(capacity)?;
        if prefault {
            samples.prefault();
        }
        Ok(Self {
            samples,
            start: 0,
            correction: 0,
            _counter: PhantomData,
        })
    }

    /// Opens a capture window by stamping the start slot.
    #[cfg(feature = "timings")]
    #[inline(always)]
    pub fn begin(&mut self) {
        compiler_fence(Ordering::SeqCst);
        self.start = C::now();
    }

    /// Closes the capture window and stores the corrected elapsed cycles at `entry`.
    ///
    /// Elapsed values smaller than the correction are stored as 0.
    #[cfg(feature = "timings")]
    #[inline(always)]
    pub fn end(&mut self, entry: usize) {
        compiler_fence(Ordering::SeqCst);
        let now = C::now();
        assert!(
            entry < self.samples.capacity(),
            "entry {} out of range for capacity {}",
            entry,
            self.samples.capacity()
        );
        let elapsed = now
            .saturating_sub(self.start)
            .saturating_sub(self.correction);
        self.samples.as_mut_slice()[entry] = elapsed;
    }

    /// Captures `region` into `entry` and returns its result.
    #[cfg(feature = "timings")]
    #[inline(always)]
    pub fn capture<R>(&mut self, entry: usize, region: impl FnOnce() -> R) -> R {
        self.begin();
        let result = region();
        self.end(entry);
        result
    }

    // Without `timings` capture compiles away and samples stay untouched.

    #[cfg(not(feature = "timings"))]
    #[inline(always)]
    pub fn begin(&mut self) {}

    #[cfg(not(feature = "timings"))]
    #[inline(always)]
    pub fn end(&mut self, _entry: usize) {}

    #[cfg(not(feature = "timings"))]
    #[inline(always)]
    pub fn capture<R>(&mut self, _entry: usize, region: impl FnOnce() -> R) -> R {
        region()
    }

    pub fn samples(&self) -> &[u64] {
        self.samples.as_slice()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn correction(&self) -> u64 {
        self.correction
    }

    pub(crate) fn set_correction(&mut self, correction: u64) {
        self.correction = correction;
    }

    /// Summarizes the first `num_vals` samples.
    pub fn compute(&self, num_vals: usize) -> SummaryRecord {
        stats::compute(self.valid_samples(num_vals))
    }

    pub fn percentiles(&self, num_vals: usize) -> Percentiles {
        stats::percentiles(self.valid_samples(num_vals))
    }

    fn valid_samples(&self, num_vals: usize) -> &[u64] {
        assert!(num_vals > 0, "num_vals must be positive");
        assert!(
            num_vals <= self.capacity(),
            "num_vals {} exceeds channel capacity {}",
            num_vals,
            self.capacity()
        );
        &self.samples()[..num_vals]
    }
}

/// A fixed set of sample channels sharing one capture correction.
pub struct SampleStore<C: CycleCounter = Tsc> {
    channels: Vec<Channel<C>>,
    capacity: usize,
    owner_id: usize,
    correction: u64,
}

impl SampleStore<Tsc> {
    /// Allocates the store on the hardware cycle counter.
    ///
    /// # Panics
    ///
    /// Panics on zero sizes or if the channel memory cannot be mapped.
    pub fn new(options: SampleStoreOptions) -> Self {
        Self::with_counter(options)
    }

    pub fn try_new(options: SampleStoreOptions) -> Result<Self, SampleStoreError> {
        Self::try_with_counter(options)
    }
}

impl<C: CycleCounter> SampleStore<C> {
    pub fn with_counter(options: SampleStoreOptions) -> Self {
        let owner_id = options.owner_id;
        Self::try_with_counter(options)
            .unwrap_or_else(|err| panic!("[{:02}] sample store init failed: {}", owner_id, err))
    }

    pub fn try_with_counter(options: SampleStoreOptions) -> Result<Self, SampleStoreError> {
        assert!(options.num_channels > 0, "num_channels must be positive");
        assert!(options.capacity > 0, "capacity must be positive");

        let mut channels = Vec::with_capacity(options.num_channels);
        for channel in 0..options.num_channels {
            let ch = Channel::new(options.capacity, options.prefault).map_err(|source| {
                SampleStoreError::Allocation {
                    channel,
                    capacity: options.capacity,
                    source,
                }
            })?;
            channels.push(ch);
        }

        info!(
            "[{:02}] initialized {} channels of {} samples",
            options.owner_id, options.num_channels, options.capacity
        );

        Ok(Self {
            channels,
            capacity: options.capacity,
            owner_id: options.owner_id,
            correction: 0,
        })
    }

    /// Releases every channel. Consuming the store rules out use after release.
    pub fn terminate(self) {
        debug!(
            "[{:02}] releasing {} channels",
            self.owner_id,
            self.channels.len()
        );
    }

    #[inline(always)]
    pub fn begin(&mut self, channel: usize) {
        self.channel_mut(channel).begin();
    }

    #[inline(always)]
    pub fn end(&mut self, channel: usize, entry: usize) {
        self.channel_mut(channel).end(entry);
    }

    pub fn compute(&self, channel: usize, num_vals: usize) -> SummaryRecord {
        self.channel(channel).compute(num_vals)
    }

    pub fn percentiles(&self, channel: usize, num_vals: usize) -> Percentiles {
        self.channel(channel).percentiles(num_vals)
    }

    /// Prints the first `num_print` raw samples followed by the summary.
    pub fn print(&self, channel: usize, num_vals: usize, num_print: usize) {
        let ch = self.channel(channel);
        let record = ch.compute(num_vals);
        if num_print > 0 {
            report::print_samples(&ch.samples()[..num_vals], num_print);
        }
        println!("[{:02}] channel {}", self.owner_id, channel);
        report::print_stats(&record);
    }

    /// Measures the cost of an empty capture on channel 0 and installs it as
    /// the correction of every channel. Overwrites channel 0's samples.
    pub fn calibrate(&mut self, iterations: usize) -> u64 {
        let iterations = iterations.min(self.capacity);
        let calibration = Calibration::measure(&mut self.channels[0], iterations, self.owner_id);
        info!(
            "[{:02}] correction: {} cycles ({} attempts, 75% band std dev {:.1}%)",
            self.owner_id, calibration.correction, calibration.attempts, calibration.noise_perc
        );
        self.set_correction(calibration.correction);
        calibration.correction
    }

    pub fn set_correction(&mut self, correction: u64) {
        self.correction = correction;
        for channel in &mut self.channels {
            channel.set_correction(correction);
        }
    }

    pub fn correction(&self) -> u64 {
        self.correction
    }

    pub fn channel(&self, channel: usize) -> &Channel<C> {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range for {} channels",
            channel,
            self.channels.len()
        );
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut Channel<C> {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range for {} channels",
            channel,
            self.channels.len()
        );
        &mut self.channels[channel]
    }

    /// All channels, for handing disjoint ones to capture threads.
    pub fn channels_mut(&mut self) -> &mut [Channel<C>] {
        &mut self.channels
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn owner_id(&self) -> usize {
        self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static TICKS: Cell<u64> = const { Cell::new(0) };
    }

    /// Advances by 10 ticks per read.
    struct StepCounter;

    impl CycleCounter for StepCounter {
        fn now() -> u64 {
            TICKS.with(|t| {
                let now = t.get() + 10;
                t.set(now);
                now
            })
        }
    }

    fn store(num_channels: usize, capacity: usize) -> SampleStore<StepCounter> {
        SampleStore::with_counter(SampleStoreOptions::new(num_channels, capacity, 3))
    }

    #[test]
    #[cfg(feature = "timings")]
    fn test_capture_writes_elapsed_ticks() {
        let mut store = store(2, 8);
        store.begin(1);
        store.end(1, 4);
        assert_eq!(store.channel(1).samples()[4], 10);
        assert_eq!(store.channel(0).samples()[4], 0);
    }

    #[test]
    #[cfg(feature = "timings")]
    fn test_correction_is_subtracted() {
        let mut store = store(1, 8);
        store.set_correction(4);
        store.begin(0);
        store.end(0, 0);
        assert_eq!(store.channel(0).samples()[0], 6);
    }

    #[test]
    #[cfg(feature = "timings")]
    fn test_correction_larger_than_elapsed_clamps_to_zero() {
        let mut store = store(1, 8);
        store.set_correction(25);
        store.begin(0);
        store.end(0, 0);
        assert_eq!(store.channel(0).samples()[0], 0);
    }

    #[test]
    #[cfg(feature = "timings")]
    fn test_capture_returns_region_result() {
        let mut store = store(1, 4);
        let out = store.channel_mut(0).capture(2, || 7 * 6);
        assert_eq!(out, 42);
        assert_eq!(store.channel(0).samples()[2], 10);
    }

    #[test]
    #[cfg(feature = "timings")]
    fn test_calibrate_removes_capture_cost() {
        let mut store = store(2, 64);
        assert_eq!(store.calibrate(1000), 10);
        assert_eq!(store.correction(), 10);
        assert_eq!(store.channel(1).correction(), 10);

        store.begin(1);
        store.end(1, 0);
        assert_eq!(store.channel(1).samples()[0], 0);
    }

    #[test]
    #[cfg(feature = "timings")]
    #[should_panic(expected = "out of range")]
    fn test_entry_out_of_range_panics() {
        let mut store = store(1, 4);
        store.begin(0);
        store.end(0, 4);
    }

    #[test]
    #[cfg(not(feature = "timings"))]
    fn test_capture_compiled_out_leaves_samples() {
        let mut store = store(1, 4);
        store.begin(0);
        store.end(0, 2);
        assert_eq!(store.channel_mut(0).capture(9, || 7 * 6), 42);
        assert!(store.channel(0).samples().iter().all(|&v| v == 0));
    }

    #[test]
    #[should_panic(expected = "channel 2 out of range")]
    fn test_channel_out_of_range_panics() {
        let mut store = store(2, 4);
        store.begin(2);
    }

    #[test]
    #[should_panic(expected = "exceeds channel capacity")]
    fn test_compute_beyond_capacity_panics() {
        let store = store(1, 4);
        store.compute(0, 5);
    }

    #[test]
    #[should_panic(expected = "num_vals must be positive")]
    fn test_compute_zero_vals_panics() {
        let store = store(1, 4);
        store.compute(0, 0);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        store(1, 0);
    }
}
