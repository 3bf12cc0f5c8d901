use hdrhistogram::Histogram;

/// Quantiles of one channel's samples, in cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Percentiles {
    pub count: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

/// Builds a 3 significant figure histogram over `samples` and reads its quantiles.
///
/// # Panics
///
/// Panics if `samples` is empty.
pub fn percentiles(samples: &[u64]) -> Percentiles {
    assert!(!samples.is_empty(), "cannot take percentiles of an empty sample set");

    let mut histogram =
        Histogram::<u64>::new(3).expect("3 significant figures is a valid histogram precision");
    for &val in samples {
        histogram.saturating_record(val);
    }

    Percentiles {
        count: histogram.len(),
        p50: histogram.value_at_quantile(0.5),
        p90: histogram.value_at_quantile(0.9),
        p99: histogram.value_at_quantile(0.99),
        p999: histogram.value_at_quantile(0.999),
        max: histogram.max(),
    }
}
