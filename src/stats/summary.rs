/// Trim thresholds, as a percentage of the overall average.
pub const TRIM_BANDS: [u32; 4] = [10, 25, 50, 75];

/// Statistics over the samples that fall inside one trim band.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrimView {
    /// Samples inside the band.
    pub num_in: usize,
    /// Samples outside the band.
    pub num_dev: usize,
    pub avg: f64,
    pub abs_dev: f64,
    pub std_dev: f64,
}

/// The full statistical summary of one channel's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryRecord {
    pub num_vals: usize,
    pub avg: f64,
    pub abs_dev: f64,
    /// `abs_dev` as a percentage of `avg`.
    pub abs_dev_perc: f64,
    pub std_dev: f64,
    /// `std_dev` as a percentage of `avg`.
    pub std_dev_perc: f64,
    pub min_val: u64,
    pub min_val_idx: usize,
    pub max_val: u64,
    pub max_val_idx: usize,
    pub band_10p: TrimView,
    pub band_25p: TrimView,
    pub band_50p: TrimView,
    pub band_75p: TrimView,
    /// What remains once the 75% band's outliers are discarded.
    pub rest: TrimView,
}

impl SummaryRecord {
    /// The four trim bands, paired with their threshold percentage.
    pub fn bands(&self) -> [(u32, &TrimView); 4] {
        [
            (TRIM_BANDS[0], &self.band_10p),
            (TRIM_BANDS[1], &self.band_25p),
            (TRIM_BANDS[2], &self.band_50p),
            (TRIM_BANDS[3], &self.band_75p),
        ]
    }
}

/// Reduces `samples` into a [`SummaryRecord`].
///
/// A sample belongs to band `p` when its distance from the overall average is
/// at most `p%` of that average (boundary inclusive). The samples are only read.
///
/// # Panics
///
/// Panics if `samples` is empty.
pub fn compute(samples: &[u64]) -> SummaryRecord {
    assert!(!samples.is_empty(), "cannot summarize an empty sample set");

    let mut min_val = u64::MAX;
    let mut min_val_idx = 0;
    let mut max_val = 0;
    let mut max_val_idx = 0;
    let mut sum: u128 = 0;
    for (i, &val) in samples.iter().enumerate() {
        if val < min_val {
            min_val = val;
            min_val_idx = i;
        }
        if val > max_val {
            max_val = val;
            max_val_idx = i;
        }
        sum += val as u128;
    }

    let num_vals = samples.len();
    let avg = sum as f64 / num_vals as f64;
    let (abs_dev, std_dev) = dispersion(samples.iter().copied(), avg);

    let band_10p = trim_view(samples, avg, TRIM_BANDS[0]);
    let band_25p = trim_view(samples, avg, TRIM_BANDS[1]);
    let band_50p = trim_view(samples, avg, TRIM_BANDS[2]);
    let band_75p = trim_view(samples, avg, TRIM_BANDS[3]);
    let rest = band_75p;

    SummaryRecord {
        num_vals,
        avg,
        abs_dev,
        abs_dev_perc: percent_of(abs_dev, avg),
        std_dev,
        std_dev_perc: percent_of(std_dev, avg),
        min_val,
        min_val_idx,
        max_val,
        max_val_idx,
        band_10p,
        band_25p,
        band_50p,
        band_75p,
        rest,
    }
}

fn trim_view(samples: &[u64], center: f64, band: u32) -> TrimView {
    let limit = center * band as f64 / 100.0;
    let in_band = |val: &u64| (*val as f64 - center).abs() <= limit;

    let mut num_in = 0;
    let mut sum: u128 = 0;
    for &val in samples.iter().filter(|v| in_band(*v)) {
        num_in += 1;
        sum += val as u128;
    }

    let num_dev = samples.len() - num_in;
    if num_in == 0 {
        return TrimView {
            num_dev,
            ..TrimView::default()
        };
    }

    let avg = sum as f64 / num_in as f64;
    let (abs_dev, std_dev) = dispersion(samples.iter().copied().filter(in_band), avg);
    TrimView {
        num_in,
        num_dev,
        avg,
        abs_dev,
        std_dev,
    }
}

/// Mean absolute deviation and population standard deviation around `mean`.
fn dispersion(vals: impl Iterator<Item = u64>, mean: f64) -> (f64, f64) {
    let mut count = 0usize;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    for val in vals {
        let diff = val as f64 - mean;
        abs_sum += diff.abs();
        sq_sum += diff * diff;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    (abs_sum / n, (sq_sum / n).sqrt())
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { 100.0 * part / whole } else { 0.0 }
}
