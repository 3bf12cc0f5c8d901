pub mod percentiles;
pub mod summary;

pub use percentiles::{Percentiles, percentiles};
pub use summary::{SummaryRecord, TRIM_BANDS, TrimView, compute};
