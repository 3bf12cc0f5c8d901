use crate::stats::{Percentiles, SummaryRecord, TrimView};

/// Conventional cap on raw samples printed ahead of a summary.
pub const PRINT_MAX: usize = 200;

/// Renders every field of `record` as a fixed-layout table.
pub fn format_stats(record: &SummaryRecord) -> String {
    let mut rows = vec![
        format!("  num_vals : {}", record.num_vals),
        format!(
            "  avg      : {:<10.1} abs_dev : {:<8.1} ({:.1}%)  std_dev : {:<8.1} ({:.1}%)",
            record.avg, record.abs_dev, record.abs_dev_perc, record.std_dev, record.std_dev_perc
        ),
        format!(
            "  min      : {:<10} (element {:>6})  max     : {:<10} (element {:>6})",
            record.min_val, record.min_val_idx, record.max_val, record.max_val_idx
        ),
        format!(
            "  band   | {:>9} {:>9} {:>7} | {:>10} {:>10} {:>10}",
            "in-band", "outliers", "out%", "avg", "abs_dev", "std_dev"
        ),
    ];
    for (band, view) in record.bands() {
        rows.push(format_view(&format!("{}%", band), view, record.num_vals));
    }
    rows.push(format_view("rest", &record.rest, record.num_vals));

    let mut out = rows.join("\n");
    out.push('\n');
    out
}

fn format_view(label: &str, view: &TrimView, num_vals: usize) -> String {
    let out_perc = 100.0 * view.num_dev as f64 / num_vals.max(1) as f64;
    format!(
        "  {:<6} | {:>9} {:>9} {:>6.2}% | {:>10.1} {:>10.1} {:>10.1}",
        label, view.num_in, view.num_dev, out_perc, view.avg, view.abs_dev, view.std_dev
    )
}

pub fn print_stats(record: &SummaryRecord) {
    print!("{}", format_stats(record));
}

/// Renders the first `num_print` samples as `[  i: value] ` cells.
pub fn format_samples(samples: &[u64], num_print: usize) -> String {
    samples
        .iter()
        .take(num_print)
        .enumerate()
        .map(|(i, val)| format!("[{:3}: {:4}] ", i, val))
        .collect()
}

pub fn print_samples(samples: &[u64], num_print: usize) {
    println!("{}", format_samples(samples, num_print));
}

pub fn format_percentiles(percentiles: &Percentiles) -> String {
    format!(
        "  p50={}\tp90={}\tp99={}\tp999={}\tmax={}",
        percentiles.p50, percentiles.p90, percentiles.p99, percentiles.p999, percentiles.max
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::compute;

    #[test]
    fn test_format_samples_caps_at_len() {
        assert_eq!(format_samples(&[5, 17], 10), "[  0:    5] [  1:   17] ");
    }

    #[test]
    fn test_format_samples_caps_at_num_print() {
        let text = format_samples(&[1, 2, 3, 4], 2);
        assert_eq!(text.matches('[').count(), 2);
        assert!(!text.contains("3]"));
    }

    #[test]
    fn test_format_stats_lists_every_view() {
        let record = compute(&[100, 80, 140, 40, 180, 60]);
        let text = format_stats(&record);
        assert!(text.contains("num_vals : 6"));
        assert!(text.contains("(element      4)"));
        for label in ["10%", "25%", "50%", "75%", "rest"] {
            assert!(text.contains(label), "missing {} row", label);
        }
        assert_eq!(text.lines().count(), 9);
    }

    #[test]
    fn test_format_stats_rows_are_newline_terminated() {
        let text = format_stats(&compute(&[10]));
        assert!(text.ends_with('\n'));
        assert!(!text.contains("\n\n"));
        assert!(text.lines().all(|row| row.starts_with("  ")));
    }

    #[test]
    fn test_format_percentiles() {
        let stats = crate::stats::percentiles(&[7; 10]);
        assert_eq!(
            format_percentiles(&stats),
            "  p50=7\tp90=7\tp99=7\tp999=7\tmax=7"
        );
    }
}
