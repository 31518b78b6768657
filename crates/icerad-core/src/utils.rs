//! Common numeric helpers used across the suite.

/// `n` evenly spaced values from `start` to `stop` (exclusive of `stop`),
/// matching the sample-time grids used throughout the trace code.
#[must_use]
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let step = (stop - start) / n as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Histogram of `values` over `n_bins` equal-width bins spanning
/// `[min, max]`. Values outside the range are dropped. Returns the bin
/// edges (length `n_bins + 1`) and counts (length `n_bins`).
#[must_use]
pub fn histogram(values: &[f64], min: f64, max: f64, n_bins: usize) -> (Vec<f64>, Vec<u64>) {
    let mut edges = Vec::with_capacity(n_bins + 1);
    let width = (max - min) / n_bins as f64;
    for i in 0..=n_bins {
        edges.push(min + i as f64 * width);
    }
    let mut counts = vec![0_u64; n_bins];
    for &v in values {
        if v < min || v > max {
            continue;
        }
        let mut bin = ((v - min) / width) as usize;
        if bin == n_bins {
            // value exactly at the upper edge lands in the last bin
            bin = n_bins - 1;
        }
        counts[bin] += 1;
    }
    (edges, counts)
}

/// Logarithmically spaced bin edges from `min` to `max` (both > 0),
/// suitable for energy spectra.
#[must_use]
pub fn log_bin_edges(min: f64, max: f64, n_bins: usize) -> Vec<f64> {
    let log_min = min.log10();
    let log_max = max.log10();
    let step = (log_max - log_min) / n_bins as f64;
    (0..=n_bins)
        .map(|i| 10f64.powf(log_min + i as f64 * step))
        .collect()
}

/// Histogram over explicit (monotonically increasing) bin edges.
#[must_use]
pub fn histogram_edges(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let n_bins = edges.len().saturating_sub(1);
    let mut counts = vec![0_u64; n_bins];
    for &v in values {
        if n_bins == 0 || v < edges[0] || v > edges[n_bins] {
            continue;
        }
        // linear scan; bin counts are small
        for bin in 0..n_bins {
            let upper_ok = if bin == n_bins - 1 {
                v <= edges[bin + 1]
            } else {
                v < edges[bin + 1]
            };
            if v >= edges[bin] && upper_ok {
                counts[bin] += 1;
                break;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_spacing() {
        let xs = linspace(0.0, 1.0, 4);
        assert_eq!(xs.len(), 4);
        assert!((xs[0]).abs() < 1e-12);
        assert!((xs[1] - 0.25).abs() < 1e-12);
        assert!((xs[3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn histogram_counts_and_edges() {
        let values = [0.1, 0.1, 0.6, 0.95, 1.0, 2.0];
        let (edges, counts) = histogram(&values, 0.0, 1.0, 2);
        assert_eq!(edges.len(), 3);
        assert_eq!(counts, vec![2, 3]); // 2.0 dropped, 1.0 in last bin
    }

    #[test]
    fn log_edges_span_decades() {
        let edges = log_bin_edges(1e17, 1e19, 2);
        assert_eq!(edges.len(), 3);
        assert!((edges[1] - 1e18).abs() / 1e18 < 1e-10);
    }

    #[test]
    fn histogram_explicit_edges() {
        let edges = [0.0, 1.0, 10.0];
        let counts = histogram_edges(&[0.5, 5.0, 9.0, 10.0, 11.0], &edges);
        assert_eq!(counts, vec![1, 3]);
    }
}
