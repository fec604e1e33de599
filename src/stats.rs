//! Statistical utility functions shared across modules
//!
//! Quantiles follow R's default `quantile(type = 7)`, which is what
//! upper-quartile scaling and the RLE summaries are defined against.

use std::cmp::Ordering;

/// Total order on f64 with NaN sorted last
pub fn cmp_nan_last(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

/// Quantile of already-sorted, finite values using linear interpolation
/// R equivalent: quantile(x, p, type = 7)
///
/// h = (n - 1) * p, result = x[floor(h)] + (h - floor(h)) * (x[ceil(h)] - x[floor(h)])
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let h = (n as f64 - 1.0) * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Quantile of unsorted values; NaN entries are ignored
pub fn quantile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(cmp_nan_last);
    quantile_type7(&sorted, p)
}

/// Median of unsorted values; NaN entries are ignored
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Arithmetic mean (NaN for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson correlation coefficient
///
/// Returns NaN when the slices differ in length, are shorter than two
/// elements, or either has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }

    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mx;
        let dy = yi - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quantile_type7_matches_r() {
        // R: quantile(c(1, 2, 3, 4), 0.75) == 3.25
        let x = vec![1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(quantile_type7(&x, 0.75), 3.25, epsilon = 1e-12);
        assert_abs_diff_eq!(quantile_type7(&x, 0.5), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(quantile_type7(&x, 0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quantile_type7(&x, 1.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_unsorted_ignores_nan() {
        let x = vec![5.0, f64::NAN, 1.0, 3.0];
        assert_abs_diff_eq!(median(&x), 3.0, epsilon = 1e-12);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_pearson_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| -2.0 * v + 1.0).collect();
        assert_abs_diff_eq!(pearson_correlation(&x, &y), -1.0, epsilon = 1e-12);

        let flat = vec![2.0; 5];
        assert!(pearson_correlation(&x, &flat).is_nan());
        assert!(pearson_correlation(&x, &y[..3]).is_nan());
    }

    #[test]
    fn test_cmp_nan_last() {
        let mut v = vec![3.0, f64::NAN, 1.0, 2.0];
        v.sort_by(cmp_nan_last);
        assert_eq!(&v[..3], &[1.0, 2.0, 3.0]);
        assert!(v[3].is_nan());
    }
}
