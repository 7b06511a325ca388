// Plantwatch Anomaly - Batch statistics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Column statistics over row-major batches.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => return f64::NAN,
        1 => return sorted[0],
        _ => {}
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

pub fn column(rows: &[Vec<f64>], j: usize) -> Vec<f64> {
    rows.iter().map(|r| r[j]).collect()
}

/// Z-scale every column with batch mean and population std.
///
/// Constant columns are centered only.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let scales: Vec<(f64, f64)> = (0..first.len())
        .map(|j| {
            let col = column(rows, j);
            let sd = std_dev(&col);
            (mean(&col), if sd > 0.0 { sd } else { 1.0 })
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&scales)
                .map(|(x, (m, s))| (x - m) / s)
                .collect()
        })
        .collect()
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn test_linear_quantile() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_relative_eq!(quantile(&values, 0.25), 25.75);
        assert_relative_eq!(quantile(&values, 0.75), 75.25);
        assert_relative_eq!(quantile(&values, 0.0), 1.0);
        assert_relative_eq!(quantile(&values, 1.0), 100.0);
        assert_eq!(quantile(&[3.0], 0.5), 3.0);
    }

    #[test]
    fn test_standardize() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let z = standardize(&rows);
        assert_relative_eq!(z[0][0], -1.0);
        assert_relative_eq!(z[1][0], 1.0);
        assert_eq!(z[0][1], 0.0);
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }
}
