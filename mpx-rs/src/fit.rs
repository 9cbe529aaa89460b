//! Log-linear growth fit over the qualifying suffix of the weekly series.

use nalgebra::{DMatrix, DVector};

use crate::weekly::WeeklyBucket;

/// Parameters of `count = base * exp(day / efolding_time)` fitted by ordinary
/// least squares on `ln(count)` vs. week-end day offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub slope: f64,
    pub intercept: f64,
    pub efolding_time: f64,
    pub doubling_time: f64,
    pub base: f64,
    /// Root-mean-square of per-point log residuals over the fitted suffix.
    pub log_rms: f64,
    /// Index into the weekly series where the fitted suffix begins.
    pub fit_start_index: usize,
}

impl FitResult {
    /// Fitted count at the given day offset.
    pub fn predict(&self, day: i64) -> f64 {
        (self.intercept + self.slope * day as f64).exp()
    }
}

/// Outcome of a fit attempt. Too little qualifying data is a normal terminal
/// state, not an error: the run still emits the raw weekly table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    Fitted(FitResult),
    InsufficientData,
}

impl FitOutcome {
    pub fn fitted(&self) -> Option<&FitResult> {
        match self {
            FitOutcome::Fitted(fit) => Some(fit),
            FitOutcome::InsufficientData => None,
        }
    }
}

/// Least-squares solve via SVD. The design matrix is tall (n rows, 2
/// columns), which rules out the plain QR solver; progressively looser
/// tolerances handle near-collinear columns.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

/// Fit the exponential-growth model to the suffix of `series` starting at the
/// first bucket whose count strictly exceeds `count_threshold`.
///
/// No qualifying bucket, or fewer than 3 buckets from the first qualifying
/// one to the end, yields [`FitOutcome::InsufficientData`].
pub fn fit_trend(series: &[WeeklyBucket], count_threshold: u64) -> FitOutcome {
    let Some(start) = series.iter().position(|b| b.count > count_threshold) else {
        return FitOutcome::InsufficientData;
    };
    let suffix = &series[start..];
    if suffix.len() < 3 {
        return FitOutcome::InsufficientData;
    }

    // Every suffix count exceeds the (non-negative) threshold, so the logs
    // below are well defined.
    debug_assert!(suffix.iter().all(|b| b.count > 0));

    let n = suffix.len();
    let x = DMatrix::from_fn(n, 2, |r, c| {
        if c == 0 {
            1.0
        } else {
            suffix[r].week_end_day as f64
        }
    });
    let y = DVector::from_iterator(n, suffix.iter().map(|b| (b.count as f64).ln()));

    let Some(beta) = solve_least_squares(&x, &y) else {
        // Distinct week-end days make the design matrix full rank; a solver
        // failure here means degenerate input, which we treat like not
        // having enough data.
        log::warn!("least-squares solve failed on {n} weekly buckets");
        return FitOutcome::InsufficientData;
    };

    let intercept = beta[0];
    let slope = beta[1];
    let efolding_time = 1.0 / slope;
    let doubling_time = std::f64::consts::LN_2 * efolding_time;
    let base = intercept.exp();

    let sq_sum: f64 = suffix
        .iter()
        .map(|b| {
            let residual = (b.count as f64).ln() - (intercept + slope * b.week_end_day as f64);
            residual * residual
        })
        .sum();
    let log_rms = (sq_sum / n as f64).sqrt();

    FitOutcome::Fitted(FitResult {
        slope,
        intercept,
        efolding_time,
        doubling_time,
        base,
        log_rms,
        fit_start_index: start,
    })
}
