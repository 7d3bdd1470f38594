use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Eigenvalues below this fraction of the largest one are treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// `y = intercept + c0 * x0 + c1 * x1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; 2],
}

impl LinearModel {
    /// Ordinary least squares with an intercept.
    ///
    /// Features are centred and scaled to unit variance before solving the 2×2
    /// normal equations through a pseudo-inverse, so collinear or constant
    /// features yield the minimum-norm solution rather than an error.
    pub fn fit(xs: &[[f64; 2]], ys: &[f64]) -> ReportResult<Self> {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return Err(ReportError::InsufficientData {
                found: n,
                required: 2,
            });
        }
        let xs = &xs[..n];
        let ys = &ys[..n];
        let nf = n as f64;

        let mean_x = [
            xs.iter().map(|x| x[0]).sum::<f64>() / nf,
            xs.iter().map(|x| x[1]).sum::<f64>() / nf,
        ];
        let mean_y = ys.iter().sum::<f64>() / nf;

        let (mut s00, mut s01, mut s11) = (0.0, 0.0, 0.0);
        let mut sxy = [0.0; 2];
        for (x, y) in xs.iter().zip(ys) {
            let d0 = x[0] - mean_x[0];
            let d1 = x[1] - mean_x[1];
            let dy = y - mean_y;
            s00 += d0 * d0;
            s01 += d0 * d1;
            s11 += d1 * d1;
            sxy[0] += d0 * dy;
            sxy[1] += d1 * dy;
        }

        let scale = [unit_or_sqrt(s00), unit_or_sqrt(s11)];
        let beta_std = solve_symmetric_pinv(
            s00 / (scale[0] * scale[0]),
            s01 / (scale[0] * scale[1]),
            s11 / (scale[1] * scale[1]),
            [sxy[0] / scale[0], sxy[1] / scale[1]],
        );
        let coefficients = [beta_std[0] / scale[0], beta_std[1] / scale[1]];
        let intercept = mean_y - coefficients[0] * mean_x[0] - coefficients[1] * mean_x[1];

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: [f64; 2]) -> f64 {
        self.intercept + self.coefficients[0] * x[0] + self.coefficients[1] * x[1]
    }
}

fn unit_or_sqrt(sum_sq: f64) -> f64 {
    if sum_sq > 0.0 {
        sum_sq.sqrt()
    } else {
        1.0
    }
}

/// Solve `[[a, b], [b, d]] · β = c` with the Moore–Penrose pseudo-inverse.
fn solve_symmetric_pinv(a: f64, b: f64, d: f64, c: [f64; 2]) -> [f64; 2] {
    let half_gap = (a - d) / 2.0;
    let l1 = (a + d) / 2.0 + (half_gap * half_gap + b * b).sqrt();
    if !(l1 > 0.0) {
        return [0.0, 0.0];
    }
    let l2 = (a * d - b * b) / l1;

    // eigenvector of l1 from whichever row of (M - l1 I) is better conditioned
    let cand_a = (l1 - d, b);
    let cand_b = (b, l1 - a);
    let norm_a = cand_a.0.hypot(cand_a.1);
    let norm_b = cand_b.0.hypot(cand_b.1);
    let v1 = if norm_a == 0.0 && norm_b == 0.0 {
        (1.0, 0.0)
    } else if norm_a >= norm_b {
        (cand_a.0 / norm_a, cand_a.1 / norm_a)
    } else {
        (cand_b.0 / norm_b, cand_b.1 / norm_b)
    };
    let v2 = (-v1.1, v1.0);

    let mut beta = [0.0, 0.0];
    for (lambda, v) in [(l1, v1), (l2, v2)] {
        if lambda > l1 * RANK_TOLERANCE {
            let w = (v.0 * c[0] + v.1 * c[1]) / lambda;
            beta[0] += w * v.0;
            beta[1] += w * v.1;
        }
    }
    beta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * (1.0 + b.abs())
    }

    #[test]
    fn recovers_exact_plane() -> ReportResult<()> {
        let xs = [[1.0, 10.0], [2.0, 30.0], [3.0, 20.0], [4.0, 50.0], [-1.5, 5.0]];
        let ys: Vec<f64> = xs.iter().map(|x| 100.0 + 10.0 * x[0] + 2.0 * x[1]).collect();

        let m = LinearModel::fit(&xs, &ys)?;
        assert!(close(m.intercept, 100.0, 1e-9), "{m:?}");
        assert!(close(m.coefficients[0], 10.0, 1e-9), "{m:?}");
        assert!(close(m.coefficients[1], 2.0, 1e-9), "{m:?}");
        Ok(())
    }

    #[test]
    fn mixed_scales_stay_accurate() -> ReportResult<()> {
        // yearly-change-sized and net-change-sized features side by side
        let xs = [
            [0.39, 5_540_090.0],
            [0.99, 13_586_631.0],
            [0.59, 1_937_734.0],
            [-0.30, -383_840.0],
            [2.70, 5_175_990.0],
            [1.10, 2_898_047.0],
        ];
        let ys: Vec<f64> = xs
            .iter()
            .map(|x| 5.0e7 + 3.0e6 * x[0] + 40.0 * x[1])
            .collect();
        let m = LinearModel::fit(&xs, &ys)?;
        assert!(close(m.coefficients[0], 3.0e6, 1e-6), "{m:?}");
        assert!(close(m.coefficients[1], 40.0, 1e-6), "{m:?}");
        assert!(close(m.predict([1.0, 1.0e6]), 5.0e7 + 3.0e6 + 4.0e7, 1e-6));
        Ok(())
    }

    #[test]
    fn least_squares_residuals_are_orthogonal() -> ReportResult<()> {
        let xs = [[0.0, 1.0], [1.0, 0.0], [2.0, 2.0], [3.0, 1.0], [4.0, 5.0]];
        let ys = [1.0, 3.0, 2.0, 7.0, 4.0];
        let m = LinearModel::fit(&xs, &ys)?;

        let (mut r_sum, mut r_x0, mut r_x1) = (0.0, 0.0, 0.0);
        for (x, y) in xs.iter().zip(ys) {
            let r = y - m.predict(*x);
            r_sum += r;
            r_x0 += r * x[0];
            r_x1 += r * x[1];
        }
        assert!(r_sum.abs() < 1e-9);
        assert!(r_x0.abs() < 1e-9);
        assert!(r_x1.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn two_points_fit_through_both() -> ReportResult<()> {
        let xs = [[1.0, 100.0], [3.0, 500.0]];
        let ys = [10.0, 30.0];
        let m = LinearModel::fit(&xs, &ys)?;
        assert!(close(m.predict(xs[0]), 10.0, 1e-9));
        assert!(close(m.predict(xs[1]), 30.0, 1e-9));
        Ok(())
    }

    #[test]
    fn constant_features_fall_back_to_the_mean() -> ReportResult<()> {
        let xs = [[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        let ys = [3.0, 6.0, 9.0];
        let m = LinearModel::fit(&xs, &ys)?;
        assert_eq!(m.coefficients, [0.0, 0.0]);
        assert!(close(m.intercept, 6.0, 1e-12));
        Ok(())
    }

    #[test]
    fn needs_two_samples() {
        assert_eq!(
            LinearModel::fit(&[[1.0, 1.0]], &[1.0]),
            Err(ReportError::InsufficientData {
                found: 1,
                required: 2
            })
        );
    }
}
