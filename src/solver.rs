//! Minimum-norm least squares.
//!
//! Solves `min ||A x - b||` and, among all minimisers, returns the one with
//! the smallest `||x||`. This is the pseudo-inverse solution, which keeps
//! rank-deficient and underdetermined fits (fewer days than feature columns)
//! reproducible.
//!
//! The decomposition is a one-sided Jacobi SVD: column pairs of a working copy
//! of `A` are rotated until they are mutually orthogonal, accumulating the
//! rotations in `V`. Pair order is fixed, so the same input always yields the
//! same bits.

use crate::error::{Result, SpendingForecastError};
use crate::schema::SolverSettings;
use ndarray::{Array1, Array2};

const ORTHOGONALITY_TOL: f64 = 1e-14;

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresSolution {
    pub coefficients: Array1<f64>,
    /// Number of singular values kept above the cutoff.
    pub rank: usize,
    pub sweeps: usize,
}

pub fn solve_min_norm(
    a: &Array2<f64>,
    b: &Array1<f64>,
    settings: &SolverSettings,
) -> Result<LeastSquaresSolution> {
    let (n_rows, n_cols) = a.dim();
    if b.len() != n_rows {
        return Err(SpendingForecastError::Prediction(format!(
            "Target has {} values but the design matrix has {} rows",
            b.len(),
            n_rows
        )));
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(SpendingForecastError::Prediction(
            "Design matrix or target contains non-finite values".to_string(),
        ));
    }

    // Columns whose squared norm falls below this are rounding noise left over from
    // rotating dependent columns together; they sit far under any `rcond` cutoff.
    let frobenius_sq = a.iter().map(|x| x * x).sum::<f64>();
    let noise_scale = f64::EPSILON * n_rows.max(n_cols) as f64;
    let negligible = noise_scale * noise_scale * frobenius_sq;

    let mut u = a.clone();
    let mut v: Array2<f64> = Array2::eye(n_cols);
    let mut sweeps = 0;
    let mut converged = n_cols < 2;

    while !converged && sweeps < settings.max_sweeps {
        sweeps += 1;
        let mut rotated = false;

        for j in 0..n_cols {
            for k in (j + 1)..n_cols {
                let (alpha, beta, gamma) = {
                    let cj = u.column(j);
                    let ck = u.column(k);
                    (cj.dot(&cj), ck.dot(&ck), cj.dot(&ck))
                };

                if alpha.min(beta) <= negligible
                    || gamma == 0.0
                    || gamma.abs() <= ORTHOGONALITY_TOL * (alpha * beta).sqrt()
                {
                    continue;
                }
                rotated = true;

                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;

                rotate_columns(&mut u, j, k, c, s);
                rotate_columns(&mut v, j, k, c, s);
            }
        }

        converged = !rotated;
    }

    if !converged {
        return Err(SpendingForecastError::Prediction(format!(
            "Least squares did not converge within {} sweeps",
            settings.max_sweeps
        )));
    }

    let sigmas: Vec<f64> = (0..n_cols)
        .map(|i| {
            let col = u.column(i);
            col.dot(&col).sqrt()
        })
        .collect();
    let sigma_max = sigmas.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = settings.rcond * sigma_max;

    let mut coefficients = Array1::<f64>::zeros(n_cols);
    let mut rank = 0;
    for (i, &sigma) in sigmas.iter().enumerate() {
        if sigma == 0.0 || sigma <= cutoff {
            continue;
        }
        rank += 1;
        // u_i = sigma_i * unit_i, so unit_i . b / sigma_i == u_i . b / sigma_i^2
        let weight = u.column(i).dot(b) / (sigma * sigma);
        coefficients.scaled_add(weight, &v.column(i));
    }

    Ok(LeastSquaresSolution {
        coefficients,
        rank,
        sweeps,
    })
}

fn rotate_columns(m: &mut Array2<f64>, j: usize, k: usize, c: f64, s: f64) {
    for mut row in m.rows_mut() {
        let xj = row[j];
        let xk = row[k];
        row[j] = c * xj - s * xk;
        row[k] = s * xj + c * xk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(actual: &Array1<f64>, expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {:?}, got {:?}", expected, actual);
        }
    }

    #[test]
    fn test_full_rank_exact_fit() {
        let a = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let b = array![1.0, 2.0, 3.0];
        let solution = solve_min_norm(&a, &b, &SolverSettings::default()).unwrap();
        assert_close(&solution.coefficients, &[1.0, 2.0]);
        assert_eq!(solution.rank, 2);
    }

    #[test]
    fn test_overdetermined_least_squares() {
        // Best single-coefficient fit of [1, 2, 3] against [1, 1, 1] is the mean.
        let a = array![[1.0], [1.0], [1.0]];
        let b = array![1.0, 2.0, 3.0];
        let solution = solve_min_norm(&a, &b, &SolverSettings::default()).unwrap();
        assert_close(&solution.coefficients, &[2.0]);
    }

    #[test]
    fn test_underdetermined_picks_min_norm() {
        let a = array![[1.0, 1.0]];
        let b = array![2.0];
        let solution = solve_min_norm(&a, &b, &SolverSettings::default()).unwrap();
        assert_close(&solution.coefficients, &[1.0, 1.0]);
        assert_eq!(solution.rank, 1);
    }

    #[test]
    fn test_duplicate_columns_split_evenly() {
        let a = array![[1.0, 1.0, 0.0], [2.0, 2.0, 0.0]];
        let b = array![2.0, 4.0];
        let solution = solve_min_norm(&a, &b, &SolverSettings::default()).unwrap();
        assert_close(&solution.coefficients, &[1.0, 1.0, 0.0]);
        assert_eq!(solution.rank, 1);
    }

    #[test]
    fn test_zero_matrix() {
        let a = Array2::<f64>::zeros((3, 2));
        let b = array![1.0, 2.0, 3.0];
        let solution = solve_min_norm(&a, &b, &SolverSettings::default()).unwrap();
        assert_close(&solution.coefficients, &[0.0, 0.0]);
        assert_eq!(solution.rank, 0);
    }

    #[test]
    fn test_repeatable_bits() {
        let a = array![
            [0.5, 3.0, -1.0, 2.0],
            [1.5, -2.0, 4.0, 0.0],
            [2.5, 1.0, 1.0, 1.0]
        ];
        let b = array![3.0, -1.0, 7.0];
        let settings = SolverSettings::default();
        let first = solve_min_norm(&a, &b, &settings).unwrap();
        let second = solve_min_norm(&a, &b, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_many_dependent_columns_converge() {
        // Centred columns spanning only two directions, like a short ledger with
        // more category columns than days.
        let p = [-1.0, 0.0, 1.0];
        let q = [1.0, -2.0, 1.0];
        let combos = [
            (1.0, 0.0),
            (0.0, 1.0),
            (2.0, 1.0),
            (7.0, 0.0),
            (0.0, 0.1),
            (1.0, -1.0),
            (0.0, 3.0),
            (1000.0, 0.0),
            (-13.0, 17.0),
        ];
        let a = Array2::from_shape_fn((3, combos.len()), |(i, j)| {
            combos[j].0 * p[i] + combos[j].1 * q[i]
        });
        let b = array![-7.0, 14.0, -7.0];
        let settings = SolverSettings::default();

        let solution = solve_min_norm(&a, &b, &settings).unwrap();
        assert_eq!(solution.rank, 2);
        assert!(solution.sweeps < settings.max_sweeps);

        let fitted = a.dot(&solution.coefficients);
        for (got, want) in fitted.iter().zip(b.iter()) {
            assert!((got - want).abs() < 1e-8, "{:?}", fitted);
        }
        assert_eq!(solution, solve_min_norm(&a, &b, &settings).unwrap());
    }

    #[test]
    fn test_rejects_mismatched_target() {
        let a = array![[1.0], [2.0]];
        let b = array![1.0];
        assert!(matches!(
            solve_min_norm(&a, &b, &SolverSettings::default()),
            Err(SpendingForecastError::Prediction(_))
        ));
    }
}
