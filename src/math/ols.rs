//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt iteration solves a small damped linear problem
//!
//! ```text
//! minimize ||J δ + r||^2 + λ ||D δ||^2
//! ```
//!
//! which we express as one ordinary least squares problem on the augmented
//! system `[J; sqrt(λ) D] δ = [-r; 0]`.
//!
//! Implementation choices:
//! - We use SVD so tall (more rows than columns) and nearly rank-deficient
//!   systems are handled robustly. Control groups with replicate
//!   concentrations make `J` close to singular surprisingly often.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The parameter dimension is 4, so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_damped_augmented_rows() {
        // Rank-deficient J (duplicate columns) becomes solvable once damping rows are appended.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 2.0, 2.0, 0.1, 0.0, 0.0, 0.1]);
        let y = DVector::from_row_slice(&[2.0, 4.0, 0.0, 0.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - beta[1]).abs() < 1e-9);
        assert!(beta.iter().all(|v| v.is_finite()));
    }
}
