//! Gaussian process regression with a Matérn 5/2 kernel.
//!
//! The kernel is isotropic with unit signal variance:
//! `k(a, b) = (1 + √5 r + 5/3 r²) exp(-√5 r)`, `r = |a - b| / ℓ`.
//! Targets are standardized before fitting (population standard deviation,
//! 1 when constant) and `noise` is added to the kernel diagonal. The length
//! scale `ℓ` maximizes the log marginal likelihood over `[1e-5, 1e5]`,
//! searched in log space from `ℓ = 1` plus `n_restarts` random starts.

use nalgebra::{DMatrix, DVector};

use super::nelder_mead;

const SQRT_5: f64 = 2.236_067_977_499_79;
const LOG_LENGTH_BOUNDS: (f64, f64) = (-11.512_925_464_970_229, 11.512_925_464_970_229);
const JITTER: [f64; 3] = [0.0, 1e-8, 1e-6];

fn matern52(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let r_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (x - y) / length_scale;
            d * d
        })
        .sum();
    let sqrt5_r = SQRT_5 * r_sq.sqrt();
    (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

fn kernel_matrix(x: &[Vec<f64>], length_scale: f64, noise: f64) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = matern52(&x[i], &x[j], length_scale);
        if i == j { k + noise } else { k }
    })
}

/// Cholesky factor of the kernel matrix, retrying with extra jitter.
fn factor(
    x: &[Vec<f64>],
    length_scale: f64,
    noise: f64,
) -> Option<nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>> {
    JITTER
        .iter()
        .find_map(|j| nalgebra::linalg::Cholesky::new(kernel_matrix(x, length_scale, noise + j)))
}

/// Negative log marginal likelihood of standardized targets.
#[allow(clippy::cast_precision_loss)]
fn neg_log_marginal_likelihood(x: &[Vec<f64>], y: &DVector<f64>, length_scale: f64, noise: f64) -> f64 {
    let Some(chol) = factor(x, length_scale, noise) else {
        return f64::INFINITY;
    };
    let alpha = chol.solve(y);
    let log_det: f64 = chol.l().diagonal().iter().map(|d| d.ln()).sum();
    let n = y.len() as f64;
    0.5 * y.dot(&alpha) + log_det + 0.5 * n * (2.0 * core::f64::consts::PI).ln()
}

/// A fitted Gaussian process.
pub(crate) struct GaussianProcess {
    x_train: Vec<Vec<f64>>,
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    alpha: DVector<f64>,
    length_scale: f64,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    /// Fits the process to `(x, y)`. Returns `None` when the kernel matrix
    /// cannot be factored even with added jitter.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        noise: f64,
        n_restarts: usize,
        rng: &mut fastrand::Rng,
    ) -> Option<Self> {
        let n = y.len();
        if n == 0 || x.len() != n {
            return None;
        }
        let y_mean = y.iter().sum::<f64>() / n as f64;
        let var = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if var > 0.0 { var.sqrt() } else { 1.0 };
        let y_norm = DVector::from_iterator(n, y.iter().map(|v| (v - y_mean) / y_std));

        let (lo, hi) = LOG_LENGTH_BOUNDS;
        let objective = |theta: &[f64]| neg_log_marginal_likelihood(x, &y_norm, theta[0].exp(), noise);
        let mut best_theta = 0.0;
        let mut best_value = f64::INFINITY;
        for start in 0..=n_restarts {
            let theta0 = if start == 0 {
                0.0
            } else {
                crate::rng_util::f64_range(rng, lo, hi)
            };
            let (theta, value) = nelder_mead::minimize(&objective, &[theta0], &[(lo, hi)]);
            if value < best_value {
                best_value = value;
                best_theta = theta[0];
            }
        }

        let length_scale = best_theta.exp();
        let cholesky = factor(x, length_scale, noise)?;
        let alpha = cholesky.solve(&y_norm);
        Some(Self {
            x_train: x.to_vec(),
            cholesky,
            alpha,
            length_scale,
            y_mean,
            y_std,
        })
    }

    /// The fitted length scale.
    pub(crate) fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Posterior mean and standard deviation at `x`, in target units.
    pub(crate) fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_iterator(
            self.x_train.len(),
            self.x_train.iter().map(|t| matern52(x, t, self.length_scale)),
        );
        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (1.0 - k_star.dot(&v)).max(0.0);
        (mean * self.y_std + self.y_mean, var.sqrt() * self.y_std)
    }
}
