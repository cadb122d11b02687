//! Bounded Nelder-Mead simplex minimization.
//!
//! Points are clamped into the box before every evaluation, so the
//! objective never sees an out-of-bounds argument.

const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;
const X_TOL: f64 = 1e-4;
const F_TOL: f64 = 1e-4;

fn clamp_into(x: &mut [f64], bounds: &[(f64, f64)]) {
    for (v, &(lo, hi)) in x.iter_mut().zip(bounds) {
        *v = v.clamp(lo, hi);
    }
}

/// Minimizes `f` starting from `x0` inside `bounds`.
///
/// Returns the best point found and its value. NaN values are treated as
/// `+inf`. Stops after `200 * dim` iterations or when both the simplex and
/// its values have collapsed below the tolerances.
pub(crate) fn minimize(
    mut f: impl FnMut(&[f64]) -> f64,
    x0: &[f64],
    bounds: &[(f64, f64)],
) -> (Vec<f64>, f64) {
    let n = x0.len();
    let mut eval = |x: &mut Vec<f64>| {
        clamp_into(x, bounds);
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let mut start = x0.to_vec();
    if n == 0 {
        let v = eval(&mut start);
        return (start, v);
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let v0 = eval(&mut start);
    simplex.push((start.clone(), v0));
    for i in 0..n {
        let mut p = start.clone();
        p[i] = if p[i] == 0.0 { 0.000_25 } else { p[i] * 1.05 };
        if (p[i] - start[i]).abs() < f64::EPSILON || p[i] > bounds[i].1 {
            p[i] = start[i] - (bounds[i].1 - bounds[i].0) * 0.05;
        }
        let v = eval(&mut p);
        simplex.push((p, v));
    }

    for _ in 0..200 * n {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = simplex[0].1;
        let worst = simplex[n].1;
        let spread = simplex[1..]
            .iter()
            .flat_map(|(p, _)| p.iter().zip(&simplex[0].0).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if spread <= X_TOL && (worst - best).abs() <= F_TOL {
            break;
        }

        #[allow(clippy::cast_precision_loss)]
        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(p, _)| p[j]).sum::<f64>() / n as f64)
            .collect();
        let towards = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n].0)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let mut reflected = towards(ALPHA);
        let fr = eval(&mut reflected);
        if fr < simplex[n - 1].1 && fr >= best {
            simplex[n] = (reflected, fr);
            continue;
        }
        if fr < best {
            let mut expanded = towards(GAMMA);
            let fe = eval(&mut expanded);
            simplex[n] = if fe < fr { (expanded, fe) } else { (reflected, fr) };
            continue;
        }
        let mut contracted = towards(-RHO);
        let fc = eval(&mut contracted);
        if fc < worst {
            simplex[n] = (contracted, fc);
            continue;
        }
        let anchor = simplex[0].0.clone();
        for (p, v) in &mut simplex[1..] {
            for (pj, aj) in p.iter_mut().zip(&anchor) {
                *pj = aj + SIGMA * (*pj - aj);
            }
            *v = eval(p);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    simplex.swap_remove(0)
}
