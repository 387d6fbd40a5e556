//! Penalized Cox partial-likelihood fitting.
//!
//! Covariates are standardized before fitting (columns with a standard
//! deviation below `1e-8` are only centered). The objective on the
//! standardized scale is
//!
//! ```text
//! ℓ(β) - n · (penalizer / 2) · ‖β‖²
//! ```
//!
//! where `ℓ` is the Efron partial log-likelihood. It is maximized by
//! Newton-Raphson with step halving; the Newton system is solved with a
//! Cholesky factorization of the negated Hessian. Coefficients are reported
//! on the original covariate scale together with the Breslow estimate of the
//! baseline cumulative hazard.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use nsmp_stats::descriptive::DescriptiveStats;

use crate::model::{CoxModel, FitSummary, HazardPoint};

/// Tuning of the Newton-Raphson optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub penalizer: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the norm of the accepted Newton step.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            penalizer: 0.1,
            max_iterations: 100,
            tolerance: 1e-7,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("no observations to fit")]
    Empty,
    #[display("no events observed; the partial likelihood is undefined")]
    NoEvents,
    #[display("design matrix is {rows}x{cols} but {columns} columns, {times} times and {events} events were given")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        columns: usize,
        times: usize,
        events: usize,
    },
    #[display("non-finite value in {what}")]
    NonFinite { what: &'static str },
    #[display("Hessian is not negative definite at iteration {iteration}")]
    SingularHessian { iteration: usize },
    #[display("Newton-Raphson did not converge after {iterations} iterations (step norm {step_norm:e}, log-likelihood {log_likelihood})")]
    NotConverged {
        iterations: usize,
        step_norm: f64,
        log_likelihood: f64,
    },
}

/// Fits a penalized Cox model.
///
/// `x` holds one row per subject with columns named by `columns`. `events[i]`
/// is `true` when subject `i` had the event at `times[i]` and `false` when it
/// was censored.
#[expect(clippy::cast_precision_loss)]
pub fn fit(
    columns: Vec<String>,
    x: ArrayView2<'_, f64>,
    times: &[f64],
    events: &[bool],
    options: &FitOptions,
) -> Result<CoxModel, FitError> {
    let (n, p) = x.dim();
    if n != times.len() || n != events.len() || p != columns.len() {
        return Err(FitError::DimensionMismatch {
            rows: n,
            cols: p,
            columns: columns.len(),
            times: times.len(),
            events: events.len(),
        });
    }
    if n == 0 {
        return Err(FitError::Empty);
    }
    if !events.iter().any(|&e| e) {
        return Err(FitError::NoEvents);
    }
    if x.iter().chain(times).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite {
            what: "covariates or times",
        });
    }

    let (means, scales) = standardization(x);
    let z = (&x - &means.view().insert_axis(Axis(0))) / &scales.view().insert_axis(Axis(0));

    // descending time, ties accumulated as a group
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| times[b].total_cmp(&times[a]));
    let problem = Problem {
        z: z.select(Axis(0), &order),
        times: order.iter().map(|&i| times[i]).collect(),
        events: order.iter().map(|&i| events[i]).collect(),
        penalty: n as f64 * options.penalizer,
    };

    let (beta_std, iterations) = newton_raphson(&problem, options)?;
    let log_likelihood = problem.efron(beta_std.view()).log_likelihood;
    let coefficients = &beta_std / &scales;

    let mut model = CoxModel {
        columns,
        coefficients: coefficients.to_vec(),
        means: means.to_vec(),
        baseline_cumulative_hazard: Vec::new(),
        summary: FitSummary {
            penalizer: options.penalizer,
            log_likelihood,
            iterations,
            n_observations: n,
            n_events: events.iter().filter(|&&e| e).count(),
            held_out_concordance: None,
        },
    };
    model.baseline_cumulative_hazard = breslow(&model, x, times, events)?;
    tracing::debug!(
        iterations,
        log_likelihood,
        n_observations = n,
        "cox model converged"
    );
    Ok(model)
}

/// Column means and sample standard deviations (ddof = 1).
///
/// Near-constant columns keep a scale of 1.
fn standardization(x: ArrayView2<'_, f64>) -> (Array1<f64>, Array1<f64>) {
    let (means, scales): (Vec<f64>, Vec<f64>) = x
        .columns()
        .into_iter()
        .map(|column| {
            DescriptiveStats::new(column.iter().copied()).map_or((0.0, 1.0), |stats| {
                let scale = if stats.std_dev < 1e-8 { 1.0 } else { stats.std_dev };
                (stats.mean, scale)
            })
        })
        .unzip();
    (Array1::from(means), Array1::from(scales))
}

/// Standardized data sorted by descending time.
struct Problem {
    z: Array2<f64>,
    times: Vec<f64>,
    events: Vec<bool>,
    /// `n · penalizer`
    penalty: f64,
}

struct Efron {
    log_likelihood: f64,
    gradient: Array1<f64>,
    hessian: Array2<f64>,
}

impl Problem {
    /// Efron partial log-likelihood with its gradient and Hessian.
    #[expect(clippy::cast_precision_loss)]
    fn efron(&self, beta: ArrayView1<'_, f64>) -> Efron {
        let (n, p) = self.z.dim();
        let mut log_likelihood = 0.0;
        let mut gradient = Array1::<f64>::zeros(p);
        let mut hessian = Array2::<f64>::zeros((p, p));

        let mut risk_phi = 0.0;
        let mut risk_phi_x = Array1::<f64>::zeros(p);
        let mut risk_phi_xx = Array2::<f64>::zeros((p, p));
        let mut tie_phi = 0.0;
        let mut tie_phi_x = Array1::<f64>::zeros(p);
        let mut tie_phi_xx = Array2::<f64>::zeros((p, p));
        let mut tie_x_sum = Array1::<f64>::zeros(p);
        let mut tie_count = 0_usize;

        for i in 0..n {
            let xi = self.z.row(i);
            let eta = xi.dot(&beta);
            let phi = eta.exp();
            let xx = outer(xi);

            risk_phi += phi;
            risk_phi_x.scaled_add(phi, &xi);
            risk_phi_xx.scaled_add(phi, &xx);
            if self.events[i] {
                log_likelihood += eta;
                tie_x_sum += &xi;
                tie_phi += phi;
                tie_phi_x.scaled_add(phi, &xi);
                tie_phi_xx.scaled_add(phi, &xx);
                tie_count += 1;
            }

            let last_of_tie = i + 1 == n || self.times[i + 1] < self.times[i];
            if !last_of_tie || tie_count == 0 {
                continue;
            }

            gradient += &tie_x_sum;
            let d = tie_count as f64;
            for l in 0..tie_count {
                let frac = l as f64 / d;
                let denom = risk_phi - frac * tie_phi;
                let numer = &risk_phi_x - &(frac * &tie_phi_x);
                let a1 = &numer / denom;
                log_likelihood -= denom.ln();
                gradient -= &a1;
                let a2 = (&risk_phi_xx - &(frac * &tie_phi_xx)) / denom;
                hessian -= &(a2 - outer(a1.view()));
            }

            tie_phi = 0.0;
            tie_phi_x.fill(0.0);
            tie_phi_xx.fill(0.0);
            tie_x_sum.fill(0.0);
            tie_count = 0;
        }

        Efron {
            log_likelihood,
            gradient,
            hessian,
        }
    }

    /// Efron terms with the ridge penalty applied.
    fn penalized(&self, beta: ArrayView1<'_, f64>) -> Efron {
        let mut efron = self.efron(beta);
        efron.log_likelihood -= 0.5 * self.penalty * beta.dot(&beta);
        efron.gradient.scaled_add(-self.penalty, &beta);
        for i in 0..beta.len() {
            efron.hessian[[i, i]] -= self.penalty;
        }
        efron
    }
}

fn outer(v: ArrayView1<'_, f64>) -> Array2<f64> {
    let col = v.insert_axis(Axis(1));
    col.dot(&col.t())
}

fn newton_raphson(problem: &Problem, options: &FitOptions) -> Result<(Array1<f64>, usize), FitError> {
    let p = problem.z.ncols();
    let mut beta = Array1::<f64>::zeros(p);
    let mut current = problem.penalized(beta.view());
    let mut step_norm = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        let neg_hessian = -&current.hessian;
        let delta = cholesky_solve(&neg_hessian, &current.gradient)
            .ok_or(FitError::SingularHessian { iteration })?;
        if delta.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite {
                what: "Newton step",
            });
        }

        let mut step = 1.0;
        let (candidate, next) = loop {
            let candidate = &beta + &(step * &delta);
            let next = problem.penalized(candidate.view());
            let tolerance = 1e-12 * current.log_likelihood.abs().max(1.0);
            if next.log_likelihood.is_finite()
                && next.log_likelihood >= current.log_likelihood - tolerance
            {
                break (candidate, next);
            }
            step *= 0.5;
            if step < 1e-10 {
                return Err(FitError::NotConverged {
                    iterations: iteration,
                    step_norm,
                    log_likelihood: current.log_likelihood,
                });
            }
        };

        step_norm = step * delta.dot(&delta).sqrt();
        tracing::trace!(iteration, step, step_norm, log_likelihood = next.log_likelihood, "newton step");
        beta = candidate;
        current = next;
        if step_norm < options.tolerance {
            return Ok((beta, iteration));
        }
    }

    Err(FitError::NotConverged {
        iterations: options.max_iterations,
        step_norm,
        log_likelihood: current.log_likelihood,
    })
}

/// Solves `a · x = b` for symmetric positive-definite `a`.
///
/// Returns `None` if `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag.is_nan() || diag <= 0.0 {
            return None;
        }
        let diag = diag.sqrt();
        l[[j, j]] = diag;
        for i in j + 1..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / diag;
        }
    }

    // forward: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }
    // backward: Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in i + 1..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}

/// Breslow baseline cumulative hazard at every distinct observed time.
fn breslow(
    model: &CoxModel,
    x: ArrayView2<'_, f64>,
    times: &[f64],
    events: &[bool],
) -> Result<Vec<HazardPoint>, FitError> {
    let mut rows = x
        .rows()
        .into_iter()
        .zip(times.iter().zip(events))
        .map(|(row, (&t, &e))| {
            model
                .partial_hazard(row)
                .map(|ph| (t, e, ph))
                .map_err(|_| FitError::NonFinite {
                    what: "partial hazard",
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut at_risk: f64 = rows.iter().map(|r| r.2).sum();
    let mut cumulative = 0.0;
    let mut points = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let time_days = rows[i].0;
        let mut deaths = 0.0;
        let mut leaving = 0.0;
        while i < rows.len() && rows[i].0 <= time_days {
            if rows[i].1 {
                deaths += 1.0;
            }
            leaving += rows[i].2;
            i += 1;
        }
        cumulative += deaths / at_risk;
        at_risk -= leaving;
        points.push(HazardPoint {
            time_days,
            cumulative_hazard: cumulative,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn unpenalized() -> FitOptions {
        FitOptions {
            penalizer: 0.0,
            ..FitOptions::default()
        }
    }

    #[test]
    fn test_standardization_centers_and_scales() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let (means, scales) = standardization(x.view());
        assert_relative_eq!(means[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(scales[0], 1.0, epsilon = 1e-12);
        // constant column is only centered
        assert_relative_eq!(means[1], 5.0, epsilon = 1e-12);
        assert_relative_eq!(scales[1], 1.0, epsilon = 1e-12);

        let (means, scales) = standardization(array![[2.0, 4.0], [4.0, 8.0]].view());
        assert_relative_eq!(means[1], 6.0, epsilon = 1e-12);
        assert_relative_eq!(scales[0], 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(scales[1], 8.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
        assert!(cholesky_solve(&array![[0.0, 0.0], [0.0, 1.0]], &b).is_none());
    }

    #[test]
    fn test_two_subject_closed_form() {
        // Subject with x = 1 fails first, x = 0 is censored later.
        // The unpenalized likelihood exp(b) / (exp(b) + 1) has no maximum, but
        // the penalized one does; its stationarity condition is
        // (1 - tanh(b_std · z)) · z = n · penalizer · b_std with z = 1/√2.
        let x = array![[1.0], [0.0]];
        let options = FitOptions {
            penalizer: 0.5,
            ..FitOptions::default()
        };
        let model = fit(vec!["x".to_owned()], x.view(), &[1.0, 2.0], &[true, false], &options)
            .unwrap();
        // on the raw scale (sample std of x is 1/√2) this becomes
        // 1 - sigmoid(b) = b / 2
        let b = model.coefficients[0];
        let sigmoid = 1.0 / (1.0 + (-b).exp());
        assert_relative_eq!(1.0 - sigmoid, b / 2.0, epsilon = 1e-8);
        assert_eq!(model.means, vec![0.5]);
    }

    #[test]
    fn test_efron_ties_match_closed_form() {
        // Two tied events among three subjects with a single binary covariate:
        // x = [1, 0] fail at t = 1, x = 0 censored at t = 2. With b on the
        // raw scale, the Efron likelihood is
        //   e^b / (e^b + 2) · 1 / ((e^b + 1) / 2 + 1)
        // whose unpenalized maximum is found numerically below.
        let x = array![[1.0], [0.0], [0.0]];
        let model = fit(
            vec!["x".to_owned()],
            x.view(),
            &[1.0, 1.0, 2.0],
            &[true, true, false],
            &unpenalized(),
        )
        .unwrap();
        let loglik = |b: f64| b - (b.exp() + 2.0).ln() - ((b.exp() + 1.0) / 2.0 + 1.0).ln();
        let b = model.coefficients[0];
        let h = 1e-5;
        let derivative = (loglik(b + h) - loglik(b - h)) / (2.0 * h);
        assert_relative_eq!(derivative, 0.0, epsilon = 1e-6);
        assert_relative_eq!(model.summary.log_likelihood, loglik(b), epsilon = 1e-9);
    }

    #[test]
    fn test_breslow_baseline() {
        let x = array![[0.0], [0.0], [0.0]];
        let model = fit(
            vec!["x".to_owned()],
            x.view(),
            &[3.0, 1.0, 2.0],
            &[true, true, false],
            &FitOptions::default(),
        )
        .unwrap();
        // constant covariate: partial hazards are all 1, so Breslow reduces to
        // Nelson-Aalen
        let hazard: Vec<_> = model
            .baseline_cumulative_hazard
            .iter()
            .map(|p| (p.time_days, p.cumulative_hazard))
            .collect();
        assert_eq!(hazard.len(), 3);
        assert_relative_eq!(hazard[0].1, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(hazard[1].1, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(hazard[2].1, 1.0 / 3.0 + 1.0, epsilon = 1e-12);
        assert_eq!(model.coefficients, vec![0.0]);
    }

    #[test]
    fn test_penalizer_shrinks_coefficients() {
        let x = array![[2.0], [1.5], [1.0], [0.5], [0.0], [1.2]];
        let times = [1.0, 3.0, 2.0, 6.0, 5.0, 4.0];
        let events = [true, true, false, true, true, false];
        let loose = fit(vec!["x".to_owned()], x.view(), &times, &events, &unpenalized()).unwrap();
        let tight = fit(
            vec!["x".to_owned()],
            x.view(),
            &times,
            &events,
            &FitOptions {
                penalizer: 0.5,
                ..FitOptions::default()
            },
        )
        .unwrap();
        assert!(loose.coefficients[0] > 0.0);
        assert!(tight.coefficients[0].abs() < loose.coefficients[0].abs());
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let x = array![[1.0], [0.0]];
        assert!(matches!(
            fit(vec!["x".to_owned()], x.view(), &[1.0, 2.0], &[false, false], &FitOptions::default()),
            Err(FitError::NoEvents)
        ));
        assert!(matches!(
            fit(vec!["x".to_owned()], x.view(), &[1.0], &[true], &FitOptions::default()),
            Err(FitError::DimensionMismatch { .. })
        ));
    }
}
