//! RBF-kernel C-support vector classification.
//!
//! Multiclass problems are split one-vs-one; each pair is solved with SMO using
//! maximal-violating-pair working set selection. Hard predictions are decided by
//! pairwise voting. With `probability` enabled, a Platt sigmoid is fit to each
//! pair's decision values and the pairwise estimates are coupled into one
//! distribution per row.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{Classifier, check_query, check_training_data, encode_labels};
use crate::config::SvmConfig;
use crate::error::MlError;

/// Pairwise probabilities are clipped away from 0/1 before coupling.
const MIN_PROB: f64 = 1e-7;
const TAU: f64 = 1e-12;

/// Sigmoid `P(y = +1 | f) = 1 / (1 + exp(a * f + b))`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Platt {
    a: f64,
    b: f64,
}

impl Platt {
    fn predict(&self, decision: f64) -> f64 {
        let f = decision * self.a + self.b;
        if f >= 0.0 {
            (-f).exp() / (1.0 + (-f).exp())
        } else {
            1.0 / (1.0 + f.exp())
        }
    }
}

/// One binary machine separating class `pos` (+1) from class `neg` (-1).
#[derive(Debug, Clone)]
struct BinaryMachine {
    pos: usize,
    neg: usize,
    /// (training row, alpha_i * y_i) for every support vector.
    support: Vec<(usize, f64)>,
    rho: f64,
    platt: Option<Platt>,
}

impl BinaryMachine {
    fn decision(&self, kernel_row: &[f64]) -> f64 {
        self.support
            .iter()
            .map(|&(i, coef)| coef * kernel_row[i])
            .sum::<f64>()
            - self.rho
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<usize>,
    x: Array2<f64>,
    gamma: f64,
    machines: Vec<BinaryMachine>,
}

impl Fitted {
    fn kernel_row(&self, query: ArrayView1<f64>) -> Vec<f64> {
        self.x
            .axis_iter(Axis(0))
            .map(|train| rbf(self.gamma, train, query))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SupportVectorClassifier {
    config: SvmConfig,
    fitted: Option<Fitted>,
}

fn rbf(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let d2: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * d2).exp()
}

impl SupportVectorClassifier {
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Number of support vectors across all pairwise machines.
    pub fn n_support(&self) -> usize {
        self.fitted
            .as_ref()
            .map(|f| f.machines.iter().map(|m| m.support.len()).sum())
            .unwrap_or(0)
    }

    fn fitted(&self) -> Result<&Fitted, MlError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| MlError::model("SupportVectorClassifier used before fit"))
    }

    /// `gamma = "scale"`: 1 / (n_features * variance of all entries).
    fn resolve_gamma(&self, x: &ArrayView2<f64>) -> f64 {
        if let Some(g) = self.config.gamma {
            return g;
        }
        let var = x.iter().copied().collect::<Array1<f64>>().var(0.0);
        if var > 0.0 {
            1.0 / (x.ncols() as f64 * var)
        } else {
            1.0
        }
    }

    /// Solve one binary sub-problem over `rows` of the shared kernel matrix.
    fn train_pair(
        &self,
        kernel: &Array2<f64>,
        rows: &[usize],
        signs: &[f64],
    ) -> (Vec<f64>, f64) {
        let n = rows.len();
        let c = self.config.c;
        let q = |a: usize, b: usize| signs[a] * signs[b] * kernel[[rows[a], rows[b]]];

        let mut alpha = vec![0.0; n];
        let mut grad = vec![-1.0; n];

        let in_up = |t: usize, alpha: &[f64]| {
            (signs[t] > 0.0 && alpha[t] < c) || (signs[t] < 0.0 && alpha[t] > 0.0)
        };
        let in_low = |t: usize, alpha: &[f64]| {
            (signs[t] > 0.0 && alpha[t] > 0.0) || (signs[t] < 0.0 && alpha[t] < c)
        };

        let mut iterations = 0;
        while iterations < self.config.max_iter {
            iterations += 1;

            let mut i = None;
            let mut g_max = f64::NEG_INFINITY;
            let mut j = None;
            let mut g_min = f64::INFINITY;
            for t in 0..n {
                let v = -signs[t] * grad[t];
                if in_up(t, &alpha) && v > g_max {
                    g_max = v;
                    i = Some(t);
                }
                if in_low(t, &alpha) && v < g_min {
                    g_min = v;
                    j = Some(t);
                }
            }
            let (Some(i), Some(j)) = (i, j) else { break };
            if g_max - g_min < self.config.tol {
                break;
            }

            let old_i = alpha[i];
            let old_j = alpha[j];
            let mut quad = q(i, i) + q(j, j) - 2.0 * signs[i] * signs[j] * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }

            if signs[i] != signs[j] {
                let delta = (-grad[i] - grad[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;
                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let delta = (grad[i] - grad[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;
                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                } else if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if sum > c {
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }

            let d_i = alpha[i] - old_i;
            let d_j = alpha[j] - old_j;
            for t in 0..n {
                grad[t] += q(t, i) * d_i + q(t, j) * d_j;
            }
        }

        if iterations >= self.config.max_iter {
            tracing::warn!(iterations, "SVM solver hit max_iter before converging");
        }

        let rho = compute_rho(&alpha, &grad, signs, c);
        (alpha, rho)
    }
}

/// Bias term: mean of `y * grad` over free vectors, else the midpoint of the feasible interval.
fn compute_rho(alpha: &[f64], grad: &[f64], signs: &[f64], c: f64) -> f64 {
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    let mut free = 0usize;
    let mut sum_free = 0.0;
    for t in 0..alpha.len() {
        let yg = signs[t] * grad[t];
        if alpha[t] >= c {
            if signs[t] < 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if signs[t] > 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else {
            free += 1;
            sum_free += yg;
        }
    }
    if free > 0 {
        sum_free / free as f64
    } else {
        (ub + lb) / 2.0
    }
}

/// Fit a Platt sigmoid to decision values with Newton's method and backtracking.
fn fit_platt(decisions: &[f64], signs: &[f64]) -> Platt {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = signs.iter().filter(|&&s| s > 0.0).count() as f64;
    let prior0 = signs.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = signs
        .iter()
        .map(|&s| if s > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let z = f * a + b;
                if z >= 0.0 {
                    t * z + (1.0 + (-z).exp()).ln()
                } else {
                    (t - 1.0) * z + (1.0 + z.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in decisions.iter().zip(&targets) {
            let z = f * a + b;
            let (p, q) = if z >= 0.0 {
                ((-z).exp() / (1.0 + (-z).exp()), 1.0 / (1.0 + (-z).exp()))
            } else {
                (1.0 / (1.0 + z.exp()), z.exp() / (1.0 + z.exp()))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (na, nb) = (a + step * da, b + step * db);
            let nf = objective(na, nb);
            if nf < fval + 1e-4 * step * gd {
                a = na;
                b = nb;
                fval = nf;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            break;
        }
    }

    Platt { a, b }
}

/// Couple pairwise estimates `r[i][j] = P(i | i or j)` into one distribution.
fn couple_pairwise(r: &Array2<f64>) -> Vec<f64> {
    let k = r.nrows();
    let mut qm = Array2::<f64>::zeros((k, k));
    for t in 0..k {
        for j in 0..k {
            if j != t {
                qm[[t, t]] += r[[j, t]] * r[[j, t]];
                qm[[t, j]] = -r[[j, t]] * r[[t, j]];
            }
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];
    let eps = 0.005 / k as f64;
    for _ in 0..k.max(100) {
        let mut pqp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| qm[[t, j]] * p[j]).sum();
            pqp += p[t] * qp[t];
        }
        let max_error = qp
            .iter()
            .fold(0.0f64, |m, &v| m.max((v - pqp).abs()));
        if max_error < eps {
            break;
        }
        for t in 0..k {
            let diff = (-qp[t] + pqp) / qm[[t, t]];
            p[t] += diff;
            pqp = (pqp + diff * (diff * qm[[t, t]] + 2.0 * qp[t])) / ((1.0 + diff) * (1.0 + diff));
            for j in 0..k {
                qp[j] = (qp[j] + diff * qm[[t, j]]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }

    let total: f64 = p.iter().sum();
    p.iter().map(|v| (v / total).clamp(0.0, 1.0)).collect()
}

impl Classifier for SupportVectorClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError> {
        let classes = check_training_data(&x, &y)?;
        let encoded = encode_labels(&y, &classes);
        let gamma = self.resolve_gamma(&x);
        let n = x.nrows();

        let kernel = Array2::from_shape_fn((n, n), |(a, b)| rbf(gamma, x.row(a), x.row(b)));

        let k = classes.len();
        let mut machines = Vec::with_capacity(k * (k - 1) / 2);
        for pos in 0..k {
            for neg in (pos + 1)..k {
                let rows: Vec<usize> = (0..n)
                    .filter(|&i| encoded[i] == pos || encoded[i] == neg)
                    .collect();
                let signs: Vec<f64> = rows
                    .iter()
                    .map(|&i| if encoded[i] == pos { 1.0 } else { -1.0 })
                    .collect();

                let (alpha, rho) = self.train_pair(&kernel, &rows, &signs);
                let support: Vec<(usize, f64)> = rows
                    .iter()
                    .zip(alpha.iter().zip(&signs))
                    .filter(|&(_, (&a, _))| a > 0.0)
                    .map(|(&row, (&a, &s))| (row, a * s))
                    .collect();

                let mut machine = BinaryMachine {
                    pos,
                    neg,
                    support,
                    rho,
                    platt: None,
                };
                if self.config.probability {
                    let decisions: Vec<f64> = rows
                        .iter()
                        .map(|&i| machine.decision(&kernel.row(i).to_vec()))
                        .collect();
                    machine.platt = Some(fit_platt(&decisions, &signs));
                }
                machines.push(machine);
            }
        }

        tracing::debug!(
            gamma,
            machines = machines.len(),
            support_vectors = machines.iter().map(|m| m.support.len()).sum::<usize>(),
            "SVM fit"
        );

        self.fitted = Some(Fitted {
            classes,
            x: x.to_owned(),
            gamma,
            machines,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.x.ncols())?;
        let k = fitted.classes.len();
        Ok(x.axis_iter(Axis(0))
            .map(|query| {
                let kr = fitted.kernel_row(query);
                let mut votes = vec![0usize; k];
                for m in &fitted.machines {
                    if m.decision(&kr) > 0.0 {
                        votes[m.pos] += 1;
                    } else {
                        votes[m.neg] += 1;
                    }
                }
                let mut best = 0;
                for (c, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = c;
                    }
                }
                fitted.classes[best]
            })
            .collect())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        if !self.config.probability {
            return Err(MlError::config(
                "predict_proba requires an SVM fit with probability = true",
            ));
        }
        let fitted = self.fitted()?;
        check_query(&x, fitted.x.ncols())?;
        let k = fitted.classes.len();
        let mut out = Array2::zeros((x.nrows(), k));
        let mut pairwise = Array2::<f64>::zeros((k, k));

        for (row, query) in x.axis_iter(Axis(0)).enumerate() {
            let kr = fitted.kernel_row(query);
            for m in &fitted.machines {
                let p = m
                    .platt
                    .map(|s| s.predict(m.decision(&kr)))
                    .unwrap_or(0.5)
                    .clamp(MIN_PROB, 1.0 - MIN_PROB);
                pairwise[[m.pos, m.neg]] = p;
                pairwise[[m.neg, m.pos]] = 1.0 - p;
            }
            if k == 2 {
                out[[row, 0]] = pairwise[[0, 1]];
                out[[row, 1]] = 1.0 - pairwise[[0, 1]];
            } else {
                for (c, p) in couple_pairwise(&pairwise).into_iter().enumerate() {
                    out[[row, c]] = p;
                }
            }
        }
        Ok(out)
    }

    fn supports_proba(&self) -> bool {
        self.config.probability
    }

    fn classes(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.x.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_blobs() -> (Array2<f64>, Array1<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.3, 0.1],
            [0.1, 0.4],
            [-0.2, 0.2],
            [3.0, 3.0],
            [3.2, 2.8],
            [2.9, 3.3],
            [3.1, 3.1],
            [0.0, 3.0],
            [0.2, 3.3],
            [-0.1, 2.8],
            [0.3, 3.1],
        ];
        (x, array![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2])
    }

    #[test]
    fn test_fits_three_blobs() {
        let (x, y) = three_blobs();
        let mut model = SupportVectorClassifier::new(SvmConfig::default());
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
        assert!(model.n_support() > 0);

        let p = model.predict_proba(x.view()).unwrap();
        for row in p.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_probability_disabled() {
        let (x, y) = three_blobs();
        let mut model = SupportVectorClassifier::new(SvmConfig {
            probability: false,
            ..SvmConfig::default()
        });
        model.fit(x.view(), y.view()).unwrap();
        assert!(!model.supports_proba());
        assert!(model.predict(x.view()).is_ok());
        assert!(model.predict_proba(x.view()).unwrap_err().is_config());
    }

    #[test]
    fn test_rho() {
        // No free vectors: midpoint of the feasible interval.
        let rho = compute_rho(&[0.0, 0.0], &[-1.0, -1.0], &[1.0, -1.0], 1.0);
        assert!(rho.abs() < 1e-12);
        // Free vectors: mean of y * grad.
        let rho = compute_rho(&[0.5, 0.5], &[-0.2, 0.4], &[1.0, -1.0], 1.0);
        assert!((rho + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_train_pair_symmetric() {
        let x = array![[-1.0], [1.0]];
        let kernel = Array2::from_shape_fn((2, 2), |(a, b)| rbf(1.0, x.row(a), x.row(b)));
        let model = SupportVectorClassifier::new(SvmConfig::default());
        let (alpha, rho) = model.train_pair(&kernel, &[0, 1], &[1.0, -1.0]);
        assert_eq!(alpha.len(), 2);
        assert!((alpha[0] - alpha[1]).abs() < 1e-12);
        assert!(alpha[0] > 0.0);
        assert!(rho.abs() < 1e-9);
    }

    #[test]
    fn test_platt_is_monotone() {
        let decisions = [-2.0, -1.5, -1.0, 1.0, 1.5, 2.0];
        let signs = [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        let platt = fit_platt(&decisions, &signs);
        assert!(platt.a < 0.0);
        assert!(platt.predict(2.0) > platt.predict(0.0));
        assert!(platt.predict(0.0) > platt.predict(-2.0));
    }

    #[test]
    fn test_coupling_uniform() {
        let r = Array2::from_elem((3, 3), 0.5);
        let p = couple_pairwise(&r);
        for v in p {
            assert!((v - 1.0 / 3.0).abs() < 1e-6);
        }
    }
}
