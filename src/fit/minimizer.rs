//! # 加权非线性最小二乘（Levenberg–Marquardt）
//!
//! 最小化 `χ² = Σ w_i (y_i - f(x_i; p))²`。
//!
//! ## 算法概述
//! 1. 在当前参数处构造法方程 `JᵀWJ δ = JᵀW r`
//! 2. 对角阻尼 `JᵀWJ + λ·diag(JᵀWJ)`，Cholesky 求解步长
//! 3. χ² 下降则接受并减小 λ，否则增大 λ 重试
//! 4. χ² 相对下降或步长小于容差即收敛；λ 超过上限仍无法下降视为已到极小值
//!
//! 收敛后用未阻尼的 `(JᵀWJ)⁻¹` 作为参数协方差。
//!
//! ## 依赖关系
//! - 被 `fit/engine.rs` 调用
//! - 使用 `nalgebra` 求解法方程

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-12;
/// 对角元下限，避免参数完全不受约束时阻尼失效
const DIAG_FLOOR: f64 = 1e-12;

/// 可按参数向量求值的曲线模型
pub trait CurveModel {
    fn n_params(&self) -> usize;

    fn value(&self, params: &[f64], x: f64) -> f64;

    /// 对各参数的偏导，写入 `grad`（长度为 `n_params()`）
    fn gradient(&self, params: &[f64], x: f64, grad: &mut [f64]);
}

/// 带权重的数据点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

/// 最小化结果
#[derive(Debug, Clone)]
pub struct Minimum {
    pub params: Vec<f64>,
    pub chi2: f64,
    pub iterations: usize,
    /// 参数协方差；法方程奇异时为 None
    pub covariance: Option<DMatrix<f64>>,
}

impl Minimum {
    /// 参数误差 sqrt(diag(cov))
    pub fn errors(&self) -> Option<Vec<f64>> {
        self.covariance.as_ref().map(|cov| {
            (0..cov.nrows())
                .map(|i| cov[(i, i)].max(0.0).sqrt())
                .collect()
        })
    }
}

/// 最小化失败原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinimizerError {
    #[error("no data points to fit")]
    NoData,

    #[error("chi-square is not finite at the starting parameters")]
    NonFiniteSeed,

    #[error("did not converge within {iterations} iterations (chi2 = {chi2:.4e})")]
    IterationLimit { iterations: usize, chi2: f64 },

    #[error("normal equations are singular at every damping level")]
    Singular,
}

/// Levenberg–Marquardt 最小化器
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    max_iter: usize,
    tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tolerance: 1e-9,
        }
    }
}

impl LevenbergMarquardt {
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 从 `seed` 出发最小化 χ²
    pub fn minimize<M: CurveModel>(
        &self,
        model: &M,
        points: &[WeightedPoint],
        seed: &[f64],
    ) -> Result<Minimum, MinimizerError> {
        if points.is_empty() {
            return Err(MinimizerError::NoData);
        }

        let n = model.n_params();
        let mut params = seed.to_vec();
        let mut chi2 = chi_square(model, points, &params);
        if !chi2.is_finite() {
            return Err(MinimizerError::NonFiniteSeed);
        }

        let mut lambda = INITIAL_DAMPING;

        for iteration in 1..=self.max_iter {
            let (jtj, jtr) = normal_equations(model, points, &params);

            let mut accepted = false;
            let mut solved_any = false;

            while lambda <= MAX_DAMPING {
                let mut damped = jtj.clone();
                for i in 0..n {
                    damped[(i, i)] += lambda * jtj[(i, i)].max(DIAG_FLOOR);
                }

                let step = match damped.cholesky() {
                    Some(chol) => chol.solve(&jtr),
                    None => {
                        lambda *= 10.0;
                        continue;
                    }
                };
                solved_any = true;

                let trial: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
                if trial.iter().any(|p| !p.is_finite()) {
                    lambda *= 10.0;
                    continue;
                }

                let trial_chi2 = chi_square(model, points, &trial);
                if trial_chi2.is_finite() && trial_chi2 < chi2 {
                    let decrease = chi2 - trial_chi2;
                    let small_step = step
                        .iter()
                        .zip(params.iter())
                        .all(|(d, p)| d.abs() <= self.tolerance * (p.abs() + self.tolerance));

                    params = trial;
                    chi2 = trial_chi2;
                    lambda = (lambda / 10.0).max(MIN_DAMPING);
                    accepted = true;

                    if decrease <= self.tolerance * chi2 || small_step {
                        return Ok(self.finish(model, points, params, chi2, iteration));
                    }
                    break;
                }

                lambda *= 10.0;
            }

            if !accepted {
                if !solved_any {
                    return Err(MinimizerError::Singular);
                }
                // 任何阻尼下都无法继续下降：已处于极小值
                return Ok(self.finish(model, points, params, chi2, iteration));
            }
        }

        Err(MinimizerError::IterationLimit {
            iterations: self.max_iter,
            chi2,
        })
    }

    fn finish<M: CurveModel>(
        &self,
        model: &M,
        points: &[WeightedPoint],
        params: Vec<f64>,
        chi2: f64,
        iterations: usize,
    ) -> Minimum {
        let (jtj, _) = normal_equations(model, points, &params);
        let covariance = jtj.cholesky().map(|chol| chol.inverse());
        Minimum {
            params,
            chi2,
            iterations,
            covariance,
        }
    }
}

/// 加权残差平方和
pub fn chi_square<M: CurveModel>(model: &M, points: &[WeightedPoint], params: &[f64]) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = p.y - model.value(params, p.x);
            p.weight * r * r
        })
        .sum()
}

/// 构造 JᵀWJ 和 JᵀW r
fn normal_equations<M: CurveModel>(
    model: &M,
    points: &[WeightedPoint],
    params: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n = model.n_params();
    let mut jtj = DMatrix::zeros(n, n);
    let mut jtr = DVector::zeros(n);
    let mut grad = vec![0.0; n];

    for p in points {
        model.gradient(params, p.x, &mut grad);
        let r = p.y - model.value(params, p.x);
        for i in 0..n {
            let wgi = p.weight * grad[i];
            jtr[i] += wgi * r;
            for j in 0..=i {
                jtj[(i, j)] += wgi * grad[j];
            }
        }
    }

    for i in 0..n {
        for j in 0..i {
            jtj[(j, i)] = jtj[(i, j)];
        }
    }

    (jtj, jtr)
}
