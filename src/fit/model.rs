//! # 拟合函数模型
//!
//! 复合模型 = 四次多项式本底（负值截断为 0）+ 单高斯信号。
//!
//! ```text
//! background(m) = max(0, b0·m⁴ + b1·m³ + b2·m² + b3·m + b4)
//! signal(m)     = A · exp(-(m - μ)² / (2σ²))
//! composite(m)  = background(m) + signal(m)
//! ```
//!
//! 拟合完成后本底和信号是两个互不依赖的求值器，
//! 可以单独在任意质量点求值。
//!
//! 本底多项式在内部以归一化变量 `t = (m - center) / scale` 表示：
//! 在 [1.05, 1.2] 这样窄的窗口里直接用 m 的幂次做基底，法方程几乎奇异。
//! 对外报告的 b0..b4 由归一化系数精确换算得到。
//!
//! ## 依赖关系
//! - 被 `fit/minimizer.rs`（通过 `CompositeShape`）和 `fit/engine.rs` 使用
//! - 无外部模块依赖

use std::f64::consts::PI;

/// 本底参数个数
pub const BACKGROUND_PARAMS: usize = 5;
/// 信号参数个数
pub const SIGNAL_PARAMS: usize = 3;
/// 复合模型参数个数
pub const COMPOSITE_PARAMS: usize = BACKGROUND_PARAMS + SIGNAL_PARAMS;

/// 二项式系数 C(n, k)，n <= 4
fn binomial(n: usize, k: usize) -> f64 {
    const TABLE: [[f64; 5]; 5] = [
        [1.0, 0.0, 0.0, 0.0, 0.0],
        [1.0, 1.0, 0.0, 0.0, 0.0],
        [1.0, 2.0, 1.0, 0.0, 0.0],
        [1.0, 3.0, 3.0, 1.0, 0.0],
        [1.0, 4.0, 6.0, 4.0, 1.0],
    ];
    TABLE[n][k]
}

/// 四次多项式本底，负值截断为 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundModel {
    /// 归一化系数，`coeffs[k]` 乘以 `t^k`
    coeffs: [f64; BACKGROUND_PARAMS],
    center: f64,
    scale: f64,
}

impl BackgroundModel {
    /// 以归一化系数创建
    pub fn new(coeffs: [f64; BACKGROUND_PARAMS], center: f64, scale: f64) -> Self {
        BackgroundModel {
            coeffs,
            center,
            scale,
        }
    }

    /// 换算为幂次系数 `[b0, b1, b2, b3, b4]`，b0 乘 m⁴
    pub fn power_coefficients(&self) -> [f64; BACKGROUND_PARAMS] {
        // t^k = Σ_j C(k, j) m^j (-c)^(k-j) / s^k
        let mut p = [0.0; BACKGROUND_PARAMS];
        for (k, a) in self.coeffs.iter().enumerate() {
            let norm = self.scale.powi(k as i32);
            for (j, pj) in p.iter_mut().enumerate().take(k + 1) {
                *pj += a * binomial(k, j) * (-self.center).powi((k - j) as i32) / norm;
            }
        }
        [p[4], p[3], p[2], p[1], p[0]]
    }

    /// 归一化变量
    pub fn normalized(&self, m: f64) -> f64 {
        (m - self.center) / self.scale
    }

    /// 未截断的多项式值
    pub fn raw(&self, m: f64) -> f64 {
        let t = self.normalized(m);
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// 本底值，永不为负
    pub fn eval(&self, m: f64) -> f64 {
        let value = self.raw(m);
        if value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

/// 高斯信号峰
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalModel {
    /// 峰高（每个 bin 的计数）
    pub amplitude: f64,
    /// 峰位 (GeV/c²)
    pub mean: f64,
    /// 宽度 (GeV/c²)
    pub sigma: f64,
}

impl SignalModel {
    pub fn new(amplitude: f64, mean: f64, sigma: f64) -> Self {
        SignalModel {
            amplitude,
            mean,
            sigma,
        }
    }

    pub fn eval(&self, m: f64) -> f64 {
        if self.sigma == 0.0 {
            return 0.0;
        }
        let z = (m - self.mean) / self.sigma;
        self.amplitude * (-0.5 * z * z).exp()
    }

    /// 模型只依赖 σ²，统一为正宽度
    pub fn with_positive_sigma(self) -> Self {
        Self {
            sigma: self.sigma.abs(),
            ..self
        }
    }

    /// 峰面积（质量单位 × 计数）
    pub fn area(&self) -> f64 {
        self.amplitude * self.sigma.abs() * (2.0 * PI).sqrt()
    }

    /// 半高全宽
    pub fn fwhm(&self) -> f64 {
        2.0 * (2.0 * 2.0_f64.ln()).sqrt() * self.sigma.abs()
    }
}

/// 复合模型：本底 + 信号
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeModel {
    pub background: BackgroundModel,
    pub signal: SignalModel,
}

impl CompositeModel {
    pub fn new(background: BackgroundModel, signal: SignalModel) -> Self {
        CompositeModel { background, signal }
    }

    pub fn eval(&self, m: f64) -> f64 {
        self.background.eval(m) + self.signal.eval(m)
    }

    /// 拟合收敛后拆分为两个独立求值器
    pub fn decompose(&self) -> (BackgroundModel, SignalModel) {
        (self.background, self.signal)
    }
}

/// 固定归一化的复合模型形状，供最小化器按参数向量求值
///
/// 参数顺序: `[a0, a1, a2, a3, a4, A, μ, σ]`，`a_k` 为归一化本底系数。
#[derive(Debug, Clone, Copy)]
pub struct CompositeShape {
    pub center: f64,
    pub scale: f64,
}

impl CompositeShape {
    /// 以拟合窗口的中心和半宽作为归一化
    pub fn for_window(low: f64, high: f64) -> Self {
        CompositeShape {
            center: 0.5 * (low + high),
            scale: 0.5 * (high - low),
        }
    }

    /// 参数向量 → 模型
    pub fn model(&self, params: &[f64]) -> CompositeModel {
        let mut coeffs = [0.0; BACKGROUND_PARAMS];
        coeffs.copy_from_slice(&params[..BACKGROUND_PARAMS]);
        CompositeModel::new(
            BackgroundModel::new(coeffs, self.center, self.scale),
            SignalModel::new(params[5], params[6], params[7]),
        )
    }
}

impl super::minimizer::CurveModel for CompositeShape {
    fn n_params(&self) -> usize {
        COMPOSITE_PARAMS
    }

    fn value(&self, params: &[f64], x: f64) -> f64 {
        self.model(params).eval(x)
    }

    fn gradient(&self, params: &[f64], x: f64, grad: &mut [f64]) {
        let t = (x - self.center) / self.scale;
        let bg = self.model(params).background;

        // 截断处取次梯度：raw = 0（包括全零初值）时保留多项式导数
        if bg.raw(x) >= 0.0 {
            let mut power = 1.0;
            for g in grad.iter_mut().take(BACKGROUND_PARAMS) {
                *g = power;
                power *= t;
            }
        } else {
            grad[..BACKGROUND_PARAMS].fill(0.0);
        }

        let (amplitude, mean, sigma) = (params[5], params[6], params[7]);
        if sigma == 0.0 {
            grad[5..].fill(0.0);
            return;
        }
        let d = x - mean;
        let e = (-0.5 * d * d / (sigma * sigma)).exp();
        grad[5] = e;
        grad[6] = amplitude * e * d / (sigma * sigma);
        grad[7] = amplitude * e * d * d / (sigma * sigma * sigma);
    }
}

#[cfg(test)]
impl BackgroundModel {
    /// 从幂次系数 `[b0, b1, b2, b3, b4]`（b0 乘 m⁴）创建
    pub fn from_power_coefficients(b: [f64; BACKGROUND_PARAMS]) -> Self {
        Self::new([b[4], b[3], b[2], b[1], b[0]], 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::minimizer::CurveModel;

    #[test]
    fn test_background_clamped_to_zero() {
        // m² - 1.2 在 m < 1.0954 处为负
        let bg = BackgroundModel::from_power_coefficients([0.0, 0.0, 1.0, 0.0, -1.2]);
        for i in 0..100 {
            let m = 1.0 + 0.002 * i as f64;
            let value = bg.eval(m);
            assert!(value >= 0.0);
            if bg.raw(m) < 0.0 {
                assert_eq!(value, 0.0);
            } else {
                assert!((value - bg.raw(m)).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_power_coefficients_match_normalized_polynomial() {
        let bg = BackgroundModel::new([40.0, -5.0, 3.0, 1.0, -0.5], 1.125, 0.075);
        let b = bg.power_coefficients();
        for m in [1.05, 1.1, 1.115, 1.15, 1.2] {
            let direct = b.iter().fold(0.0, |acc, c| acc * m + c);
            assert!(
                (direct - bg.raw(m)).abs() < 1e-6 * bg.raw(m).abs().max(1.0),
                "m = {}: {} vs {}",
                m,
                direct,
                bg.raw(m)
            );
        }
        let plain = BackgroundModel::from_power_coefficients(b);
        assert!((plain.raw(1.13) - bg.raw(1.13)).abs() < 1e-6);
    }

    #[test]
    fn test_signal_shape() {
        let s = SignalModel::new(3000.0, 1.115, 0.0022);
        assert!((s.eval(1.115) - 3000.0).abs() < 1e-9);
        let one_sigma = s.eval(1.115 + 0.0022);
        assert!((one_sigma - 3000.0 * (-0.5_f64).exp()).abs() < 1e-9);
        // 负 σ 给出相同的形状
        let mirrored = SignalModel::new(3000.0, 1.115, -0.0022);
        assert!((mirrored.eval(1.118) - s.eval(1.118)).abs() < 1e-12);
        assert!((mirrored.with_positive_sigma().sigma - 0.0022).abs() < 1e-15);
        assert!((s.area() - 3000.0 * 0.0022 * (2.0 * PI).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_shape_gradient_matches_finite_difference() {
        let shape = CompositeShape::for_window(1.05, 1.2);
        let params = [40.0, -5.0, 3.0, 1.0, -0.5, 2500.0, 1.1156, 0.0025];
        let x = 1.117;
        let mut grad = [0.0; COMPOSITE_PARAMS];
        shape.gradient(&params, x, &mut grad);

        for i in 0..COMPOSITE_PARAMS {
            let h = 1e-6 * params[i].abs().max(1e-3);
            let mut plus = params;
            let mut minus = params;
            plus[i] += h;
            minus[i] -= h;
            let numeric = (shape.value(&plus, x) - shape.value(&minus, x)) / (2.0 * h);
            let tol = 1e-5 * numeric.abs().max(1.0);
            assert!(
                (numeric - grad[i]).abs() < tol,
                "param {}: analytic {} vs numeric {}",
                i,
                grad[i],
                numeric
            );
        }
    }
}
