//! # 峰拟合引擎
//!
//! 对每个 pT bin 的不变质量直方图执行:
//! 1. 截取拟合窗口（默认 [1.05, 1.2] GeV/c²）
//! 2. 用 Levenberg–Marquardt 拟合 本底(四次多项式) + 信号(高斯)
//! 3. 拆分为独立的本底、信号求值器
//! 4. 在整张直方图上，对信号值超过噪声阈值的 bin 累加信号和本底
//! 5. 产额 = Σ信号 - Σ本底，误差 = sqrt(Σ信号)
//!
//! 各 bin 之间没有共享状态，通过 `BatchRunner` 并行执行，
//! 结果按 pT 顺序汇总为 `YieldSpectrum`。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `fit/model.rs`, `fit/minimizer.rs`, `fit/spectrum.rs`
//! - 使用 `batch/runner.rs` 并行执行

use crate::batch::BatchRunner;
use crate::error::{Result, YieldError};
use crate::fit::minimizer::{LevenbergMarquardt, WeightedPoint};
use crate::fit::model::{CompositeShape, COMPOSITE_PARAMS};
use crate::fit::spectrum::{BinResult, BinYield, FitOutcome, PeakFit, YieldSpectrum};
use crate::models::{MassHistogram, PtSeries};

/// Λ 质量初值 (GeV/c²)
pub const LAMBDA_MASS_SEED: f64 = 1.115;
/// 高斯宽度初值 (GeV/c²)，对应探测器分辨率
pub const SIGMA_SEED: f64 = 2.22915e-3;

/// 拟合配置
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// 拟合窗口 (GeV/c²)
    pub window: (f64, f64),
    /// 信号值超过该计数的质量 bin 才计入产额
    pub noise_floor: f64,
    /// 窗口内计数低于该值视为退化
    pub min_entries: f64,
    /// 信号幅度初值；None 时取窗口内最大计数
    pub amplitude_seed: Option<f64>,
    pub mean_seed: f64,
    pub sigma_seed: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            window: (1.05, 1.2),
            noise_floor: 1.0,
            min_entries: 1.0,
            amplitude_seed: None,
            mean_seed: LAMBDA_MASS_SEED,
            sigma_seed: SIGMA_SEED,
            max_iter: 500,
            tolerance: 1e-9,
        }
    }
}

impl FitConfig {
    pub fn window(mut self, low: f64, high: f64) -> Self {
        self.window = (low, high);
        self
    }

    pub fn noise_floor(mut self, noise_floor: f64) -> Self {
        self.noise_floor = noise_floor;
        self
    }

    pub fn min_entries(mut self, min_entries: f64) -> Self {
        self.min_entries = min_entries;
        self
    }

    pub fn amplitude_seed(mut self, amplitude: Option<f64>) -> Self {
        self.amplitude_seed = amplitude;
        self
    }

    pub fn mean_seed(mut self, mean: f64) -> Self {
        self.mean_seed = mean;
        self
    }

    pub fn sigma_seed(mut self, sigma: f64) -> Self {
        self.sigma_seed = sigma;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 检查参数合法性
    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.window;
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(YieldError::InvalidRange(format!(
                "{}-{} (fit window must satisfy low < high)",
                low, high
            )));
        }
        if !self.noise_floor.is_finite() || self.noise_floor < 0.0 {
            return Err(YieldError::InvalidArgument(format!(
                "noise floor must be a non-negative number, got {}",
                self.noise_floor
            )));
        }
        if !self.min_entries.is_finite() || self.min_entries < 0.0 {
            return Err(YieldError::InvalidArgument(format!(
                "minimum entries must be a non-negative number, got {}",
                self.min_entries
            )));
        }
        if let Some(a) = self.amplitude_seed {
            if !a.is_finite() || a <= 0.0 {
                return Err(YieldError::InvalidArgument(format!(
                    "amplitude seed must be positive, got {}",
                    a
                )));
            }
        }
        if !self.mean_seed.is_finite() {
            return Err(YieldError::InvalidArgument("mean seed must be finite".to_string()));
        }
        if !self.sigma_seed.is_finite() || self.sigma_seed <= 0.0 {
            return Err(YieldError::InvalidArgument(format!(
                "sigma seed must be a positive width, got {}",
                self.sigma_seed
            )));
        }
        if self.max_iter == 0 {
            return Err(YieldError::InvalidArgument(
                "max iterations must be positive".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(YieldError::InvalidArgument(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// 峰拟合引擎
#[derive(Debug, Clone)]
pub struct PeakFitEngine {
    config: FitConfig,
}

impl PeakFitEngine {
    /// 创建引擎，配置不合法时报错
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// 并行拟合全部 pT bin
    pub fn run(&self, series: &PtSeries, runner: &BatchRunner) -> Result<YieldSpectrum> {
        let results = runner.map(series.entries(), "Fitting", |(bin, histogram)| BinResult {
            bin: *bin,
            histogram: histogram.name().to_string(),
            outcome: self.fit_histogram(histogram),
        })?;
        Ok(YieldSpectrum::from_results(results))
    }

    /// 拟合单个直方图并积分产额
    pub fn fit_histogram(&self, histogram: &MassHistogram) -> FitOutcome {
        let (low, high) = self.config.window;

        let entries = histogram.entries_in(low, high);
        if entries < self.config.min_entries || entries <= 0.0 {
            return FitOutcome::Degenerate {
                reason: format!(
                    "{} entries in fit window [{}, {}]",
                    entries, low, high
                ),
                bin_yield: BinYield::zero(),
            };
        }

        // Neyman χ²：权重 1/n，空 bin 不参与拟合
        let points: Vec<WeightedPoint> = histogram
            .window(low, high)
            .filter(|(_, count)| *count > 0.0)
            .map(|(m, count)| WeightedPoint {
                x: m,
                y: count,
                weight: 1.0 / count,
            })
            .collect();

        if points.len() <= COMPOSITE_PARAMS {
            return FitOutcome::Degenerate {
                reason: format!(
                    "only {} non-empty bins in fit window, {} parameters",
                    points.len(),
                    COMPOSITE_PARAMS
                ),
                bin_yield: BinYield::zero(),
            };
        }

        let shape = CompositeShape::for_window(low, high);
        let amplitude = self
            .config
            .amplitude_seed
            .unwrap_or_else(|| histogram.max_count_in(low, high));
        let mut seed = vec![0.0; COMPOSITE_PARAMS];
        seed[5] = amplitude;
        seed[6] = self.config.mean_seed;
        seed[7] = self.config.sigma_seed;

        let minimizer = LevenbergMarquardt::default()
            .max_iter(self.config.max_iter)
            .tolerance(self.config.tolerance);

        let minimum = match minimizer.minimize(&shape, &points, &seed) {
            Ok(m) => m,
            Err(e) => {
                return FitOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let mut model = shape.model(&minimum.params);
        model.signal = model.signal.with_positive_sigma();

        if model.signal.sigma == 0.0 || !model.signal.sigma.is_finite() {
            return FitOutcome::Failed {
                reason: "fitted Gaussian width collapsed to zero".to_string(),
            };
        }

        let signal_errors = minimum.errors().map(|e| [e[5], e[6], e[7]]);
        let fit = PeakFit {
            model,
            signal_errors,
            chi2: minimum.chi2,
            ndf: points.len() as i64 - COMPOSITE_PARAMS as i64,
            iterations: minimum.iterations,
            window: self.config.window,
        };

        let bin_yield = integrate_yield(&fit, histogram, self.config.noise_floor);
        FitOutcome::Converged { fit, bin_yield }
    }
}

/// 在整张直方图上积分产额
///
/// 只统计 `signal(m_j) > noise_floor` 的 bin：
/// `value = Σ signal - Σ background`，`uncertainty = sqrt(Σ signal)`。
pub fn integrate_yield(fit: &PeakFit, histogram: &MassHistogram, noise_floor: f64) -> BinYield {
    let (background, signal) = fit.model.decompose();

    let mut signal_sum = 0.0;
    let mut background_sum = 0.0;
    let mut bins_used = 0;

    for &m in histogram.centers() {
        let s = signal.eval(m);
        if s > noise_floor {
            signal_sum += s;
            background_sum += background.eval(m);
            bins_used += 1;
        }
    }

    BinYield {
        value: signal_sum - background_sum,
        uncertainty: signal_sum.sqrt(),
        signal_sum,
        background_sum,
        bins_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::model::{BackgroundModel, CompositeModel, SignalModel};
    use crate::models::{PtBinScheme, PtSeries};
    use std::f64::consts::PI;

    const BINS: usize = 200;
    const LOW: f64 = 1.05;
    const HIGH: f64 = 1.2;

    fn synthetic(name: &str, amplitude: f64, mean: f64, sigma: f64, flat: f64) -> MassHistogram {
        let width = (HIGH - LOW) / BINS as f64;
        let counts = (0..BINS)
            .map(|i| {
                let m = LOW + (i as f64 + 0.5) * width;
                let z = (m - mean) / sigma;
                amplitude * (-0.5 * z * z).exp() + flat
            })
            .collect();
        MassHistogram::from_range(name, LOW, HIGH, counts).unwrap()
    }

    fn converged(outcome: &FitOutcome) -> (&PeakFit, &BinYield) {
        match outcome {
            FitOutcome::Converged { fit, bin_yield } => (fit, bin_yield),
            other => panic!("expected convergence, got {:?}", other),
        }
    }

    #[test]
    fn test_recovers_generating_parameters() {
        let h = synthetic("h", 3000.0, 1.115, 0.0022, 50.0);
        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        let outcome = engine.fit_histogram(&h);
        let (fit, _) = converged(&outcome);

        let s = fit.signal();
        assert!((s.amplitude - 3000.0).abs() < 1e-3 * 3000.0, "A = {}", s.amplitude);
        assert!((s.mean - 1.115).abs() < 1e-6, "mean = {}", s.mean);
        assert!((s.sigma - 0.0022).abs() < 1e-6, "sigma = {}", s.sigma);
        assert!(s.sigma > 0.0);
        for m in [1.06, 1.1, 1.15, 1.19] {
            assert!((fit.background().eval(m) - 50.0).abs() < 0.05);
        }
        assert!(fit.chi2 < 1e-3);
        assert_eq!(fit.ndf, (BINS - COMPOSITE_PARAMS) as i64);
    }

    #[test]
    fn test_signal_sum_matches_analytic_area() {
        let h = synthetic("h", 3000.0, 1.115, 0.0022, 50.0);
        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        let outcome = engine.fit_histogram(&h);
        let (_, y) = converged(&outcome);

        let analytic = 3000.0 * 0.0022 * (2.0 * PI).sqrt() / h.bin_width();
        assert!(
            (y.signal_sum - analytic).abs() < 0.01 * analytic,
            "signal sum {} vs analytic {}",
            y.signal_sum,
            analytic
        );
        assert!((y.value - (y.signal_sum - y.background_sum)).abs() < 1e-9);
        assert!((y.uncertainty - y.signal_sum.sqrt()).abs() < 1e-9);
        // 阈值为 1 时约 23 个 bin 的 50 计数本底被扣除
        assert!(y.bins_used >= 21 && y.bins_used <= 25, "bins used {}", y.bins_used);
        assert!((y.background_sum - 50.0 * y.bins_used as f64).abs() < 1.0);

        // 扣除窗口内的平坦本底后，产额比解析面积低约 5%
        let rel = (y.value - analytic) / analytic;
        assert!(
            (-0.06..=-0.04).contains(&rel),
            "yield {} vs analytic {} (relative {:.4})",
            y.value,
            analytic,
            rel
        );
    }

    #[test]
    fn test_yield_within_five_percent_at_background_level_floor() {
        let h = synthetic("h", 3000.0, 1.115, 0.0022, 50.0);
        let engine = PeakFitEngine::new(FitConfig::default().noise_floor(50.0)).unwrap();
        let outcome = engine.fit_histogram(&h);
        let (_, y) = converged(&outcome);

        let analytic = 3000.0 * 0.0022 * (2.0 * PI).sqrt() / h.bin_width();
        assert!(
            (y.value - analytic).abs() < 0.05 * analytic,
            "yield {} vs analytic {}",
            y.value,
            analytic
        );
    }

    #[test]
    fn test_all_zero_histogram_is_degenerate() {
        let h = MassHistogram::from_range("empty", LOW, HIGH, vec![0.0; BINS]).unwrap();
        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        match engine.fit_histogram(&h) {
            FitOutcome::Degenerate { bin_yield, .. } => {
                assert_eq!(bin_yield.value, 0.0);
                assert_eq!(bin_yield.uncertainty, 0.0);
            }
            other => panic!("expected degenerate, got {:?}", other),
        }
    }

    #[test]
    fn test_sparse_histogram_is_degenerate() {
        let mut counts = vec![0.0; BINS];
        counts[100] = 3.0;
        counts[101] = 1.0;
        let h = MassHistogram::from_range("sparse", LOW, HIGH, counts).unwrap();
        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        let outcome = engine.fit_histogram(&h);
        assert_eq!(outcome.status(), "degenerate");
        assert!(outcome.message().contains("non-empty bins"));
    }

    #[test]
    fn test_iteration_limit_is_failure_not_zero_yield() {
        let h = synthetic("h", 3000.0, 1.115, 0.0022, 50.0);
        let engine =
            PeakFitEngine::new(FitConfig::default().max_iter(1).tolerance(0.0)).unwrap();
        let outcome = engine.fit_histogram(&h);
        assert!(outcome.is_failed(), "got {:?}", outcome);
        assert!(outcome.bin_yield().is_none());
    }

    #[test]
    fn test_raising_noise_floor_never_increases_signal_sum() {
        let h = synthetic("h", 1200.0, 1.116, 0.0025, 80.0);
        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        let outcome = engine.fit_histogram(&h);
        let (fit, _) = converged(&outcome);

        let mut previous = f64::INFINITY;
        for floor in [0.0, 0.5, 1.0, 5.0, 20.0, 100.0, 500.0, 1199.0, 5000.0] {
            let y = integrate_yield(fit, &h, floor);
            assert!(y.signal_sum <= previous);
            previous = y.signal_sum;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_integration_clamps_negative_background() {
        let h = synthetic("h", 100.0, 1.115, 0.003, 0.0);
        let fit = PeakFit {
            model: CompositeModel::new(
                // 在整个质量范围内为负
                BackgroundModel::from_power_coefficients([0.0, 0.0, 0.0, 0.0, -10.0]),
                SignalModel::new(100.0, 1.115, 0.003),
            ),
            signal_errors: None,
            chi2: 0.0,
            ndf: 1,
            iterations: 1,
            window: (LOW, HIGH),
        };
        let y = integrate_yield(&fit, &h, 1.0);
        assert_eq!(y.background_sum, 0.0);
        assert_eq!(y.value, y.signal_sum);
    }

    #[test]
    fn test_run_is_idempotent_and_order_independent() {
        let scheme = PtBinScheme::default();
        let bins = scheme.bins();
        let shapes = [
            (3000.0, 1.115, 0.0022, 50.0),
            (800.0, 1.1157, 0.0019, 20.0),
            (0.0, 1.115, 0.002, 0.0),
            (1500.0, 1.1152, 0.0028, 120.0),
        ];
        let entries: Vec<_> = shapes
            .iter()
            .zip(bins.iter())
            .map(|(&(a, m, s, f), bin)| (*bin, synthetic(&scheme.histogram_name(bin), a, m, s, f)))
            .collect();
        let mut reversed = entries.clone();
        reversed.reverse();

        let engine = PeakFitEngine::new(FitConfig::default()).unwrap();
        let runner = BatchRunner::new(2).quiet();

        let first = engine.run(&PtSeries::new(entries.clone()).unwrap(), &runner).unwrap();
        let second = engine.run(&PtSeries::new(entries).unwrap(), &runner).unwrap();
        let permuted = engine.run(&PtSeries::new(reversed).unwrap(), &runner).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, permuted);
        assert_eq!(first.results()[2].outcome.status(), "degenerate");
        assert_eq!(first.summary().converged, 3);
    }

    #[test]
    fn test_config_validation() {
        assert!(FitConfig::default().window(1.2, 1.05).validate().is_err());
        assert!(FitConfig::default().sigma_seed(-2.2e-3).validate().is_err());
        assert!(FitConfig::default().noise_floor(-1.0).validate().is_err());
        assert!(FitConfig::default().amplitude_seed(Some(0.0)).validate().is_err());
        assert!(FitConfig::default().validate().is_ok());
    }
}
