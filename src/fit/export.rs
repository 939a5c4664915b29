//! # 产额谱数据导出
//!
//! ## 支持格式
//! - 产额谱 CSV：每个 pT bin 一行，包含状态、产额、误差和拟合参数
//! - 曲线 CSV：每个收敛 bin 的复合/本底/信号函数在拟合窗口上的采样
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `fit/spectrum.rs` 的 YieldSpectrum
//! - 使用 `csv` + `serde` 写入记录

use crate::error::{Result, YieldError};
use crate::fit::spectrum::{BinResult, YieldSpectrum};

use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// 曲线采样点数
pub const CURVE_SAMPLES: usize = 300;

/// 产额谱 CSV 的一行
#[derive(Debug, Serialize)]
struct SpectrumRecord {
    pt_bin: usize,
    histogram: String,
    pt_low: f64,
    pt_high: f64,
    pt_center: f64,
    status: &'static str,
    #[serde(rename = "yield")]
    value: Option<f64>,
    uncertainty: Option<f64>,
    signal_sum: Option<f64>,
    background_sum: Option<f64>,
    bins_used: Option<usize>,
    chi2: Option<f64>,
    ndf: Option<i64>,
    iterations: Option<usize>,
    amplitude: Option<f64>,
    amplitude_err: Option<f64>,
    mean: Option<f64>,
    mean_err: Option<f64>,
    sigma: Option<f64>,
    sigma_err: Option<f64>,
    b0: Option<f64>,
    b1: Option<f64>,
    b2: Option<f64>,
    b3: Option<f64>,
    b4: Option<f64>,
    message: String,
}

impl From<&BinResult> for SpectrumRecord {
    fn from(result: &BinResult) -> Self {
        let bin_yield = result.outcome.bin_yield();
        let fit = result.outcome.fit();
        let signal = fit.map(|f| f.signal());
        let errors = fit.and_then(|f| f.signal_errors);
        let b = fit.map(|f| f.background().power_coefficients());

        SpectrumRecord {
            pt_bin: result.bin.index,
            histogram: result.histogram.clone(),
            pt_low: result.bin.low,
            pt_high: result.bin.high,
            pt_center: result.bin.center(),
            status: result.outcome.status(),
            value: bin_yield.map(|y| y.value),
            uncertainty: bin_yield.map(|y| y.uncertainty),
            signal_sum: bin_yield.map(|y| y.signal_sum),
            background_sum: bin_yield.map(|y| y.background_sum),
            bins_used: bin_yield.map(|y| y.bins_used),
            chi2: fit.map(|f| f.chi2),
            ndf: fit.map(|f| f.ndf),
            iterations: fit.map(|f| f.iterations),
            amplitude: signal.map(|s| s.amplitude),
            amplitude_err: errors.map(|e| e[0]),
            mean: signal.map(|s| s.mean),
            mean_err: errors.map(|e| e[1]),
            sigma: signal.map(|s| s.sigma),
            sigma_err: errors.map(|e| e[2]),
            b0: b.map(|b| b[0]),
            b1: b.map(|b| b[1]),
            b2: b.map(|b| b[2]),
            b3: b.map(|b| b[3]),
            b4: b.map(|b| b[4]),
            message: result.outcome.message().to_string(),
        }
    }
}

/// 曲线 CSV 的一行
#[derive(Debug, Serialize)]
struct CurveRecord {
    pt_bin: usize,
    mass: f64,
    composite: f64,
    background: f64,
    signal: f64,
}

/// 写出产额谱
pub fn write_spectrum<W: Write>(spectrum: &YieldSpectrum, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in spectrum.results() {
        wtr.serialize(SpectrumRecord::from(result))?;
    }
    wtr.flush().map_err(|e| YieldError::FileWriteError {
        path: "<spectrum>".to_string(),
        source: e,
    })?;
    Ok(())
}

/// 导出产额谱为 CSV 文件
pub fn spectrum_to_csv(spectrum: &YieldSpectrum, output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| YieldError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    write_spectrum(spectrum, file)
}

/// 写出拟合曲线采样
pub fn write_curves<W: Write>(spectrum: &YieldSpectrum, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in spectrum.results() {
        let Some(fit) = result.outcome.fit() else {
            continue;
        };
        let (background, signal) = fit.model.decompose();
        let (low, high) = fit.window;
        let step = (high - low) / (CURVE_SAMPLES - 1) as f64;

        for i in 0..CURVE_SAMPLES {
            let mass = low + i as f64 * step;
            wtr.serialize(CurveRecord {
                pt_bin: result.bin.index,
                mass,
                composite: fit.model.eval(mass),
                background: background.eval(mass),
                signal: signal.eval(mass),
            })?;
        }
    }
    wtr.flush().map_err(|e| YieldError::FileWriteError {
        path: "<curves>".to_string(),
        source: e,
    })?;
    Ok(())
}

/// 导出拟合曲线为 CSV 文件
pub fn curves_to_csv(spectrum: &YieldSpectrum, output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| YieldError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    write_curves(spectrum, file)
}
