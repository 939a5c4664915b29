//! # fit 子命令实现
//!
//! 对每个 pT bin 拟合 Λ 不变质量峰并提取原始产额。
//!
//! ## 功能
//! - 从直方图存档按分 bin 方案取出全部 pT bin（缺失即终止）
//! - 并行拟合（rayon），结果按 pT 顺序汇总
//! - 终端表格 + 失败汇总
//! - 导出产额谱 CSV，可选拟合曲线 CSV、逐 bin 拟合图和产额谱图
//! - 可选拟合 pT 积分的总直方图
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用 `parsers/archive.rs` 读取直方图
//! - 使用 `fit/` 模块拟合、导出和绘图
//! - 使用 `batch/runner.rs` 并行执行

use crate::batch::BatchRunner;
use crate::cli::fit::FitArgs;
use crate::error::{Result, YieldError};
use crate::fit::{self, FitConfig, FitOutcome, PeakFitEngine, YieldSpectrum};
use crate::models::PtBinScheme;
use crate::parsers::HistogramArchive;
use crate::utils::output;

use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};

/// 失败列表最多显示的条数
const MAX_LISTED_FAILURES: usize = 10;

/// 产额表格行
#[derive(Debug, Clone, Tabled)]
struct YieldRow {
    #[tabled(rename = "Bin")]
    index: usize,
    #[tabled(rename = "pT (GeV/c)")]
    pt: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Yield")]
    value: String,
    #[tabled(rename = "Error")]
    uncertainty: String,
    #[tabled(rename = "Σ Bkg")]
    background: String,
    #[tabled(rename = "μ (GeV/c²)")]
    mean: String,
    #[tabled(rename = "σ (MeV/c²)")]
    sigma: String,
    #[tabled(rename = "χ²/ndf")]
    chi2: String,
}

/// 执行产额提取
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("Lambda Invariant-Mass Fit and Yield Extraction");

    let (low, high) = parse_range(&args.window)?;
    let config = FitConfig::default()
        .window(low, high)
        .noise_floor(args.noise_floor)
        .min_entries(args.min_entries)
        .amplitude_seed(args.amplitude_seed)
        .mean_seed(args.mean_seed)
        .sigma_seed(args.sigma_seed)
        .max_iter(args.max_iter)
        .tolerance(args.tolerance);
    let engine = PeakFitEngine::new(config)?;

    let scheme = PtBinScheme {
        first_low: args.pt_start,
        width: args.pt_width,
        count: args.bins,
        prefix: args.prefix.clone(),
        directory: Some(args.hist_dir.clone()).filter(|d| !d.trim().is_empty()),
    };

    // 缺失或非法的直方图在拟合前报错
    let archive = HistogramArchive::open(&args.input, &args.pattern)?;
    output::print_success(&format!(
        "Loaded {} histograms from '{}'",
        archive.len(),
        archive.source().display()
    ));
    for (path, reason) in archive.skipped() {
        output::print_skip(&format!("{}: {}", path.display(), reason));
    }

    // 只校验实际取用的直方图
    let series = archive.pt_series(&scheme)?;
    let inclusive = args
        .inclusive
        .as_deref()
        .map(|name| archive.get(name))
        .transpose()?;

    output::print_info(&format!(
        "{} pT bins from {:.3} to {:.3} GeV/c",
        series.len(),
        scheme.first_low,
        scheme.first_low + scheme.count as f64 * scheme.width
    ));
    output::print_info(&format!(
        "Fit window: {} - {} GeV/c², noise floor: {} counts",
        low, high, args.noise_floor
    ));

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));

    let spectrum = engine.run(&series, &runner)?;

    print_yield_table(&spectrum);
    print_summary(&spectrum);
    if spectrum.results().iter().all(|r| r.outcome.is_failed()) {
        output::print_warning("No pT bin could be fitted; check the fit window and seeds");
    }

    // 导出
    ensure_parent_dir(&args.output)?;
    fit::export::spectrum_to_csv(&spectrum, &args.output)?;
    output::print_success(&format!(
        "Yield spectrum saved to '{}'",
        args.output.display()
    ));

    if let Some(ref path) = args.curves {
        ensure_parent_dir(path)?;
        fit::export::curves_to_csv(&spectrum, path)?;
        output::print_success(&format!("Fit curves saved to '{}'", path.display()));
    }

    if let Some(ref path) = args.plot {
        ensure_parent_dir(path)?;
        fit::plot::generate_fit_grid(
            &spectrum,
            &series,
            engine.config().window,
            path,
            args.width,
            args.height,
            fit::plot::is_svg_path(path),
        )?;
        output::print_success(&format!("Fit panels saved to '{}'", path.display()));
    }

    if let Some(ref path) = args.spectrum_plot {
        if spectrum.points().is_empty() {
            output::print_warning("No bin produced a yield, skipping spectrum plot");
        } else {
            ensure_parent_dir(path)?;
            fit::plot::generate_spectrum_plot(
                &spectrum,
                path,
                args.width,
                args.height,
                fit::plot::is_svg_path(path),
            )?;
            output::print_success(&format!("Spectrum plot saved to '{}'", path.display()));
        }
    }

    if let Some(histogram) = inclusive {
        output::print_header(&format!("Inclusive Fit: {}", histogram.name()));
        let outcome = engine.fit_histogram(&histogram);
        print_outcome(&outcome, histogram.bin_width());
    }

    Ok(())
}

/// 解析质量范围字符串（如 "1.05-1.2"，允许 "1.05e0-1.2"）
fn parse_range(range: &str) -> Result<(f64, f64)> {
    let invalid = || {
        YieldError::InvalidRange(format!("{} (expected LOW-HIGH, e.g. 1.05-1.2)", range))
    };

    // 分隔符是第一个不属于指数、也不是开头符号的 '-'
    let trimmed = range.trim();
    let split = trimmed
        .char_indices()
        .skip(1)
        .find(|&(i, c)| c == '-' && !trimmed[..i].ends_with(['e', 'E']))
        .map(|(i, _)| i)
        .ok_or_else(invalid)?;

    let min: f64 = trimmed[..split].trim().parse().map_err(|_| invalid())?;
    let max: f64 = trimmed[split + 1..].trim().parse().map_err(|_| invalid())?;

    if min < 0.0 || max <= min {
        return Err(YieldError::InvalidRange(format!(
            "{} (must be 0 <= min < max)",
            range
        )));
    }

    Ok((min, max))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| YieldError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// 打印产额表格
fn print_yield_table(spectrum: &YieldSpectrum) {
    let rows: Vec<YieldRow> = spectrum
        .results()
        .iter()
        .map(|r| {
            let bin_yield = r.outcome.bin_yield();
            let fit = r.outcome.fit();
            YieldRow {
                index: r.bin.index,
                pt: r.bin.label(),
                status: r.outcome.status().to_string(),
                value: bin_yield.map_or("-".to_string(), |y| format!("{:.1}", y.value)),
                uncertainty: bin_yield.map_or("-".to_string(), |y| format!("{:.1}", y.uncertainty)),
                background: bin_yield
                    .map_or("-".to_string(), |y| format!("{:.1}", y.background_sum)),
                mean: fit.map_or("-".to_string(), |f| format!("{:.5}", f.signal().mean)),
                sigma: fit.map_or("-".to_string(), |f| format!("{:.3}", f.signal().sigma * 1e3)),
                chi2: fit
                    .and_then(|f| f.reduced_chi2())
                    .map_or("-".to_string(), |c| format!("{:.2}", c)),
            }
        })
        .collect();

    output::print_header("Raw Lambda Yield per pT Bin");
    println!("{}", Table::new(rows));
}

/// 打印统计和失败列表
fn print_summary(spectrum: &YieldSpectrum) {
    let summary = spectrum.summary();

    output::print_separator();
    output::print_success(&format!(
        "Fit complete: {} bins, {} converged, {} degenerate, {} failed",
        summary.total(),
        summary.converged,
        summary.degenerate,
        summary.failed
    ));

    for result in spectrum.results() {
        if let FitOutcome::Degenerate { reason, .. } = &result.outcome {
            output::print_skip(&format!("{}: {}", result.histogram, reason));
        }
    }

    if !summary.failures.is_empty() {
        output::print_warning("Failed bins:");
        for (name, err) in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            output::print_failure(name, err);
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            output::print_warning(&format!(
                "  ... and {} more",
                summary.failures.len() - MAX_LISTED_FAILURES
            ));
        }
    }
}

/// 打印单个直方图的拟合结果
fn print_outcome(outcome: &FitOutcome, bin_width: f64) {
    match outcome {
        FitOutcome::Converged { fit, bin_yield } => {
            let signal = fit.signal();
            output::print_success(&format!(
                "Yield: {:.1} ± {:.1} (background under peak {:.1})",
                bin_yield.value, bin_yield.uncertainty, bin_yield.background_sum
            ));
            output::print_info(&format!(
                "A = {:.2}, μ = {:.5} GeV/c², σ = {:.3} MeV/c² (FWHM {:.3}), χ²/ndf = {}",
                signal.amplitude,
                signal.mean,
                signal.sigma * 1e3,
                signal.fwhm() * 1e3,
                fit.reduced_chi2()
                    .map_or("-".to_string(), |c| format!("{:.2}", c))
            ));
            output::print_info(&format!(
                "Gaussian integral: {:.1} counts",
                signal.area() / bin_width
            ));
        }
        FitOutcome::Degenerate { reason, .. } => {
            output::print_warning(&format!("Degenerate histogram, yield is 0: {}", reason));
        }
        FitOutcome::Failed { reason } => {
            output::print_error(&format!("Fit failed: {}", reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1.05-1.2").unwrap(), (1.05, 1.2));
        assert_eq!(parse_range(" 1.08 - 1.15 ").unwrap(), (1.08, 1.15));
        assert!(parse_range("1.2-1.05").is_err());
        assert!(parse_range("1.05").is_err());
        assert!(parse_range("a-b").is_err());
        assert!(parse_range("-1.2").is_err());
        assert!(parse_range("1.05-1.2-1.3").is_err());
    }

    #[test]
    fn test_parse_range_accepts_exponents() {
        assert_eq!(parse_range("1.05e0-1.2").unwrap(), (1.05, 1.2));
        assert_eq!(parse_range("105E-2 - 12e-1").unwrap(), (1.05, 1.2));
        assert_eq!(parse_range("1.05-1.2e0").unwrap(), (1.05, 1.2));

        let err = parse_range("1.05").unwrap_err();
        assert!(err.to_string().contains("LOW-HIGH"));
    }
}
