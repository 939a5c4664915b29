//! # 拟合图表生成
//!
//! 使用 `plotters` 库生成拟合结果图。
//!
//! ## 功能
//! - 每个 pT bin 一个面板（每行 4 个）：直方图点 + 复合(蓝)/本底(绿)/信号(红)曲线
//! - 产额随 pT 变化图：纵向误差棒为产额误差，横向为半个 bin 宽，附本底积分
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `fit/spectrum.rs` 的 YieldSpectrum
//! - 使用 `models/` 的 PtSeries, MassHistogram

use crate::error::{Result, YieldError};
use crate::fit::spectrum::{BinResult, YieldSpectrum};
use crate::models::{MassHistogram, PtSeries};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 每行面板数
const GRID_COLUMNS: usize = 4;
/// 曲线采样点数
const CURVE_POINTS: usize = 400;

/// 生成逐 bin 拟合面板图
pub fn generate_fit_grid(
    spectrum: &YieldSpectrum,
    series: &PtSeries,
    window: (f64, f64),
    output_path: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_grid(&root, spectrum, series, window)?;
        root.present()
            .map_err(|e| YieldError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_grid(&root, spectrum, series, window)?;
        root.present()
            .map_err(|e| YieldError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 生成产额随 pT 变化图
pub fn generate_spectrum_plot(
    spectrum: &YieldSpectrum,
    output_path: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_spectrum_chart(&root, spectrum)?;
        root.present()
            .map_err(|e| YieldError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_spectrum_chart(&root, spectrum)?;
        root.present()
            .map_err(|e| YieldError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 按扩展名判断是否输出 SVG
pub fn is_svg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

fn draw_fit_grid<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectrum: &YieldSpectrum,
    series: &PtSeries,
    window: (f64, f64),
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    if spectrum.is_empty() {
        return Err(YieldError::PlotError("No fits to plot".to_string()));
    }

    let cols = GRID_COLUMNS.min(spectrum.len());
    let rows = spectrum.len().div_ceil(cols);
    let panels = root.split_evenly((rows, cols));

    for (result, panel) in spectrum.results().iter().zip(panels.iter()) {
        if let Some((_, histogram)) = series.get(result.bin.index) {
            draw_fit_panel(panel, result, histogram, window)?;
        }
    }

    Ok(())
}

/// 绘制单个 pT bin 的拟合面板
fn draw_fit_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    result: &BinResult,
    histogram: &MassHistogram,
    window: (f64, f64),
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (low, high) = window;
    let y_max = histogram.max_count_in(low, high).max(1.0) * 1.15;
    let caption = format!(
        "pT {} GeV/c [{}]",
        result.bin.label(),
        result.outcome.status()
    );

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 14).into_font())
        .margin(8)
        .x_label_area_size(25)
        .y_label_area_size(45)
        .build_cartesian_2d(low..high, 0.0..y_max)
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_labels(4)
        .y_labels(5)
        .label_style(("sans-serif", 10))
        .draw()
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .draw_series(
            histogram
                .window(low, high)
                .map(|(m, c)| Circle::new((m, c), 2, BLACK.filled())),
        )
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    let Some(fit) = result.outcome.fit() else {
        return Ok(());
    };

    let (background, signal) = fit.model.decompose();
    let step = (high - low) / (CURVE_POINTS - 1) as f64;
    let masses: Vec<f64> = (0..CURVE_POINTS).map(|i| low + i as f64 * step).collect();

    chart
        .draw_series(LineSeries::new(
            masses.iter().map(|&m| (m, background.eval(m))),
            GREEN.stroke_width(2),
        ))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            masses.iter().map(|&m| (m, signal.eval(m))),
            RED.stroke_width(2),
        ))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            masses.iter().map(|&m| (m, fit.model.eval(m))),
            BLUE.stroke_width(2),
        ))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    Ok(())
}

/// 绘制产额随 pT 变化图
fn draw_spectrum_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectrum: &YieldSpectrum,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    let points = spectrum.points();
    if points.is_empty() {
        return Err(YieldError::PlotError("No yields to plot".to_string()));
    }

    let x_min = points
        .iter()
        .map(|p| p.pt - p.half_width)
        .fold(f64::INFINITY, f64::min);
    let x_max = points
        .iter()
        .map(|p| p.pt + p.half_width)
        .fold(f64::NEG_INFINITY, f64::max);
    let y_min = points
        .iter()
        .map(|p| p.value - p.uncertainty)
        .fold(0.0, f64::min);
    let y_max = points
        .iter()
        .map(|p| (p.value + p.uncertainty).max(p.background_sum))
        .fold(1.0, f64::max);
    let x_pad = 0.05 * (x_max - x_min);

    let mut chart = ChartBuilder::on(root)
        .caption(
            "Number of Lambda particles for given pT",
            ("sans-serif", 28).into_font(),
        )
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d((x_min - x_pad)..(x_max + x_pad), y_min..(y_max * 1.15))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("pT (GeV/c)")
        .y_desc("Number of Lambda particles")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    let yield_color = RGBColor(0, 102, 204);

    chart
        .draw_series(points.iter().map(|p| {
            ErrorBar::new_vertical(
                p.pt,
                p.value - p.uncertainty,
                p.value,
                p.value + p.uncertainty,
                yield_color.filled(),
                8,
            )
        }))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?
        .label("Raw yield")
        .legend(move |(x, y)| Circle::new((x + 10, y), 4, yield_color.filled()));

    chart
        .draw_series(points.iter().map(|p| {
            ErrorBar::new_horizontal(
                p.value,
                p.pt - p.half_width,
                p.pt,
                p.pt + p.half_width,
                yield_color.filled(),
                0,
            )
        }))
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|p| TriangleMarker::new((p.pt, p.background_sum), 6, RED.filled())),
        )
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?
        .label("Background under peak")
        .legend(|(x, y)| TriangleMarker::new((x + 10, y), 5, RED.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| YieldError::PlotError(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_svg_path() {
        assert!(is_svg_path(Path::new("fits.svg")));
        assert!(is_svg_path(Path::new("out/FITS.SVG")));
        assert!(!is_svg_path(Path::new("fits.png")));
        assert!(!is_svg_path(Path::new("fits")));
    }

    #[test]
    fn test_empty_spectrum_is_plot_error() {
        let mut svg = String::new();
        let root = SVGBackend::with_string(&mut svg, (100, 100)).into_drawing_area();
        let err = draw_spectrum_chart(&root, &YieldSpectrum::default()).unwrap_err();
        assert!(matches!(err, YieldError::PlotError(_)));
    }
}
