//! # inspect 子命令实现
//!
//! 列出存档中的全部直方图及其分 bin 信息，标出识别到的 pT bin 序号。
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的 InspectArgs
//! - 使用 `parsers/archive.rs`

use crate::cli::inspect::InspectArgs;
use crate::error::Result;
use crate::parsers::archive::{pt_bin_regex, pt_index};
use crate::parsers::HistogramArchive;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 直方图表格行
#[derive(Debug, Clone, Tabled)]
struct HistogramRow {
    #[tabled(rename = "Histogram")]
    name: String,
    #[tabled(rename = "Bins")]
    bins: String,
    #[tabled(rename = "Range (GeV/c²)")]
    range: String,
    #[tabled(rename = "Width (MeV/c²)")]
    width: String,
    #[tabled(rename = "Entries")]
    entries: String,
    #[tabled(rename = "pT Bin")]
    pt_bin: String,
}

/// 执行存档检查
pub fn execute(args: InspectArgs) -> Result<()> {
    output::print_header("Histogram Archive");

    let archive = HistogramArchive::open(&args.input, &args.pattern)?;
    let re = pt_bin_regex(&args.prefix)?;

    let rows: Vec<HistogramRow> = archive
        .names()
        .map(|name| {
            let pt_bin = pt_index(&re, name).map_or("-".to_string(), |i| i.to_string());
            match archive.get(name) {
                Ok(h) => {
                    let (low, high) = h.range();
                    HistogramRow {
                        name: name.to_string(),
                        bins: h.len().to_string(),
                        range: format!("{:.4} - {:.4}", low, high),
                        width: format!("{:.3}", h.bin_width() * 1e3),
                        entries: format!("{:.0}", h.entries()),
                        pt_bin,
                    }
                }
                // 非法直方图照样列出，不影响其余条目
                Err(e) => HistogramRow {
                    name: name.to_string(),
                    bins: "-".to_string(),
                    range: format!("invalid: {}", e),
                    width: "-".to_string(),
                    entries: "-".to_string(),
                    pt_bin,
                },
            }
        })
        .collect();

    println!("{}", Table::new(rows));

    for (path, reason) in archive.skipped() {
        output::print_skip(&format!("{}: {}", path.display(), reason));
    }

    let pt_bins = archive.find_pt_bins(&args.prefix)?;
    output::print_separator();
    output::print_done(&format!(
        "{} histograms, {} matching '{}<n>'",
        archive.len(),
        pt_bins.len(),
        args.prefix
    ));

    if let (Some(first), Some(last)) = (pt_bins.first(), pt_bins.last()) {
        output::print_info(&format!("pT bin indices {} to {}", first.0, last.0));
    }

    Ok(())
}
