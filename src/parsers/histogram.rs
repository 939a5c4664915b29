//! # 直方图 CSV 解析器
//!
//! 读取从 ROOT 文件导出的不变质量直方图。
//!
//! ## 格式说明
//! 长表格式，一个文件包含多个直方图，按直方图名分组：
//! ```text
//! histogram,bin_center,count
//! strangeness_tutorial/Lambda/hMassLambdaPt1,1.05037,48
//! strangeness_tutorial/Lambda/hMassLambdaPt1,1.05112,52
//! ...
//! ```
//!
//! 单直方图格式，直方图名由调用方给出（通常是文件的相对路径）：
//! ```text
//! bin_center,count
//! 1.05037,48
//! ...
//! ```
//!
//! 以 `#` 开头的行视为注释。解析只做到 `RawHistogram` 为止：
//! 数值错误和分 bin 问题记在对应直方图上，直到真正用到它 (`build`) 时才报错，
//! 同一文件中无关的直方图（如单 bin 的事例计数器）不影响其他直方图。
//!
//! ## 依赖关系
//! - 被 `parsers/archive.rs` 使用
//! - 使用 `models/histogram.rs`
//! - 使用 `csv` + `serde` 反序列化记录

use crate::error::{Result, YieldError};
use crate::models::MassHistogram;

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const TABLE_FORMAT: &str = "histogram table";
const SINGLE_FORMAT: &str = "histogram CSV";

const TABLE_COLUMNS: [&str; 3] = ["histogram", "bin_center", "count"];
const SINGLE_COLUMNS: [&str; 2] = ["bin_center", "count"];

#[derive(Debug, Deserialize)]
struct TableRow {
    histogram: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    bin_center: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    count: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BinRow {
    #[serde(deserialize_with = "csv::invalid_option")]
    bin_center: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    count: Option<f64>,
}

/// 尚未校验的直方图：名字和按文件顺序的 (中心, 计数) 行
#[derive(Debug, Clone, PartialEq)]
pub struct RawHistogram {
    name: String,
    bins: Vec<(f64, f64)>,
    /// 第一处无法解析的行
    defect: Option<String>,
}

impl RawHistogram {
    fn new(name: impl Into<String>) -> Self {
        RawHistogram {
            name: name.into(),
            bins: Vec::new(),
            defect: None,
        }
    }

    fn push(&mut self, record: usize, center: Option<f64>, count: Option<f64>) {
        match (center, count) {
            (Some(c), Some(n)) => self.bins.push((c, n)),
            _ => {
                self.defect.get_or_insert_with(|| {
                    format!("record {}: bin_center and count must be numbers", record)
                });
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 按中心排序后构造并校验 `MassHistogram`
    pub fn build(&self) -> Result<MassHistogram> {
        if let Some(reason) = &self.defect {
            return Err(YieldError::InvalidHistogram {
                name: self.name.clone(),
                reason: reason.clone(),
            });
        }
        let mut bins = self.bins.clone();
        bins.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (centers, counts) = bins.into_iter().unzip();
        MassHistogram::new(self.name.clone(), centers, counts)
    }
}

/// 解析长表格式文件
pub fn parse_histogram_table_file(path: &Path) -> Result<Vec<RawHistogram>> {
    let content = read_file(path)?;
    parse_table(&content, &path.display().to_string())
}

/// 从字符串内容解析长表格式，按首次出现的顺序返回直方图
#[cfg(test)]
pub fn parse_histogram_table_content(content: &str) -> Result<Vec<RawHistogram>> {
    parse_table(content, "<content>")
}

/// 解析单直方图文件；表头不是 `bin_center,count` 时返回 `None`
pub fn parse_histogram_csv_file(path: &Path, name: &str) -> Result<Option<RawHistogram>> {
    let content = read_file(path)?;
    if !is_histogram_csv(&content) {
        return Ok(None);
    }
    parse_single(&content, name, &path.display().to_string()).map(Some)
}

/// 从字符串内容解析单直方图
#[cfg(test)]
pub fn parse_histogram_csv_content(content: &str, name: &str) -> Result<RawHistogram> {
    parse_single(content, name, "<content>")
}

/// 表头是否恰好为 `bin_center,count`
pub fn is_histogram_csv(content: &str) -> bool {
    match reader(content).headers() {
        Ok(headers) => headers.iter().eq(SINGLE_COLUMNS.iter().copied()),
        Err(_) => false,
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| YieldError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes())
}

/// 检查表头包含全部必需列
fn check_columns(rdr: &mut csv::Reader<&[u8]>, columns: &[&str]) -> std::result::Result<(), String> {
    let headers = rdr.headers().map_err(|e| e.to_string())?;
    match columns.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        Some(missing) => Err(format!("missing column '{}'", missing)),
        None => Ok(()),
    }
}

fn parse_table(content: &str, source: &str) -> Result<Vec<RawHistogram>> {
    let parse_error = |reason: String| YieldError::ParseError {
        format: TABLE_FORMAT.to_string(),
        path: source.to_string(),
        reason,
    };

    let mut rdr = reader(content);
    check_columns(&mut rdr, &TABLE_COLUMNS).map_err(&parse_error)?;

    // 保持首次出现顺序
    let mut histograms: Vec<RawHistogram> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, record) in rdr.deserialize::<TableRow>().enumerate() {
        let row = record.map_err(|e| parse_error(format!("record {}: {}", i + 1, e)))?;
        let name = row.histogram.trim_matches('/');
        if name.is_empty() {
            return Err(parse_error(format!("record {}: empty histogram name", i + 1)));
        }
        let slot = *index.entry(name.to_string()).or_insert_with(|| {
            histograms.push(RawHistogram::new(name));
            histograms.len() - 1
        });
        histograms[slot].push(i + 1, row.bin_center, row.count);
    }

    if histograms.is_empty() {
        return Err(parse_error("no histogram rows".to_string()));
    }

    Ok(histograms)
}

fn parse_single(content: &str, name: &str, source: &str) -> Result<RawHistogram> {
    let parse_error = |reason: String| YieldError::ParseError {
        format: SINGLE_FORMAT.to_string(),
        path: source.to_string(),
        reason,
    };

    let mut rdr = reader(content);
    check_columns(&mut rdr, &SINGLE_COLUMNS).map_err(&parse_error)?;

    let mut hist = RawHistogram::new(name);
    for (i, record) in rdr.deserialize::<BinRow>().enumerate() {
        let row = record.map_err(|e| parse_error(format!("record {}: {}", i + 1, e)))?;
        hist.push(i + 1, row.bin_center, row.count);
    }

    if hist.bins.is_empty() && hist.defect.is_none() {
        return Err(parse_error("no bin rows".to_string()));
    }

    Ok(hist)
}
