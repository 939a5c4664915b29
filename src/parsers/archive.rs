//! # 直方图存档
//!
//! 按名字管理一次分析导出的全部不变质量直方图，并按 pT 分 bin 方案
//! 解析出有序的逐 bin 直方图序列。
//!
//! ## 输入
//! - 单个文件：长表格式（见 `parsers/histogram.rs`）
//! - 目录：递归收集匹配模式的单直方图 CSV，直方图名为去掉扩展名的
//!   相对路径（`/` 分隔），例如 `strangeness_tutorial/Lambda/hMassLambdaPt3`。
//!   表头不是 `bin_center,count` 的文件（例如上一次运行写出的产额表）被跳过
//!
//! 直方图只在被取用时才校验分 bin，存档中无关的直方图不会使运行失败。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 和 `commands/inspect.rs` 使用
//! - 使用 `batch/collector.rs` 收集文件
//! - 使用 `regex` 识别 pT bin 序号

use crate::batch::FileCollector;
use crate::error::{Result, YieldError};
use crate::models::{MassHistogram, PtBinScheme, PtSeries};
use crate::parsers::histogram::{
    parse_histogram_csv_file, parse_histogram_table_file, RawHistogram,
};

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 按名字索引的直方图集合
#[derive(Debug, Clone)]
pub struct HistogramArchive {
    source: PathBuf,
    histograms: BTreeMap<String, RawHistogram>,
    /// 目录输入中被跳过的文件及原因
    skipped: Vec<(PathBuf, String)>,
}

impl HistogramArchive {
    /// 打开文件或目录
    pub fn open(path: &Path, pattern: &str) -> Result<Self> {
        if !path.exists() {
            return Err(YieldError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        if path.is_file() {
            let histograms = parse_histogram_table_file(path)?;
            return Self::from_histograms(path, histograms);
        }

        let files = FileCollector::new(path.to_path_buf(), pattern)?
            .recursive(true)
            .collect();

        let mut histograms = Vec::new();
        let mut skipped = Vec::new();
        for file in files {
            match parse_histogram_csv_file(&file, &relative_name(path, &file))? {
                Some(hist) => histograms.push(hist),
                None => skipped.push((file, "header is not 'bin_center,count'".to_string())),
            }
        }

        let mut archive = Self::from_histograms(path, histograms)?;
        if archive.is_empty() {
            return Err(YieldError::NoHistogramsFound {
                path: path.display().to_string(),
                pattern: pattern.to_string(),
            });
        }
        archive.skipped = skipped;
        Ok(archive)
    }

    /// 从已读取的直方图构建，名字重复则报错
    pub fn from_histograms(source: &Path, histograms: Vec<RawHistogram>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for hist in histograms {
            let name = hist.name().to_string();
            if map.insert(name.clone(), hist).is_some() {
                return Err(YieldError::InvalidHistogram {
                    name,
                    reason: "defined more than once".to_string(),
                });
            }
        }
        Ok(HistogramArchive {
            source: source.to_path_buf(),
            histograms: map,
            skipped: Vec::new(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn skipped(&self) -> &[(PathBuf, String)] {
        &self.skipped
    }

    /// 按名字排序的全部直方图名
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.histograms.keys().map(String::as_str)
    }

    /// 按名字取出并校验
    pub fn get(&self, name: &str) -> Result<MassHistogram> {
        self.histograms
            .get(name.trim_matches('/'))
            .ok_or_else(|| YieldError::HistogramNotFound {
                name: name.to_string(),
            })?
            .build()
    }

    /// 按分 bin 方案取出全部 pT bin 的直方图，缺任何一个即失败
    pub fn pt_series(&self, scheme: &PtBinScheme) -> Result<PtSeries> {
        scheme.validate()?;
        let entries = scheme
            .bins()
            .into_iter()
            .map(|bin| Ok((bin, self.get(&scheme.histogram_name(&bin))?)))
            .collect::<Result<Vec<_>>>()?;
        PtSeries::new(entries)
    }

    /// 名字形如 `[.../]<prefix><n>` 的直方图，按序号排序
    pub fn find_pt_bins(&self, prefix: &str) -> Result<Vec<(usize, &str)>> {
        let re = pt_bin_regex(prefix)?;
        let mut found: Vec<(usize, &str)> = self
            .names()
            .filter_map(|name| pt_index(&re, name).map(|i| (i, name)))
            .collect();
        found.sort();
        Ok(found)
    }
}

/// 匹配 pT bin 直方图名的正则
pub fn pt_bin_regex(prefix: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?:^|/){}(\d+)$", regex::escape(prefix)))
        .map_err(|e| YieldError::InvalidArgument(format!("bad histogram prefix '{}': {}", prefix, e)))
}

/// 从直方图名中提取 pT bin 序号
pub fn pt_index(re: &Regex, name: &str) -> Option<usize> {
    re.captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 目录中文件对应的直方图名
fn relative_name(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file).with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::histogram::parse_histogram_table_content;
    use std::fs;

    const HIST_CSV: &str = "bin_center,count\n1.10,1\n1.11,2\n1.12,3\n";

    fn table(names: &[&str]) -> String {
        let mut text = String::from("histogram,bin_center,count\n");
        for name in names {
            for i in 0..4 {
                text.push_str(&format!("{},{},{}\n", name, 1.1 + 0.01 * i as f64, i + 1));
            }
        }
        text
    }

    fn archive_from(text: &str) -> HistogramArchive {
        let hists = parse_histogram_table_content(text).unwrap();
        HistogramArchive::from_histograms(Path::new("memory"), hists).unwrap()
    }

    fn archive(names: &[&str]) -> HistogramArchive {
        archive_from(&table(names))
    }

    fn scheme(count: usize) -> PtBinScheme {
        PtBinScheme {
            count,
            ..PtBinScheme::default()
        }
    }

    /// 每个测试独立的临时目录
    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "lambda-yield-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        root
    }

    fn write_bins(dir: &Path, count: usize) {
        fs::create_dir_all(dir).unwrap();
        for i in 1..=count {
            fs::write(dir.join(format!("hMassLambdaPt{}.csv", i)), HIST_CSV).unwrap();
        }
    }

    #[test]
    fn test_get_missing_histogram() {
        let a = archive(&["strangeness_tutorial/Lambda/hMassLambdaPt1"]);
        assert!(a.get("strangeness_tutorial/Lambda/hMassLambdaPt1").is_ok());
        let err = a.get("strangeness_tutorial/Lambda/hMassLambdaPt9").unwrap_err();
        assert!(matches!(err, YieldError::HistogramNotFound { name } if name.ends_with("Pt9")));
    }

    #[test]
    fn test_pt_series_in_bin_order() {
        let a = archive(&[
            "strangeness_tutorial/Lambda/hMassLambdaPt2",
            "strangeness_tutorial/Lambda/hMassLambdaPt1",
            "strangeness_tutorial/Lambda/hMassLambdaPt3",
        ]);
        let series = a.pt_series(&scheme(3)).unwrap();
        let indices: Vec<usize> = series.entries().iter().map(|(b, _)| b.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!((series.entries()[2].0.low - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_pt_series_missing_bin_fails_whole_run() {
        let a = archive(&[
            "strangeness_tutorial/Lambda/hMassLambdaPt1",
            "strangeness_tutorial/Lambda/hMassLambdaPt3",
        ]);
        let err = a.pt_series(&scheme(3)).unwrap_err();
        assert!(matches!(err, YieldError::HistogramNotFound { name } if name.ends_with("hMassLambdaPt2")));
    }

    #[test]
    fn test_unrequested_invalid_histogram_is_ignored() {
        let mut text = table(&[
            "strangeness_tutorial/Lambda/hMassLambdaPt1",
            "strangeness_tutorial/Lambda/hMassLambdaPt2",
        ]);
        text.push_str("strangeness_tutorial/hEventCounter,0.5,120000\n");
        let a = archive_from(&text);

        assert_eq!(a.len(), 3);
        assert_eq!(a.pt_series(&scheme(2)).unwrap().len(), 2);
        // 只有显式取用时才报错
        let err = a.get("strangeness_tutorial/hEventCounter").unwrap_err();
        assert!(matches!(err, YieldError::InvalidHistogram { .. }));
    }

    #[test]
    fn test_requested_invalid_histogram_fails_series() {
        let mut text = table(&["strangeness_tutorial/Lambda/hMassLambdaPt1"]);
        text.push_str("strangeness_tutorial/Lambda/hMassLambdaPt2,1.1,4\n");
        let a = archive_from(&text);
        let err = a.pt_series(&scheme(2)).unwrap_err();
        assert!(matches!(err, YieldError::InvalidHistogram { name, .. } if name.ends_with("Pt2")));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let hists = parse_histogram_table_content(&table(&["h"])).unwrap();
        let twice = vec![hists[0].clone(), hists[0].clone()];
        assert!(HistogramArchive::from_histograms(Path::new("memory"), twice).is_err());
    }

    #[test]
    fn test_find_pt_bins() {
        let a = archive(&[
            "strangeness_tutorial/Lambda/hMassLambdaPt10",
            "strangeness_tutorial/Lambda/hMassLambdaPt2",
            "strangeness_tutorial/Lambda/hMassLambda",
            "strangeness_tutorial/Lambda/hMassAntiLambdaPt1",
        ]);
        let found = a.find_pt_bins("hMassLambdaPt").unwrap();
        let indices: Vec<usize> = found.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![2, 10]);
    }

    #[test]
    fn test_open_directory_names_by_relative_path() {
        let root = temp_root("names");
        write_bins(&root.join("strangeness_tutorial").join("Lambda"), 2);
        fs::write(root.join("notes.txt"), "not a histogram").unwrap();

        let a = HistogramArchive::open(&root, "*.csv").unwrap();
        let names: Vec<&str> = a.names().collect();
        assert_eq!(
            names,
            vec![
                "strangeness_tutorial/Lambda/hMassLambdaPt1",
                "strangeness_tutorial/Lambda/hMassLambdaPt2",
            ]
        );
        assert_eq!(a.pt_series(&scheme(2)).unwrap().len(), 2);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_open_directory_with_character_class_pattern() {
        let root = temp_root("class");
        write_bins(&root.join("strangeness_tutorial").join("Lambda"), 12);

        let a = HistogramArchive::open(&root, "hMassLambdaPt[0-9].csv").unwrap();
        assert_eq!(a.len(), 9);
        assert!(a.get("strangeness_tutorial/Lambda/hMassLambdaPt1").is_ok());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_open_directory_skips_previous_yield_table() {
        let root = temp_root("skip");
        write_bins(&root.join("strangeness_tutorial").join("Lambda"), 2);
        fs::write(
            root.join("lambda_yields.csv"),
            "pt_bin,histogram,pt_low,pt_high,pt_center,status,yield\n1,h,0.5,0.625,0.5625,converged,20900\n",
        )
        .unwrap();

        let a = HistogramArchive::open(&root, "*.csv").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.skipped().len(), 1);
        assert!(a.skipped()[0].0.ends_with("lambda_yields.csv"));
        assert_eq!(a.pt_series(&scheme(2)).unwrap().len(), 2);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_open_bad_pattern() {
        let root = temp_root("pattern");
        fs::create_dir_all(&root).unwrap();
        let err = HistogramArchive::open(&root, "hMass[.csv").unwrap_err();
        assert!(matches!(err, YieldError::InvalidArgument(_)));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_open_missing_path() {
        let err = HistogramArchive::open(Path::new("/nonexistent/lambda-yield"), "*.csv")
            .unwrap_err();
        assert!(matches!(err, YieldError::FileNotFound { .. }));
    }
}
