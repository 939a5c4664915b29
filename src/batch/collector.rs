//! # 文件收集器
//!
//! 根据输入路径和 glob 模式收集直方图导出文件列表。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配文件名（逗号分隔多模式，支持 `*`、`?`、`[...]`）
//! - 可选递归，结果按路径排序
//!
//! ## 依赖关系
//! - 被 `parsers/archive.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 编译模式

use crate::error::{Result, YieldError};

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    /// 以模式创建收集器；模式非法时报错
    pub fn new(input: PathBuf, pattern: &str) -> Result<Self> {
        let patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    YieldError::InvalidArgument(format!("Invalid pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if patterns.is_empty() {
            return Err(YieldError::InvalidArgument(format!(
                "Empty file pattern '{}'",
                pattern
            )));
        }

        Ok(Self {
            input,
            patterns,
            recursive: false,
        })
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件，单文件输入直接返回
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let walker = if self.recursive {
            WalkDir::new(&self.input)
        } else {
            WalkDir::new(&self.input).max_depth(1)
        };

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    /// 文件名是否匹配任一模式
    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.patterns.iter().any(|p| p.matches(name)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(pattern: &str) -> FileCollector {
        FileCollector::new(PathBuf::from("."), pattern).unwrap()
    }

    #[test]
    fn test_matches_glob_patterns() {
        let c = collector("hMassLambdaPt[0-9].csv");
        assert!(c.matches(Path::new("a/hMassLambdaPt3.csv")));
        assert!(!c.matches(Path::new("a/hMassLambdaPt12.csv")));

        let c = collector("*.csv, *.dat");
        assert!(c.matches(Path::new("hMassLambda.dat")));
        assert!(c.matches(Path::new("dir/hMassLambdaPt16.csv")));
        assert!(!c.matches(Path::new("hMassLambda.txt")));
    }

    #[test]
    fn test_bad_pattern_is_invalid_argument() {
        let err = FileCollector::new(PathBuf::from("."), "hMass[.csv").err().unwrap();
        assert!(matches!(err, YieldError::InvalidArgument(_)));
        let err = FileCollector::new(PathBuf::from("."), " , ").err().unwrap();
        assert!(matches!(err, YieldError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_input_collects_nothing() {
        let c = FileCollector::new(PathBuf::from("/nonexistent/lambda-yield/input"), "*.csv").unwrap();
        assert!(c.collect().is_empty());
    }
}
