//! # 不变质量直方图数据模型
//!
//! 一个 pT bin 对应一个 `MassHistogram`：按 bin 中心排列的 (中心, 计数) 序列。
//! 构造时即校验分 bin：中心严格递增、宽度均匀、计数有限且非负。
//! 构造完成后不可修改。
//!
//! ## 依赖关系
//! - 被 `parsers/histogram.rs` 构造
//! - 被 `fit/` 读取

use crate::error::{Result, YieldError};

/// bin 宽度均匀性的相对容差（CSV 导出通常只保留有限位小数）
const UNIFORM_WIDTH_TOLERANCE: f64 = 1e-3;

/// 不变质量直方图（不可变）
#[derive(Debug, Clone, PartialEq)]
pub struct MassHistogram {
    name: String,
    centers: Vec<f64>,
    counts: Vec<f64>,
    width: f64,
}

impl MassHistogram {
    /// 从 bin 中心和计数创建，并校验分 bin
    pub fn new(name: impl Into<String>, centers: Vec<f64>, counts: Vec<f64>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| YieldError::InvalidHistogram {
            name: name.clone(),
            reason,
        };

        if centers.len() != counts.len() {
            return Err(invalid(format!(
                "{} bin centers but {} counts",
                centers.len(),
                counts.len()
            )));
        }
        if centers.len() < 2 {
            return Err(invalid(format!(
                "at least 2 bins required, got {}",
                centers.len()
            )));
        }
        if let Some(i) = centers.iter().position(|c| !c.is_finite()) {
            return Err(invalid(format!("bin center #{} is not finite", i)));
        }
        if let Some(i) = counts.iter().position(|c| !c.is_finite() || *c < 0.0) {
            return Err(invalid(format!(
                "bin #{} has invalid count {}",
                i, counts[i]
            )));
        }

        let n = centers.len();
        let width = (centers[n - 1] - centers[0]) / (n - 1) as f64;
        if width <= 0.0 {
            return Err(invalid("bin centers must be strictly increasing".to_string()));
        }

        for (i, pair) in centers.windows(2).enumerate() {
            let step = pair[1] - pair[0];
            if step <= 0.0 {
                return Err(invalid(format!(
                    "bin centers must be strictly increasing (bin #{})",
                    i + 1
                )));
            }
            if (step - width).abs() > UNIFORM_WIDTH_TOLERANCE * width {
                return Err(invalid(format!(
                    "non-uniform bin width at bin #{}: {:.6e} vs {:.6e}",
                    i + 1,
                    step,
                    width
                )));
            }
        }

        Ok(MassHistogram {
            name,
            centers,
            counts,
            width,
        })
    }

    /// 从固定范围 [low, high) 和计数创建均匀分 bin 的直方图
    #[cfg(test)]
    pub fn from_range(name: impl Into<String>, low: f64, high: f64, counts: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if !(high > low) || counts.is_empty() {
            return Err(YieldError::InvalidHistogram {
                name,
                reason: format!("invalid range {}-{} for {} bins", low, high, counts.len()),
            });
        }
        let width = (high - low) / counts.len() as f64;
        let centers = (0..counts.len())
            .map(|i| low + (i as f64 + 0.5) * width)
            .collect();
        Self::new(name, centers, counts)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn bin_width(&self) -> f64 {
        self.width
    }

    /// 直方图覆盖的质量范围 (低边界, 高边界)
    pub fn range(&self) -> (f64, f64) {
        let half = self.width / 2.0;
        (
            self.centers[0] - half,
            self.centers[self.centers.len() - 1] + half,
        )
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    #[cfg(test)]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// 遍历 (bin 中心, 计数)
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.centers.iter().copied().zip(self.counts.iter().copied())
    }

    /// 中心落在 [low, high] 内的 bin
    pub fn window(&self, low: f64, high: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.iter().filter(move |(m, _)| *m >= low && *m <= high)
    }

    /// 总计数
    pub fn entries(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// 窗口内的总计数
    pub fn entries_in(&self, low: f64, high: f64) -> f64 {
        self.window(low, high).map(|(_, c)| c).sum()
    }

    /// 窗口内的最大计数
    pub fn max_count_in(&self, low: f64, high: f64) -> f64 {
        self.window(low, high).map(|(_, c)| c).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_range_uniform() {
        let h = MassHistogram::from_range("h", 1.05, 1.2, vec![1.0; 200]).unwrap();
        assert_eq!(h.len(), 200);
        assert!((h.bin_width() - 0.00075).abs() < 1e-12);
        let (lo, hi) = h.range();
        assert!((lo - 1.05).abs() < 1e-9);
        assert!((hi - 1.2).abs() < 1e-9);
        assert!((h.entries() - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_uniform_width() {
        let err = MassHistogram::new("h", vec![1.0, 1.1, 1.3], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, YieldError::InvalidHistogram { .. }));
    }

    #[test]
    fn test_rejects_decreasing_centers() {
        let err = MassHistogram::new("h", vec![1.2, 1.1, 1.0], vec![0.0; 3]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_rejects_negative_count() {
        let err = MassHistogram::new("h", vec![1.0, 1.1, 1.2], vec![1.0, -2.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("invalid count"));
    }

    #[test]
    fn test_window_selection() {
        let h = MassHistogram::from_range("h", 1.0, 1.5, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        // 中心: 1.05 1.15 1.25 1.35 1.45
        assert_eq!(h.window(1.1, 1.3).count(), 2);
        assert!((h.entries_in(1.1, 1.3) - 5.0).abs() < 1e-12);
        assert!((h.max_count_in(1.0, 1.5) - 5.0).abs() < 1e-12);
    }
}
