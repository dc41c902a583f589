// crates/les_dynamic/src/diagnostics.rs

//! 诊断统计
//!
//! 每次 update 生成一份 [`StepReport`]，通过 tracing 输出并可由调用方读取。

use serde::{Deserialize, Serialize};

use les_numerics::linear_algebra::SolveStatistics;

use crate::traits::UpdateKind;

/// 场的最小/最大/平均值
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// 最小值
    pub min: f64,
    /// 最大值
    pub max: f64,
    /// 算术平均
    pub mean: f64,
}

impl FieldStatistics {
    /// 统计切片（空切片得到全零）
    pub fn from_slice(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Self {
            min,
            max,
            mean: sum / values.len() as f64,
        }
    }
}

impl std::fmt::Display for FieldStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min={:.4e} max={:.4e} mean={:.4e}",
            self.min, self.max, self.mean
        )
    }
}

/// 线性求解汇总（可序列化）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    /// 求解次数
    pub solves: usize,
    /// 累计迭代次数
    pub iterations: usize,
    /// 未收敛次数
    pub unconverged: usize,
}

impl From<SolveStatistics> for SolveSummary {
    fn from(stats: SolveStatistics) -> Self {
        Self {
            solves: stats.solves,
            iterations: stats.iterations,
            unconverged: stats.unconverged,
        }
    }
}

/// 单步诊断报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// 时间步编号
    pub tstep: u64,
    /// 更新类型
    pub kind: UpdateKind,
    /// Cs² 统计
    pub coefficient: FieldStatistics,
    /// 涡粘性统计
    pub nut: FieldStatistics,
    /// J_LM 统计
    pub jlm: FieldStatistics,
    /// J_MM 统计
    pub jmm: FieldStatistics,
    /// 应变率求解
    pub strain_solves: SolveSummary,
    /// nut 投影求解
    pub nut_solves: SolveSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_statistics() {
        let stats = FieldStatistics::from_slice(&[1.0, -2.0, 4.0]);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 1.0).abs() < 1e-15);
        assert_eq!(FieldStatistics::from_slice(&[]), FieldStatistics::default());
        assert!(stats.to_string().contains("max=4.0000e0"));
    }

    #[test]
    fn test_solve_summary_from_statistics() {
        let stats = SolveStatistics {
            solves: 3,
            iterations: 12,
            unconverged: 1,
            worst_relative_residual: 0.5,
        };
        let summary = SolveSummary::from(stats);
        assert_eq!(summary.solves, 3);
        assert_eq!(summary.unconverged, 1);
    }
}
