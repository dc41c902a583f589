// crates/les_numerics/src/linear_algebra/krylov.rs

//! Krylov 求解器选择
//!
//! 将"求解器种类 + 预条件器 + 容差"打包为可序列化的 [`SolverSelection`]，
//! 并由 [`KrylovSolver`] 在运行时分派到具体实现。
//!
//! 同一个 [`KrylovSolver`] 针对同一矩阵反复求解（不同右端项），
//! 预条件器只在构造时建立一次。
//!
//! 未收敛的处理：
//! - `error_on_nonconvergence = false`（默认）：记录 debug 日志，保留最后迭代值，返回 `Ok`
//! - `error_on_nonconvergence = true`：返回 [`LesError::SolverFailed`]
//!
//! # 示例
//!
//! ```
//! use les_numerics::linear_algebra::{CsrMatrix, KrylovSolver, SolverSelection};
//!
//! let matrix = CsrMatrix::diagonal(&[1.0, 2.0]);
//! let mut solver = KrylovSolver::for_matrix(SolverSelection::default(), &matrix);
//! let mut x = vec![0.0; 2];
//! solver.solve(&matrix, &[1.0, 1.0], &mut x).unwrap();
//! assert!((x[1] - 0.5).abs() < 1e-10);
//! ```

use serde::{Deserialize, Serialize};

use les_foundation::error::{LesError, LesResult};

use super::csr::CsrMatrix;
use super::preconditioner::{Preconditioner, PreconditionerKind};
use super::solver::{
    BiCgStabSolver, ConjugateGradient, IterativeSolver, PcgSolver, SolverConfig, SolverResult,
};

/// 求解器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// 无预条件共轭梯度
    Cg,
    /// 预条件共轭梯度
    #[default]
    Pcg,
    /// BiCGStab
    BiCgStab,
}

/// 求解器选择（配置用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSelection {
    /// 求解器种类
    #[serde(default)]
    pub kind: SolverKind,
    /// 预条件器
    #[serde(default)]
    pub preconditioner: PreconditionerKind,
    /// 相对容差
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// 绝对容差
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// 未收敛时是否报错
    #[serde(default)]
    pub error_on_nonconvergence: bool,
    /// 是否输出每次迭代的残差
    #[serde(default)]
    pub verbose: bool,
}

fn default_rtol() -> f64 {
    1e-10
}
fn default_atol() -> f64 {
    1e-14
}
fn default_max_iter() -> usize {
    500
}

impl Default for SolverSelection {
    fn default() -> Self {
        Self {
            kind: SolverKind::default(),
            preconditioner: PreconditionerKind::default(),
            rtol: default_rtol(),
            atol: default_atol(),
            max_iter: default_max_iter(),
            error_on_nonconvergence: false,
            verbose: false,
        }
    }
}

impl SolverSelection {
    /// 验证配置
    pub fn validate(&self, key: &str) -> LesResult<()> {
        if !(self.rtol > 0.0 && self.rtol < 1.0) {
            return Err(LesError::config(
                format!("{key}.rtol"),
                self.rtol,
                "必须在 (0, 1) 之间",
            ));
        }
        if !(self.atol >= 0.0) {
            return Err(LesError::config(format!("{key}.atol"), self.atol, "不能为负"));
        }
        if self.max_iter == 0 {
            return Err(LesError::config(
                format!("{key}.max_iter"),
                self.max_iter,
                "必须 >= 1",
            ));
        }
        Ok(())
    }

    /// 转换为底层求解器配置
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            rtol: self.rtol,
            atol: self.atol,
            max_iter: self.max_iter,
            verbose: self.verbose,
        }
    }
}

enum SolverImpl {
    Cg(ConjugateGradient),
    Pcg(PcgSolver),
    BiCgStab(BiCgStabSolver),
}

impl SolverImpl {
    fn new(kind: SolverKind, config: SolverConfig) -> Self {
        match kind {
            SolverKind::Cg => Self::Cg(ConjugateGradient::new(config)),
            SolverKind::Pcg => Self::Pcg(PcgSolver::new(config)),
            SolverKind::BiCgStab => Self::BiCgStab(BiCgStabSolver::new(config)),
        }
    }

    fn solve(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &dyn Preconditioner,
    ) -> SolverResult {
        match self {
            Self::Cg(s) => s.solve(matrix, b, x, precond),
            Self::Pcg(s) => s.solve(matrix, b, x, precond),
            Self::BiCgStab(s) => s.solve(matrix, b, x, precond),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Cg(s) => s.name(),
            Self::Pcg(s) => s.name(),
            Self::BiCgStab(s) => s.name(),
        }
    }
}

/// 累计求解统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStatistics {
    /// 求解次数
    pub solves: usize,
    /// 累计迭代次数
    pub iterations: usize,
    /// 未收敛次数
    pub unconverged: usize,
    /// 所有求解中最大的相对残差
    pub worst_relative_residual: f64,
}

impl SolveStatistics {
    fn record(&mut self, result: &SolverResult) {
        self.solves += 1;
        self.iterations += result.iterations;
        if !result.is_converged() {
            self.unconverged += 1;
        }
        if result.relative_residual > self.worst_relative_residual {
            self.worst_relative_residual = result.relative_residual;
        }
    }
}

/// 绑定到固定矩阵的 Krylov 求解器
pub struct KrylovSolver {
    selection: SolverSelection,
    inner: SolverImpl,
    precond: Box<dyn Preconditioner>,
    stats: SolveStatistics,
}

impl KrylovSolver {
    /// 针对矩阵构造求解器（预条件器立即建立）
    pub fn for_matrix(selection: SolverSelection, matrix: &CsrMatrix) -> Self {
        let inner = SolverImpl::new(selection.kind, selection.solver_config());
        let precond = selection.preconditioner.build(matrix);
        Self {
            selection,
            inner,
            precond,
            stats: SolveStatistics::default(),
        }
    }

    /// 当前选择
    pub fn selection(&self) -> &SolverSelection {
        &self.selection
    }

    /// 求解器名称
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// 求解 A x = b，`x` 作为初始猜测输入
    ///
    /// `matrix` 必须与构造时的矩阵一致（预条件器不会重建）。
    pub fn solve(&mut self, matrix: &CsrMatrix, b: &[f64], x: &mut [f64]) -> LesResult<SolverResult> {
        if b.len() != matrix.n_rows() {
            return Err(LesError::size_mismatch("rhs", matrix.n_rows(), b.len()));
        }
        if x.len() != matrix.n_cols() {
            return Err(LesError::size_mismatch("solution", matrix.n_cols(), x.len()));
        }

        let result = self.inner.solve(matrix, b, x, self.precond.as_ref());
        self.stats.record(&result);

        if !result.is_converged() {
            if self.selection.error_on_nonconvergence {
                return Err(LesError::SolverFailed {
                    solver: self.inner.name(),
                    iterations: result.iterations,
                    relative_residual: result.relative_residual,
                });
            }
            log::debug!(
                "{} 未收敛 ({:?}): {} 次迭代, 相对残差 {:.3e}, 保留最后迭代值",
                self.inner.name(),
                result.status,
                result.iterations,
                result.relative_residual
            );
        }
        Ok(result)
    }

    /// 取出并清零累计统计
    pub fn take_statistics(&mut self) -> SolveStatistics {
        std::mem::take(&mut self.stats)
    }
}

impl std::fmt::Debug for KrylovSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrylovSolver")
            .field("solver", &self.inner.name())
            .field("preconditioner", &self.precond.name())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_algebra::csr::CsrBuilder;

    fn laplacian_1d(n: usize) -> CsrMatrix {
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n {
            builder.set(i, i, 2.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                builder.set(i, i + 1, -1.0);
            }
        }
        builder.build()
    }

    #[test]
    fn test_all_kinds_converge() {
        let matrix = laplacian_1d(20);
        let b = vec![1.0; 20];
        for kind in [SolverKind::Cg, SolverKind::Pcg, SolverKind::BiCgStab] {
            let selection = SolverSelection {
                kind,
                ..Default::default()
            };
            let mut solver = KrylovSolver::for_matrix(selection, &matrix);
            let mut x = vec![0.0; 20];
            let result = solver.solve(&matrix, &b, &mut x).unwrap();
            assert!(result.is_converged(), "{:?} 未收敛", kind);
            assert_eq!(solver.take_statistics().solves, 1);
        }
    }

    #[test]
    fn test_nonconvergence_tolerated() {
        let matrix = laplacian_1d(50);
        let b = vec![1.0; 50];
        let selection = SolverSelection {
            max_iter: 1,
            ..Default::default()
        };
        let mut solver = KrylovSolver::for_matrix(selection, &matrix);
        let mut x = vec![0.0; 50];
        let result = solver.solve(&matrix, &b, &mut x).unwrap();
        assert!(!result.is_converged());
        // 保留了一次迭代的结果
        assert!(x.iter().any(|&v| v != 0.0));

        let stats = solver.take_statistics();
        assert_eq!(stats.unconverged, 1);
        assert_eq!(solver.take_statistics().solves, 0);
    }

    #[test]
    fn test_nonconvergence_error_when_requested() {
        let matrix = laplacian_1d(50);
        let selection = SolverSelection {
            max_iter: 1,
            error_on_nonconvergence: true,
            ..Default::default()
        };
        let mut solver = KrylovSolver::for_matrix(selection, &matrix);
        let mut x = vec![0.0; 50];
        let err = solver.solve(&matrix, &vec![1.0; 50], &mut x).unwrap_err();
        assert!(matches!(err, LesError::SolverFailed { .. }));
    }

    #[test]
    fn test_size_mismatch() {
        let matrix = laplacian_1d(4);
        let mut solver = KrylovSolver::for_matrix(SolverSelection::default(), &matrix);
        let mut x = vec![0.0; 3];
        assert!(solver.solve(&matrix, &[1.0; 4], &mut x).is_err());
    }

    #[test]
    fn test_selection_validate_and_serde() {
        assert!(SolverSelection::default().validate("strain_solver").is_ok());
        let bad = SolverSelection {
            rtol: 0.0,
            ..Default::default()
        };
        assert!(bad.validate("strain_solver").is_err());

        let parsed: SolverSelection =
            serde_json::from_str(r#"{"kind": "bi_cg_stab", "preconditioner": "identity"}"#).unwrap();
        assert_eq!(parsed.kind, SolverKind::BiCgStab);
        assert_eq!(parsed.preconditioner, PreconditionerKind::Identity);
        assert_eq!(parsed.max_iter, 500);
    }
}
