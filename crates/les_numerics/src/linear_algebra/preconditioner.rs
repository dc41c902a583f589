// crates/les_numerics/src/linear_algebra/preconditioner.rs

//! 预条件器模块
//!
//! 预条件器用于加速迭代求解器的收敛：将 Ax = b 转换为 M⁻¹Ax = M⁻¹b。
//!
//! # 预条件器类型
//!
//! - [`IdentityPreconditioner`]: 恒等预条件器（无预条件）
//! - [`JacobiPreconditioner`]: Jacobi 预条件器（对角预条件）
//!
//! P1 质量矩阵是对角占优的对称正定矩阵，Jacobi 预条件已足够。
//!
//! # 使用示例
//!
//! ```
//! use les_numerics::linear_algebra::{CsrMatrix, JacobiPreconditioner, Preconditioner};
//!
//! let matrix = CsrMatrix::diagonal(&[2.0, 4.0]);
//! let precond = JacobiPreconditioner::from_matrix(&matrix);
//!
//! let r = vec![1.0, 1.0];
//! let mut z = vec![0.0; 2];
//! precond.apply(&r, &mut z);
//! assert_eq!(z, vec![0.5, 0.25]);
//! ```

use serde::{Deserialize, Serialize};

use super::csr::CsrMatrix;

/// 对角元视为零的阈值
const ZERO_DIAGONAL_THRESHOLD: f64 = 1e-300;

/// 预条件器 trait
///
/// 核心操作是 `apply`: z = M⁻¹ * r
pub trait Preconditioner: Send + Sync {
    /// 应用预条件器: z = M⁻¹ * r
    fn apply(&self, r: &[f64], z: &mut [f64]);

    /// 获取预条件器名称
    fn name(&self) -> &'static str;
}

/// 预条件器类型（配置用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    /// 无预条件
    Identity,
    /// 对角预条件
    #[default]
    Jacobi,
}

impl PreconditionerKind {
    /// 针对矩阵构造预条件器
    pub fn build(self, matrix: &CsrMatrix) -> Box<dyn Preconditioner> {
        match self {
            Self::Identity => Box::new(IdentityPreconditioner::new()),
            Self::Jacobi => Box::new(JacobiPreconditioner::from_matrix(matrix)),
        }
    }
}

/// 恒等预条件器（无预条件）
///
/// M = I，即 z = r
#[derive(Debug, Clone, Default)]
pub struct IdentityPreconditioner;

impl IdentityPreconditioner {
    /// 创建恒等预条件器
    pub fn new() -> Self {
        Self
    }
}

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        z.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "Identity"
    }
}

/// Jacobi 预条件器（对角预条件）
///
/// M = diag(A)，即 z_i = r_i / A_ii。对角元为零的行退化为单位预条件。
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// 从 CSR 矩阵创建 Jacobi 预条件器
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        Self::from_diagonal(&matrix.extract_diagonal())
    }

    /// 从对角向量创建 Jacobi 预条件器
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let inv_diag = diag
            .iter()
            .map(|&d| {
                if d.abs() > ZERO_DIAGONAL_THRESHOLD {
                    1.0 / d
                } else {
                    1.0
                }
            })
            .collect();
        Self { inv_diag }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        debug_assert_eq!(r.len(), self.inv_diag.len());
        for ((zi, &ri), &inv) in z.iter_mut().zip(r.iter()).zip(self.inv_diag.iter()) {
            *zi = ri * inv;
        }
    }

    fn name(&self) -> &'static str {
        "Jacobi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_algebra::csr::CsrBuilder;

    #[test]
    fn test_jacobi_from_assembled_matrix() {
        let mut builder = CsrBuilder::new_square(2);
        builder.add(0, 0, 2.0);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 4.0);
        let p = JacobiPreconditioner::from_matrix(&builder.build());
        let mut z = vec![0.0; 2];
        p.apply(&[1.0, 1.0], &mut z);
        assert_eq!(z, vec![0.5, 0.25]);
    }

    #[test]
    fn test_identity() {
        let p = IdentityPreconditioner::new();
        let r = vec![1.0, -2.0];
        let mut z = vec![0.0; 2];
        p.apply(&r, &mut z);
        assert_eq!(z, r);
        assert_eq!(p.name(), "Identity");
    }

    #[test]
    fn test_jacobi_zero_diagonal_fallback() {
        let p = JacobiPreconditioner::from_diagonal(&[4.0, 0.0]);
        let mut z = vec![0.0; 2];
        p.apply(&[1.0, 3.0], &mut z);
        assert_eq!(z, vec![0.25, 3.0]);
    }


    #[test]
    fn test_kind_build() {
        let m = CsrMatrix::diagonal(&[2.0, 8.0]);
        let p = PreconditionerKind::Jacobi.build(&m);
        assert_eq!(p.name(), "Jacobi");
        let p = PreconditionerKind::Identity.build(&m);
        assert_eq!(p.name(), "Identity");
        assert_eq!(PreconditionerKind::default(), PreconditionerKind::Jacobi);
    }
}
