// crates/les_dynamic/src/traits.rs

//! 亚格子闭合 trait
//!
//! 外部 Navier–Stokes 求解器通过 [`EddyViscosityModel`] 与闭合模型交互：
//! 每个时间步调用一次 [`EddyViscosityModel::update`]，然后读取涡粘性场。

use serde::{Deserialize, Serialize};

use les_fem::VelocityField;
use les_foundation::error::{LesError, LesResult};

/// 速度梯度张量（3×3，二维时第三行列为零）
///
/// `g[i][j] = ∂u_i/∂x_j`
///
/// # 应变率模
///
/// ```text
/// S_ij = (g_ij + g_ji) / 2
/// |S|  = √(2 S_ij S_ij)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityGradient {
    /// ∂u_i/∂x_j
    pub g: [[f64; 3]; 3],
}

impl VelocityGradient {
    /// 由分量创建
    #[inline]
    pub fn new(g: [[f64; 3]; 3]) -> Self {
        Self { g }
    }

    /// 应变率分量 S_ij
    #[inline]
    pub fn strain_rate(&self, i: usize, j: usize) -> f64 {
        0.5 * (self.g[i][j] + self.g[j][i])
    }

    /// 应变率张量的模 √(2 S:S)
    #[inline]
    pub fn strain_rate_magnitude(&self) -> f64 {
        let mut ss = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                let s = self.strain_rate(i, j);
                ss += s * s;
            }
        }
        (2.0 * ss).sqrt()
    }
}

/// 单步调用上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// 外部求解器的时间步编号
    pub tstep: u64,
    /// 时间步长
    pub dt: f64,
}

impl StepContext {
    /// 创建并验证
    pub fn new(tstep: u64, dt: f64) -> LesResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(LesError::config("dt", dt, "必须为有限正数"));
        }
        Ok(Self { tstep, dt })
    }
}

/// 单步更新的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// 跳过系数计算，仅刷新 nut
    Skipped,
    /// 完整重算系数
    Recomputed,
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Recomputed => write!(f, "recomputed"),
        }
    }
}

/// 涡粘性闭合模型 trait
pub trait EddyViscosityModel: Send + Sync {
    /// 模型名称
    fn name(&self) -> &'static str;

    /// 涡粘性场（CG1 节点值）
    fn eddy_viscosity(&self) -> &[f64];

    /// 模型系数场（动态模型为 Cs²）
    fn coefficient(&self) -> &[f64];

    /// 单个节点的涡粘性
    fn get_eddy_viscosity(&self, dof: usize) -> f64 {
        self.eddy_viscosity().get(dof).copied().unwrap_or(0.0)
    }

    /// 基于当前速度场更新
    fn update(&mut self, velocity: &dyn VelocityField, ctx: StepContext) -> LesResult<UpdateKind>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_gradient_strain_rate() {
        // 纯剪切流: u = y
        let grad = VelocityGradient::new([[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        assert!((grad.strain_rate(0, 1) - 0.5).abs() < 1e-15);
        assert!((grad.strain_rate_magnitude() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_rotation_has_no_strain() {
        // 刚体旋转: u = -y, v = x
        let grad = VelocityGradient::new([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        assert!(grad.strain_rate_magnitude() < 1e-15);
    }

    #[test]
    fn test_velocity_gradient_diagonal() {
        let grad = VelocityGradient::new([[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, -5.0]]);
        // 2(4 + 9 + 25) = 76
        assert!((grad.strain_rate_magnitude() - 76.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_step_context() {
        assert!(StepContext::new(3, 0.01).is_ok());
        assert!(StepContext::new(3, 0.0).is_err());
        assert!(StepContext::new(3, f64::INFINITY).is_err());
    }
}
