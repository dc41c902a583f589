// crates/les_dynamic/src/lib.rs

//! 动态 Lagrangian Smagorinsky 亚格子模型
//!
//! 大涡模拟的涡粘性闭合：每个时间步由已解析速度场经 Germano 恒等式
//! 估计局部 Smagorinsky 系数 Cs²，沿流体质点轨迹做 Lagrangian 平均，
//! 输出 CG1 节点上的涡粘性 nut。
//!
//! # 模块概览
//!
//! - [`config`]: 模型配置（JSON 可加载）
//! - [`tensor`]: 对称张量场存储
//! - [`filter`]: 盒式滤波
//! - [`strain`]: 应变率张量与模
//! - [`germano`]: L_ij 与 M_ij
//! - [`lagrangian`]: J_LM / J_MM 路径平均
//! - [`model`]: [`DynamicLagrangianModel`] 协调器
//! - [`traits`]: [`EddyViscosityModel`] 等接口类型
//! - [`diagnostics`]: 单步诊断报告
//!
//! # 使用示例
//!
//! ```
//! use std::sync::Arc;
//! use les_dynamic::{DynamicLagrangianModel, DynamicSmagorinskyConfig, StepContext};
//! use les_fem::{NodalVelocity, P1Discretization, SimplexMesh, VelocityBoundaryConditions};
//! use les_foundation::SpatialDim;
//!
//! let disc = Arc::new(P1Discretization::new(SimplexMesh::unit_square(4, 4).unwrap()));
//! let mut model = DynamicLagrangianModel::setup(
//!     disc,
//!     &VelocityBoundaryConditions::new(),
//!     &["u0", "u1"],
//!     DynamicSmagorinskyConfig::default(),
//! )
//! .unwrap();
//!
//! let u = NodalVelocity::zeros(SpatialDim::Two, 25);
//! model.step(&u, StepContext::new(0, 0.01).unwrap()).unwrap();
//! assert!(model.state().nut.iter().all(|&v| v.abs() < 1e-12));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod filter;
pub mod germano;
pub mod lagrangian;
pub mod model;
pub mod strain;
pub mod tensor;
pub mod traits;

pub use config::{DynamicSmagorinskyConfig, LagrangianTimeScale};
pub use diagnostics::{FieldStatistics, SolveSummary, StepReport};
pub use filter::TopHatFilter;
pub use model::{DynamicLagrangianModel, LesState, PrecomputedOperators};
pub use tensor::SymmetricTensorField;
pub use traits::{EddyViscosityModel, StepContext, UpdateKind, VelocityGradient};
