// crates/les_fem/src/lib.rs

//! 有限元底座
//!
//! 为亚格子模型提供最小的 P1 有限元支撑：单纯形网格、CG1 空间、
//! 质量/导数矩阵组装、L2 投影、节点插值与 Dirichlet 条件。
//!
//! # 模块概览
//!
//! - [`mesh`]: 三角形/四面体网格与生成器
//! - [`space`]: CG1 单元几何（体积、基函数梯度）
//! - [`forms`]: 支持的变分形式
//! - [`discretization`]: [`Discretization`] trait 与 [`P1Discretization`]
//! - [`bc`]: 边界条件描述与离散
//! - [`velocity`]: 速度场来源

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bc;
pub mod discretization;
pub mod forms;
pub mod mesh;
pub mod space;
pub mod velocity;

pub use bc::{
    apply_all, BcValue, BoundarySpec, DirichletBc, SubDomain, VelocityBoundaryConditions,
};
pub use discretization::{CellLocation, Discretization, P1Discretization};
pub use forms::{BilinearForm, LinearForm};
pub use mesh::SimplexMesh;
pub use space::Cg1Space;
pub use velocity::{AnalyticVelocity, NodalVelocity, VelocityField};
