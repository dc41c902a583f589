// crates/les_numerics/src/linear_algebra/mod.rs

//! 稀疏线性代数模块
//!
//! 提供有限元算子所需的稀疏矩阵、预条件器和迭代求解器。
//!
//! # 分层
//!
//! - **基础类型**: [`CsrMatrix`]、[`CsrBuilder`]
//! - **向量运算**: [`vector_ops`]
//! - **预条件器**: [`Preconditioner`] trait 及其实现
//! - **迭代求解器**: [`IterativeSolver`] trait 及 CG/PCG/BiCGStab
//! - **运行时选择**: [`KrylovSolver`] + [`SolverSelection`]

pub mod csr;
pub mod krylov;
pub mod preconditioner;
pub mod solver;
pub mod vector_ops;

pub use csr::{CsrBuilder, CsrMatrix};

pub use preconditioner::{
    IdentityPreconditioner, JacobiPreconditioner, Preconditioner, PreconditionerKind,
};

pub use solver::{
    BiCgStabSolver, ConjugateGradient, IterativeSolver, PcgSolver, SolverConfig, SolverResult,
    SolverStatus,
};

pub use krylov::{KrylovSolver, SolveStatistics, SolverKind, SolverSelection};
