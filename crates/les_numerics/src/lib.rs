// crates/les_numerics/src/lib.rs

//! 数值层
//!
//! 稀疏矩阵与 Krylov 迭代求解器，服务于 P1 有限元算子：
//! 质量矩阵求解（应变率、投影）以及滤波中的矩阵-向量乘。
//!
//! # 特性
//!
//! - `parallel`: 使用 rayon 并行化稀疏矩阵-向量乘

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod linear_algebra;

pub use linear_algebra::{
    CsrBuilder, CsrMatrix, KrylovSolver, SolveStatistics, SolverKind, SolverResult,
    SolverSelection,
};
