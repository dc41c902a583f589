// crates/les_foundation/src/lib.rs

//! 基础层
//!
//! 整个工作区共享的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`dimension`]: 空间维度与对称张量分量表
//! - [`validation`]: 运行时验证工具
//!
//! # 设计原则
//!
//! 1. **最少依赖**: 仅依赖 serde 和 thiserror
//! 2. **静态布局**: 张量分量顺序在编译期固定

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dimension;
pub mod error;
pub mod validation;

// 重导出常用类型
pub use dimension::{SpatialDim, MAX_TENSOR_DIM, PAIRS_2D, PAIRS_3D};
pub use error::{LesError, LesResult};
