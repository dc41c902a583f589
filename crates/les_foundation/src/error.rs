// crates/les_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `LesError` 枚举和 `LesResult` 类型别名。
//!
//! # 错误分类
//!
//! 1. **配置期错误**: 网格/边界条件/配置不匹配，在 setup 阶段立即返回
//! 2. **运行期错误**: 仅在显式要求 `error_on_nonconvergence` 时才会出现
//!
//! 数值上的不规则（迭代不收敛、比值异常）在运行期被吸收，不会中断外层时间推进。
//!
//! # 示例
//!
//! ```
//! use les_foundation::error::{LesError, LesResult};
//!
//! fn check_interval(k: usize) -> LesResult<()> {
//!     if k == 0 {
//!         return Err(LesError::config("recompute_interval", k, "必须 >= 1"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_interval(0).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type LesResult<T> = Result<T, LesError>;

/// 亚格子模型错误类型
#[derive(Error, Debug)]
pub enum LesError {
    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 空间维度不匹配
    #[error("空间维度不匹配: {context} 期望{expected}维, 实际{actual}维")]
    DimensionMismatch {
        /// 出错位置
        context: &'static str,
        /// 期望维度
        expected: usize,
        /// 实际维度
        actual: usize,
    },

    /// 无效网格
    #[error("无效的网格: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 边界条件与速度分量/函数空间不匹配
    #[error("边界条件不匹配: {message}")]
    BoundaryMismatch {
        /// 具体错误信息
        message: String,
    },

    /// 线性求解失败（仅在要求报错时产生）
    #[error("线性求解失败: {solver} 经过 {iterations} 次迭代, 相对残差 {relative_residual:.3e}")]
    SolverFailed {
        /// 求解器名称
        solver: &'static str,
        /// 迭代次数
        iterations: usize,
        /// 最终相对残差
        relative_residual: f64,
    },

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },
}

impl LesError {
    /// 创建配置错误
    pub fn config(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 创建大小不匹配错误
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 创建维度不匹配错误
    pub fn dimension_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }

    /// 创建网格错误
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 创建边界条件不匹配错误
    pub fn boundary_mismatch(message: impl Into<String>) -> Self {
        Self::BoundaryMismatch {
            message: message.into(),
        }
    }

    /// 创建 IO 错误
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 创建序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 是否为 setup 阶段的致命配置错误
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. }
                | Self::DimensionMismatch { .. }
                | Self::InvalidMesh { .. }
                | Self::InvalidConfig { .. }
                | Self::BoundaryMismatch { .. }
        )
    }
}
