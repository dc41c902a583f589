// crates/les_foundation/src/dimension.rs

//! 空间维度与对称张量布局
//!
//! d×d 对称张量只存储上三角的 `tensdim` 个独立分量：
//!
//! ```text
//! 2D: (0,0) (0,1) (1,1)                         tensdim = 3
//! 3D: (0,0) (0,1) (0,2) (1,1) (1,2) (2,2)       tensdim = 6
//! ```
//!
//! 分量顺序由静态表 [`PAIRS_2D`] / [`PAIRS_3D`] 固定，张量的构建方与使用方
//! 必须通过本模块取索引，不允许各自硬编码。
//!
//! # 用法
//!
//! ```
//! use les_foundation::dimension::SpatialDim;
//!
//! let dim = SpatialDim::Three;
//! assert_eq!(dim.tensor_dim(), 6);
//! assert_eq!(dim.component_index(2, 1), dim.component_index(1, 2));
//! assert_eq!(dim.pairs()[4], (1, 2));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LesError, LesResult};

/// 对称张量的最大独立分量数（3D）
pub const MAX_TENSOR_DIM: usize = 6;

/// 2D 上三角分量表
pub const PAIRS_2D: [(usize, usize); 3] = [(0, 0), (0, 1), (1, 1)];

/// 3D 上三角分量表
pub const PAIRS_3D: [(usize, usize); 6] = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];

/// 分量表必须按行优先列出全部 i <= j 的组合
const fn pairs_are_upper_triangular(pairs: &[(usize, usize)], dim: usize) -> bool {
    let mut k = 0;
    let mut i = 0;
    while i < dim {
        let mut j = i;
        while j < dim {
            if k >= pairs.len() || pairs[k].0 != i || pairs[k].1 != j {
                return false;
            }
            k += 1;
            j += 1;
        }
        i += 1;
    }
    k == pairs.len()
}

const _: () = assert!(pairs_are_upper_triangular(&PAIRS_2D, 2));
const _: () = assert!(pairs_are_upper_triangular(&PAIRS_3D, 3));

/// 空间维度（网格几何维度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialDim {
    /// 二维（三角形网格）
    Two,
    /// 三维（四面体网格）
    Three,
}

impl SpatialDim {
    /// 从数值维度构造
    pub fn from_usize(d: usize) -> LesResult<Self> {
        match d {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(LesError::dimension_mismatch("SpatialDim", 3, other)),
        }
    }

    /// 数值维度
    #[inline]
    pub const fn get(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// 单纯形单元的顶点数（d + 1）
    #[inline]
    pub const fn vertices_per_cell(self) -> usize {
        self.get() + 1
    }

    /// 对称张量的独立分量数
    #[inline]
    pub const fn tensor_dim(self) -> usize {
        match self {
            Self::Two => 3,
            Self::Three => 6,
        }
    }

    /// 上三角分量表
    #[inline]
    pub const fn pairs(self) -> &'static [(usize, usize)] {
        match self {
            Self::Two => &PAIRS_2D,
            Self::Three => &PAIRS_3D,
        }
    }

    /// (i, j) 对应的存储索引，(i, j) 与 (j, i) 映射到同一位置
    ///
    /// # Panics
    /// - `i` 或 `j` 超出维度
    #[inline]
    pub fn component_index(self, i: usize, j: usize) -> usize {
        let d = self.get();
        assert!(i < d && j < d, "张量下标越界: ({}, {}) 维度 {}", i, j, d);
        let (a, b) = if i <= j { (i, j) } else { (j, i) };
        // 行 a 之前共有 a(2d - a + 1)/2 个分量
        a * (2 * d - a + 1) / 2 + (b - a)
    }

    /// 双点积 A:B 中第 k 个分量的权重（对角 1，非对角 2）
    #[inline]
    pub fn contraction_weight(self, k: usize) -> f64 {
        let (i, j) = self.pairs()[k];
        if i == j {
            1.0
        } else {
            2.0
        }
    }

    /// 名称（日志用）
    pub fn name(self) -> &'static str {
        match self {
            Self::Two => "2D",
            Self::Three => "3D",
        }
    }
}
