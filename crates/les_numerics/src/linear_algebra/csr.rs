// crates/les_numerics/src/linear_algebra/csr.rs

//! 压缩稀疏行（CSR）矩阵
//!
//! P1 组装得到的质量矩阵与导数矩阵都以 CSR 存储。同一网格上的矩阵
//! 具有相同的顶点邻接模式，但各自持有一份索引。
//!
//! # 特性开关
//!
//! - `parallel`: 矩阵-向量乘按行用 `rayon` 并行
//!
//! # 使用示例
//!
//! ```
//! use les_numerics::linear_algebra::{CsrBuilder, CsrMatrix};
//!
//! let mut builder = CsrBuilder::new_square(3);
//! builder.add(0, 0, 4.0);
//! builder.add(0, 1, -1.0);
//! builder.add(1, 0, -1.0);
//! builder.add(1, 1, 4.0);
//! builder.add(2, 2, 4.0);
//! let matrix: CsrMatrix = builder.build();
//!
//! let mut y = vec![0.0; 3];
//! matrix.mul_vec(&[1.0, 2.0, 3.0], &mut y);
//! assert_eq!(y, vec![2.0, 7.0, 12.0]);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use std::collections::BTreeMap;

/// CSR 格式稀疏矩阵
///
/// - `row_ptr`: 长度 n_rows + 1
/// - `col_idx`: 每行内升序
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// 对角矩阵
    pub fn diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: diag.to_vec(),
        }
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 非零元值
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    fn row_range(&self, row: usize) -> std::ops::Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    #[inline]
    fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        self.row_range(row)
            .map(|k| self.values[k] * x[self.col_idx[k]])
            .sum()
    }

    /// (row, col) 处的值，不在模式中时为 0
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_range(row);
        let start = range.start;
        self.col_idx[range]
            .binary_search(&col)
            .map_or(0.0, |local| self.values[start + local])
    }

    /// 第 row 行的 (列, 值)
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.row_range(row)
            .map(move |k| (self.col_idx[k], self.values[k]))
    }

    /// 对角线（缺失的对角元取 0）
    pub fn extract_diagonal(&self) -> Vec<f64> {
        (0..self.n_rows).map(|i| self.get(i, i)).collect()
    }

    /// y = A x
    ///
    /// # Panics
    /// `x`、`y` 长度与矩阵列数、行数不符时
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols, "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows, "y 长度必须等于矩阵行数");

        #[cfg(feature = "parallel")]
        y.par_iter_mut()
            .enumerate()
            .for_each(|(row, out)| *out = self.row_dot(row, x));

        #[cfg(not(feature = "parallel"))]
        for (row, out) in y.iter_mut().enumerate() {
            *out = self.row_dot(row, x);
        }
    }
}

// =============================================================================
// 构建器
// =============================================================================

/// CSR 矩阵构建器
///
/// 逐单元组装时用 [`add`](Self::add) 累加单元贡献，最后一次性压缩。
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    /// 方阵构建器
    #[inline]
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// 创建构建器
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// 覆盖 (row, col) 的值
    ///
    /// # Panics
    /// 索引越界时
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(col < self.n_cols, "列索引越界");
        self.rows[row].insert(col, value);
    }

    /// 累加到 (row, col)
    ///
    /// # Panics
    /// 索引越界时
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(col < self.n_cols, "列索引越界");
        *self.rows[row].entry(col).or_insert(0.0) += value;
    }

    /// 压缩为 CSR 矩阵
    pub fn build(self) -> CsrMatrix {
        let n_rows = self.rows.len();
        let nnz = self.rows.iter().map(BTreeMap::len).sum();
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for entries in self.rows {
            let (cols, vals): (Vec<usize>, Vec<f64>) = entries.into_iter().unzip();
            col_idx.extend(cols);
            values.extend(vals);
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}
