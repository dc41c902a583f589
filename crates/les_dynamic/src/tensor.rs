// crates/les_dynamic/src/tensor.rs

//! 对称张量场
//!
//! d×d 对称张量场按上三角分量存储为 `tensdim` 个节点向量，
//! 分量顺序由 [`SpatialDim::pairs`] 决定。`(i, j)` 与 `(j, i)` 访问同一存储。

use les_foundation::SpatialDim;

/// 节点上的对称张量场
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricTensorField {
    dim: SpatialDim,
    n_dofs: usize,
    components: Vec<Vec<f64>>,
}

impl SymmetricTensorField {
    /// 全零张量场
    pub fn zeros(dim: SpatialDim, n_dofs: usize) -> Self {
        Self {
            dim,
            n_dofs,
            components: vec![vec![0.0; n_dofs]; dim.tensor_dim()],
        }
    }

    /// 空间维度
    #[inline]
    pub fn dim(&self) -> SpatialDim {
        self.dim
    }

    /// 自由度数
    #[inline]
    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    /// 独立分量数
    #[inline]
    pub fn tensor_dim(&self) -> usize {
        self.components.len()
    }

    /// 第 k 个存储分量
    #[inline]
    pub fn component(&self, k: usize) -> &[f64] {
        &self.components[k]
    }

    /// 第 k 个存储分量（可变）
    #[inline]
    pub fn component_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.components[k]
    }

    /// (i, j) 分量
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &[f64] {
        &self.components[self.dim.component_index(i, j)]
    }

    /// (i, j) 分量（可变）
    #[inline]
    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut [f64] {
        let k = self.dim.component_index(i, j);
        &mut self.components[k]
    }

    /// 所有分量
    #[inline]
    pub fn components(&self) -> &[Vec<f64>] {
        &self.components
    }

    /// 节点上的张量双点积 A:B（非对角分量计两次）
    #[inline]
    pub fn contract_at(&self, other: &Self, dof: usize) -> f64 {
        debug_assert_eq!(self.dim, other.dim);
        self.components
            .iter()
            .zip(other.components.iter())
            .enumerate()
            .map(|(k, (a, b))| self.dim.contraction_weight(k) * a[dof] * b[dof])
            .sum()
    }

    /// 节点上的模 sqrt(2 A:A)
    #[inline]
    pub fn magnitude_at(&self, dof: usize) -> f64 {
        (2.0 * self.contract_at(self, dof)).sqrt()
    }

    /// 所有节点上的模 sqrt(2 A:A)
    pub fn magnitude_into(&self, out: &mut [f64]) {
        for (dof, slot) in out.iter_mut().enumerate() {
            *slot = self.magnitude_at(dof);
        }
    }

    /// 所有分量的最大绝对值
    pub fn max_abs(&self) -> f64 {
        self.components
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0, |m, &v| m.max(v.abs()))
    }
}
