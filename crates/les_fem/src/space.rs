// crates/les_fem/src/space.rs

//! CG1（分片线性连续）函数空间的单元几何
//!
//! 自由度即网格顶点。每个单元上基函数梯度为常数，预先计算并缓存：
//!
//! ```text
//! J = [x1 - x0, ..., xd - x0]         （按列）
//! ∇λi = J⁻¹ 的第 i 行, i = 1..d
//! ∇λ0 = -Σ ∇λi
//! ```
//!
//! 单元矩阵（|K| 为单元体积）：
//!
//! ```text
//! 质量:   M_ij = |K| (1 + δij) / ((d+1)(d+2))
//! 导数:   D_ij = |K| / (d+1) · ∂φj/∂x_axis
//! 集中:   b_i  = |K| / (d+1)
//! ```

use glam::{DMat2, DMat3, DVec2, DVec3};

use les_foundation::SpatialDim;

use crate::mesh::SimplexMesh;

/// 单元内最多顶点数（四面体）
pub const MAX_CELL_VERTICES: usize = 4;

/// CG1 空间单元几何
#[derive(Debug, Clone)]
pub struct Cg1Space {
    dim: SpatialDim,
    volumes: Vec<f64>,
    gradients: Vec<[DVec3; MAX_CELL_VERTICES]>,
}

impl Cg1Space {
    /// 从网格计算单元体积与基函数梯度
    pub fn new(mesh: &SimplexMesh) -> Self {
        let dim = mesh.dim();
        let mut volumes = Vec::with_capacity(mesh.n_cells());
        let mut gradients = Vec::with_capacity(mesh.n_cells());

        for c in 0..mesh.n_cells() {
            let pts = mesh.cell_points(c);
            volumes.push(mesh.cell_volume(c));
            gradients.push(basis_gradients(dim, &pts));
        }

        Self {
            dim,
            volumes,
            gradients,
        }
    }

    /// 空间维度
    #[inline]
    pub fn dim(&self) -> SpatialDim {
        self.dim
    }

    /// 所有单元体积
    #[inline]
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// 单元上的基函数梯度（前 d + 1 个有效）
    #[inline]
    pub fn gradients(&self, c: usize) -> &[DVec3] {
        &self.gradients[c][..self.dim.vertices_per_cell()]
    }

    /// 局部质量矩阵元素
    #[inline]
    pub fn local_mass(&self, c: usize, i: usize, j: usize) -> f64 {
        let d = self.dim.get() as f64;
        let factor = if i == j { 2.0 } else { 1.0 };
        self.volumes[c] * factor / ((d + 1.0) * (d + 2.0))
    }

    /// 局部导数矩阵元素 ∫ (∂φj/∂x_axis) φi
    #[inline]
    pub fn local_derivative(&self, c: usize, j: usize, axis: usize) -> f64 {
        self.lumped_weight(c) * self.gradients[c][j][axis]
    }

    /// 基函数在单元上的积分 ∫ φi = |K| / (d+1)
    #[inline]
    pub fn lumped_weight(&self, c: usize) -> f64 {
        self.volumes[c] / self.dim.vertices_per_cell() as f64
    }
}

/// 计算单纯形的基函数梯度
fn basis_gradients(dim: SpatialDim, pts: &[DVec3]) -> [DVec3; MAX_CELL_VERTICES] {
    let mut grads = [DVec3::ZERO; MAX_CELL_VERTICES];
    match dim {
        SpatialDim::Two => {
            let a = pts[1] - pts[0];
            let b = pts[2] - pts[0];
            let inv = DMat2::from_cols(DVec2::new(a.x, a.y), DVec2::new(b.x, b.y)).inverse();
            for i in 0..2 {
                let row = inv.row(i);
                grads[i + 1] = DVec3::new(row.x, row.y, 0.0);
            }
        }
        SpatialDim::Three => {
            let inv = DMat3::from_cols(pts[1] - pts[0], pts[2] - pts[0], pts[3] - pts[0]).inverse();
            for i in 0..3 {
                grads[i + 1] = inv.row(i);
            }
        }
    }
    let n = dim.vertices_per_cell();
    grads[0] = -grads[1..n].iter().copied().sum::<DVec3>();
    grads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_triangle_gradients() {
        let mesh = SimplexMesh::single_cell(SpatialDim::Two).unwrap();
        let space = Cg1Space::new(&mesh);
        let g = space.gradients(0);
        assert_eq!(g.len(), 3);
        assert!((g[0] - DVec3::new(-1.0, -1.0, 0.0)).length() < 1e-14);
        assert!((g[1] - DVec3::X).length() < 1e-14);
        assert!((g[2] - DVec3::Y).length() < 1e-14);
    }

    #[test]
    fn test_reference_tet_gradients() {
        let mesh = SimplexMesh::single_cell(SpatialDim::Three).unwrap();
        let space = Cg1Space::new(&mesh);
        let g = space.gradients(0);
        assert!((g[0] - DVec3::splat(-1.0)).length() < 1e-14);
        assert!((g[3] - DVec3::Z).length() < 1e-14);
    }

    #[test]
    fn test_gradients_sum_to_zero() {
        let mesh = SimplexMesh::unit_cube(2).unwrap();
        let space = Cg1Space::new(&mesh);
        for c in 0..mesh.n_cells() {
            let sum: DVec3 = space.gradients(c).iter().copied().sum();
            assert!(sum.length() < 1e-12);
        }
    }

    #[test]
    fn test_local_mass_sums_to_volume() {
        let mesh = SimplexMesh::unit_square(2, 2).unwrap();
        let space = Cg1Space::new(&mesh);
        for c in 0..mesh.n_cells() {
            let mut total = 0.0;
            for i in 0..3 {
                for j in 0..3 {
                    total += space.local_mass(c, i, j);
                }
            }
            assert!((total - space.volumes()[c]).abs() < 1e-14);
        }
    }

    #[test]
    fn test_linear_function_gradient_exact() {
        // f = 2x - 3y 在任意单元上梯度精确
        let mesh = SimplexMesh::unit_square(3, 3).unwrap();
        let space = Cg1Space::new(&mesh);
        for c in 0..mesh.n_cells() {
            let mut grad = DVec3::ZERO;
            for (local, &v) in mesh.cell(c).iter().enumerate() {
                let p = mesh.vertex(v);
                grad += (2.0 * p.x - 3.0 * p.y) * space.gradients(c)[local];
            }
            assert!((grad - DVec3::new(2.0, -3.0, 0.0)).length() < 1e-12);
        }
    }
}
