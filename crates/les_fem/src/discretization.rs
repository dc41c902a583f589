// crates/les_fem/src/discretization.rs

//! 离散化接口
//!
//! 亚格子模型对数值底座的全部需求：
//!
//! | 操作 | 方法 |
//! |------|------|
//! | 组装 | [`Discretization::assemble_matrix`] / [`Discretization::assemble_vector`] |
//! | 投影 | [`Discretization::project`] |
//! | 插值 | [`Discretization::interpolate`] |
//! | 求解 | [`KrylovSolver`]（由调用方持有） |
//!
//! [`P1Discretization`] 是单纯形网格上 CG1 空间的实现。
//!
//! ```
//! use les_fem::{BilinearForm, Discretization, P1Discretization, SimplexMesh};
//!
//! let disc = P1Discretization::new(SimplexMesh::unit_square(2, 2).unwrap());
//! let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
//! let total: f64 = mass.values().iter().sum();
//! assert!((total - 1.0).abs() < 1e-12);
//! ```

use glam::DVec3;

use les_foundation::error::{LesError, LesResult};
use les_foundation::validation::ensure_len;
use les_foundation::SpatialDim;
use les_numerics::linear_algebra::{CsrBuilder, CsrMatrix, KrylovSolver, SolverResult};

use crate::bc::SubDomain;
use crate::forms::{BilinearForm, LinearForm};
use crate::mesh::SimplexMesh;
use crate::space::{Cg1Space, MAX_CELL_VERTICES};
use crate::velocity::VelocityField;

/// 点定位容差（重心坐标）
const LOCATE_TOL: f64 = 1e-12;

/// 点定位结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLocation {
    /// 包含该点的单元
    pub cell: usize,
    /// 重心坐标（前 d + 1 个有效）
    pub barycentric: [f64; MAX_CELL_VERTICES],
}

/// 数值底座接口
pub trait Discretization: Send + Sync {
    /// 空间维度
    fn dim(&self) -> SpatialDim;

    /// 自由度数
    fn n_dofs(&self) -> usize;

    /// 单元数
    fn n_cells(&self) -> usize;

    /// 单元体积
    fn cell_volumes(&self) -> &[f64];

    /// 单元的自由度
    fn cell_dofs(&self, cell: usize) -> &[usize];

    /// 自由度坐标
    fn dof_coordinate(&self, dof: usize) -> DVec3;

    /// 组装双线性形式
    fn assemble_matrix(&self, form: BilinearForm) -> LesResult<CsrMatrix>;

    /// 组装线性形式
    fn assemble_vector(&self, form: &LinearForm<'_>) -> LesResult<Vec<f64>>;

    /// L2 投影：求解 M x = b(source)，`out` 作为初始猜测输入
    fn project(
        &self,
        source: &LinearForm<'_>,
        mass: &CsrMatrix,
        solver: &mut KrylovSolver,
        out: &mut [f64],
    ) -> LesResult<SolverResult> {
        let rhs = self.assemble_vector(source)?;
        solver.solve(mass, &rhs, out)
    }

    /// 速度分量的节点插值
    fn interpolate(
        &self,
        field: &dyn VelocityField,
        component: usize,
        out: &mut [f64],
    ) -> LesResult<()>;

    /// 节点场在单元上的（常数）梯度
    fn cell_gradient(&self, nodal: &[f64], cell: usize) -> DVec3;

    /// 定位包含点的单元
    fn locate(&self, point: DVec3) -> Option<CellLocation>;

    /// 从自由度 `dof` 附近开始定位包含点的单元
    ///
    /// 点通常落在 `dof` 的相邻单元中时可先查这些单元。
    fn locate_near(&self, point: DVec3, dof: usize) -> Option<CellLocation> {
        let _ = dof;
        self.locate(point)
    }

    /// 子区域对应的自由度（升序）
    fn locate_dofs(&self, subdomain: &SubDomain) -> LesResult<Vec<usize>>;

    /// 在任意点处求节点场的值（点在网格外时为 None）
    fn evaluate(&self, nodal: &[f64], point: DVec3) -> Option<f64> {
        self.locate(point).map(|loc| self.evaluate_at(nodal, &loc))
    }

    /// 在已定位的点处求节点场的值
    fn evaluate_at(&self, nodal: &[f64], location: &CellLocation) -> f64 {
        self.cell_dofs(location.cell)
            .iter()
            .zip(location.barycentric.iter())
            .map(|(&dof, &w)| w * nodal[dof])
            .sum()
    }
}

// =============================================================================
// P1 实现
// =============================================================================

/// 单纯形网格上的 CG1 离散
#[derive(Debug, Clone)]
pub struct P1Discretization {
    mesh: SimplexMesh,
    space: Cg1Space,
    /// 每个顶点相邻的单元
    vertex_cells: Vec<Vec<usize>>,
}

impl P1Discretization {
    /// 从网格创建
    pub fn new(mesh: SimplexMesh) -> Self {
        let space = Cg1Space::new(&mesh);
        let mut vertex_cells = vec![Vec::new(); mesh.n_vertices()];
        for c in 0..mesh.n_cells() {
            for &v in mesh.cell(c) {
                vertex_cells[v].push(c);
            }
        }
        tracing::debug!(
            "P1 离散: {} 网格, {} 个顶点, {} 个单元",
            mesh.dim().name(),
            mesh.n_vertices(),
            mesh.n_cells()
        );
        Self {
            mesh,
            space,
            vertex_cells,
        }
    }

    /// 底层网格
    #[inline]
    pub fn mesh(&self) -> &SimplexMesh {
        &self.mesh
    }

    /// 单元几何
    #[inline]
    pub fn space(&self) -> &Cg1Space {
        &self.space
    }

    fn location_in(&self, cell: usize, point: DVec3) -> Option<CellLocation> {
        let nv = self.dim().vertices_per_cell();
        let barycentric = self.barycentric(cell, point);
        barycentric[..nv]
            .iter()
            .all(|&l| l >= -LOCATE_TOL)
            .then_some(CellLocation { cell, barycentric })
    }

    fn barycentric(&self, cell: usize, point: DVec3) -> [f64; MAX_CELL_VERTICES] {
        let x0 = self.mesh.vertex(self.mesh.cell(cell)[0]);
        let grads = self.space.gradients(cell);
        let mut lambda = [0.0; MAX_CELL_VERTICES];
        for (i, g) in grads.iter().enumerate() {
            let base = if i == 0 { 1.0 } else { 0.0 };
            lambda[i] = base + g.dot(point - x0);
        }
        lambda
    }
}

impl Discretization for P1Discretization {
    fn dim(&self) -> SpatialDim {
        self.mesh.dim()
    }

    fn n_dofs(&self) -> usize {
        self.mesh.n_vertices()
    }

    fn n_cells(&self) -> usize {
        self.mesh.n_cells()
    }

    fn cell_volumes(&self) -> &[f64] {
        self.space.volumes()
    }

    fn cell_dofs(&self, cell: usize) -> &[usize] {
        self.mesh.cell(cell)
    }

    fn dof_coordinate(&self, dof: usize) -> DVec3 {
        self.mesh.vertex(dof)
    }

    fn assemble_matrix(&self, form: BilinearForm) -> LesResult<CsrMatrix> {
        if let BilinearForm::Derivative(axis) = form {
            if axis >= self.dim().get() {
                return Err(LesError::dimension_mismatch(
                    "BilinearForm::Derivative",
                    self.dim().get(),
                    axis + 1,
                ));
            }
        }

        let n = self.n_dofs();
        let mut builder = CsrBuilder::new_square(n);
        for c in 0..self.n_cells() {
            let cell = self.mesh.cell(c);
            for (i, &row) in cell.iter().enumerate() {
                for (j, &col) in cell.iter().enumerate() {
                    let value = match form {
                        BilinearForm::Mass => self.space.local_mass(c, i, j),
                        BilinearForm::Derivative(axis) => self.space.local_derivative(c, j, axis),
                    };
                    builder.add(row, col, value);
                }
            }
        }
        Ok(builder.build())
    }

    fn assemble_vector(&self, form: &LinearForm<'_>) -> LesResult<Vec<f64>> {
        if let LinearForm::CellSource(values) = form {
            ensure_len("cell source", values, self.n_cells())?;
        }

        let mut out = vec![0.0; self.n_dofs()];
        for c in 0..self.n_cells() {
            let weight = self.space.lumped_weight(c);
            let contribution = match form {
                LinearForm::TestIntegral => weight,
                LinearForm::CellSource(values) => values[c] * weight,
            };
            for &v in self.mesh.cell(c) {
                out[v] += contribution;
            }
        }
        Ok(out)
    }

    fn interpolate(
        &self,
        field: &dyn VelocityField,
        component: usize,
        out: &mut [f64],
    ) -> LesResult<()> {
        let d = self.dim().get();
        if field.n_components() != d {
            return Err(LesError::dimension_mismatch("velocity", d, field.n_components()));
        }
        if component >= d {
            return Err(LesError::dimension_mismatch("velocity component", d, component + 1));
        }
        ensure_len("interpolation target", out, self.n_dofs())?;
        field.check_compatible(self.n_dofs())?;

        for (v, slot) in out.iter_mut().enumerate() {
            *slot = field.value(v, self.mesh.vertex(v), component);
        }
        Ok(())
    }

    fn cell_gradient(&self, nodal: &[f64], cell: usize) -> DVec3 {
        self.mesh
            .cell(cell)
            .iter()
            .zip(self.space.gradients(cell).iter())
            .map(|(&v, &g)| nodal[v] * g)
            .sum()
    }

    fn locate(&self, point: DVec3) -> Option<CellLocation> {
        (0..self.n_cells()).find_map(|c| self.location_in(c, point))
    }

    fn locate_near(&self, point: DVec3, dof: usize) -> Option<CellLocation> {
        self.vertex_cells
            .get(dof)
            .and_then(|cells| cells.iter().find_map(|&c| self.location_in(c, point)))
            .or_else(|| self.locate(point))
    }

    fn locate_dofs(&self, subdomain: &SubDomain) -> LesResult<Vec<usize>> {
        let dofs = match subdomain {
            SubDomain::Boundary => self.mesh.boundary_vertices(),
            SubDomain::Marker(name) => self
                .mesh
                .marker(name)
                .map(|m| m.to_vec())
                .ok_or_else(|| {
                    LesError::boundary_mismatch(format!("网格上不存在标记 '{}'", name))
                })?,
            SubDomain::Region {
                min,
                max,
                on_boundary,
            } => (0..self.n_dofs())
                .filter(|&v| !*on_boundary || self.mesh.is_boundary_vertex(v))
                .filter(|&v| SubDomain::region_contains(*min, *max, self.mesh.vertex(v)))
                .collect(),
        };
        Ok(dofs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velocity::{AnalyticVelocity, NodalVelocity};
    use les_numerics::linear_algebra::SolverSelection;

    #[test]
    fn test_mass_matrix_properties() {
        let disc = P1Discretization::new(SimplexMesh::unit_cube(2).unwrap());
        let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
        for i in 0..mass.n_rows() {
            for (j, a_ij) in mass.row(i) {
                assert!((a_ij - mass.get(j, i)).abs() < 1e-15);
            }
        }
        let total: f64 = mass.values().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);

        // 行和即集中质量
        let lumped = disc.assemble_vector(&LinearForm::TestIntegral).unwrap();
        for (i, b) in lumped.iter().enumerate() {
            let row_sum: f64 = mass.row(i).map(|(_, v)| v).sum();
            assert!((row_sum - b).abs() < 1e-14);
        }
    }

    #[test]
    fn test_derivative_of_linear_field() {
        // D_x · f = M · ∂f/∂x，对线性 f 精确成立
        let disc = P1Discretization::new(SimplexMesh::unit_square(3, 3).unwrap());
        let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
        let dx = disc.assemble_matrix(BilinearForm::Derivative(0)).unwrap();

        let f: Vec<f64> = disc.mesh().vertices().iter().map(|p| 3.0 * p.x + p.y).collect();
        let mut lhs = vec![0.0; f.len()];
        dx.mul_vec(&f, &mut lhs);

        let mut rhs = vec![0.0; f.len()];
        mass.mul_vec(&vec![3.0; f.len()], &mut rhs);

        for (a, b) in lhs.iter().zip(rhs.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_derivative_axis_out_of_range() {
        let disc = P1Discretization::new(SimplexMesh::unit_square(1, 1).unwrap());
        assert!(disc.assemble_matrix(BilinearForm::Derivative(2)).is_err());
    }

    #[test]
    fn test_project_constant() {
        let disc = P1Discretization::new(SimplexMesh::unit_square(4, 4).unwrap());
        let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
        let mut solver = KrylovSolver::for_matrix(SolverSelection::default(), &mass);

        let source = vec![2.5; disc.n_cells()];
        let mut out = vec![0.0; disc.n_dofs()];
        let result = disc
            .project(&LinearForm::CellSource(&source), &mass, &mut solver, &mut out)
            .unwrap();
        assert!(result.is_converged());
        for v in out {
            assert!((v - 2.5).abs() < 1e-8);
        }
    }

    #[test]
    fn test_cell_source_size_checked() {
        let disc = P1Discretization::new(SimplexMesh::unit_square(1, 1).unwrap());
        assert!(disc.assemble_vector(&LinearForm::CellSource(&[1.0])).is_err());
    }

    #[test]
    fn test_interpolate() {
        let disc = P1Discretization::new(SimplexMesh::unit_square(2, 2).unwrap());
        let u = AnalyticVelocity::new(SpatialDim::Two, |p| DVec3::new(p.x, 2.0 * p.y, 0.0));
        let mut out = vec![0.0; disc.n_dofs()];
        disc.interpolate(&u, 1, &mut out).unwrap();
        assert_eq!(out[8], 2.0);

        let wrong = NodalVelocity::zeros(SpatialDim::Three, disc.n_dofs());
        assert!(disc.interpolate(&wrong, 0, &mut out).is_err());

        let short = NodalVelocity::zeros(SpatialDim::Two, 3);
        assert!(disc.interpolate(&short, 0, &mut out).is_err());
    }

    #[test]
    fn test_locate_and_evaluate() {
        let disc = P1Discretization::new(SimplexMesh::unit_cube(2).unwrap());
        let f: Vec<f64> = disc
            .mesh()
            .vertices()
            .iter()
            .map(|p| p.x - 2.0 * p.y + p.z)
            .collect();
        let p = DVec3::new(0.3, 0.7, 0.1);
        let v = disc.evaluate(&f, p).unwrap();
        assert!((v - (0.3 - 1.4 + 0.1)).abs() < 1e-12);
        assert!(disc.locate(DVec3::splat(2.0)).is_none());
    }

    #[test]
    fn test_locate_near_matches_global_search() {
        let disc = P1Discretization::new(SimplexMesh::unit_square(4, 4).unwrap());
        let f: Vec<f64> = disc.mesh().vertices().iter().map(|p| 3.0 * p.x + p.y).collect();
        // 相邻单元内
        let near = disc.locate_near(DVec3::new(0.26, 0.24, 0.0), 6).unwrap();
        assert!((disc.evaluate_at(&f, &near) - 1.02).abs() < 1e-12);
        // 远离起始顶点时退回全局搜索
        let far = disc.locate_near(DVec3::new(0.9, 0.9, 0.0), 0).unwrap();
        assert!((disc.evaluate_at(&f, &far) - 3.6).abs() < 1e-12);
        assert!(disc.locate_near(DVec3::new(-0.1, 0.5, 0.0), 0).is_none());
    }

    #[test]
    fn test_cell_gradient() {
        let disc = P1Discretization::new(SimplexMesh::unit_cube(1).unwrap());
        let f: Vec<f64> = disc.mesh().vertices().iter().map(|p| p.z * 4.0).collect();
        for c in 0..disc.n_cells() {
            let g = disc.cell_gradient(&f, c);
            assert!((g - DVec3::new(0.0, 0.0, 4.0)).length() < 1e-12);
        }
    }
}
