// crates/les_dynamic/src/strain.rs

//! 应变率张量提取
//!
//! 在 CG1 空间上通过质量矩阵求解得到速度梯度的 L2 投影：
//!
//! ```text
//! M · g_ij = D_j · u_i          g_ij ≈ ∂u_i/∂x_j
//! S_ij = (g_ij + g_ji) / 2
//! |S|  = sqrt(2 S:S)            （非对角分量计两次）
//! ```
//!
//! 每次求解从零初值开始，未收敛时保留最后迭代值（由 [`SolverSelection`] 控制）。

use les_foundation::error::{LesError, LesResult};
use les_foundation::SpatialDim;
use les_numerics::linear_algebra::{CsrMatrix, KrylovSolver, SolveStatistics, SolverSelection};

use crate::tensor::SymmetricTensorField;

/// 应变率提取器
#[derive(Debug)]
pub struct StrainRateExtractor {
    dim: SpatialDim,
    solver: KrylovSolver,
    rhs: Vec<f64>,
    /// g[i * d + j] = ∂u_i/∂x_j
    gradient: Vec<Vec<f64>>,
}

impl StrainRateExtractor {
    /// 针对质量矩阵创建提取器
    pub fn new(dim: SpatialDim, mass: &CsrMatrix, selection: SolverSelection) -> Self {
        let n = mass.n_rows();
        let d = dim.get();
        Self {
            dim,
            solver: KrylovSolver::for_matrix(selection, mass),
            rhs: vec![0.0; n],
            gradient: vec![vec![0.0; n]; d * d],
        }
    }

    /// 计算速度 `velocity` 的应变率张量 `sij` 与模 `magnitude`
    pub fn compute(
        &mut self,
        mass: &CsrMatrix,
        derivatives: &[CsrMatrix],
        velocity: &[Vec<f64>],
        sij: &mut SymmetricTensorField,
        magnitude: &mut [f64],
    ) -> LesResult<()> {
        let d = self.dim.get();
        if derivatives.len() != d {
            return Err(LesError::dimension_mismatch("derivative matrices", d, derivatives.len()));
        }
        if velocity.len() != d {
            return Err(LesError::dimension_mismatch("velocity", d, velocity.len()));
        }

        for (i, ui) in velocity.iter().enumerate() {
            for (j, dj) in derivatives.iter().enumerate() {
                dj.mul_vec(ui, &mut self.rhs);
                let g = &mut self.gradient[i * d + j];
                g.fill(0.0);
                self.solver.solve(mass, &self.rhs, g)?;
            }
        }

        for (k, &(i, j)) in self.dim.pairs().iter().enumerate() {
            let gij = &self.gradient[i * d + j];
            let gji = &self.gradient[j * d + i];
            for ((s, &a), &b) in sij.component_mut(k).iter_mut().zip(gij.iter()).zip(gji.iter()) {
                *s = 0.5 * (a + b);
            }
        }

        sij.magnitude_into(magnitude);
        Ok(())
    }

    /// 取出并清零求解统计
    pub fn take_statistics(&mut self) -> SolveStatistics {
        self.solver.take_statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use les_fem::{BilinearForm, Discretization, P1Discretization, SimplexMesh};

    fn setup(mesh: SimplexMesh) -> (P1Discretization, CsrMatrix, Vec<CsrMatrix>) {
        let disc = P1Discretization::new(mesh);
        let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
        let derivs = (0..disc.dim().get())
            .map(|j| disc.assemble_matrix(BilinearForm::Derivative(j)).unwrap())
            .collect();
        (disc, mass, derivs)
    }

    #[test]
    fn test_linear_shear_2d() {
        // u = (y, 0): S01 = 0.5, |S| = 1
        let (disc, mass, derivs) = setup(SimplexMesh::unit_square(4, 4).unwrap());
        let n = disc.n_dofs();
        let u0: Vec<f64> = disc.mesh().vertices().iter().map(|p| p.y).collect();
        let velocity = vec![u0, vec![0.0; n]];

        let mut extractor = StrainRateExtractor::new(SpatialDim::Two, &mass, SolverSelection::default());
        let mut sij = SymmetricTensorField::zeros(SpatialDim::Two, n);
        let mut mag = vec![0.0; n];
        extractor
            .compute(&mass, &derivs, &velocity, &mut sij, &mut mag)
            .unwrap();

        for dof in 0..n {
            assert!(sij.get(0, 0)[dof].abs() < 1e-8);
            assert!((sij.get(0, 1)[dof] - 0.5).abs() < 1e-8);
            assert!((sij.get(1, 0)[dof] - 0.5).abs() < 1e-8);
            assert!((mag[dof] - 1.0).abs() < 1e-8);
        }
        assert_eq!(extractor.take_statistics().solves, 4);
    }

    #[test]
    fn test_uniform_flow_zero_strain_3d() {
        let (disc, mass, derivs) = setup(SimplexMesh::unit_cube(2).unwrap());
        let n = disc.n_dofs();
        let velocity = vec![vec![1.0; n], vec![-2.0; n], vec![0.5; n]];

        let mut extractor =
            StrainRateExtractor::new(SpatialDim::Three, &mass, SolverSelection::default());
        let mut sij = SymmetricTensorField::zeros(SpatialDim::Three, n);
        let mut mag = vec![1.0; n];
        extractor
            .compute(&mass, &derivs, &velocity, &mut sij, &mut mag)
            .unwrap();
        assert!(sij.max_abs() < 1e-10);
        assert!(mag.iter().all(|&m| m < 1e-10));
    }

    #[test]
    fn test_dimension_checked() {
        let (disc, mass, derivs) = setup(SimplexMesh::unit_square(1, 1).unwrap());
        let n = disc.n_dofs();
        let mut extractor = StrainRateExtractor::new(SpatialDim::Two, &mass, SolverSelection::default());
        let mut sij = SymmetricTensorField::zeros(SpatialDim::Two, n);
        let mut mag = vec![0.0; n];
        let velocity = vec![vec![0.0; n]];
        assert!(extractor
            .compute(&mass, &derivs, &velocity, &mut sij, &mut mag)
            .is_err());
    }
}
