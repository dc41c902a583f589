// crates/les_dynamic/src/filter.rs

//! 盒式（top-hat）滤波
//!
//! 每一次滤波：
//!
//! ```text
//! tmp = G ⊙ (M · f)         G = 1 / ∫ φi dx（集中质量的逆）
//! f   = (1 - w) f + w tmp
//! ```
//!
//! 即节点邻域上的体积加权平均。N = 0 时输出与输入逐位相同。
//! 滤波内部不施加边界条件。

use les_foundation::error::{LesError, LesResult};
use les_numerics::linear_algebra::vector_ops::{blend, hadamard_inplace};
use les_numerics::linear_algebra::CsrMatrix;

/// 盒式滤波算子
#[derive(Debug)]
pub struct TopHatFilter<'a> {
    mass: &'a CsrMatrix,
    lumped_inverse: &'a [f64],
}

impl<'a> TopHatFilter<'a> {
    /// 由质量矩阵和集中质量逆构造
    pub fn new(mass: &'a CsrMatrix, lumped_inverse: &'a [f64]) -> LesResult<Self> {
        if mass.n_rows() != lumped_inverse.len() {
            return Err(LesError::size_mismatch(
                "lumped inverse",
                mass.n_rows(),
                lumped_inverse.len(),
            ));
        }
        Ok(Self {
            mass,
            lumped_inverse,
        })
    }

    /// 自由度数
    #[inline]
    pub fn n_dofs(&self) -> usize {
        self.lumped_inverse.len()
    }

    /// 滤波 `unfiltered` 写入 `filtered`，执行 `passes` 次
    pub fn apply(&self, unfiltered: &[f64], filtered: &mut [f64], passes: usize, weight: f64) {
        debug_assert_eq!(unfiltered.len(), self.n_dofs());
        debug_assert_eq!(filtered.len(), self.n_dofs());

        filtered.copy_from_slice(unfiltered);
        if passes == 0 {
            return;
        }

        let mut tmp = vec![0.0; self.n_dofs()];
        for _ in 0..passes {
            self.mass.mul_vec(filtered, &mut tmp);
            hadamard_inplace(self.lumped_inverse, &mut tmp);
            blend(weight, &tmp, filtered);
        }
    }

    /// 原位滤波
    pub fn apply_in_place(&self, field: &mut [f64], passes: usize, weight: f64) {
        if passes == 0 {
            return;
        }
        let source = field.to_vec();
        self.apply(&source, field, passes, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use les_fem::{BilinearForm, Discretization, LinearForm, P1Discretization, SimplexMesh};

    fn operators(n: usize) -> (CsrMatrix, Vec<f64>) {
        let disc = P1Discretization::new(SimplexMesh::unit_square(n, n).unwrap());
        let mass = disc.assemble_matrix(BilinearForm::Mass).unwrap();
        let lumped = disc.assemble_vector(&LinearForm::TestIntegral).unwrap();
        let inv = lumped.iter().map(|&v| 1.0 / v).collect();
        (mass, inv)
    }

    #[test]
    fn test_zero_passes_is_exact_copy() {
        let (mass, inv) = operators(3);
        let filter = TopHatFilter::new(&mass, &inv).unwrap();
        let input: Vec<f64> = (0..16).map(|i| (i as f64 * 0.37).sin() * 1e-7 + 3.0).collect();
        let mut output = vec![f64::NAN; 16];
        filter.apply(&input, &mut output, 0, 1.0);
        assert_eq!(output, input);
    }

    #[test]
    fn test_constant_preserved() {
        let (mass, inv) = operators(4);
        let filter = TopHatFilter::new(&mass, &inv).unwrap();
        let input = vec![1.25; 25];
        let mut output = vec![0.0; 25];
        filter.apply(&input, &mut output, 3, 1.0);
        for v in output {
            assert!((v - 1.25).abs() < 1e-13);
        }
    }

    #[test]
    fn test_smooths_spike() {
        let (mass, inv) = operators(4);
        let filter = TopHatFilter::new(&mass, &inv).unwrap();
        let mut input = vec![0.0; 25];
        input[12] = 1.0;
        let mut output = vec![0.0; 25];
        filter.apply(&input, &mut output, 1, 1.0);
        assert!(output[12] < 1.0 && output[12] > 0.0);
        assert!(output[13] > 0.0);
        // 远离尖峰的节点不受影响
        assert_eq!(output[0], 0.0);
    }

    #[test]
    fn test_weight_zero_is_identity() {
        let (mass, inv) = operators(2);
        let filter = TopHatFilter::new(&mass, &inv).unwrap();
        let mut field: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let original = field.clone();
        filter.apply_in_place(&mut field, 2, 0.0);
        assert_eq!(field, original);
    }

    #[test]
    fn test_size_mismatch() {
        let (mass, _) = operators(2);
        assert!(TopHatFilter::new(&mass, &[1.0; 3]).is_err());
    }
}
