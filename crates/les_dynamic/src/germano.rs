// crates/les_dynamic/src/germano.rs

//! Germano 恒等式中的张量
//!
//! ```text
//! L_ij = F(u_i u_j) - F(u_i) F(u_j)
//! M_ij = 2 Δ² ( F(|S| S_ij) - α² |S̃| S̃_ij )
//! ```
//!
//! 其中 F 为盒式滤波，S̃ 为滤波速度的应变率，α 为测试滤波宽度比。
//! 两个张量都只计算上三角分量。

use les_foundation::error::{LesError, LesResult};
use les_foundation::SpatialDim;
use les_numerics::linear_algebra::CsrMatrix;

use crate::filter::TopHatFilter;
use crate::strain::StrainRateExtractor;
use crate::tensor::SymmetricTensorField;

/// 滤波参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// 滤波次数
    pub passes: usize,
    /// 混合权重
    pub weight: f64,
}

/// 计算单个 Leonard 分量 L = F(a b) - fa fb
#[allow(clippy::too_many_arguments)]
pub fn lij_component(
    filter: &TopHatFilter<'_>,
    ui: &[f64],
    uj: &[f64],
    ufi: &[f64],
    ufj: &[f64],
    settings: FilterSettings,
    product: &mut Vec<f64>,
    out: &mut [f64],
) {
    product.clear();
    product.extend(ui.iter().zip(uj.iter()).map(|(&a, &b)| a * b));
    filter.apply(product, out, settings.passes, settings.weight);
    for ((l, &a), &b) in out.iter_mut().zip(ufi.iter()).zip(ufj.iter()) {
        *l -= a * b;
    }
}

/// 计算 Leonard 张量 L_ij
pub fn compute_lij(
    filter: &TopHatFilter<'_>,
    u: &[Vec<f64>],
    uf: &[Vec<f64>],
    settings: FilterSettings,
    lij: &mut SymmetricTensorField,
) -> LesResult<()> {
    let dim = lij.dim();
    if u.len() != dim.get() || uf.len() != dim.get() {
        return Err(LesError::dimension_mismatch("Lij velocity", dim.get(), u.len().min(uf.len())));
    }

    let mut product = Vec::with_capacity(lij.n_dofs());
    for (k, &(i, j)) in dim.pairs().iter().enumerate() {
        lij_component(
            filter,
            &u[i],
            &u[j],
            &uf[i],
            &uf[j],
            settings,
            &mut product,
            lij.component_mut(k),
        );
    }
    Ok(())
}

/// M_ij 计算的输入
#[derive(Debug)]
pub struct MijInputs<'a> {
    /// 质量矩阵
    pub mass: &'a CsrMatrix,
    /// 各方向导数矩阵
    pub derivatives: &'a [CsrMatrix],
    /// 节点 Δ²
    pub delta_sq: &'a [f64],
    /// 测试滤波宽度比 α
    pub alpha: f64,
    /// 滤波参数
    pub settings: FilterSettings,
}

/// M_ij 计算的工作区（应变率张量与模）
#[derive(Debug, Clone)]
pub struct MijWorkspace {
    /// 原速度的应变率
    pub sij: SymmetricTensorField,
    /// 滤波速度的应变率
    pub sijf: SymmetricTensorField,
    /// 滤波速度的应变率模
    pub mag_sf: Vec<f64>,
    product: Vec<f64>,
}

impl MijWorkspace {
    /// 分配工作区
    pub fn new(dim: SpatialDim, n_dofs: usize) -> Self {
        Self {
            sij: SymmetricTensorField::zeros(dim, n_dofs),
            sijf: SymmetricTensorField::zeros(dim, n_dofs),
            mag_sf: vec![0.0; n_dofs],
            product: vec![0.0; n_dofs],
        }
    }
}

/// 计算模型张量 M_ij，并把原速度的应变率模写入 `mag_s`
#[allow(clippy::too_many_arguments)]
pub fn compute_mij(
    filter: &TopHatFilter<'_>,
    strain: &mut StrainRateExtractor,
    inputs: &MijInputs<'_>,
    u: &[Vec<f64>],
    uf: &[Vec<f64>],
    workspace: &mut MijWorkspace,
    mij: &mut SymmetricTensorField,
    mag_s: &mut [f64],
) -> LesResult<()> {
    strain.compute(inputs.mass, inputs.derivatives, u, &mut workspace.sij, mag_s)?;
    strain.compute(
        inputs.mass,
        inputs.derivatives,
        uf,
        &mut workspace.sijf,
        &mut workspace.mag_sf,
    )?;

    let alpha_sq = inputs.alpha * inputs.alpha;
    for k in 0..mij.tensor_dim() {
        // F(|S| S_ij)
        let product = &mut workspace.product;
        product.clear();
        product.extend(
            workspace
                .sij
                .component(k)
                .iter()
                .zip(mag_s.iter())
                .map(|(&s, &m)| s * m),
        );
        let out = mij.component_mut(k);
        filter.apply(product, out, inputs.settings.passes, inputs.settings.weight);

        let sfk = workspace.sijf.component(k);
        for (((m, &sf), &magf), &dsq) in out
            .iter_mut()
            .zip(sfk.iter())
            .zip(workspace.mag_sf.iter())
            .zip(inputs.delta_sq.iter())
        {
            *m = 2.0 * dsq * (*m - alpha_sq * magf * sf);
        }
    }
    Ok(())
}
