// crates/les_dynamic/src/model.rs

//! 动态 Lagrangian Smagorinsky 模型
//!
//! # 数据划分
//!
//! - [`PrecomputedOperators`]: setup 时构建一次、之后只读的算子（质量矩阵、
//!   导数矩阵、集中质量逆、Δ、离散边界条件），通过 `Arc` 共享
//! - [`LesState`]: 每步原位修改的场（速度副本、张量、记忆场、Cs²、nut）
//!
//! # 单步流程
//!
//! ```text
//! tstep mod K != 0:   nut = Π(Cs²_K Δ_K² |S(u)|_K)，截断到 >= 0，施加 nut 边界条件
//! tstep mod K == 0:   u → u_CG1 (+BC) → F(u) (+BC)
//!                     → L_ij, M_ij, |S|
//!                     → Lagrangian 平均 (J_LM, J_MM)
//!                     → Cs² = min(J_LM / J_MM, 0.09) → 平滑 → 再截断
//!                     → nut = Cs² Δ² |S|，施加 nut 边界条件
//! ```

use std::sync::Arc;

use les_fem::{
    apply_all, BilinearForm, DirichletBc, Discretization, LinearForm, VelocityBoundaryConditions,
    VelocityField,
};
use les_foundation::error::{LesError, LesResult};
use les_foundation::SpatialDim;
use les_numerics::linear_algebra::vector_ops::{clamp_max, clamp_min};
use les_numerics::linear_algebra::{CsrMatrix, KrylovSolver};

use crate::config::DynamicSmagorinskyConfig;
use crate::diagnostics::{FieldStatistics, SolveSummary, StepReport};
use crate::filter::TopHatFilter;
use crate::germano::{compute_lij, compute_mij, FilterSettings, MijInputs, MijWorkspace};
use crate::lagrangian::LagrangianAverager;
use crate::strain::StrainRateExtractor;
use crate::tensor::SymmetricTensorField;
use crate::traits::{EddyViscosityModel, StepContext, UpdateKind, VelocityGradient};

// =============================================================================
// 预计算算子
// =============================================================================

/// setup 阶段构建的只读算子
#[derive(Debug)]
pub struct PrecomputedOperators {
    dim: SpatialDim,
    component_names: Vec<String>,
    mass: CsrMatrix,
    derivatives: Vec<CsrMatrix>,
    lumped_inverse: Vec<f64>,
    delta: Vec<f64>,
    delta_sq: Vec<f64>,
    cell_delta_sq: Vec<f64>,
    velocity_bcs: Vec<Vec<DirichletBc>>,
    nut_bcs: Vec<DirichletBc>,
}

impl PrecomputedOperators {
    /// 组装全部算子并离散边界条件
    ///
    /// nut 的边界条件取第一个速度分量边界条件所在自由度上的零值。
    pub fn build<D, S>(
        disc: &D,
        velocity_bcs: &VelocityBoundaryConditions,
        component_names: &[S],
        config: &DynamicSmagorinskyConfig,
    ) -> LesResult<Self>
    where
        D: Discretization + ?Sized,
        S: AsRef<str>,
    {
        let dim = disc.dim();
        let d = dim.get();
        if component_names.len() != d {
            return Err(LesError::dimension_mismatch(
                "velocity component names",
                d,
                component_names.len(),
            ));
        }
        let component_names: Vec<String> =
            component_names.iter().map(|s| s.as_ref().to_string()).collect();

        let mass = disc.assemble_matrix(BilinearForm::Mass)?;
        let derivatives = (0..d)
            .map(|axis| disc.assemble_matrix(BilinearForm::Derivative(axis)))
            .collect::<LesResult<Vec<_>>>()?;

        let lumped = disc.assemble_vector(&LinearForm::TestIntegral)?;
        if let Some((dof, &v)) = lumped.iter().enumerate().find(|&(_, &v)| v.is_nan() || v <= 0.0) {
            return Err(LesError::invalid_mesh(format!(
                "自由度 {} 的集中质量非正 ({:.3e})",
                dof, v
            )));
        }
        let lumped_inverse: Vec<f64> = lumped.iter().map(|&v| 1.0 / v).collect();

        // Δ = |K|^(1/d) 投影到 CG1
        let inv_d = 1.0 / d as f64;
        let cell_delta: Vec<f64> = disc.cell_volumes().iter().map(|&v| v.powf(inv_d)).collect();
        let cell_delta_sq: Vec<f64> = cell_delta.iter().map(|&v| v * v).collect();
        let mut projector = KrylovSolver::for_matrix(config.nut_solver.clone(), &mass);
        let mut delta = vec![0.0; disc.n_dofs()];
        disc.project(&LinearForm::CellSource(&cell_delta), &mass, &mut projector, &mut delta)?;
        let delta_sq: Vec<f64> = delta.iter().map(|&v| v * v).collect();

        let velocity_bcs = velocity_bcs.discretize(disc, &component_names)?;
        let nut_bcs: Vec<DirichletBc> = velocity_bcs[0].iter().map(|bc| bc.homogeneous()).collect();

        Ok(Self {
            dim,
            component_names,
            mass,
            derivatives,
            lumped_inverse,
            delta,
            delta_sq,
            cell_delta_sq,
            velocity_bcs,
            nut_bcs,
        })
    }

    /// 空间维度
    #[inline]
    pub fn dim(&self) -> SpatialDim {
        self.dim
    }

    /// 自由度数
    #[inline]
    pub fn n_dofs(&self) -> usize {
        self.lumped_inverse.len()
    }

    /// 速度分量名称
    pub fn component_names(&self) -> &[String] {
        &self.component_names
    }

    /// 质量矩阵
    pub fn mass(&self) -> &CsrMatrix {
        &self.mass
    }

    /// 导数矩阵（每个方向一个）
    pub fn derivatives(&self) -> &[CsrMatrix] {
        &self.derivatives
    }

    /// 集中质量逆 G
    pub fn lumped_inverse(&self) -> &[f64] {
        &self.lumped_inverse
    }

    /// 节点 Δ
    pub fn delta(&self) -> &[f64] {
        &self.delta
    }

    /// 节点 Δ²
    pub fn delta_sq(&self) -> &[f64] {
        &self.delta_sq
    }

    /// 单元 Δ² = |K|^(2/d)
    pub fn cell_delta_sq(&self) -> &[f64] {
        &self.cell_delta_sq
    }

    /// 各速度分量的离散边界条件
    pub fn velocity_bcs(&self) -> &[Vec<DirichletBc>] {
        &self.velocity_bcs
    }

    /// nut 的边界条件
    pub fn nut_bcs(&self) -> &[DirichletBc] {
        &self.nut_bcs
    }
}

// =============================================================================
// 状态
// =============================================================================

/// 每步原位更新的场
#[derive(Debug, Clone, PartialEq)]
pub struct LesState {
    /// 速度的 CG1 插值
    pub u_cg1: Vec<Vec<f64>>,
    /// 滤波速度
    pub u_filtered: Vec<Vec<f64>>,
    /// Leonard 张量
    pub lij: SymmetricTensorField,
    /// 模型张量
    pub mij: SymmetricTensorField,
    /// 应变率模 |S|
    pub mag_s: Vec<f64>,
    /// L:M 记忆场
    pub jlm: Vec<f64>,
    /// M:M 记忆场（恒正）
    pub jmm: Vec<f64>,
    /// Cs²
    pub cs_sq: Vec<f64>,
    /// 涡粘性
    pub nut: Vec<f64>,
}

impl LesState {
    /// 按配置初值分配状态
    pub fn new(dim: SpatialDim, n_dofs: usize, config: &DynamicSmagorinskyConfig) -> Self {
        let d = dim.get();
        Self {
            u_cg1: vec![vec![0.0; n_dofs]; d],
            u_filtered: vec![vec![0.0; n_dofs]; d],
            lij: SymmetricTensorField::zeros(dim, n_dofs),
            mij: SymmetricTensorField::zeros(dim, n_dofs),
            mag_s: vec![0.0; n_dofs],
            jlm: vec![config.initial_jlm; n_dofs],
            jmm: vec![config.initial_jmm; n_dofs],
            cs_sq: vec![0.0; n_dofs],
            nut: vec![0.0; n_dofs],
        }
    }

    /// 自由度数
    #[inline]
    pub fn n_dofs(&self) -> usize {
        self.nut.len()
    }
}

// =============================================================================
// 模型
// =============================================================================

/// 动态 Lagrangian Smagorinsky 涡粘性模型
pub struct DynamicLagrangianModel<D: Discretization> {
    config: DynamicSmagorinskyConfig,
    disc: Arc<D>,
    operators: Arc<PrecomputedOperators>,
    state: LesState,
    strain: StrainRateExtractor,
    nut_solver: KrylovSolver,
    mij_workspace: MijWorkspace,
    skip_velocity: Vec<Vec<f64>>,
    last_report: Option<StepReport>,
}

impl<D: Discretization> DynamicLagrangianModel<D> {
    /// 构建模型
    ///
    /// 配置无效、分量名称与维度不符、边界条件引用未知分量或网格标记时返回错误。
    pub fn setup<S: AsRef<str>>(
        disc: Arc<D>,
        velocity_bcs: &VelocityBoundaryConditions,
        component_names: &[S],
        config: DynamicSmagorinskyConfig,
    ) -> LesResult<Self> {
        config.validate()?;
        let operators = PrecomputedOperators::build(disc.as_ref(), velocity_bcs, component_names, &config)?;
        Self::with_operators(disc, Arc::new(operators), config)
    }

    /// 复用已有算子构建模型（多个模型实例共享同一组算子）
    pub fn with_operators(
        disc: Arc<D>,
        operators: Arc<PrecomputedOperators>,
        config: DynamicSmagorinskyConfig,
    ) -> LesResult<Self> {
        config.validate()?;
        if operators.n_dofs() != disc.n_dofs() {
            return Err(LesError::size_mismatch("operators", disc.n_dofs(), operators.n_dofs()));
        }
        if operators.dim() != disc.dim() {
            return Err(LesError::dimension_mismatch(
                "operators",
                disc.dim().get(),
                operators.dim().get(),
            ));
        }

        let dim = operators.dim();
        let n = operators.n_dofs();
        let strain = StrainRateExtractor::new(dim, operators.mass(), config.strain_solver.clone());
        let nut_solver = KrylovSolver::for_matrix(config.nut_solver.clone(), operators.mass());
        let state = LesState::new(dim, n, &config);

        tracing::info!(
            "动态 Lagrangian Smagorinsky: {} 网格, {} 个自由度, {} 个单元, 重算间隔 {}, 滤波 {} 次",
            dim.name(),
            n,
            disc.n_cells(),
            config.recompute_interval,
            config.filter_passes
        );

        Ok(Self {
            disc,
            state,
            strain,
            nut_solver,
            mij_workspace: MijWorkspace::new(dim, n),
            skip_velocity: vec![vec![0.0; n]; dim.get()],
            last_report: None,
            operators,
            config,
        })
    }

    /// 配置
    pub fn config(&self) -> &DynamicSmagorinskyConfig {
        &self.config
    }

    /// 离散空间
    pub fn discretization(&self) -> &Arc<D> {
        &self.disc
    }

    /// 预计算算子
    pub fn operators(&self) -> &Arc<PrecomputedOperators> {
        &self.operators
    }

    /// 当前状态
    pub fn state(&self) -> &LesState {
        &self.state
    }

    /// 当前状态（可变，用于重启或外部初始化）
    pub fn state_mut(&mut self) -> &mut LesState {
        &mut self.state
    }

    /// 上一次 update 的诊断报告
    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// 执行一步更新
    pub fn step(&mut self, velocity: &dyn VelocityField, ctx: StepContext) -> LesResult<UpdateKind> {
        let kind = if self.config.is_recompute_step(ctx.tstep) {
            self.recompute(velocity, ctx.dt)?;
            UpdateKind::Recomputed
        } else {
            self.refresh_nut(velocity)?;
            UpdateKind::Skipped
        };

        let report = self.build_report(ctx.tstep, kind);
        tracing::debug!(
            "tstep {} ({}): Cs² [{}], nut [{}]",
            ctx.tstep,
            kind,
            report.coefficient,
            report.nut
        );
        let unconverged = report.strain_solves.unconverged + report.nut_solves.unconverged;
        if unconverged > 0 {
            tracing::warn!("tstep {}: {} 次线性求解未收敛, 已保留最后迭代值", ctx.tstep, unconverged);
        }
        self.last_report = Some(report);
        Ok(kind)
    }

    /// 插值速度并施加边界条件，再滤波并再次施加边界条件
    fn velocity_operations(&mut self, velocity: &dyn VelocityField) -> LesResult<()> {
        let ops = Arc::clone(&self.operators);
        let filter = TopHatFilter::new(ops.mass(), ops.lumped_inverse())?;
        let state = &mut self.state;

        for (i, bcs) in ops.velocity_bcs().iter().enumerate() {
            self.disc.interpolate(velocity, i, &mut state.u_cg1[i])?;
            apply_all(bcs, &mut state.u_cg1[i]);

            filter.apply(
                &state.u_cg1[i],
                &mut state.u_filtered[i],
                self.config.filter_passes,
                self.config.filter_weight,
            );
            apply_all(bcs, &mut state.u_filtered[i]);
        }
        Ok(())
    }

    /// 完整重算 Cs² 与 nut
    fn recompute(&mut self, velocity: &dyn VelocityField, dt: f64) -> LesResult<()> {
        self.velocity_operations(velocity)?;

        let ops = Arc::clone(&self.operators);
        let config = &self.config;
        let state = &mut self.state;
        let filter = TopHatFilter::new(ops.mass(), ops.lumped_inverse())?;
        let settings = FilterSettings {
            passes: config.filter_passes,
            weight: config.filter_weight,
        };

        compute_lij(&filter, &state.u_cg1, &state.u_filtered, settings, &mut state.lij)?;

        let inputs = MijInputs {
            mass: ops.mass(),
            derivatives: ops.derivatives(),
            delta_sq: ops.delta_sq(),
            alpha: config.test_filter_ratio,
            settings,
        };
        compute_mij(
            &filter,
            &mut self.strain,
            &inputs,
            &state.u_cg1,
            &state.u_filtered,
            &mut self.mij_workspace,
            &mut state.mij,
            &mut state.mag_s,
        )?;

        let averager = LagrangianAverager::new(
            &*self.disc,
            ops.delta(),
            config.time_scale,
            config.memory_floor,
        )?;
        averager.average(
            &mut state.jlm,
            &mut state.jmm,
            &state.lij,
            &state.mij,
            &state.u_cg1,
            dt,
        )?;

        let ceiling = config.coefficient_ceiling;
        for ((cs, &l), &m) in state.cs_sq.iter_mut().zip(state.jlm.iter()).zip(state.jmm.iter()) {
            *cs = (l / m).min(ceiling);
        }
        filter.apply_in_place(&mut state.cs_sq, config.coefficient_filter_passes, 1.0);
        clamp_max(ceiling, &mut state.cs_sq);

        for (((nut, &cs), &dsq), &mag) in state
            .nut
            .iter_mut()
            .zip(state.cs_sq.iter())
            .zip(ops.delta_sq().iter())
            .zip(state.mag_s.iter())
        {
            *nut = cs * dsq * mag;
        }
        apply_all(ops.nut_bcs(), &mut state.nut);
        Ok(())
    }

    /// 跳过步：由当前速度和已有 Cs² 刷新 nut
    fn refresh_nut(&mut self, velocity: &dyn VelocityField) -> LesResult<()> {
        let ops = Arc::clone(&self.operators);
        let disc = Arc::clone(&self.disc);
        let d = ops.dim().get();
        let nv = ops.dim().vertices_per_cell() as f64;

        for (i, slot) in self.skip_velocity.iter_mut().enumerate() {
            disc.interpolate(velocity, i, slot)?;
        }

        let cs_sq = &self.state.cs_sq;
        let source: Vec<f64> = (0..disc.n_cells())
            .map(|c| {
                let mut g = [[0.0; 3]; 3];
                for (i, row) in g.iter_mut().enumerate().take(d) {
                    let grad = disc.cell_gradient(&self.skip_velocity[i], c);
                    *row = grad.to_array();
                }
                let mag = VelocityGradient::new(g).strain_rate_magnitude();
                let cs_mean = disc.cell_dofs(c).iter().map(|&v| cs_sq[v]).sum::<f64>() / nv;
                cs_mean * ops.cell_delta_sq()[c] * mag
            })
            .collect();

        disc.project(
            &LinearForm::CellSource(&source),
            ops.mass(),
            &mut self.nut_solver,
            &mut self.state.nut,
        )?;
        clamp_min(0.0, &mut self.state.nut);
        apply_all(ops.nut_bcs(), &mut self.state.nut);
        Ok(())
    }

    fn build_report(&mut self, tstep: u64, kind: UpdateKind) -> StepReport {
        StepReport {
            tstep,
            kind,
            coefficient: FieldStatistics::from_slice(&self.state.cs_sq),
            nut: FieldStatistics::from_slice(&self.state.nut),
            jlm: FieldStatistics::from_slice(&self.state.jlm),
            jmm: FieldStatistics::from_slice(&self.state.jmm),
            strain_solves: SolveSummary::from(self.strain.take_statistics()),
            nut_solves: SolveSummary::from(self.nut_solver.take_statistics()),
        }
    }
}

impl<D: Discretization> EddyViscosityModel for DynamicLagrangianModel<D> {
    fn name(&self) -> &'static str {
        "DynamicLagrangian"
    }

    fn eddy_viscosity(&self) -> &[f64] {
        &self.state.nut
    }

    fn coefficient(&self) -> &[f64] {
        &self.state.cs_sq
    }

    fn update(&mut self, velocity: &dyn VelocityField, ctx: StepContext) -> LesResult<UpdateKind> {
        self.step(velocity, ctx)
    }
}

impl<D: Discretization> std::fmt::Debug for DynamicLagrangianModel<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLagrangianModel")
            .field("dim", &self.operators.dim())
            .field("n_dofs", &self.operators.n_dofs())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use les_fem::{BoundarySpec, NodalVelocity, P1Discretization, SimplexMesh, SubDomain};

    fn square_model(
        bcs: &VelocityBoundaryConditions,
        config: DynamicSmagorinskyConfig,
    ) -> LesResult<DynamicLagrangianModel<P1Discretization>> {
        let mut mesh = SimplexMesh::unit_square(4, 4)?;
        mesh.mark_vertices("lid", |p| (p.y - 1.0).abs() < 1e-12);
        DynamicLagrangianModel::setup(
            Arc::new(P1Discretization::new(mesh)),
            bcs,
            &["u0", "u1"],
            config,
        )
    }

    #[test]
    fn test_setup_initial_state() {
        let model = square_model(&VelocityBoundaryConditions::new(), Default::default()).unwrap();
        let state = model.state();
        assert_eq!(state.n_dofs(), 25);
        assert!(state.jlm.iter().all(|&v| v == 1e-32));
        assert!(state.jmm.iter().all(|&v| v == 1.0));
        assert!(model.operators().nut_bcs().is_empty());
        assert!(model.last_report().is_none());
    }

    #[test]
    fn test_delta_projection_uniform_mesh() {
        let model = square_model(&VelocityBoundaryConditions::new(), Default::default()).unwrap();
        // 均匀网格: |K| = 1/32, Δ = sqrt(1/32)
        let expected = (1.0_f64 / 32.0).sqrt();
        for &d in model.operators().delta() {
            assert!((d - expected).abs() < 1e-8);
        }
        for &d in model.operators().cell_delta_sq() {
            assert!((d - 1.0 / 32.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_setup_rejects_wrong_component_count() {
        let mesh = SimplexMesh::unit_square(2, 2).unwrap();
        let r = DynamicLagrangianModel::setup(
            Arc::new(P1Discretization::new(mesh)),
            &VelocityBoundaryConditions::new(),
            &["u0", "u1", "u2"],
            DynamicSmagorinskyConfig::default(),
        );
        assert!(matches!(r, Err(LesError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_setup_rejects_unknown_marker() {
        let bcs = VelocityBoundaryConditions::new()
            .with("u0", BoundarySpec::constant(SubDomain::Marker("inlet".into()), 1.0));
        let r = square_model(&bcs, Default::default());
        assert!(matches!(r, Err(LesError::BoundaryMismatch { .. })));
    }

    #[test]
    fn test_setup_rejects_invalid_config() {
        let config = DynamicSmagorinskyConfig {
            recompute_interval: 0,
            ..Default::default()
        };
        let r = square_model(&VelocityBoundaryConditions::new(), config);
        assert!(matches!(r, Err(LesError::InvalidConfig { .. })));
    }

    #[test]
    fn test_nut_bcs_follow_first_component() {
        let bcs = VelocityBoundaryConditions::new()
            .with("u0", BoundarySpec::constant(SubDomain::Marker("lid".into()), 1.0))
            .with("u1", BoundarySpec::no_slip());
        let model = square_model(&bcs, Default::default()).unwrap();
        let nut_bcs = model.operators().nut_bcs();
        assert_eq!(nut_bcs.len(), 1);
        assert_eq!(nut_bcs[0].dofs().len(), 5);
        assert!(nut_bcs[0].values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_velocity_bcs_applied_to_copies() {
        let bcs = VelocityBoundaryConditions::new()
            .with("u0", BoundarySpec::constant(SubDomain::Marker("lid".into()), 1.0));
        let mut model = square_model(&bcs, Default::default()).unwrap();
        let velocity = NodalVelocity::zeros(SpatialDim::Two, 25);
        let kind = model.step(&velocity, StepContext::new(0, 0.01).unwrap()).unwrap();
        assert_eq!(kind, UpdateKind::Recomputed);

        let state = model.state();
        for &dof in &[20, 21, 22, 23, 24] {
            assert_eq!(state.u_cg1[0][dof], 1.0);
            assert_eq!(state.u_filtered[0][dof], 1.0);
            assert_eq!(state.nut[dof], 0.0);
        }
        assert!(model.last_report().is_some());
    }

    #[test]
    fn test_eddy_viscosity_model_trait() {
        let mut model = square_model(&VelocityBoundaryConditions::new(), Default::default()).unwrap();
        let closure: &mut dyn EddyViscosityModel = &mut model;
        assert_eq!(closure.name(), "DynamicLagrangian");
        let velocity = NodalVelocity::zeros(SpatialDim::Two, 25);
        closure
            .update(&velocity, StepContext::new(0, 0.1).unwrap())
            .unwrap();
        assert_eq!(closure.eddy_viscosity().len(), 25);
        assert_eq!(closure.get_eddy_viscosity(1000), 0.0);
    }
}
