// crates/les_dynamic/src/lagrangian.rs

//! Lagrangian 路径平均
//!
//! 沿流体质点轨迹对 L:M 与 M:M 做指数加权平均（Meneveau, Lund & Cabot 1996）：
//!
//! ```text
//! T       = 1.5 Δ (J_LM J_MM)^(-1/8)
//! ε       = (dt/T) / (1 + dt/T)
//! J*(x_i) = J(x_i - dt u_i)               （半 Lagrangian 回溯）
//! J_LM    ← ε L:M + (1 - ε) J_LM*
//! J_MM    ← ε M:M + (1 - ε) J_MM*
//! ```
//!
//! 出发点 x_i - dt u_i 在包含它的单元上做 P1 插值；落在网格外时取节点
//! 自身的旧值。插值是凸组合，所以 J* 不会越出旧场的取值范围。
//!
//! 回溯所用的 u 是本次重算刚插值并施加边界条件的 CG1 速度，而不是
//! 上一时间步的速度。
//!
//! 更新后两个记忆场都截断到下限，保证 J_MM > 0。

use glam::DVec3;

use les_fem::{CellLocation, Discretization};
use les_foundation::error::{LesError, LesResult};
use les_foundation::validation::ensure_len;
use les_numerics::linear_algebra::vector_ops::clamp_min;

use crate::config::LagrangianTimeScale;
use crate::tensor::SymmetricTensorField;

/// 松弛权重 ε = (dt/T) / (1 + dt/T)，限制在 [0, 1]
///
/// T 非有限或非正时返回 1（完全采用新值）。
#[inline]
pub fn relaxation_weight(dt: f64, t: f64) -> f64 {
    if !(t.is_finite() && t > 0.0) {
        return 1.0;
    }
    let ratio = dt / t;
    if !ratio.is_finite() {
        return 1.0;
    }
    (ratio / (1.0 + ratio)).clamp(0.0, 1.0)
}

/// 张量双点积 A:B（逐节点）
pub fn tensor_inner(a: &SymmetricTensorField, b: &SymmetricTensorField, out: &mut [f64]) {
    for (dof, slot) in out.iter_mut().enumerate() {
        *slot = a.contract_at(b, dof);
    }
}

/// Lagrangian 平均器
pub struct LagrangianAverager<'a> {
    disc: &'a dyn Discretization,
    delta: &'a [f64],
    time_scale: LagrangianTimeScale,
    memory_floor: f64,
}

impl<'a> LagrangianAverager<'a> {
    /// 创建平均器
    ///
    /// - `delta`: 节点滤波宽度 Δ（非平方）
    pub fn new(
        disc: &'a dyn Discretization,
        delta: &'a [f64],
        time_scale: LagrangianTimeScale,
        memory_floor: f64,
    ) -> LesResult<Self> {
        ensure_len("delta", delta, disc.n_dofs())?;
        Ok(Self {
            disc,
            delta,
            time_scale,
            memory_floor,
        })
    }

    /// 逐节点松弛权重
    pub fn relaxation_weights(&self, j1: &[f64], j2: &[f64], dt: f64, out: &mut [f64]) {
        for (i, eps) in out.iter_mut().enumerate() {
            let t = self.time_scale.evaluate(self.delta[i].abs(), j1[i], j2[i]);
            *eps = relaxation_weight(dt, t);
        }
    }

    /// 定位每个节点的出发点 x_i - dt u_i
    ///
    /// 出发点在网格外时为 `None`。
    pub fn departure_points(
        &self,
        velocity: &[Vec<f64>],
        dt: f64,
    ) -> LesResult<Vec<Option<CellLocation>>> {
        let n = self.disc.n_dofs();
        let d = self.disc.dim().get();
        if velocity.len() != d {
            return Err(LesError::dimension_mismatch("lagrangian velocity", d, velocity.len()));
        }
        for u in velocity {
            ensure_len("lagrangian velocity", u, n)?;
        }

        Ok((0..n)
            .map(|i| {
                let mut u = DVec3::ZERO;
                for (axis, comp) in velocity.iter().enumerate() {
                    u[axis] = comp[i];
                }
                self.disc.locate_near(self.disc.dof_coordinate(i) - dt * u, i)
            })
            .collect())
    }

    /// 上游值 J*(x_i) = J(x_i - dt u_i)；出发点在网格外时取 J(x_i)
    pub fn upstream(&self, field: &[f64], departures: &[Option<CellLocation>], out: &mut [f64]) {
        for (i, (slot, dep)) in out.iter_mut().zip(departures.iter()).enumerate() {
            *slot = match dep {
                Some(loc) => self.disc.evaluate_at(field, loc),
                None => field[i],
            };
        }
    }

    /// 推进 (J1, J2) 一步
    ///
    /// `j1`、`j2` 原位更新；A:B 进入 J1，B:B 进入 J2。
    pub fn average(
        &self,
        j1: &mut [f64],
        j2: &mut [f64],
        a: &SymmetricTensorField,
        b: &SymmetricTensorField,
        velocity: &[Vec<f64>],
        dt: f64,
    ) -> LesResult<()> {
        let n = self.disc.n_dofs();
        if j1.len() != n || j2.len() != n {
            return Err(LesError::size_mismatch("lagrangian memory", n, j1.len().min(j2.len())));
        }
        let departures = self.departure_points(velocity, dt)?;

        // ε 用更新前的记忆场
        let mut eps = vec![0.0; n];
        self.relaxation_weights(j1, j2, dt, &mut eps);

        let mut j1_up = vec![0.0; n];
        let mut j2_up = vec![0.0; n];
        self.upstream(j1, &departures, &mut j1_up);
        self.upstream(j2, &departures, &mut j2_up);

        let mut ab = vec![0.0; n];
        let mut bb = vec![0.0; n];
        tensor_inner(a, b, &mut ab);
        tensor_inner(b, b, &mut bb);

        for i in 0..n {
            let e = eps[i];
            j1[i] = e * ab[i] + (1.0 - e) * j1_up[i];
            j2[i] = e * bb[i] + (1.0 - e) * j2_up[i];
        }

        clamp_min(self.memory_floor, j1);
        clamp_min(self.memory_floor, j2);
        Ok(())
    }
}

impl std::fmt::Debug for LagrangianAverager<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LagrangianAverager")
            .field("n_dofs", &self.disc.n_dofs())
            .field("time_scale", &self.time_scale)
            .field("memory_floor", &self.memory_floor)
            .finish()
    }
}
