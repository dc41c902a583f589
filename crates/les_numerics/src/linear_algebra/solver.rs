// crates/les_numerics/src/linear_algebra/solver.rs

//! 迭代线性求解器
//!
//! 提供用于求解稀疏线性系统 Ax = b 的迭代方法：
//!
//! - [`ConjugateGradient`]: 共轭梯度法（CG）
//! - [`PcgSolver`]: 预条件共轭梯度法（PCG）
//! - [`BiCgStabSolver`]: 双共轭梯度稳定法（BiCGStab）
//!
//! 求解器本身从不报错：未收敛时返回带状态的 [`SolverResult`]，
//! `x` 中保留最后一次迭代值。是否把未收敛视为错误由调用方决定
//! （见 [`KrylovSolver`](super::krylov::KrylovSolver)）。
//!
//! # 使用示例
//!
//! ```
//! use les_numerics::linear_algebra::{
//!     CsrMatrix, IterativeSolver, JacobiPreconditioner, PcgSolver, SolverConfig,
//! };
//!
//! let matrix = CsrMatrix::diagonal(&[2.0, 4.0, 8.0]);
//! let b = vec![2.0, 4.0, 8.0];
//! let mut x = vec![0.0; 3];
//!
//! let precond = JacobiPreconditioner::from_matrix(&matrix);
//! let mut solver = PcgSolver::new(SolverConfig::new(1e-10, 100));
//! let result = solver.solve(&matrix, &b, &mut x, &precond);
//! assert!(result.is_converged());
//! assert!((x[2] - 1.0).abs() < 1e-10);
//! ```

use serde::{Deserialize, Serialize};

use super::csr::CsrMatrix;
use super::preconditioner::Preconditioner;
use super::vector_ops::{axpy, copy, dot, norm2};

/// 分母视为零（算法停滞）的阈值
const BREAKDOWN_TOL: f64 = 1e-300;

/// BiCGStab 发散判据：残差超过初始残差的倍数
const DIVERGENCE_FACTOR: f64 = 1e10;

/// 求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 相对收敛容差
    pub rtol: f64,
    /// 绝对收敛容差
    pub atol: f64,
    /// 最大迭代次数
    pub max_iter: usize,
    /// 是否打印迭代信息
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// 创建求解器配置
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }

    /// 启用详细输出
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// 求解器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterationsReached,
    /// 发散
    Diverged,
    /// 停滞
    Stagnated,
}

/// 求解器结果
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    /// 求解状态
    pub status: SolverStatus,
    /// 迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: f64,
    /// 初始残差范数
    pub initial_residual_norm: f64,
    /// 相对残差
    pub relative_residual: f64,
}

impl SolverResult {
    /// 是否成功收敛
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    fn converged_at_start(norm: f64) -> Self {
        Self {
            status: SolverStatus::Converged,
            iterations: 0,
            residual_norm: norm,
            initial_residual_norm: norm,
            relative_residual: 0.0,
        }
    }

    fn finished(status: SolverStatus, iterations: usize, res_norm: f64, initial: f64) -> Self {
        Self {
            status,
            iterations,
            residual_norm: res_norm,
            initial_residual_norm: initial,
            relative_residual: res_norm / initial,
        }
    }
}

/// 迭代求解器 trait
pub trait IterativeSolver {
    /// 求解线性系统 Ax = b
    ///
    /// - `x`: 输入初始猜测，输出解（未收敛时为最后一次迭代值）
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult;

    /// 获取求解器名称
    fn name(&self) -> &'static str;
}

/// 收敛阈值：max(atol, rtol*||b||)，||b|| ≈ 0 时退化为 atol
fn effective_tolerance(config: &SolverConfig, b: &[f64]) -> f64 {
    let b_norm = norm2(b);
    if b_norm < f64::MIN_POSITIVE {
        config.atol
    } else {
        config.atol.max(config.rtol * b_norm)
    }
}

/// r = b - A*x
fn residual(matrix: &CsrMatrix, b: &[f64], x: &[f64], r: &mut [f64]) {
    matrix.mul_vec(x, r);
    for (ri, &bi) in r.iter_mut().zip(b.iter()) {
        *ri = bi - *ri;
    }
}

fn ensure_len(buf: &mut Vec<f64>, n: usize) {
    if buf.len() != n {
        *buf = vec![0.0; n];
    }
}

/// 共轭梯度法求解器
///
/// 适用于对称正定矩阵，忽略传入的预条件器。
pub struct ConjugateGradient {
    config: SolverConfig,
    r: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl ConjugateGradient {
    /// 创建共轭梯度求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }
}

impl IterativeSolver for ConjugateGradient {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        _precond: &P,
    ) -> SolverResult {
        let n = b.len();
        ensure_len(&mut self.r, n);
        ensure_len(&mut self.p, n);
        ensure_len(&mut self.ap, n);

        let tol = effective_tolerance(&self.config, b);
        residual(matrix, b, x, &mut self.r);

        let initial_norm = norm2(&self.r);
        if initial_norm < tol {
            return SolverResult::converged_at_start(initial_norm);
        }

        copy(&self.r, &mut self.p);
        let mut rr = dot(&self.r, &self.r);

        for iter in 0..self.config.max_iter {
            matrix.mul_vec(&self.p, &mut self.ap);

            let pap = dot(&self.p, &self.ap);
            if pap.abs() < BREAKDOWN_TOL {
                return SolverResult::finished(
                    SolverStatus::Stagnated,
                    iter,
                    norm2(&self.r),
                    initial_norm,
                );
            }

            let alpha = rr / pap;
            axpy(alpha, &self.p, x);
            axpy(-alpha, &self.ap, &mut self.r);

            let res_norm = norm2(&self.r);
            if self.config.verbose {
                log::trace!("CG iter {}: residual = {:.6e}", iter + 1, res_norm);
            }

            if res_norm < tol {
                return SolverResult::finished(
                    SolverStatus::Converged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }

            let rr_new = dot(&self.r, &self.r);
            let beta = rr_new / rr;
            rr = rr_new;

            for (pi, &ri) in self.p.iter_mut().zip(self.r.iter()) {
                *pi = ri + beta * *pi;
            }
        }

        SolverResult::finished(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            norm2(&self.r),
            initial_norm,
        )
    }

    fn name(&self) -> &'static str {
        "CG"
    }
}

/// 预条件共轭梯度法求解器
///
/// 适用于对称正定矩阵（有限元质量矩阵）。
pub struct PcgSolver {
    config: SolverConfig,
    r: Vec<f64>,
    z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl PcgSolver {
    /// 创建 PCG 求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }
}

impl IterativeSolver for PcgSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult {
        let n = b.len();
        ensure_len(&mut self.r, n);
        ensure_len(&mut self.z, n);
        ensure_len(&mut self.p, n);
        ensure_len(&mut self.ap, n);

        let tol = effective_tolerance(&self.config, b);
        residual(matrix, b, x, &mut self.r);

        let initial_norm = norm2(&self.r);
        if initial_norm < tol {
            return SolverResult::converged_at_start(initial_norm);
        }

        precond.apply(&self.r, &mut self.z);
        copy(&self.z, &mut self.p);
        let mut rz = dot(&self.r, &self.z);

        for iter in 0..self.config.max_iter {
            matrix.mul_vec(&self.p, &mut self.ap);

            let pap = dot(&self.p, &self.ap);
            if pap.abs() < BREAKDOWN_TOL {
                return SolverResult::finished(
                    SolverStatus::Stagnated,
                    iter,
                    norm2(&self.r),
                    initial_norm,
                );
            }

            let alpha = rz / pap;
            axpy(alpha, &self.p, x);
            axpy(-alpha, &self.ap, &mut self.r);

            let res_norm = norm2(&self.r);
            if self.config.verbose {
                log::trace!("PCG iter {}: residual = {:.6e}", iter + 1, res_norm);
            }

            if res_norm < tol {
                return SolverResult::finished(
                    SolverStatus::Converged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }

            precond.apply(&self.r, &mut self.z);
            let rz_new = dot(&self.r, &self.z);
            let beta = rz_new / rz;
            rz = rz_new;

            for (pi, &zi) in self.p.iter_mut().zip(self.z.iter()) {
                *pi = zi + beta * *pi;
            }
        }

        SolverResult::finished(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            norm2(&self.r),
            initial_norm,
        )
    }

    fn name(&self) -> &'static str {
        "PCG"
    }
}

/// BiCGStab 求解器
///
/// 适用于非对称矩阵。
pub struct BiCgStabSolver {
    config: SolverConfig,
    r: Vec<f64>,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    z: Vec<f64>,
}

impl BiCgStabSolver {
    /// 创建 BiCGStab 求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            z: Vec::new(),
        }
    }
}

impl IterativeSolver for BiCgStabSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult {
        let n = b.len();
        for buf in [
            &mut self.r,
            &mut self.r0,
            &mut self.p,
            &mut self.v,
            &mut self.s,
            &mut self.t,
            &mut self.z,
        ] {
            ensure_len(buf, n);
        }

        let tol = effective_tolerance(&self.config, b);
        residual(matrix, b, x, &mut self.r);

        let initial_norm = norm2(&self.r);
        if initial_norm < tol {
            return SolverResult::converged_at_start(initial_norm);
        }

        copy(&self.r, &mut self.r0);
        self.p.fill(0.0);
        self.v.fill(0.0);

        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;

        for iter in 0..self.config.max_iter {
            let rho_new = dot(&self.r0, &self.r);
            if rho_new.abs() < BREAKDOWN_TOL {
                return SolverResult::finished(
                    SolverStatus::Stagnated,
                    iter,
                    norm2(&self.r),
                    initial_norm,
                );
            }

            let beta = (rho_new / rho) * (alpha / omega);
            rho = rho_new;

            // p = r + beta * (p - omega * v)
            for ((pi, &ri), &vi) in self.p.iter_mut().zip(self.r.iter()).zip(self.v.iter()) {
                *pi = ri + beta * (*pi - omega * vi);
            }

            // v = A * M⁻¹ p
            precond.apply(&self.p, &mut self.z);
            matrix.mul_vec(&self.z, &mut self.v);

            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < BREAKDOWN_TOL {
                return SolverResult::finished(
                    SolverStatus::Stagnated,
                    iter,
                    norm2(&self.r),
                    initial_norm,
                );
            }
            alpha = rho / r0v;

            // s = r - alpha * v
            for ((si, &ri), &vi) in self.s.iter_mut().zip(self.r.iter()).zip(self.v.iter()) {
                *si = ri - alpha * vi;
            }

            let s_norm = norm2(&self.s);
            if s_norm < tol {
                axpy(alpha, &self.z, x);
                return SolverResult::finished(
                    SolverStatus::Converged,
                    iter + 1,
                    s_norm,
                    initial_norm,
                );
            }

            // x += alpha * M⁻¹ p（z 仍保存 M⁻¹ p）
            axpy(alpha, &self.z, x);

            // t = A * M⁻¹ s
            precond.apply(&self.s, &mut self.z);
            matrix.mul_vec(&self.z, &mut self.t);

            let tt = dot(&self.t, &self.t);
            omega = if tt.abs() < BREAKDOWN_TOL {
                0.0
            } else {
                dot(&self.t, &self.s) / tt
            };

            if omega.abs() < BREAKDOWN_TOL {
                return SolverResult::finished(
                    SolverStatus::Stagnated,
                    iter + 1,
                    s_norm,
                    initial_norm,
                );
            }

            // x += omega * M⁻¹ s
            axpy(omega, &self.z, x);

            // r = s - omega * t
            for ((ri, &si), &ti) in self.r.iter_mut().zip(self.s.iter()).zip(self.t.iter()) {
                *ri = si - omega * ti;
            }

            let res_norm = norm2(&self.r);
            if self.config.verbose {
                log::trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, res_norm);
            }

            if res_norm < tol {
                return SolverResult::finished(
                    SolverStatus::Converged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }

            if res_norm > initial_norm * DIVERGENCE_FACTOR {
                return SolverResult::finished(
                    SolverStatus::Diverged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }
        }

        SolverResult::finished(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            norm2(&self.r),
            initial_norm,
        )
    }

    fn name(&self) -> &'static str {
        "BiCGStab"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_algebra::csr::CsrBuilder;
    use crate::linear_algebra::preconditioner::{IdentityPreconditioner, JacobiPreconditioner};

    fn create_spd_matrix(n: usize) -> CsrMatrix {
        // 三对角对称正定矩阵
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n {
            builder.set(i, i, 4.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i < n - 1 {
                builder.set(i, i + 1, -1.0);
            }
        }
        builder.build()
    }

    fn residual_norm(matrix: &CsrMatrix, b: &[f64], x: &[f64]) -> f64 {
        let mut r = vec![0.0; b.len()];
        residual(matrix, b, x, &mut r);
        norm2(&r)
    }

    #[test]
    fn test_cg_simple() {
        let matrix = create_spd_matrix(10);
        let b = vec![1.0; 10];
        let mut x = vec![0.0; 10];

        let mut solver = ConjugateGradient::new(SolverConfig::new(1e-10, 100));
        let result = solver.solve(&matrix, &b, &mut x, &IdentityPreconditioner::new());

        assert!(result.is_converged());
        assert!(residual_norm(&matrix, &b, &x) < 1e-8);
    }

    #[test]
    fn test_pcg_simple() {
        let matrix = create_spd_matrix(10);
        let b = vec![1.0; 10];
        let mut x = vec![0.0; 10];

        let mut solver = PcgSolver::new(SolverConfig::new(1e-10, 100));
        let precond = JacobiPreconditioner::from_matrix(&matrix);
        let result = solver.solve(&matrix, &b, &mut x, &precond);

        assert!(result.is_converged());
        assert!(residual_norm(&matrix, &b, &x) < 1e-8);
    }

    #[test]
    fn test_bicgstab_nonsymmetric() {
        let mut builder = CsrBuilder::new_square(3);
        builder.set(0, 0, 4.0);
        builder.set(0, 1, 1.0);
        builder.set(1, 0, -1.0);
        builder.set(1, 1, 5.0);
        builder.set(1, 2, 2.0);
        builder.set(2, 1, 0.5);
        builder.set(2, 2, 3.0);
        let matrix = builder.build();
        let b = vec![1.0, 2.0, 3.0];
        let mut x = vec![0.0; 3];

        let mut solver = BiCgStabSolver::new(SolverConfig::new(1e-12, 100));
        let precond = JacobiPreconditioner::from_matrix(&matrix);
        let result = solver.solve(&matrix, &b, &mut x, &precond);

        assert!(result.is_converged());
        assert!(residual_norm(&matrix, &b, &x) < 1e-9);
    }

    #[test]
    fn test_already_converged() {
        let matrix = create_spd_matrix(3);
        let x_exact = vec![0.25, 0.25, 0.25];
        let mut b = vec![0.0; 3];
        matrix.mul_vec(&x_exact, &mut b);

        let mut x = x_exact.clone();
        let mut solver = PcgSolver::new(SolverConfig::new(1e-10, 100));
        let result = solver.solve(&matrix, &b, &mut x, &IdentityPreconditioner::new());

        assert!(result.is_converged());
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_zero_rhs_returns_zero() {
        let matrix = create_spd_matrix(5);
        let b = vec![0.0; 5];
        let mut x = vec![0.0; 5];
        let mut solver = PcgSolver::new(SolverConfig::default());
        let result = solver.solve(&matrix, &b, &mut x, &IdentityPreconditioner::new());
        assert!(result.is_converged());
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_max_iterations_keeps_iterate() {
        let matrix = create_spd_matrix(50);
        let b = vec![1.0; 50];
        let mut x = vec![0.0; 50];

        let mut solver = ConjugateGradient::new(SolverConfig::new(1e-14, 2));
        let result = solver.solve(&matrix, &b, &mut x, &IdentityPreconditioner::new());

        assert_eq!(result.status, SolverStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 2);
        // 未收敛也保留了改进后的迭代值
        assert!(residual_norm(&matrix, &b, &x) < norm2(&b));
    }
}
