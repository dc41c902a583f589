// crates/les_fem/src/velocity.rs

//! 速度场来源
//!
//! 亚格子模型不拥有速度场，只通过 [`VelocityField`] 在 CG1 节点上取值：
//!
//! - [`NodalVelocity`]: 外部求解器给出的节点速度（与网格顶点一一对应）
//! - [`AnalyticVelocity`]: 解析速度场（测试和演示用）

use std::fmt;

use glam::DVec3;

use les_foundation::error::{LesError, LesResult};
use les_foundation::validation::ensure_finite;
use les_foundation::SpatialDim;

/// 速度场 trait
pub trait VelocityField: Send + Sync {
    /// 速度分量数
    fn n_components(&self) -> usize;

    /// 顶点 `vertex`（坐标 `position`）处第 `component` 个分量的值
    fn value(&self, vertex: usize, position: DVec3, component: usize) -> f64;

    /// 检查与网格是否兼容
    fn check_compatible(&self, n_vertices: usize) -> LesResult<()> {
        let _ = n_vertices;
        Ok(())
    }
}

// =============================================================================
// 节点速度
// =============================================================================

/// 节点速度（每个分量一个顶点数组）
#[derive(Debug, Clone, PartialEq)]
pub struct NodalVelocity {
    components: Vec<Vec<f64>>,
}

impl NodalVelocity {
    /// 从分量数组创建
    pub fn new(components: Vec<Vec<f64>>) -> LesResult<Self> {
        if components.is_empty() {
            return Err(LesError::dimension_mismatch("NodalVelocity", 2, 0));
        }
        let n = components[0].len();
        if let Some(bad) = components.iter().find(|c| c.len() != n) {
            return Err(LesError::size_mismatch("velocity component", n, bad.len()));
        }
        for c in &components {
            ensure_finite("velocity component", c)?;
        }
        Ok(Self { components })
    }

    /// 全零速度场
    pub fn zeros(dim: SpatialDim, n_vertices: usize) -> Self {
        Self {
            components: vec![vec![0.0; n_vertices]; dim.get()],
        }
    }

    /// 均匀速度场
    pub fn uniform(value: DVec3, dim: SpatialDim, n_vertices: usize) -> Self {
        Self {
            components: (0..dim.get()).map(|i| vec![value[i]; n_vertices]).collect(),
        }
    }

    /// 第 i 个分量
    #[inline]
    pub fn component(&self, i: usize) -> &[f64] {
        &self.components[i]
    }

    /// 第 i 个分量（可变）
    #[inline]
    pub fn component_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.components[i]
    }

    /// 顶点数
    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.components[0].len()
    }
}

impl VelocityField for NodalVelocity {
    fn n_components(&self) -> usize {
        self.components.len()
    }

    #[inline]
    fn value(&self, vertex: usize, _position: DVec3, component: usize) -> f64 {
        self.components[component][vertex]
    }

    fn check_compatible(&self, n_vertices: usize) -> LesResult<()> {
        if self.n_vertices() != n_vertices {
            return Err(LesError::size_mismatch(
                "nodal velocity",
                n_vertices,
                self.n_vertices(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// 解析速度
// =============================================================================

type VelocityFn = dyn Fn(DVec3) -> DVec3 + Send + Sync;

/// 解析速度场 u = f(x)
pub struct AnalyticVelocity {
    dim: SpatialDim,
    func: Box<VelocityFn>,
}

impl AnalyticVelocity {
    /// 从闭包创建
    pub fn new<F>(dim: SpatialDim, func: F) -> Self
    where
        F: Fn(DVec3) -> DVec3 + Send + Sync + 'static,
    {
        Self {
            dim,
            func: Box::new(func),
        }
    }

    /// 在任意点求值
    #[inline]
    pub fn eval(&self, position: DVec3) -> DVec3 {
        (self.func)(position)
    }
}

impl fmt::Debug for AnalyticVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticVelocity")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl VelocityField for AnalyticVelocity {
    fn n_components(&self) -> usize {
        self.dim.get()
    }

    #[inline]
    fn value(&self, _vertex: usize, position: DVec3, component: usize) -> f64 {
        self.eval(position)[component]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodal_velocity() {
        let u = NodalVelocity::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(u.n_components(), 2);
        assert_eq!(u.value(1, DVec3::ZERO, 0), 2.0);
        assert!(u.check_compatible(2).is_ok());
        assert!(u.check_compatible(3).is_err());
    }

    #[test]
    fn test_nodal_velocity_ragged_rejected() {
        assert!(NodalVelocity::new(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(NodalVelocity::new(vec![]).is_err());
        assert!(NodalVelocity::new(vec![vec![1.0, f64::NAN], vec![0.0, 0.0]]).is_err());
    }

    #[test]
    fn test_uniform() {
        let u = NodalVelocity::uniform(DVec3::new(1.0, -2.0, 5.0), SpatialDim::Two, 4);
        assert_eq!(u.n_components(), 2);
        assert_eq!(u.component(1), &[-2.0; 4]);
    }

    #[test]
    fn test_analytic_velocity() {
        let u = AnalyticVelocity::new(SpatialDim::Three, |p| DVec3::new(p.y, -p.x, 0.5));
        assert_eq!(u.n_components(), 3);
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(u.value(0, p, 0), 2.0);
        assert_eq!(u.value(0, p, 1), -1.0);
        assert_eq!(u.value(0, p, 2), 0.5);
    }
}
