// crates/les_fem/src/bc.rs

//! Dirichlet 边界条件
//!
//! 描述层与离散层分离：
//!
//! - [`SubDomain`] + [`BcValue`] = [`BoundarySpec`]：与网格无关的描述
//! - [`VelocityBoundaryConditions`]：按速度分量名称组织的描述集合
//! - [`DirichletBc`]：在 CG1 空间上离散后的 (自由度, 值) 列表
//!
//! 离散化在 setup 阶段完成一次，之后每步只做 [`DirichletBc::apply`]。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use les_foundation::error::{LesError, LesResult};

use crate::discretization::Discretization;

/// 区域判定的几何容差
const REGION_TOL: f64 = 1e-10;

// =============================================================================
// 描述层
// =============================================================================

/// 边界条件作用的子区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubDomain {
    /// 全部边界顶点
    Boundary,
    /// 网格上已命名的顶点集合
    Marker(String),
    /// 轴对齐盒子内的顶点
    Region {
        /// 盒子下角
        min: DVec3,
        /// 盒子上角
        max: DVec3,
        /// 是否只取边界顶点
        #[serde(default = "default_on_boundary")]
        on_boundary: bool,
    },
}

fn default_on_boundary() -> bool {
    true
}

impl SubDomain {
    /// 点是否落在 Region 盒子内（含容差）
    pub fn region_contains(min: DVec3, max: DVec3, p: DVec3) -> bool {
        p.cmpge(min - DVec3::splat(REGION_TOL)).all() && p.cmple(max + DVec3::splat(REGION_TOL)).all()
    }
}

impl fmt::Display for SubDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boundary => write!(f, "boundary"),
            Self::Marker(name) => write!(f, "marker '{}'", name),
            Self::Region { min, max, .. } => write!(f, "region [{} .. {}]", min, max),
        }
    }
}

/// 边界值
#[derive(Clone)]
pub enum BcValue {
    /// 常数
    Constant(f64),
    /// 位置的函数
    Expression(Arc<dyn Fn(DVec3) -> f64 + Send + Sync>),
}

impl BcValue {
    /// 在点 `p` 处求值
    #[inline]
    pub fn eval(&self, p: DVec3) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Expression(f) => f(p),
        }
    }

    /// 从闭包创建表达式
    pub fn expression<F>(f: F) -> Self
    where
        F: Fn(DVec3) -> f64 + Send + Sync + 'static,
    {
        Self::Expression(Arc::new(f))
    }
}

impl fmt::Debug for BcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => write!(f, "Constant({})", v),
            Self::Expression(_) => write!(f, "Expression(..)"),
        }
    }
}

/// 单条边界条件描述
#[derive(Debug, Clone)]
pub struct BoundarySpec {
    /// 作用区域
    pub subdomain: SubDomain,
    /// 边界值
    pub value: BcValue,
}

impl BoundarySpec {
    /// 创建描述
    pub fn new(subdomain: SubDomain, value: BcValue) -> Self {
        Self { subdomain, value }
    }

    /// 常数值边界
    pub fn constant(subdomain: SubDomain, value: f64) -> Self {
        Self::new(subdomain, BcValue::Constant(value))
    }

    /// 全边界无滑移
    pub fn no_slip() -> Self {
        Self::constant(SubDomain::Boundary, 0.0)
    }
}

/// 速度边界条件集合，按速度分量名称组织
///
/// 外部求解器的名称约定（如 `u0`, `u1`, `u2`）原样保留，
/// setup 时与传入的分量名称逐一核对。
#[derive(Debug, Clone, Default)]
pub struct VelocityBoundaryConditions {
    specs: BTreeMap<String, Vec<BoundarySpec>>,
}

impl VelocityBoundaryConditions {
    /// 空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 为分量追加一条边界条件
    pub fn add(&mut self, component: impl Into<String>, spec: BoundarySpec) -> &mut Self {
        self.specs.entry(component.into()).or_default().push(spec);
        self
    }

    /// 链式追加
    pub fn with(mut self, component: impl Into<String>, spec: BoundarySpec) -> Self {
        self.add(component, spec);
        self
    }

    /// 对所有分量施加同一条件
    pub fn all_components<S: AsRef<str>>(names: &[S], spec: BoundarySpec) -> Self {
        let mut bcs = Self::new();
        for name in names {
            bcs.add(name.as_ref(), spec.clone());
        }
        bcs
    }

    /// 分量的边界条件（无则为空）
    pub fn component(&self, name: &str) -> &[BoundarySpec] {
        self.specs.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 出现过的分量名称
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(|s| s.as_str())
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.specs.values().all(|v| v.is_empty())
    }

    /// 按给定分量顺序离散化
    ///
    /// 出现未知分量名称时返回 [`LesError::BoundaryMismatch`]。
    pub fn discretize<D, S>(&self, disc: &D, names: &[S]) -> LesResult<Vec<Vec<DirichletBc>>>
    where
        D: Discretization + ?Sized,
        S: AsRef<str>,
    {
        for key in self.specs.keys() {
            if !names.iter().any(|n| n.as_ref() == key) {
                let known: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
                return Err(LesError::boundary_mismatch(format!(
                    "边界条件引用了未知速度分量 '{}', 已知分量: {:?}",
                    key, known
                )));
            }
        }

        names
            .iter()
            .map(|name| {
                self.component(name.as_ref())
                    .iter()
                    .map(|spec| DirichletBc::new(disc, spec))
                    .collect::<LesResult<Vec<_>>>()
            })
            .collect()
    }
}

// =============================================================================
// 离散层
// =============================================================================

/// CG1 空间上的离散 Dirichlet 条件
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletBc {
    dofs: Vec<usize>,
    values: Vec<f64>,
}

impl DirichletBc {
    /// 在离散空间上定位自由度并求值
    pub fn new<D: Discretization + ?Sized>(disc: &D, spec: &BoundarySpec) -> LesResult<Self> {
        let dofs = disc.locate_dofs(&spec.subdomain)?;
        if dofs.is_empty() {
            tracing::warn!("边界条件 {} 没有匹配任何自由度", spec.subdomain);
        }
        let values = dofs
            .iter()
            .map(|&dof| spec.value.eval(disc.dof_coordinate(dof)))
            .collect();
        Ok(Self { dofs, values })
    }

    /// 相同自由度上的零值条件
    pub fn homogeneous(&self) -> Self {
        Self {
            dofs: self.dofs.clone(),
            values: vec![0.0; self.dofs.len()],
        }
    }

    /// 受约束的自由度
    #[inline]
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// 约束值
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 将约束值写入节点场
    #[inline]
    pub fn apply(&self, field: &mut [f64]) {
        for (&dof, &v) in self.dofs.iter().zip(self.values.iter()) {
            field[dof] = v;
        }
    }
}

/// 依次施加一组条件
pub fn apply_all(bcs: &[DirichletBc], field: &mut [f64]) {
    for bc in bcs {
        bc.apply(field);
    }
}
