// crates/les_dynamic/src/config.rs

//! 动态 Smagorinsky 模型配置
//!
//! 所有字段都有默认值，JSON 中可只写需要修改的字段：
//!
//! ```
//! use les_dynamic::config::DynamicSmagorinskyConfig;
//!
//! let config = DynamicSmagorinskyConfig::from_json_str(r#"{ "recompute_interval": 5 }"#).unwrap();
//! assert_eq!(config.recompute_interval, 5);
//! assert_eq!(config.coefficient_ceiling, 0.09);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use les_foundation::error::{LesError, LesResult};
use les_foundation::validation::{ensure_in_range, ensure_non_negative, ensure_positive};
use les_numerics::linear_algebra::SolverSelection;

/// 动态 Smagorinsky 模型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSmagorinskyConfig {
    /// 完整重算间隔 K（步数）：tstep mod K == 0 时重算系数
    #[serde(default = "default_recompute_interval")]
    pub recompute_interval: u64,

    /// 速度与张量的滤波次数 N
    #[serde(default = "default_filter_passes")]
    pub filter_passes: usize,

    /// 滤波混合权重
    #[serde(default = "default_filter_weight")]
    pub filter_weight: f64,

    /// Cs² 场的平滑次数
    #[serde(default = "default_coefficient_filter_passes")]
    pub coefficient_filter_passes: usize,

    /// 测试滤波与网格滤波宽度之比 α
    #[serde(default = "default_test_filter_ratio")]
    pub test_filter_ratio: f64,

    /// Cs² 上限
    #[serde(default = "default_coefficient_ceiling")]
    pub coefficient_ceiling: f64,

    /// JLM 初值
    #[serde(default = "default_initial_jlm")]
    pub initial_jlm: f64,

    /// JMM 初值
    #[serde(default = "default_initial_jmm")]
    pub initial_jmm: f64,

    /// JLM、JMM 的下限
    #[serde(default = "default_memory_floor")]
    pub memory_floor: f64,

    /// Lagrangian 时间尺度参数
    #[serde(default)]
    pub time_scale: LagrangianTimeScale,

    /// 应变率（质量矩阵）求解器
    #[serde(default)]
    pub strain_solver: SolverSelection,

    /// nut 投影求解器
    #[serde(default)]
    pub nut_solver: SolverSelection,
}

fn default_recompute_interval() -> u64 {
    1
}
fn default_filter_passes() -> usize {
    1
}
fn default_filter_weight() -> f64 {
    1.0
}
fn default_coefficient_filter_passes() -> usize {
    2
}
fn default_test_filter_ratio() -> f64 {
    2.0
}
fn default_coefficient_ceiling() -> f64 {
    0.09
}
fn default_initial_jlm() -> f64 {
    1e-32
}
fn default_initial_jmm() -> f64 {
    1.0
}
fn default_memory_floor() -> f64 {
    1e-32
}

impl Default for DynamicSmagorinskyConfig {
    fn default() -> Self {
        Self {
            recompute_interval: default_recompute_interval(),
            filter_passes: default_filter_passes(),
            filter_weight: default_filter_weight(),
            coefficient_filter_passes: default_coefficient_filter_passes(),
            test_filter_ratio: default_test_filter_ratio(),
            coefficient_ceiling: default_coefficient_ceiling(),
            initial_jlm: default_initial_jlm(),
            initial_jmm: default_initial_jmm(),
            memory_floor: default_memory_floor(),
            time_scale: LagrangianTimeScale::default(),
            strain_solver: SolverSelection::default(),
            nut_solver: SolverSelection::default(),
        }
    }
}

impl DynamicSmagorinskyConfig {
    /// 从 JSON 字符串解析并验证
    pub fn from_json_str(json: &str) -> LesResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LesError::serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并验证
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LesResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LesError::io(format!("无法读取配置文件 {}", path.display()), e))?;
        Self::from_json_str(&content)
    }

    /// 序列化为格式化 JSON
    pub fn to_json_pretty(&self) -> LesResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LesError::serialization(e.to_string()))
    }

    /// 验证配置有效性
    pub fn validate(&self) -> LesResult<()> {
        if self.recompute_interval == 0 {
            return Err(LesError::config(
                "recompute_interval",
                self.recompute_interval,
                "必须 >= 1",
            ));
        }
        ensure_in_range("filter_weight", self.filter_weight, 0.0, 1.0)?;
        ensure_positive("test_filter_ratio", self.test_filter_ratio)?;
        ensure_non_negative("coefficient_ceiling", self.coefficient_ceiling)?;
        ensure_positive("memory_floor", self.memory_floor)?;
        ensure_positive("initial_jmm", self.initial_jmm)?;
        if !self.initial_jlm.is_finite() {
            return Err(LesError::config("initial_jlm", self.initial_jlm, "必须为有限数"));
        }
        self.time_scale.validate()?;
        self.strain_solver.validate("strain_solver")?;
        self.nut_solver.validate("nut_solver")?;
        Ok(())
    }

    /// 第 `tstep` 步是否完整重算
    #[inline]
    pub fn is_recompute_step(&self, tstep: u64) -> bool {
        tstep % self.recompute_interval == 0
    }
}

/// Lagrangian 松弛时间尺度
///
/// ```text
/// T = coefficient · Δ · max(J_LM · J_MM, product_floor)^exponent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagrangianTimeScale {
    /// 系数（1.5）
    #[serde(default = "default_time_coefficient")]
    pub coefficient: f64,
    /// 指数（-1/8）
    #[serde(default = "default_time_exponent")]
    pub exponent: f64,
    /// J_LM · J_MM 乘积下限
    #[serde(default = "default_product_floor")]
    pub product_floor: f64,
}

fn default_time_coefficient() -> f64 {
    1.5
}
fn default_time_exponent() -> f64 {
    -0.125
}
fn default_product_floor() -> f64 {
    1e-32
}

impl Default for LagrangianTimeScale {
    fn default() -> Self {
        Self {
            coefficient: default_time_coefficient(),
            exponent: default_time_exponent(),
            product_floor: default_product_floor(),
        }
    }
}

impl LagrangianTimeScale {
    /// 验证参数
    pub fn validate(&self) -> LesResult<()> {
        ensure_positive("time_scale.coefficient", self.coefficient)?;
        ensure_positive("time_scale.product_floor", self.product_floor)?;
        if !self.exponent.is_finite() {
            return Err(LesError::config("time_scale.exponent", self.exponent, "必须为有限数"));
        }
        Ok(())
    }

    /// 局部松弛时间 T
    #[inline]
    pub fn evaluate(&self, delta: f64, jlm: f64, jmm: f64) -> f64 {
        let product = (jlm * jmm).max(self.product_floor);
        self.coefficient * delta * product.powf(self.exponent)
    }
}
