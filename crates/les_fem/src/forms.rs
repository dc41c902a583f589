// crates/les_fem/src/forms.rs

//! 变分形式
//!
//! 只包含亚格子模型需要的几种形式，并非通用形式语言。

/// 双线性形式（组装为矩阵）
///
/// 行对应测试函数 q，列对应试探函数 p。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BilinearForm {
    /// 质量矩阵 ∫ p q dx
    Mass,
    /// 导数矩阵 ∫ (∂p/∂x_axis) q dx
    Derivative(usize),
}

/// 线性形式（组装为向量）
#[derive(Debug, Clone, Copy)]
pub enum LinearForm<'a> {
    /// ∫ q dx（集中质量）
    TestIntegral,
    /// ∫ f q dx，f 为单元常数（长度 = 单元数）
    CellSource(&'a [f64]),
}

impl LinearForm<'_> {
    /// 名称（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            Self::TestIntegral => "test_integral",
            Self::CellSource(_) => "cell_source",
        }
    }
}
