// crates/les_foundation/src/validation.rs

//! 运行时验证工具
//!
//! setup 阶段用于检查输入尺寸与数值范围，失败时返回 [`LesError`]。

use crate::error::{LesError, LesResult};

/// 检查切片长度
#[inline]
pub fn ensure_len(name: &'static str, slice: &[f64], expected: usize) -> LesResult<()> {
    if slice.len() != expected {
        return Err(LesError::size_mismatch(name, expected, slice.len()));
    }
    Ok(())
}

/// 检查所有值有限
pub fn ensure_finite(name: &'static str, slice: &[f64]) -> LesResult<()> {
    if let Some((i, v)) = slice.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(LesError::config(
            name,
            v,
            format!("第 {} 个值不是有限数", i),
        ));
    }
    Ok(())
}

/// 检查严格为正的配置值
#[inline]
pub fn ensure_positive(key: &'static str, value: f64) -> LesResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(LesError::config(key, value, "必须为有限正数"));
    }
    Ok(())
}

/// 检查非负的配置值
#[inline]
pub fn ensure_non_negative(key: &'static str, value: f64) -> LesResult<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(LesError::config(key, value, "必须为有限非负数"));
    }
    Ok(())
}

/// 检查值在闭区间内
#[inline]
pub fn ensure_in_range(key: &'static str, value: f64, min: f64, max: f64) -> LesResult<()> {
    if !(value >= min && value <= max) {
        return Err(LesError::config(
            key,
            value,
            format!("期望范围 [{}, {}]", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len("u", &[1.0, 2.0], 2).is_ok());
        assert!(ensure_len("u", &[1.0], 2).is_err());
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("x", &[0.0, 1.0]).is_ok());
        assert!(ensure_finite("x", &[0.0, f64::NAN]).is_err());
        assert!(ensure_finite("x", &[f64::INFINITY]).is_err());
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("alpha", 2.0).is_ok());
        assert!(ensure_positive("alpha", 0.0).is_err());
        assert!(ensure_positive("alpha", f64::NAN).is_err());
        assert!(ensure_non_negative("w", 0.0).is_ok());
        assert!(ensure_non_negative("w", -1e-12).is_err());
    }

    #[test]
    fn test_ensure_in_range() {
        assert!(ensure_in_range("weight", 1.0, 0.0, 1.0).is_ok());
        assert!(ensure_in_range("weight", 1.5, 0.0, 1.0).is_err());
        assert!(ensure_in_range("weight", f64::NAN, 0.0, 1.0).is_err());
    }
}
