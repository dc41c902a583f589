// crates/les_numerics/src/linear_algebra/vector_ops.rs

//! 向量运算（BLAS Level 1 风格）
//!
//! 迭代求解器与节点场运算的基础。
//!
//! # 函数列表
//!
//! - [`dot`]: 点积 x·y
//! - [`norm2`]: 二范数 ||x||₂
//! - [`axpy`]: y = α*x + y
//! - [`copy`]: y = x
//! - [`hadamard_inplace`]: y = x ⊙ y（逐点乘）
//! - [`blend`]: y = (1-w)*y + w*x
//! - [`clamp_min`] / [`clamp_max`]: 逐点截断
//!
//! # 使用示例
//!
//! ```
//! use les_numerics::linear_algebra::vector_ops::{dot, norm2, axpy};
//!
//! let x = vec![1.0, 2.0, 3.0];
//! let mut y = vec![4.0, 5.0, 6.0];
//!
//! assert_eq!(dot(&x, &y), 32.0);
//! axpy(2.0, &x, &mut y);
//! assert_eq!(y, vec![6.0, 9.0, 12.0]);
//! assert!((norm2(&x) - 14.0_f64.sqrt()).abs() < 1e-15);
//! ```

/// 点积 x·y
#[inline]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(&xi, &yi)| xi * yi).sum()
}

/// 二范数 ||x||₂
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}


/// AXPY: y = α*x + y
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}



/// 复制: y = x
#[inline]
pub fn copy(x: &[f64], y: &mut [f64]) {
    y.copy_from_slice(x);
}



/// 原位逐点乘: y = x ⊙ y
#[inline]
pub fn hadamard_inplace(x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi *= xi;
    }
}

/// 加权混合: y = (1-w)*y + w*x
///
/// `w == 1` 时精确等于复制（不经过 `0*y` 运算，避免 NaN 传播）。
#[inline]
pub fn blend(weight: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    if weight == 1.0 {
        y.copy_from_slice(x);
        return;
    }
    let keep = 1.0 - weight;
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = keep * *yi + weight * xi;
    }
}

/// 下限截断: x = max(x, floor)
#[inline]
pub fn clamp_min(floor: f64, x: &mut [f64]) {
    for xi in x.iter_mut() {
        // NaN 也被替换为下限
        if !(*xi >= floor) {
            *xi = floor;
        }
    }
}

/// 上限截断: x = min(x, ceiling)
#[inline]
pub fn clamp_max(ceiling: f64, x: &mut [f64]) {
    for xi in x.iter_mut() {
        if *xi > ceiling {
            *xi = ceiling;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_norm() {
        let x = vec![3.0, -4.0];
        assert_eq!(dot(&x, &x), 25.0);
        assert_eq!(norm2(&x), 5.0);
    }

    #[test]
    fn test_axpy_and_copy() {
        let x = vec![1.0, 1.0];
        let mut y = vec![2.0, 4.0];
        axpy(-2.0, &x, &mut y);
        assert_eq!(y, vec![0.0, 2.0]);
        copy(&x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn test_hadamard_inplace() {
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![4.0, 5.0, 6.0];
        hadamard_inplace(&x, &mut y);
        assert_eq!(y, vec![4.0, 10.0, 18.0]);
    }

    #[test]
    fn test_blend() {
        let x = vec![1.0, 1.0];
        let mut y = vec![3.0, f64::NAN];
        blend(1.0, &x, &mut y);
        assert_eq!(y, vec![1.0, 1.0]);

        let mut y = vec![3.0, 5.0];
        blend(0.5, &x, &mut y);
        assert_eq!(y, vec![2.0, 3.0]);

        let mut y = vec![3.0, 5.0];
        blend(0.0, &x, &mut y);
        assert_eq!(y, vec![3.0, 5.0]);
    }

    #[test]
    fn test_clamps() {
        let mut x = vec![-1.0, 0.5, f64::NAN, 2.0];
        clamp_min(1e-32, &mut x);
        assert_eq!(x[0], 1e-32);
        assert_eq!(x[1], 0.5);
        assert_eq!(x[2], 1e-32);

        clamp_max(0.09, &mut x);
        assert_eq!(x[1], 0.09);
        assert_eq!(x[3], 0.09);
        assert_eq!(x[0], 1e-32);
    }
}
