// crates/les_fem/src/mesh.rs

//! 单纯形网格
//!
//! 二维三角形 / 三维四面体网格，顶点坐标统一存为 [`DVec3`]（二维时 z = 0）。
//!
//! 构造时完成：
//! - 顶点索引范围检查
//! - 退化单元检查（体积过小）与负定向单元翻转
//! - 边界面识别（只属于一个单元的面），得到边界顶点标记
//!
//! # 网格生成
//!
//! - [`SimplexMesh::unit_square`] / [`SimplexMesh::rectangle`]: 矩形，每个格子 2 个三角形
//! - [`SimplexMesh::unit_cube`] / [`SimplexMesh::box_mesh`]: 长方体，每个格子 6 个四面体
//! - [`SimplexMesh::single_cell`]: 参考单纯形
//!
//! ```
//! use les_fem::mesh::SimplexMesh;
//!
//! let mesh = SimplexMesh::unit_square(4, 4).unwrap();
//! assert_eq!(mesh.n_vertices(), 25);
//! assert_eq!(mesh.n_cells(), 32);
//! assert_eq!(mesh.boundary_vertices().len(), 16);
//! ```

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;

use les_foundation::error::{LesError, LesResult};
use les_foundation::SpatialDim;

/// 相对体积阈值：|V| <= tol * L^d 视为退化
const DEGENERATE_VOLUME_TOL: f64 = 1e-14;

/// 面的键（升序顶点，二维时第三个位置为 `usize::MAX`）
type FacetKey = [usize; 3];

// =============================================================================
// 网格
// =============================================================================

/// 单纯形网格
#[derive(Debug, Clone)]
pub struct SimplexMesh {
    dim: SpatialDim,
    vertices: Vec<DVec3>,
    /// 扁平存储，每个单元 d + 1 个顶点
    cells: Vec<usize>,
    is_boundary: Vec<bool>,
    n_boundary_facets: usize,
    markers: BTreeMap<String, Vec<usize>>,
}

impl SimplexMesh {
    /// 从顶点和单元构造网格
    ///
    /// `cells` 中每个单元给出 d + 1 个顶点索引（二维三角形只用前 3 个）。
    /// 负定向的单元会被翻转为正定向。
    pub fn new(dim: SpatialDim, vertices: Vec<DVec3>, cells: Vec<Vec<usize>>) -> LesResult<Self> {
        let nv = dim.vertices_per_cell();
        if vertices.is_empty() {
            return Err(LesError::invalid_mesh("网格没有顶点"));
        }
        if cells.is_empty() {
            return Err(LesError::invalid_mesh("网格没有单元"));
        }

        let scale = bounding_extent(&vertices).max(f64::MIN_POSITIVE);
        let volume_tol = DEGENERATE_VOLUME_TOL * scale.powi(dim.get() as i32);

        let mut flat = Vec::with_capacity(cells.len() * nv);
        for (c, cell) in cells.iter().enumerate() {
            if cell.len() != nv {
                return Err(LesError::invalid_mesh(format!(
                    "单元 {} 有 {} 个顶点, {} 网格需要 {}",
                    c,
                    cell.len(),
                    dim.name(),
                    nv
                )));
            }
            if let Some(&bad) = cell.iter().find(|&&v| v >= vertices.len()) {
                return Err(LesError::invalid_mesh(format!(
                    "单元 {} 引用了不存在的顶点 {} (共 {} 个顶点)",
                    c,
                    bad,
                    vertices.len()
                )));
            }

            let mut local = cell.clone();
            let pts: Vec<DVec3> = local.iter().map(|&v| vertices[v]).collect();
            let vol = signed_volume(dim, &pts);
            if vol.abs() <= volume_tol {
                return Err(LesError::invalid_mesh(format!(
                    "单元 {} 退化 (体积 {:.3e})",
                    c, vol
                )));
            }
            if vol < 0.0 {
                local.swap(0, 1);
            }
            flat.extend_from_slice(&local);
        }

        let mut mesh = Self {
            dim,
            vertices,
            cells: flat,
            is_boundary: Vec::new(),
            n_boundary_facets: 0,
            markers: BTreeMap::new(),
        };
        mesh.detect_boundary();
        Ok(mesh)
    }

    fn detect_boundary(&mut self) {
        let d = self.dim.get();
        let mut facet_count: HashMap<FacetKey, u32> = HashMap::new();

        for c in 0..self.n_cells() {
            let cell = self.cell(c);
            for skip in 0..=d {
                let key = facet_key(cell, skip);
                *facet_count.entry(key).or_insert(0) += 1;
            }
        }

        let mut is_boundary = vec![false; self.vertices.len()];
        let mut n_boundary_facets = 0;
        for (key, count) in &facet_count {
            if *count == 1 {
                n_boundary_facets += 1;
                for &v in key.iter().take(d) {
                    is_boundary[v] = true;
                }
            }
        }

        self.is_boundary = is_boundary;
        self.n_boundary_facets = n_boundary_facets;
    }

    // =========================================================================
    // 查询
    // =========================================================================

    /// 空间维度
    #[inline]
    pub fn dim(&self) -> SpatialDim {
        self.dim
    }

    /// 顶点数
    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len() / self.dim.vertices_per_cell()
    }

    /// 顶点坐标
    #[inline]
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// 单个顶点坐标
    #[inline]
    pub fn vertex(&self, v: usize) -> DVec3 {
        self.vertices[v]
    }

    /// 单元顶点索引（正定向）
    #[inline]
    pub fn cell(&self, c: usize) -> &[usize] {
        let nv = self.dim.vertices_per_cell();
        &self.cells[c * nv..(c + 1) * nv]
    }

    /// 单元顶点坐标
    pub fn cell_points(&self, c: usize) -> Vec<DVec3> {
        self.cell(c).iter().map(|&v| self.vertices[v]).collect()
    }

    /// 单元体积（二维为面积）
    pub fn cell_volume(&self, c: usize) -> f64 {
        signed_volume(self.dim, &self.cell_points(c))
    }

    /// 网格总体积
    pub fn total_volume(&self) -> f64 {
        (0..self.n_cells()).map(|c| self.cell_volume(c)).sum()
    }

    /// 顶点是否位于边界
    #[inline]
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.is_boundary[v]
    }

    /// 所有边界顶点（升序）
    pub fn boundary_vertices(&self) -> Vec<usize> {
        (0..self.n_vertices())
            .filter(|&v| self.is_boundary[v])
            .collect()
    }

    /// 边界面数
    #[inline]
    pub fn n_boundary_facets(&self) -> usize {
        self.n_boundary_facets
    }

    /// 包围盒 (min, max)
    pub fn bounding_box(&self) -> (DVec3, DVec3) {
        bounds(&self.vertices)
    }

    // =========================================================================
    // 顶点标记
    // =========================================================================

    /// 用谓词标记一组顶点，返回被标记的顶点数
    pub fn mark_vertices<F>(&mut self, name: impl Into<String>, predicate: F) -> usize
    where
        F: Fn(DVec3) -> bool,
    {
        let selected: Vec<usize> = self
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, p)| predicate(**p))
            .map(|(v, _)| v)
            .collect();
        let n = selected.len();
        self.markers.insert(name.into(), selected);
        n
    }

    /// 按名称获取标记的顶点
    pub fn marker(&self, name: &str) -> Option<&[usize]> {
        self.markers.get(name).map(|v| v.as_slice())
    }

    // =========================================================================
    // 网格生成
    // =========================================================================

    /// 单位正方形 [0,1]² 上的三角形网格
    pub fn unit_square(nx: usize, ny: usize) -> LesResult<Self> {
        Self::rectangle(nx, ny, DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0))
    }

    /// 矩形 [min.x, max.x] × [min.y, max.y] 上的三角形网格
    ///
    /// 顶点按行主序排列，格子对角线方向交替以避免各向异性。
    pub fn rectangle(nx: usize, ny: usize, min: DVec3, max: DVec3) -> LesResult<Self> {
        if nx == 0 || ny == 0 {
            return Err(LesError::invalid_mesh(format!(
                "分段数必须 >= 1: nx={}, ny={}",
                nx, ny
            )));
        }
        let dx = (max.x - min.x) / nx as f64;
        let dy = (max.y - min.y) / ny as f64;

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(DVec3::new(min.x + i as f64 * dx, min.y + j as f64 * dy, 0.0));
            }
        }

        let idx = |i: usize, j: usize| j * (nx + 1) + i;
        let mut cells = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let v00 = idx(i, j);
                let v10 = idx(i + 1, j);
                let v01 = idx(i, j + 1);
                let v11 = idx(i + 1, j + 1);
                if (i + j) % 2 == 0 {
                    cells.push(vec![v00, v10, v11]);
                    cells.push(vec![v00, v11, v01]);
                } else {
                    cells.push(vec![v00, v10, v01]);
                    cells.push(vec![v10, v11, v01]);
                }
            }
        }

        Self::new(SpatialDim::Two, vertices, cells)
    }

    /// 单位立方体 [0,1]³ 上的四面体网格
    pub fn unit_cube(n: usize) -> LesResult<Self> {
        Self::box_mesh([n, n, n], DVec3::ZERO, DVec3::ONE)
    }

    /// 长方体上的四面体网格
    ///
    /// 每个格子沿主对角线剖分为 6 个四面体（Kuhn 剖分），相邻格子的面剖分一致。
    pub fn box_mesh(n: [usize; 3], min: DVec3, max: DVec3) -> LesResult<Self> {
        let [nx, ny, nz] = n;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(LesError::invalid_mesh(format!(
                "分段数必须 >= 1: {:?}",
                n
            )));
        }
        let h = (max - min) / DVec3::new(nx as f64, ny as f64, nz as f64);

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    vertices.push(min + DVec3::new(i as f64, j as f64, k as f64) * h);
                }
            }
        }

        let idx = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;
        const AXIS_ORDERS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        let mut cells = Vec::with_capacity(6 * nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    for order in AXIS_ORDERS {
                        let mut ijk = [i, j, k];
                        let mut tet = Vec::with_capacity(4);
                        tet.push(idx(ijk[0], ijk[1], ijk[2]));
                        for axis in order {
                            ijk[axis] += 1;
                            tet.push(idx(ijk[0], ijk[1], ijk[2]));
                        }
                        cells.push(tet);
                    }
                }
            }
        }

        Self::new(SpatialDim::Three, vertices, cells)
    }

    /// 参考单纯形（单个单元）
    pub fn single_cell(dim: SpatialDim) -> LesResult<Self> {
        let vertices = match dim {
            SpatialDim::Two => vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            SpatialDim::Three => vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z],
        };
        let cell = (0..dim.vertices_per_cell()).collect();
        Self::new(dim, vertices, vec![cell])
    }
}

// =============================================================================
// 几何工具
// =============================================================================

/// 单纯形有向体积
pub fn signed_volume(dim: SpatialDim, pts: &[DVec3]) -> f64 {
    match dim {
        SpatialDim::Two => {
            let a = pts[1] - pts[0];
            let b = pts[2] - pts[0];
            0.5 * (a.x * b.y - a.y * b.x)
        }
        SpatialDim::Three => {
            let a = pts[1] - pts[0];
            let b = pts[2] - pts[0];
            let c = pts[3] - pts[0];
            a.dot(b.cross(c)) / 6.0
        }
    }
}

fn bounds(vertices: &[DVec3]) -> (DVec3, DVec3) {
    vertices.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(min, max), &p| (min.min(p), max.max(p)),
    )
}

fn bounding_extent(vertices: &[DVec3]) -> f64 {
    let (min, max) = bounds(vertices);
    (max - min).max_element()
}

fn facet_key(cell: &[usize], skip: usize) -> FacetKey {
    let mut key = [usize::MAX; 3];
    let mut n = 0;
    for (local, &v) in cell.iter().enumerate() {
        if local != skip {
            key[n] = v;
            n += 1;
        }
    }
    key[..n].sort_unstable();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_square_counts() {
        let mesh = SimplexMesh::unit_square(3, 2).unwrap();
        assert_eq!(mesh.n_vertices(), 12);
        assert_eq!(mesh.n_cells(), 12);
        assert!((mesh.total_volume() - 1.0).abs() < 1e-12);
        // 周长上的边数
        assert_eq!(mesh.n_boundary_facets(), 2 * (3 + 2));
        assert_eq!(mesh.boundary_vertices().len(), 10);
    }

    #[test]
    fn test_unit_cube_counts() {
        let mesh = SimplexMesh::unit_cube(2).unwrap();
        assert_eq!(mesh.n_vertices(), 27);
        assert_eq!(mesh.n_cells(), 48);
        assert!((mesh.total_volume() - 1.0).abs() < 1e-12);
        // 每个外表面格子剖分为 2 个三角形
        assert_eq!(mesh.n_boundary_facets(), 6 * 4 * 2);
        // 只有中心顶点在内部
        assert_eq!(mesh.boundary_vertices().len(), 26);
        assert!(!mesh.is_boundary_vertex(13));
    }

    #[test]
    fn test_all_cells_positive() {
        let mesh = SimplexMesh::box_mesh([2, 1, 3], DVec3::ZERO, DVec3::new(2.0, 1.0, 0.5)).unwrap();
        for c in 0..mesh.n_cells() {
            assert!(mesh.cell_volume(c) > 0.0);
        }
        assert!((mesh.total_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_orientation_flipped() {
        let mesh = SimplexMesh::new(
            SpatialDim::Two,
            vec![DVec3::ZERO, DVec3::Y, DVec3::X],
            vec![vec![0, 1, 2]],
        )
        .unwrap();
        assert!((mesh.cell_volume(0) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_meshes() {
        // 顶点越界
        let r = SimplexMesh::new(
            SpatialDim::Two,
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![vec![0, 1, 5]],
        );
        assert!(r.is_err());

        // 退化（共线）
        let r = SimplexMesh::new(
            SpatialDim::Two,
            vec![DVec3::ZERO, DVec3::X, DVec3::new(2.0, 0.0, 0.0)],
            vec![vec![0, 1, 2]],
        );
        assert!(r.is_err());

        // 顶点数与维度不符
        let r = SimplexMesh::new(
            SpatialDim::Three,
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![vec![0, 1, 2]],
        );
        assert!(r.is_err());

        assert!(SimplexMesh::unit_square(0, 3).is_err());
    }

    #[test]
    fn test_single_cell() {
        let tri = SimplexMesh::single_cell(SpatialDim::Two).unwrap();
        assert!((tri.total_volume() - 0.5).abs() < 1e-15);
        assert_eq!(tri.boundary_vertices(), vec![0, 1, 2]);

        let tet = SimplexMesh::single_cell(SpatialDim::Three).unwrap();
        assert!((tet.total_volume() - 1.0 / 6.0).abs() < 1e-15);
        assert_eq!(tet.n_boundary_facets(), 4);
    }

    #[test]
    fn test_markers() {
        let mut mesh = SimplexMesh::unit_square(4, 4).unwrap();
        let n = mesh.mark_vertices("lid", |p| (p.y - 1.0).abs() < 1e-12);
        assert_eq!(n, 5);
        assert_eq!(mesh.marker("lid").map(|m| m.len()), Some(5));
        assert!(mesh.marker("missing").is_none());
    }
}
