// apps/les_cli/src/commands/run.rs

//! 运行命令
//!
//! 在单位正方形/立方体上以衰减的 Taylor–Green 涡作为已解析速度，
//! 逐步调用闭合模型，按间隔输出 Cs² 与 nut 统计。

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use glam::DVec3;
use tracing::{info, warn};

use les_dynamic::{
    DynamicLagrangianModel, DynamicSmagorinskyConfig, StepContext, StepReport, UpdateKind,
};
use les_fem::{AnalyticVelocity, BoundarySpec, P1Discretization, SimplexMesh, VelocityBoundaryConditions};
use les_foundation::SpatialDim;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 模型配置文件路径（JSON）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 空间维度 (2 或 3)
    #[arg(short, long, default_value = "2")]
    pub dim: usize,

    /// 每个方向的网格分段数
    #[arg(short = 'n', long, default_value = "16")]
    pub cells: usize,

    /// 时间步数
    #[arg(short, long, default_value = "20")]
    pub steps: u64,

    /// 时间步长
    #[arg(long, default_value = "0.01")]
    pub dt: f64,

    /// Taylor–Green 涡初始幅值
    #[arg(long, default_value = "1.0")]
    pub amplitude: f64,

    /// 分子粘性（控制涡的衰减）
    #[arg(long, default_value = "0.001")]
    pub viscosity: f64,

    /// 在全部边界上施加无滑移条件
    #[arg(long)]
    pub no_slip: bool,

    /// 输出间隔（步）
    #[arg(long, default_value = "5")]
    pub output_interval: u64,

    /// 逐步诊断输出文件（JSON Lines）
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== 动态 Lagrangian Smagorinsky 运行 ===");

    let config = match &args.config {
        Some(path) => DynamicSmagorinskyConfig::from_json_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => DynamicSmagorinskyConfig::default(),
    };
    let dim = SpatialDim::from_usize(args.dim)
        .with_context(|| format!("不支持的维度: {}", args.dim))?;
    if args.cells == 0 {
        bail!("网格分段数必须 >= 1");
    }

    let mesh = match dim {
        SpatialDim::Two => SimplexMesh::unit_square(args.cells, args.cells),
        SpatialDim::Three => SimplexMesh::unit_cube(args.cells),
    }
    .context("生成网格失败")?;
    info!(
        "网格: {} 个顶点, {} 个单元, 总体积 {:.4}",
        mesh.n_vertices(),
        mesh.n_cells(),
        mesh.total_volume()
    );
    let (lo, hi) = mesh.bounding_box();
    info!("包围盒: [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]", lo.x, lo.y, lo.z, hi.x, hi.y, hi.z);

    let names: Vec<String> = (0..dim.get()).map(|i| format!("u{}", i)).collect();
    let bcs = if args.no_slip {
        VelocityBoundaryConditions::all_components(names.as_slice(), BoundarySpec::no_slip())
    } else {
        VelocityBoundaryConditions::new()
    };

    let disc = Arc::new(P1Discretization::new(mesh));
    let mut model =
        DynamicLagrangianModel::setup(disc, &bcs, names.as_slice(), config).context("构建闭合模型失败")?;

    let mut writer = match &args.report {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("无法创建输出文件: {}", path.display()))?,
        )),
        None => None,
    };

    let start = Instant::now();
    let mut recomputed = 0u64;
    for tstep in 0..args.steps {
        let t = tstep as f64 * args.dt;
        let velocity = taylor_green(dim, decayed_amplitude(args.amplitude, args.viscosity, t));
        let ctx = StepContext::new(tstep, args.dt)?;

        let kind = match model.step(&velocity, ctx) {
            Ok(kind) => kind,
            Err(e) if e.is_setup_error() => {
                return Err(e).with_context(|| format!("第 {} 步输入与模型不匹配", tstep));
            }
            Err(e) => {
                warn!("第 {} 步更新失败: {}", tstep, e);
                break;
            }
        };
        if kind == UpdateKind::Recomputed {
            recomputed += 1;
        }

        let Some(report) = model.last_report() else {
            continue;
        };
        if tstep % args.output_interval.max(1) == 0 || tstep + 1 == args.steps {
            log_report(t, report);
        }
        if let Some(w) = writer.as_mut() {
            serde_json::to_writer(&mut *w, report)?;
            writeln!(w)?;
        }
    }
    if let Some(mut w) = writer {
        w.flush()?;
    }

    let elapsed = start.elapsed();
    info!("=== 运行完成 ===");
    info!("总步数: {} (完整重算 {})", args.steps, recomputed);
    info!("计算时间: {:.3} s", elapsed.as_secs_f64());
    if args.steps > 0 {
        info!(
            "平均步耗时: {:.3} ms",
            elapsed.as_secs_f64() * 1000.0 / args.steps as f64
        );
    }
    Ok(())
}

fn log_report(t: f64, report: &StepReport) {
    info!(
        "t={:.3} tstep={} ({}): Cs² max={:.4e} mean={:.4e}, nut max={:.4e} mean={:.4e}, 求解 {}/{} 次",
        t,
        report.tstep,
        report.kind,
        report.coefficient.max,
        report.coefficient.mean,
        report.nut.max,
        report.nut.mean,
        report.strain_solves.solves,
        report.nut_solves.solves
    );
}

/// 粘性衰减后的幅值 A·exp(-2 k² ν t)，k = 2π
fn decayed_amplitude(amplitude: f64, viscosity: f64, t: f64) -> f64 {
    let k = 2.0 * PI;
    amplitude * (-2.0 * k * k * viscosity * t).exp()
}

fn taylor_green(dim: SpatialDim, amplitude: f64) -> AnalyticVelocity {
    AnalyticVelocity::new(dim, move |p| {
        let (x, y, z) = (2.0 * PI * p.x, 2.0 * PI * p.y, 2.0 * PI * p.z);
        DVec3::new(
            amplitude * x.sin() * y.cos() * z.cos(),
            -amplitude * x.cos() * y.sin() * z.cos(),
            0.0,
        )
    })
}
