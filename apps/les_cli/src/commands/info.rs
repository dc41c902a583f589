// apps/les_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示版本、平台和默认模型配置。

use anyhow::Result;
use clap::Args;
use tracing::info;

use les_dynamic::DynamicSmagorinskyConfig;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 以 JSON 显示默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== 动态 Smagorinsky 信息 ===");

    if args.system {
        print_system_info();
    }

    if args.defaults {
        print_default_config()?;
    }

    if !args.system && !args.defaults {
        print_system_info();
        println!();
        print_default_config()?;
    }

    Ok(())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("les_cli 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!("可用线程: {}", std::thread::available_parallelism().map_or(1, |n| n.get()));
}

fn print_default_config() -> Result<()> {
    let config = DynamicSmagorinskyConfig::default();
    println!("=== 默认配置 ===");
    println!("重算间隔 K: {}", config.recompute_interval);
    println!("滤波次数 N: {}", config.filter_passes);
    println!("测试滤波宽度比 α: {}", config.test_filter_ratio);
    println!("Cs² 上限: {}", config.coefficient_ceiling);
    println!(
        "Lagrangian 时间尺度: T = {} Δ (J_LM J_MM)^({})",
        config.time_scale.coefficient, config.time_scale.exponent
    );
    println!("\nJSON:");
    println!("{}", config.to_json_pretty()?);
    Ok(())
}
