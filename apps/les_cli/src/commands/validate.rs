// apps/les_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查模型配置文件：JSON 格式、字段有效性，以及偏离常用取值的警告。

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{error, info, warn};

use les_dynamic::DynamicSmagorinskyConfig;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== 配置验证 ===");

    let Some(path) = &args.config else {
        println!("用法: les_cli validate --config <配置文件> [--strict]");
        return Ok(());
    };

    let mut result = ValidationResult::default();
    validate_config(path, &mut result)?;
    print_validation_result(&result, args.strict)
}

fn validate_config(path: &Path, result: &mut ValidationResult) -> Result<()> {
    println!("\n检查配置文件: {}", path.display());

    if !path.exists() {
        result.add_error(format!("配置文件不存在: {}", path.display()));
        return Ok(());
    }

    let content = std::fs::read_to_string(path).context("无法读取配置文件")?;

    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            result.add_error(format!("JSON 解析错误: {}", e));
            return Ok(());
        }
    };
    check_unknown_fields(&json, result)?;

    match DynamicSmagorinskyConfig::from_json_str(&content) {
        Ok(config) => {
            check_recommendations(&config, result);
            println!("  ✓ 配置文件有效");
        }
        Err(e) => result.add_error(e.to_string()),
    }
    Ok(())
}

fn check_unknown_fields(json: &serde_json::Value, result: &mut ValidationResult) -> Result<()> {
    let Some(object) = json.as_object() else {
        result.add_error("配置文件顶层必须是 JSON 对象");
        return Ok(());
    };
    let known = serde_json::to_value(DynamicSmagorinskyConfig::default())?;
    for key in object.keys() {
        if known.get(key).is_none() {
            result.add_warning(format!("未知字段 '{}' 将被忽略", key));
        }
    }
    Ok(())
}

fn check_recommendations(config: &DynamicSmagorinskyConfig, result: &mut ValidationResult) {
    if config.coefficient_ceiling > 0.09 {
        result.add_warning(format!(
            "Cs² 上限 {} 大于常用值 0.09",
            config.coefficient_ceiling
        ));
    }
    if config.filter_passes == 0 {
        result.add_warning("filter_passes = 0 时测试滤波为恒等映射, L_ij 恒为零");
    }
    if (config.test_filter_ratio - 2.0).abs() > 1e-12 {
        result.add_warning(format!(
            "测试滤波宽度比 {} 与单次盒式滤波的常用值 2 不一致",
            config.test_filter_ratio
        ));
    }
    if config.recompute_interval > 10 {
        result.add_warning(format!(
            "重算间隔 {} 较大, Cs² 可能滞后于流场",
            config.recompute_interval
        ));
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!();
    for w in &result.warnings {
        warn!("{}", w);
        println!("  ⚠ {}", w);
    }
    for e in &result.errors {
        error!("{}", e);
        println!("  ✗ {}", e);
    }

    let ok = if strict {
        result.is_ok_strict()
    } else {
        result.is_ok()
    };
    if !ok {
        bail!(
            "验证失败: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );
    }
    println!("验证通过 ({} 个警告)", result.warnings.len());
    Ok(())
}
