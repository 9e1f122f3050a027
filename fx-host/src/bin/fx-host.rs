//! # fx-host
//!
//! 场景回放工具：在无头页面上按虚拟时间回放交互场景，输出最终状态。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p fx-host -- run scenarios/easter_egg.json
//! cargo run -p fx-host -- run scenarios/portfolio.json --json --seed 7
//! cargo run -p fx-host -- check scenarios/*.json
//! cargo run -p fx-host -- default-config --output fx-host.json
//! ```

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fx_host::{HostConfig, Page, Scenario, replay};
use tracing::Level;

#[derive(Parser)]
#[command(name = "fx-host")]
#[command(about = "滚动/交互效果场景回放工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：fx-host.json，不存在时使用默认配置）
    #[arg(short, long, default_value = "fx-host.json", global = true)]
    config: PathBuf,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 回放场景并输出最终状态
    Run {
        /// 场景文件
        scenario: PathBuf,

        /// 覆盖配置中的随机种子
        #[arg(long)]
        seed: Option<u64>,

        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },

    /// 校验场景文件
    Check {
        /// 场景文件
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// 写出默认配置
    DefaultConfig {
        /// 输出路径
        #[arg(short, long, default_value = "fx-host.json")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            seed,
            json,
        } => run(&cli.config, &scenario, seed, json),
        Commands::Check { scenarios } => check(&cli.config, &scenarios),
        Commands::DefaultConfig { output } => default_config(&output),
    };

    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

fn run(config_path: &Path, scenario_path: &Path, seed: Option<u64>, json: bool) -> Result<()> {
    let mut config = HostConfig::load(config_path);
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let scenario = Scenario::load(scenario_path)?;
    let snapshot = replay(&config, &scenario)
        .with_context(|| format!("回放失败: {}", scenario_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{snapshot}");
    }
    Ok(())
}

fn check(config_path: &Path, scenarios: &[PathBuf]) -> Result<()> {
    let config = HostConfig::load(config_path);
    config.validate()?;

    let mut failed = 0;
    for path in scenarios {
        // 构建页面会校验全部行为选项
        let result = Scenario::load(path).and_then(|scenario| Page::new(&config, &scenario));
        match result {
            Ok(_) => println!("✅ {}", path.display()),
            Err(e) => {
                println!("❌ {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed}/{} 个场景校验失败", scenarios.len());
    }
    println!("\n全部 {} 个场景通过", scenarios.len());
    Ok(())
}

fn default_config(output: &Path) -> Result<()> {
    HostConfig::default()
        .save(output)
        .with_context(|| format!("写入失败: {}", output.display()))?;
    println!("✅ 默认配置已写入 {}", output.display());
    Ok(())
}
