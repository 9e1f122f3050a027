//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test，并检查 fx-web 的 wasm 构建
//! - `cov-runtime`: 运行 fx-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `scenario-check`: 校验并回放场景文件

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fx_host::{HostConfig, Scenario};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    match cmd!(sh, "cargo llvm-cov --version").quiet().ignore_stdout().run() {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());
    let sh = Shell::new()?;

    match sub.as_str() {
        "check-all" => {
            eprintln!("\n==> fmt");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> clippy");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> test");
            cmd!(sh, "cargo test --workspace").run()?;

            eprintln!("\n==> wasm");
            cmd!(sh, "cargo check -p fx-web --target wasm32-unknown-unknown").run()?;
        }
        "cov-runtime" => {
            ensure_cargo_llvm_cov_available(&sh)?;
            cmd!(sh, "cargo llvm-cov -p fx-runtime --all-features --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available(&sh)?;

            // fx-web 只在 wasm 下有意义，tool crate 不计入
            cmd!(
                sh,
                "cargo llvm-cov --workspace --exclude xtask --exclude fx-web --all-features --html"
            )
            .run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "scenario-check" => {
            let path = args.next();
            scenario_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 与 wasm 构建检查
  cov-runtime     运行 fx-runtime 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  scenario-check  校验并回放场景文件

SCENARIO-CHECK:
  cargo xtask scenario-check [path]

  不带参数：检查 scenarios/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 格式与字段
    - 元素引用、事件顺序、行为选项
    - 完整回放无错误，结束时无残留定时器
"#
    );
}

//=============================================================================
// scenario-check 命令实现
//=============================================================================

/// 默认场景目录（相对于 workspace root）
const SCENARIOS_DIR: &str = "scenarios";

/// 场景检查结果
#[derive(Default)]
struct ScenarioCheckResult {
    checked: usize,
    errors: Vec<(PathBuf, String)>,
    warnings: Vec<(PathBuf, String)>,
}

/// 执行场景检查
fn scenario_check(path: Option<&str>) -> anyhow::Result<()> {
    let root = PathBuf::from(path.unwrap_or(SCENARIOS_DIR));
    if !root.exists() {
        anyhow::bail!(
            "路径不存在: {}\n请在 workspace 根目录运行，或指定场景路径",
            root.display()
        );
    }

    let files = collect_scenario_files(&root)?;
    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个场景文件...\n", files.len());

    let config = HostConfig::default();
    let mut result = ScenarioCheckResult::default();
    for file in &files {
        check_scenario_file(file, &config, &mut result);
    }

    print_check_result(&result);

    if !result.errors.is_empty() {
        anyhow::bail!("场景检查发现错误");
    }
    Ok(())
}

/// 收集场景文件（按路径排序）
fn collect_scenario_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn check_scenario_file(file: &Path, config: &HostConfig, result: &mut ScenarioCheckResult) {
    result.checked += 1;

    let scenario = match Scenario::load(file) {
        Ok(s) => s,
        Err(e) => {
            result.errors.push((file.to_path_buf(), e.to_string()));
            return;
        }
    };

    let snapshot = match fx_host::replay(config, &scenario) {
        Ok(s) => s,
        Err(e) => {
            result.errors.push((file.to_path_buf(), e.to_string()));
            return;
        }
    };

    if snapshot.stats.pending_timers > 0 {
        result.warnings.push((
            file.to_path_buf(),
            format!("回放结束时仍有 {} 个定时器", snapshot.stats.pending_timers),
        ));
    }
    if snapshot.stats.live_generated_nodes > 0 {
        result.warnings.push((
            file.to_path_buf(),
            format!(
                "回放结束时仍有 {} 个生成节点",
                snapshot.stats.live_generated_nodes
            ),
        ));
    }
}

fn print_check_result(result: &ScenarioCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个场景", result.checked);
    eprintln!();

    for (file, message) in &result.errors {
        eprintln!("[ERROR] {}: {}", file.display(), message);
    }
    for (file, message) in &result.warnings {
        eprintln!("[WARN] {}: {}", file.display(), message);
    }

    eprintln!();
    if !result.errors.is_empty() {
        eprintln!(
            "❌ {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );
    } else if !result.warnings.is_empty() {
        eprintln!("⚠️  0 个错误, {} 个警告", result.warnings.len());
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
