//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-core`: 运行 holo-core 覆盖率
//! - `doc-check`: 检查持久化的方案文档是否需要修复

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{Context, bail};
use holo_core::{ImportError, repair_text};
use walkdir::WalkDir;

/// 门禁步骤：依次执行，任一失败即停止
const GATE: &[&[&str]] = &[
    &["fmt", "--all", "--", "--check"],
    &["clippy", "--workspace", "--all-targets"],
    &["test", "--workspace"],
];

/// 运行一条 cargo 子命令，非零退出视为失败
fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let step = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {step}");
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("无法启动 {step}"))?;
    if !status.success() {
        bail!("{step} 失败 ({status})");
    }
    Ok(())
}

/// 检查 cargo 扩展子命令是否已安装
fn cargo_has(subcommand: &str) -> bool {
    Command::new("cargo")
        .args([subcommand, "--version"])
        .output()
        .is_ok_and(|o| o.status.success())
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    let result = match sub.as_str() {
        "check-all" => GATE.iter().try_for_each(|step| cargo(step)),
        "cov-core" => cov_core(),
        "doc-check" => doc_check(args.next().as_deref()),
        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => Err(anyhow::anyhow!("unknown xtask subcommand: {other}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cov_core() -> anyhow::Result<()> {
    if !cargo_has("llvm-cov") {
        bail!(
            "cargo llvm-cov 不可用，请先执行 `cargo install cargo-llvm-cov` \
             与 `rustup component add llvm-tools-preview`"
        );
    }
    cargo(&["llvm-cov", "-p", "holo-core", "--html"])?;
    eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-core        运行 holo-core 覆盖率报告
  doc-check       检查方案文档

DOC-CHECK:
  cargo xtask doc-check [path]

  不带参数：检查 data/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 文档能否解析为 JSON
    - 文档是否需要修复（修复结果不写回）

ALIASES (in .cargo/config.toml):
  cargo check-all -> cargo xtask check-all
  cargo cov-core  -> cargo xtask cov-core
  cargo doc-check -> cargo xtask doc-check
"#
    );
}

//=============================================================================
// doc-check 命令实现
//=============================================================================

/// 默认检查目录（相对于 workspace root）
const DEFAULT_DATA_DIR: &str = "data";

/// 单个文档的检查结论
#[derive(Debug, PartialEq)]
enum DocStatus {
    /// 无需修复
    Clean,
    /// 可解析但需要修复
    Repaired { schemes: usize },
    /// 不是合法 JSON，加载时会被替换为全新文档
    Unparseable(String),
    /// 无法读取
    Unreadable(String),
}

/// 执行文档检查
fn doc_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_doc_files(&path)
            } else {
                bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_DATA_DIR);
            if !dir.exists() {
                bail!(
                    "默认数据目录不存在: {}\n请在 workspace 根目录运行，或指定文档路径",
                    dir.display()
                );
            }
            collect_doc_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到文档文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个文档...\n", files.len());

    let mut errors = 0;
    let mut warnings = 0;
    for file in &files {
        let status = check_doc_file(file);
        match &status {
            DocStatus::Clean => eprintln!("[OK]    {}", file.display()),
            DocStatus::Repaired { schemes } => {
                warnings += 1;
                eprintln!(
                    "[WARN]  {}: 需要修复（修复后 {} 个方案）",
                    file.display(),
                    schemes
                );
            }
            DocStatus::Unparseable(e) => {
                errors += 1;
                eprintln!("[ERROR] {}: {}", file.display(), e);
            }
            DocStatus::Unreadable(e) => {
                errors += 1;
                eprintln!("[ERROR] {}: 无法读取文件 - {}", file.display(), e);
            }
        }
    }

    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个文档", files.len());
    if errors > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", errors, warnings);
        bail!("文档检查发现错误");
    } else if warnings > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warnings);
    } else {
        eprintln!("✅ 检查通过，无需修复");
    }

    Ok(())
}

/// 收集目录下的所有 .json 文件
fn collect_doc_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// 检查单个文档
fn check_doc_file(file: &Path) -> DocStatus {
    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => return DocStatus::Unreadable(e.to_string()),
    };
    classify(&content)
}

fn classify(content: &str) -> DocStatus {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(content) {
        return DocStatus::Unparseable(ImportError::InvalidJson(e.to_string()).to_string());
    }
    let result = repair_text(content);
    if result.repaired {
        DocStatus::Repaired {
            schemes: result.data.schemes.len(),
        }
    } else {
        DocStatus::Clean
    }
}
