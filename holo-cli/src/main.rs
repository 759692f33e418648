//! # holo
//!
//! 全息卡片方案编辑器命令行。
//!
//! ## 用法
//!
//! ```bash
//! holo list
//! holo add "Gold Card"
//! holo preset 0 shine gold-foil
//! holo export --format vue --output card.vue
//! holo import card.json
//! holo script edits.txt
//! holo --storage-dir /tmp/cards repair-check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use holo_cli::{AppConfig, Command, Session, logging, repair_check};
use holo_core::FileStorage;
use tracing::{Level, debug};

#[derive(Parser)]
#[command(name = "holo")]
#[command(about = "全息卡片方案编辑器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 配置文件路径
    #[arg(short, long, default_value = "holo.json", global = true)]
    config: PathBuf,

    /// 覆盖配置中的存储目录
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("❌ {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志级别来自配置，加载配置期间先用临时订阅者输出警告
    let bootstrap_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let bootstrap = tracing_subscriber::fmt()
        .with_max_level(bootstrap_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let mut config =
        tracing::subscriber::with_default(bootstrap, || AppConfig::load(&cli.config));

    logging::init(logging::resolve_level(&config.log_level, cli.verbose));

    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }
    config
        .validate()
        .with_context(|| format!("配置无效: {}", cli.config.display()))?;
    debug!(?config, "配置就绪");

    let storage = FileStorage::new(&config.storage_dir);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // 检查必须在加载之前进行，加载会修复并写回
    if cli.command == Command::RepairCheck {
        repair_check(&storage, &config.storage_key, &mut out)?;
        return Ok(());
    }

    let mut session = Session::open(storage, config);
    session.run(&cli.command, &mut out)
}
