//! # 脚本模式
//!
//! 在一个存储会话中逐行执行命令，撤销 / 重做只在会话内有意义，因此只在这里提供。
//!
//! ```text
//! # 注释与空行被忽略
//! add "Gold Card"
//! preset 0 shine gold-foil
//! undo
//! export --format json
//! ```
//!
//! 任意一行失败即停止，并报告行号。

use std::io::Write;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use holo_core::Storage;

use crate::commands::{Command, Session};

/// 脚本中的一行
#[derive(Debug, Parser)]
#[command(name = "script", no_binary_name = true)]
struct ScriptLine {
    #[command(subcommand)]
    command: ScriptCommand,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum ScriptCommand {
    /// 撤销上一次编辑
    Undo,
    /// 重做
    Redo,
    #[command(flatten)]
    Store(Command),
}

/// 按空白切分一行，支持单双引号
pub fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        bail!("引号未闭合");
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// 解析一行，空行与注释返回 `None`
pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptCommand>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let tokens = split_line(trimmed)?;
    let parsed = ScriptLine::try_parse_from(tokens)?;
    Ok(Some(parsed.command))
}

/// 执行整个脚本
pub fn run_script<S: Storage>(
    session: &mut Session<S>,
    text: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    for (number, line) in text.lines().enumerate() {
        let number = number + 1;
        let Some(command) = parse_line(line).with_context(|| format!("第 {} 行解析失败", number))?
        else {
            continue;
        };

        let result = match &command {
            ScriptCommand::Undo => session.undo(out),
            ScriptCommand::Redo => session.redo(out),
            ScriptCommand::Store(Command::Script { .. }) => {
                Err(anyhow::anyhow!("脚本中不能嵌套 script"))
            }
            ScriptCommand::Store(command) => session.run(command, out),
        };
        result.with_context(|| format!("第 {} 行执行失败: {}", number, line.trim()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::SchemeArg;
    use crate::config::AppConfig;
    use holo_core::{EffectSlot, LayerEffectValue, MemoryStorage};

    fn session() -> Session<MemoryStorage> {
        Session::open(MemoryStorage::new(), AppConfig::default())
    }

    #[test]
    fn test_split_line() {
        assert_eq!(
            split_line(r#"rename abc "Gold Card"  x"#).unwrap(),
            vec!["rename", "abc", "Gold Card", "x"]
        );
        assert_eq!(split_line("add ''").unwrap(), vec!["add", ""]);
        assert!(split_line(r#"add "open"#).is_err());
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# comment").unwrap(), None);
        assert_eq!(parse_line("undo").unwrap(), Some(ScriptCommand::Undo));
        assert_eq!(
            parse_line("preset 2 glare neon-glow --scheme s1").unwrap(),
            Some(ScriptCommand::Store(Command::Preset {
                layer: 2,
                slot: EffectSlot::Glare,
                preset_id: "neon-glow".into(),
                scheme: SchemeArg {
                    id: Some("s1".into())
                },
            }))
        );
        assert_eq!(
            parse_line("default --clear").unwrap(),
            Some(ScriptCommand::Store(Command::Default {
                id: None,
                clear: true
            }))
        );
        assert!(parse_line("preset 0 sparkle gold-foil").is_err());
        assert!(parse_line("fly").is_err());
    }

    #[test]
    fn test_script_undo_redo() {
        let mut session = session();
        let script = "\
# one session
add-layer
preset 1 shine rainbow-holo
undo
";
        let mut out = Vec::new();
        run_script(&mut session, script, &mut out).unwrap();

        let scheme = session.store().active_scheme().unwrap();
        assert_eq!(scheme.layers.len(), 2);
        assert!(matches!(
            &scheme.layers[1].shine,
            LayerEffectValue::Editable(e) if !e.enabled
        ));

        run_script(&mut session, "redo", &mut out).unwrap();
        let scheme = session.store().active_scheme().unwrap();
        assert!(matches!(
            &scheme.layers[1].shine,
            LayerEffectValue::Editable(e) if e.enabled
        ));
    }

    #[test]
    fn test_script_stops_at_failing_line() {
        let mut session = session();
        let script = "add First\nundo\nundo\nundo\nadd Never";
        let mut out = Vec::new();
        let err = run_script(&mut session, script, &mut out).unwrap_err();
        assert!(format!("{err:#}").contains("第 3 行"));
        assert!(
            session
                .store()
                .schemes()
                .iter()
                .all(|s| s.name != "Never")
        );
    }

    #[test]
    fn test_script_rejects_nested_script() {
        let mut session = session();
        let mut out = Vec::new();
        assert!(run_script(&mut session, "script other.txt", &mut out).is_err());
    }
}
