//! # 命令模块
//!
//! 子命令定义与执行。
//!
//! ## 设计原则
//!
//! - 每个子命令对应一个存储操作，执行逻辑与进程入口分离，便于用内存存储测试
//! - 命令结果写入调用方提供的输出流，日志走 tracing
//! - 操作被拒绝（id 不存在、删除最后一个方案等）时返回错误，不静默成功
//! - 需要指定方案的命令默认作用于激活方案，可用 `--scheme` 覆盖

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, Subcommand};
use holo_core::{
    CardScheme, EffectSlot, ExportFormat, HoloError, LayerEffectValue, SchemeStore, Storage,
    all_presets, repair_text,
};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::script;

/// 子命令
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// 列出所有方案
    List,

    /// 显示方案详情（默认激活方案）
    Show {
        #[arg(long)]
        id: Option<String>,
    },

    /// 新建方案并激活
    Add {
        /// 方案名称
        name: Option<String>,
    },

    /// 复制方案
    Duplicate { id: String },

    /// 删除方案（不能删除最后一个）
    Remove { id: String },

    /// 重命名方案
    Rename { id: String, name: String },

    /// 将方案恢复为单个默认图层
    Reset { id: String },

    /// 清空所有方案，恢复为全新文档
    ResetAll,

    /// 激活方案
    Activate { id: String },

    /// 查看或设置默认方案
    Default {
        id: Option<String>,

        /// 清除默认方案
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },

    /// 追加默认图层
    AddLayer(SchemeArg),

    /// 删除图层（不能删除最后一个）
    RemoveLayer {
        index: usize,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 复制图层
    DuplicateLayer {
        index: usize,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 切换图层预览可见性
    ToggleLayer {
        index: usize,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 设置卡片宽度（像素）
    Width {
        px: u32,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 新建共享光效
    SharedAdd {
        name: String,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 删除共享光效（引用它的槽位恢复为默认光效）
    SharedRemove {
        effect_id: String,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 重命名共享光效
    SharedRename {
        effect_id: String,
        name: String,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 将图层槽位绑定到共享光效
    Bind {
        layer: usize,
        #[arg(value_parser = parse_slot)]
        slot: EffectSlot,
        effect_id: String,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 将共享引用复制为内联光效
    Detach {
        layer: usize,
        #[arg(value_parser = parse_slot)]
        slot: EffectSlot,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 列出内置光效预设
    Presets,

    /// 将预设写入图层槽位
    Preset {
        layer: usize,
        #[arg(value_parser = parse_slot)]
        slot: EffectSlot,
        preset_id: String,
        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 导出方案
    Export {
        /// json / ts / vue（默认取配置）
        #[arg(short, long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// 输出文件（默认取配置的导出目录，否则输出到标准输出）
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scheme: SchemeArg,
    },

    /// 导入方案（`-` 表示从标准输入读取）
    Import { source: String },

    /// 检查存储中的文档是否需要修复（不写回）
    RepairCheck,

    /// 在同一会话中执行脚本文件中的命令（支持 undo / redo）
    Script { file: PathBuf },
}

/// 目标方案参数
#[derive(Debug, Clone, PartialEq, Default, Args)]
pub struct SchemeArg {
    /// 目标方案 id（默认激活方案）
    #[arg(long = "scheme")]
    pub id: Option<String>,
}

fn parse_slot(s: &str) -> Result<EffectSlot, String> {
    EffectSlot::parse(s).ok_or_else(|| format!("未知槽位: {}（可选 shine / glare）", s))
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(s).ok_or_else(|| format!("未知导出格式: {}（可选 json / ts / vue）", s))
}

fn slot_name(slot: EffectSlot) -> &'static str {
    match slot {
        EffectSlot::Shine => "shine",
        EffectSlot::Glare => "glare",
    }
}

// =============================================================================
// 会话
// =============================================================================

/// 一次命令会话：持有方案存储与配置
pub struct Session<S: Storage> {
    store: SchemeStore<S>,
    config: AppConfig,
}

impl<S: Storage> Session<S> {
    /// 按配置加载存储
    pub fn open(storage: S, config: AppConfig) -> Self {
        let store = SchemeStore::load_with(storage, config.store_options());
        Self { store, config }
    }

    pub fn store(&self) -> &SchemeStore<S> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 撤销（会话内有效）
    pub fn undo(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        if !self.store.undo() {
            bail!("没有可撤销的操作");
        }
        writeln!(out, "已撤销")?;
        Ok(())
    }

    /// 重做（会话内有效）
    pub fn redo(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        if !self.store.redo() {
            bail!("没有可重做的操作");
        }
        writeln!(out, "已重做")?;
        Ok(())
    }

    fn target(&self, scheme: &SchemeArg) -> anyhow::Result<String> {
        let id = scheme
            .id
            .clone()
            .unwrap_or_else(|| self.store.active_scheme_id().to_string());
        if self.store.scheme(&id).is_none() {
            bail!("方案不存在: {}", id);
        }
        Ok(id)
    }

    /// 执行一条命令
    pub fn run(&mut self, command: &Command, out: &mut dyn Write) -> anyhow::Result<()> {
        debug!(?command, "执行命令");
        match command {
            Command::List => self.list(out)?,
            Command::Show { id } => {
                let id = self.target(&SchemeArg { id: id.clone() })?;
                if let Some(scheme) = self.store.scheme(&id) {
                    write_scheme(scheme, out)?;
                }
            }
            Command::Add { name } => {
                let id = self.store.add_scheme(name.as_deref());
                writeln!(out, "已新建方案: {}", id)?;
            }
            Command::Duplicate { id } => {
                let copy = self
                    .store
                    .duplicate_scheme(id)
                    .ok_or_else(|| anyhow!("方案不存在: {}", id))?;
                writeln!(out, "已复制方案: {}", copy)?;
            }
            Command::Remove { id } => {
                if !self.store.remove_scheme(id) {
                    bail!("无法删除方案 {}（不存在或是最后一个方案）", id);
                }
                writeln!(out, "已删除方案: {}", id)?;
            }
            Command::Rename { id, name } => {
                if !self.store.rename_scheme(id, name) {
                    bail!("无法重命名方案 {}（不存在或名称为空）", id);
                }
                writeln!(out, "已重命名方案: {}", id)?;
            }
            Command::Reset { id } => {
                if !self.store.reset_scheme(id) {
                    bail!("方案不存在: {}", id);
                }
                writeln!(out, "已重置方案: {}", id)?;
            }
            Command::ResetAll => {
                self.store.reset_all();
                writeln!(out, "已重置所有方案")?;
            }
            Command::Activate { id } => {
                if !self.store.set_active_scheme(id) {
                    bail!("方案不存在: {}", id);
                }
                writeln!(out, "已激活方案: {}", id)?;
            }
            Command::Default { id, clear } => self.default_scheme(id.as_deref(), *clear, out)?,
            Command::AddLayer(scheme) => {
                let scheme_id = self.target(scheme)?;
                let layer_id = self
                    .store
                    .add_layer(&scheme_id)
                    .ok_or_else(|| anyhow!("方案不存在: {}", scheme_id))?;
                writeln!(out, "已追加图层: {}", layer_id)?;
            }
            Command::RemoveLayer { index, scheme } => {
                let scheme_id = self.target(scheme)?;
                if !self.store.remove_layer(&scheme_id, *index) {
                    bail!("无法删除图层 {}（越界或是最后一个图层）", index);
                }
                writeln!(out, "已删除图层: {}", index)?;
            }
            Command::DuplicateLayer { index, scheme } => {
                let scheme_id = self.target(scheme)?;
                let layer_id = self
                    .store
                    .duplicate_layer(&scheme_id, *index)
                    .ok_or_else(|| anyhow!("图层不存在: {}", index))?;
                writeln!(out, "已复制图层: {}", layer_id)?;
            }
            Command::ToggleLayer { index, scheme } => {
                let scheme_id = self.target(scheme)?;
                let visible = self
                    .store
                    .toggle_layer_visibility(&scheme_id, *index)
                    .ok_or_else(|| anyhow!("图层不存在: {}", index))?;
                let state = if visible { "可见" } else { "隐藏" };
                writeln!(out, "图层 {} 现在{}", index, state)?;
            }
            Command::Width { px, scheme } => {
                let scheme_id = self.target(scheme)?;
                if *px == 0 {
                    bail!("卡片宽度必须大于 0");
                }
                self.store.set_card_width(&scheme_id, *px);
                writeln!(out, "卡片宽度: {}px", px)?;
            }
            Command::SharedAdd { name, scheme } => {
                let scheme_id = self.target(scheme)?;
                let effect_id = self
                    .store
                    .add_shared_effect(&scheme_id, name)
                    .ok_or_else(|| anyhow!("方案不存在: {}", scheme_id))?;
                writeln!(out, "已新建共享光效: {}", effect_id)?;
            }
            Command::SharedRemove { effect_id, scheme } => {
                let scheme_id = self.target(scheme)?;
                if !self.store.remove_shared_effect(&scheme_id, effect_id) {
                    bail!("共享光效不存在: {}", effect_id);
                }
                writeln!(out, "已删除共享光效: {}", effect_id)?;
            }
            Command::SharedRename {
                effect_id,
                name,
                scheme,
            } => {
                let scheme_id = self.target(scheme)?;
                if !self.store.rename_shared_effect(&scheme_id, effect_id, name) {
                    bail!("无法重命名共享光效 {}（不存在或名称为空）", effect_id);
                }
                writeln!(out, "已重命名共享光效: {}", effect_id)?;
            }
            Command::Bind {
                layer,
                slot,
                effect_id,
                scheme,
            } => {
                let scheme_id = self.target(scheme)?;
                if !self
                    .store
                    .set_layer_effect_shared(&scheme_id, *layer, *slot, effect_id)
                {
                    bail!("无法绑定（图层或共享光效不存在）");
                }
                writeln!(out, "图层 {} {} -> {}", layer, slot_name(*slot), effect_id)?;
            }
            Command::Detach {
                layer,
                slot,
                scheme,
            } => {
                let scheme_id = self.target(scheme)?;
                if !self.store.set_layer_effect_inline(&scheme_id, *layer, *slot) {
                    bail!("图层不存在: {}", layer);
                }
                writeln!(out, "图层 {} {} 已改为内联光效", layer, slot_name(*slot))?;
            }
            Command::Presets => {
                for preset in all_presets() {
                    writeln!(
                        out,
                        "{:<18} {:<6} {}",
                        preset.id,
                        preset.category.as_str(),
                        preset.name
                    )?;
                }
            }
            Command::Preset {
                layer,
                slot,
                preset_id,
                scheme,
            } => {
                let scheme_id = self.target(scheme)?;
                if !self
                    .store
                    .apply_preset(&scheme_id, *layer, *slot, preset_id)
                {
                    bail!("无法应用预设 {}（预设或图层不存在）", preset_id);
                }
                writeln!(out, "图层 {} {} <- {}", layer, slot_name(*slot), preset_id)?;
            }
            Command::Export {
                format,
                output,
                scheme,
            } => self.export(*format, output.as_deref(), scheme, out)?,
            Command::Import { source } => {
                let text = read_source(source)?;
                let id = self.store.import_and_save(&text).map_err(|e| match e {
                    HoloError::Import(e) => anyhow!("导入失败 [{}]: {}", e.code(), e),
                    other => anyhow::Error::new(other).context("导入的方案未能写入存储"),
                })?;
                writeln!(out, "已导入方案: {}", id)?;
            }
            Command::RepairCheck => {
                repair_check(self.store.storage(), &self.config.storage_key, out)?;
            }
            Command::Script { file } => {
                let text = fs::read_to_string(file)
                    .with_context(|| format!("无法读取脚本: {}", file.display()))?;
                script::run_script(self, &text, out)?;
            }
        }
        Ok(())
    }

    fn list(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let active = self.store.active_scheme_id();
        let default = self.store.default_scheme_id();
        for scheme in self.store.schemes() {
            let marker = if scheme.id == active { "*" } else { " " };
            let default_tag = if Some(scheme.id.as_str()) == default {
                " [default]"
            } else {
                ""
            };
            writeln!(
                out,
                "{} {}  {}{}  ({} layers, {})",
                marker,
                scheme.id,
                scheme.name,
                default_tag,
                scheme.layers.len(),
                scheme.card_width
            )?;
        }
        Ok(())
    }

    fn default_scheme(
        &mut self,
        id: Option<&str>,
        clear: bool,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        if clear {
            self.store.set_default_scheme(None);
            writeln!(out, "已清除默认方案")?;
            return Ok(());
        }
        match id {
            Some(id) => {
                if !self.store.set_default_scheme(Some(id)) {
                    bail!("方案不存在: {}", id);
                }
                writeln!(out, "默认方案: {}", id)?;
            }
            None => match self.store.default_scheme_id() {
                Some(id) => writeln!(out, "默认方案: {}", id)?,
                None => writeln!(
                    out,
                    "未设置默认方案（使用系统默认: {}）",
                    self.store.default_scheme().name
                )?,
            },
        }
        Ok(())
    }

    fn export(
        &self,
        format: Option<ExportFormat>,
        output: Option<&Path>,
        scheme: &SchemeArg,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let scheme_id = self.target(scheme)?;
        let format = format.unwrap_or_else(|| self.config.default_export_format());
        let text = self
            .store
            .export_scheme(&scheme_id, format)
            .ok_or_else(|| anyhow!("方案不存在: {}", scheme_id))?;

        let path = match (output, &self.config.export.output_dir) {
            (Some(path), _) => Some(path.to_path_buf()),
            (None, Some(dir)) => Some(dir.join(format!("{}.{}", scheme_id, format.extension()))),
            (None, None) => None,
        };

        match path {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("无法创建目录: {}", parent.display()))?;
                }
                fs::write(&path, &text)
                    .with_context(|| format!("无法写入: {}", path.display()))?;
                info!(path = %path.display(), format = format.tag(), "已导出");
                writeln!(out, "已导出: {}", path.display())?;
            }
            None => writeln!(out, "{}", text)?,
        }
        Ok(())
    }
}

fn read_source(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("无法读取标准输入")?;
        return Ok(text);
    }
    fs::read_to_string(source).with_context(|| format!("无法读取: {}", source))
}

/// 不加载存储，直接检查存储中的原始文档是否需要修复
pub fn repair_check(
    storage: &impl Storage,
    key: &str,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let Some(text) = storage.read(key).context("读取存储失败")? else {
        writeln!(out, "存储中没有文档: {}", key)?;
        return Ok(false);
    };
    let result = repair_text(&text);
    if result.repaired {
        writeln!(out, "需要修复: {}", key)?;
    } else {
        writeln!(out, "文档完好: {}", key)?;
    }
    Ok(result.repaired)
}

// =============================================================================
// 输出格式
// =============================================================================

fn describe_effect(value: &LayerEffectValue, scheme: &CardScheme) -> String {
    match value {
        LayerEffectValue::Shared(id) => match scheme.shared_effect(id) {
            Some(effect) => format!("shared \"{}\" ({})", effect.name, id),
            None => format!("shared (dangling {})", id),
        },
        LayerEffectValue::Render(config) => format!("render ({} layers)", config.layers.len()),
        LayerEffectValue::Editable(effect) => format!(
            "inline {} ({} sources, opacity {})",
            if effect.enabled { "on" } else { "off" },
            effect.sources.len(),
            effect.opacity
        ),
    }
}

fn write_scheme(scheme: &CardScheme, out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(out, "{} ({})", scheme.name, scheme.id)?;
    writeln!(out, "width: {}", scheme.card_width)?;
    writeln!(out, "layers:")?;
    for (index, layer) in scheme.layers.iter().enumerate() {
        writeln!(
            out,
            "  [{}] id={} img={:?} z={} mask={:?}{}",
            index,
            layer.id,
            layer.img,
            layer.z_height,
            layer.mask_mode,
            if layer.visible { "" } else { " hidden" }
        )?;
        writeln!(out, "      shine: {}", describe_effect(&layer.shine, scheme))?;
        writeln!(out, "      glare: {}", describe_effect(&layer.glare, scheme))?;
    }
    if !scheme.shared_effects.is_empty() {
        writeln!(out, "shared effects:")?;
        for effect in &scheme.shared_effects {
            writeln!(out, "  {}  {}", effect.id, effect.name)?;
        }
    }
    Ok(())
}
