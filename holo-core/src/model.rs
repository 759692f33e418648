//! # Model 模块
//!
//! 方案文档的数据模型与工厂函数。
//!
//! ## 文档结构
//!
//! ```text
//! EditorPersistence
//! ├── schemes: [CardScheme]          非空，id 唯一
//! │   ├── layers: [EditorLayer]      每层有 shine / glare 两个光效槽
//! │   └── sharedEffects: [SharedEffect]
//! ├── defaultSchemeId: null | id
//! └── activeSchemeId: id
//! ```
//!
//! 所有结构按 camelCase 字段名序列化，与持久化格式一致。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::effect::{EditorLayerEffect, EffectConfig, LayerEffectValue};

/// 新建方案的默认名称
pub const DEFAULT_SCHEME_NAME: &str = "Untitled";
/// 首次创建 / 重置文档时的方案名称
pub const FIRST_SCHEME_NAME: &str = "My Card";
/// 默认卡片宽度
pub const DEFAULT_CARD_WIDTH: &str = "300px";

/// 遮罩模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    /// 使用图层图片本身作为遮罩
    #[default]
    Auto,
    /// 整卡遮罩
    Full,
    /// 自定义遮罩图片
    Custom,
}

impl MaskMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(MaskMode::Auto),
            "full" => Some(MaskMode::Full),
            "custom" => Some(MaskMode::Custom),
            _ => None,
        }
    }
}

/// 光效槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectSlot {
    /// 反光扫过
    Shine,
    /// 高光
    Glare,
}

impl EffectSlot {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shine" => Some(EffectSlot::Shine),
            "glare" => Some(EffectSlot::Glare),
            _ => None,
        }
    }
}

/// 编辑器图层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorLayer {
    pub id: i64,
    pub img: String,
    /// 视差深度
    pub z_height: f64,
    pub mask_mode: MaskMode,
    pub mask_url: String,
    /// 预览可见性
    pub visible: bool,
    pub shine: LayerEffectValue,
    pub glare: LayerEffectValue,
}

impl EditorLayer {
    /// 创建默认图层
    pub fn new(id: i64) -> Self {
        Self {
            id,
            img: String::new(),
            z_height: 0.0,
            mask_mode: MaskMode::Auto,
            mask_url: String::new(),
            visible: true,
            shine: LayerEffectValue::default(),
            glare: LayerEffectValue::default(),
        }
    }

    /// 使用时间戳 id 创建默认图层
    pub fn with_timestamp_id() -> Self {
        Self::new(next_layer_id())
    }

    pub fn effect(&self, slot: EffectSlot) -> &LayerEffectValue {
        match slot {
            EffectSlot::Shine => &self.shine,
            EffectSlot::Glare => &self.glare,
        }
    }

    pub fn effect_mut(&mut self, slot: EffectSlot) -> &mut LayerEffectValue {
        match slot {
            EffectSlot::Shine => &mut self.shine,
            EffectSlot::Glare => &mut self.glare,
        }
    }
}

/// 共享光效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedEffect {
    pub id: String,
    pub name: String,
    /// 共享光效总是可编辑结构，不允许渲染配置或再次引用
    pub effect: EditorLayerEffect,
}

impl SharedEffect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            effect: EditorLayerEffect::default(),
        }
    }
}

/// 卡片方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardScheme {
    pub id: String,
    pub name: String,
    /// CSS 长度
    pub card_width: String,
    pub layers: Vec<EditorLayer>,
    pub shared_effects: Vec<SharedEffect>,
}

impl CardScheme {
    /// 创建默认方案（一个默认图层）
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(generate_id(), name)
    }

    /// 使用指定 id 创建默认方案
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            card_width: DEFAULT_CARD_WIDTH.to_string(),
            layers: vec![EditorLayer::new(1)],
            shared_effects: Vec::new(),
        }
    }

    pub fn shared_effect(&self, id: &str) -> Option<&SharedEffect> {
        self.shared_effects.iter().find(|e| e.id == id)
    }

    pub fn shared_effect_mut(&mut self, id: &str) -> Option<&mut SharedEffect> {
        self.shared_effects.iter_mut().find(|e| e.id == id)
    }

    /// 卡片宽度的像素整数部分（无法解析时为 300）
    pub fn card_width_px(&self) -> u32 {
        let digits: String = self
            .card_width
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        match digits.parse::<u32>() {
            Ok(px) if px > 0 => px,
            _ => 300,
        }
    }
}

impl Default for CardScheme {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME_NAME)
    }
}

/// 根持久化文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorPersistence {
    pub schemes: Vec<CardScheme>,
    pub default_scheme_id: Option<String>,
    pub active_scheme_id: String,
}

impl EditorPersistence {
    /// 只含一个方案的全新文档
    pub fn fresh() -> Self {
        let scheme = CardScheme::new(FIRST_SCHEME_NAME);
        Self {
            active_scheme_id: scheme.id.clone(),
            schemes: vec![scheme],
            default_scheme_id: None,
        }
    }

    pub fn scheme(&self, id: &str) -> Option<&CardScheme> {
        self.schemes.iter().find(|s| s.id == id)
    }

    pub fn scheme_mut(&mut self, id: &str) -> Option<&mut CardScheme> {
        self.schemes.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemes.iter().any(|s| s.id == id)
    }

    /// 当前激活的方案
    pub fn active_scheme(&self) -> Option<&CardScheme> {
        self.scheme(&self.active_scheme_id)
    }

    /// 恢复根级不变量，返回是否做了修正
    ///
    /// - schemes 非空
    /// - 方案 id 唯一，方案内共享光效 id 唯一
    /// - activeSchemeId 指向存在的方案
    /// - defaultSchemeId 为空或指向存在的方案
    pub fn enforce_invariants(&mut self) -> bool {
        let mut fixed = false;

        if self.schemes.is_empty() {
            self.schemes.push(CardScheme::new(FIRST_SCHEME_NAME));
            fixed = true;
        }

        fixed |= reassign_duplicate_ids(self.schemes.iter_mut().map(|s| &mut s.id));
        for scheme in &mut self.schemes {
            fixed |= reassign_duplicate_ids(scheme.shared_effects.iter_mut().map(|e| &mut e.id));
        }

        if !self.contains(&self.active_scheme_id) {
            self.active_scheme_id = self.schemes[0].id.clone();
            fixed = true;
        }

        if let Some(default_id) = &self.default_scheme_id
            && !self.contains(default_id)
        {
            self.default_scheme_id = None;
            fixed = true;
        }

        fixed
    }
}

impl Default for EditorPersistence {
    fn default() -> Self {
        Self::fresh()
    }
}

/// 渲染图层（交给渲染端的唯一数据形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub img: String,
    pub z_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shine_effects: Option<EffectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glare_effects: Option<EffectConfig>,
}

// =============================================================================
// 标识符
// =============================================================================

/// 重复出现的 id 换成新生成的 id（首次出现的保留），返回是否有改动
pub fn reassign_duplicate_ids<'a>(ids: impl IntoIterator<Item = &'a mut String>) -> bool {
    let mut seen = HashSet::new();
    let mut changed = false;
    for id in ids {
        if !seen.insert(id.clone()) {
            *id = generate_id();
            seen.insert(id.clone());
            changed = true;
        }
    }
    changed
}

/// 生成方案 / 共享光效 id（UUID v4）
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

static LAST_LAYER_ID: AtomicI64 = AtomicI64::new(0);

/// 生成图层 id
///
/// 取当前毫秒时间戳；同一毫秒内多次调用时递增，保证进程内唯一。
pub fn next_layer_id() -> i64 {
    let now = current_timestamp_ms();
    let mut last = LAST_LAYER_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_LAYER_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// 获取当前时间戳（Unix 毫秒）
fn current_timestamp_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
