//! # Effect 模块
//!
//! 光效的两种表示与层光效的联合类型。
//!
//! ## 两种表示
//!
//! - **渲染配置**（[`EffectConfig`]）：扁平的 CSS 背景层列表，渲染端直接消费，
//!   不含任何编辑信息。
//! - **可编辑光效**（[`EditorLayerEffect`]）：保留每个字段的"来源"
//!   （固定值 / CSS 变量 / 变量乘系数），编辑界面可以还原并修改原始意图。
//!
//! ## 层光效
//!
//! [`LayerEffectValue`] 是三选一的显式枚举：
//!
//! ```text
//! Editable(EditorLayerEffect)  内联、可编辑
//! Render(EffectConfig)         内联、仅渲染（不可分解编辑）
//! Shared(String)               引用方案内的共享光效 id
//! ```
//!
//! 线上 JSON 不带显式标签：字符串为引用，含 `layers` 数组的对象为渲染配置，
//! 其余对象为可编辑光效。变体只在校验修复阶段判定一次，之后一律按枚举标签匹配。

use serde::{Deserialize, Serialize};

use crate::gradient::{GradientConfig, GradientKind};

// =============================================================================
// 渲染配置
// =============================================================================

/// 背景层类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "linear-gradient")]
    LinearGradient,
    #[serde(rename = "radial-gradient")]
    RadialGradient,
    #[serde(rename = "conic-gradient")]
    ConicGradient,
    #[serde(rename = "repeating-linear-gradient")]
    RepeatingLinearGradient,
    #[serde(rename = "repeating-radial-gradient")]
    RepeatingRadialGradient,
    #[serde(rename = "repeating-conic-gradient")]
    RepeatingConicGradient,
}

impl BackgroundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundKind::Image => "image",
            BackgroundKind::LinearGradient => "linear-gradient",
            BackgroundKind::RadialGradient => "radial-gradient",
            BackgroundKind::ConicGradient => "conic-gradient",
            BackgroundKind::RepeatingLinearGradient => "repeating-linear-gradient",
            BackgroundKind::RepeatingRadialGradient => "repeating-radial-gradient",
            BackgroundKind::RepeatingConicGradient => "repeating-conic-gradient",
        }
    }
}

impl From<GradientKind> for BackgroundKind {
    fn from(kind: GradientKind) -> Self {
        match kind {
            GradientKind::Linear => BackgroundKind::LinearGradient,
            GradientKind::Radial => BackgroundKind::RadialGradient,
            GradientKind::Conic => BackgroundKind::ConicGradient,
            GradientKind::RepeatingLinear => BackgroundKind::RepeatingLinearGradient,
            GradientKind::RepeatingRadial => BackgroundKind::RepeatingRadialGradient,
            GradientKind::RepeatingConic => BackgroundKind::RepeatingConicGradient,
        }
    }
}

/// 一个 CSS 背景层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSource {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    /// 图片 URL 或渐变参数串
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    /// background-blend-mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<String>,
}

impl BackgroundSource {
    /// 创建只有类型和值的背景层
    pub fn new(kind: BackgroundKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            size: None,
            position: None,
            repeat: None,
            blend_mode: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: impl Into<String>) -> Self {
        self.blend_mode = Some(blend_mode.into());
        self
    }
}

/// 不透明度：数值或 CSS 表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Opacity {
    Number(f64),
    Expr(String),
}

/// 渲染配置（渲染端直接消费的格式）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectConfig {
    pub layers: Vec<BackgroundSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Opacity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix_blend_mode: Option<String>,
}

// =============================================================================
// 可编辑光效
// =============================================================================

/// 单轴位置的来源模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosAxisMode {
    /// 固定值
    Value,
    /// `var(--x)`
    Var,
    /// `calc(var(--x) * factor)`
    Calc,
}

/// 单轴位置配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosAxisConfig {
    pub mode: PosAxisMode,
    pub value: String,
    pub variable: String,
    pub calc_factor: f64,
}

impl PosAxisConfig {
    /// 固定值模式的轴配置
    pub fn new(value: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            mode: PosAxisMode::Value,
            value: value.into(),
            variable: variable.into(),
            calc_factor: 1.0,
        }
    }

    pub fn with_mode(mut self, mode: PosAxisMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for PosAxisConfig {
    fn default() -> Self {
        Self::new("50%", "--pointer-x")
    }
}

/// 光源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Gradient,
    Image,
}

/// 尺寸模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// 关键字（cover / contain / ...）
    Keyword,
    /// 宽高百分比
    Split,
}

/// 位置模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosMode {
    /// 预设关键字（center / top / ...）
    Preset,
    /// X/Y 分轴配置
    Split,
}

/// 可编辑光源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorGradientSource {
    pub id: i64,
    pub source_type: SourceType,
    pub gradient_config: GradientConfig,
    pub image_url: String,
    pub size_mode: SizeMode,
    pub size_keyword: String,
    pub size_w: f64,
    pub size_h: f64,
    pub pos_mode: PosMode,
    pub pos_preset: String,
    pub pos_x: PosAxisConfig,
    pub pos_y: PosAxisConfig,
    pub repeat: String,
    pub blend_mode: String,
}

impl EditorGradientSource {
    /// 默认渐变光源
    pub fn new(id: i64) -> Self {
        Self {
            id,
            source_type: SourceType::Gradient,
            gradient_config: GradientConfig::default(),
            image_url: String::new(),
            size_mode: SizeMode::Keyword,
            size_keyword: "cover".to_string(),
            size_w: 100.0,
            size_h: 100.0,
            pos_mode: PosMode::Preset,
            pos_preset: "center".to_string(),
            pos_x: PosAxisConfig::new("50%", "--pointer-x"),
            pos_y: PosAxisConfig::new("50%", "--pointer-y"),
            repeat: "repeat".to_string(),
            blend_mode: "normal".to_string(),
        }
    }
}

/// 可编辑光效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorLayerEffect {
    pub enabled: bool,
    pub sources: Vec<EditorGradientSource>,
    /// 不透明度（0-100）
    pub opacity: f64,
    pub mix_blend_mode: String,
    pub filter: String,
    pub mask: String,
}

impl Default for EditorLayerEffect {
    /// 禁用的空光效
    fn default() -> Self {
        Self {
            enabled: false,
            sources: Vec::new(),
            opacity: 80.0,
            mix_blend_mode: String::new(),
            filter: String::new(),
            mask: String::new(),
        }
    }
}

// =============================================================================
// 层光效
// =============================================================================

/// 层光效值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerEffectValue {
    /// 共享光效引用
    Shared(String),
    /// 内联渲染配置
    Render(EffectConfig),
    /// 内联可编辑光效
    Editable(EditorLayerEffect),
}

impl LayerEffectValue {
    /// 是否为共享引用
    pub fn is_shared(&self) -> bool {
        matches!(self, LayerEffectValue::Shared(_))
    }

    /// 引用的共享光效 id
    pub fn shared_id(&self) -> Option<&str> {
        match self {
            LayerEffectValue::Shared(id) => Some(id),
            _ => None,
        }
    }
}

impl Default for LayerEffectValue {
    fn default() -> Self {
        LayerEffectValue::Editable(EditorLayerEffect::default())
    }
}

impl From<EditorLayerEffect> for LayerEffectValue {
    fn from(effect: EditorLayerEffect) -> Self {
        LayerEffectValue::Editable(effect)
    }
}

impl From<EffectConfig> for LayerEffectValue {
    fn from(config: EffectConfig) -> Self {
        LayerEffectValue::Render(config)
    }
}

/// 解析后的光效（引用已展开）
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEffect {
    Editable(EditorLayerEffect),
    Render(EffectConfig),
}

/// 光效绑定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectBinding {
    Inline,
    Shared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_effect() {
        let effect = EditorLayerEffect::default();
        assert!(!effect.enabled);
        assert!(effect.sources.is_empty());
        assert_eq!(effect.opacity, 80.0);
        assert!(effect.mix_blend_mode.is_empty());
    }

    #[test]
    fn test_layer_effect_value_wire_shapes() {
        let shared = LayerEffectValue::Shared("abc".to_string());
        assert_eq!(serde_json::to_string(&shared).unwrap(), "\"abc\"");

        let render = LayerEffectValue::Render(EffectConfig {
            layers: vec![BackgroundSource::new(BackgroundKind::Image, "a.png")],
            ..Default::default()
        });
        let json = serde_json::to_value(&render).unwrap();
        assert_eq!(json["layers"][0]["type"], "image");
        assert!(json.get("sources").is_none());

        let editable = LayerEffectValue::default();
        let json = serde_json::to_value(&editable).unwrap();
        assert_eq!(json["sources"], serde_json::json!([]));
        assert_eq!(json["mixBlendMode"], "");
    }

    #[test]
    fn test_layer_effect_value_deserialize_picks_variant() {
        let v: LayerEffectValue = serde_json::from_str(r#"{"layers":[]}"#).unwrap();
        assert!(matches!(v, LayerEffectValue::Render(_)));

        let v: LayerEffectValue = serde_json::from_str(
            r#"{"enabled":true,"sources":[],"opacity":50,"mixBlendMode":"","filter":"","mask":""}"#,
        )
        .unwrap();
        assert!(matches!(v, LayerEffectValue::Editable(_)));

        let v: LayerEffectValue = serde_json::from_str(r#""shared-1""#).unwrap();
        assert_eq!(v.shared_id(), Some("shared-1"));
    }

    #[test]
    fn test_opacity_number_or_expr() {
        let cfg: EffectConfig =
            serde_json::from_str(r#"{"layers":[],"opacity":"var(--o)"}"#).unwrap();
        assert_eq!(cfg.opacity, Some(Opacity::Expr("var(--o)".to_string())));

        let cfg: EffectConfig = serde_json::from_str(r#"{"layers":[],"opacity":0.5}"#).unwrap();
        assert_eq!(cfg.opacity, Some(Opacity::Number(0.5)));
    }

    #[test]
    fn test_background_kind_from_gradient() {
        for kind in GradientKind::ALL {
            assert_eq!(BackgroundKind::from(kind).as_str(), kind.as_str());
        }
    }
}
