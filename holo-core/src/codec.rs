//! # Codec 模块
//!
//! 渲染图层的导出（三种文本格式）与方案导入（两种 JSON 形状）。
//!
//! ## 导出格式
//!
//! | 标签   | 内容                                         |
//! |--------|----------------------------------------------|
//! | `json` | 传输 JSON：`{ layers, cardWidth? }`          |
//! | `ts`   | 可直接引用的图层常量声明                     |
//! | `vue`  | 可直接运行的组件示例                         |
//!
//! 后两种格式只用于复制粘贴，导入时不会再解析；
//! 多行值（如多行渐变参数）以反引号块原样输出。
//!
//! ## 导入形状
//!
//! 1. 完整方案：`name` 为字符串且 `layers` 为数组，按校验规则修复后分配新 id
//! 2. 传输 JSON：只有 `layers` 数组，逐层转换回编辑器图层，包装为 "Imported" 方案

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::effect::{BackgroundSource, EffectConfig, LayerEffectValue, Opacity};
use crate::error::ImportError;
use crate::model::{
    CardScheme, DEFAULT_CARD_WIDTH, EditorLayer, MaskMode, RenderLayer, generate_id,
};
use crate::validation::{repair_effect_object, repair_scheme};

/// 导出代码中引用的图层类型模块
pub const LAYER_TYPE_MODULE: &str = "#layers/shine-card/app/utils/shine-card-types";

/// 传输 JSON 导入得到的方案名称
pub const IMPORTED_SCHEME_NAME: &str = "Imported";

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// 传输 JSON
    Json,
    /// 源码声明
    Source,
    /// 组件示例
    Component,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Json,
        ExportFormat::Source,
        ExportFormat::Component,
    ];

    /// 格式标签
    pub fn tag(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Source => "ts",
            ExportFormat::Component => "vue",
        }
    }

    /// 从标签解析
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }

    /// 输出文件扩展名
    pub fn extension(&self) -> &'static str {
        self.tag()
    }
}

/// 按格式导出
pub fn export(layers: &[RenderLayer], card_width: Option<&str>, format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => export_json(layers, card_width),
        ExportFormat::Source => export_source(layers, card_width),
        ExportFormat::Component => export_component(layers, card_width),
    }
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferPayload<'a> {
    layers: &'a [RenderLayer],
    #[serde(skip_serializing_if = "Option::is_none")]
    card_width: Option<&'a str>,
}

/// 导出传输 JSON（两空格缩进）
pub fn export_json(layers: &[RenderLayer], card_width: Option<&str>) -> String {
    let payload = TransferPayload {
        layers,
        card_width: card_width.filter(|w| !w.is_empty()),
    };
    // 结构只含字符串与数值，序列化不会失败
    serde_json::to_string_pretty(&payload).unwrap_or_default()
}

// =============================================================================
// 源码 / 组件
// =============================================================================

/// 导出图层常量声明
pub fn export_source(layers: &[RenderLayer], card_width: Option<&str>) -> String {
    let mut lines = vec![
        format!("import type {{ ParallaxLayer }} from '{}'", LAYER_TYPE_MODULE),
        String::new(),
    ];

    if let Some(width) = card_width.filter(|w| !w.is_empty()) {
        lines.push(format!("export const cardWidth = {}", quote(width)));
        lines.push(String::new());
    }

    lines.push(format!(
        "export const layers: ParallaxLayer[] = {}",
        emit_layers(layers)
    ));

    lines.join("\n")
}

/// 导出组件示例
pub fn export_component(layers: &[RenderLayer], card_width: Option<&str>) -> String {
    let width = card_width.unwrap_or(DEFAULT_CARD_WIDTH);

    let lines = [
        "<script setup lang=\"ts\">".to_string(),
        format!("import type {{ ParallaxLayer }} from '{}'", LAYER_TYPE_MODULE),
        String::new(),
        "const isReady = ref(false)".to_string(),
        String::new(),
        format!("const layers: ParallaxLayer[] = {}", emit_layers(layers)),
        "</script>".to_string(),
        String::new(),
        "<template>".to_string(),
        "  <ShineCard".to_string(),
        "    :layers=\"layers\"".to_string(),
        format!("    width=\"{}\"", width),
        "    @ready=\"isReady = true\"".to_string(),
        "  />".to_string(),
        "</template>".to_string(),
    ];

    lines.join("\n")
}

/// JSON 字符串字面量
fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn emit_layers(layers: &[RenderLayer]) -> String {
    let items: Vec<String> = layers.iter().map(emit_layer).collect();
    format!("[\n{}\n]", items.join(",\n"))
}

fn emit_layer(layer: &RenderLayer) -> String {
    let mut parts = Vec::new();

    if let Some(id) = layer.id {
        parts.push(format!("    id: {}", id));
    }
    parts.push(format!("    img: {}", quote(&layer.img)));
    parts.push(format!("    zHeight: {}", layer.z_height));

    if let Some(mask) = layer.mask.as_deref().filter(|m| !m.is_empty()) {
        parts.push(format!("    mask: {}", quote(mask)));
    }
    if let Some(shine) = &layer.shine_effects {
        parts.push(format!("    shineEffects: {}", emit_effect(shine, 4)));
    }
    if let Some(glare) = &layer.glare_effects {
        parts.push(format!("    glareEffects: {}", emit_effect(glare, 4)));
    }

    format!("  {{\n{}\n  }}", parts.join(",\n"))
}

fn emit_effect(config: &EffectConfig, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let inner = " ".repeat(indent + 2);
    let mut parts = vec![format!(
        "{}layers: {}",
        inner,
        emit_sources(&config.layers, indent + 2)
    )];

    match &config.opacity {
        Some(Opacity::Number(n)) => parts.push(format!("{}opacity: {}", inner, n)),
        Some(Opacity::Expr(expr)) => parts.push(format!("{}opacity: {}", inner, quote(expr))),
        None => {}
    }

    let optional = [
        ("mixBlendMode", &config.mix_blend_mode),
        ("filter", &config.filter),
        ("mask", &config.mask),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("{}{}: {}", inner, key, quote(value)));
        }
    }

    format!("{{\n{}\n{}}}", parts.join(",\n"), pad)
}

fn emit_sources(sources: &[BackgroundSource], indent: usize) -> String {
    if sources.is_empty() {
        return "[]".to_string();
    }

    let pad = " ".repeat(indent);
    let items: Vec<String> = sources
        .iter()
        .map(|s| emit_source(s, indent + 2))
        .collect();
    format!("[\n{}\n{}]", items.join(",\n"), pad)
}

fn emit_source(source: &BackgroundSource, indent: usize) -> String {
    let outer = " ".repeat(indent);
    let pad = " ".repeat(indent + 2);
    let mut parts = vec![format!("{}type: {}", pad, quote(source.kind.as_str()))];

    if source.value.contains('\n') {
        parts.push(format!("{}value: `\n{}\n{}`", pad, source.value, pad));
    } else {
        parts.push(format!("{}value: {}", pad, quote(&source.value)));
    }

    let optional = [
        ("size", &source.size),
        ("position", &source.position),
        ("repeat", &source.repeat),
        ("blendMode", &source.blend_mode),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("{}{}: {}", pad, key, quote(value)));
        }
    }

    format!("{}{{\n{}\n{}}}", outer, parts.join(",\n"), outer)
}

// =============================================================================
// 导入
// =============================================================================

/// 从 JSON 文本导入方案
///
/// 失败时不产生任何副作用。
pub fn import_scheme(text: &str) -> Result<CardScheme, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::InvalidJson(e.to_string()))?;

    let Some(obj) = value.as_object() else {
        return Err(ImportError::InvalidStructure);
    };

    let Some(Value::Array(layers)) = obj.get("layers") else {
        return Err(ImportError::InvalidStructure);
    };

    // 形状 1：完整方案
    if obj.get("name").is_some_and(Value::is_string) {
        let repaired = repair_scheme(&value).ok_or(ImportError::InvalidScheme)?;
        if repaired.repaired {
            debug!("导入的方案经过修复");
        }
        let mut scheme = repaired.data;
        scheme.id = generate_id();
        return Ok(scheme);
    }

    // 形状 2：传输 JSON
    let card_width = obj
        .get("cardWidth")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CARD_WIDTH)
        .to_string();

    let mut editor_layers: Vec<EditorLayer> = layers
        .iter()
        .enumerate()
        .map(|(index, raw)| transfer_to_editor_layer(raw, index))
        .collect();
    if editor_layers.is_empty() {
        editor_layers.push(EditorLayer::new(1));
    }

    Ok(CardScheme {
        id: generate_id(),
        name: IMPORTED_SCHEME_NAME.to_string(),
        card_width,
        layers: editor_layers,
        shared_effects: Vec::new(),
    })
}

/// 渲染图层记录 → 编辑器图层
fn transfer_to_editor_layer(raw: &Value, index: usize) -> EditorLayer {
    let fallback_id = index as i64 + 1;
    let mut layer = EditorLayer::new(fallback_id);

    let Some(obj) = raw.as_object() else {
        return layer;
    };

    if let Some(id) = obj.get("id") {
        layer.id = id
            .as_i64()
            .or_else(|| id.as_f64().map(|f| f as i64))
            .unwrap_or(fallback_id);
    }
    if let Some(img) = obj.get("img").and_then(Value::as_str) {
        layer.img = img.to_string();
    }
    if let Some(z) = obj.get("zHeight").and_then(Value::as_f64) {
        layer.z_height = z;
    }

    match obj.get("mask").and_then(Value::as_str) {
        Some("full") => layer.mask_mode = MaskMode::Full,
        Some(url) if !url.is_empty() => {
            layer.mask_mode = MaskMode::Custom;
            layer.mask_url = url.to_string();
        }
        _ => {}
    }

    layer.shine = transfer_effect(obj.get("shineEffects"));
    layer.glare = transfer_effect(obj.get("glareEffects"));
    layer
}

fn transfer_effect(raw: Option<&Value>) -> LayerEffectValue {
    match raw.and_then(Value::as_object) {
        Some(obj) => repair_effect_object(obj).data,
        None => LayerEffectValue::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::render_layers;
    use crate::effect::BackgroundKind;

    fn sample_layers() -> Vec<RenderLayer> {
        vec![RenderLayer {
            id: Some(1),
            img: "card.png".to_string(),
            z_height: 40.0,
            mask: Some("full".to_string()),
            shine_effects: Some(EffectConfig {
                layers: vec![
                    BackgroundSource::new(BackgroundKind::LinearGradient, "45deg, red 0%")
                        .with_size("cover")
                        .with_blend_mode("overlay"),
                ],
                opacity: Some(Opacity::Number(0.8)),
                ..Default::default()
            }),
            glare_effects: None,
        }]
    }

    #[test]
    fn test_format_tags() {
        for format in ExportFormat::ALL {
            assert_eq!(ExportFormat::parse(format.tag()), Some(format));
        }
        assert_eq!(ExportFormat::Source.tag(), "ts");
        assert_eq!(ExportFormat::Component.tag(), "vue");
        assert_eq!(ExportFormat::parse("yaml"), None);
    }

    #[test]
    fn test_export_source() {
        let text = export_source(&sample_layers(), Some("320px"));
        insta::assert_snapshot!(text, @r#"
        import type { ParallaxLayer } from '#layers/shine-card/app/utils/shine-card-types'

        export const cardWidth = "320px"

        export const layers: ParallaxLayer[] = [
          {
            id: 1,
            img: "card.png",
            zHeight: 40,
            mask: "full",
            shineEffects: {
              layers: [
                {
                  type: "linear-gradient",
                  value: "45deg, red 0%",
                  size: "cover",
                  blendMode: "overlay"
                }
              ],
              opacity: 0.8
            }
          }
        ]
        "#);
    }

    #[test]
    fn test_export_source_without_width() {
        let text = export_source(&sample_layers(), None);
        assert!(!text.contains("cardWidth"));
        assert!(text.starts_with("import type { ParallaxLayer }"));
    }

    #[test]
    fn test_export_component() {
        let layers = vec![RenderLayer {
            id: None,
            img: "a.png".to_string(),
            z_height: 0.0,
            mask: None,
            shine_effects: None,
            glare_effects: None,
        }];
        let text = export_component(&layers, None);
        insta::assert_snapshot!(text, @r#"
        <script setup lang="ts">
        import type { ParallaxLayer } from '#layers/shine-card/app/utils/shine-card-types'

        const isReady = ref(false)

        const layers: ParallaxLayer[] = [
          {
            img: "a.png",
            zHeight: 0
          }
        ]
        </script>

        <template>
          <ShineCard
            :layers="layers"
            width="300px"
            @ready="isReady = true"
          />
        </template>
        "#);
    }

    #[test]
    fn test_multiline_value_uses_backtick_block() {
        let mut layers = sample_layers();
        if let Some(shine) = layers[0].shine_effects.as_mut() {
            shine.layers[0].value = "\na,\nb\n".to_string();
        }
        let text = export_source(&layers, None);
        assert!(text.contains("          value: `\n\na,\nb\n\n          `"));
    }

    #[test]
    fn test_export_json_field_order() {
        let text = export_json(&sample_layers(), Some("300px"));
        let layers_at = text.find("\"layers\"").unwrap();
        let width_at = text.find("\"cardWidth\"").unwrap();
        assert!(layers_at < width_at);
        assert!(text.contains("\n  \"layers\": ["));

        let text = export_json(&sample_layers(), Some(""));
        assert!(!text.contains("cardWidth"));
    }

    #[test]
    fn test_import_invalid_json() {
        let err = import_scheme("{oops").unwrap_err();
        assert_eq!(err.code(), "invalid_json");
    }

    #[test]
    fn test_import_invalid_structure() {
        for text in ["[]", "42", "null", r#"{"name":"x"}"#, r#"{"layers":{}}"#] {
            assert_eq!(import_scheme(text).unwrap_err(), ImportError::InvalidStructure);
        }
    }

    #[test]
    fn test_import_full_scheme_gets_new_id() {
        let text = r#"{"id":"keep","name":"Mine","cardWidth":"250px","layers":[{"id":3}]}"#;
        let scheme = import_scheme(text).unwrap();
        assert_ne!(scheme.id, "keep");
        assert_eq!(scheme.name, "Mine");
        assert_eq!(scheme.card_width, "250px");
        assert_eq!(scheme.layers[0].id, 3);
        assert!(scheme.layers[0].visible);
    }

    #[test]
    fn test_import_transfer_shape() {
        let scheme =
            import_scheme(r#"{"layers":[{"img":"x.png","zHeight":10,"mask":"full"}]}"#).unwrap();
        assert_eq!(scheme.name, "Imported");
        assert_eq!(scheme.card_width, "300px");
        assert_eq!(scheme.layers.len(), 1);
        let layer = &scheme.layers[0];
        assert_eq!(layer.id, 1);
        assert_eq!(layer.img, "x.png");
        assert_eq!(layer.z_height, 10.0);
        assert_eq!(layer.mask_mode, MaskMode::Full);
        assert_eq!(layer.mask_url, "");
        assert!(layer.visible);
    }

    #[test]
    fn test_import_transfer_custom_mask_and_effects() {
        let text = r#"{
            "cardWidth": "280px",
            "layers": [
                { "id": 9, "img": "a.png", "zHeight": 5, "mask": "m.png",
                  "shineEffects": { "layers": [{ "type": "image", "value": "s.png" }] } },
                { "img": "b.png" }
            ]
        }"#;
        let scheme = import_scheme(text).unwrap();
        assert_eq!(scheme.card_width, "280px");
        assert_eq!(scheme.layers[0].id, 9);
        assert_eq!(scheme.layers[0].mask_mode, MaskMode::Custom);
        assert_eq!(scheme.layers[0].mask_url, "m.png");
        assert!(matches!(scheme.layers[0].shine, LayerEffectValue::Render(_)));
        assert_eq!(scheme.layers[1].id, 2);
        assert_eq!(scheme.layers[1].mask_mode, MaskMode::Auto);
        assert_eq!(scheme.layers[1].shine, LayerEffectValue::default());
    }

    #[test]
    fn test_transfer_roundtrip() {
        let layers = sample_layers();
        let text = export_json(&layers, Some("320px"));
        let scheme = import_scheme(&text).unwrap();
        assert_eq!(scheme.card_width, "320px");
        assert_eq!(render_layers(&scheme), layers);
    }
}
