//! # Validation 模块
//!
//! 不可信文档 → 结构完整的 [`EditorPersistence`]。
//!
//! ## 修复策略
//!
//! - 只替换类型错误或缺失的字段，能保留的用户数据一律保留
//! - 只合成最小的默认值，不做"聪明"的纠正
//! - 不是对象的方案 / 共享光效 / 光源元素直接丢弃；不是对象的图层替换为默认图层
//! - 共享引用（字符串光效）在此阶段不检查是否存在，悬空引用在解析时处理
//!
//! 修复按深度优先进行：方案 → 图层 → 光效 → 光源 → 色标，最后修复根级交叉引用。
//! 任一层级发生替换，返回的 `repaired` 即为 `true`。
//!
//! 修复是幂等的：对修复结果再次修复不会产生任何变化。

use serde_json::{Map, Value};
use tracing::debug;

use crate::effect::{
    BackgroundKind, BackgroundSource, EditorGradientSource, EditorLayerEffect, EffectConfig,
    LayerEffectValue, Opacity, PosAxisConfig, PosAxisMode, PosMode, SizeMode, SourceType,
};
use crate::gradient::{GradientConfig, GradientKind, GradientStop};
use crate::model::{
    CardScheme, DEFAULT_CARD_WIDTH, DEFAULT_SCHEME_NAME, EditorLayer, EditorPersistence,
    FIRST_SCHEME_NAME, MaskMode, SharedEffect, generate_id, next_layer_id,
    reassign_duplicate_ids,
};

/// 共享光效名称缺失时的默认值
pub const DEFAULT_SHARED_EFFECT_NAME: &str = "Unnamed Effect";

/// 修复结果
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub data: T,
    /// 是否做过任何替换
    pub repaired: bool,
}

impl<T> Repaired<T> {
    fn new(data: T, repaired: bool) -> Self {
        Self { data, repaired }
    }
}

// =============================================================================
// 字段读取
// =============================================================================

/// 对象字段读取器，记录是否发生过替换
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    repaired: bool,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>) -> Self {
        Self {
            obj,
            repaired: false,
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key)
    }

    fn mark(&mut self, dirty: bool) {
        self.repaired |= dirty;
    }

    /// 字符串字段（允许空串）
    fn string(&mut self, key: &str, default: impl FnOnce() -> String) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => {
                self.repaired = true;
                default()
            }
        }
    }

    /// 非空字符串字段
    fn non_empty_string(&mut self, key: &str, default: impl FnOnce() -> String) -> String {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                self.repaired = true;
                default()
            }
        }
    }

    fn number(&mut self, key: &str, default: f64) -> f64 {
        match self.get(key).and_then(Value::as_f64) {
            Some(n) => n,
            None => {
                self.repaired = true;
                default
            }
        }
    }

    /// 整数字段，非整数的数值截断
    fn integer(&mut self, key: &str, default: impl FnOnce() -> i64) -> i64 {
        let value = self.get(key);
        if let Some(n) = value.and_then(Value::as_i64) {
            return n;
        }
        self.repaired = true;
        match value.and_then(Value::as_f64) {
            Some(f) => f as i64,
            None => default(),
        }
    }

    fn boolean(&mut self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => {
                self.repaired = true;
                default
            }
        }
    }

    /// 字面量枚举字段
    fn literal<T>(&mut self, key: &str, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
        match self.get(key).and_then(Value::as_str).and_then(parse) {
            Some(v) => v,
            None => {
                self.repaired = true;
                default
            }
        }
    }

    /// 可选字符串：缺失或 null 为 `None`，其他类型视为损坏
    fn optional_string(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.repaired = true;
                None
            }
        }
    }
}

// =============================================================================
// 根文档
// =============================================================================

/// 校验并修复持久化文档
pub fn repair(raw: &Value) -> Repaired<EditorPersistence> {
    let Some(obj) = raw.as_object() else {
        debug!("根节点不是对象，使用全新文档");
        return Repaired::new(EditorPersistence::fresh(), true);
    };

    let mut repaired = false;

    // 方案列表
    let mut schemes: Vec<CardScheme> = match obj.get("schemes") {
        Some(Value::Array(items)) if !items.is_empty() => {
            let mut valid = Vec::with_capacity(items.len());
            for item in items {
                match repair_scheme(item) {
                    Some(result) => {
                        repaired |= result.repaired;
                        valid.push(result.data);
                    }
                    None => {
                        debug!("丢弃无法修复的方案元素");
                        repaired = true;
                    }
                }
            }
            valid
        }
        _ => {
            repaired = true;
            Vec::new()
        }
    };

    if schemes.is_empty() {
        schemes.push(CardScheme::new(FIRST_SCHEME_NAME));
        repaired = true;
    }

    // 方案 id 唯一
    if reassign_duplicate_ids(schemes.iter_mut().map(|s| &mut s.id)) {
        repaired = true;
    }

    // 当前激活方案
    let active_scheme_id = match obj.get("activeSchemeId").and_then(Value::as_str) {
        Some(id) if schemes.iter().any(|s| s.id == id) => id.to_string(),
        _ => {
            repaired = true;
            schemes[0].id.clone()
        }
    };

    // 默认方案
    let default_scheme_id = match obj.get("defaultSchemeId") {
        Some(Value::Null) => None,
        Some(Value::String(id)) if schemes.iter().any(|s| &s.id == id) => Some(id.clone()),
        _ => {
            repaired = true;
            None
        }
    };

    Repaired::new(
        EditorPersistence {
            schemes,
            default_scheme_id,
            active_scheme_id,
        },
        repaired,
    )
}

/// 从文本解析并修复
///
/// 无法解析的文本视为完全损坏，返回全新文档。
pub fn repair_text(text: &str) -> Repaired<EditorPersistence> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => repair(&value),
        Err(e) => {
            debug!(error = %e, "持久化文本不是合法 JSON");
            Repaired::new(EditorPersistence::fresh(), true)
        }
    }
}

// =============================================================================
// 方案
// =============================================================================

/// 校验并修复单个方案
///
/// 不是对象时返回 `None`（调用方丢弃该元素）。
pub fn repair_scheme(raw: &Value) -> Option<Repaired<CardScheme>> {
    let obj = raw.as_object()?;
    let mut f = Fields::new(obj);

    let id = f.non_empty_string("id", generate_id);
    let name = f.non_empty_string("name", || DEFAULT_SCHEME_NAME.to_string());
    let card_width = f.string("cardWidth", || DEFAULT_CARD_WIDTH.to_string());

    let layers = match f.get("layers") {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| {
                let result = repair_layer(item);
                f.mark(result.repaired);
                result.data
            })
            .collect(),
        _ => {
            f.mark(true);
            vec![EditorLayer::new(1)]
        }
    };

    let shared_effects = match f.get("sharedEffects") {
        Some(Value::Array(items)) => {
            let mut valid: Vec<SharedEffect> = Vec::with_capacity(items.len());
            for item in items {
                match repair_shared_effect(item) {
                    Some(result) => {
                        f.mark(result.repaired);
                        valid.push(result.data);
                    }
                    None => f.mark(true),
                }
            }
            f.mark(reassign_duplicate_ids(valid.iter_mut().map(|e| &mut e.id)));
            valid
        }
        _ => {
            f.mark(true);
            Vec::new()
        }
    };

    Some(Repaired::new(
        CardScheme {
            id,
            name,
            card_width,
            layers,
            shared_effects,
        },
        f.repaired,
    ))
}

// =============================================================================
// 图层
// =============================================================================

fn repair_layer(raw: &Value) -> Repaired<EditorLayer> {
    let Some(obj) = raw.as_object() else {
        return Repaired::new(EditorLayer::with_timestamp_id(), true);
    };
    let mut f = Fields::new(obj);

    let id = f.integer("id", next_layer_id);
    let img = f.string("img", String::new);
    let z_height = f.number("zHeight", 0.0);
    let mask_mode = f.literal("maskMode", MaskMode::parse, MaskMode::Auto);
    let mask_url = f.string("maskUrl", String::new);
    let visible = f.boolean("visible", true);

    let shine = repair_effect_slot(f.get("shine"));
    f.mark(shine.repaired);
    let glare = repair_effect_slot(f.get("glare"));
    f.mark(glare.repaired);

    Repaired::new(
        EditorLayer {
            id,
            img,
            z_height,
            mask_mode,
            mask_url,
            visible,
            shine: shine.data,
            glare: glare.data,
        },
        f.repaired,
    )
}

/// 修复图层的 shine / glare 槽位
fn repair_effect_slot(raw: Option<&Value>) -> Repaired<LayerEffectValue> {
    match raw {
        // 共享引用，存在性留到解析时检查
        Some(Value::String(id)) => Repaired::new(LayerEffectValue::Shared(id.clone()), false),
        Some(Value::Object(obj)) => repair_effect_object(obj),
        _ => Repaired::new(LayerEffectValue::default(), true),
    }
}

/// 修复光效对象，按是否含 `layers` 数组区分两种形状
pub fn repair_effect_object(obj: &Map<String, Value>) -> Repaired<LayerEffectValue> {
    if matches!(obj.get("layers"), Some(Value::Array(_))) {
        let result = repair_render_config(obj);
        Repaired::new(LayerEffectValue::Render(result.data), result.repaired)
    } else {
        let result = repair_editable_effect(obj);
        Repaired::new(LayerEffectValue::Editable(result.data), result.repaired)
    }
}

// =============================================================================
// 渲染配置（透传，只丢弃完全不可读的背景层）
// =============================================================================

fn repair_render_config(obj: &Map<String, Value>) -> Repaired<EffectConfig> {
    let mut f = Fields::new(obj);

    let mut layers = Vec::new();
    if let Some(Value::Array(items)) = f.get("layers") {
        for item in items {
            match item.as_object().and_then(read_background) {
                Some(result) => {
                    f.mark(result.repaired);
                    layers.push(result.data);
                }
                None => {
                    debug!("丢弃无法读取的背景层");
                    f.mark(true);
                }
            }
        }
    }

    let opacity = match f.get("opacity") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(Opacity::Expr(s.clone())),
        Some(v) => match v.as_f64() {
            Some(n) => Some(Opacity::Number(n)),
            None => {
                f.mark(true);
                None
            }
        },
    };

    let mask = f.optional_string("mask");
    let filter = f.optional_string("filter");
    let mix_blend_mode = f.optional_string("mixBlendMode");

    Repaired::new(
        EffectConfig {
            layers,
            opacity,
            mask,
            filter,
            mix_blend_mode,
        },
        f.repaired,
    )
}

fn read_background(obj: &Map<String, Value>) -> Option<Repaired<BackgroundSource>> {
    let kind: BackgroundKind = serde_json::from_value(obj.get("type")?.clone()).ok()?;
    let value = obj.get("value")?.as_str()?.to_string();

    let mut f = Fields::new(obj);
    let source = BackgroundSource {
        kind,
        value,
        size: f.optional_string("size"),
        position: f.optional_string("position"),
        repeat: f.optional_string("repeat"),
        blend_mode: f.optional_string("blendMode"),
    };
    Some(Repaired::new(source, f.repaired))
}

// =============================================================================
// 可编辑光效
// =============================================================================

fn repair_editable_effect(obj: &Map<String, Value>) -> Repaired<EditorLayerEffect> {
    let base = EditorLayerEffect::default();
    let mut f = Fields::new(obj);

    let enabled = f.boolean("enabled", base.enabled);

    let sources = match f.get("sources") {
        Some(Value::Array(items)) => {
            let mut valid = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(source) => {
                        let result = repair_source(source, index);
                        f.mark(result.repaired);
                        valid.push(result.data);
                    }
                    None => f.mark(true),
                }
            }
            valid
        }
        _ => {
            f.mark(true);
            Vec::new()
        }
    };

    let opacity = f.number("opacity", base.opacity);
    let mix_blend_mode = f.string("mixBlendMode", String::new);
    let filter = f.string("filter", String::new);
    let mask = f.string("mask", String::new);

    Repaired::new(
        EditorLayerEffect {
            enabled,
            sources,
            opacity,
            mix_blend_mode,
            filter,
            mask,
        },
        f.repaired,
    )
}

fn repair_source(obj: &Map<String, Value>, index: usize) -> Repaired<EditorGradientSource> {
    let mut f = Fields::new(obj);

    let id = f.integer("id", || index as i64 + 1);
    let base = EditorGradientSource::new(id);

    let source_type = f.literal(
        "sourceType",
        |s| match s {
            "gradient" => Some(SourceType::Gradient),
            "image" => Some(SourceType::Image),
            _ => None,
        },
        base.source_type,
    );

    let gradient_config = match f.get("gradientConfig") {
        Some(Value::Object(cfg)) => {
            let result = repair_gradient_config(cfg);
            f.mark(result.repaired);
            result.data
        }
        _ => {
            f.mark(true);
            base.gradient_config
        }
    };

    let image_url = f.string("imageUrl", String::new);
    let size_mode = f.literal(
        "sizeMode",
        |s| match s {
            "keyword" => Some(SizeMode::Keyword),
            "split" => Some(SizeMode::Split),
            _ => None,
        },
        base.size_mode,
    );
    let size_keyword = f.string("sizeKeyword", || base.size_keyword);
    let size_w = f.number("sizeW", base.size_w);
    let size_h = f.number("sizeH", base.size_h);
    let pos_mode = f.literal(
        "posMode",
        |s| match s {
            "preset" => Some(PosMode::Preset),
            "split" => Some(PosMode::Split),
            _ => None,
        },
        base.pos_mode,
    );
    let pos_preset = f.string("posPreset", || base.pos_preset);

    let pos_x = repair_axis_field(&mut f, "posX", base.pos_x);
    let pos_y = repair_axis_field(&mut f, "posY", base.pos_y);

    let repeat = f.string("repeat", || base.repeat);
    let blend_mode = f.string("blendMode", || base.blend_mode);

    Repaired::new(
        EditorGradientSource {
            id,
            source_type,
            gradient_config,
            image_url,
            size_mode,
            size_keyword,
            size_w,
            size_h,
            pos_mode,
            pos_preset,
            pos_x,
            pos_y,
            repeat,
            blend_mode,
        },
        f.repaired,
    )
}

fn repair_axis_field(f: &mut Fields<'_>, key: &str, base: PosAxisConfig) -> PosAxisConfig {
    match f.get(key) {
        Some(Value::Object(obj)) => {
            let mut axis = Fields::new(obj);
            let mode = axis.literal(
                "mode",
                |s| match s {
                    "value" => Some(PosAxisMode::Value),
                    "var" => Some(PosAxisMode::Var),
                    "calc" => Some(PosAxisMode::Calc),
                    _ => None,
                },
                base.mode,
            );
            let value = axis.string("value", || base.value);
            let variable = axis.string("variable", || base.variable);
            let calc_factor = axis.number("calcFactor", base.calc_factor);
            f.mark(axis.repaired);
            PosAxisConfig {
                mode,
                value,
                variable,
                calc_factor,
            }
        }
        _ => {
            f.mark(true);
            base
        }
    }
}

fn repair_gradient_config(obj: &Map<String, Value>) -> Repaired<GradientConfig> {
    let base = GradientConfig::default();
    let mut f = Fields::new(obj);

    let kind = f.literal("type", GradientKind::parse, base.kind);
    let angle = f.number("angle", base.angle);

    let stops = match f.get("stops") {
        Some(Value::Array(items)) => {
            let mut valid = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(stop) => {
                        let mut s = Fields::new(stop);
                        let id = s.integer("id", || index as i64 + 1);
                        let color = s.string("color", || "#FFFFFF".to_string());
                        let position = s.number("position", 0.0);
                        let alpha = s.number("alpha", 100.0);
                        f.mark(s.repaired);
                        valid.push(GradientStop {
                            id,
                            color,
                            position,
                            alpha,
                        });
                    }
                    None => f.mark(true),
                }
            }
            valid
        }
        _ => {
            f.mark(true);
            base.stops
        }
    };

    Repaired::new(GradientConfig { kind, angle, stops }, f.repaired)
}

// =============================================================================
// 共享光效
// =============================================================================

fn repair_shared_effect(raw: &Value) -> Option<Repaired<SharedEffect>> {
    let obj = raw.as_object()?;
    let mut f = Fields::new(obj);

    let id = f.non_empty_string("id", generate_id);
    let name = f.non_empty_string("name", || DEFAULT_SHARED_EFFECT_NAME.to_string());

    let effect = match f.get("effect") {
        // 共享光效只能是可编辑结构
        Some(Value::Object(effect)) if !matches!(effect.get("layers"), Some(Value::Array(_))) => {
            let result = repair_editable_effect(effect);
            f.mark(result.repaired);
            result.data
        }
        _ => {
            f.mark(true);
            EditorLayerEffect::default()
        }
    };

    Some(Repaired::new(SharedEffect { id, name, effect }, f.repaired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stable(raw: Value) -> EditorPersistence {
        let first = repair(&raw);
        let again = repair(&serde_json::to_value(&first.data).unwrap());
        assert!(!again.repaired, "再次修复不应有变化: {raw}");
        assert_eq!(again.data, first.data);
        first.data
    }

    fn valid_doc() -> Value {
        json!({
            "schemes": [{
                "id": "s1",
                "name": "Card",
                "cardWidth": "320px",
                "layers": [{
                    "id": 7,
                    "img": "a.png",
                    "zHeight": 40,
                    "maskMode": "custom",
                    "maskUrl": "m.png",
                    "visible": false,
                    "shine": "fx1",
                    "glare": { "layers": [{ "type": "image", "value": "g.png" }], "filter": "none" }
                }],
                "sharedEffects": [{
                    "id": "fx1",
                    "name": "Foil",
                    "effect": {
                        "enabled": true, "sources": [], "opacity": 60,
                        "mixBlendMode": "", "filter": "", "mask": ""
                    }
                }]
            }],
            "defaultSchemeId": "s1",
            "activeSchemeId": "s1"
        })
    }

    #[test]
    fn test_valid_document_untouched() {
        let result = repair(&valid_doc());
        assert!(!result.repaired);

        let scheme = &result.data.schemes[0];
        assert_eq!(scheme.card_width, "320px");
        let layer = &scheme.layers[0];
        assert_eq!(layer.id, 7);
        assert_eq!(layer.mask_mode, MaskMode::Custom);
        assert!(!layer.visible);
        assert_eq!(layer.shine, LayerEffectValue::Shared("fx1".to_string()));
        assert!(matches!(layer.glare, LayerEffectValue::Render(_)));
        assert_eq!(result.data.default_scheme_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_non_object_root() {
        for raw in [json!(null), json!(42), json!("text"), json!([1, 2]), json!(true)] {
            let result = repair(&raw);
            assert!(result.repaired);
            assert_eq!(result.data.schemes.len(), 1);
            assert_eq!(result.data.schemes[0].name, "My Card");
            assert_eq!(result.data.active_scheme_id, result.data.schemes[0].id);
        }
    }

    #[test]
    fn test_invalid_text() {
        let result = repair_text("{not json");
        assert!(result.repaired);
        assert_eq!(result.data.schemes.len(), 1);
    }

    #[test]
    fn test_non_object_schemes_dropped() {
        let mut doc = valid_doc();
        doc["schemes"].as_array_mut().unwrap().insert(0, json!(5));
        doc["schemes"].as_array_mut().unwrap().push(json!("x"));
        let result = repair(&doc);
        assert!(result.repaired);
        assert_eq!(result.data.schemes.len(), 1);
        assert_eq!(result.data.schemes[0].id, "s1");
    }

    #[test]
    fn test_all_schemes_dropped_synthesizes_default() {
        let result = repair(&json!({ "schemes": [1, null, "x"] }));
        assert!(result.repaired);
        assert_eq!(result.data.schemes.len(), 1);
        assert_eq!(result.data.schemes[0].name, "My Card");
    }

    #[test]
    fn test_scheme_scalar_defaults() {
        let result = repair(&json!({
            "schemes": [{ "id": "", "name": 3, "cardWidth": null, "layers": [] }]
        }));
        assert!(result.repaired);
        let scheme = &result.data.schemes[0];
        assert!(!scheme.id.is_empty());
        assert_eq!(scheme.name, "Untitled");
        assert_eq!(scheme.card_width, "300px");
        assert_eq!(scheme.layers.len(), 1);
        assert_eq!(scheme.layers[0].id, 1);
        assert!(scheme.shared_effects.is_empty());
        assert_eq!(result.data.active_scheme_id, scheme.id);
    }

    #[test]
    fn test_layer_field_defaults() {
        let result = repair(&json!({
            "schemes": [{
                "id": "s", "name": "n", "cardWidth": "1px", "sharedEffects": [],
                "layers": [
                    { "id": "x", "img": 1, "zHeight": "deep", "maskMode": "weird",
                      "maskUrl": false, "visible": "yes", "shine": null },
                    7
                ]
            }],
            "activeSchemeId": "s",
            "defaultSchemeId": null
        }));
        assert!(result.repaired);
        let layers = &result.data.schemes[0].layers;
        assert_eq!(layers.len(), 2);
        let layer = &layers[0];
        assert!(layer.id > 0);
        assert_eq!(layer.img, "");
        assert_eq!(layer.z_height, 0.0);
        assert_eq!(layer.mask_mode, MaskMode::Auto);
        assert_eq!(layer.mask_url, "");
        assert!(layer.visible);
        assert_eq!(layer.shine, LayerEffectValue::default());
        assert_eq!(layer.glare, LayerEffectValue::default());
        assert_eq!(layers[1].shine, LayerEffectValue::default());
    }

    #[test]
    fn test_dangling_reference_kept() {
        let mut doc = valid_doc();
        doc["schemes"][0]["layers"][0]["shine"] = json!("nope");
        let result = repair(&doc);
        assert!(!result.repaired);
        assert_eq!(
            result.data.schemes[0].layers[0].shine,
            LayerEffectValue::Shared("nope".to_string())
        );
    }

    #[test]
    fn test_editable_effect_fields_repaired() {
        let mut doc = valid_doc();
        doc["schemes"][0]["layers"][0]["shine"] = json!({ "enabled": 1, "opacity": "x" });
        let result = repair(&doc);
        assert!(result.repaired);
        assert_eq!(
            result.data.schemes[0].layers[0].shine,
            LayerEffectValue::Editable(EditorLayerEffect::default())
        );
    }

    #[test]
    fn test_sources_repaired_field_by_field() {
        let mut doc = valid_doc();
        doc["schemes"][0]["layers"][0]["shine"] = json!({
            "enabled": true, "opacity": 70, "mixBlendMode": "", "filter": "", "mask": "",
            "sources": [
                { "sourceType": "image", "imageUrl": "foil.png", "sizeW": "big" },
                "garbage"
            ]
        });
        let result = repair(&doc);
        assert!(result.repaired);
        let LayerEffectValue::Editable(effect) = &result.data.schemes[0].layers[0].shine else {
            panic!("应为可编辑光效");
        };
        assert_eq!(effect.sources.len(), 1);
        let source = &effect.sources[0];
        assert_eq!(source.id, 1);
        assert_eq!(source.source_type, SourceType::Image);
        assert_eq!(source.image_url, "foil.png");
        assert_eq!(source.size_w, 100.0);
        assert_eq!(source.gradient_config, GradientConfig::default());
    }

    #[test]
    fn test_render_config_drops_unreadable_layers() {
        let mut doc = valid_doc();
        doc["schemes"][0]["layers"][0]["glare"] = json!({
            "layers": [
                { "type": "radial-gradient", "value": "circle, #fff 0%", "size": "cover" },
                { "type": "bogus", "value": "x" },
                { "value": "missing type" }
            ],
            "opacity": "var(--o)",
            "mixBlendMode": "overlay"
        });
        let result = repair(&doc);
        assert!(result.repaired);
        let LayerEffectValue::Render(config) = &result.data.schemes[0].layers[0].glare else {
            panic!("应为渲染配置");
        };
        assert_eq!(config.layers.len(), 1);
        assert_eq!(config.layers[0].size.as_deref(), Some("cover"));
        assert_eq!(config.opacity, Some(Opacity::Expr("var(--o)".to_string())));
        assert_eq!(config.mix_blend_mode.as_deref(), Some("overlay"));
    }

    #[test]
    fn test_shared_effects_repaired() {
        let mut doc = valid_doc();
        doc["schemes"][0]["sharedEffects"] = json!([
            null,
            { "id": "fx1", "name": "", "effect": 5 },
            { "id": "fx1", "name": "Dup", "effect": { "layers": [] } }
        ]);
        let result = repair(&doc);
        assert!(result.repaired);
        let shared = &result.data.schemes[0].shared_effects;
        assert_eq!(shared.len(), 2);
        assert_eq!(shared[0].id, "fx1");
        assert_eq!(shared[0].name, "Unnamed Effect");
        assert_eq!(shared[0].effect, EditorLayerEffect::default());
        assert_ne!(shared[1].id, "fx1");
        assert_eq!(shared[1].effect, EditorLayerEffect::default());
    }

    #[test]
    fn test_shared_effects_not_array() {
        let mut doc = valid_doc();
        doc["schemes"][0]["sharedEffects"] = json!({});
        let result = repair(&doc);
        assert!(result.repaired);
        assert!(result.data.schemes[0].shared_effects.is_empty());
    }

    #[test]
    fn test_cross_references() {
        let mut doc = valid_doc();
        doc["activeSchemeId"] = json!("ghost");
        doc["defaultSchemeId"] = json!("ghost");
        let result = repair(&doc);
        assert!(result.repaired);
        assert_eq!(result.data.active_scheme_id, "s1");
        assert!(result.data.default_scheme_id.is_none());

        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("defaultSchemeId");
        let result = repair(&doc);
        assert!(result.repaired);
        assert!(result.data.default_scheme_id.is_none());
    }

    #[test]
    fn test_duplicate_scheme_ids() {
        let mut doc = valid_doc();
        let copy = doc["schemes"][0].clone();
        doc["schemes"].as_array_mut().unwrap().push(copy);
        let result = repair(&doc);
        assert!(result.repaired);
        assert_eq!(result.data.schemes.len(), 2);
        assert_eq!(result.data.schemes[0].id, "s1");
        assert_ne!(result.data.schemes[1].id, "s1");
    }

    #[test]
    fn test_fractional_id_truncated() {
        let mut doc = valid_doc();
        doc["schemes"][0]["layers"][0]["id"] = json!(7.9);
        let result = repair(&doc);
        assert!(result.repaired);
        assert_eq!(result.data.schemes[0].layers[0].id, 7);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let inputs = vec![
            json!(null),
            json!([]),
            json!({}),
            json!({ "schemes": "nope" }),
            json!({ "schemes": [{}] }),
            json!({ "schemes": [{ "layers": [null, 1, { "shine": [1, 2] }] }] }),
            json!({ "schemes": [{ "layers": [{ "shine": { "sources": [{}, 3] } }] }] }),
            json!({ "schemes": [{ "layers": [{ "glare": { "layers": [1, {}] } }] }] }),
            json!({ "schemes": [{ "sharedEffects": [{}, { "effect": { "sources": "x" } }] }] }),
            json!({ "schemes": [{ "id": "a" }, { "id": "a" }], "activeSchemeId": "a" }),
            valid_doc(),
        ];
        for raw in inputs {
            stable(raw);
        }
    }

    #[test]
    fn test_deeply_malformed_sources() {
        let doc = stable(json!({
            "schemes": [{
                "layers": [{
                    "shine": {
                        "sources": [{
                            "gradientConfig": {
                                "type": "nope", "angle": "x", "stops": [null, { "color": 1 }]
                            },
                            "posX": 4,
                            "posY": { "mode": "calc", "calcFactor": 2 }
                        }]
                    }
                }]
            }]
        }));
        let LayerEffectValue::Editable(effect) = &doc.schemes[0].layers[0].shine else {
            panic!("应为可编辑光效");
        };
        let source = &effect.sources[0];
        assert_eq!(source.gradient_config.kind, GradientKind::Linear);
        assert_eq!(source.gradient_config.angle, 45.0);
        assert_eq!(source.gradient_config.stops.len(), 1);
        assert_eq!(source.gradient_config.stops[0].color, "#FFFFFF");
        assert_eq!(source.gradient_config.stops[0].id, 2);
        assert_eq!(source.pos_x.variable, "--pointer-x");
        assert_eq!(source.pos_y.mode, PosAxisMode::Calc);
        assert_eq!(source.pos_y.calc_factor, 2.0);
        assert_eq!(source.pos_y.variable, "--pointer-y");
    }
}
