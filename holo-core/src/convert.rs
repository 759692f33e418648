//! # Convert 模块
//!
//! 可编辑结构 → 渲染配置的转换，以及层光效引用的解析。
//!
//! ## 两种解析目标
//!
//! - [`resolve_reference`]：展开共享引用，结果可能是可编辑光效或渲染配置，
//!   供渲染路径使用。
//! - [`resolve_editable`]：保证返回可编辑光效，供编辑界面使用。
//!   渲染配置不可分解，因此被替换为禁用的默认光效。
//!
//! 悬空引用（找不到共享光效）一律解析为禁用的默认光效，不报错。

use crate::effect::{
    BackgroundKind, BackgroundSource, EditorGradientSource, EditorLayerEffect, EffectConfig,
    LayerEffectValue, Opacity, PosAxisConfig, PosAxisMode, PosMode, ResolvedEffect, SizeMode,
    SourceType,
};
use crate::gradient::compile_output;
use crate::model::{CardScheme, EditorLayer, MaskMode, RenderLayer};

// =============================================================================
// 位置 / 尺寸
// =============================================================================

/// 单轴位置 → CSS 文本
pub fn compute_pos_axis(axis: &PosAxisConfig) -> String {
    match axis.mode {
        PosAxisMode::Var => format!("var({})", axis.variable),
        PosAxisMode::Calc => format!("calc(var({}) * {})", axis.variable, axis.calc_factor),
        PosAxisMode::Value => axis.value.clone(),
    }
}

/// 光源尺寸 → CSS background-size
pub fn compute_source_size(source: &EditorGradientSource) -> String {
    match source.size_mode {
        SizeMode::Keyword => source.size_keyword.clone(),
        SizeMode::Split => format!("{}% {}%", source.size_w, source.size_h),
    }
}

/// 光源位置 → CSS background-position
pub fn compute_source_position(source: &EditorGradientSource) -> String {
    match source.pos_mode {
        PosMode::Preset => source.pos_preset.clone(),
        PosMode::Split => format!(
            "{} {}",
            compute_pos_axis(&source.pos_x),
            compute_pos_axis(&source.pos_y)
        ),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// 可编辑光源 → 背景层
///
/// 空字符串字段不输出。
pub fn source_to_background(source: &EditorGradientSource) -> BackgroundSource {
    let (kind, value) = match source.source_type {
        SourceType::Image => (BackgroundKind::Image, source.image_url.clone()),
        SourceType::Gradient => {
            let output = compile_output(&source.gradient_config);
            (BackgroundKind::from(output.kind), output.value)
        }
    };

    BackgroundSource {
        kind,
        value,
        size: non_empty(compute_source_size(source)),
        position: non_empty(compute_source_position(source)),
        repeat: non_empty(source.repeat.clone()),
        blend_mode: non_empty(source.blend_mode.clone()),
    }
}

// =============================================================================
// 光效 → 渲染配置
// =============================================================================

/// 可编辑光效 → 渲染配置
///
/// 未启用或没有光源时返回 `None`（无光效）。
pub fn editable_to_render(effect: &EditorLayerEffect) -> Option<EffectConfig> {
    if !effect.enabled || effect.sources.is_empty() {
        return None;
    }

    Some(EffectConfig {
        layers: effect.sources.iter().map(source_to_background).collect(),
        opacity: Some(Opacity::Number(effect.opacity / 100.0)),
        mix_blend_mode: non_empty(effect.mix_blend_mode.clone()),
        filter: non_empty(effect.filter.clone()),
        mask: non_empty(effect.mask.clone()),
    })
}

/// 解析结果 → 渲染配置
///
/// 渲染配置原样返回，除非背景层为空（此时为无光效）。
pub fn to_render_config(effect: &ResolvedEffect) -> Option<EffectConfig> {
    match effect {
        ResolvedEffect::Render(config) => {
            if config.layers.is_empty() {
                None
            } else {
                Some(config.clone())
            }
        }
        ResolvedEffect::Editable(editable) => editable_to_render(editable),
    }
}

// =============================================================================
// 引用解析
// =============================================================================

/// 展开共享引用
pub fn resolve_reference(value: &LayerEffectValue, scheme: &CardScheme) -> ResolvedEffect {
    match value {
        LayerEffectValue::Shared(id) => match scheme.shared_effect(id) {
            Some(shared) => ResolvedEffect::Editable(shared.effect.clone()),
            None => ResolvedEffect::Editable(EditorLayerEffect::default()),
        },
        LayerEffectValue::Editable(effect) => ResolvedEffect::Editable(effect.clone()),
        LayerEffectValue::Render(config) => ResolvedEffect::Render(config.clone()),
    }
}

/// 展开共享引用，并保证结果可编辑
pub fn resolve_editable(value: &LayerEffectValue, scheme: &CardScheme) -> EditorLayerEffect {
    match resolve_reference(value, scheme) {
        ResolvedEffect::Editable(effect) => effect,
        ResolvedEffect::Render(_) => EditorLayerEffect::default(),
    }
}

// =============================================================================
// 渲染图层
// =============================================================================

/// 图层遮罩描述
pub fn layer_mask(layer: &EditorLayer) -> Option<String> {
    match layer.mask_mode {
        MaskMode::Full => Some("full".to_string()),
        MaskMode::Custom => non_empty(layer.mask_url.clone()),
        MaskMode::Auto => None,
    }
}

/// 单个图层 → 渲染图层
pub fn to_render_layer(layer: &EditorLayer, scheme: &CardScheme) -> RenderLayer {
    RenderLayer {
        id: Some(layer.id),
        img: layer.img.clone(),
        z_height: layer.z_height,
        mask: layer_mask(layer),
        shine_effects: to_render_config(&resolve_reference(&layer.shine, scheme)),
        glare_effects: to_render_config(&resolve_reference(&layer.glare, scheme)),
    }
}

/// 方案 → 渲染图层列表（仅可见图层）
pub fn render_layers(scheme: &CardScheme) -> Vec<RenderLayer> {
    scheme
        .layers
        .iter()
        .filter(|layer| layer.visible)
        .map(|layer| to_render_layer(layer, scheme))
        .collect()
}
