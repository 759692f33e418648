//! # Presets 模块
//!
//! 内置光效预设与系统默认方案。
//!
//! ## 设计原则
//!
//! - 预设是可编辑光效，应用时深拷贝写入图层，之后与预设无关
//! - 应用预设时重新分配光源 id，避免与图层内已有光源冲突
//! - 系统默认方案只用于展示回退，不会被持久化

use crate::effect::{
    BackgroundKind, BackgroundSource, EditorGradientSource, EditorLayerEffect, EffectConfig,
    LayerEffectValue, PosAxisConfig, PosAxisMode, PosMode, SizeMode,
};
use crate::gradient::{GradientConfig, GradientKind, GradientStop};
use crate::model::{CardScheme, DEFAULT_CARD_WIDTH, EditorLayer, next_layer_id};

/// 预设适用的光效槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetCategory {
    Shine,
    Glare,
    Both,
}

impl PresetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetCategory::Shine => "shine",
            PresetCategory::Glare => "glare",
            PresetCategory::Both => "both",
        }
    }
}

/// 光效预设
#[derive(Debug, Clone, PartialEq)]
pub struct EffectPreset {
    pub id: &'static str,
    /// 显示名称
    pub name: &'static str,
    pub category: PresetCategory,
    pub effect: EditorLayerEffect,
}

// =============================================================================
// 预设定义
// =============================================================================

/// 预设光源基底：指针跟随的分轴位置
fn gradient_source(
    id: i64,
    kind: GradientKind,
    angle: f64,
    stops: Vec<GradientStop>,
) -> EditorGradientSource {
    EditorGradientSource {
        gradient_config: GradientConfig { kind, angle, stops },
        pos_mode: PosMode::Split,
        pos_x: PosAxisConfig::new("50%", "--pointer-x").with_mode(PosAxisMode::Var),
        pos_y: PosAxisConfig::new("50%", "--pointer-y").with_mode(PosAxisMode::Var),
        ..EditorGradientSource::new(id)
    }
}

fn split_size(mut source: EditorGradientSource, w: f64, h: f64) -> EditorGradientSource {
    source.size_mode = SizeMode::Split;
    source.size_w = w;
    source.size_h = h;
    source
}

fn blend(mut source: EditorGradientSource, mode: &str) -> EditorGradientSource {
    source.blend_mode = mode.to_string();
    source
}

/// (颜色, 位置, 不透明度) → 色标，id 从 1 起
fn stops(table: &[(&str, f64, f64)]) -> Vec<GradientStop> {
    table
        .iter()
        .enumerate()
        .map(|(i, (color, position, alpha))| {
            GradientStop::new(i as i64 + 1, *color, *position, *alpha)
        })
        .collect()
}

fn enabled(sources: Vec<EditorGradientSource>, opacity: f64, filter: &str) -> EditorLayerEffect {
    EditorLayerEffect {
        enabled: true,
        sources,
        opacity,
        filter: filter.to_string(),
        ..EditorLayerEffect::default()
    }
}

fn rainbow_holo() -> EffectPreset {
    let mut first = gradient_source(
        1,
        GradientKind::RepeatingLinear,
        45.0,
        stops(&[
            ("#FD4741", 0.0, 100.0),
            ("#FFF397", 14.0, 100.0),
            ("#A8FF5F", 28.0, 100.0),
            ("#83FFF7", 42.0, 100.0),
            ("#4BC6FF", 57.0, 100.0),
            ("#FF49F6", 71.0, 100.0),
            ("#FF3831", 85.0, 100.0),
        ]),
    );
    first.pos_x = PosAxisConfig::new("0%", "--pointer-x");
    first.pos_y = PosAxisConfig::new("50%", "--pointer-y").with_mode(PosAxisMode::Calc);

    let mut second = gradient_source(
        2,
        GradientKind::RepeatingLinear,
        135.0,
        stops(&[
            ("#592E50", 0.0, 50.0),
            ("#8FD4A0", 25.0, 100.0),
            ("#DF60CA", 50.0, 100.0),
            ("#55C9C9", 75.0, 100.0),
            ("#0E152E", 100.0, 50.0),
        ]),
    );
    second.pos_x = second.pos_x.with_mode(PosAxisMode::Calc);
    second.pos_y = second.pos_y.with_mode(PosAxisMode::Calc);

    EffectPreset {
        id: "rainbow-holo",
        name: "Rainbow Holo",
        category: PresetCategory::Shine,
        effect: enabled(
            vec![
                blend(split_size(first, 500.0, 500.0), "soft-light"),
                blend(split_size(second, 1000.0, 1000.0), "normal"),
            ],
            80.0,
            "brightness(calc((var(--glare-opacity) * 0.25) + 0.66)) contrast(2) saturate(0.95)",
        ),
    }
}

fn metallic_sheen() -> EffectPreset {
    let source = gradient_source(
        1,
        GradientKind::Linear,
        135.0,
        stops(&[
            ("#2C2C2C", 0.0, 60.0),
            ("#C0C0C0", 30.0, 90.0),
            ("#FFFFFF", 50.0, 100.0),
            ("#C0C0C0", 70.0, 90.0),
            ("#2C2C2C", 100.0, 60.0),
        ]),
    );
    EffectPreset {
        id: "metallic-sheen",
        name: "Metallic Sheen",
        category: PresetCategory::Shine,
        effect: enabled(
            vec![blend(split_size(source, 300.0, 300.0), "overlay")],
            70.0,
            "contrast(1.3) brightness(1.1)",
        ),
    }
}

fn simple_highlight() -> EffectPreset {
    let source = gradient_source(
        1,
        GradientKind::Linear,
        120.0,
        stops(&[
            ("#FFFFFF", 0.0, 0.0),
            ("#FFFFFF", 45.0, 60.0),
            ("#FFFFFF", 55.0, 60.0),
            ("#FFFFFF", 100.0, 0.0),
        ]),
    );
    EffectPreset {
        id: "simple-highlight",
        name: "Simple Highlight",
        category: PresetCategory::Shine,
        effect: enabled(vec![blend(split_size(source, 200.0, 200.0), "overlay")], 60.0, ""),
    }
}

fn radial_glare() -> EffectPreset {
    let source = gradient_source(
        1,
        GradientKind::Radial,
        0.0,
        stops(&[
            ("#FFFFFF", 10.0, 80.0),
            ("#FFFFFF", 20.0, 65.0),
            ("#000000", 90.0, 50.0),
        ]),
    );
    let mut effect = enabled(vec![source], 100.0, "");
    effect.mix_blend_mode = "overlay".to_string();
    EffectPreset {
        id: "radial-glare",
        name: "Radial Glare",
        category: PresetCategory::Glare,
        effect,
    }
}

fn gold_foil() -> EffectPreset {
    let foil = gradient_source(
        1,
        GradientKind::Linear,
        135.0,
        stops(&[
            ("#B8860B", 0.0, 70.0),
            ("#FFD700", 25.0, 100.0),
            ("#FFA500", 50.0, 90.0),
            ("#FFD700", 75.0, 100.0),
            ("#B8860B", 100.0, 70.0),
        ]),
    );
    let sheen = gradient_source(
        2,
        GradientKind::Radial,
        0.0,
        stops(&[
            ("#FFFFFF", 0.0, 40.0),
            ("#FFD700", 50.0, 20.0),
            ("#000000", 100.0, 0.0),
        ]),
    );
    EffectPreset {
        id: "gold-foil",
        name: "Gold Foil",
        category: PresetCategory::Shine,
        effect: enabled(
            vec![
                blend(split_size(foil, 400.0, 400.0), "color-dodge"),
                blend(sheen, "overlay"),
            ],
            75.0,
            "saturate(1.5) brightness(1.1)",
        ),
    }
}

fn neon_glow() -> EffectPreset {
    let source = gradient_source(
        1,
        GradientKind::Linear,
        90.0,
        stops(&[
            ("#FF00FF", 0.0, 0.0),
            ("#00FFFF", 33.0, 80.0),
            ("#FF00FF", 66.0, 80.0),
            ("#00FFFF", 100.0, 0.0),
        ]),
    );
    EffectPreset {
        id: "neon-glow",
        name: "Neon Glow",
        category: PresetCategory::Shine,
        effect: enabled(
            vec![blend(split_size(source, 300.0, 300.0), "screen")],
            65.0,
            "brightness(1.2) saturate(1.8)",
        ),
    }
}

/// 全部内置预设（按展示顺序）
pub fn all_presets() -> Vec<EffectPreset> {
    vec![
        rainbow_holo(),
        metallic_sheen(),
        simple_highlight(),
        radial_glare(),
        gold_foil(),
        neon_glow(),
    ]
}

/// 按 id 查找预设
pub fn find_preset(id: &str) -> Option<EffectPreset> {
    all_presets().into_iter().find(|p| p.id == id)
}

/// 复制预设光效，光源 id 重新分配为递增序列
pub fn clone_preset(id: &str) -> Option<EditorLayerEffect> {
    let mut effect = find_preset(id)?.effect;
    for source in &mut effect.sources {
        source.id = next_layer_id();
    }
    Some(effect)
}

// =============================================================================
// 系统默认方案
// =============================================================================

/// 系统默认方案 id
pub const SYSTEM_DEFAULT_SCHEME_ID: &str = "__system_default__";

const ASSET_BASE: &str = "https://s3.hi168.com/hi168-26327-7861xjfr/shine";

const RAINBOW_SWEEP: &str = "
      calc(var(--gradient-angle-dynamic) - 20deg),
      rgb(253, 71, 65) calc(7% * 1),
      rgb(255, 243, 151) calc(7% * 2),
      rgba(168, 255, 95, 1) calc(7% * 3),
      rgba(131, 255, 247, 1) calc(7% * 4),
      rgb(75, 198, 255) calc(7% * 5),
      rgb(255, 73, 246) calc(7% * 6),
      rgb(255, 56, 49) calc(7% * 7)
    ";

const PASTEL_SWEEP: &str = "
      calc(var(--gradient-angle-dynamic) - 130deg),
      rgba(89, 46, 80, 0.5) 0%,
      hsl(118, 43%, 76%) 2.5%,
      rgb(223, 96, 202) 5%,
      hsl(180, 57%, 56%) 7.5%,
      rgba(14, 21, 46, 0.5) 10%,
      rgba(14, 21, 46, 0.5) 15%
    ";

fn default_shine() -> EffectConfig {
    EffectConfig {
        layers: vec![
            BackgroundSource::new(BackgroundKind::Image, format!("{ASSET_BASE}/b1.png"))
                .with_size("50% 50%")
                .with_position("center")
                .with_blend_mode("color-burn"),
            BackgroundSource::new(BackgroundKind::RepeatingLinearGradient, RAINBOW_SWEEP)
                .with_size("500% 500%")
                .with_position("0% calc(var(--pointer-y) * 1)")
                .with_blend_mode("soft-light"),
            BackgroundSource::new(BackgroundKind::RepeatingLinearGradient, PASTEL_SWEEP)
                .with_size("1000% 1000%")
                .with_position("calc(var(--pointer-x) * 1) calc(var(--pointer-y) * 1)")
                .with_blend_mode("normal"),
            BackgroundSource::new(BackgroundKind::Image, format!("{ASSET_BASE}/b0.png"))
                .with_size("100% 100%")
                .with_position("center")
                .with_blend_mode("normal"),
        ],
        filter: Some(
            "brightness(calc((var(--glare-opacity) * 0.25) + 0.66)) contrast(2) saturate(0.95)"
                .to_string(),
        ),
        ..Default::default()
    }
}

fn default_glare() -> EffectConfig {
    EffectConfig {
        layers: vec![
            BackgroundSource::new(
                BackgroundKind::RadialGradient,
                "farthest-corner circle at var(--pointer-x) var(--pointer-y), rgba(255,255,255,0.8) 10%, rgba(255,255,255,0.65) 20%, rgba(0,0,0,0.5) 90%",
            )
            .with_size("cover")
            .with_position("center"),
        ],
        mix_blend_mode: Some("overlay".to_string()),
        ..Default::default()
    }
}

fn no_effect() -> EffectConfig {
    EffectConfig {
        layers: Vec::new(),
        filter: Some("none".to_string()),
        ..Default::default()
    }
}

/// 系统内置默认方案
///
/// 没有选择默认方案时用于展示。五个图片图层，光效为渲染配置。
pub fn system_default_scheme() -> CardScheme {
    // (图片序号, 深度, 是否有 shine, 是否有 glare)
    let layout = [
        (0, 120.0, true, false),
        (1, 50.0, true, true),
        (2, 80.0, false, false),
        (3, 80.0, false, false),
        (4, 150.0, true, false),
    ];

    let layers = layout
        .iter()
        .map(|&(index, z_height, shine, glare)| {
            let mut layer = EditorLayer::new(index + 1);
            layer.img = format!("{ASSET_BASE}/{index}.png");
            layer.z_height = z_height;
            let shine = if shine { default_shine() } else { no_effect() };
            let glare = if glare { default_glare() } else { no_effect() };
            layer.shine = LayerEffectValue::Render(shine);
            layer.glare = LayerEffectValue::Render(glare);
            layer
        })
        .collect();

    CardScheme {
        id: SYSTEM_DEFAULT_SCHEME_ID.to_string(),
        name: "System Default".to_string(),
        card_width: DEFAULT_CARD_WIDTH.to_string(),
        layers,
        shared_effects: Vec::new(),
    }
}
