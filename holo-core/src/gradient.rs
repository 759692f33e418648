//! # Gradient 模块
//!
//! 结构化渐变描述 → CSS 渐变文本。
//!
//! 输出两种形式：
//!
//! ```text
//! compile_params   → "45deg, rgba(255, 255, 255, 0.80) 50%"
//! compile_function → "linear-gradient(45deg, rgba(255, 255, 255, 0.80) 50%)"
//! ```
//!
//! 无法解析的颜色不会报错，而是原样作为颜色输出。

use serde::{Deserialize, Serialize};

/// 渐变类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientKind {
    #[serde(rename = "linear-gradient")]
    Linear,
    #[serde(rename = "radial-gradient")]
    Radial,
    #[serde(rename = "conic-gradient")]
    Conic,
    #[serde(rename = "repeating-linear-gradient")]
    RepeatingLinear,
    #[serde(rename = "repeating-radial-gradient")]
    RepeatingRadial,
    #[serde(rename = "repeating-conic-gradient")]
    RepeatingConic,
}

impl GradientKind {
    /// 全部渐变类型
    pub const ALL: [GradientKind; 6] = [
        GradientKind::Linear,
        GradientKind::Radial,
        GradientKind::Conic,
        GradientKind::RepeatingLinear,
        GradientKind::RepeatingRadial,
        GradientKind::RepeatingConic,
    ];

    /// CSS 函数名
    pub fn as_str(&self) -> &'static str {
        match self {
            GradientKind::Linear => "linear-gradient",
            GradientKind::Radial => "radial-gradient",
            GradientKind::Conic => "conic-gradient",
            GradientKind::RepeatingLinear => "repeating-linear-gradient",
            GradientKind::RepeatingRadial => "repeating-radial-gradient",
            GradientKind::RepeatingConic => "repeating-conic-gradient",
        }
    }

    /// 从 CSS 函数名解析
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// 是否为径向渐变（角度被忽略）
    pub fn is_radial(&self) -> bool {
        matches!(self, GradientKind::Radial | GradientKind::RepeatingRadial)
    }

    /// 是否为锥形渐变（角度作为起始旋转）
    pub fn is_conic(&self) -> bool {
        matches!(self, GradientKind::Conic | GradientKind::RepeatingConic)
    }
}

impl Default for GradientKind {
    fn default() -> Self {
        Self::Linear
    }
}

/// 渐变色标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// 调用方分配的标识，允许重复
    pub id: i64,
    /// 十六进制颜色（`#RGB` / `#RRGGBB`），其他格式原样透传
    pub color: String,
    /// 位置（0-100）
    pub position: f64,
    /// 不透明度（0-100）
    pub alpha: f64,
}

impl GradientStop {
    pub fn new(id: i64, color: impl Into<String>, position: f64, alpha: f64) -> Self {
        Self {
            id,
            color: color.into(),
            position,
            alpha,
        }
    }
}

/// 渐变配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientConfig {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    /// 角度（度）
    pub angle: f64,
    /// 色标（存储顺序不要求有序）
    pub stops: Vec<GradientStop>,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            angle: 45.0,
            stops: vec![
                GradientStop::new(1, "#FFFFFF", 0.0, 0.0),
                GradientStop::new(2, "#FFFFFF", 50.0, 80.0),
                GradientStop::new(3, "#FFFFFF", 100.0, 0.0),
            ],
        }
    }
}

/// 渐变输出（类型 + 参数串）
#[derive(Debug, Clone, PartialEq)]
pub struct GradientOutput {
    pub kind: GradientKind,
    pub value: String,
}

/// 解析十六进制颜色
///
/// 支持 `#RGB` 和 `#RRGGBB`，`#` 可省略，大小写不敏感。
pub fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let mut channels = hex.chars().map(|c| {
                let v = c.to_digit(16).unwrap_or(0) as u8;
                v * 16 + v
            });
            Some((channels.next()?, channels.next()?, channels.next()?))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

fn stop_color(stop: &GradientStop) -> String {
    match hex_to_rgb(&stop.color) {
        // 百分比先取整：两位小数的进位恰好落在 0.5% 上时向远离零的方向进位
        Some((r, g, b)) => {
            let alpha = stop.alpha.round() / 100.0;
            format!("rgba({}, {}, {}, {:.2})", r, g, b, alpha)
        }
        None => stop.color.clone(),
    }
}

fn stop_list(config: &GradientConfig) -> String {
    let mut sorted: Vec<&GradientStop> = config.stops.iter().collect();
    // sort_by 是稳定排序，位置相同的色标保持输入顺序
    sorted.sort_by(|a, b| a.position.total_cmp(&b.position));

    sorted
        .iter()
        .map(|s| format!("{} {}%", stop_color(s), s.position))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 生成参数串（不含函数名）
pub fn compile_params(config: &GradientConfig) -> String {
    let stops = stop_list(config);

    if config.kind.is_radial() {
        format!("circle, {}", stops)
    } else if config.kind.is_conic() {
        format!("from {}deg, {}", config.angle, stops)
    } else {
        format!("{}deg, {}", config.angle, stops)
    }
}

/// 生成完整的 CSS 函数调用
pub fn compile_function(config: &GradientConfig) -> String {
    format!("{}({})", config.kind.as_str(), compile_params(config))
}

/// 生成类型 + 参数串
pub fn compile_output(config: &GradientConfig) -> GradientOutput {
    GradientOutput {
        kind: config.kind,
        value: compile_params(config),
    }
}
