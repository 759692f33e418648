//! # Holo Core
//!
//! 全息卡片方案引擎的核心库。
//!
//! ## 架构概述
//!
//! `holo-core` 是纯逻辑核心，除文件存储后端外不做任何 IO，也不负责渲染。
//! 它维护一份可自愈的方案文档，并向渲染端只交付解析完毕的渲染图层：
//!
//! ```text
//! Storage ──text──► validation::repair ──► SchemeStore ──► render_layers ──► 渲染端
//!                                            │    ▲
//!                                   操作 ────┘    └── EditHistory（撤销 / 重做）
//!                                            │
//!                                            └──► codec（导出 json / ts / vue，导入）
//! ```
//!
//! ## 核心类型
//!
//! - [`EditorPersistence`]：根文档（方案列表 + 默认 / 激活方案）
//! - [`CardScheme`]：一个完整的卡片设计
//! - [`LayerEffectValue`]：层光效（可编辑 / 渲染配置 / 共享引用）
//! - [`SchemeStore`]：文档的唯一写入者
//! - [`RenderLayer`]：交给渲染端的图层记录
//!
//! ## 使用示例
//!
//! ```ignore
//! use holo_core::{EffectSlot, ExportFormat, FileStorage, SchemeStore};
//!
//! let mut store = SchemeStore::load(FileStorage::new("data"));
//! let id = store.add_scheme(Some("Foil"));
//! store.apply_preset(&id, 0, EffectSlot::Shine, "rainbow-holo");
//! println!("{}", store.export(ExportFormat::Source));
//! ```
//!
//! ## 模块结构
//!
//! - [`gradient`]：渐变描述 → CSS 文本
//! - [`effect`]：光效的两种表示与层光效联合类型
//! - [`model`]：文档数据模型
//! - [`convert`]：可编辑 → 渲染配置，引用解析
//! - [`validation`]：校验与修复
//! - [`presets`]：内置光效预设与系统默认方案
//! - [`history`]：撤销 / 重做
//! - [`storage`]：键值存储抽象
//! - [`store`]：方案存储
//! - [`codec`]：导入 / 导出
//! - [`error`]：错误类型

pub mod codec;
pub mod convert;
pub mod effect;
pub mod error;
pub mod gradient;
pub mod history;
pub mod model;
pub mod presets;
pub mod storage;
pub mod store;
pub mod validation;

// 重导出核心类型
pub use codec::{ExportFormat, export, import_scheme};
pub use convert::{render_layers, resolve_editable, resolve_reference, to_render_config};
pub use effect::{
    BackgroundKind, BackgroundSource, EditorGradientSource, EditorLayerEffect, EffectBinding,
    EffectConfig, LayerEffectValue, Opacity, PosAxisConfig, PosAxisMode, PosMode, ResolvedEffect,
    SizeMode, SourceType,
};
pub use error::{HoloError, HoloResult, ImportError, StorageError};
pub use gradient::{GradientConfig, GradientKind, GradientStop, compile_function, compile_params};
pub use history::{DEFAULT_HISTORY_LIMIT, EditHistory};
pub use model::{
    CardScheme, EditorLayer, EditorPersistence, EffectSlot, MaskMode, RenderLayer, SharedEffect,
};
pub use presets::{EffectPreset, PresetCategory, all_presets, clone_preset, system_default_scheme};
pub use storage::{FileStorage, MemoryStorage, STORAGE_KEY, Storage};
pub use store::{SchemeStore, StoreOptions};
pub use validation::{Repaired, repair, repair_scheme, repair_text};
