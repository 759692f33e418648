//! # Store 模块
//!
//! 方案文档的唯一写入者。
//!
//! ## 设计原则
//!
//! - 文档只通过 [`SchemeStore`] 的操作修改，外部只读
//! - 每个修改操作结束后：记录历史 → 整体写回存储
//! - 会破坏不变量的操作（删除最后一个方案 / 图层）静默拒绝，返回 `false`
//! - 存储写入失败只记录警告，不影响内存中的文档
//!
//! ## 生命周期
//!
//! ```text
//! load(storage) ──► 读取 → 校验修复 →（修复过则立即写回）
//!      │
//!      ▼
//! 操作 ... ──► record_if_changed → save
//!      │
//!      ▼
//! reset_all ──► 替换为全新文档（可撤销）
//! ```

use std::borrow::Cow;

use tracing::{debug, info, warn};

use crate::codec::{self, ExportFormat};
use crate::convert::{render_layers, resolve_editable, resolve_reference};
use crate::effect::{EditorLayerEffect, EffectBinding, LayerEffectValue, ResolvedEffect};
use crate::error::{HoloResult, ImportError, StorageError};
use crate::history::{DEFAULT_HISTORY_LIMIT, EditHistory};
use crate::model::{
    CardScheme, DEFAULT_SCHEME_NAME, EditorLayer, EditorPersistence, EffectSlot, RenderLayer,
    SharedEffect, generate_id, next_layer_id,
};
use crate::presets::{clone_preset, system_default_scheme};
use crate::storage::{STORAGE_KEY, Storage};
use crate::validation::repair_text;

/// 复制方案时追加的名称后缀
pub const COPY_SUFFIX: &str = " (Copy)";

/// 存储选项
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// 存储键
    pub key: String,
    /// 撤销上限
    pub history_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: STORAGE_KEY.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// 方案存储
pub struct SchemeStore<S: Storage> {
    doc: EditorPersistence,
    storage: S,
    key: String,
    history: EditHistory,
}

impl<S: Storage> SchemeStore<S> {
    /// 使用默认选项加载
    pub fn load(storage: S) -> Self {
        Self::load_with(storage, StoreOptions::default())
    }

    /// 从存储加载文档
    ///
    /// 存储中没有文档时创建全新文档；文档损坏时修复并立即写回。
    pub fn load_with(storage: S, options: StoreOptions) -> Self {
        let (doc, write_back) = match storage.read(&options.key) {
            Ok(Some(text)) => {
                let result = repair_text(&text);
                if result.repaired {
                    warn!(key = %options.key, "存储中的文档已损坏，已自动修复");
                }
                (result.data, result.repaired)
            }
            Ok(None) => {
                info!(key = %options.key, "存储中没有文档，创建新文档");
                (EditorPersistence::fresh(), true)
            }
            Err(e) => {
                // 读失败时不覆盖原有内容
                warn!(key = %options.key, error = %e, "读取存储失败，使用新文档");
                (EditorPersistence::fresh(), false)
            }
        };

        let history = EditHistory::new(&doc).with_limit(options.history_limit);
        let mut store = Self {
            doc,
            storage,
            key: options.key,
            history,
        };

        if write_back {
            store.persist_or_warn();
        }

        info!(
            schemes = store.doc.schemes.len(),
            active = %store.doc.active_scheme_id,
            "方案文档已加载"
        );
        store
    }

    /// 整体写回存储
    pub fn save(&mut self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.doc)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.write(&self.key, &json)
    }

    fn persist_or_warn(&mut self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "保存方案文档失败");
        }
    }

    /// 操作结束：有变化则记录历史并保存
    fn commit(&mut self, action: &'static str) {
        if self.history.record_if_changed(&self.doc) {
            debug!(action, undo = self.history.undo_len(), "记录编辑");
            self.persist_or_warn();
        }
    }

    // =========================================================================
    // 查询
    // =========================================================================

    pub fn document(&self) -> &EditorPersistence {
        &self.doc
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn schemes(&self) -> &[CardScheme] {
        &self.doc.schemes
    }

    pub fn scheme(&self, id: &str) -> Option<&CardScheme> {
        self.doc.scheme(id)
    }

    pub fn active_scheme_id(&self) -> &str {
        &self.doc.active_scheme_id
    }

    pub fn active_scheme(&self) -> Option<&CardScheme> {
        self.doc.active_scheme()
    }

    pub fn default_scheme_id(&self) -> Option<&str> {
        self.doc.default_scheme_id.as_deref()
    }

    /// 展示用的默认方案
    ///
    /// 未设置或指向不存在的方案时回退到系统内置方案。
    pub fn default_scheme(&self) -> Cow<'_, CardScheme> {
        match self.doc.default_scheme_id.as_deref().and_then(|id| self.doc.scheme(id)) {
            Some(scheme) => Cow::Borrowed(scheme),
            None => Cow::Owned(system_default_scheme()),
        }
    }

    /// 是否允许删除方案
    pub fn can_remove_scheme(&self) -> bool {
        self.doc.schemes.len() > 1
    }

    /// 是否允许删除图层
    pub fn can_remove_layer(&self, scheme_id: &str) -> bool {
        self.doc.scheme(scheme_id).is_some_and(|s| s.layers.len() > 1)
    }

    /// 展开共享引用
    pub fn resolve_effect(&self, value: &LayerEffectValue, scheme: &CardScheme) -> ResolvedEffect {
        resolve_reference(value, scheme)
    }

    /// 展开共享引用并保证可编辑
    pub fn resolve_editable_effect(
        &self,
        value: &LayerEffectValue,
        scheme: &CardScheme,
    ) -> EditorLayerEffect {
        resolve_editable(value, scheme)
    }

    /// 图层某个槽位当前的可编辑光效
    pub fn editable_effect(
        &self,
        scheme_id: &str,
        index: usize,
        slot: EffectSlot,
    ) -> Option<EditorLayerEffect> {
        let scheme = self.doc.scheme(scheme_id)?;
        let layer = scheme.layers.get(index)?;
        Some(resolve_editable(layer.effect(slot), scheme))
    }

    /// 图层某个槽位的绑定方式
    pub fn effect_binding(
        &self,
        scheme_id: &str,
        index: usize,
        slot: EffectSlot,
    ) -> Option<EffectBinding> {
        let layer = self.doc.scheme(scheme_id)?.layers.get(index)?;
        Some(if layer.effect(slot).is_shared() {
            EffectBinding::Shared
        } else {
            EffectBinding::Inline
        })
    }

    /// 方案的渲染图层
    pub fn render_layers(&self, scheme_id: &str) -> Option<Vec<RenderLayer>> {
        self.doc.scheme(scheme_id).map(render_layers)
    }

    /// 导出当前激活方案
    pub fn export(&self, format: ExportFormat) -> String {
        match self.active_scheme() {
            Some(scheme) => codec::export(
                &render_layers(scheme),
                Some(scheme.card_width.as_str()),
                format,
            ),
            None => codec::export(&[], None, format),
        }
    }

    /// 导出指定方案
    pub fn export_scheme(&self, scheme_id: &str, format: ExportFormat) -> Option<String> {
        let scheme = self.doc.scheme(scheme_id)?;
        Some(codec::export(
            &render_layers(scheme),
            Some(scheme.card_width.as_str()),
            format,
        ))
    }

    // =========================================================================
    // 方案操作
    // =========================================================================

    /// 新建方案并激活，返回新 id
    pub fn add_scheme(&mut self, name: Option<&str>) -> String {
        let scheme = CardScheme::new(name.unwrap_or(DEFAULT_SCHEME_NAME));
        let id = scheme.id.clone();
        self.doc.schemes.push(scheme);
        self.doc.active_scheme_id = id.clone();
        self.commit("add_scheme");
        id
    }

    /// 复制方案并激活副本
    pub fn duplicate_scheme(&mut self, id: &str) -> Option<String> {
        let mut clone = self.doc.scheme(id)?.clone();
        clone.id = generate_id();
        clone.name = format!("{}{}", clone.name, COPY_SUFFIX);
        let new_id = clone.id.clone();
        self.doc.schemes.push(clone);
        self.doc.active_scheme_id = new_id.clone();
        self.commit("duplicate_scheme");
        Some(new_id)
    }

    /// 删除方案
    ///
    /// 只剩一个方案时拒绝。被删除的方案若为默认方案则清除默认；
    /// 若为激活方案则激活第一个方案。
    pub fn remove_scheme(&mut self, id: &str) -> bool {
        if !self.can_remove_scheme() || !self.doc.contains(id) {
            return false;
        }

        self.doc.schemes.retain(|s| s.id != id);
        if self.doc.default_scheme_id.as_deref() == Some(id) {
            self.doc.default_scheme_id = None;
        }
        if self.doc.active_scheme_id == id {
            self.doc.active_scheme_id = self.doc.schemes[0].id.clone();
        }
        self.commit("remove_scheme");
        true
    }

    /// 重命名方案（名称去除首尾空白后不能为空）
    pub fn rename_scheme(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(scheme) = self.doc.scheme_mut(id) else {
            return false;
        };
        scheme.name = name.to_string();
        self.commit("rename_scheme");
        true
    }

    /// 重置方案内容，保留 id 和名称
    pub fn reset_scheme(&mut self, id: &str) -> bool {
        let Some(scheme) = self.doc.scheme_mut(id) else {
            return false;
        };
        *scheme = CardScheme::with_id(scheme.id.clone(), scheme.name.clone());
        self.commit("reset_scheme");
        true
    }

    /// 替换为全新文档
    pub fn reset_all(&mut self) {
        self.doc = EditorPersistence::fresh();
        info!("方案文档已重置");
        self.commit("reset_all");
    }

    // =========================================================================
    // 选择
    // =========================================================================

    /// 激活方案（未知 id 忽略）
    pub fn set_active_scheme(&mut self, id: &str) -> bool {
        if !self.doc.contains(id) {
            return false;
        }
        self.doc.active_scheme_id = id.to_string();
        self.commit("set_active_scheme");
        true
    }

    /// 设置或清除默认方案（未知 id 忽略）
    pub fn set_default_scheme(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id
            && !self.doc.contains(id)
        {
            return false;
        }
        self.doc.default_scheme_id = id.map(str::to_string);
        self.commit("set_default_scheme");
        true
    }

    /// 切换默认方案：已是默认则清除，否则设为默认
    pub fn toggle_default_scheme(&mut self, id: &str) -> bool {
        if self.doc.default_scheme_id.as_deref() == Some(id) {
            self.set_default_scheme(None)
        } else {
            self.set_default_scheme(Some(id))
        }
    }

    // =========================================================================
    // 共享光效
    // =========================================================================

    /// 新建共享光效，返回 id
    pub fn add_shared_effect(&mut self, scheme_id: &str, name: &str) -> Option<String> {
        let scheme = self.doc.scheme_mut(scheme_id)?;
        let effect = SharedEffect::new(name);
        let id = effect.id.clone();
        scheme.shared_effects.push(effect);
        self.commit("add_shared_effect");
        Some(id)
    }

    /// 删除共享光效
    ///
    /// 引用它的图层槽位回退为内联默认光效，而不是保留悬空引用。
    pub fn remove_shared_effect(&mut self, scheme_id: &str, effect_id: &str) -> bool {
        let Some(scheme) = self.doc.scheme_mut(scheme_id) else {
            return false;
        };
        let before = scheme.shared_effects.len();
        scheme.shared_effects.retain(|e| e.id != effect_id);
        let removed = scheme.shared_effects.len() != before;

        for layer in &mut scheme.layers {
            for slot in [EffectSlot::Shine, EffectSlot::Glare] {
                let value = layer.effect_mut(slot);
                if value.shared_id() == Some(effect_id) {
                    *value = LayerEffectValue::default();
                }
            }
        }

        self.commit("remove_shared_effect");
        removed
    }

    /// 重命名共享光效（名称去除首尾空白后不能为空）
    pub fn rename_shared_effect(&mut self, scheme_id: &str, effect_id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(effect) = self
            .doc
            .scheme_mut(scheme_id)
            .and_then(|s| s.shared_effect_mut(effect_id))
        else {
            return false;
        };
        effect.name = name.to_string();
        self.commit("rename_shared_effect");
        true
    }

    // =========================================================================
    // 图层
    // =========================================================================

    fn layer_mut(&mut self, scheme_id: &str, index: usize) -> Option<&mut EditorLayer> {
        self.doc.scheme_mut(scheme_id)?.layers.get_mut(index)
    }

    /// 追加默认图层，返回新图层 id
    pub fn add_layer(&mut self, scheme_id: &str) -> Option<i64> {
        let scheme = self.doc.scheme_mut(scheme_id)?;
        let layer = EditorLayer::with_timestamp_id();
        let id = layer.id;
        scheme.layers.push(layer);
        self.commit("add_layer");
        Some(id)
    }

    /// 删除图层（只剩一层或下标越界时拒绝）
    pub fn remove_layer(&mut self, scheme_id: &str, index: usize) -> bool {
        let Some(scheme) = self.doc.scheme_mut(scheme_id) else {
            return false;
        };
        if scheme.layers.len() <= 1 || index >= scheme.layers.len() {
            return false;
        }
        scheme.layers.remove(index);
        self.commit("remove_layer");
        true
    }

    /// 复制图层到其后方，返回新图层 id
    pub fn duplicate_layer(&mut self, scheme_id: &str, index: usize) -> Option<i64> {
        let scheme = self.doc.scheme_mut(scheme_id)?;
        let mut clone = scheme.layers.get(index)?.clone();
        clone.id = next_layer_id();
        let id = clone.id;
        scheme.layers.insert(index + 1, clone);
        self.commit("duplicate_layer");
        Some(id)
    }

    /// 切换图层预览可见性，返回新的可见性
    pub fn toggle_layer_visibility(&mut self, scheme_id: &str, index: usize) -> Option<bool> {
        let layer = self.layer_mut(scheme_id, index)?;
        layer.visible = !layer.visible;
        let visible = layer.visible;
        self.commit("toggle_layer_visibility");
        Some(visible)
    }

    /// 设置卡片宽度（像素）
    pub fn set_card_width(&mut self, scheme_id: &str, px: u32) -> bool {
        let Some(scheme) = self.doc.scheme_mut(scheme_id) else {
            return false;
        };
        scheme.card_width = format!("{}px", px);
        self.commit("set_card_width");
        true
    }

    // =========================================================================
    // 光效绑定
    // =========================================================================

    /// 将槽位绑定到共享光效（共享光效必须存在）
    pub fn set_layer_effect_shared(
        &mut self,
        scheme_id: &str,
        index: usize,
        slot: EffectSlot,
        effect_id: &str,
    ) -> bool {
        let Some(scheme) = self.doc.scheme_mut(scheme_id) else {
            return false;
        };
        if scheme.shared_effect(effect_id).is_none() {
            return false;
        }
        let Some(layer) = scheme.layers.get_mut(index) else {
            return false;
        };
        *layer.effect_mut(slot) = LayerEffectValue::Shared(effect_id.to_string());
        self.commit("set_layer_effect_shared");
        true
    }

    /// 将共享引用改为内联：深拷贝当前解析出的可编辑光效
    ///
    /// 已是内联时不做任何修改。
    pub fn set_layer_effect_inline(
        &mut self,
        scheme_id: &str,
        index: usize,
        slot: EffectSlot,
    ) -> bool {
        let Some(scheme) = self.doc.scheme(scheme_id) else {
            return false;
        };
        let Some(layer) = scheme.layers.get(index) else {
            return false;
        };
        let value = layer.effect(slot);
        if !value.is_shared() {
            return true;
        }
        let resolved = resolve_editable(value, scheme);

        if let Some(layer) = self.layer_mut(scheme_id, index) {
            *layer.effect_mut(slot) = LayerEffectValue::Editable(resolved);
        }
        self.commit("set_layer_effect_inline");
        true
    }

    /// 将预设写入槽位（内联）
    pub fn apply_preset(
        &mut self,
        scheme_id: &str,
        index: usize,
        slot: EffectSlot,
        preset_id: &str,
    ) -> bool {
        let Some(effect) = clone_preset(preset_id) else {
            return false;
        };
        let Some(layer) = self.layer_mut(scheme_id, index) else {
            return false;
        };
        *layer.effect_mut(slot) = LayerEffectValue::Editable(effect);
        self.commit("apply_preset");
        true
    }

    /// 直接修改文档
    ///
    /// 闭包结束后恢复根级不变量，并作为一次编辑记录。
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut EditorPersistence) -> R) -> R {
        let result = f(&mut self.doc);
        if self.doc.enforce_invariants() {
            debug!("编辑后修正了根级不变量");
        }
        self.commit("edit");
        result
    }

    // =========================================================================
    // 导入
    // =========================================================================

    /// 导入方案并激活，返回新方案 id
    ///
    /// 失败时文档保持不变。
    pub fn import_scheme(&mut self, text: &str) -> Result<String, ImportError> {
        let scheme = codec::import_scheme(text)?;
        let id = scheme.id.clone();
        info!(id = %id, name = %scheme.name, layers = scheme.layers.len(), "导入方案");
        self.doc.schemes.push(scheme);
        self.doc.active_scheme_id = id.clone();
        self.commit("import_scheme");
        Ok(id)
    }

    /// 导入并确认写入存储
    ///
    /// 与 [`Self::import_scheme`] 不同，写入失败时返回错误而不只是记录警告；
    /// 此时内存中的文档已包含导入的方案。
    pub fn import_and_save(&mut self, text: &str) -> HoloResult<String> {
        let id = self.import_scheme(text)?;
        self.save()?;
        Ok(id)
    }

    // =========================================================================
    // 历史
    // =========================================================================

    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.doc) {
            return false;
        }
        self.persist_or_warn();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.doc) {
            return false;
        }
        self.persist_or_warn();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }
}
