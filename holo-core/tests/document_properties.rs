//! # 文档性质集成测试
//!
//! 通过公开 API 验证修复、解析、历史与导入导出的整体性质。
//! 所有测试使用内存存储或临时目录，不依赖外部文件。

use holo_core::{
    CardScheme, EditorLayerEffect, EffectSlot, ExportFormat, FileStorage, ImportError,
    LayerEffectValue, MaskMode, MemoryStorage, ResolvedEffect, STORAGE_KEY, SchemeStore,
    export, import_scheme, render_layers, repair, resolve_editable, resolve_reference,
};
use serde_json::json;

fn memory_store() -> SchemeStore<MemoryStorage> {
    SchemeStore::load(MemoryStorage::new())
}

/// 根级不变量
fn assert_invariants(store: &SchemeStore<MemoryStorage>) {
    let doc = store.document();
    assert!(!doc.schemes.is_empty());
    assert!(doc.contains(&doc.active_scheme_id));
    if let Some(default_id) = &doc.default_scheme_id {
        assert!(doc.contains(default_id));
    }
    let mut ids: Vec<&str> = doc.schemes.iter().map(|s| s.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), doc.schemes.len());
}

/// 修复的幂等性与完整性
#[test]
fn test_repair_idempotent_and_total() {
    let inputs = vec![
        json!(null),
        json!(0),
        json!("string"),
        json!([{ "schemes": [] }]),
        json!({ "schemes": [null, { "layers": "x" }, { "layers": [[], { "glare": 1 }] }] }),
        json!({
            "schemes": [{
                "id": 1, "name": [], "cardWidth": {},
                "sharedEffects": [{ "id": "", "effect": { "sources": [{ "posX": [] }] } }],
                "layers": [{ "shine": { "layers": [{ "type": "image" }], "opacity": true } }]
            }],
            "activeSchemeId": 5,
            "defaultSchemeId": false
        }),
    ];

    for raw in inputs {
        let first = repair(&raw);
        let value = serde_json::to_value(&first.data).unwrap();
        let second = repair(&value);
        assert!(!second.repaired, "修复后仍不稳定: {raw}");
        assert_eq!(second.data, first.data);
    }
}

/// 任意操作序列后不变量成立
#[test]
fn test_invariants_after_operations() {
    let mut store = memory_store();
    let second = store.add_scheme(Some("Second"));
    assert_invariants(&store);

    store.set_default_scheme(Some(&second));
    store.duplicate_scheme(&second);
    assert_invariants(&store);

    store.remove_scheme(&second);
    assert_invariants(&store);
    assert_eq!(store.default_scheme_id(), None);

    let ids: Vec<String> = store.schemes().iter().map(|s| s.id.clone()).collect();
    for id in &ids {
        store.remove_scheme(id);
        assert_invariants(&store);
    }
    assert_eq!(store.schemes().len(), 1);

    store.reset_all();
    assert_invariants(&store);
    store.undo();
    assert_invariants(&store);
}

/// 悬空引用解析为默认光效
#[test]
fn test_dangling_reference_resolves_to_default() {
    let mut scheme = CardScheme::new("card");
    scheme.card_width = "300px".to_string();
    scheme.layers[0].shine = LayerEffectValue::Shared("abc".to_string());

    let editable = resolve_editable(&scheme.layers[0].shine, &scheme);
    assert_eq!(editable, EditorLayerEffect::default());
    assert!(!editable.enabled);
    assert!(editable.sources.is_empty());
    assert_eq!(editable.opacity, 80.0);

    for id in ["", "abc", "__system_default__"] {
        let resolved = resolve_reference(&LayerEffectValue::Shared(id.to_string()), &scheme);
        assert_eq!(resolved, ResolvedEffect::Editable(EditorLayerEffect::default()));
    }
}

/// 导入传输 JSON 的具体场景
#[test]
fn test_import_transfer_scenario() {
    let text = r#"{"layers":[{"img":"x.png","zHeight":10,"mask":"full"}]}"#;
    let scheme = import_scheme(text).unwrap();
    assert_eq!(scheme.name, "Imported");
    assert_eq!(scheme.card_width, "300px");
    assert_eq!(scheme.layers.len(), 1);
    assert_eq!(scheme.layers[0].mask_mode, MaskMode::Full);
    assert_eq!(scheme.layers[0].mask_url, "");
    assert!(scheme.layers[0].visible);
}

/// 导出传输 JSON 再导入，渲染结果一致
#[test]
fn test_transfer_json_roundtrip() {
    let mut store = memory_store();
    let id = store.active_scheme_id().to_string();
    store.add_layer(&id);
    store.apply_preset(&id, 0, EffectSlot::Shine, "rainbow-holo");
    store.apply_preset(&id, 1, EffectSlot::Glare, "radial-glare");
    store.set_card_width(&id, 360);

    let original = store.render_layers(&id).unwrap();
    let text = store.export(ExportFormat::Json);
    let imported_id = store.import_scheme(&text).unwrap();

    assert_ne!(imported_id, id);
    let imported = store.render_layers(&imported_id).unwrap();
    assert_eq!(imported, original);
    assert_eq!(store.scheme(&imported_id).unwrap().card_width, "360px");
}

/// 系统默认方案（渲染配置光效）同样可以往返
#[test]
fn test_system_default_roundtrip() {
    let scheme = holo_core::system_default_scheme();
    let layers = render_layers(&scheme);
    let text = export(&layers, Some(scheme.card_width.as_str()), ExportFormat::Json);
    let imported = import_scheme(&text).unwrap();
    assert_eq!(render_layers(&imported), layers);
}

/// 历史上限：60 次编辑后只保留 50 条
#[test]
fn test_history_bound() {
    let mut store = memory_store();
    let id = store.active_scheme_id().to_string();
    for i in 0..60 {
        assert!(store.rename_scheme(&id, &format!("edit {i}")));
    }
    assert_eq!(store.history().undo_len(), 50);

    let mut undone = 0;
    while store.undo() {
        undone += 1;
    }
    assert_eq!(undone, 50);
    assert_eq!(store.scheme(&id).unwrap().name, "edit 9");
}

/// 撤销恢复最后一次编辑前的状态，重做恢复编辑后的状态
#[test]
fn test_undo_redo_symmetry() {
    let mut store = memory_store();
    let id = store.active_scheme_id().to_string();
    store.add_layer(&id);
    store.add_shared_effect(&id, "Foil");

    let before_last = store.document().clone();
    store.toggle_layer_visibility(&id, 1);
    let after_last = store.document().clone();

    assert!(store.undo());
    assert_eq!(store.document(), &before_last);
    assert!(store.redo());
    assert_eq!(store.document(), &after_last);
}

/// 只有一个方案时删除为空操作
#[test]
fn test_remove_only_scheme_is_noop() {
    let mut store = memory_store();
    let id = store.schemes()[0].id.clone();
    assert!(!store.remove_scheme(&id));
    assert_eq!(store.schemes().len(), 1);
    assert_eq!(store.schemes()[0].id, id);
}

/// 导入错误码
#[test]
fn test_import_error_codes() {
    let cases = [
        ("not json", "invalid_json"),
        ("[1,2]", "invalid_structure"),
        (r#"{"name":"x","layers":"no"}"#, "invalid_structure"),
    ];
    for (text, code) in cases {
        let err: ImportError = import_scheme(text).unwrap_err();
        assert_eq!(err.code(), code, "{text}");
    }
}

/// 文件存储：损坏文档被修复并写回，重新加载后保持一致
#[test]
fn test_file_storage_self_heals() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join(format!("{STORAGE_KEY}.json"));
    std::fs::write(&path, r#"{"schemes":[{"name":"Kept","layers":[{"img":5}]}]}"#).unwrap();

    let store = SchemeStore::load(FileStorage::new(temp.path()));
    assert_eq!(store.schemes()[0].name, "Kept");
    assert_eq!(store.schemes()[0].layers[0].img, "");
    let healed = store.document().clone();
    drop(store);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!repair(&serde_json::from_str(&text).unwrap()).repaired);

    let reloaded = SchemeStore::load(FileStorage::new(temp.path()));
    assert_eq!(reloaded.document(), &healed);
}

/// 文件存储：未写入过时创建目录与文件
#[test]
fn test_file_storage_first_run() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("data");
    let mut store = SchemeStore::load(FileStorage::new(&dir));
    assert!(dir.join(format!("{STORAGE_KEY}.json")).exists());

    let id = store.add_scheme(Some("Persisted"));
    let reloaded = SchemeStore::load(FileStorage::new(&dir));
    assert_eq!(reloaded.active_scheme_id(), id);
    assert_eq!(reloaded.active_scheme().unwrap().name, "Persisted");
}
