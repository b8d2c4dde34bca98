//! On-disk workspace shared by the command tests

use pagewright_workspace::{LoadedConfig, WorkspaceConfig, CONFIG_FILE_NAME};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

pub fn workspace() -> (TempDir, LoadedConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");

    write(&data.join("library.json"), json!({
        "blocks": {
            "hero": {
                "id": "hero",
                "name": "Hero banner",
                "settings": { "title": "t:library.sections.hero.title" },
                "widgets": [{
                    "id": "featured",
                    "type": "product-list",
                    "dataSourceTemplate": { "type": "products" }
                }]
            }
        },
        "translations": { "library": { "sections": { "hero": { "title": "Welcome" } } } }
    }));
    write(&data.join("acme/templates/index.json"), json!({
        "metadata": { "version": 1 },
        "sections": [{
            "id": "intro",
            "type": "text",
            "settings": { "heading": "t:home.heading", "subtitle": "t:home.missing" },
            "widgets": [{ "id": "list", "type": "product-list", "dataSourceKey": "gone" }]
        }]
    }));
    write(&data.join("translations/dawn/common/en.json"), json!({ "common": { "title": "Shop" } }));
    write(
        &data.join("translations/dawn/home/en.json"),
        json!({ "home": { "heading": "t:common.title" } }),
    );

    let config = WorkspaceConfig {
        theme_id: "dawn".into(),
        template_id: "home".into(),
        merchant_name: "acme".into(),
        ..Default::default()
    };
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    (dir, LoadedConfig { path, config })
}

pub fn read(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn write(path: &std::path::Path, value: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, value.to_string()).unwrap();
}
