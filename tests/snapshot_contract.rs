use std::fs;

use contentvault::{Config, ItemKind, ItemStore, NewItem, SearchFilter, DEFAULT_SNAPSHOT_FILE};
use serde_json::Value;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> Config {
    Config {
        storage_dir: dir.path().to_path_buf(),
        ..Config::default()
    }
}

#[test]
fn snapshot_on_disk_is_a_json_array_of_items() {
    let dir = TempDir::new().unwrap();
    let mut store = ItemStore::from_config(&config_for(&dir));

    store
        .save_item(NewItem::note("a quick thought").with_tags(["Ideas"]))
        .unwrap();
    store
        .save_item(
            NewItem::link("https://example.com/article")
                .with_title("Article")
                .with_body("read later"),
        )
        .unwrap();
    store
        .save_item(NewItem::link("https://EXAMPLE.com/article/").with_tags(["reading"]))
        .unwrap();

    let raw = fs::read_to_string(dir.path().join(DEFAULT_SNAPSHOT_FILE)).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let note = &entries[0];
    assert_eq!(note["type"], "note");
    assert_eq!(note["body"], "a quick thought");
    assert_eq!(note["tags"], serde_json::json!(["ideas"]));
    assert!(note.get("url").is_none());
    assert!(note["createdAt"].is_string());

    let link = &entries[1];
    assert_eq!(link["type"], "link");
    assert_eq!(link["url"], "https://example.com/article");
    assert_eq!(link["tags"], serde_json::json!(["reading"]));
    assert!(link["updatedAt"].is_string());
}

#[test]
fn writes_leave_no_temporary_files() {
    let dir = TempDir::new().unwrap();
    let mut store = ItemStore::open(dir.path());

    for i in 0..5 {
        store
            .save_item(NewItem::link(format!("https://example.com/{}", i)))
            .unwrap();
    }
    let first = store.get_all_items().pop().unwrap();
    assert!(store.delete_item(&first.id));

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![DEFAULT_SNAPSHOT_FILE.to_string()]);
}

#[test]
fn reopened_store_keeps_deduplicating() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = ItemStore::open(dir.path());
        store
            .save_item(NewItem::link("https://example.com/path").with_tags(["a", "b"]))
            .unwrap();
    }

    let mut store = ItemStore::open(dir.path());
    let result = store
        .save_item(NewItem::link("https://example.com/path/").with_tags(["b", "c"]))
        .unwrap();

    assert!(result.is_duplicate);
    assert_eq!(result.item.tags, vec!["a", "b", "c"]);
    assert_eq!(store.len(), 1);

    let reopened = ItemStore::open(dir.path());
    let items = reopened.search_items(&SearchFilter::new().tags(["c"]));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ItemKind::Link);
}

#[test]
fn separate_locations_do_not_share_state() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();

    let mut first = ItemStore::open(first_dir.path());
    let second = ItemStore::open(second_dir.path());

    first.save_item(NewItem::note("only here")).unwrap();
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(ItemStore::open(second_dir.path()).is_empty());
}
