//! Map-data generation.
//!
//! Walks every adventure and book body, pulls out images that carry map
//! regions, and merges them into one lookup keyed by source then image id.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

/// Index files read by the batch, as `(prop, index file)`.
pub const SOURCES: [(&str, &str); 2] = [("adventure", "adventures.json"), ("book", "books.json")];

/// Default output path under `data_dir`.
pub fn default_out(data_dir: &Path) -> PathBuf {
    data_dir.join("generated").join("gendata-maps.json")
}

/// Map images found in one body, keyed `{source: {image id: image}}`.
///
/// Returns `None` when the body holds no image with map regions.
pub fn image_data(head: &Value, body: &Value) -> Option<Map<String, Value>> {
    let source = head
        .get("source")
        .and_then(Value::as_str)
        .or_else(|| head.get("id").and_then(Value::as_str))?;

    let mut images = Map::new();
    collect_map_images(body, &mut images);
    if images.is_empty() {
        return None;
    }

    let mut out = Map::new();
    out.insert(source.to_string(), Value::Object(images));
    Some(out)
}

fn collect_map_images(node: &Value, images: &mut Map<String, Value>) {
    match node {
        Value::Array(items) => items.iter().for_each(|item| collect_map_images(item, images)),
        Value::Object(obj) => {
            if is_map_image(obj) {
                match image_id(obj) {
                    Some(id) => {
                        images.insert(id, node.clone());
                    }
                    None => tracing::warn!("map image without id or href path, skipped"),
                }
            }
            obj.values().for_each(|value| collect_map_images(value, images));
        }
        _ => {}
    }
}

fn is_map_image(obj: &Map<String, Value>) -> bool {
    obj.get("type").and_then(Value::as_str) == Some("image")
        && obj
            .get("mapRegions")
            .and_then(Value::as_array)
            .is_some_and(|regions| !regions.is_empty())
}

fn image_id(obj: &Map<String, Value>) -> Option<String> {
    obj.get("id")
        .and_then(Value::as_str)
        .or_else(|| obj.get("href")?.get("path")?.as_str())
        .map(str::to_string)
}

/// Merge `from` into `into`, recursing where both sides hold objects.
///
/// Distinct keys at any depth survive; a non-object value in `from`
/// replaces whatever `into` held.
pub fn deep_merge(into: &mut Map<String, Value>, from: Map<String, Value>) {
    for (key, value) in from {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = into.get_mut(&key) {
                    deep_merge(existing, incoming);
                } else {
                    into.insert(key, Value::Object(incoming));
                }
            }
            other => {
                into.insert(key, other);
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Run the transform over every indexed entry under `data_dir`.
pub fn generate(data_dir: &Path) -> Result<Map<String, Value>> {
    let mut out = Map::new();

    for (prop, index) in SOURCES {
        let index_path = data_dir.join(index);
        let index_json = read_json(&index_path)?;
        let Some(heads) = index_json.get(prop).and_then(Value::as_array) else {
            bail!("{} has no `{prop}` array", index_path.display());
        };

        for head in heads {
            let Some(id) = head.get("id").and_then(Value::as_str) else {
                bail!("{} has a `{prop}` entry without an id", index_path.display());
            };
            tracing::info!(prop, id, "generating map data");

            let body_path = data_dir.join(prop).join(format!("{prop}-{}.json", id.to_lowercase()));
            let body = read_json(&body_path)?;
            let Some(data) = body.get("data") else {
                bail!("{} has no `data` member", body_path.display());
            };

            if let Some(images) = image_data(head, data) {
                deep_merge(&mut out, images);
            }
        }
    }

    Ok(out)
}

/// Write the merged map data, creating the parent directory if needed.
pub fn write(out_path: &Path, maps: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string(maps)?;
    fs::write(out_path, json).with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(())
}
