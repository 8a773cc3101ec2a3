//! Package identity: `metadata.json` (Plasma 6) and legacy `metadata.desktop`

use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::forge::{BASE_REFERENCE_KEY, UNKNOWN_AUTHOR};
use crate::forge::{ini, ForgeError};

const JSON_FILE: &str = "metadata.json";
const DESKTOP_FILE: &str = "metadata.desktop";
const DESKTOP_GROUP: &str = "[Desktop Entry]";

/// Identity written into a forked package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Package id the fork was generated from
    pub base: String,
}

fn io_error(context: String) -> impl FnOnce(std::io::Error) -> ForgeError {
    move |source| ForgeError::Io { context, source }
}

fn read_json(path: &Path) -> Result<Value, ForgeError> {
    let text = fs::read_to_string(path).map_err(io_error(format!("Failed to read {}", path.display())))?;
    serde_json::from_str(&text).map_err(|source| ForgeError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

fn metadata_files(package: &Path) -> (Option<PathBuf>, Option<PathBuf>) {
    let json = package.join(JSON_FILE);
    let desktop = package.join(DESKTOP_FILE);
    (
        json.is_file().then_some(json),
        desktop.is_file().then_some(desktop),
    )
}

/// Rewrite every metadata file present in `package`
pub fn rewrite(package: &Path, identity: &Identity) -> Result<(), ForgeError> {
    let (json, desktop) = metadata_files(package);
    if json.is_none() && desktop.is_none() {
        return Err(ForgeError::MetadataMissing(package.to_path_buf()));
    }
    if let Some(path) = json {
        rewrite_json(&path, identity)?;
    }
    if let Some(path) = desktop {
        rewrite_desktop(&path, identity)?;
    }
    Ok(())
}

fn rewrite_json(path: &Path, identity: &Identity) -> Result<(), ForgeError> {
    let mut root = read_json(path)?;
    let Some(object) = root.as_object_mut() else {
        return Err(ForgeError::MetadataShape(path.to_path_buf()));
    };

    let plugin = object
        .entry("KPlugin")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(plugin) = plugin.as_object_mut() else {
        return Err(ForgeError::MetadataShape(path.to_path_buf()));
    };

    // translations describe the base package, not the fork
    plugin.retain(|key, _| !key.starts_with("Name[") && !key.starts_with("Description["));
    plugin.insert("Id".to_string(), json!(identity.id));
    plugin.insert("Name".to_string(), json!(identity.name));
    plugin.insert("Description".to_string(), json!(identity.description));

    let has_authors = plugin
        .get("Authors")
        .and_then(Value::as_array)
        .is_some_and(|authors| !authors.is_empty());
    if !has_authors {
        plugin.insert("Authors".to_string(), json!([{ "Name": UNKNOWN_AUTHOR }]));
    }

    object.insert(BASE_REFERENCE_KEY.to_string(), json!(identity.base));

    let mut text = serde_json::to_string_pretty(&root).map_err(|source| ForgeError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    fs::write(path, text).map_err(io_error(format!("Failed to write {}", path.display())))?;
    debug!(path = %path.display(), id = %identity.id, "Rewrote package metadata");
    Ok(())
}

fn rewrite_desktop(path: &Path, identity: &Identity) -> Result<(), ForgeError> {
    let mut doc = fs::read_to_string(path).map_err(io_error(format!("Failed to read {}", path.display())))?;

    doc = ini::upsert(&doc, DESKTOP_GROUP, "X-KDE-PluginInfo-Name", &identity.id);
    doc = ini::upsert(&doc, DESKTOP_GROUP, "Name", &identity.name);
    doc = ini::upsert(&doc, DESKTOP_GROUP, "Comment", &identity.description);
    let has_author = ini::get(&doc, DESKTOP_GROUP, "X-KDE-PluginInfo-Author").is_some_and(|a| !a.is_empty());
    if !has_author {
        doc = ini::upsert(&doc, DESKTOP_GROUP, "X-KDE-PluginInfo-Author", UNKNOWN_AUTHOR);
    }
    doc = ini::upsert(&doc, DESKTOP_GROUP, BASE_REFERENCE_KEY, &identity.base);

    fs::write(path, doc).map_err(io_error(format!("Failed to write {}", path.display())))?;
    debug!(path = %path.display(), id = %identity.id, "Rewrote legacy package metadata");
    Ok(())
}

/// Base package recorded in a generated package, if any
pub fn read_base_reference(package: &Path) -> Result<Option<String>, ForgeError> {
    let (json, desktop) = metadata_files(package);
    if let Some(path) = json {
        let root = read_json(&path)?;
        if let Some(base) = root.get(BASE_REFERENCE_KEY).and_then(Value::as_str) {
            return Ok(Some(base.to_string()).filter(|b| !b.is_empty()));
        }
    }
    if let Some(path) = desktop {
        let doc = fs::read_to_string(&path).map_err(io_error(format!("Failed to read {}", path.display())))?;
        return Ok(ini::get(&doc, DESKTOP_GROUP, BASE_REFERENCE_KEY).filter(|b| !b.is_empty()));
    }
    Ok(None)
}

/// Display name of a package, falling back to nothing on any problem
pub fn read_name(package: &Path) -> Option<String> {
    let (json, desktop) = metadata_files(package);
    if let Some(path) = json {
        if let Ok(root) = read_json(&path) {
            if let Some(name) = root.pointer("/KPlugin/Name").and_then(Value::as_str) {
                return Some(name.to_string());
            }
        }
    }
    let doc = fs::read_to_string(desktop?).ok()?;
    ini::get(&doc, DESKTOP_GROUP, "Name")
}
