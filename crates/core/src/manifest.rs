//! Runtime revision manifest.
//!
//! The manifest arrives as an ordered list of `[route, revision]` pairs with
//! routes relative to the worker origin. It is resolved once at startup into
//! a map keyed by absolute URL and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use url::Url;

use crate::Error;

/// Absolute URL → revision lookup built from the injected manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeManifest {
    entries: HashMap<String, String>,
}

impl RuntimeManifest {
    /// Build a manifest from `(route, revision)` pairs.
    ///
    /// Each route is resolved against `origin`. Pairs that resolve off-origin
    /// or carry an empty revision are skipped. Later duplicates win.
    pub fn load<I, R, V>(origin: &Url, pairs: I) -> Self
    where
        I: IntoIterator<Item = (R, V)>,
        R: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = HashMap::new();
        for (route, revision) in pairs {
            let (route, revision) = (route.as_ref(), revision.as_ref());
            match resolve_route(origin, route) {
                Some(url) if !revision.is_empty() => {
                    entries.insert(url.to_string(), revision.to_string());
                }
                Some(_) => tracing::warn!(route, "skipping manifest entry with empty revision"),
                None => tracing::warn!(route, "skipping manifest entry that does not resolve on-origin"),
            }
        }
        Self { entries }
    }

    /// Build a manifest from the injected JSON value.
    ///
    /// The value must be an array; members that are not two-string arrays are
    /// skipped individually.
    pub fn from_json(origin: &Url, value: &Value) -> Result<Self, Error> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::Manifest("expected an array of [route, revision] pairs".into()))?;

        let pairs = items.iter().enumerate().filter_map(|(index, item)| match item.as_array().map(Vec::as_slice) {
            Some([Value::String(route), Value::String(revision)]) => Some((route.as_str(), revision.as_str())),
            _ => {
                tracing::warn!(index, "skipping malformed manifest pair");
                None
            }
        });

        Ok(Self::load(origin, pairs))
    }

    /// Read and load a manifest JSON file.
    pub fn from_path(origin: &Url, path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        let manifest = Self::from_json(origin, &value)?;
        tracing::info!(path = %path.display(), entries = manifest.len(), "loaded runtime manifest");
        Ok(manifest)
    }

    /// Current revision for an absolute URL.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolve a route relative to the origin root.
///
/// Returns `None` when the result lands on another origin (absolute or
/// protocol-relative routes).
fn resolve_route(origin: &Url, route: &str) -> Option<Url> {
    let relative = route.trim().trim_start_matches('/');
    if route.trim().starts_with("//") {
        return None;
    }
    let mut url = origin.join(relative).ok()?;
    url.set_fragment(None);
    (url.origin() == origin.origin()).then_some(url)
}
