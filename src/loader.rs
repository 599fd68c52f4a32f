//! Locate and read exported configuration documents

use anyhow::{Context, Result};
use reconcile::ConfigurationPayload;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A parsed document and where it came from
#[derive(Debug)]
pub struct LoadedPayload {
    pub source: PathBuf,
    /// Position within a file holding a JSON array
    pub index: Option<usize>,
    pub payload: ConfigurationPayload,
}

/// A document that could not be turned into a payload
#[derive(Debug)]
pub struct LoadFailure {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct Loaded {
    pub payloads: Vec<LoadedPayload>,
    pub failures: Vec<LoadFailure>,
}

impl LoadedPayload {
    /// `file.json` or `file.json[2]`
    pub fn source_label(&self) -> String {
        source_label(&self.source, self.index)
    }
}

fn source_label(path: &Path, index: Option<usize>) -> String {
    match index {
        Some(i) => format!("{}[{}]", path.display(), i),
        None => path.display().to_string(),
    }
}

/// JSON files under `path`, sorted. A file path is returned as-is.
pub fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan {}", path.display()))?;
        let is_json = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read every document under `path`.
///
/// Unreadable files and malformed documents are collected as failures so
/// the rest of the run can proceed.
pub fn load(path: &Path) -> Result<Loaded> {
    let mut loaded = Loaded::default();

    for file in collect_files(path)? {
        let value = match read_json(&file) {
            Ok(value) => value,
            Err(e) => {
                loaded.failures.push(LoadFailure {
                    source: file.display().to_string(),
                    error: format!("{:#}", e),
                });
                continue;
            }
        };

        let documents: Vec<(Option<usize>, Value)> = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Some(i), v))
                .collect(),
            other => vec![(None, other)],
        };

        for (index, document) in documents {
            match ConfigurationPayload::from_value(document) {
                Ok(payload) => loaded.payloads.push(LoadedPayload {
                    source: file.clone(),
                    index,
                    payload,
                }),
                Err(e) => loaded.failures.push(LoadFailure {
                    source: source_label(&file, index),
                    error: e.to_string(),
                }),
            }
        }
    }

    log::debug!(
        "Loaded {} payload(s), {} failure(s) from {}",
        loaded.payloads.len(),
        loaded.failures.len(),
        path.display()
    );
    Ok(loaded)
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROFILE: &str = r##"{"@odata.type":"#microsoft.graph.iosGeneralDeviceConfiguration","id":"A","displayName":"iOS"}"##;

    #[test]
    fn test_collect_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("b/nested/2.json"), PROFILE).unwrap();
        fs::write(dir.path().join("a.JSON"), PROFILE).unwrap();
        fs::write(dir.path().join("b/1.json"), PROFILE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.JSON", "b/1.json", "b/nested/2.json"]);
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("profile.json");
        fs::write(&file, PROFILE).unwrap();

        let loaded = load(&file).unwrap();
        assert_eq!(loaded.payloads.len(), 1);
        assert_eq!(loaded.payloads[0].payload.id(), Some("A"));
        assert!(loaded.failures.is_empty());
    }

    #[test]
    fn test_array_file_contributes_each_element() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tags.json");
        fs::write(
            &file,
            r##"[
                {"@odata.type":"#microsoft.graph.roleScopeTag","displayName":"One","isBuiltIn":false},
                {"displayName":"No type"},
                {"@odata.type":"#microsoft.graph.roleScopeTag","displayName":"Two","isBuiltIn":false}
            ]"##,
        )
        .unwrap();

        let loaded = load(&file).unwrap();
        assert_eq!(loaded.payloads.len(), 2);
        assert_eq!(loaded.payloads[1].index, Some(2));
        assert!(loaded.payloads[1].source_label().ends_with("tags.json[2]"));
        assert_eq!(loaded.failures.len(), 1);
        assert!(loaded.failures[0].source.ends_with("tags.json[1]"));
    }

    #[test]
    fn test_invalid_json_is_a_failure_not_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("ok.json"), PROFILE).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.payloads.len(), 1);
        assert_eq!(loaded.failures.len(), 1);
        assert!(loaded.failures[0].error.contains("Invalid JSON"));
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("nope")).is_err());
    }
}
