use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::atomic_io::write_text_atomic;
use super::types::ContentPlanError;

pub(crate) const STAGE_CACHE_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct ManifestV1 {
    pub cache_format_version: u16,
    pub compiler_version: String,
    pub game_version: String,
    pub input_hash_sha256_hex: String,
}

#[derive(Debug, Clone)]
pub(crate) enum ManifestReadState {
    Missing,
    Unreadable,
    Present(ManifestV1),
}

pub(crate) fn read_manifest(path: &Path) -> Result<ManifestReadState, ContentPlanError> {
    if !path.exists() {
        return Ok(ManifestReadState::Missing);
    }

    let raw = fs::read_to_string(path).map_err(|source| ContentPlanError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = match serde_json::from_str::<ManifestV1>(&raw) {
        Ok(value) => value,
        Err(_) => return Ok(ManifestReadState::Unreadable),
    };
    Ok(ManifestReadState::Present(parsed))
}

pub(crate) fn stage_cache_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("stages")
}

pub(crate) fn stages_cache_path(cache_dir: &Path) -> PathBuf {
    stage_cache_dir(cache_dir).join("stages.json")
}

pub(crate) fn manifest_path(cache_dir: &Path) -> PathBuf {
    stage_cache_dir(cache_dir).join("manifest.json")
}

pub(crate) fn write_manifest_atomic(path: &Path, manifest: &ManifestV1) -> Result<(), String> {
    let text = serde_json::to_string_pretty(manifest)
        .map_err(|error| format!("failed to encode manifest json: {error}"))?;
    write_text_atomic(path, &text)
        .map_err(|error| format!("failed to write {}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn manifest_states_cover_missing_garbage_and_valid() {
        let temp = TempDir::new().expect("temp");
        let path = manifest_path(temp.path());
        assert!(matches!(
            read_manifest(&path).expect("read"),
            ManifestReadState::Missing
        ));

        fs::create_dir_all(stage_cache_dir(temp.path())).expect("mkdir");
        fs::write(&path, "{not json").expect("garbage");
        assert!(matches!(
            read_manifest(&path).expect("read"),
            ManifestReadState::Unreadable
        ));

        let manifest = ManifestV1 {
            cache_format_version: STAGE_CACHE_FORMAT_VERSION,
            compiler_version: "1".to_string(),
            game_version: "2".to_string(),
            input_hash_sha256_hex: "ab".to_string(),
        };
        write_manifest_atomic(&path, &manifest).expect("write");
        let ManifestReadState::Present(loaded) = read_manifest(&path).expect("read") else {
            panic!("expected manifest");
        };
        assert_eq!(loaded, manifest);
    }
}
