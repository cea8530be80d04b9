use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::types::ContentPlanError;

#[derive(Debug, Clone)]
pub(crate) struct StageInputHash {
    pub xml_file_count: usize,
    pub hash_hex: String,
}

#[derive(Debug, Clone)]
pub(crate) struct XmlSource {
    pub normalized_rel: String,
    pub path: PathBuf,
}

/// Hashes every `.xml` file under `stages_dir`: sorted normalized relative
/// path, a NUL separator, then the file bytes.
pub(crate) fn hash_stage_xml_inputs(stages_dir: &Path) -> Result<StageInputHash, ContentPlanError> {
    let xml_files = collect_xml_files(stages_dir)?;
    let mut hasher = Sha256::new();
    for source in &xml_files {
        let bytes = fs::read(&source.path).map_err(|error| ContentPlanError::ReadFile {
            path: source.path.clone(),
            source: error,
        })?;
        hasher.update(source.normalized_rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
    }

    Ok(StageInputHash {
        xml_file_count: xml_files.len(),
        hash_hex: to_hex_lower(&hasher.finalize()),
    })
}

pub(crate) fn collect_xml_files(root: &Path) -> Result<Vec<XmlSource>, ContentPlanError> {
    let mut files = Vec::<XmlSource>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|a, b| a.normalized_rel.cmp(&b.normalized_rel));
    Ok(files)
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<XmlSource>,
) -> Result<(), ContentPlanError> {
    let entries = fs::read_dir(current).map_err(|source| ContentPlanError::ReadDir {
        path: current.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ContentPlanError::ReadDirEntry {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
            continue;
        }
        if !is_xml_file(&path) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(&path);
        files.push(XmlSource {
            normalized_rel: normalize_rel_path(rel),
            path: path.clone(),
        });
    }
    Ok(())
}

fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn hash_ignores_non_xml_and_changes_on_edit_or_add() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path();
        fs::create_dir_all(dir.join("extra")).expect("mkdir");
        fs::write(dir.join("extra").join("stages.xml"), "<Stages/>").expect("write stages");
        fs::write(dir.join("notes.txt"), "ignore me").expect("write txt");

        let first = hash_stage_xml_inputs(dir).expect("hash");
        assert_eq!(first.xml_file_count, 1);
        assert_eq!(first.hash_hex.len(), 64);

        fs::write(dir.join("notes.txt"), "still ignored").expect("edit txt");
        let unchanged = hash_stage_xml_inputs(dir).expect("hash");
        assert_eq!(first.hash_hex, unchanged.hash_hex);

        fs::write(
            dir.join("extra").join("stages.xml"),
            "<Stages><Stage no=\"1\"/></Stages>",
        )
        .expect("edit");
        let second = hash_stage_xml_inputs(dir).expect("hash");
        assert_ne!(first.hash_hex, second.hash_hex);

        fs::write(dir.join("bonus.XML"), "<Stages/>").expect("add xml");
        let third = hash_stage_xml_inputs(dir).expect("hash");
        assert_eq!(third.xml_file_count, 2);
        assert_ne!(second.hash_hex, third.hash_hex);
    }

    #[test]
    fn files_are_sorted_by_normalized_relative_path() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path();
        fs::create_dir_all(dir.join("b")).expect("mkdir");
        fs::write(dir.join("b").join("a.xml"), "<Stages/>").expect("write");
        fs::write(dir.join("a.xml"), "<Stages/>").expect("write");

        let files = collect_xml_files(dir).expect("collect");
        let names = files
            .iter()
            .map(|file| file.normalized_rel.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.xml", "b/a.xml"]);
    }
}
