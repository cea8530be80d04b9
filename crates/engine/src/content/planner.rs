use std::fs;
use std::path::Path;

use crate::AppPaths;

use super::hashing::hash_stage_xml_inputs;
use super::manifest::{
    manifest_path, read_manifest, stage_cache_dir, stages_cache_path, ManifestReadState,
    STAGE_CACHE_FORMAT_VERSION,
};
use super::types::{
    CompileAction, CompilePlan, CompileReason, ContentPlanError, ContentPlanRequest,
};

pub fn build_compile_plan(
    app_paths: &AppPaths,
    request: &ContentPlanRequest,
) -> Result<CompilePlan, ContentPlanError> {
    if !app_paths.stages_dir.is_dir() {
        return Err(ContentPlanError::StagesDirMissing {
            path: app_paths.stages_dir.clone(),
        });
    }
    let input = hash_stage_xml_inputs(&app_paths.stages_dir)?;

    let cache_dir = stage_cache_dir(&app_paths.cache_dir);
    fs::create_dir_all(&cache_dir).map_err(|source| ContentPlanError::CreateCacheLayout {
        path: cache_dir.clone(),
        source,
    })?;

    let cache_path = stages_cache_path(&app_paths.cache_dir);
    let manifest_path = manifest_path(&app_paths.cache_dir);
    let (action, reason) =
        evaluate_cache_validity(&manifest_path, &cache_path, request, &input.hash_hex)?;

    Ok(CompilePlan {
        source_dir: app_paths.stages_dir.clone(),
        xml_file_count: input.xml_file_count,
        input_hash_sha256_hex: input.hash_hex,
        cache_path,
        manifest_path,
        action,
        reason,
    })
}

fn evaluate_cache_validity(
    manifest_path: &Path,
    cache_path: &Path,
    request: &ContentPlanRequest,
    input_hash_sha256_hex: &str,
) -> Result<(CompileAction, CompileReason), ContentPlanError> {
    match read_manifest(manifest_path)? {
        ManifestReadState::Missing => {
            return Ok((CompileAction::Compile, CompileReason::ManifestMissing))
        }
        ManifestReadState::Unreadable => {
            return Ok((CompileAction::Compile, CompileReason::ManifestUnreadable))
        }
        ManifestReadState::Present(value) => {
            if value.cache_format_version != STAGE_CACHE_FORMAT_VERSION {
                return Ok((CompileAction::Compile, CompileReason::FormatMismatch));
            }
            if value.compiler_version != request.compiler_version
                || value.game_version != request.game_version
            {
                return Ok((CompileAction::Compile, CompileReason::VersionMismatch));
            }
            if value.input_hash_sha256_hex != input_hash_sha256_hex {
                return Ok((CompileAction::Compile, CompileReason::InputHashMismatch));
            }
        }
    }

    if !cache_path.is_file() {
        return Ok((CompileAction::Compile, CompileReason::CacheFileMissing));
    }
    Ok((CompileAction::UseCache, CompileReason::CacheValid))
}
