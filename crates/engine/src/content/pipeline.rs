use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::AppPaths;

use super::atomic_io::write_text_atomic;
use super::compiler::{compile_stage_database, ContentCompileError};
use super::database::StageDatabase;
use super::manifest::{
    read_manifest, write_manifest_atomic, ManifestReadState, ManifestV1,
    STAGE_CACHE_FORMAT_VERSION,
};
use super::planner::build_compile_plan;
use super::types::{CompileAction, CompilePlan, ContentPlanError, ContentPlanRequest};

#[derive(Debug, Error)]
pub enum ContentPipelineError {
    #[error(transparent)]
    Plan(#[from] ContentPlanError),
    #[error(transparent)]
    Compile(#[from] ContentCompileError),
    #[error("failed to write stage cache: {0}")]
    CacheWrite(String),
}

/// The cache file repeats the manifest header so a cache written by a
/// different build is never trusted on manifest alone.
#[derive(Debug, Serialize, Deserialize)]
struct StageCacheFile {
    meta: ManifestV1,
    database: StageDatabase,
}

pub fn build_or_load_stage_database(
    app_paths: &AppPaths,
    request: &ContentPlanRequest,
) -> Result<StageDatabase, ContentPipelineError> {
    let plan = build_compile_plan(app_paths, request)?;
    info!(
        action = ?plan.action,
        reason = ?plan.reason,
        xml_file_count = plan.xml_file_count,
        input_hash = %plan.input_hash_sha256_hex,
        cache_path = %plan.cache_path.display(),
        manifest_path = %plan.manifest_path.display(),
        "content_compile_plan_decision"
    );

    let database = match plan.action {
        CompileAction::Compile => compile_and_write(&plan, request)?,
        CompileAction::UseCache => match try_load_cached(&plan, request) {
            Ok(database) => {
                info!(
                    cache_path = %plan.cache_path.display(),
                    input_hash = %plan.input_hash_sha256_hex,
                    "content_cache_hit"
                );
                database
            }
            Err(reason) => {
                warn!(reason = %reason, "content_cache_invalid_rebuilding");
                compile_and_write(&plan, request)?
            }
        },
    };

    info!(stage_count = database.len(), "content_pipeline_summary");
    Ok(database)
}

fn compile_and_write(
    plan: &CompilePlan,
    request: &ContentPlanRequest,
) -> Result<StageDatabase, ContentPipelineError> {
    let database = compile_stage_database(&plan.source_dir)?;
    let cache = StageCacheFile {
        meta: expected_manifest(plan, request),
        database,
    };
    let text = serde_json::to_string(&cache)
        .map_err(|error| ContentPipelineError::CacheWrite(format!("encode: {error}")))?;
    write_text_atomic(&plan.cache_path, &text).map_err(|error| {
        ContentPipelineError::CacheWrite(format!("{}: {error}", plan.cache_path.display()))
    })?;
    // Manifest last: a crash in between leaves a stale manifest, which
    // the header check rejects.
    write_manifest_atomic(&plan.manifest_path, &cache.meta)
        .map_err(ContentPipelineError::CacheWrite)?;
    Ok(cache.database)
}

fn try_load_cached(
    plan: &CompilePlan,
    request: &ContentPlanRequest,
) -> Result<StageDatabase, String> {
    let expected = expected_manifest(plan, request);
    let manifest = match read_manifest(&plan.manifest_path) {
        Ok(ManifestReadState::Present(manifest)) => manifest,
        Ok(ManifestReadState::Missing) => return Err("manifest missing".to_string()),
        Ok(ManifestReadState::Unreadable) => return Err("manifest unreadable".to_string()),
        Err(error) => return Err(format!("failed to read manifest: {error}")),
    };
    if manifest != expected {
        return Err("manifest mismatch".to_string());
    }

    let raw = fs::read_to_string(&plan.cache_path)
        .map_err(|error| format!("failed to read cache: {error}"))?;
    let cache = serde_json::from_str::<StageCacheFile>(&raw)
        .map_err(|error| format!("failed to decode cache: {error}"))?;
    if cache.meta != manifest {
        return Err("cache header mismatch vs manifest".to_string());
    }
    if cache.database.is_empty() {
        return Err("cache holds no stages".to_string());
    }
    Ok(cache.database)
}

fn expected_manifest(plan: &CompilePlan, request: &ContentPlanRequest) -> ManifestV1 {
    ManifestV1 {
        cache_format_version: STAGE_CACHE_FORMAT_VERSION,
        compiler_version: request.compiler_version.clone(),
        game_version: request.game_version.clone(),
        input_hash_sha256_hex: plan.input_hash_sha256_hex.clone(),
    }
}
