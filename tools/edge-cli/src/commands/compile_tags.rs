//! Compile build-time tag metadata into a tag manifest.

use std::path::Path;

use anyhow::{Context as _, Result};
use edge_cache::{TagItem, TagManifest};
use edge_core::BuildId;

use super::CompileTagsArgs;
use crate::context::Context;

/// Run the compile-tags command.
pub async fn run(args: CompileTagsArgs, ctx: &Context) -> Result<()> {
    let meta_path = ctx.resolve_path(&args.meta);
    let out_path = ctx.resolve_path(&args.out);
    let build_id = &ctx.config.cache.build_id;

    let manifest = compile(&meta_path, build_id)?;

    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&out_path, manifest.to_vec()?)
        .await
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "buildId": build_id,
            "items": manifest.items.len(),
            "out": out_path,
        }));
        return Ok(());
    }

    ctx.output.success("Tag manifest compiled");
    ctx.output.kv("Build", build_id.as_str());
    ctx.output.kv("Associations", &manifest.items.len().to_string());
    ctx.output.kv("Output", &out_path.display().to_string());
    Ok(())
}

fn compile(meta_path: &Path, build_id: &BuildId) -> Result<TagManifest> {
    let content = std::fs::read(meta_path)
        .with_context(|| format!("Failed to read tag metadata: {}", meta_path.display()))?;
    let items: Vec<TagItem> = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse tag metadata: {}", meta_path.display()))?;

    Ok(TagManifest::from_meta(build_id, items))
}
