//! Seed a local bucket layout from the build output.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use edge_cache::populate::OUTPUT_CACHE_DIR;
use edge_cache::{discover_cache_assets, populate_cache};
use edge_core::{CacheConfig, TAG_MANIFEST_FILE};
use edge_data::FsObjectStore;

use super::PopulateCacheArgs;
use crate::context::Context;
use crate::output::format_bytes;

/// Run the populate-cache command.
pub async fn run(args: PopulateCacheArgs, ctx: &Context) -> Result<()> {
    let output_dir = ctx.resolve_path(&args.output_dir);
    let bucket_dir = ctx.resolve_path(&args.cache_dir);
    let config = &ctx.config.cache;

    ctx.output.header("Populating cache");

    let assets = discover_cache_assets(&output_dir)
        .with_context(|| format!("Failed to discover cache assets in {}", output_dir.display()))?;
    ctx.output.debug(&format!("Found {} cache assets", assets.len()));

    let manifest = match args.manifest {
        Some(ref path) => Some(ctx.resolve_path(path)),
        None => default_manifest(&output_dir),
    };
    if manifest.is_none() {
        ctx.output.warn("No tag manifest found, tags will start empty");
    }

    if !args.no_clean {
        clean(&bucket_dir, config)?;
    }

    let store = FsObjectStore::new(bucket_dir.clone());
    let pb = ctx.output.progress(assets.len() as u64, "Writing cache assets");
    let report = populate_cache(
        &assets,
        &store,
        config,
        manifest.as_deref(),
        &mut |asset| {
            pb.set_message(asset.key.clone());
            pb.inc(1);
        },
    )
    .await
    .context("Failed to populate cache")?;
    pb.finish_and_clear();

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.success("Cache populated");
    ctx.output.kv("Bucket", &bucket_dir.join(config.cache_dir()).display().to_string());
    ctx.output.kv("Assets", &report.assets_written.to_string());
    ctx.output.kv("Size", &format_bytes(report.bytes_written));
    ctx.output.kv("Tag manifest", if report.manifest_written { "yes" } else { "no" });

    Ok(())
}

fn default_manifest(output_dir: &Path) -> Option<PathBuf> {
    let path = output_dir.join(OUTPUT_CACHE_DIR).join(TAG_MANIFEST_FILE);
    path.is_file().then_some(path)
}

/// Remove objects left over from a previous population of this prefix.
fn clean(bucket_dir: &Path, config: &CacheConfig) -> Result<()> {
    let dir = bucket_dir.join(config.cache_dir());
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to clean {}", dir.display()))?;
    }
    Ok(())
}
