//! Inspect tag associations in a local bucket.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use edge_cache::{CacheContext, TagCache};
use edge_data::{FsObjectStore, MemoryEdgeCache};

use super::TagsArgs;
use crate::context::Context;

/// Run the tags command.
pub async fn run(args: TagsArgs, ctx: &Context) -> Result<()> {
    let tags = open(ctx, &args.cache_dir);

    let (label, subject, found) = match (&args.path, &args.tag) {
        (Some(path), _) => (
            "tags",
            path,
            tags.get_by_path(path)
                .await
                .with_context(|| format!("Failed to read tags for {}", path))?,
        ),
        (None, Some(tag)) => (
            "paths",
            tag,
            tags.get_by_tag(tag)
                .await
                .with_context(|| format!("Failed to read paths for {}", tag))?,
        ),
        (None, None) => bail!("Either --path or --tag is required"),
    };

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "subject": subject,
            "kind": label,
            "results": found,
        }));
        return Ok(());
    }

    ctx.output.header(subject);
    if found.is_empty() {
        ctx.output.info(&format!("No {} found", label));
    }
    for item in &found {
        ctx.output.list_item(item);
    }
    Ok(())
}

/// Tag cache over a local bucket; the edge tier is unused for tags.
fn open(ctx: &Context, cache_dir: &str) -> TagCache {
    let store = FsObjectStore::new(ctx.resolve_path(cache_dir));
    let cache_ctx = CacheContext::new(
        Arc::new(store),
        Arc::new(MemoryEdgeCache::new()),
        ctx.config.cache.clone(),
    );
    TagCache::new(&cache_ctx)
}

#[cfg(test)]
mod tests {
    use edge_cache::TagWrite;
    use edge_core::CacheConfig;

    use super::*;
    use crate::config::CliConfig;

    #[tokio::test]
    async fn test_tags_reads_populated_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            cache: CacheConfig::new("b1").with_bucket_prefix("site"),
            ..CliConfig::default()
        };
        let ctx = Context::for_tests(dir.path(), config);

        let tags = open(&ctx, "bucket");
        tags.write_tags(&[TagWrite::new("posts", "/blog")]).await.unwrap();

        let reopened = open(&ctx, "bucket");
        assert_eq!(reopened.get_by_tag("posts").await.unwrap(), vec!["/blog"]);
        assert!(dir
            .path()
            .join("bucket/site/data-cache/_next_cache/cache-tags-manifest.cache")
            .is_file());

        run(
            TagsArgs {
                cache_dir: "bucket".to_string(),
                path: Some("/blog".to_string()),
                tag: None,
            },
            &ctx,
        )
        .await
        .unwrap();
    }
}
