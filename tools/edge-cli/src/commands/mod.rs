//! CLI command implementations.

pub mod compile_tags;
pub mod populate;
pub mod tags;

use clap::{ArgGroup, Args};

/// Arguments for the populate-cache command.
#[derive(Args)]
pub struct PopulateCacheArgs {
    /// Build output directory containing `cache/`.
    #[arg(short, long)]
    pub output_dir: String,

    /// Local bucket directory to write objects into.
    #[arg(long)]
    pub cache_dir: String,

    /// Compiled tag manifest (default: `<output-dir>/cache/cache-tags-manifest.cache`).
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Keep objects already present for this bucket prefix.
    #[arg(long)]
    pub no_clean: bool,
}

/// Arguments for the compile-tags command.
#[derive(Args)]
pub struct CompileTagsArgs {
    /// JSON array of `{"tag", "path"}` entries.
    #[arg(short, long)]
    pub meta: String,

    /// Where to write the manifest.
    #[arg(short, long)]
    pub out: String,
}

/// Arguments for the tags command.
#[derive(Args)]
#[command(group(ArgGroup::new("lookup").required(true).args(["path", "tag"])))]
pub struct TagsArgs {
    /// Local bucket directory.
    #[arg(long)]
    pub cache_dir: String,

    /// List the tags of a path.
    #[arg(short, long)]
    pub path: Option<String>,

    /// List the paths of a tag.
    #[arg(short, long)]
    pub tag: Option<String>,
}
