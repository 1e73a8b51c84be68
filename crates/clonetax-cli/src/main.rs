//! clonetax - clone taxonomy data between taxonomies.
//!
//! Copies every term in a source taxonomy into an empty target taxonomy,
//! along with term meta and post relationships, then prints a one-line
//! summary of what was cloned.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clonetax_core::{CloneRequest, ProgressSink, SqliteStore, TaxonomyCloner};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "clonetax")]
#[command(about = "Clone taxonomy data (terms, term meta and post relationships)")]
struct Args {
    /// Source taxonomy to copy data from
    source_taxonomy: String,

    /// Target taxonomy to copy data into (must contain no terms)
    target_taxonomy: String,

    /// Path to the content database
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Post type to copy term relationships for
    #[arg(long, default_value = "post")]
    post_type: String,

    /// Comma-separated term meta keys that should not be copied
    #[arg(long, value_delimiter = ',', value_name = "KEY,KEY,...")]
    skip_meta_keys: Vec<String>,

    /// Print the final statistics as JSON instead of the summary line
    #[arg(long)]
    json: bool,

    /// Enable debug logging (per-term and per-value trace)
    #[arg(short, long)]
    debug: bool,
}

/// Terminal progress bar, one tick per cloned term.
#[derive(Default)]
struct TermProgressBar {
    bar: Option<ProgressBar>,
}

impl ProgressSink for TermProgressBar {
    fn begin(&mut self, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("Cloning terms [{bar:40}] {pos}/{len}")
                .expect("valid progress template")
                .progress_chars("=> "),
        );
        self.bar = Some(bar);
    }

    fn tick(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let store = SqliteStore::open(&args.db)?;

    let request = CloneRequest::new(&args.source_taxonomy, &args.target_taxonomy)
        .with_post_type(&args.post_type)
        .with_skip_meta_keys(&args.skip_meta_keys);

    let mut progress = TermProgressBar::default();
    let stats = TaxonomyCloner::new(&store).run(&request, &mut progress)?;

    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("{}", stats.summary());
    }
    Ok(())
}
