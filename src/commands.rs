use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use bytes::Bytes;
use epub_share::config::{self, Config};
use epub_share::segment::segment_id;
use epub_share::epub_reader::EpubData;
use epub_share::trx::{self, HttpTrxFetcher};
use epub_share::{metadata, parse_epub_file, FileInfo, ParsedEpubBook, Segment};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MANIFEST_FILE: &str = "fileinfo.json";

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Parse {
            input,
            json,
            cover_out,
            segments_dir,
        } => parse(&input, json, cover_out.as_deref(), segments_dir.as_deref()),
        Commands::Info { input } => info(&input),
        Commands::Verify {
            dir,
            manifest,
            output,
        } => verify(&dir, manifest, output.as_deref()),
        Commands::Wait {
            group,
            trx,
            node,
            max_attempts,
            timeout,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(node) = node {
                config.node.base_url = node;
            }
            if let Some(max_attempts) = max_attempts {
                config.poll.max_attempts = max_attempts;
            }
            if let Some(timeout) = timeout {
                config.poll.timeout_secs = timeout;
            }
            config::validate_config(&config)?;
            wait(&config, &group, &trx).await
        }
    }
}

fn open_book(input: &Path) -> Result<ParsedEpubBook> {
    parse_epub_file(input).with_context(|| format!("Failed to parse EPUB: {}", input.display()))
}

fn parse(
    input: &Path,
    json: bool,
    cover_out: Option<&Path>,
    segments_dir: Option<&Path>,
) -> Result<()> {
    let book = open_book(input)?;

    if let Some(path) = cover_out {
        match &book.cover {
            Some(cover) => {
                write_file(path, cover)?;
                tracing::info!("Wrote cover to {}", path.display());
            }
            None => tracing::warn!("{} has no cover image", input.display()),
        }
    }

    if let Some(dir) = segments_dir {
        write_segments(dir, &book)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&book.file_info)?);
    } else {
        let info = &book.file_info;
        println!("{} ({})", info.title, info.name);
        println!("  media type: {}", info.media_type);
        println!("  sha256:     {}", info.sha256);
        for segment in &book.segments {
            println!("  {:<8} {:>7} bytes  {}", segment.id, segment.len(), segment.sha256);
        }
    }

    eprintln!(
        "Parsed {} into {} segments{}",
        input.display(),
        book.segments.len(),
        if book.cover.is_some() { " with cover" } else { "" }
    );

    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, data).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Write `seg-N.bin` for every segment plus the manifest.
pub fn write_segments(dir: &Path, book: &ParsedEpubBook) -> Result<()> {
    fs::create_dir_all(dir)?;

    for segment in &book.segments {
        write_file(&dir.join(format!("{}.bin", segment.id)), &segment.buf)?;
    }

    let manifest = serde_json::to_vec_pretty(&book.file_info)?;
    write_file(&dir.join(MANIFEST_FILE), &manifest)?;

    tracing::info!(
        "Wrote {} segments to {}",
        book.segments.len(),
        dir.display()
    );
    Ok(())
}

/// Load the segments a manifest lists from `dir`.
///
/// Ids must run `seg-1..seg-N`; they are checked before being used as file names.
pub fn load_segments(dir: &Path, info: &FileInfo) -> Result<Vec<Segment>> {
    info.segments
        .iter()
        .enumerate()
        .map(|(i, listed)| {
            let expected = segment_id(i);
            if listed.id != expected {
                anyhow::bail!(
                    "Manifest lists segment {:?} where {} was expected",
                    listed.id,
                    expected
                );
            }

            let path = dir.join(format!("{}.bin", listed.id));
            let data = fs::read(&path)
                .with_context(|| format!("Failed to read segment: {}", path.display()))?;
            Ok(Segment::new(listed.id.clone(), Bytes::from(data)))
        })
        .collect()
}

fn verify(dir: &Path, manifest: Option<PathBuf>, output: Option<&Path>) -> Result<()> {
    let manifest = manifest.unwrap_or_else(|| dir.join(MANIFEST_FILE));
    let content = fs::read(&manifest)
        .with_context(|| format!("Failed to read manifest: {}", manifest.display()))?;
    let info: FileInfo = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse manifest: {}", manifest.display()))?;

    let segments = load_segments(dir, &info)?;
    let file = info
        .verify(&segments)
        .with_context(|| format!("Verification failed for {}", info.name))?;

    if let Some(path) = output {
        write_file(path, &file)?;
    }

    eprintln!(
        "Verified {} ({} segments, {} bytes)",
        info.name,
        segments.len(),
        file.len()
    );
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let book = open_book(input)?;
    let description = EpubData::open(input)?.describe();
    print!("{}", metadata::format_metadata(&description, &book));
    Ok(())
}

async fn wait(config: &Config, group: &str, trx_id: &str) -> Result<()> {
    let fetcher = HttpTrxFetcher::new(
        &config.node.base_url,
        Some(Duration::from_secs(config.node.request_timeout_secs)),
    );
    let poll = config.poll.to_poll_config();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        "Waiting for transaction {} in group {} on {}",
        trx_id,
        group,
        config.node.base_url
    );

    let record = trx::wait_for_trx(&fetcher, group, trx_id, &poll, &cancel)
        .await
        .with_context(|| format!("Transaction {} not confirmed", trx_id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
