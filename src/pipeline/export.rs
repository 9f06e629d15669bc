use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{MediaKind, PostId};

use super::client::MediaFetcher;
use super::error::ExportError;

/// One selected post, with its media URLs already resolved
#[derive(Debug, Clone)]
pub struct ExportPost {
    pub post_id: PostId,
    pub author_name: String,
    pub media_type: MediaKind,
    pub media_url: String,
    pub live_photo_video_url: Option<String>,
}

/// A finished archive plus what made it in
#[derive(Debug)]
pub struct ExportOutcome {
    pub file_name: String,
    pub data: Vec<u8>,
    pub packed: usize,
    pub skipped: usize,
}

/// Packs the selected posts into one store-only ZIP (the media is already
/// compressed). Entries are named `NNN_Author` with a zero-padded per-post
/// index; a live photo's companion shares its post's index with a `_LIVE`
/// suffix. A failed fetch skips that file and moves on; only a failure to
/// assemble the archive itself aborts.
pub async fn build_archive(
    fetcher: &dyn MediaFetcher,
    posts: &[ExportPost],
    archive_name: &str,
) -> Result<ExportOutcome, ExportError> {
    let folder = sanitize_component(archive_name, "gallery");
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .add_directory(format!("{}/", folder), options)
        .map_err(|e| ExportError::Archive(e.to_string()))?;

    let mut packed = 0usize;
    let mut skipped = 0usize;

    for (index, post) in posts.iter().enumerate() {
        // Index advances per post, so a primary and its companion always agree
        let number = index + 1;
        let author = sanitize_author(&post.author_name);

        match fetcher.fetch(&post.media_url).await {
            Ok(data) => {
                let extension = match post.media_type {
                    MediaKind::Image => "jpg",
                    MediaKind::Video => "mp4",
                };
                let name = format!("{}/{:03}_{}.{}", folder, number, author, extension);
                write_entry(&mut writer, &name, &data, options)?;
                packed += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping media for post {}: {}", post.post_id, e);
                skipped += 1;
            }
        }

        if let Some(url) = &post.live_photo_video_url {
            match fetcher.fetch(url).await {
                Ok(data) => {
                    let name = format!("{}/{:03}_{}_LIVE.mov", folder, number, author);
                    write_entry(&mut writer, &name, &data, options)?;
                    packed += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping companion for post {}: {}", post.post_id, e);
                    skipped += 1;
                }
            }
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| ExportError::Archive(e.to_string()))?;

    Ok(ExportOutcome {
        file_name: format!("{}.zip", folder),
        data: cursor.into_inner(),
        packed,
        skipped,
    })
}

fn write_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<(), ExportError> {
    writer
        .start_file(name, options)
        .map_err(|e| ExportError::Archive(e.to_string()))?;
    writer
        .write_all(data)
        .map_err(|e| ExportError::Archive(e.to_string()))?;
    Ok(())
}

/// Archive-safe name: whitespace becomes `_`, everything outside
/// `[A-Za-z0-9._-]` is dropped.
fn sanitize_component(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

fn sanitize_author(name: &str) -> String {
    sanitize_component(name, "Guest")
}
