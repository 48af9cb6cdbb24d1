// src/pool/task.rs
// =============================================================================
// One download: an item bound to the output directory.
//
// The body is streamed chunk by chunk into a private part file, then renamed
// onto <output_dir>/<title>.mp3. The rename replaces whatever is there, so
// two items with the same title leave exactly one complete file behind
// (whichever rename ran last) instead of interleaved bytes.
// =============================================================================

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Method, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::fetch::{Fetcher, OnError};
use crate::page::ItemDescriptor;

const EXTENSION: &str = "mp3";

/// What a successful task left on disk.
#[derive(Debug, Clone)]
pub struct Stored {
    pub path: PathBuf,
    pub bytes: u64,
    pub status: u16,
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub index: usize,
    pub item: ItemDescriptor,
    output_dir: PathBuf,
}

impl DownloadTask {
    pub fn new(index: usize, item: ItemDescriptor, output_dir: PathBuf) -> Self {
        Self {
            index,
            item,
            output_dir,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.item.title)
    }

    pub fn target_path(&self) -> PathBuf {
        self.output_dir.join(self.file_name())
    }

    // Unique per task even when titles collide
    fn part_path(&self) -> PathBuf {
        self.output_dir
            .join(format!(".{}.{}.part", self.file_name(), self.index))
    }

    /// Single attempt: fetch, stream to disk, move into place.
    pub async fn run(&self, fetcher: &Fetcher) -> Result<Stored, DownloadError> {
        let url = &self.item.source_url;
        let response = fetcher.fetch(Method::GET, url, OnError::Return).await?;
        let status = response.status().as_u16();

        let part = self.part_path();
        let bytes = match write_body(response, &part, url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&part).await;
                return Err(err);
            }
        };

        let target = self.target_path();
        if let Err(source) = fs::rename(&part, &target).await {
            let _ = fs::remove_file(&part).await;
            return Err(DownloadError::Io {
                path: target,
                source,
            });
        }

        Ok(Stored {
            path: target,
            bytes,
            status,
        })
    }
}

/// `<title>.mp3`, with path separators and NUL replaced so the file always
/// lands directly inside the output directory.
pub fn file_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", stem, EXTENSION)
}

async fn write_body(response: Response, part: &Path, url: &str) -> Result<u64, DownloadError> {
    let io_error = |source: std::io::Error| DownloadError::Io {
        path: part.to_path_buf(),
        source,
    };

    let mut file = File::create(part).await.map_err(io_error)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Body {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_error)?;
    Ok(written)
}
