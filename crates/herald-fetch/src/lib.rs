//! # Herald Fetch
//!
//! Streaming file downloads with progress observation.
//!
//! The response body is copied to disk in fixed-size chunks; after each
//! chunk the caller's observer receives a [`Progress`] snapshot. Rendering
//! (a bar, a spinner, nothing) is entirely the caller's concern.
//!
//! ```rust,ignore
//! use herald_fetch::{fetch, FetchOptions};
//!
//! let report = fetch(
//!     "https://example.test/archive.tar.gz",
//!     "archive.tar.gz",
//!     FetchOptions::default().with_observer(|p| {
//!         eprint!("\r{} / {:?} bytes", p.bytes_downloaded, p.total_bytes);
//!     }),
//! )?;
//! println!("saved {} bytes", report.bytes_downloaded);
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Failures surfaced by [`fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },
    #[error("'{url}' answered with status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("io error on '{path}': {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Snapshot handed to the observer after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes_downloaded: u64,
    /// From the `Content-Length` header; absent on chunked responses.
    pub total_bytes: Option<u64>,
    pub elapsed: Duration,
}

/// Final download accounting returned by [`fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub path: PathBuf,
    pub bytes_downloaded: u64,
    pub elapsed: Duration,
}

/// Tuning knobs for [`fetch`].
pub struct FetchOptions {
    chunk_size: usize,
    timeout: Option<Duration>,
    observer: Option<Box<dyn FnMut(Progress)>>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 8 * 1024,
            timeout: None,
            observer: None,
        }
    }
}

impl FetchOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Overall request timeout. Without one, a stalled remote stalls the
    /// download; there is no other cancellation mechanism.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(Progress) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }
}

/// Download `url` to `path`, streaming in chunks and reporting progress.
pub fn fetch(
    url: &str,
    path: impl AsRef<Path>,
    options: FetchOptions,
) -> Result<FetchReport, FetchError> {
    let FetchOptions {
        chunk_size,
        timeout,
        mut observer,
    } = options;
    let path = path.as_ref();

    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let mut builder = reqwest::blocking::Client::builder().user_agent("herald/0.1.0");
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(|e| FetchError::Request {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let response = client.get(parsed).send().map_err(|e| FetchError::Request {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        return Err(FetchError::UnexpectedStatus {
            url: url.to_owned(),
            status,
        });
    }

    let total_bytes = response.content_length();
    log::debug!("downloading '{url}' to '{}' ({total_bytes:?} bytes)", path.display());

    let io_error = |e: std::io::Error| FetchError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut file = File::create(path).map_err(io_error)?;
    let mut reader = response;
    let mut buffer = vec![0u8; chunk_size];
    let mut bytes_downloaded = 0u64;
    let started = Instant::now();

    loop {
        let read = reader.read(&mut buffer).map_err(io_error)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).map_err(io_error)?;
        bytes_downloaded += read as u64;

        if let Some(observer) = observer.as_mut() {
            observer(Progress {
                bytes_downloaded,
                total_bytes,
                elapsed: started.elapsed(),
            });
        }
    }

    file.flush().map_err(io_error)?;

    Ok(FetchReport {
        path: path.to_path_buf(),
        bytes_downloaded,
        elapsed: started.elapsed(),
    })
}
