use crate::config::Settings;
use crate::types::{SceneError, SceneResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Byte stream of an HTTP response
///
/// Dropping the stream releases the underlying connection.
pub trait ResponseStream: Read {
    /// Length announced by the server (`Content-Length`), if any
    fn declared_length(&self) -> Option<u64>;
}

impl ResponseStream for reqwest::blocking::Response {
    fn declared_length(&self) -> Option<u64> {
        self.content_length()
    }
}

/// Options for `download_stream`
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub chunk_size: usize,
    /// Show a console progress bar
    pub progress: bool,
    /// Bytes already on disk; when non-zero the file is appended to
    pub offset: u64,
    /// Expected final size; falls back to the declared length when unset or zero
    pub total_size: Option<u64>,
}

impl DownloadOptions {
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    /// Options for resuming a partial file of `offset` bytes
    pub fn resume(offset: u64, total_size: u64) -> Self {
        Self {
            offset,
            total_size: Some(total_size),
            ..Self::default()
        }
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            progress: false,
            offset: 0,
            total_size: None,
        }
    }
}

fn progress_bar(file_path: &Path, options: &DownloadOptions) -> ProgressBar {
    if !options.progress {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
    {
        bar.set_style(style);
    }
    bar.set_message(
        file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    bar
}

/// Read up to `buf.len()` bytes, stopping early only at end of stream
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn copy_chunks<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    bar: &ProgressBar,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = read_chunk(reader, &mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        // Advances by the nominal chunk size, not the bytes read
        bar.inc(chunk_size as u64);
    }
    writer.flush()
}

/// Write a response stream to `file_path` and verify the final size
///
/// The parent directory is created when missing. With a non-zero offset the
/// file is appended to, otherwise it is truncated. If the size on disk does not
/// match the expected total the file is removed and `SceneError::Download` is
/// returned. A stream that fails midway goes through the same size check
/// before its I/O error is returned.
pub fn download_stream<R: ResponseStream>(
    file_path: &Path,
    response: R,
    options: &DownloadOptions,
) -> SceneResult<()> {
    let bar = progress_bar(file_path, options);
    let result = download_stream_with_bar(file_path, response, options, &bar);
    bar.finish_and_clear();
    result
}

/// `download_stream` reporting to a caller-owned progress bar
///
/// The bar length is set to the expected total and its position to the offset.
/// It advances by `chunk_size` per chunk read and is left unfinished.
pub fn download_stream_with_bar<R: ResponseStream>(
    file_path: &Path,
    mut response: R,
    options: &DownloadOptions,
    bar: &ProgressBar,
) -> SceneResult<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let total_size = options
        .total_size
        .filter(|&size| size != 0)
        .or_else(|| response.declared_length())
        .unwrap_or(0);

    let chunk_size = options.chunk_size.max(1);
    bar.set_length(total_size);
    bar.set_position(options.offset);

    log::debug!(
        "Downloading {} ({} bytes expected, offset {})",
        file_path.display(),
        total_size,
        options.offset
    );

    let transfer = {
        let mut stream = if options.offset > 0 {
            OpenOptions::new().create(true).append(true).open(file_path)?
        } else {
            fs::File::create(file_path)?
        };
        copy_chunks(&mut response, &mut stream, chunk_size, bar)
    };
    drop(response);

    let file_size = fs::metadata(file_path)?.len();

    if file_size != total_size {
        log::warn!(
            "Removing corrupt download {}: expected {} bytes, got {}",
            file_path.display(),
            total_size,
            file_size
        );
        fs::remove_file(file_path)?;
        transfer?;
        return Err(SceneError::Download {
            expected: total_size,
            actual: file_size,
        });
    }
    transfer?;

    log::info!("Downloaded {} ({} bytes)", file_path.display(), file_size);
    Ok(())
}

/// Complete length from a `Content-Range` value such as `bytes 50-99/100`
fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes")?.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Blocking HTTP downloader writing into the storage layout
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::blocking::Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> SceneResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SceneError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Client with the timeout from `settings`
    pub fn from_settings(settings: &Settings) -> SceneResult<Self> {
        Self::new(Duration::from_secs(settings.timeout_secs))
    }

    /// Use an already configured client (authentication, proxies, ...)
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    /// GET `url` into `file_path`, requesting only the missing range when resuming
    ///
    /// Failures are not retried; call again with the current file size as offset.
    /// A resumed request must be answered with `206 Partial Content`. Unless
    /// `total_size` is given, the final size comes from `Content-Range`, then
    /// from the offset plus `Content-Length`. The partial file is left untouched
    /// when neither is available or the server ignores the range.
    pub fn fetch(&self, url: &str, file_path: &Path, options: &DownloadOptions) -> SceneResult<()> {
        log::info!("Fetching {} -> {}", url, file_path.display());

        let mut request = self.client.get(url);
        if options.offset > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", options.offset));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SceneError::Http(format!(
                "HTTP request for {} failed with status: {}",
                url, status
            )));
        }

        if options.offset == 0 {
            return download_stream(file_path, response, options);
        }

        if status != reqwest::StatusCode::PARTIAL_CONTENT {
            return Err(SceneError::Http(format!(
                "Range request for {} answered with status {}, cannot resume at byte {}",
                url, status, options.offset
            )));
        }

        let total_size = options
            .total_size
            .filter(|&size| size != 0)
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_RANGE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(content_range_total)
            })
            .or_else(|| response.content_length().map(|len| options.offset + len))
            .ok_or_else(|| {
                SceneError::Http(format!("Unknown total size of {}, cannot resume", url))
            })?;
        log::debug!("Resuming {} at byte {} of {}", url, options.offset, total_size);

        let options = DownloadOptions {
            total_size: Some(total_size),
            ..options.clone()
        };
        download_stream(file_path, response, &options)
    }
}
