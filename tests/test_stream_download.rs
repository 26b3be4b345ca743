use scenedir::config::Settings;
use indicatif::ProgressBar;
use scenedir::io::{download_stream, download_stream_with_bar, DownloadOptions, Downloader, ResponseStream};
use scenedir::types::SceneError;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// In-memory response with an optional Content-Length
struct FakeResponse {
    body: Cursor<Vec<u8>>,
    content_length: Option<u64>,
}

impl FakeResponse {
    fn new(body: Vec<u8>, content_length: Option<u64>) -> Self {
        Self {
            body: Cursor::new(body),
            content_length,
        }
    }
}

impl Read for FakeResponse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // Hand out small pieces like a network socket would
        let limit = buf.len().min(7);
        self.body.read(&mut buf[..limit])
    }
}

impl ResponseStream for FakeResponse {
    fn declared_length(&self) -> Option<u64> {
        self.content_length
    }
}

/// Response whose connection drops after `fail_after` bytes
struct BrokenResponse {
    sent: usize,
    fail_after: usize,
}

impl Read for BrokenResponse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.sent >= self.fail_after {
            return Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"));
        }
        let n = buf.len().min(self.fail_after - self.sent);
        buf[..n].fill(0xAB);
        self.sent += n;
        Ok(n)
    }
}

impl ResponseStream for BrokenResponse {
    fn declared_length(&self) -> Option<u64> {
        Some(1000)
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serve a single canned HTTP reply on a local port
///
/// The join handle yields the raw request head that was received.
fn serve_once(head: String, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    let handle = thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("Failed to accept connection");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).expect("Failed to read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        // The client may hang up early when it rejects the reply
        let _ = socket.write_all(head.as_bytes());
        let _ = socket.write_all(&body);
        let _ = socket.flush();
        String::from_utf8_lossy(&request).to_lowercase()
    });

    (format!("http://{}/scene.zip", addr), handle)
}

fn local_downloader() -> Downloader {
    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client");
    Downloader::with_client(client)
}

#[test]
fn test_download_writes_file_and_creates_parents() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("S2_L1C/v001/22/K/GA/2020/scene.zip");
    let body: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();

    let response = FakeResponse::new(body.clone(), Some(body.len() as u64));
    download_stream(&file_path, response, &DownloadOptions::default()).expect("Download failed");

    assert_eq!(std::fs::read(&file_path).unwrap(), body);
}

#[test]
fn test_short_download_is_removed() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let response = FakeResponse::new(vec![1u8; 80], Some(100));
    let result = download_stream(&file_path, response, &DownloadOptions::default());

    match result {
        Err(SceneError::Download { expected, actual }) => {
            assert_eq!(expected, 100);
            assert_eq!(actual, 80);
        }
        other => panic!("Expected download error, got {:?}", other),
    }
    assert!(!file_path.exists(), "Partial file must be removed");
}

#[test]
fn test_resumed_download_appends() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![7u8; 50]).unwrap();

    // Ranged response only announces the remaining bytes
    let response = FakeResponse::new(vec![9u8; 30], Some(30));
    let options = DownloadOptions::resume(50, 80);
    download_stream(&file_path, response, &options).expect("Resumed download failed");

    let content = std::fs::read(&file_path).unwrap();
    assert_eq!(content.len(), 80);
    assert!(content[..50].iter().all(|&b| b == 7));
    assert!(content[50..].iter().all(|&b| b == 9));
}

#[test]
fn test_explicit_total_size_overrides_header() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let options = DownloadOptions {
        total_size: Some(64),
        chunk_size: 16,
        ..DownloadOptions::default()
    };
    download_stream(&file_path, FakeResponse::new(vec![0u8; 64], Some(999)), &options)
        .expect("Download failed");
    assert_eq!(std::fs::metadata(&file_path).unwrap().len(), 64);

    // Zero means unknown: the header is used instead
    let options = DownloadOptions {
        total_size: Some(0),
        ..DownloadOptions::default()
    };
    download_stream(&file_path, FakeResponse::new(vec![0u8; 10], Some(10)), &options)
        .expect("Download failed");
    assert_eq!(std::fs::metadata(&file_path).unwrap().len(), 10);
}

#[test]
fn test_missing_length_expects_empty_body() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let result = download_stream(&file_path, FakeResponse::new(vec![1u8; 5], None), &DownloadOptions::default());
    assert!(matches!(result, Err(SceneError::Download { expected: 0, actual: 5 })));
    assert!(!file_path.exists());
}

#[test]
fn test_fresh_download_truncates_existing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![1u8; 500]).unwrap();

    download_stream(&file_path, FakeResponse::new(vec![2u8; 20], Some(20)), &DownloadOptions::default())
        .expect("Download failed");
    assert_eq!(std::fs::read(&file_path).unwrap(), vec![2u8; 20]);
}

#[test]
fn test_broken_stream_reports_io_error_and_cleans_up() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let response = BrokenResponse { sent: 0, fail_after: 300 };
    let result = download_stream(&file_path, response, &DownloadOptions::default());

    match result {
        Err(SceneError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
        other => panic!("Expected I/O error, got {:?}", other),
    }
    assert!(!file_path.exists());
}

#[test]
fn test_progress_enabled_download() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let settings = Settings {
        chunk_size: 10,
        progress: true,
        ..Settings::default()
    };
    let options = settings.download_options();
    download_stream(&file_path, FakeResponse::new(vec![3u8; 25], Some(25)), &options)
        .expect("Download failed");
    assert_eq!(std::fs::metadata(&file_path).unwrap().len(), 25);
}

#[test]
fn test_progress_counts_whole_chunks() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let options = DownloadOptions {
        chunk_size: 10,
        ..DownloadOptions::default()
    };
    let bar = ProgressBar::hidden();
    download_stream_with_bar(&file_path, FakeResponse::new(vec![3u8; 25], Some(25)), &options, &bar)
        .expect("Download failed");

    // Three chunks of 10, 10 and 5 bytes each count as a full chunk
    assert_eq!(bar.position(), 30);
    assert_eq!(bar.length(), Some(25));
    assert_eq!(std::fs::metadata(&file_path).unwrap().len(), 25);
}

#[test]
fn test_progress_starts_at_resume_offset() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![7u8; 40]).unwrap();

    let options = DownloadOptions {
        chunk_size: 16,
        ..DownloadOptions::resume(40, 72)
    };
    let bar = ProgressBar::hidden();
    download_stream_with_bar(&file_path, FakeResponse::new(vec![9u8; 32], Some(32)), &options, &bar)
        .expect("Resumed download failed");

    assert_eq!(bar.position(), 72);
    assert_eq!(bar.length(), Some(72));
}

#[test]
fn test_fetch_unreachable_host() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    let downloader = Downloader::new(Duration::from_secs(5)).expect("Failed to create downloader");
    let result = downloader.fetch("http://127.0.0.1:9/scene.zip", &file_path, &DownloadOptions::default());

    assert!(matches!(result, Err(SceneError::Http(_))));
    assert!(!file_path.exists());
}

#[test]
fn test_fetch_resume_uses_content_range_total() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![7u8; 50]).unwrap();

    let head = "HTTP/1.1 206 Partial Content\r\nContent-Length: 50\r\nContent-Range: bytes 50-99/100\r\nConnection: close\r\n\r\n";
    let (url, server) = serve_once(head.to_string(), vec![9u8; 50]);

    let options = DownloadOptions {
        offset: 50,
        ..DownloadOptions::default()
    };
    local_downloader()
        .fetch(&url, &file_path, &options)
        .expect("Resumed fetch failed");

    let request = server.join().expect("Server thread panicked");
    assert!(request.contains("range: bytes=50-"), "Missing range header in {}", request);

    let content = std::fs::read(&file_path).unwrap();
    assert_eq!(content.len(), 100);
    assert!(content[..50].iter().all(|&b| b == 7));
    assert!(content[50..].iter().all(|&b| b == 9));
}

#[test]
fn test_fetch_resume_without_content_range_adds_offset() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![7u8; 20]).unwrap();

    let head = "HTTP/1.1 206 Partial Content\r\nContent-Length: 30\r\nConnection: close\r\n\r\n";
    let (url, server) = serve_once(head.to_string(), vec![9u8; 30]);

    let options = DownloadOptions {
        offset: 20,
        ..DownloadOptions::default()
    };
    local_downloader()
        .fetch(&url, &file_path, &options)
        .expect("Resumed fetch failed");
    server.join().expect("Server thread panicked");

    assert_eq!(std::fs::metadata(&file_path).unwrap().len(), 50);
}

#[test]
fn test_fetch_resume_rejects_full_body_reply() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");
    std::fs::write(&file_path, vec![7u8; 50]).unwrap();

    // Server ignores the range and sends the whole file
    let head = "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n";
    let (url, server) = serve_once(head.to_string(), vec![9u8; 100]);

    let options = DownloadOptions {
        offset: 50,
        ..DownloadOptions::default()
    };
    let result = local_downloader().fetch(&url, &file_path, &options);
    server.join().expect("Server thread panicked");

    assert!(matches!(result, Err(SceneError::Http(_))), "Expected HTTP error, got {:?}", result);
    assert_eq!(std::fs::read(&file_path).unwrap(), vec![7u8; 50]);
}

#[test]
fn test_downloader_timeout_from_settings() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file_path = temp_dir.path().join("scene.zip");

    // Accepts the connection but never answers
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let url = format!("http://{}/scene.zip", listener.local_addr().unwrap());
    let _server = thread::spawn(move || {
        let (socket, _) = listener.accept().expect("Failed to accept connection");
        thread::sleep(Duration::from_secs(4));
        drop(socket);
    });

    let settings = Settings {
        timeout_secs: 1,
        ..Settings::default()
    };
    let downloader = Downloader::from_settings(&settings).expect("Failed to create downloader");

    let started = Instant::now();
    let result = downloader.fetch(&url, &file_path, &DownloadOptions::default());
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(SceneError::Http(_))), "Expected HTTP error, got {:?}", result);
    assert!(elapsed < Duration::from_secs(3), "Timeout not applied: {:?}", elapsed);
    assert!(!file_path.exists());
}
