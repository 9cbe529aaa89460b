//! Download and on-disk caching of the source dataset.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Case line list published by global.health, mirrored via Our World in Data.
pub const DATASET_URL: &str =
    "https://raw.githubusercontent.com/globaldothealth/monkeypox/main/latest.csv";

/// The cached file is reused as long as it is younger than this.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(12 * 60 * 60);

/// ureq caps bodies at 10 MB by default; the line list has been well past
/// that for most of the outbreak.
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

fn download(url: &str) -> Result<String> {
    log::info!("downloading {url}");
    let mut response = ureq::get(url).call().map_err(|e| Error::Download {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download {
            url: url.to_owned(),
            reason: format!("HTTP status {}", status.as_u16()),
        });
    }
    response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_string()
        .map_err(|e| Error::Download {
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

/// Make sure a fresh copy of the dataset sits at `path`.
///
/// If the file exists and is younger than `max_age` it is reused untouched;
/// otherwise a single blocking GET replaces it. Any transport failure or
/// non-2xx status is fatal. Returns the hex SHA-256 of the downloaded body,
/// or `None` when the cached copy was reused.
pub fn ensure_dataset(path: &Path, url: &str, max_age: Duration) -> Result<Option<String>> {
    if let Some(age) = file_age(path) {
        if age < max_age {
            log::debug!("reusing cached dataset at {} (age {:?})", path.display(), age);
            return Ok(None);
        }
    }

    let body = download(url)?;
    let digest = hex::encode(Sha256::digest(body.as_bytes()));
    log::info!("dataset sha256 {digest} ({} bytes)", body.len());

    // Trailing newline matches what the publisher serves when fetched by
    // other tooling; keeps diffs of the cached file stable.
    fs::write(path, format!("{body}\n"))?;
    Ok(Some(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_is_reused_without_touching_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.csv");
        fs::write(&path, "header\n").unwrap();

        // The URL is unroutable; reuse means it is never dialed.
        let result = ensure_dataset(&path, "http://invalid.invalid/latest.csv", FRESHNESS_WINDOW);
        assert!(matches!(result, Ok(None)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "header\n");
    }

    #[test]
    fn bodies_past_the_default_ureq_cap_download_completely() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        // 11 MB: just over ureq's built-in 10 MB body limit.
        let body_len: usize = 11 * 1024 * 1024;
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {body_len}\r\nConnection: close\r\n\r\n"
            )
            .unwrap();
            let chunk = vec![b'a'; 64 * 1024];
            let mut sent = 0;
            while sent < body_len {
                let n = chunk.len().min(body_len - sent);
                stream.write_all(&chunk[..n]).unwrap();
                sent += n;
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.csv");
        let url = format!("http://{addr}/latest.csv");
        let digest = ensure_dataset(&path, &url, FRESHNESS_WINDOW).unwrap();
        assert!(digest.is_some());
        // Body plus the trailing newline the cache writer appends.
        assert_eq!(fs::metadata(&path).unwrap().len(), body_len as u64 + 1);
        server.join().unwrap();
    }

    #[test]
    fn missing_cache_with_bad_url_is_a_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = ensure_dataset(&path, "http://invalid.invalid/latest.csv", FRESHNESS_WINDOW)
            .unwrap_err();
        assert!(matches!(err, Error::Download { .. }));
    }
}
