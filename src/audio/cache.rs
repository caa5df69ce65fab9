use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CHUNK_SIZE: usize = 64 * 1024;
const KEY_BYTES: usize = 6;

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local copies of streamed tracks. A track is downloaded once and decoded from disk,
/// which lets a loop restart without another request.
#[derive(Debug, Clone)]
pub struct StreamCache {
    root: PathBuf,
    keep: bool,
}

impl StreamCache {
    /// `keep == false` makes [`StreamCache::purge`] delete the directory on shutdown.
    pub fn new(root: PathBuf, keep: bool) -> Self {
        Self { root, keep }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_file_name(url))
    }

    /// Path of a complete local copy of `url`, downloading it first when missing.
    /// Plain filesystem paths and `file://` URLs are used in place. Setting `cancel`
    /// stops a download between chunks and leaves nothing behind.
    pub fn fetch(&self, url: &str, cancel: &AtomicBool) -> Result<PathBuf> {
        if let Some(local) = local_path(url) {
            if !local.is_file() {
                bail!("local track not found: {}", local.display());
            }
            return Ok(local);
        }

        let target = self.path_for(url);
        if fs::metadata(&target).is_ok_and(|meta| meta.len() > 0) {
            debug!(url, path = %target.display(), "stream cache hit");
            return Ok(target);
        }
        if cancel.load(Ordering::Relaxed) {
            bail!("download of {url} cancelled");
        }

        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        download(url, &target, cancel)?;
        info!(url, path = %target.display(), "stream cached");
        Ok(target)
    }

    pub fn purge(&self) -> Result<()> {
        if self.keep || !self.root.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("failed to remove {}", self.root.display()))
    }
}

fn download(url: &str, target: &Path, cancel: &AtomicBool) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build http client")?;

    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request failed for {url}"))?
        .error_for_status()
        .with_context(|| format!("server rejected {url}"))?;

    // Concurrent fetches of one url each write their own partial file.
    let partial = target.with_extension(format!(
        "part-{}-{}",
        std::process::id(),
        PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let copied = copy_body(&mut response, &partial, cancel)
        .with_context(|| format!("failed to download {url}"));
    let written = match copied {
        Ok(written) => written,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
    };

    if written == 0 {
        let _ = fs::remove_file(&partial);
        bail!("empty response body for {url}");
    }

    fs::rename(&partial, target)
        .with_context(|| format!("failed to move download into {}", target.display()))?;
    Ok(())
}

fn copy_body(body: &mut impl Read, partial: &Path, cancel: &AtomicBool) -> Result<u64> {
    let file = File::create(partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            bail!("cancelled");
        }
        let read = body.read(&mut chunk).context("read failed")?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&chunk[..read])
            .with_context(|| format!("failed to write {}", partial.display()))?;
        written += read as u64;
    }

    writer
        .flush()
        .with_context(|| format!("failed to write {}", partial.display()))?;
    Ok(written)
}

fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}

/// File name used for `url` inside the cache: a short digest of the whole url, then
/// the last path segment reduced to characters that are safe on every filesystem.
fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let key: String = digest
        .iter()
        .take(KEY_BYTES)
        .map(|byte| format!("{byte:02x}"))
        .collect();

    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let cleaned: String = segment
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        format!("{key}-stream.bin")
    } else {
        format!("{key}-{cleaned}")
    }
}
