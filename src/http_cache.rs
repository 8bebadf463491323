use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "goalmetric";
const CACHE_FILE: &str = "http_cache.json";
const USER_AGENT_VALUE: &str = "goalmetric/0.1";

// Entries younger than this are served without touching the network at all;
// beyond it we revalidate with conditional headers before refetching.
const FRESH_SECS: u64 = 60;

static CACHE: Mutex<Option<CacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// GET a JSON document through the response cache: a fresh entry short-cuts
/// the request entirely, a stale one is revalidated with ETag /
/// Last-Modified, and a 304 refreshes the stored entry's clock.
pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let cached = lookup(url);

    if let Some(entry) = cached.as_ref() {
        if age_secs(entry.fetched_at) < FRESH_SECS {
            return Ok(entry.body.clone());
        }
    }

    let mut req = client.get(url).header(USER_AGENT, USER_AGENT_VALUE);
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(stamp) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, stamp);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let headers = resp.headers().clone();

    if status == StatusCode::NOT_MODIFIED {
        let Some(mut entry) = cached else {
            return Err(anyhow::anyhow!("received 304 without a cached body"));
        };
        entry.fetched_at = now_secs();
        let body = entry.body.clone();
        store(url, entry);
        return Ok(body);
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, trim_snippet(&body)));
    }

    store(
        url,
        CacheEntry {
            body: body.clone(),
            etag: header_string(&headers, ETAG),
            last_modified: header_string(&headers, LAST_MODIFIED),
            fetched_at: now_secs(),
        },
    );
    Ok(body)
}

fn header_string(headers: &reqwest::header::HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn trim_snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(200)
        .collect()
}

fn lookup(url: &str) -> Option<CacheEntry> {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.entries.get(url).cloned()
}

fn store(url: &str, entry: CacheEntry) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(url.to_string(), entry);
    let _ = save_cache_file(cache);
}

fn load_cache_file() -> CacheFile {
    let Some(path) = cache_path() else {
        return CacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return CacheFile::default();
    };
    let cache = serde_json::from_str::<CacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return CacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &CacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(CACHE_FILE),
    )
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn age_secs(fetched_at: u64) -> u64 {
    now_secs().saturating_sub(fetched_at)
}
