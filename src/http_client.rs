use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const DEFAULT_TIMEOUT_SECS: u64 = 12;
const CONNECT_TIMEOUT_SECS: u64 = 5;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. Provider requests are short JSON fetches; one
/// pooled client with a hard timeout keeps a stalled feed from wedging a
/// refresh cycle.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let timeout = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(2, 60);
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}
