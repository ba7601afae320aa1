//! Default profile pictures for users created without one.
//!
//! The configured generator is asked for an image keyed by the user's name
//! and the response is inlined as a `data:` URL. When the generator is
//! disabled or unreachable a small initials SVG is rendered locally, so
//! creating a user never fails because of the avatar.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

const SVG_MIME: &str = "image/svg+xml";

/// Generator responses larger than this are ignored.
const MAX_GENERATED_SIZE: usize = 256 * 1024;

pub struct AvatarGenerator {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl AvatarGenerator {
    pub fn new(base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// A generator that never leaves the process.
    pub fn local() -> Self {
        Self::new(None)
    }

    /// Inline image for `name`, as a `data:` URL.
    pub async fn avatar_for(&self, name: &str) -> String {
        if let Some(base_url) = &self.base_url {
            match self.fetch(base_url, name).await {
                Ok((bytes, mime)) => {
                    debug!(name, size = bytes.len(), "Fetched generated avatar");
                    return data_url(&mime, &bytes);
                }
                Err(e) => warn!(error = %e, name, "Avatar generator failed, using local avatar"),
            }
        }
        data_url(SVG_MIME, initials_svg(name).as_bytes())
    }

    async fn fetch(&self, base_url: &str, name: &str) -> anyhow::Result<(Vec<u8>, String)> {
        let resp = self
            .client
            .get(base_url)
            .query(&[("seed", name)])
            .send()
            .await?
            .error_for_status()?;

        let mime = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| SVG_MIME.to_string());
        if !mime.starts_with("image/") {
            anyhow::bail!("generator returned {mime}");
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() || bytes.len() > MAX_GENERATED_SIZE {
            anyhow::bail!("generator returned {} bytes", bytes.len());
        }
        Ok((bytes.to_vec(), mime))
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Up to two initials taken from the words of `name`.
fn initials(name: &str) -> String {
    let letters: String = name
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | '.'))
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

/// Background hue derived from the name, stable across restarts.
fn hue(name: &str) -> u16 {
    let hash = blake3::hash(name.as_bytes());
    let bytes = hash.as_bytes();
    u16::from_le_bytes([bytes[0], bytes[1]]) % 360
}

pub fn initials_svg(name: &str) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64" viewBox="0 0 64 64">"#,
            r#"<rect width="64" height="64" rx="8" fill="hsl({hue},55%,45%)"/>"#,
            r#"<text x="50%" y="50%" dy=".35em" text-anchor="middle" "#,
            r##"font-family="sans-serif" font-size="26" fill="#ffffff">{initials}</text>"##,
            "</svg>"
        ),
        hue = hue(name),
        initials = initials(name),
    )
}
