// Avatar download for communication notifications
// Fetches the sender photo once and persists it to a uniquely named scratch file

use std::path::PathBuf;

use tempfile::Builder;
use url::Url;

use crate::components::{EnrichmentConfig, EnrichmentError, EnrichmentResult};

/// Avatar written to the scratch directory.
///
/// The file is intentionally left behind after the invocation; the OS temp
/// directory lifecycle reclaims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAvatar {
    pub path: PathBuf,
    pub url: Url,
    pub size: u64,
}

/// Accept only absolute http/https URLs with a host
pub fn parse_avatar_url(raw: &str) -> EnrichmentResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| EnrichmentError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {},
        scheme => {
            return Err(EnrichmentError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            });
        },
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(EnrichmentError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Single-shot avatar downloader shared by every invocation of a service
#[derive(Debug, Clone)]
pub struct AvatarFetcher {
    client: reqwest::Client,
    scratch_dir: PathBuf,
    max_bytes: u64,
}

impl AvatarFetcher {
    pub fn new(config: &EnrichmentConfig) -> EnrichmentResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| EnrichmentError::Config {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            scratch_dir: config.scratch_dir(),
            max_bytes: config.max_avatar_bytes,
        })
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        &self.scratch_dir
    }

    /// Best-effort fetch. `None` for a missing or unusable URL and for any
    /// download failure; no request is made unless the URL is http/https.
    pub async fn fetch(&self, raw_url: Option<&str>) -> Option<FetchedAvatar> {
        let raw_url = raw_url?;

        let url = match parse_avatar_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping avatar: {}", e);
                return None;
            },
        };

        match self.download(&url).await {
            Ok(avatar) => Some(avatar),
            Err(e) => {
                tracing::warn!("Avatar download failed: {}", e);
                None
            },
        }
    }

    /// Download `url` into a fresh scratch file
    pub async fn download(&self, url: &Url) -> EnrichmentResult<FetchedAvatar> {
        let url_string = url.to_string();

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| EnrichmentError::Network {
                url: url_string.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(EnrichmentError::HttpStatus {
                url: url_string,
                status: response.status().as_u16(),
            });
        }

        if let Some(size) = response.content_length()
            && size > self.max_bytes
        {
            return Err(EnrichmentError::TooLarge {
                url: url_string,
                size,
                limit: self.max_bytes,
            });
        }

        let extension = determine_extension(url, response.headers());

        // Content-Length may be absent or wrong, so enforce the limit while reading
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    return Err(EnrichmentError::Network {
                        url: url_string,
                        source: e,
                    });
                },
            };
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > self.max_bytes {
                return Err(EnrichmentError::TooLarge {
                    url: url_string,
                    size: bytes.len() as u64,
                    limit: self.max_bytes,
                });
            }
        }

        if bytes.is_empty() {
            return Err(EnrichmentError::EmptyBody { url: url_string });
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| EnrichmentError::io("creating scratch directory", e))?;

        let temp_file = Builder::new()
            .prefix("avatar-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| EnrichmentError::io("creating avatar file", e))?;

        let temp_path = temp_file.path().to_path_buf();
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| EnrichmentError::io("writing avatar file", e))?;

        // Keep the file past the drop of the handle
        let persisted_path = temp_file
            .into_temp_path()
            .keep()
            .map_err(|e| EnrichmentError::io("persisting avatar file", e.error))?;

        tracing::debug!(
            "Downloaded avatar {} -> {:?} ({} bytes)",
            url_string,
            persisted_path,
            bytes.len()
        );

        Ok(FetchedAvatar {
            path: persisted_path,
            url: url.clone(),
            size: bytes.len() as u64,
        })
    }
}

/// Image media types and the scratch file extension each is saved under
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/heic", "heic"),
    ("image/heif", "heif"),
];

const FALLBACK_EXTENSION: &str = "png";

/// Extension for the scratch file: the URL's own suffix when it looks like
/// one, else the Content-Type, else png
pub fn determine_extension(url: &Url, headers: &reqwest::header::HeaderMap) -> String {
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| (1..=4).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric()));
    if let Some(ext) = from_path {
        return ext.to_ascii_lowercase();
    }

    let media_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase());

    media_type
        .and_then(|media_type| {
            IMAGE_EXTENSIONS
                .iter()
                .find(|(known, _)| *known == media_type)
                .map(|(_, ext)| *ext)
        })
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string()
}
