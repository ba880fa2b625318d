//! Direct HTTP page fetching

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::extract::html::parse_html;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info};
use url::{Host, Url};

/// A page fetched and parsed without the LLM
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub headers: Vec<String>,
    pub content: String,
}

/// Fetches pages over HTTP and parses their HTML
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
}

impl PageFetcher {
    /// Create a new page fetcher
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy(&config))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch and parse a single page
    pub async fn fetch(&self, url: &str) -> Result<ScrapedPage> {
        let parsed = validate_url(url)?;
        if !self.config.allow_private_hosts && is_private_host(&parsed) {
            return Err(Error::InvalidRequest(format!(
                "Refusing to fetch private address: {}",
                url
            )));
        }

        debug!("Fetching content from: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Fetch(format!("Timeout fetching: {}", url))
            } else {
                Error::Fetch(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {} for: {}", status.as_u16(), url)));
        }

        let html = read_body(response, self.config.max_body_bytes).await?;

        let parsed = parse_html(&html, self.config.max_content_chars, self.config.max_headers);

        let title = parsed
            .title
            .or_else(|| parsed.headers.first().cloned())
            .unwrap_or_else(|| "No title".to_string());

        info!("Fetched {} chars from: {}", parsed.text.len(), url);

        Ok(ScrapedPage {
            url: url.to_string(),
            title,
            meta_description: parsed.meta_description,
            headers: parsed.headers,
            content: parsed.text,
        })
    }
}

/// Follow at most `max_redirects`, never onto a private host unless allowed
fn redirect_policy(config: &FetchConfig) -> Policy {
    let max_redirects = config.max_redirects;
    let allow_private = config.allow_private_hosts;

    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            attempt.error("too many redirects")
        } else if !allow_private && is_private_host(attempt.url()) {
            let target = attempt.url().to_string();
            attempt.error(format!("redirect to private address: {}", target))
        } else {
            attempt.follow()
        }
    })
}

/// Read at most `limit` bytes of the body; the rest is never downloaded
async fn read_body(mut response: Response, limit: usize) -> Result<String> {
    let mut body = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?
    {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            debug!("Response body cut at {} bytes", limit);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| Error::InvalidRequest(format!("Invalid URL '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidRequest(format!(
            "Unsupported URL scheme '{}': {}",
            parsed.scheme(),
            url
        )));
    }
    if parsed.host_str().is_none() {
        return Err(Error::InvalidRequest(format!("URL has no host: {}", url)));
    }

    Ok(parsed)
}

/// Whether the URL points at localhost or a loopback, private or link-local address
pub fn is_private_host(url: &Url) -> bool {
    fn private_v4(ip: Ipv4Addr) -> bool {
        ip.is_loopback()
            || ip.is_private()
            || ip.is_link_local()
            || ip.is_unspecified()
            || ip.is_broadcast()
    }

    match url.host() {
        Some(Host::Domain(host)) => {
            let host = host.to_ascii_lowercase();
            host == "localhost" || host.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => private_v4(ip),
        Some(Host::Ipv6(ip)) => {
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link-local
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || ip.to_ipv4_mapped().map(private_v4).unwrap_or(false)
        }
        None => false,
    }
}

/// Network location of a URL (`host[:port]`), empty when unparseable
pub fn domain_of(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}
