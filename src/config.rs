//! Website Eater configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main Website Eater configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EaterConfig {
    /// Gateway configuration
    pub gateway: GatewayConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Direct page fetching configuration
    pub fetch: FetchConfig,

    /// Memory store configuration
    pub memory: MemoryConfig,

    /// Classification and routing rules
    pub routing: RoutingConfig,

    /// Processing pipeline configuration
    pub agent: AgentConfig,
}

impl EaterConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: EaterConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the environment (`GEMINI_MODEL`)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                self.llm.model = model;
            }
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// User id assumed when a request does not name one
    pub default_user_id: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            default_user_id: "default_user".to_string(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Disable to run scrape-only
    pub enabled: bool,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Custom base URL
    pub base_url: Option<String>,

    /// Model used for extraction and analysis
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f64,

    /// Top-k sampling
    pub top_k: u32,

    /// Nucleus sampling
    pub top_p: f64,

    /// Output token cap
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: None,
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 60,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    ///
    /// Tries the variable as written, then its UPPER_CASE form.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(self.api_key_env.to_uppercase()))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Direct page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header sent with page requests
    pub user_agent: String,

    /// Maximum characters of page text kept
    pub max_content_chars: usize,

    /// Maximum h1-h3 headings kept
    pub max_headers: usize,

    /// Redirect limit
    pub max_redirects: usize,

    /// Bytes of response body read before the rest is dropped
    pub max_body_bytes: usize,

    /// Allow loopback, private and link-local hosts
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            max_content_chars: 5000,
            max_headers: 10,
            max_redirects: 5,
            max_body_bytes: 2 * 1024 * 1024,
            allow_private_hosts: false,
        }
    }
}

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Persist memories to `storage_dir/memories.json`
    pub persist: bool,

    /// Storage directory
    pub storage_dir: PathBuf,

    /// Default number of search results
    pub search_limit: usize,

    /// Number of related memories attached to a processing result
    pub related_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            persist: false,
            storage_dir: dirs_next::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("website-eater"),
            search_limit: 10,
            related_limit: 5,
        }
    }
}

/// Processing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Try the LLM's native URL reading before scraping
    pub prefer_url_context: bool,

    /// Maximum URLs accepted by one batch request
    pub max_batch_urls: usize,

    /// URLs processed at once within a batch
    pub batch_concurrency: usize,

    /// Characters of raw page text folded into the stored content
    pub content_excerpt_chars: usize,

    /// Characters of analysis/raw text echoed back in responses
    pub preview_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prefer_url_context: false,
            max_batch_urls: 20,
            batch_concurrency: 4,
            content_excerpt_chars: 1000,
            preview_chars: 500,
        }
    }
}

/// Coarse category assigned to extracted page text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Research,
    News,
    Documentation,
    Blog,
    Product,
    General,
}

impl ContentType {
    /// All content types in declaration order
    pub const ALL: [ContentType; 6] = [
        ContentType::Research,
        ContentType::News,
        ContentType::Documentation,
        ContentType::Blog,
        ContentType::Product,
        ContentType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Research => "research",
            ContentType::News => "news",
            ContentType::Documentation => "documentation",
            ContentType::Blog => "blog",
            ContentType::Product => "product",
            ContentType::General => "general",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("Unknown content type: {}", s)))
    }
}

/// Keyword list and destinations for one content type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Content type this rule scores for
    pub content_type: ContentType,

    /// Keywords counted case-insensitively
    pub keywords: Vec<String>,

    /// Destination labels, in order
    pub destinations: Vec<String>,
}

impl RoutingRule {
    fn new(content_type: ContentType, keywords: &[&str], destinations: &[&str]) -> Self {
        Self {
            content_type,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            destinations: destinations.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Classification and routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Rules in tie-break order
    pub rules: Vec<RoutingRule>,

    /// Destination used when no rule matches a content type
    pub fallback_destination: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rules: default_routing_rules(),
            fallback_destination: "knowledge_base".to_string(),
        }
    }
}

/// Built-in keyword table and destinations.
///
/// Declaration order doubles as the classifier's tie-break order.
pub fn default_routing_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule::new(
            ContentType::Research,
            &[
                "research",
                "study",
                "paper",
                "journal",
                "findings",
                "methodology",
                "academic",
            ],
            &["research_database", "knowledge_base"],
        ),
        RoutingRule::new(
            ContentType::News,
            &["news", "breaking", "latest", "update", "announcement", "report"],
            &["news_feed", "knowledge_base"],
        ),
        RoutingRule::new(
            ContentType::Documentation,
            &[
                "documentation",
                "api",
                "guide",
                "tutorial",
                "reference",
                "docs",
                "sdk",
            ],
            &["docs_repository", "knowledge_base"],
        ),
        RoutingRule::new(
            ContentType::Blog,
            &["blog", "post", "article", "opinion", "thoughts", "review"],
            &["blog_archive", "knowledge_base"],
        ),
        RoutingRule::new(
            ContentType::Product,
            &["product", "feature", "pricing", "service", "solution", "platform"],
            &["product_database", "knowledge_base"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EaterConfig::default();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.gateway.default_user_id, "default_user");
        assert_eq!(config.agent.max_batch_urls, 20);
        assert_eq!(config.fetch.max_content_chars, 5000);
        assert!(!config.fetch.allow_private_hosts);
        assert!(!config.memory.persist);
    }

    #[test]
    fn test_default_routing_rules() {
        let rules = default_routing_rules();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].content_type, ContentType::Research);
        assert!(rules
            .iter()
            .all(|r| r.destinations.last().map(String::as_str) == Some("knowledge_base")));
        assert!(!rules.iter().any(|r| r.content_type == ContentType::General));
    }

    #[test]
    fn test_content_type_roundtrip_names() {
        for t in ContentType::ALL {
            assert_eq!(t.as_str().parse::<ContentType>().unwrap(), t);
        }
        assert_eq!("NEWS".parse::<ContentType>().unwrap(), ContentType::News);
        assert!("recipes".parse::<ContentType>().is_err());

        let json = serde_json::to_string(&ContentType::Documentation).unwrap();
        assert_eq!(json, "\"documentation\"");
    }

    #[test]
    fn test_partial_toml() {
        let config: EaterConfig = toml::from_str(
            r#"
            [gateway]
            port = 8080

            [llm]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.routing.rules.len(), 5);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [memory]
            search_limit = 3

            [[routing.rules]]
            content_type = "blog"
            keywords = ["recipe"]
            destinations = ["cookbook"]
            "#,
        )
        .unwrap();

        let config = EaterConfig::from_file(&path).unwrap();
        assert_eq!(config.memory.search_limit, 3);
        assert_eq!(config.routing.rules.len(), 1);
        assert_eq!(config.routing.rules[0].destinations, vec!["cookbook"]);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "gateway = 3").unwrap();
        assert!(matches!(
            EaterConfig::from_file(&path),
            Err(Error::Config(_))
        ));
    }
}
