//! URL processing pipeline
//!
//! ```text
//! URL -> extract (url_context | scrape [+ analyze]) -> combine -> classify
//!     -> dedup + store -> handler -> routes -> related memories
//! ```

use crate::agent::types::*;
use crate::classify::{basic_analysis, Classifier};
use crate::config::{AgentConfig, EaterConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::extract::{
    domain_of, validate_url, ExtractOptions, ExtractedPage, ExtractionMethod, ExtractionStatus,
    MetadataExtractor, PageFetcher,
};
use crate::llm::{
    analysis_prompt, url_digestion_prompt, GeminiClient, GenerateRequest, LlmClient, LlmTool,
};
use crate::memory::{
    content_hash, AddOutcome, InMemoryStore, MemoryEntry, MemoryMetadata, MemoryStore,
};
use crate::routing::{handle, ContentRouter};
use crate::text::{truncate_chars, truncate_words};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Output budget for analysis of already-scraped text
const ANALYSIS_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Headings folded into the stored content
const CONTENT_HEADERS: usize = 5;

/// Runs the full pipeline for single URLs and batches
pub struct DigestAgent {
    config: AgentConfig,
    llm_config: LlmConfig,
    fetcher: PageFetcher,
    llm: Option<Arc<dyn LlmClient>>,
    classifier: Arc<Classifier>,
    router: Arc<ContentRouter>,
    store: Arc<dyn MemoryStore>,
    metadata: MetadataExtractor,
    related_limit: usize,
}

impl DigestAgent {
    pub fn builder() -> DigestAgentBuilder {
        DigestAgentBuilder::new()
    }

    /// The memory store backing this agent
    pub fn store(&self) -> Arc<dyn MemoryStore> {
        self.store.clone()
    }

    pub fn classifier(&self) -> Arc<Classifier> {
        self.classifier.clone()
    }

    pub fn router(&self) -> Arc<ContentRouter> {
        self.router.clone()
    }

    /// Whether an LLM client is configured
    pub fn ai_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Model name of the LLM client, if any
    pub fn model(&self) -> Option<&str> {
        self.llm.as_deref().map(|llm| llm.model())
    }

    pub fn max_batch_urls(&self) -> usize {
        self.config.max_batch_urls
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// Obtain page content, falling back from URL context to scraping and
    /// from LLM analysis to basic analysis
    pub async fn extract(&self, url: &str, options: &ExtractOptions) -> Result<ExtractedPage> {
        validate_url(url)?;

        let llm = if options.skip_ai { None } else { self.llm.clone() };
        let Some(llm) = llm else {
            return self.scrape(url, None).await;
        };

        let use_url_context = options
            .use_url_context
            .unwrap_or(self.config.prefer_url_context);
        if !use_url_context {
            return self.scrape(url, Some(llm.as_ref())).await;
        }

        match self.read_with_url_context(llm.as_ref(), url, options).await {
            Ok(page) => Ok(page),
            Err(e) if e.is_quota() => {
                warn!("URL context quota exhausted for {}, scraping instead: {}", url, e);
                let mut page = self.scrape(url, None).await?;
                page.extraction_status = ExtractionStatus::QuotaError;
                page.ai_error = Some(e.to_string());
                Ok(page)
            }
            Err(e) => {
                warn!("URL context failed for {}, scraping instead: {}", url, e);
                self.scrape(url, Some(llm.as_ref())).await
            }
        }
    }

    /// Let the model read the URL itself
    async fn read_with_url_context(
        &self,
        llm: &dyn LlmClient,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<ExtractedPage> {
        debug!("Reading {} with url_context", url);

        let mut request = GenerateRequest::new(url_digestion_prompt(url, options))
            .with_tool(LlmTool::UrlContext)
            .with_sampling(
                self.llm_config.temperature,
                self.llm_config.top_k,
                self.llm_config.top_p,
            )
            .with_max_output_tokens(self.llm_config.max_output_tokens);
        if options.deep_analysis {
            request = request.with_tool(LlmTool::GoogleSearch);
        }

        let response = llm.generate(request).await?;

        if !response.url_retrievals.is_empty()
            && !response.url_retrievals.iter().any(|r| r.succeeded())
        {
            let status = response
                .url_retrievals
                .first()
                .map(|r| r.status.clone())
                .unwrap_or_default();
            return Err(Error::Llm(format!("URL retrieval failed: {}", status)));
        }
        if response.text.trim().is_empty() {
            return Err(Error::Llm("Empty response from url_context".to_string()));
        }

        let domain = domain_of(url);
        let title = self
            .metadata
            .extract(&response.text)
            .title
            .unwrap_or_else(|| domain.clone());

        Ok(ExtractedPage {
            url: url.to_string(),
            domain,
            timestamp: Utc::now(),
            title,
            raw_content: String::new(),
            meta_description: String::new(),
            headers: Vec::new(),
            analysis: response.text,
            extraction_status: ExtractionStatus::Success,
            method: ExtractionMethod::UrlContext,
            ai_error: None,
        })
    }

    /// Fetch the page directly, then analyze it with the LLM when one is given
    async fn scrape(&self, url: &str, llm: Option<&dyn LlmClient>) -> Result<ExtractedPage> {
        let scraped = self.fetcher.fetch(url).await?;
        let basic = || {
            basic_analysis(
                &scraped.content,
                scraped.headers.len(),
                &scraped.meta_description,
            )
        };

        let (analysis, method, status, ai_error) = match llm {
            None => (
                basic(),
                ExtractionMethod::ScrapeOnly,
                ExtractionStatus::Success,
                None,
            ),
            Some(llm) => {
                let request = GenerateRequest::new(analysis_prompt(url, &scraped))
                    .with_sampling(
                        self.llm_config.temperature,
                        self.llm_config.top_k,
                        self.llm_config.top_p,
                    )
                    .with_max_output_tokens(
                        ANALYSIS_MAX_OUTPUT_TOKENS.min(self.llm_config.max_output_tokens),
                    );

                match llm.generate(request).await {
                    Ok(response) if !response.text.trim().is_empty() => (
                        response.text,
                        ExtractionMethod::ScrapeAndAnalyze,
                        ExtractionStatus::Success,
                        None,
                    ),
                    Ok(_) => {
                        warn!("Empty analysis for {}, using basic analysis", url);
                        (
                            basic(),
                            ExtractionMethod::ScrapeAndAnalyze,
                            ExtractionStatus::Partial,
                            Some("Empty response from model".to_string()),
                        )
                    }
                    Err(e) => {
                        warn!("Analysis failed for {}, using basic analysis: {}", url, e);
                        let status = if e.is_quota() {
                            ExtractionStatus::QuotaError
                        } else {
                            ExtractionStatus::Partial
                        };
                        (
                            basic(),
                            ExtractionMethod::ScrapeAndAnalyze,
                            status,
                            Some(e.to_string()),
                        )
                    }
                }
            }
        };

        Ok(ExtractedPage {
            url: url.to_string(),
            domain: domain_of(url),
            timestamp: Utc::now(),
            title: scraped.title,
            raw_content: scraped.content,
            meta_description: scraped.meta_description,
            headers: scraped.headers,
            analysis,
            extraction_status: status,
            method,
            ai_error,
        })
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Extract, classify, store and route a single URL
    pub async fn process(
        &self,
        url: &str,
        user_id: &str,
        options: &ExtractOptions,
    ) -> Result<ProcessOutcome> {
        let page = self.extract(url, options).await?;
        self.digest(page, user_id).await
    }

    /// Classify, store and route an already extracted page
    pub async fn digest(&self, page: ExtractedPage, user_id: &str) -> Result<ProcessOutcome> {
        if page.analysis.trim().is_empty() && page.raw_content.trim().is_empty() {
            return Err(Error::Fetch("No content extracted".to_string()));
        }

        let content = self.combined_content(&page);
        let hash = content_hash(&content);

        if let Some(existing) = self.store.find_by_hash(user_id, &hash).await {
            info!("Duplicate content for {} (memory {})", page.url, existing.id);
            return Ok(ProcessOutcome::Duplicate {
                existing_memory_id: existing.id,
            });
        }

        let labels = self.metadata.extract(&page.analysis);
        let content_type = self.classifier.classify(&content);
        let title = match labels.title.clone() {
            Some(title) if page.title.is_empty() || page.title == "No title" => title,
            _ => page.title.clone(),
        };

        // Looked up before insert so the new entry is not its own relative
        let opening_text = if page.raw_content.trim().is_empty() {
            &page.analysis
        } else {
            &page.raw_content
        };
        let related = self
            .store
            .related(user_id, &page.domain, opening_text, self.related_limit)
            .await;

        let entry = MemoryEntry {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: title.clone(),
            content: content.clone(),
            analysis: page.analysis.clone(),
            raw_content: page.raw_content.clone(),
            headers: page.headers.clone(),
            content_hash: hash,
            metadata: MemoryMetadata {
                url: page.url.clone(),
                domain: page.domain.clone(),
                timestamp: page.timestamp,
                content_type,
                content_length: content.chars().count(),
                extraction_status: page.extraction_status,
                extraction_method: page.method,
                meta_description: page.meta_description.clone(),
                author: labels.author,
                publish_date: labels.publish_date.clone(),
                keywords: labels.keywords,
                ai_error: page.ai_error.clone(),
            },
            created_at: Utc::now(),
        };
        let content_length = entry.metadata.content_length;

        let memory_id = match self.store.add(entry).await? {
            AddOutcome::Added(id) => id,
            AddOutcome::Duplicate(existing_memory_id) => {
                info!("Duplicate content for {} (memory {})", page.url, existing_memory_id);
                return Ok(ProcessOutcome::Duplicate { existing_memory_id });
            }
        };

        let handler = handle(content_type, labels.publish_date.as_deref(), Utc::now());
        let route_details = self.router.routes(content_type, &handler);
        let routes = route_details.iter().map(|r| r.destination.clone()).collect();

        info!(
            url = %page.url,
            content_type = %content_type,
            memory_id = %memory_id,
            method = ?page.method,
            "Processed page"
        );

        Ok(ProcessOutcome::Processed(Box::new(ProcessReport {
            ai_available: page.ai_available(),
            url: page.url,
            title,
            content_type,
            memory_id,
            routes,
            route_details,
            content_length,
            analysis_preview: truncate_words(&page.analysis, self.config.preview_chars),
            raw_content_preview: truncate_words(&page.raw_content, self.config.preview_chars),
            headers: page.headers,
            meta_description: page.meta_description,
            method: page.method,
            extraction_status: page.extraction_status,
            ai_error: page.ai_error,
            handler,
            related_memories: related.iter().map(RelatedMemory::from).collect(),
        })))
    }

    /// Text stored, hashed and classified for a page
    fn combined_content(&self, page: &ExtractedPage) -> String {
        let mut content = format!(
            "{}\n\nURL: {}\nMeta: {}\n\n",
            page.title, page.url, page.meta_description
        );
        if !page.headers.is_empty() {
            let headers: Vec<&str> = page
                .headers
                .iter()
                .take(CONTENT_HEADERS)
                .map(String::as_str)
                .collect();
            content.push_str(&format!("Headers: {}\n\n", headers.join(", ")));
        }
        content.push_str(&format!("Analysis:\n{}\n\n", page.analysis));
        content.push_str(&format!(
            "Content:\n{}",
            truncate_chars(&page.raw_content, self.config.content_excerpt_chars)
        ));
        content
    }

    /// Process several URLs with bounded concurrency; results keep input order
    pub async fn process_batch(
        &self,
        urls: &[String],
        user_id: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<BatchItem>> {
        if urls.is_empty() {
            return Err(Error::InvalidRequest("No URLs provided".to_string()));
        }
        if urls.len() > self.config.max_batch_urls {
            return Err(Error::InvalidRequest(format!(
                "Maximum {} URLs per batch",
                self.config.max_batch_urls
            )));
        }

        info!("Processing batch of {} URLs for {}", urls.len(), user_id);

        let items: Vec<BatchItem> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let outcome = self.process(&url, user_id, options).await;
                match outcome {
                    Ok(ProcessOutcome::Processed(report)) => BatchItem {
                        url,
                        status: BatchStatus::Success,
                        memory_id: Some(report.memory_id),
                        error: None,
                    },
                    Ok(ProcessOutcome::Duplicate { existing_memory_id }) => BatchItem {
                        url,
                        status: BatchStatus::Duplicate,
                        memory_id: Some(existing_memory_id),
                        error: None,
                    },
                    Err(e) => {
                        warn!("Batch item {} failed: {}", url, e);
                        BatchItem {
                            url,
                            status: BatchStatus::Error,
                            memory_id: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        Ok(items)
    }
}

enum LlmChoice {
    FromConfig,
    Given(Arc<dyn LlmClient>),
    Disabled,
}

/// Builder for DigestAgent
pub struct DigestAgentBuilder {
    config: EaterConfig,
    llm: LlmChoice,
    store: Option<Arc<dyn MemoryStore>>,
}

impl DigestAgentBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: EaterConfig::default(),
            llm: LlmChoice::FromConfig,
            store: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: EaterConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this LLM client instead of building one from config
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = LlmChoice::Given(llm);
        self
    }

    /// Run without an LLM (scrape-only)
    pub fn without_llm(mut self) -> Self {
        self.llm = LlmChoice::Disabled;
        self
    }

    /// Use this memory store instead of building one from config
    pub fn store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the agent
    pub async fn build(self) -> Result<DigestAgent> {
        let config = self.config;

        let llm: Option<Arc<dyn LlmClient>> = match self.llm {
            LlmChoice::Given(llm) => Some(llm),
            LlmChoice::Disabled => None,
            LlmChoice::FromConfig if !config.llm.enabled => None,
            LlmChoice::FromConfig => match config.llm.resolve_api_key() {
                Some(key) => Some(Arc::new(GeminiClient::new(&config.llm, key)?)),
                None => {
                    warn!(
                        "{} not set, running without AI analysis",
                        config.llm.api_key_env
                    );
                    None
                }
            },
        };

        let store: Arc<dyn MemoryStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryStore::from_config(&config.memory).await?),
        };

        Ok(DigestAgent {
            fetcher: PageFetcher::new(config.fetch.clone())?,
            classifier: Arc::new(Classifier::new(config.routing.rules.clone())?),
            router: Arc::new(ContentRouter::new(&config.routing)?),
            metadata: MetadataExtractor::new()?,
            related_limit: config.memory.related_limit,
            config: config.agent,
            llm_config: config.llm,
            llm,
            store,
        })
    }
}

impl Default for DigestAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentType;
    use crate::llm::{GenerateResponse, UrlRetrieval};
    use crate::routing::Priority;
    use async_trait::async_trait;
    use axum::{http::StatusCode, response::Html, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Reply {
        Text(&'static str),
        UrlContext(&'static str, &'static str),
        Quota,
        Fail,
    }

    /// LLM stand-in that answers with a fixed reply and records requests
    struct ScriptedLlm {
        reply: Reply,
        calls: AtomicUsize,
        tools: Mutex<Vec<Vec<LlmTool>>>,
    }

    impl ScriptedLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                tools: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tools.lock().unwrap().push(request.tools.clone());

            match &self.reply {
                Reply::Text(text) => Ok(GenerateResponse {
                    text: text.to_string(),
                    ..Default::default()
                }),
                Reply::UrlContext(text, status) => Ok(GenerateResponse {
                    text: text.to_string(),
                    finish_reason: Some("STOP".to_string()),
                    url_retrievals: vec![UrlRetrieval {
                        url: "https://example.com".to_string(),
                        status: status.to_string(),
                    }],
                }),
                Reply::Quota => Err(Error::Quota("Resource has been exhausted".to_string())),
                Reply::Fail => Err(Error::Llm("boom".to_string())),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    async fn spawn_site() -> String {
        let app = Router::new()
            .route(
                "/research",
                get(|| async {
                    Html(
                        "<html><head><title>A Study of Things</title>\
                         <meta name=\"description\" content=\"Peer reviewed\"></head>\
                         <body><h1>Findings</h1>\
                         <p>This research paper presents a novel study methodology.</p>\
                         </body></html>",
                    )
                }),
            )
            .route(
                "/docs",
                get(|| async {
                    Html(
                        "<html><head><title>SDK Guide</title></head>\
                         <body><h1>API reference</h1><p>Read the docs tutorial.</p></body></html>",
                    )
                }),
            )
            .route("/empty", get(|| async { Html("<html><body></body></html>") }))
            .route("/gone", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Default config that may fetch from the local mock site
    fn local_config() -> EaterConfig {
        let mut config = EaterConfig::default();
        config.fetch.allow_private_hosts = true;
        config
    }

    async fn scrape_only_agent() -> DigestAgent {
        DigestAgent::builder()
            .config(local_config())
            .store(Arc::new(InMemoryStore::new()))
            .without_llm()
            .build()
            .await
            .unwrap()
    }

    async fn agent_with_llm(llm: Arc<dyn LlmClient>) -> DigestAgent {
        DigestAgent::builder()
            .config(local_config())
            .store(Arc::new(InMemoryStore::new()))
            .llm(llm)
            .build()
            .await
            .unwrap()
    }

    fn report(outcome: ProcessOutcome) -> ProcessReport {
        match outcome {
            ProcessOutcome::Processed(report) => *report,
            ProcessOutcome::Duplicate { .. } => panic!("expected a new memory"),
        }
    }

    #[tokio::test]
    async fn test_scrape_only_pipeline() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;

        let outcome = agent
            .process(&format!("{}/research", base), "alice", &ExtractOptions::default())
            .await
            .unwrap();
        let report = report(outcome);

        assert_eq!(report.title, "A Study of Things");
        assert_eq!(report.content_type, ContentType::Research);
        assert_eq!(report.routes, vec!["research_database", "knowledge_base"]);
        assert_eq!(report.route_details[0].priority, Priority::High);
        assert_eq!(report.method, ExtractionMethod::ScrapeOnly);
        assert!(!report.ai_available);
        assert!(report.analysis_preview.starts_with("Basic Analysis"));
        assert_eq!(report.headers, vec!["Findings"]);
        assert_eq!(report.meta_description, "Peer reviewed");
        assert!(report.related_memories.is_empty());

        let stored = agent.store().get(&report.memory_id).await.unwrap();
        assert_eq!(stored.user_id, "alice");
        assert_eq!(stored.content_hash, content_hash(&stored.content));
        assert_eq!(stored.metadata.content_length, report.content_length);
    }

    #[tokio::test]
    async fn test_duplicate_detection() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;
        let url = format!("{}/docs", base);

        let first = agent
            .process(&url, "alice", &ExtractOptions::default())
            .await
            .unwrap();
        let second = agent
            .process(&url, "alice", &ExtractOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            second,
            ProcessOutcome::Duplicate { existing_memory_id } if existing_memory_id == first.memory_id()
        ));

        // Same page for another user is stored again, and relates to nothing of theirs
        let other = report(
            agent
                .process(&url, "bob", &ExtractOptions::default())
                .await
                .unwrap(),
        );
        assert!(other.related_memories.is_empty());
        assert_eq!(agent.store().count().await, 2);
    }

    #[tokio::test]
    async fn test_related_memories_from_same_domain() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;

        let first = agent
            .process(&format!("{}/research", base), "alice", &ExtractOptions::default())
            .await
            .unwrap();
        let second = report(
            agent
                .process(&format!("{}/docs", base), "alice", &ExtractOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(second.content_type, ContentType::Documentation);
        assert_eq!(second.related_memories.len(), 1);
        assert_eq!(second.related_memories[0].id, first.memory_id());
    }

    fn page_at(url: &str, raw_content: &str) -> ExtractedPage {
        ExtractedPage {
            url: url.to_string(),
            domain: domain_of(url),
            timestamp: Utc::now(),
            title: "Tokio".to_string(),
            raw_content: raw_content.to_string(),
            meta_description: String::new(),
            headers: Vec::new(),
            analysis: "Basic Analysis (AI unavailable):\nWord Count: 12".to_string(),
            extraction_status: ExtractionStatus::Success,
            method: ExtractionMethod::ScrapeOnly,
            ai_error: None,
        }
    }

    #[tokio::test]
    async fn test_related_memories_by_opening_words() {
        let agent = scrape_only_agent().await;
        let text = "Tokio is an asynchronous runtime for the Rust programming language. \
                    It provides the building blocks for network applications.";

        let first = agent
            .digest(page_at("https://a.example.org/tokio", text), "alice")
            .await
            .unwrap();
        let second = report(
            agent
                .digest(page_at("https://b.example.net/runtime", text), "alice")
                .await
                .unwrap(),
        );

        assert_eq!(second.related_memories.len(), 1);
        assert_eq!(second.related_memories[0].id, first.memory_id());
        assert_eq!(second.related_memories[0].url, "https://a.example.org/tokio");
    }

    #[tokio::test]
    async fn test_empty_page_is_kept_with_basic_analysis() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;

        let report = report(
            agent
                .process(&format!("{}/empty", base), "alice", &ExtractOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(report.title, "No title");
        assert_eq!(report.content_type, ContentType::General);
        assert!(report.analysis_preview.contains("Word Count: 0"));
        assert!(report.raw_content_preview.is_empty());
        assert_eq!(agent.store().count().await, 1);
    }

    #[tokio::test]
    async fn test_scrape_and_analyze() {
        let base = spawn_site().await;
        let llm = ScriptedLlm::new(Reply::Text(
            "Summary: a research paper.\nAuthor: Ada Lovelace\nKeywords: study, analysis",
        ));
        let agent = agent_with_llm(llm.clone()).await;

        let report = report(
            agent
                .process(&format!("{}/research", base), "alice", &ExtractOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(report.method, ExtractionMethod::ScrapeAndAnalyze);
        assert!(report.ai_available);
        assert!(report.analysis_preview.contains("research paper"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let stored = agent.store().get(&report.memory_id).await.unwrap();
        assert_eq!(stored.metadata.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(stored.metadata.keywords, vec!["study", "analysis"]);
    }

    #[tokio::test]
    async fn test_analysis_quota_falls_back_to_basic() {
        let base = spawn_site().await;
        let agent = agent_with_llm(ScriptedLlm::new(Reply::Quota)).await;

        let report = report(
            agent
                .process(&format!("{}/docs", base), "alice", &ExtractOptions::default())
                .await
                .unwrap(),
        );

        assert!(!report.ai_available);
        assert_eq!(report.extraction_status, ExtractionStatus::QuotaError);
        assert!(report.analysis_preview.starts_with("Basic Analysis"));
        assert!(report.ai_error.unwrap().contains("quota"));
    }

    #[tokio::test]
    async fn test_skip_ai_never_calls_llm() {
        let base = spawn_site().await;
        let llm = ScriptedLlm::new(Reply::Fail);
        let agent = agent_with_llm(llm.clone()).await;

        let options = ExtractOptions {
            skip_ai: true,
            ..Default::default()
        };
        let report = report(
            agent
                .process(&format!("{}/docs", base), "alice", &options)
                .await
                .unwrap(),
        );

        assert_eq!(report.method, ExtractionMethod::ScrapeOnly);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_context_extraction() {
        let base = spawn_site().await;
        let llm = ScriptedLlm::new(Reply::UrlContext(
            "Title: Breaking news today\nThe latest update on the announcement.",
            "URL_RETRIEVAL_STATUS_SUCCESS",
        ));
        let agent = agent_with_llm(llm.clone()).await;

        let options = ExtractOptions {
            use_url_context: Some(true),
            deep_analysis: true,
            ..Default::default()
        };
        let report = report(
            agent
                .process(&format!("{}/research", base), "alice", &options)
                .await
                .unwrap(),
        );

        assert_eq!(report.method, ExtractionMethod::UrlContext);
        assert_eq!(report.title, "Breaking news today");
        assert_eq!(report.content_type, ContentType::News);
        assert_eq!(report.raw_content_preview, "");
        assert_eq!(
            llm.tools.lock().unwrap()[0],
            vec![LlmTool::UrlContext, LlmTool::GoogleSearch]
        );
    }

    #[tokio::test]
    async fn test_url_context_quota_falls_back_to_scrape() {
        let base = spawn_site().await;
        let llm = ScriptedLlm::new(Reply::Quota);
        let agent = agent_with_llm(llm.clone()).await;

        let options = ExtractOptions {
            use_url_context: Some(true),
            ..Default::default()
        };
        let report = report(
            agent
                .process(&format!("{}/research", base), "alice", &options)
                .await
                .unwrap(),
        );

        assert_eq!(report.method, ExtractionMethod::ScrapeOnly);
        assert_eq!(report.extraction_status, ExtractionStatus::QuotaError);
        assert_eq!(report.title, "A Study of Things");
        // No second LLM call after quota exhaustion
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_url_context_retrieval_failure_falls_back() {
        let base = spawn_site().await;
        let llm = ScriptedLlm::new(Reply::UrlContext(
            "I could not open that page.",
            "URL_RETRIEVAL_STATUS_ERROR",
        ));
        let agent = agent_with_llm(llm.clone()).await;

        let options = ExtractOptions {
            use_url_context: Some(true),
            ..Default::default()
        };
        let report = report(
            agent
                .process(&format!("{}/docs", base), "alice", &options)
                .await
                .unwrap(),
        );

        assert_eq!(report.method, ExtractionMethod::ScrapeAndAnalyze);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_error() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;

        let err = agent
            .process(&format!("{}/gone", base), "alice", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let agent = scrape_only_agent().await;
        let err = agent
            .process("not-a-url", "alice", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_no_content_extracted() {
        let agent = scrape_only_agent().await;
        let page = ExtractedPage {
            url: "https://example.com".to_string(),
            domain: "example.com".to_string(),
            timestamp: Utc::now(),
            title: "Empty".to_string(),
            raw_content: String::new(),
            meta_description: String::new(),
            headers: Vec::new(),
            analysis: "   ".to_string(),
            extraction_status: ExtractionStatus::Success,
            method: ExtractionMethod::UrlContext,
            ai_error: None,
        };

        let err = agent.digest(page, "alice").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch URL: No content extracted");
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let base = spawn_site().await;
        let agent = scrape_only_agent().await;

        let urls = vec![
            format!("{}/research", base),
            format!("{}/gone", base),
            format!("{}/docs", base),
            format!("{}/research", base),
        ];
        let items = agent
            .process_batch(&urls, "alice", &ExtractOptions::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 4);
        let returned: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(returned, urls.iter().map(String::as_str).collect::<Vec<_>>());

        assert_eq!(items[1].status, BatchStatus::Error);
        assert!(items[1].error.is_some());
        assert_eq!(items[2].status, BatchStatus::Success);

        // The repeated URL runs concurrently with the first; exactly one insert wins
        let mut statuses = vec![items[0].status, items[3].status];
        statuses.sort_by_key(|s| *s == BatchStatus::Duplicate);
        assert_eq!(statuses, vec![BatchStatus::Success, BatchStatus::Duplicate]);
        assert_eq!(items[0].memory_id, items[3].memory_id);
        assert_eq!(agent.store().count().await, 2);
    }

    #[tokio::test]
    async fn test_batch_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let agent = scrape_only_agent().await;
        let urls = vec!["https://example.com/a".to_string()];
        let options = ExtractOptions::default();

        let batch = agent.process_batch(&urls, "alice", &options);
        assert_send(&batch);
        drop(batch);
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let agent = scrape_only_agent().await;
        let urls: Vec<String> = (0..21).map(|i| format!("https://example.com/{}", i)).collect();

        let err = agent
            .process_batch(&urls, "alice", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(ref m) if m.contains("20")));

        let err = agent
            .process_batch(&[], "alice", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_builder_without_key_has_no_llm() {
        let mut config = EaterConfig::default();
        config.llm.api_key_env = "WEBSITE_EATER_TEST_UNSET_KEY".to_string();

        let agent = DigestAgent::builder().config(config).build().await.unwrap();
        assert!(!agent.ai_enabled());
        assert_eq!(agent.model(), None);
        assert_eq!(agent.max_batch_urls(), 20);
    }
}
