//! Website Eater - digest web pages into a searchable per-user memory
//!
//! `serve` runs the HTTP gateway; the other subcommands talk to a running
//! gateway or work offline on the local configuration.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use website_eater::{
    classify::Classifier, config::EaterConfig, extract::ExtractOptions, gateway::GatewayBuilder,
    routing::ContentRouter,
};

#[derive(Parser)]
#[command(name = "website-eater")]
#[command(version)]
#[command(about = "Digest web pages into a searchable per-user memory")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WEBSITE_EATER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Gateway URL used by client commands
    #[arg(long, env = "WEBSITE_EATER_URL", default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

/// Extraction flags shared by `process` and `batch`
#[derive(clap::Args)]
struct OptionArgs {
    /// Scrape only, never call the LLM
    #[arg(long)]
    skip_ai: bool,

    /// Let the LLM search the web for related context
    #[arg(long)]
    deep: bool,

    /// Ask for author, date and keywords
    #[arg(long)]
    metadata: bool,

    /// Ask for a description of images
    #[arg(long)]
    images: bool,

    /// Let the LLM read the URL itself
    #[arg(long, conflicts_with = "no_url_context")]
    url_context: bool,

    /// Always scrape, even if the server prefers URL context
    #[arg(long)]
    no_url_context: bool,
}

impl OptionArgs {
    fn to_options(&self) -> ExtractOptions {
        ExtractOptions {
            skip_ai: self.skip_ai,
            deep_analysis: self.deep,
            extract_metadata: self.metadata,
            extract_images: self.images,
            use_url_context: match (self.url_context, self.no_url_context) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Process a single URL
    Process {
        url: String,

        /// User the memory belongs to
        #[arg(short, long)]
        user: Option<String>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Process several URLs
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// User the memories belong to
        #[arg(short, long)]
        user: Option<String>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Search stored memories
    Search {
        query: String,

        #[arg(short, long)]
        user: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List all memories of a user
    Memories {
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Classify text and show its routes (offline)
    Classify { text: String },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Run diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("website_eater={},tower_http=debug", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.clone().or_else(default_config_path);
    let config = load_config(config_path.as_ref())?;
    let client = ApiClient::new(&cli.server);

    match cli.command {
        Commands::Serve { host, port } => {
            run_gateway(config, host, port).await?;
        }
        Commands::Process { url, user, options } => {
            let body = serde_json::json!({
                "url": url,
                "user_id": user,
                "options": options.to_options(),
            });
            client.post("/api/process", body).await?;
        }
        Commands::Batch {
            urls,
            user,
            options,
        } => {
            let body = serde_json::json!({
                "urls": urls,
                "user_id": user,
                "options": options.to_options(),
            });
            client.post("/api/batch", body).await?;
        }
        Commands::Search { query, user, limit } => {
            let body = serde_json::json!({ "query": query, "user_id": user, "limit": limit });
            client.post("/api/search", body).await?;
        }
        Commands::Memories { user } => {
            let user = user.unwrap_or_else(|| config.gateway.default_user_id.clone());
            client.get(&format!("/api/memories/{}", user)).await?;
        }
        Commands::Classify { text } => {
            classify_offline(&config, &text)?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
        Commands::Doctor => {
            run_doctor(&config, config_path.as_ref(), &client).await;
        }
    }

    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir()
        .map(|dir| dir.join("website-eater").join("config.toml"))
        .filter(|path| path.exists())
}

fn load_config(path: Option<&PathBuf>) -> Result<EaterConfig> {
    match path {
        Some(path) => EaterConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let mut config = EaterConfig::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }
}

async fn run_gateway(config: EaterConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    tracing::info!("Starting Website Eater gateway");

    let mut builder = GatewayBuilder::new().config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    let gateway = Arc::new(builder.build().await?);

    tracing::info!(
        "Gateway starting on http://{}. Press Ctrl+C to stop.",
        gateway.bind_address()
    );

    gateway
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

fn classify_offline(config: &EaterConfig, text: &str) -> Result<()> {
    let classifier = Classifier::new(config.routing.rules.clone())?;
    let router = ContentRouter::new(&config.routing)?;

    let result = classifier.classify_detailed(text);
    println!("Content type: {}", result.content_type);
    for score in &result.scores {
        println!("  {:<14} {}", score.content_type.as_str(), score.score);
    }
    println!("Routes: {}", router.route(result.content_type).join(", "));
    Ok(())
}

fn show_config(config: Option<&EaterConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}

async fn run_doctor(config: &EaterConfig, config_path: Option<&PathBuf>, client: &ApiClient) {
    println!("Website Eater Doctor");
    println!();

    println!("Checking configuration...");
    match config_path {
        Some(path) => println!("  ✓ Configuration file: {}", path.display()),
        None => println!("  ℹ No configuration file found (using defaults)"),
    }

    println!();
    println!("Checking LLM access...");
    if !config.llm.enabled {
        println!("  ℹ LLM disabled in configuration (scrape-only mode)");
    } else if config.llm.resolve_api_key().is_some() {
        println!("  ✓ {} is set", config.llm.api_key_env);
        println!("  ✓ Model: {}", config.llm.model);
    } else {
        println!(
            "  ✗ {} not set (pages will be scraped without AI analysis)",
            config.llm.api_key_env
        );
    }

    println!();
    println!("Checking memory storage...");
    if config.memory.persist {
        println!("  ✓ Persisting to {}", config.memory.storage_dir.display());
    } else {
        println!("  ℹ In-memory only (memories are lost on restart)");
    }

    println!();
    println!("Checking gateway at {}...", client.base_url);
    match client.health().await {
        Ok(version) => println!("  ✓ Gateway reachable (version {})", version),
        Err(e) => println!("  ✗ Gateway not reachable: {}", e),
    }

    println!();
    println!("Doctor check complete!");
}

/// Minimal JSON client for a running gateway
struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway at {}", self.base_url))?;
        print_response(response).await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway at {}", self.base_url))?;
        print_response(response).await
    }

    async fn health(&self) -> Result<String> {
        let json: serde_json::Value = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(json["version"].as_str().unwrap_or("unknown").to_string())
    }
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let json: serde_json::Value = response
        .json()
        .await
        .context("Gateway returned a non-JSON response")?;

    println!("{}", serde_json::to_string_pretty(&json)?);

    if !status.is_success() {
        bail!(
            "Request failed ({}): {}",
            status,
            json["error"].as_str().unwrap_or("unknown error")
        );
    }
    Ok(())
}
