//! Command-line interface

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::info;

use crate::infrastructure::{
    config::{self, BridgeConfig, RoutesConfig},
    email::smtp::SenderConfig,
    http::{servers::http::HttpServer, site_router, ListenAddress, Server},
};

pub mod markdown;

/// Route prefix written by `config` and used by `serve emailSupport`
pub const GENERATED_ROUTE_PREFIX: &str = "_api/";

/// Web server for static web sites, like Hugo, with Email support
#[derive(Debug, Parser)]
#[command(name = "site", version)]
pub struct Cli {
    /// Enable debug log level
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve static web site
    Serve(ServeArgs),

    /// Serve static web site with email support configured by a config file
    #[command(name = "serveWithEmailSupport")]
    ServeWithEmailSupport(ServeWithEmailSupportArgs),

    /// Generate default config file
    Config(ConfigArgs),

    /// Generate markdown help file
    Markdown(MarkdownArgs),
}

impl Command {
    /// Name of the command as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Serve(_) => "serve",
            Command::ServeWithEmailSupport(_) => "serveWithEmailSupport",
            Command::Config(_) => "config",
            Command::Markdown(_) => "markdown",
        }
    }
}

/// Arguments of `serve`
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Host for the HTTP server
    #[arg(short = 'a', long)]
    pub server: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,

    /// Root directory for the HTTP server
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// CORS, Access-Control-Allow-Origin pattern
    #[arg(long)]
    pub cors: Option<String>,

    /// Optional serving mode
    #[command(subcommand)]
    pub mode: Option<ServeMode>,
}

/// Serving modes of `serve`
#[derive(Debug, Subcommand)]
pub enum ServeMode {
    /// Serve with email support configured from flags
    #[command(name = "emailSupport")]
    EmailSupport(SenderConfig),
}

/// Arguments of `serveWithEmailSupport`
#[derive(Debug, Args)]
pub struct ServeWithEmailSupportArgs {
    /// EmailBridge config file
    #[arg(short, long, default_value = "config.yml")]
    pub config: PathBuf,
}

/// Arguments of `config`
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config target file name to generate
    #[arg(short, long, default_value = "config.yml")]
    pub target: PathBuf,
}

/// Arguments of `markdown`
#[derive(Debug, Args)]
pub struct MarkdownArgs {
    /// Markdown target file name to generate
    #[arg(short, long, default_value = "site.md")]
    pub target: PathBuf,
}

/// What a serving command resolved to
#[derive(Debug)]
pub struct SitePlan {
    /// Where to listen
    pub address: ListenAddress,

    /// Static files directory
    pub root: PathBuf,

    /// CORS origin pattern
    pub cors: Option<String>,

    /// Email bridge settings, when email support is on
    pub bridge: Option<BridgeConfig>,
}

impl ServeArgs {
    /// Resolves the flags into a [`SitePlan`].
    pub fn plan(self) -> SitePlan {
        let address = ListenAddress::new(self.server.unwrap_or_default(), self.port);

        let bridge = self.mode.map(|ServeMode::EmailSupport(sender)| BridgeConfig {
            server: address.host.clone(),
            port: address.port,
            static_folder: self.root.clone(),
            routes: RoutesConfig {
                prefix: GENERATED_ROUTE_PREFIX.to_string(),
            },
            sender,
        });

        SitePlan {
            address,
            root: self.root,
            cors: self.cors,
            bridge,
        }
    }
}

impl From<BridgeConfig> for SitePlan {
    fn from(config: BridgeConfig) -> Self {
        Self {
            address: ListenAddress::new(config.server.clone(), config.port),
            root: config.static_folder.clone(),
            cors: None,
            bridge: Some(config),
        }
    }
}

impl Cli {
    /// Executes the parsed command.
    #[mutants::skip]
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve(args) => serve(args.plan()).await,
            Command::ServeWithEmailSupport(args) => {
                let config = config::load(&args.config)?;
                serve(config.into()).await
            }
            Command::Config(args) => generate_config(&args),
            Command::Markdown(args) => generate_markdown(&args),
        }
    }
}

/// Starts the HTTP server for `plan` and blocks until it stops.
#[mutants::skip]
pub async fn serve(plan: SitePlan) -> Result<()> {
    let router = site_router(&plan.root, plan.cors.as_deref(), plan.bridge.as_ref())?;
    let server = HttpServer::new(&plan.address, router)?;

    match &plan.bridge {
        Some(config) => info!(
            "serve '{}' on '{}' with email support '{}'",
            plan.root.display(),
            plan.address.link(),
            config.sender.email
        ),
        None => info!("serve '{}' on '{}'", plan.root.display(), plan.address.link()),
    }

    server.run().await
}

/// Writes the default config, with the generated route prefix, to the target.
pub fn generate_config(args: &ConfigArgs) -> Result<()> {
    let mut config = config::build_default();
    config.routes.prefix = GENERATED_ROUTE_PREFIX.to_string();

    config::write_config(&args.target, &config)?;

    info!("config written to '{}'", args.target.display());

    Ok(())
}

/// Writes the markdown help of the whole command line to the target.
pub fn generate_markdown(args: &MarkdownArgs) -> Result<()> {
    let mut command = Cli::command();
    command.build();

    fs::write(&args.target, markdown::render(&command))
        .with_context(|| format!("failed to write {:?}", args.target))?;

    info!("markdown help written to '{}'", args.target.display());

    Ok(())
}
