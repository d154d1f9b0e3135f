// src/main.rs
//! Front controller: loads the configuration, builds the application and
//! dispatches a single request given on the command line.
use anyhow::Result;
use app_kernel::components::{Controller, RouteContext};
use app_kernel::core::ServiceSection;
use app_kernel::{AppError, AppResult, Application, Config};
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "app-kernel")]
#[command(about = "Dispatch a request through the application kernel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(long, env = "APP_CONFIG")]
    config: Option<PathBuf>,

    /// Request target, e.g. `/home/index` or `/?route=home/index`
    #[arg(long, conflicts_with = "route")]
    uri: Option<String>,

    /// Route to dispatch, e.g. `home/index`
    #[arg(long)]
    route: Option<String>,
}

struct HomeController {
    context: RouteContext,
}

impl Controller for HomeController {
    fn run(&mut self) -> AppResult<()> {
        match self.context.action.as_str() {
            "index" => println!("Welcome home"),
            "maintain" => println!("Down for maintenance, back soon"),
            other => {
                return Err(AppError::Controller(format!(
                    "home has no action '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.context.controller
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    info!("Starting app-kernel v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.as_deref())?;
    apply_request_overrides(&mut config, args.uri, args.route);

    let mut app = Application::builder()
        .controller("home", |context: RouteContext| {
            Box::new(HomeController { context }) as Box<dyn Controller>
        })
        .build(config)?;

    if let Some(db) = app.container().database()? {
        match db.ping().await {
            Ok(()) => info!(driver = ?db.driver(), "database reachable"),
            Err(e) => warn!(error = %e, "database not reachable"),
        }
    }

    app.run_or_display();
    app.clean_flash()?;
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// An explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        info!(path = %path.display(), "loading configuration");
        return Ok(Config::from_file(path)?);
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        info!(path = DEFAULT_CONFIG_PATH, "loading configuration");
        Ok(Config::from_file(default_path)?)
    } else {
        warn!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
        Ok(Config::default())
    }
}

fn apply_request_overrides(config: &mut Config, uri: Option<String>, route: Option<String>) {
    if uri.is_none() && route.is_none() {
        return;
    }

    let section = config.request.get_or_insert_with(ServiceSection::new);
    section.settings.remove("uri");
    section.settings.remove("route");
    if let Some(uri) = uri {
        section.settings.insert("uri".to_string(), json!(uri));
    }
    if let Some(route) = route {
        section.settings.insert("route".to_string(), json!(route));
    }
}
