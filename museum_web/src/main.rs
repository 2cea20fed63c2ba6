use clap::Parser;
use museum_core::config::database_path;
use museum_core::{seed_default_admin, Config, Database, Result};
use museum_web::{app, AppState};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "heritage-web")]
#[command(about = "HeritagePlus museum web interface", long_about = None)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/heritage/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override listen host
    #[arg(long, env = "HERITAGE_WEB_HOST")]
    host: Option<String>,

    /// Override listen port
    #[arg(long, env = "HERITAGE_WEB_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    museum_core::logging::init_with_level(&config.logging.level);

    let data_dir = args.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let db_path = database_path(&data_dir);

    // First run: make sure someone can log in
    let security = config.security.clone();
    let seed_path = db_path.clone();
    let created = tokio::task::spawn_blocking(move || {
        Database::update(&seed_path, |db| seed_default_admin(db, &security))
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;
    if created {
        tracing::warn!(
            "Created default admin '{}'; change its password",
            config.security.admin_username
        );
    }

    let state = AppState::new(db_path.clone(), config.access.clone());
    let router = app(state).layer(TraceLayer::new_for_http());

    let host = args.host.unwrap_or(config.web.host);
    let port = args.port.unwrap_or(config.web.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;

    tracing::info!(
        "heritage-web v{} listening on {} (database {:?})",
        env!("CARGO_PKG_VERSION"),
        listener.local_addr()?,
        db_path
    );
    axum::serve(listener, router).await?;
    Ok(())
}
