//! appmeta - inspect Steam appinfo caches and resolved application metadata

mod error;

use crate::error::{ErrorKind, Result};
use appmeta_appinfo::{AppId, AppInfoCache};
use appmeta_config::Config;
use appmeta_library::{Library, Settings};
use appmeta_vdf::text;
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "appmeta", version, about)]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Appinfo cache to read instead of the configured one
    #[arg(long, global = true)]
    appinfo: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve applications and print their metadata as JSON
    Show {
        #[arg(required = true)]
        appids: Vec<AppId>,
    },
    /// List every application in the cache
    List {
        /// Only types that can be started on their own
        #[arg(long)]
        launchable: bool,
        /// Only applications with an install manifest
        #[arg(long)]
        installed: bool,
        /// Count the launch options usable on this branch
        #[arg(long, default_value = "public")]
        branch: String,
    },
    /// Describe the cache file itself
    Info,
    /// Look up a path in a text KeyValues file
    Kv {
        file: PathBuf,
        /// Section path, components separated by `/` (e.g. `AppState/UserConfig`)
        path: String,
        /// Print only this key's value
        key: Option<String>,
    },
    /// Print the launch options the configured account set for an application
    UserOptions { appid: AppId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            tracing::error!(error = ?err, "Configuration failed");
            return ExitCode::FAILURE;
        },
    };
    init_logging(&config.log_level);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, retryable = err.is_retryable(), "{}", *err);
            ExitCode::FAILURE
        },
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(appinfo) = &cli.appinfo {
        config.appinfo_path = Some(std::path::absolute(appinfo).or_raise(|| ErrorKind::Config)?);
    }
    Ok(config)
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Show { appids } => show(config, appids),
        Commands::List {
            launchable,
            installed,
            branch,
        } => list(config, launchable, installed, &branch),
        Commands::Info => info(config),
        Commands::Kv { file, path, key } => kv(&file, &path, key.as_deref()),
        Commands::UserOptions { appid } => user_options(config, appid),
    }
}

fn spawn_library(config: &Config) -> Result<Library> {
    let settings = Settings::from_config(config).or_raise(|| ErrorKind::Library)?;
    Library::spawn(settings).or_raise(|| ErrorKind::Library)
}

fn show(config: &Config, appids: Vec<AppId>) -> Result<()> {
    let library = spawn_library(config)?;
    let snapshot = library.resolve_blocking(appids.clone()).or_raise(|| ErrorKind::Library)?;
    library.shutdown().or_raise(|| ErrorKind::Library)?;

    let found: Vec<_> = appids.iter().filter_map(|appid| snapshot.get(*appid)).collect();
    for missing in appids.iter().filter(|appid| !snapshot.contains(**appid)) {
        tracing::warn!(appid = missing, "Application not found in appinfo cache");
    }
    let stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(stdout, &found).or_raise(|| ErrorKind::Output)?;
    println!();
    Ok(())
}

fn list(config: &Config, launchable: bool, installed: bool, branch: &str) -> Result<()> {
    let settings = Settings::from_config(config).or_raise(|| ErrorKind::Library)?;
    let installed_apps = match (&settings.steam, installed) {
        (Some(steam), true) => Some(steam.installed_apps()),
        (None, true) => {
            tracing::warn!("No Steam installation; nothing is installed");
            Some(Vec::new())
        },
        (_, false) => None,
    };
    let library = Library::spawn(settings).or_raise(|| ErrorKind::Library)?;
    let snapshot = library.resolve_all_blocking().or_raise(|| ErrorKind::Library)?;
    library.shutdown().or_raise(|| ErrorKind::Library)?;

    let mut stdout = std::io::stdout().lock();
    let apps = snapshot
        .apps()
        .filter(|app| !launchable || app.app_type.is_launchable())
        .filter(|app| installed_apps.as_ref().is_none_or(|ids| ids.binary_search(&app.appid).is_ok()));
    for app in apps {
        let launches = app.launch_configs_for(branch).count();
        writeln!(stdout, "{}\t{}\t{}\t{}", app.appid, app.app_type, launches, app.name).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn info(config: &Config) -> Result<()> {
    let settings = Settings::from_config(config).or_raise(|| ErrorKind::Library)?;
    let cache = AppInfoCache::load(&settings.appinfo_path);
    let mut stdout = std::io::stdout().lock();
    let lines = [
        format!("path:        {}", settings.appinfo_path.display()),
        format!("version:     {}", cache.version().map(|v| format!("{v:#010x}")).unwrap_or_default()),
        format!("universe:    {}", cache.universe().map(|u| u.to_string()).unwrap_or_default()),
        format!("records:     {}", cache.len()),
        format!("size:        {}", cache.size()),
        format!("fingerprint: {}", cache.fingerprint()),
        format!("issue:       {}", cache.issue().map(ToString::to_string).unwrap_or_default()),
    ];
    for line in lines {
        writeln!(stdout, "{line}").or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn kv(file: &Path, path: &str, key: Option<&str>) -> Result<()> {
    let contents = text::try_read_file(file).or_raise(|| ErrorKind::Read(file.display().to_string()))?;
    if let Err(err) = text::validate(&contents) {
        tracing::warn!(error = %*err, "Unbalanced file; nothing can be looked up");
    }
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut stdout = std::io::stdout().lock();
    if let Some(key) = key {
        writeln!(stdout, "{}", text::get_value(&contents, &components, key)).or_raise(|| ErrorKind::Output)?;
        return Ok(());
    }
    let (keys, values) = text::get_keys(&contents, &components);
    for (key, value) in keys.iter().zip(&values) {
        writeln!(stdout, "{key}\t{value}").or_raise(|| ErrorKind::Output)?;
    }
    for section in text::get_sections(&contents, &components) {
        writeln!(stdout, "{section}/").or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn user_options(config: &Config, appid: AppId) -> Result<()> {
    let settings = Settings::from_config(config).or_raise(|| ErrorKind::Library)?;
    let (Some(steam), Some(account_id)) = (settings.steam, config.account_id) else {
        tracing::warn!("User launch options need both a Steam installation and an account_id");
        return Ok(());
    };
    let options = steam.user_launch_options(account_id, appid);
    writeln!(std::io::stdout().lock(), "{options}").or_raise(|| ErrorKind::Output)?;
    Ok(())
}
