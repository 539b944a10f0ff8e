//! Site build command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gazette_site::{default_site, BuildConfig, PaginatorSettings, SiteBuilder, Value};
use serde::Deserialize;

/// Mode that sets `site.debug`.
const DEBUG_MODE: &str = "debug";

/// Configuration file structure (config.toml).
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    template_dir: PathBuf,
    output_dir: PathBuf,
    static_dir: PathBuf,
    paginator: PaginatorSettings,
    site: toml::Table,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let defaults = BuildConfig::default();

        Self {
            template_dir: defaults.template_dir,
            output_dir: defaults.output_dir,
            static_dir: defaults.static_dir,
            paginator: defaults.paginator,
            site: toml::Table::new(),
        }
    }
}

/// Config file name for a build mode.
fn config_file_name(mode: Option<&str>) -> String {
    match mode {
        Some(mode) => format!("config_{mode}.toml"),
        None => "config.toml".to_string(),
    }
}

/// Load configuration from `dir` if the file exists.
/// Returns an error if the config file exists but is malformed.
fn load_config(dir: &Path, mode: Option<&str>) -> Result<ConfigFile> {
    let config_path = dir.join(config_file_name(mode));

    if !config_path.exists() {
        tracing::debug!("No {}, using defaults", config_path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    tracing::info!("Loaded config from {}", config_path.display());

    Ok(config)
}

fn build_config(file: ConfigFile, mode: Option<&str>, output: Option<PathBuf>) -> BuildConfig {
    let mut site = default_site();
    for (key, value) in &file.site {
        site.insert(key.clone(), Value::from_serialize(value));
    }

    BuildConfig {
        template_dir: file.template_dir,
        output_dir: output.unwrap_or(file.output_dir),
        static_dir: file.static_dir,
        paginator: file.paginator,
        site,
        debug: mode == Some(DEBUG_MODE),
    }
}

/// Run the build command.
pub fn run(mode: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building site...");

    let file_config = load_config(Path::new("."), mode)?;
    let config = build_config(file_config, mode, output);

    let result = SiteBuilder::new(config)
        .build()
        .context("Site build failed")?;

    tracing::info!(
        "Built {} posts and {} pages in {}ms",
        result.posts,
        result.pages,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
