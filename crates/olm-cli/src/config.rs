use anyhow::{Context, Result};
use olm_resolver::ResolverConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "olm-resolve.toml";

/// The olm-resolve configuration file structure (olm-resolve.toml)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OlmConfig {
    /// Resolver settings, same keys as `ResolverConfig`
    pub resolver: ResolverConfig,

    /// Defaults for the `resolve` command
    pub resolve: ResolveConfig,

    /// Directory holding the loaded file
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolveConfig {
    /// Catalog snapshot used when `--catalog` is not given
    pub catalog: Option<PathBuf>,

    /// Installed bundles used when `--installed` is not given
    pub installed: Option<PathBuf>,

    /// Resolution timeout in seconds
    pub timeout: Option<u64>,
}

impl OlmConfig {
    /// Load configuration from olm-resolve.toml, searching upward from the given directory
    pub fn load(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                let mut config: OlmConfig = toml::from_str(&content)
                    .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
                log::debug!("Loaded configuration from {}", config_path.display());
                config.base_dir = Some(current);
                return Ok(Some(config));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Load configuration by searching upward from the current working directory
    pub fn load_from_cwd() -> Result<Option<Self>> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    /// Resolve a path from the file against the file's directory
    pub fn path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn catalog(&self) -> Option<PathBuf> {
        self.resolve.catalog.as_deref().map(|p| self.path(p))
    }

    pub fn installed(&self) -> Option<PathBuf> {
        self.resolve.installed.as_deref().map(|p| self.path(p))
    }
}
