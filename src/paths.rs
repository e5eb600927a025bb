use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Application paths following OS conventions
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Configuration directory (config.toml)
    pub config: PathBuf,
    /// Data directory (identity database)
    pub data: PathBuf,
    /// Cache directory (logs)
    pub cache: PathBuf,
}

impl AppPaths {
    /// Resolve OS-specific paths for JARVIS
    ///
    /// # Platform Paths
    ///
    /// ## Linux
    /// - Config: `~/.config/jarvis/`
    /// - Data: `~/.local/share/jarvis/` → face_db_v2.json
    /// - Cache: `~/.cache/jarvis/` → logs/
    ///
    /// ## macOS
    /// - Config: `~/Library/Preferences/com.TForce.Jarvis/`
    /// - Data: `~/Library/Application Support/com.TForce.Jarvis/`
    /// - Cache: `~/Library/Caches/com.TForce.Jarvis/`
    ///
    /// ## Windows
    /// - Config: `%APPDATA%\TForce\Jarvis\config\`
    /// - Data: `%APPDATA%\TForce\Jarvis\data\`
    /// - Cache: `%LOCALAPPDATA%\TForce\Jarvis\cache\`
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "TForce", "Jarvis")
            .context("Failed to determine project directories")?;

        Ok(Self {
            config: proj_dirs.config_dir().to_path_buf(),
            data: proj_dirs.data_dir().to_path_buf(),
            cache: proj_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Root every directory under a single base (portable installs, tests)
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            config: base.join("config"),
            data: base.join("data"),
            cache: base.join("cache"),
        }
    }

    /// Create all necessary directories
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config).context("Failed to create config directory")?;
        fs::create_dir_all(&self.data).context("Failed to create data directory")?;
        fs::create_dir_all(self.logs_dir()).context("Failed to create logs directory")?;

        log::info!("Application directories initialized");
        log::debug!("  Config: {}", self.config.display());
        log::debug!("  Data:   {}", self.data.display());
        log::debug!("  Cache:  {}", self.cache.display());

        Ok(())
    }

    /// Get path to config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Get path to the identity database
    pub fn identity_db_file(&self) -> PathBuf {
        self.data.join("face_db_v2.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.cache.join("logs")
    }
}
