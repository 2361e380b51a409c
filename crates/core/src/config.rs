use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `WELLNESS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub compass: CompassConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_service_name() -> String {
    "wellness-compass".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            engagement: EngagementConfig::default(),
            compass: CompassConfig::default(),
            store: StoreConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

// ─── Engagement Gate Config ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EngagementConfig {
    /// How many of the three pillars must hold before a step unlocks.
    #[serde(default = "default_required_pillars")]
    pub required_pillars: u8,
    #[serde(default = "default_min_reflection_chars")]
    pub min_reflection_chars: usize,
    /// Applied to steps that do not declare their own minimum.
    #[serde(default = "default_min_time_secs")]
    pub default_min_time_secs: u64,
}

fn default_required_pillars() -> u8 {
    2
}

fn default_min_reflection_chars() -> usize {
    50
}

fn default_min_time_secs() -> u64 {
    60
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            required_pillars: default_required_pillars(),
            min_reflection_chars: default_min_reflection_chars(),
            default_min_time_secs: default_min_time_secs(),
        }
    }
}

// ─── Compass Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CompassConfig {
    #[serde(default = "default_mood_window")]
    pub mood_window: usize,
}

fn default_mood_window() -> usize {
    7
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            mood_window: default_mood_window(),
        }
    }
}

// ─── Profile Store Config ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Start the in-memory store in unreachable mode, exercising the
    /// local-only fallback path.
    #[serde(default)]
    pub simulate_offline: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            simulate_offline: false,
        }
    }
}

// ─── Catalog Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with journey definitions. The built-in catalog is used when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("WELLNESS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
