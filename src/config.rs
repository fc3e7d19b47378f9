use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL; an in-memory store is used when absent
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; place searches are cached when present
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Secret used to sign bearer tokens
    pub jwt_secret: String,

    /// Token lifetime, e.g. `90d`, `12h`, `30m`
    #[serde(default = "default_jwt_expires_in")]
    pub jwt_expires_in: String,

    /// Google Places API key
    pub google_api_key: String,

    /// Google Places API base URL
    #[serde(default = "default_places_api_url")]
    pub places_api_url: String,

    /// Seconds a cached place search stays valid
    #[serde(default = "default_places_cache_ttl")]
    pub places_cache_ttl: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_jwt_expires_in() -> String {
    "90d".to_string()
}

fn default_places_api_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_places_cache_ttl() -> u64 {
    600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if self.google_api_key.trim().is_empty() {
            anyhow::bail!("GOOGLE_API_KEY must not be empty");
        }
        self.token_lifetime()?;
        Ok(())
    }

    /// Parsed `jwt_expires_in`
    pub fn token_lifetime(&self) -> anyhow::Result<chrono::Duration> {
        parse_lifetime(&self.jwt_expires_in)
    }
}

/// Parses lifetimes of the form `<n>[smhdwy]`
pub fn parse_lifetime(value: &str) -> anyhow::Result<chrono::Duration> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        anyhow::bail!("Token lifetime must not be empty");
    };
    let amount: i64 = value[..value.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| anyhow::anyhow!("Must be in format like 90d, 1h, 10m, got {:?}", value))?;

    let seconds = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        'y' => 365 * 24 * 60 * 60,
        _ => anyhow::bail!("Must be in format like 90d, 1h, 10m, got {:?}", value),
    };

    amount
        .checked_mul(seconds)
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| anyhow::anyhow!("Token lifetime {:?} is out of range", value))
}
