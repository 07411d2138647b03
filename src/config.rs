use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://foodgram.db?mode=rwc";
const DEFAULT_PAGE_SIZE: u32 = 6;

/// Runtime settings, read once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub page_size: u32,
    pub media_root: PathBuf,
    pub admin_email: Option<String>,
    pub ingredients_fixture: Option<PathBuf>,
    pub shopping_list: ShoppingListConfig,
}

/// How the downloadable shopping list is rendered.
#[derive(Debug, Clone)]
pub struct ShoppingListConfig {
    pub header: String,
    pub filename: String,
}

impl Default for ShoppingListConfig {
    fn default() -> Self {
        Self {
            header: "Shopping list:".to_string(),
            filename: "shopping-list.txt".to_string(),
        }
    }
}

impl Config {
    /// Defaults for everything except the database and the token secret.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            host: "0.0.0.0".to_string(),
            port: 8000,
            jwt_secret: jwt_secret.into(),
            token_ttl_days: 30,
            page_size: DEFAULT_PAGE_SIZE,
            media_root: PathBuf::from("media"),
            admin_email: None,
            ingredients_fixture: None,
            shopping_list: ShoppingListConfig::default(),
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let database_url = try_load::<String>("DATABASE_URL", DEFAULT_DATABASE_URL)?;

        let defaults = ShoppingListConfig::default();

        Ok(Self {
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "8000")?,
            token_ttl_days: try_load("TOKEN_TTL_DAYS", "30")?,
            page_size: try_load("PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            admin_email: optional("ADMIN_EMAIL"),
            ingredients_fixture: optional("INGREDIENTS_FIXTURE").map(PathBuf::from),
            shopping_list: ShoppingListConfig {
                header: try_load("SHOPPING_LIST_HEADER", &defaults.header)?,
                filename: try_load("SHOPPING_LIST_FILENAME", &defaults.filename)?,
            },
            ..Self::new(database_url, jwt_secret)
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid value for {key}: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_everything_but_secrets() {
        let config = Config::new("sqlite::memory:", "secret");
        assert_eq!(config.page_size, 6);
        assert_eq!(config.shopping_list.filename, "shopping-list.txt");
        assert_eq!(config.addr().unwrap().port(), 8000);
    }
}
