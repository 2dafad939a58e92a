use anyhow::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_address: String,
    pub database: DatabaseConfig,
}

/// Where the document store lives and which databases/collections the helpers target.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over `host`/`port` when set.
    pub uri: Option<String>,
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
    pub local: LocalDatabaseConfig,
    pub apps_global: AppsGlobalDatabaseConfig,
}

#[derive(Clone, Debug)]
pub struct LocalDatabaseConfig {
    pub database: String,
    pub logged_users: String,
}

#[derive(Clone, Debug)]
pub struct AppsGlobalDatabaseConfig {
    pub database: String,
    pub apps_information: String,
}

impl DatabaseConfig {
    pub fn mongo_url(&self) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => format!("mongodb://{}:{}/", self.host, self.port),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: "127.0.0.1".to_string(),
            port: 27017,
            app_name: "docdb-helper".to_string(),
            connect_timeout: Duration::from_secs(5),
            server_selection_timeout: Duration::from_secs(5),
            local: LocalDatabaseConfig {
                database: "localdb".to_string(),
                logged_users: "loggedusers".to_string(),
            },
            apps_global: AppsGlobalDatabaseConfig {
                database: "globaldb".to_string(),
                apps_information: "appsinformation".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Build the configuration from any key/value source, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = DatabaseConfig::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);
        let secs = |key: &str, default: Duration| {
            parsed::<u64>(&lookup, key).map(Duration::from_secs).unwrap_or(default)
        };

        Config {
            server_address: text("SERVER_ADDRESS", "127.0.0.1:3000".to_string()),
            database: DatabaseConfig {
                uri: lookup("MONGODB_URI").filter(|uri| !uri.trim().is_empty()),
                host: text("DB_HOST", defaults.host),
                port: parsed(&lookup, "DB_PORT").unwrap_or(defaults.port),
                app_name: text("DB_APP_NAME", defaults.app_name),
                connect_timeout: secs("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
                server_selection_timeout: secs(
                    "DB_SERVER_SELECTION_TIMEOUT_SECS",
                    defaults.server_selection_timeout,
                ),
                local: LocalDatabaseConfig {
                    database: text("DB_LOCAL_DATABASE", defaults.local.database),
                    logged_users: text("DB_LOCAL_LOGGED_USERS", defaults.local.logged_users),
                },
                apps_global: AppsGlobalDatabaseConfig {
                    database: text("DB_GLOBAL_DATABASE", defaults.apps_global.database),
                    apps_information: text(
                        "DB_GLOBAL_APPS_INFORMATION",
                        defaults.apps_global.apps_information,
                    ),
                },
            },
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value {:?} for {}, using default", raw, key);
            None
        }
    }
}
