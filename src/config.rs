use std::str::FromStr;

use anyhow::{bail, Context};

use crate::ai::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::auth::AllowList;
use crate::store::NotionConfig;

/// Loopback only: identities come from a header set by the sign-in proxy,
/// so the proxy must be the only client that can reach the listener.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_NOTION_URL: &str = "https://api.notion.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Notion,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "notion" => Ok(StoreBackend::Notion),
            "memory" => Ok(StoreBackend::Memory),
            other => {
                bail!("unknown STORE_BACKEND {other:?} (expected postgres, notion or memory)")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres { database_url: String },
    Notion(NotionConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub openai: Option<OpenAiConfig>,
    pub allow_list: AllowList,
    pub bind: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let backend = match get("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => StoreBackend::Postgres,
        };

        let store = match backend {
            StoreBackend::Postgres => StoreConfig::Postgres {
                database_url: require("DATABASE_URL")
                    .context("the postgres store needs a connection string")?,
            },
            StoreBackend::Notion => StoreConfig::Notion(NotionConfig {
                api_key: require("NOTION_API_KEY")?,
                logs_database: require("NOTION_DATABASE_ID_LOGS")?,
                reports_database: require("NOTION_DATABASE_ID_REPORTS")?,
                resume_database: require("NOTION_DATABASE_ID_RESUME")?,
                base_url: get("NOTION_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_NOTION_URL.to_string()),
            }),
            StoreBackend::Memory => StoreConfig::Memory,
        };

        let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        });

        Ok(Config {
            store,
            openai,
            allow_list: AllowList::parse(&get("ALLOWED_USERS").unwrap_or_default()),
            bind: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_postgres_and_requires_url() {
        let err = config(&[]).unwrap_err();
        assert!(format!("{err:#}").contains("DATABASE_URL must be set"));

        let cfg = config(&[("DATABASE_URL", "postgres://localhost/wins")]).unwrap();
        assert!(matches!(cfg.store, StoreConfig::Postgres { .. }));
        assert_eq!(cfg.bind, "127.0.0.1:3000");
        assert!(cfg.openai.is_none());
        assert!(cfg.allow_list.is_empty());
    }

    #[test]
    fn notion_backend_needs_every_database() {
        let err = config(&[
            ("STORE_BACKEND", "notion"),
            ("NOTION_API_KEY", "secret"),
            ("NOTION_DATABASE_ID_LOGS", "logs"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("NOTION_DATABASE_ID_REPORTS"));

        let cfg = config(&[
            ("STORE_BACKEND", "Notion"),
            ("NOTION_API_KEY", "secret"),
            ("NOTION_DATABASE_ID_LOGS", "logs"),
            ("NOTION_DATABASE_ID_REPORTS", "reports"),
            ("NOTION_DATABASE_ID_RESUME", "resume"),
        ])
        .unwrap();
        match cfg.store {
            StoreConfig::Notion(notion) => {
                assert_eq!(notion.reports_database, "reports");
                assert_eq!(notion.base_url, DEFAULT_NOTION_URL);
            }
            other => panic!("unexpected store {other:?}"),
        }
    }

    #[test]
    fn reads_openai_and_allow_list() {
        let cfg = config(&[
            ("STORE_BACKEND", "memory"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ALLOWED_USERS", "me@example.com, you@example.com"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        let openai = cfg.openai.unwrap();
        assert_eq!(openai.model, DEFAULT_MODEL);
        assert_eq!(openai.base_url, DEFAULT_BASE_URL);
        assert!(cfg.allow_list.permits("you@example.com"));
        assert_eq!(cfg.bind, "127.0.0.1:8080");
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(config(&[("STORE_BACKEND", "sqlite")]).is_err());
    }
}
