use std::sync::Arc;

use anyhow::Context;

use crate::ai::{OpenAiClient, TextGenerator};
use crate::auth::AllowList;
use crate::config::{Config, StoreConfig};
use crate::store::{MemoryStore, NotionStore, PostgresStore, RecordStore};

/// Clients shared by every request. Built once by the entry point and
/// handed to handlers and pipelines explicitly.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub allow_list: Arc<AllowList>,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        allow_list: AllowList,
    ) -> Self {
        Self {
            store,
            generator,
            allow_list: Arc::new(allow_list),
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RecordStore> = match &config.store {
            StoreConfig::Postgres { database_url } => Arc::new(
                PostgresStore::connect(database_url)
                    .await
                    .context("failed to connect to Postgres")?,
            ),
            StoreConfig::Notion(notion) => Arc::new(
                NotionStore::new(notion.clone()).context("failed to build Notion client")?,
            ),
            StoreConfig::Memory => {
                tracing::warn!("using the in-memory store; entries are lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let generator: Option<Arc<dyn TextGenerator>> = match &config.openai {
            Some(openai) => Some(Arc::new(
                OpenAiClient::new(openai.clone()).context("failed to build OpenAI client")?,
            )),
            None => None,
        };

        if config.allow_list.is_empty() {
            tracing::warn!("ALLOWED_USERS is empty; every API request will be rejected");
        }

        Ok(Self::new(store, generator, config.allow_list.clone()))
    }
}
