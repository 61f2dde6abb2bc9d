//! Static source registry backed by the host configuration.

use std::collections::HashMap;

use vidhub_search::{CallerIdentity, SearchError, SourceDescriptor, SourceRegistry};

use crate::config::{AppConfig, SourceEntry};

/// Lists configured sources, narrowed per user.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    sources: Vec<SourceEntry>,
    /// Username → allowed source keys (`None` = all).
    users: HashMap<String, Option<Vec<String>>>,
}

impl ConfigRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sources: config.sources.clone(),
            users: config
                .users
                .iter()
                .map(|user| (user.username.clone(), user.enabled_sources.clone()))
                .collect(),
        }
    }

    /// Number of sources that are not disabled.
    pub fn enabled_count(&self) -> usize {
        self.sources.iter().filter(|s| !s.disabled).count()
    }

    fn sources_for(&self, caller: &CallerIdentity) -> Result<Vec<SourceDescriptor>, SearchError> {
        let allowed = self
            .users
            .get(&caller.username)
            .ok_or_else(|| SearchError::Registry(format!("unknown user {}", caller.username)))?;

        Ok(self
            .sources
            .iter()
            .filter(|source| !source.disabled)
            .filter(|source| {
                allowed
                    .as_ref()
                    .is_none_or(|keys| keys.iter().any(|key| *key == source.key))
            })
            .map(SourceEntry::descriptor)
            .collect())
    }
}

impl SourceRegistry for ConfigRegistry {
    async fn list_enabled_sources(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<SourceDescriptor>, SearchError> {
        let sources = self.sources_for(caller)?;
        tracing::debug!(user = %caller.username, count = sources.len(), "resolved sources");
        Ok(sources)
    }
}
