//! Application state shared across handlers.

use std::sync::Arc;

use crate::claude::ClaudeClient;
use crate::config::AppConfig;
use crate::services::workspace::WorkspaceRegistry;
use crate::store::Store;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Store,
    claude: ClaudeClient,
    workspaces: WorkspaceRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Store, claude: ClaudeClient) -> Self {
        let workspaces = WorkspaceRegistry::new(config.workspace_idle);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                claude,
                workspaces,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn claude(&self) -> &ClaudeClient {
        &self.inner.claude
    }

    #[must_use]
    pub fn workspaces(&self) -> &WorkspaceRegistry {
        &self.inner.workspaces
    }
}
