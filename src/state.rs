/// Per-tab panel state and its chrome.storage.local layout
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::repo::RepoIdentity;

/// Browser-assigned tab handle
pub type TabId = i32;

const STORAGE_PREFIX: &str = "panelState:";

/// Storage key for a tab's persisted state
pub fn storage_key(tab_id: TabId) -> String {
    format!("{}{}", STORAGE_PREFIX, tab_id)
}

/// Panel state for one live tab
#[derive(Debug, Clone, PartialEq)]
pub struct TabPanelState {
    pub tab_id: TabId,
    pub is_open: bool,
    pub repo: Option<RepoIdentity>,
    pub last_updated: f64,
    /// Bumped whenever `is_open` or `repo` changes; async results carry
    /// the value they started with and are dropped if it moved on.
    pub seq: u64,
    /// Last enablement pushed to the browser, `None` until known
    pub panel_enabled: Option<bool>,
}

impl TabPanelState {
    pub fn new(tab_id: TabId) -> TabPanelState {
        TabPanelState {
            tab_id,
            is_open: false,
            repo: None,
            last_updated: 0.0,
            seq: 0,
            panel_enabled: None,
        }
    }

    /// The stored form, or `None` when there is no repo worth keeping
    pub fn to_stored(&self) -> Option<StoredPanelState> {
        self.repo.as_ref().map(|repo| StoredPanelState {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            is_open: self.is_open,
            timestamp: self.last_updated,
        })
    }
}

/// Persisted value under `panelState:<tabId>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPanelState {
    pub owner: String,
    pub name: String,
    pub is_open: bool,
    pub timestamp: f64,
}

impl StoredPanelState {
    pub fn repo(&self) -> RepoIdentity {
        RepoIdentity::new(self.owner.clone(), self.name.clone())
    }
}

/// In-memory view of every tab the background has seen
///
/// Entries are created on the first event for a tab and removed when the
/// tab closes. Each entry is independent; nothing is shared across tabs.
#[derive(Debug, Default)]
pub struct TabStateStore {
    tabs: HashMap<TabId, TabPanelState>,
}

impl TabStateStore {
    pub fn new() -> Self {
        TabStateStore {
            tabs: HashMap::new(),
        }
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabPanelState> {
        self.tabs.get(&tab_id)
    }

    pub fn get_mut(&mut self, tab_id: TabId) -> Option<&mut TabPanelState> {
        self.tabs.get_mut(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn entry(&mut self, tab_id: TabId) -> &mut TabPanelState {
        self.tabs
            .entry(tab_id)
            .or_insert_with(|| TabPanelState::new(tab_id))
    }

    /// Seed a tab from storage after the background restarted
    ///
    /// Does nothing if the tab already has an in-memory entry, which is
    /// always newer than what storage holds.
    pub fn hydrate(&mut self, tab_id: TabId, stored: Option<StoredPanelState>) {
        if self.contains(tab_id) {
            return;
        }
        let state = self.entry(tab_id);
        if let Some(stored) = stored {
            state.repo = Some(stored.repo());
            state.is_open = stored.is_open;
            state.last_updated = stored.timestamp;
        }
    }

    pub fn remove(&mut self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
