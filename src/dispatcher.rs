/// Per-tab panel state machine
///
/// The dispatcher turns browser events into state changes plus a list of
/// effects for the background driver to perform. It never awaits anything
/// itself, so every transition is applied atomically in event order.
///
/// States per tab: CLOSED, or OPEN(repo). A tab's `seq` moves on whenever
/// its open flag or repo changes; probe results, message retries and
/// storage writes that started under an older `seq` are discarded.
use std::collections::HashSet;

use crate::config::ExtensionConfig;
use crate::messenger::PanelMessage;
use crate::repo::{content_url, resolve, RepoIdentity};
use crate::state::{StoredPanelState, TabId, TabPanelState, TabStateStore};

/// Result of the HEAD request made before showing a repo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    NotFound,
    /// Network error or timeout; treated like `Found`
    Unreachable,
}

impl ProbeOutcome {
    pub fn from_status(status: u16) -> ProbeOutcome {
        match status {
            404 => ProbeOutcome::NotFound,
            0 => ProbeOutcome::Unreachable,
            _ => ProbeOutcome::Found,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    ActionClicked { url: Option<String> },
    UrlChanged { url: String },
    Activated { url: Option<String> },
    Removed,
    /// The panel page went away without being told to close
    PanelClosed,
    ProbeFinished {
        seq: u64,
        repo: RepoIdentity,
        outcome: ProbeOutcome,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetPanelEnabled { tab_id: TabId, enabled: bool },
    OpenPanel { tab_id: TabId },
    Persist { tab_id: TabId, seq: u64, stored: StoredPanelState },
    Forget { tab_id: TabId, seq: u64 },
    Probe { tab_id: TabId, seq: u64, repo: RepoIdentity, url: String },
    Send { tab_id: TabId, seq: u64, message: PanelMessage },
}

pub struct Dispatcher {
    store: TabStateStore,
    config: ExtensionConfig,
    /// Closed tabs; browser tab ids are never reused
    removed: HashSet<TabId>,
}

impl Dispatcher {
    pub fn new(store: TabStateStore, config: ExtensionConfig) -> Self {
        Dispatcher {
            store,
            config,
            removed: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ExtensionConfig) {
        self.config = config;
    }

    pub fn store(&self) -> &TabStateStore {
        &self.store
    }

    /// True until the tab has been seen or hydrated in this process
    pub fn needs_hydration(&self, tab_id: TabId) -> bool {
        !self.store.contains(tab_id) && !self.removed.contains(&tab_id)
    }

    /// Seed a tab from storage; a read that finishes after the tab was
    /// closed is dropped
    pub fn hydrate(&mut self, tab_id: TabId, stored: Option<StoredPanelState>) {
        if self.removed.contains(&tab_id) {
            log::debug!("Tab {} closed while restoring, ignoring stored state", tab_id);
            return;
        }
        self.store.hydrate(tab_id, stored);
    }

    /// Whether an async operation started at `seq` may still commit
    pub fn is_current(&self, tab_id: TabId, seq: u64) -> bool {
        self.store.get(tab_id).is_some_and(|s| s.seq == seq)
    }

    /// Whether a storage effect still describes the tab when it is about
    /// to be written
    ///
    /// Writes from different events can finish in any order, so a persist
    /// only lands while its `seq` is current. Deleting the key is always
    /// allowed once the tab is gone.
    pub fn should_write(&self, effect: &Effect) -> bool {
        match effect {
            Effect::Persist { tab_id, seq, .. } => self.is_current(*tab_id, *seq),
            Effect::Forget { tab_id, seq } => {
                self.removed.contains(tab_id) || self.is_current(*tab_id, *seq)
            }
            _ => true,
        }
    }

    /// Forget the remembered enablement after the browser rejected a change
    pub fn reset_enablement(&mut self, tab_id: TabId) {
        if let Some(state) = self.store.get_mut(tab_id) {
            state.panel_enabled = None;
        }
    }

    pub fn handle(&mut self, tab_id: TabId, event: TabEvent, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.removed.contains(&tab_id) {
            log::debug!("Tab {} already closed, ignoring {:?}", tab_id, event);
            return effects;
        }

        match event {
            TabEvent::Removed => {
                let seq = self.store.get(tab_id).map_or(0, |s| s.seq);
                self.store.remove(tab_id);
                self.removed.insert(tab_id);
                effects.push(Effect::Forget { tab_id, seq });
                log::debug!("Cleaned up tab {}", tab_id);
            }
            TabEvent::ProbeFinished { seq, repo, outcome } => {
                self.on_probe_finished(tab_id, seq, repo, outcome, &mut effects);
            }
            event => {
                if matches!(event, TabEvent::ActionClicked { .. }) && !self.store.contains(tab_id) {
                    log::debug!("Tab {} has no restored state, treating click as closed", tab_id);
                }
                let config = &self.config;
                let state = self.store.entry(tab_id);
                let mut tx = Transition {
                    config,
                    state,
                    now,
                    effects: &mut effects,
                };
                match event {
                    TabEvent::ActionClicked { url } => tx.action_clicked(url.as_deref()),
                    TabEvent::UrlChanged { url } => tx.url_changed(&url),
                    TabEvent::Activated { url } => tx.activated(url.as_deref()),
                    TabEvent::PanelClosed => tx.panel_closed(),
                    TabEvent::Removed | TabEvent::ProbeFinished { .. } => {}
                }
            }
        }

        effects
    }

    fn on_probe_finished(
        &self,
        tab_id: TabId,
        seq: u64,
        repo: RepoIdentity,
        outcome: ProbeOutcome,
        effects: &mut Vec<Effect>,
    ) {
        let Some(state) = self.store.get(tab_id) else {
            return;
        };

        if state.seq != seq || !state.is_open || !repo.same_as(state.repo.as_ref()) {
            log::debug!("Dropping stale probe result for {} on tab {}", repo, tab_id);
            return;
        }

        let fallback = outcome == ProbeOutcome::NotFound;
        if fallback {
            log::info!("No DeepWiki page for {}, showing homepage", repo);
        }
        effects.push(Effect::Send {
            tab_id,
            seq,
            message: PanelMessage::update(tab_id, &repo, fallback),
        });
    }
}

/// One event applied to one tab
struct Transition<'a> {
    config: &'a ExtensionConfig,
    state: &'a mut TabPanelState,
    now: f64,
    effects: &'a mut Vec<Effect>,
}

impl Transition<'_> {
    fn resolve(&self, url: Option<&str>) -> Option<RepoIdentity> {
        url.and_then(|u| resolve(u, &self.config.source_host))
    }

    fn action_clicked(&mut self, url: Option<&str>) {
        if self.state.is_open {
            log::info!("Closing panel for tab {}", self.state.tab_id);
            self.close();
            return;
        }

        match self.resolve(url) {
            Some(repo) => {
                log::info!("Opening panel for {} on tab {}", repo, self.state.tab_id);
                self.set_enabled(true);
                self.effects.push(Effect::OpenPanel {
                    tab_id: self.state.tab_id,
                });
                self.state.is_open = true;
                self.show(repo);
            }
            None => {
                log::info!("Not a GitHub repository page: {}", url.unwrap_or_default());
            }
        }
    }

    fn url_changed(&mut self, url: &str) {
        let repo = self.resolve(Some(url));

        if !self.state.is_open {
            self.set_enabled(repo.is_some());
            if repo != self.state.repo {
                self.state.seq += 1;
                self.state.repo = repo;
                self.state.last_updated = self.now;
                self.persist();
            }
            return;
        }

        match repo {
            Some(repo) if repo.same_as(self.state.repo.as_ref()) => {
                log::debug!("Same repo {}, no update needed", repo);
            }
            Some(repo) => {
                log::info!("Repo changed to {} on tab {}", repo, self.state.tab_id);
                self.show(repo);
            }
            None => {
                log::info!("Left repository pages, closing panel for tab {}", self.state.tab_id);
                self.close();
            }
        }
    }

    fn activated(&mut self, url: Option<&str>) {
        let enabled = self.resolve(url).is_some();
        self.set_enabled(enabled);
    }

    fn panel_closed(&mut self) {
        if !self.state.is_open {
            return;
        }
        self.state.seq += 1;
        self.state.is_open = false;
        self.state.last_updated = self.now;
        self.persist();
    }

    /// Record `repo` as shown and ask for its content
    fn show(&mut self, repo: RepoIdentity) {
        self.state.seq += 1;
        let tab_id = self.state.tab_id;
        let seq = self.state.seq;

        self.state.repo = Some(repo.clone());
        self.state.last_updated = self.now;
        self.persist();

        if self.config.probe_enabled {
            let url = content_url(&repo, self.config);
            self.effects.push(Effect::Probe {
                tab_id,
                seq,
                repo,
                url,
            });
        } else {
            self.effects.push(Effect::Send {
                tab_id,
                seq,
                message: PanelMessage::update(tab_id, &repo, false),
            });
        }
    }

    fn close(&mut self) {
        self.state.seq += 1;
        let tab_id = self.state.tab_id;
        self.effects.push(Effect::Send {
            tab_id,
            seq: self.state.seq,
            message: PanelMessage::Close { tab_id },
        });
        self.set_enabled(false);

        self.state.is_open = false;
        self.state.repo = None;
        self.state.last_updated = self.now;
        self.effects.push(Effect::Forget {
            tab_id,
            seq: self.state.seq,
        });
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.state.panel_enabled == Some(enabled) {
            return;
        }
        self.state.panel_enabled = Some(enabled);
        self.effects.push(Effect::SetPanelEnabled {
            tab_id: self.state.tab_id,
            enabled,
        });
    }

    fn persist(&mut self) {
        let tab_id = self.state.tab_id;
        let seq = self.state.seq;
        match self.state.to_stored() {
            Some(stored) => self.effects.push(Effect::Persist { tab_id, seq, stored }),
            None => self.effects.push(Effect::Forget { tab_id, seq }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAB: TabId = 7;
    const NOW: f64 = 1698508200000.0;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(TabStateStore::new(), ExtensionConfig::default())
    }

    fn dispatcher_without_probe() -> Dispatcher {
        let config = ExtensionConfig {
            probe_enabled: false,
            ..ExtensionConfig::default()
        };
        Dispatcher::new(TabStateStore::new(), config)
    }

    fn click(url: &str) -> TabEvent {
        TabEvent::ActionClicked {
            url: Some(url.to_string()),
        }
    }

    fn navigate(url: &str) -> TabEvent {
        TabEvent::UrlChanged {
            url: url.to_string(),
        }
    }

    fn sent(effects: &[Effect]) -> Vec<PanelMessage> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn probe(effects: &[Effect]) -> (u64, RepoIdentity, String) {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Probe { seq, repo, url, .. } => Some((*seq, repo.clone(), url.clone())),
                _ => None,
            })
            .expect("probe effect")
    }

    fn finish(d: &mut Dispatcher, seq: u64, repo: RepoIdentity, outcome: ProbeOutcome) -> Vec<Effect> {
        d.handle(TAB, TabEvent::ProbeFinished { seq, repo, outcome }, NOW)
    }

    #[test]
    fn test_click_opens_panel_on_repo() {
        let mut d = dispatcher();
        let effects = d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        assert_eq!(effects[0], Effect::SetPanelEnabled { tab_id: TAB, enabled: true });
        assert_eq!(effects[1], Effect::OpenPanel { tab_id: TAB });
        assert!(effects.contains(&Effect::Persist {
            tab_id: TAB,
            seq: 1,
            stored: StoredPanelState {
                owner: "foo".to_string(),
                name: "bar".to_string(),
                is_open: true,
                timestamp: NOW,
            },
        }));

        let (seq, repo, url) = probe(&effects);
        assert_eq!(url, "https://deepwiki.com/foo/bar");

        let effects = finish(&mut d, seq, repo, ProbeOutcome::Found);
        assert_eq!(
            sent(&effects),
            vec![PanelMessage::update(TAB, &RepoIdentity::new("foo", "bar"), false)]
        );

        let state = d.store().get(TAB).unwrap();
        assert!(state.is_open);
        assert_eq!(state.repo, Some(RepoIdentity::new("foo", "bar")));
    }

    #[test]
    fn test_click_without_probe_sends_directly() {
        let mut d = dispatcher_without_probe();
        let effects = d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        assert_eq!(
            sent(&effects),
            vec![PanelMessage::update(TAB, &RepoIdentity::new("foo", "bar"), false)]
        );
        assert!(!effects.iter().any(|e| matches!(e, Effect::Probe { .. })));
    }

    #[test]
    fn test_click_on_non_repo_page_does_nothing() {
        let mut d = dispatcher();

        assert!(d.handle(TAB, click("https://github.com/settings/profile"), NOW).is_empty());
        assert!(d.handle(TAB, TabEvent::ActionClicked { url: None }, NOW).is_empty());
        assert!(!d.store().get(TAB).unwrap().is_open);
    }

    #[test]
    fn test_second_click_closes_panel() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let effects = d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        assert_eq!(sent(&effects), vec![PanelMessage::Close { tab_id: TAB }]);
        assert!(effects.contains(&Effect::SetPanelEnabled { tab_id: TAB, enabled: false }));
        assert!(effects.contains(&Effect::Forget { tab_id: TAB, seq: 2 }));

        let state = d.store().get(TAB).unwrap();
        assert!(!state.is_open);
        assert_eq!(state.repo, None);
    }

    #[test]
    fn test_same_repo_navigation_is_noop() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let effects = d.handle(TAB, navigate("https://github.com/foo/bar/issues/5"), NOW);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_navigation_to_other_repo_updates() {
        let mut d = dispatcher_without_probe();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let effects = d.handle(TAB, navigate("https://github.com/foo/baz/pulls"), NOW);

        assert_eq!(
            sent(&effects),
            vec![PanelMessage::update(TAB, &RepoIdentity::new("foo", "baz"), false)]
        );
        assert_eq!(
            d.store().get(TAB).unwrap().repo,
            Some(RepoIdentity::new("foo", "baz"))
        );
    }

    #[test]
    fn test_navigation_to_settings_closes_and_clears() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let effects = d.handle(TAB, navigate("https://github.com/settings/profile"), NOW);

        assert_eq!(sent(&effects), vec![PanelMessage::Close { tab_id: TAB }]);
        assert!(effects.contains(&Effect::Forget { tab_id: TAB, seq: 2 }));

        let state = d.store().get(TAB).unwrap();
        assert!(!state.is_open);
        assert_eq!(state.repo, None);
    }

    #[test]
    fn test_out_of_order_probe_keeps_newest_repo() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let (seq_a, repo_a, _) = probe(&d.handle(TAB, navigate("https://github.com/foo/a"), NOW));
        let (seq_b, repo_b, _) = probe(&d.handle(TAB, navigate("https://github.com/foo/b"), NOW));

        let effects_b = finish(&mut d, seq_b, repo_b.clone(), ProbeOutcome::Found);
        let effects_a = finish(&mut d, seq_a, repo_a, ProbeOutcome::Found);

        assert_eq!(sent(&effects_b), vec![PanelMessage::update(TAB, &repo_b, false)]);
        assert!(effects_a.is_empty());
        assert!(!d.is_current(TAB, seq_a));
        assert!(d.is_current(TAB, seq_b));
        assert_eq!(d.store().get(TAB).unwrap().repo, Some(repo_b));
    }

    #[test]
    fn test_same_repo_navigation_keeps_pending_probe() {
        let mut d = dispatcher();
        let (seq, repo, _) = probe(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));
        d.handle(TAB, navigate("https://github.com/foo/bar/issues"), NOW);
        d.handle(
            TAB,
            TabEvent::Activated {
                url: Some("https://github.com/foo/bar/pulls".to_string()),
            },
            NOW,
        );

        let effects = finish(&mut d, seq, repo.clone(), ProbeOutcome::Found);
        assert_eq!(sent(&effects), vec![PanelMessage::update(TAB, &repo, false)]);
    }

    #[test]
    fn test_probe_after_close_is_dropped() {
        let mut d = dispatcher();
        let (seq, repo, _) = probe(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        assert!(finish(&mut d, seq, repo, ProbeOutcome::Found).is_empty());
    }

    #[test]
    fn test_probe_not_found_requests_fallback() {
        let mut d = dispatcher();
        let (seq, repo, _) = probe(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));

        let effects = finish(&mut d, seq, repo.clone(), ProbeOutcome::NotFound);
        assert_eq!(sent(&effects), vec![PanelMessage::update(TAB, &repo, true)]);
    }

    #[test]
    fn test_probe_unreachable_fails_open() {
        let mut d = dispatcher();
        let (seq, repo, _) = probe(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));

        let effects = finish(&mut d, seq, repo.clone(), ProbeOutcome::Unreachable);
        assert_eq!(sent(&effects), vec![PanelMessage::update(TAB, &repo, false)]);
    }

    #[test]
    fn test_probe_status_mapping() {
        assert_eq!(ProbeOutcome::from_status(200), ProbeOutcome::Found);
        assert_eq!(ProbeOutcome::from_status(301), ProbeOutcome::Found);
        assert_eq!(ProbeOutcome::from_status(404), ProbeOutcome::NotFound);
        assert_eq!(ProbeOutcome::from_status(0), ProbeOutcome::Unreachable);
    }

    #[test]
    fn test_closed_navigation_only_bookkeeps() {
        let mut d = dispatcher();

        let effects = d.handle(TAB, navigate("https://github.com/foo/bar"), NOW);
        assert!(sent(&effects).is_empty());
        assert!(effects.contains(&Effect::SetPanelEnabled { tab_id: TAB, enabled: true }));
        assert!(effects.iter().any(|e| matches!(e, Effect::Persist { .. })));
        assert_eq!(d.store().get(TAB).unwrap().repo, Some(RepoIdentity::new("foo", "bar")));

        let again = d.handle(TAB, navigate("https://github.com/foo/bar/tree/main"), NOW);
        assert!(again.is_empty());

        let away = d.handle(TAB, navigate("https://example.com/"), NOW);
        assert_eq!(
            away,
            vec![
                Effect::SetPanelEnabled { tab_id: TAB, enabled: false },
                Effect::Forget { tab_id: TAB, seq: 2 },
            ]
        );
    }

    #[test]
    fn test_activation_only_toggles_enablement() {
        let mut d = dispatcher();
        let url = Some("https://github.com/foo/bar".to_string());

        let effects = d.handle(TAB, TabEvent::Activated { url: url.clone() }, NOW);
        assert_eq!(effects, vec![Effect::SetPanelEnabled { tab_id: TAB, enabled: true }]);

        assert!(d.handle(TAB, TabEvent::Activated { url }, NOW).is_empty());

        let effects = d.handle(TAB, TabEvent::Activated { url: None }, NOW);
        assert_eq!(effects, vec![Effect::SetPanelEnabled { tab_id: TAB, enabled: false }]);
        assert!(!d.store().get(TAB).unwrap().is_open);
    }

    #[test]
    fn test_removed_clears_state() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);
        d.handle(8, click("https://github.com/other/repo"), NOW);

        let effects = d.handle(TAB, TabEvent::Removed, NOW);

        assert_eq!(effects, vec![Effect::Forget { tab_id: TAB, seq: 1 }]);
        assert!(d.store().get(TAB).is_none());
        assert!(d.store().get(8).is_some());
        assert!(!d.needs_hydration(TAB));
    }

    #[test]
    fn test_panel_closed_by_user() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);

        let effects = d.handle(TAB, TabEvent::PanelClosed, NOW + 1.0);
        assert_eq!(
            effects,
            vec![Effect::Persist {
                tab_id: TAB,
                seq: 2,
                stored: StoredPanelState {
                    owner: "foo".to_string(),
                    name: "bar".to_string(),
                    is_open: false,
                    timestamp: NOW + 1.0,
                },
            }]
        );

        assert!(d.handle(TAB, TabEvent::PanelClosed, NOW).is_empty());

        let reopen = d.handle(TAB, click("https://github.com/foo/bar"), NOW);
        assert!(reopen.contains(&Effect::OpenPanel { tab_id: TAB }));
    }

    #[test]
    fn test_hydrated_open_state_survives_restart() {
        let mut d = dispatcher_without_probe();
        d.hydrate(
            TAB,
            Some(StoredPanelState {
                owner: "foo".to_string(),
                name: "bar".to_string(),
                is_open: true,
                timestamp: NOW,
            }),
        );

        assert!(d.handle(TAB, navigate("https://github.com/foo/bar/wiki"), NOW).is_empty());

        let effects = d.handle(TAB, navigate("https://github.com/foo/qux"), NOW);
        assert_eq!(
            sent(&effects),
            vec![PanelMessage::update(TAB, &RepoIdentity::new("foo", "qux"), false)]
        );
    }

    fn persisted(effects: &[Effect]) -> Effect {
        effects
            .iter()
            .find(|e| matches!(e, Effect::Persist { .. }))
            .cloned()
            .expect("persist effect")
    }

    #[test]
    fn test_restore_finishing_after_removal_is_dropped() {
        let mut d = dispatcher();
        assert!(d.needs_hydration(TAB));

        // UrlChanged is waiting on its storage read when the tab closes
        d.handle(TAB, TabEvent::Removed, NOW);
        d.hydrate(TAB, None);
        let effects = d.handle(TAB, navigate("https://github.com/foo/bar"), NOW);

        assert!(effects.is_empty());
        assert!(!d.store().contains(TAB));
        assert!(d.store().is_empty());
    }

    #[test]
    fn test_events_after_removal_are_ignored() {
        let mut d = dispatcher();
        let (seq, repo, _) = probe(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));
        d.handle(TAB, TabEvent::Removed, NOW);

        assert!(finish(&mut d, seq, repo, ProbeOutcome::Found).is_empty());
        assert!(d.handle(TAB, click("https://github.com/foo/bar"), NOW).is_empty());
        assert!(d.handle(TAB, TabEvent::Removed, NOW).is_empty());
        assert!(!d.store().contains(TAB));
    }

    #[test]
    fn test_older_persist_is_not_written_after_newer_one() {
        let mut d = dispatcher();
        let click_persist = persisted(&d.handle(TAB, click("https://github.com/foo/a"), NOW));
        let nav_persist = persisted(&d.handle(TAB, navigate("https://github.com/foo/b"), NOW));

        // the navigation's write runs while the click is still opening the panel
        assert!(d.should_write(&nav_persist));
        assert!(!d.should_write(&click_persist));
    }

    #[test]
    fn test_persist_after_removal_is_not_written() {
        let mut d = dispatcher();
        let stale = persisted(&d.handle(TAB, click("https://github.com/foo/bar"), NOW));
        let effects = d.handle(TAB, TabEvent::Removed, NOW);

        assert!(!d.should_write(&stale));
        assert!(effects.iter().all(|e| d.should_write(e)));
    }

    #[test]
    fn test_forget_from_close_yields_to_later_persist() {
        let mut d = dispatcher();
        d.handle(TAB, click("https://github.com/foo/bar"), NOW);
        let close = d.handle(TAB, navigate("https://github.com/settings"), NOW);
        let forget = close
            .iter()
            .find(|e| matches!(e, Effect::Forget { .. }))
            .cloned()
            .expect("forget effect");
        assert!(d.should_write(&forget));

        let bookkeeping = persisted(&d.handle(TAB, navigate("https://github.com/foo/baz"), NOW));
        assert!(!d.should_write(&forget));
        assert!(d.should_write(&bookkeeping));
    }

    #[test]
    fn test_click_on_unrestored_tab_opens() {
        let mut d = dispatcher();
        assert!(d.needs_hydration(TAB));

        let effects = d.handle(TAB, click("https://github.com/foo/bar"), NOW);
        assert!(effects.contains(&Effect::OpenPanel { tab_id: TAB }));
        assert!(d.store().get(TAB).unwrap().is_open);
    }
}
