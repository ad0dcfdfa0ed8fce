/// Side panel content controller
///
/// Owns what the embedded documentation frame should display. The
/// controller itself never touches the DOM or timers: each call returns
/// the effects to run, and timer callbacks come back in carrying the token
/// they were started with. Any new load, hide or completion moves the token
/// on, which is how pending timers get cancelled.
use crate::config::ExtensionConfig;
use crate::error::ExtensionError;
use crate::messenger::PanelMessage;
use crate::repo::{content_url, homepage_url, RepoIdentity};
use crate::state::TabId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub timeout_ms: u32,
    pub retry_delay_ms: u32,
    /// Attempts allowed after the first one
    pub max_retries: u32,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        LoadPolicy {
            timeout_ms: 10_000,
            retry_delay_ms: 2_000,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelTarget {
    Repo(RepoIdentity),
    Homepage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    /// Nothing requested yet
    Empty,
    Loading,
    Content,
    Failed(String),
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEffect {
    SetSource(String),
    StartLoadTimer { token: u64, after_ms: u32 },
    ScheduleRetry { token: u64, after_ms: u32 },
}

#[derive(Debug)]
pub struct PanelController {
    policy: LoadPolicy,
    config: ExtensionConfig,
    target: Option<PanelTarget>,
    /// Last repo asked for, kept while the homepage is shown
    repo: Option<RepoIdentity>,
    view: PanelView,
    retries: u32,
    token: u64,
}

impl PanelController {
    pub fn new(config: &ExtensionConfig) -> PanelController {
        PanelController {
            policy: config.load_policy(),
            config: config.clone(),
            target: None,
            repo: None,
            view: PanelView::Empty,
            retries: 0,
            token: 0,
        }
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn repo(&self) -> Option<&RepoIdentity> {
        self.repo.as_ref()
    }

    pub fn target(&self) -> Option<&PanelTarget> {
        self.target.as_ref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    fn url_for(&self, target: &PanelTarget) -> String {
        match target {
            PanelTarget::Repo(repo) => content_url(repo, &self.config),
            PanelTarget::Homepage => homepage_url(&self.config),
        }
    }

    /// Load documentation for `repo`
    ///
    /// Asking for the target that is already loading or displayed does
    /// nothing, so duplicate messages cause no reload.
    pub fn show(&mut self, repo: &RepoIdentity) -> Vec<PanelEffect> {
        self.show_target(repo, PanelTarget::Repo(repo.clone()))
    }

    pub fn update(&mut self, repo: &RepoIdentity) -> Vec<PanelEffect> {
        self.show(repo)
    }

    /// Show the repo stored for this tab when the panel opens
    ///
    /// The stored value is only a starting point: once a message has moved
    /// the panel off `Empty` it is newer than anything read from storage.
    pub fn restore(&mut self, repo: &RepoIdentity) -> Vec<PanelEffect> {
        if self.view != PanelView::Empty {
            log::debug!("Panel already updated, ignoring stored {}", repo);
            return Vec::new();
        }
        self.show(repo)
    }

    /// Show the homepage on behalf of `repo`, whose page does not exist
    pub fn show_fallback(&mut self, repo: &RepoIdentity) -> Vec<PanelEffect> {
        self.show_target(repo, PanelTarget::Homepage)
    }

    fn show_target(&mut self, repo: &RepoIdentity, target: PanelTarget) -> Vec<PanelEffect> {
        let active = matches!(self.view, PanelView::Loading | PanelView::Content);
        if active && self.target.as_ref() == Some(&target) && repo.same_as(self.repo.as_ref()) {
            log::debug!("Panel already showing {}, skipping reload", repo);
            return Vec::new();
        }

        self.repo = Some(repo.clone());
        self.target = Some(target);
        self.retries = 0;
        self.begin_load()
    }

    pub fn hide(&mut self) -> Vec<PanelEffect> {
        self.token += 1;
        self.target = None;
        self.retries = 0;
        self.view = PanelView::Hidden;
        Vec::new()
    }

    fn begin_load(&mut self) -> Vec<PanelEffect> {
        let Some(target) = self.target.as_ref() else {
            return Vec::new();
        };
        let url = self.url_for(target);
        log::info!("Loading {}", url);

        self.token += 1;
        self.view = PanelView::Loading;
        vec![
            PanelEffect::SetSource(url),
            PanelEffect::StartLoadTimer {
                token: self.token,
                after_ms: self.policy.timeout_ms,
            },
        ]
    }

    fn is_current_load(&self, token: u64) -> bool {
        token == self.token && self.view == PanelView::Loading
    }

    pub fn load_complete(&mut self, token: u64) -> Vec<PanelEffect> {
        if !self.is_current_load(token) {
            return Vec::new();
        }
        self.token += 1;
        self.retries = 0;
        self.view = PanelView::Content;
        Vec::new()
    }

    pub fn load_failed(&mut self, token: u64) -> Vec<PanelEffect> {
        self.fail(token, "Failed to load the documentation page")
    }

    pub fn load_timed_out(&mut self, token: u64) -> Vec<PanelEffect> {
        self.fail(
            token,
            "Loading timeout. The documentation might not be available for this repository.",
        )
    }

    fn fail(&mut self, token: u64, message: &str) -> Vec<PanelEffect> {
        if !self.is_current_load(token) {
            return Vec::new();
        }
        self.token += 1;

        if self.retries < self.policy.max_retries {
            self.retries += 1;
            log::warn!(
                "{}; retrying ({}/{})",
                message,
                self.retries,
                self.policy.max_retries
            );
            return vec![PanelEffect::ScheduleRetry {
                token: self.token,
                after_ms: self.policy.retry_delay_ms,
            }];
        }

        if let Some(target) = self.target.as_ref() {
            let err = ExtensionError::ContentLoad {
                url: self.url_for(target),
            };
            log::error!("{}: {}", err, message);
        }
        self.view = PanelView::Failed(message.to_string());
        Vec::new()
    }

    pub fn retry_due(&mut self, token: u64) -> Vec<PanelEffect> {
        if !self.is_current_load(token) {
            return Vec::new();
        }
        self.begin_load()
    }

    /// Manual retry from the error view
    pub fn retry(&mut self) -> Vec<PanelEffect> {
        if self.target.is_none() {
            self.target = self.repo.clone().map(PanelTarget::Repo);
        }
        self.retries = 0;
        self.begin_load()
    }

    /// Navigate to the documentation homepage on explicit user request
    pub fn open_fallback(&mut self) -> Vec<PanelEffect> {
        self.target = Some(PanelTarget::Homepage);
        self.retries = 0;
        self.begin_load()
    }
}

/// Background messages, filtered to the tab this panel belongs to
///
/// Until the panel has looked up its own tab, messages are held back
/// instead of being used to guess it.
#[derive(Debug, Default)]
pub struct PanelInbox {
    tab_id: Option<TabId>,
    held: Vec<PanelMessage>,
}

impl PanelInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.tab_id
    }

    /// Returns the message when it is addressed to this panel
    pub fn accept(&mut self, message: PanelMessage) -> Option<PanelMessage> {
        match self.tab_id {
            Some(tab_id) if message.tab_id() == tab_id => Some(message),
            Some(_) => None,
            None => {
                self.held.push(message);
                None
            }
        }
    }

    /// Settle the panel's tab and return the held messages meant for it
    pub fn bind(&mut self, tab_id: TabId) -> Vec<PanelMessage> {
        self.tab_id = Some(tab_id);
        std::mem::take(&mut self.held)
            .into_iter()
            .filter(|m| m.tab_id() == tab_id)
            .collect()
    }
}
