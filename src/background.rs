/// Background service worker: wires browser events into the dispatcher
/// and performs the effects it returns
use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::bridge::{self, ChromeTransport};
use crate::config::{ExtensionConfig, CONFIG_STORAGE_KEY};
use crate::dispatcher::{Dispatcher, Effect, ProbeOutcome, TabEvent};
use crate::error::ExtensionError;
use crate::messenger::{deliver, PanelMessage};
use crate::state::{TabId, TabStateStore};

struct Background {
    dispatcher: RefCell<Dispatcher>,
    transport: ChromeTransport,
}

/// Register every listener; must run synchronously when the worker starts
pub fn start() {
    let background = Rc::new(Background {
        dispatcher: RefCell::new(Dispatcher::new(
            TabStateStore::new(),
            ExtensionConfig::default(),
        )),
        transport: ChromeTransport,
    });

    register_listeners(&background);

    spawn_local(async move {
        if let Err(e) = bridge::take_over_action_click().await {
            log::error!("Failed to set panel behavior: {}", e);
        }
        match bridge::load_json(CONFIG_STORAGE_KEY).await {
            Ok(value) => {
                let config = ExtensionConfig::from_json(&value);
                log::set_max_level(config.level_filter());
                background.dispatcher.borrow_mut().set_config(config);
            }
            Err(e) => log::warn!("Using default configuration: {}", e),
        }
    });

    log::info!("DeepWiki background started");
}

fn register_listeners(background: &Rc<Background>) {
    let bg = background.clone();
    let on_clicked = Closure::wrap(Box::new(move |tab: JsValue| {
        let Some(tab) = bridge::parse_tab(tab) else {
            return;
        };
        let Some(tab_id) = tab.id else {
            log::info!("No tab ID for action click");
            return;
        };
        dispatch(&bg, tab_id, TabEvent::ActionClicked { url: tab.url });
    }) as Box<dyn FnMut(JsValue)>);
    bridge::onActionClicked(&on_clicked);
    on_clicked.forget();

    let bg = background.clone();
    let on_updated = Closure::wrap(Box::new(move |tab_id: TabId, change: JsValue, tab: JsValue| {
        let change = bridge::parse_change(change);
        let url = match change.url {
            Some(url) => Some(url),
            None if change.status.as_deref() == Some("complete") => {
                bridge::parse_tab(tab).and_then(|t| t.url)
            }
            None => None,
        };
        if let Some(url) = url {
            dispatch(&bg, tab_id, TabEvent::UrlChanged { url });
        }
    }) as Box<dyn FnMut(TabId, JsValue, JsValue)>);
    bridge::onTabUpdated(&on_updated);
    on_updated.forget();

    let bg = background.clone();
    let on_activated = Closure::wrap(Box::new(move |tab_id: TabId| {
        let bg = bg.clone();
        spawn_local(async move {
            match bridge::tab(tab_id).await {
                Ok(tab) => {
                    let url = tab.and_then(|t| t.url);
                    dispatch(&bg, tab_id, TabEvent::Activated { url });
                }
                Err(e) => log::warn!("Could not read activated tab {}: {}", tab_id, e),
            }
        });
    }) as Box<dyn FnMut(TabId)>);
    bridge::onTabActivated(&on_activated);
    on_activated.forget();

    let bg = background.clone();
    let on_removed = Closure::wrap(Box::new(move |tab_id: TabId| {
        dispatch(&bg, tab_id, TabEvent::Removed);
    }) as Box<dyn FnMut(TabId)>);
    bridge::onTabRemoved(&on_removed);
    on_removed.forget();

    let bg = background.clone();
    let on_installed = Closure::wrap(Box::new(move || {
        log::info!("Extension installed/enabled");
        let bg = bg.clone();
        spawn_local(async move {
            match bridge::active_tab().await {
                Ok(Some(tab)) => {
                    if let Some(tab_id) = tab.id {
                        dispatch(&bg, tab_id, TabEvent::Activated { url: tab.url });
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("Could not read active tab on install: {}", e),
            }
        });
    }) as Box<dyn FnMut()>);
    bridge::onInstalled(&on_installed);
    on_installed.forget();

    let bg = background.clone();
    let on_message = Closure::wrap(Box::new(move |message: JsValue| {
        match bridge::parse_message(message) {
            Some(PanelMessage::PanelClosed { tab_id }) => {
                dispatch(&bg, tab_id, TabEvent::PanelClosed);
                true
            }
            _ => false,
        }
    }) as Box<dyn FnMut(JsValue) -> bool>);
    bridge::onPanelMessage(&on_message);
    on_message.forget();
}

fn dispatch(background: &Rc<Background>, tab_id: TabId, event: TabEvent) {
    let bg = background.clone();
    spawn_local(run(bg, tab_id, event));
}

async fn run(bg: Rc<Background>, tab_id: TabId, event: TabEvent) {
    // The click must reach sidePanel.open while the user gesture is live,
    // so it never waits on storage. A removal that lands during the read
    // makes the dispatcher drop both the stored state and this event.
    let wants_hydration = !matches!(
        event,
        TabEvent::ActionClicked { .. } | TabEvent::Removed | TabEvent::ProbeFinished { .. }
    );
    if wants_hydration && bg.dispatcher.borrow().needs_hydration(tab_id) {
        match bridge::load_state(tab_id).await {
            Ok(stored) => bg.dispatcher.borrow_mut().hydrate(tab_id, stored),
            Err(e) => log::warn!("Could not restore state for tab {}: {}", tab_id, e),
        }
    }

    log::debug!("Tab {}: {:?}", tab_id, event);
    let effects = bg
        .dispatcher
        .borrow_mut()
        .handle(tab_id, event, js_sys::Date::now());

    for effect in effects {
        if let Err(e) = perform(&bg, effect).await {
            log::error!("Tab {}: {}", tab_id, e);
        }
    }
}

async fn perform(bg: &Rc<Background>, effect: Effect) -> Result<(), ExtensionError> {
    if !bg.dispatcher.borrow().should_write(&effect) {
        log::debug!("Skipping outdated write: {:?}", effect);
        return Ok(());
    }

    match effect {
        Effect::SetPanelEnabled { tab_id, enabled } => {
            let path = bg.dispatcher.borrow().config().panel_path.clone();
            if let Err(e) = bridge::set_panel_enabled(tab_id, enabled, &path).await {
                bg.dispatcher.borrow_mut().reset_enablement(tab_id);
                return Err(e);
            }
            log::debug!("Side panel {} for tab {}", if enabled { "enabled" } else { "disabled" }, tab_id);
        }
        Effect::OpenPanel { tab_id } => {
            if let Err(e) = bridge::open_panel(tab_id).await {
                dispatch(bg, tab_id, TabEvent::PanelClosed);
                return Err(e);
            }
            log::info!("Side panel opened for tab {}", tab_id);
        }
        Effect::Persist { tab_id, stored, .. } => bridge::save_state(tab_id, &stored).await?,
        Effect::Forget { tab_id, .. } => bridge::forget_state(tab_id).await?,
        Effect::Probe {
            tab_id,
            seq,
            repo,
            url,
        } => {
            let timeout = bg.dispatcher.borrow().config().probe_timeout_ms;
            let bg = bg.clone();
            spawn_local(async move {
                let outcome = ProbeOutcome::from_status(bridge::probe(&url, timeout).await);
                log::debug!("Probe {} -> {:?}", url, outcome);
                dispatch(&bg, tab_id, TabEvent::ProbeFinished { seq, repo, outcome });
            });
        }
        Effect::Send {
            tab_id,
            seq,
            message,
        } => {
            let policy = bg.dispatcher.borrow().config().retry_policy();
            let bg = bg.clone();
            spawn_local(async move {
                let still_current = || bg.dispatcher.borrow().is_current(tab_id, seq);
                match deliver(&bg.transport, policy, &message, still_current).await {
                    Ok(attempts) => log::debug!("Message delivered after {} attempt(s)", attempts),
                    Err(ExtensionError::Superseded) => {}
                    Err(e) => log::warn!("Could not reach side panel for tab {}: {}", tab_id, e),
                }
            });
        }
    }
    Ok(())
}
