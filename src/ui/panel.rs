/// Side panel UI: the DeepWiki frame plus loading and error states

use std::cell::RefCell;
use std::rc::Rc;

use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::bridge;
use crate::config::{ExtensionConfig, CONFIG_STORAGE_KEY};
use crate::messenger::PanelMessage;
use crate::panel::{PanelController, PanelEffect, PanelInbox, PanelView};
use crate::repo::RepoIdentity;

/// What the iframe is pointed at; a new token remounts it so a retry of
/// the same URL really reloads.
#[derive(Clone, PartialEq)]
struct Frame {
    token: u64,
    url: String,
}

#[derive(Clone)]
struct PanelHandle {
    controller: Rc<RefCell<PanelController>>,
    inbox: Rc<RefCell<PanelInbox>>,
    view: UseStateHandle<PanelView>,
    frame: UseStateHandle<Option<Frame>>,
}

impl PanelHandle {
    /// Run one controller operation and carry out the effects it returns
    fn apply(&self, op: impl FnOnce(&mut PanelController) -> Vec<PanelEffect>) {
        self.apply_boxed(Box::new(op));
    }

    fn apply_boxed(&self, op: Box<dyn FnOnce(&mut PanelController) -> Vec<PanelEffect> + '_>) {
        let (effects, view, token) = {
            let mut controller = self.controller.borrow_mut();
            let effects = op(&mut *controller);
            (effects, controller.view().clone(), controller.token())
        };
        self.view.set(view);

        for effect in effects {
            match effect {
                PanelEffect::SetSource(url) => self.frame.set(Some(Frame { token, url })),
                PanelEffect::StartLoadTimer { token, after_ms } => {
                    let handle = self.clone();
                    spawn_local(async move {
                        bridge::pause(after_ms).await;
                        handle.apply(|c| c.load_timed_out(token));
                    });
                }
                PanelEffect::ScheduleRetry { token, after_ms } => {
                    let handle = self.clone();
                    spawn_local(async move {
                        bridge::pause(after_ms).await;
                        handle.apply(|c| c.retry_due(token));
                    });
                }
            }
        }
    }

    /// Handle a background message; true when it was addressed to this panel.
    /// Messages that arrive before the panel knows its tab go unanswered, so
    /// the background retries them.
    fn receive(&self, message: PanelMessage) -> bool {
        let accepted = self.inbox.borrow_mut().accept(message);
        match accepted {
            Some(message) => {
                self.act_on(message);
                true
            }
            None => false,
        }
    }

    fn act_on(&self, message: PanelMessage) {
        match message {
            PanelMessage::UpdateRepo {
                owner,
                name,
                fallback,
                ..
            } => {
                let repo = RepoIdentity::new(owner, name);
                log::info!("Updating repo to {}", repo);
                if fallback {
                    self.apply(|c| c.show_fallback(&repo));
                } else {
                    self.apply(|c| c.update(&repo));
                }
            }
            PanelMessage::Close { .. } => {
                self.apply(|c| c.hide());
            }
            PanelMessage::PanelClosed { .. } => {}
        }
    }

    /// Configure, find our tab and show whatever the background stored for it
    async fn restore(&self) {
        match bridge::load_json(CONFIG_STORAGE_KEY).await {
            Ok(value) => {
                let config = ExtensionConfig::from_json(&value);
                log::set_max_level(config.level_filter());
                let mut controller = self.controller.borrow_mut();
                if *controller.view() == PanelView::Empty {
                    *controller = PanelController::new(&config);
                }
            }
            Err(e) => log::warn!("Using default configuration: {}", e),
        }

        let tab_id = match bridge::active_tab().await {
            Ok(Some(tab)) => tab.id,
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to find the current tab: {}", e);
                None
            }
        };
        let Some(tab_id) = tab_id else {
            return;
        };
        let held = self.inbox.borrow_mut().bind(tab_id);
        for message in held {
            self.act_on(message);
        }

        match bridge::load_state(tab_id).await {
            Ok(Some(stored)) => {
                let repo = stored.repo();
                log::info!("Loading DeepWiki content for {}", repo);
                self.apply(|c| c.restore(&repo));
            }
            Ok(None) => log::info!("No repo info found in storage"),
            Err(e) => log::error!("Failed to load repository information: {}", e),
        }
    }
}

fn listen_for_messages(handle: PanelHandle) {
    let on_message = Closure::wrap(Box::new(move |message: JsValue| {
        match bridge::parse_message(message) {
            Some(message) => handle.receive(message),
            None => false,
        }
    }) as Box<dyn FnMut(JsValue) -> bool>);
    bridge::onPanelMessage(&on_message);
    on_message.forget();
}

fn report_close_on_pagehide(inbox: Rc<RefCell<PanelInbox>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let on_hide = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tab_id) = inbox.borrow().tab_id() {
            bridge::post(&PanelMessage::PanelClosed { tab_id });
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    if let Err(e) = window.add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref()) {
        log::warn!("Could not watch for panel close: {:?}", e);
    }
    on_hide.forget();
}

#[function_component(PanelApp)]
pub fn panel_app() -> Html {
    let controller = use_mut_ref(|| PanelController::new(&ExtensionConfig::default()));
    let inbox = use_mut_ref(PanelInbox::new);
    let view = use_state(|| PanelView::Empty);
    let frame = use_state(|| None::<Frame>);

    let handle = PanelHandle {
        controller,
        inbox,
        view: view.clone(),
        frame: frame.clone(),
    };

    // Wire up messaging and restore stored state on mount
    {
        let handle = handle.clone();
        use_effect_with((), move |_| {
            listen_for_messages(handle.clone());
            report_close_on_pagehide(handle.inbox.clone());
            spawn_local(async move {
                handle.restore().await;
            });
            || ()
        });
    }

    let on_retry = {
        let handle = handle.clone();
        Callback::from(move |_| handle.apply(|c| c.retry()))
    };

    let on_homepage = {
        let handle = handle.clone();
        Callback::from(move |_| handle.apply(|c| c.open_fallback()))
    };

    let frame_html = match &*frame {
        Some(current) => {
            let token = current.token;
            let on_load = {
                let handle = handle.clone();
                Callback::from(move |_: Event| handle.apply(|c| c.load_complete(token)))
            };
            let on_error = {
                let handle = handle.clone();
                Callback::from(move |_: Event| handle.apply(|c| c.load_failed(token)))
            };
            let class = if *view == PanelView::Content { "deepwiki-frame" } else { "deepwiki-frame hidden" };

            html! {
                <iframe
                    key={token.to_string()}
                    class={class}
                    src={current.url.clone()}
                    title="DeepWiki"
                    onload={on_load}
                    onerror={on_error}
                />
            }
        }
        None => html! {},
    };

    html! {
        <div class="panel-root">
            {match &*view {
                PanelView::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading documentation..."}</p>
                    </div>
                },
                PanelView::Failed(message) => html! {
                    <div class="error-container">
                        <Alert r#type={AlertType::Danger} title={"Could not load DeepWiki"} inline={true}>
                            {message.clone()}
                        </Alert>
                        <div class="flex-column-gap">
                            <Button onclick={on_retry} variant={ButtonVariant::Primary} block={true}>
                                {"Retry"}
                            </Button>
                            <Button onclick={on_homepage} variant={ButtonVariant::Secondary} block={true}>
                                {"Open DeepWiki homepage"}
                            </Button>
                        </div>
                    </div>
                },
                PanelView::Empty => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Info} title={"No repository selected"} inline={true}>
                            {"Click the extension icon on a GitHub repository page."}
                        </Alert>
                    </div>
                },
                PanelView::Content | PanelView::Hidden => html! {},
            }}

            if *view != PanelView::Hidden {
                {frame_html}
            }
        </div>
    }
}
