//! The actor: keyword callbacks wired to routing and display.
//!
//! Callbacks are attached exactly once, either at construction or a fixed
//! delay after the first hub connection so the keyword stream can settle.
//! Reconnects never attach a second time. Updates are handled one at a time;
//! failures are logged and the loop carries on.

use std::time::Duration;

use ginga_core::config::{ActorConfig, ModelsConfig};
use ginga_core::models::{CameraId, EventSource};
use ginga_core::routing::Router;
use ginga_keys::keyvar::KeyVar;
use ginga_keys::subscriptions::Subscriptions;
use ginga_viewer::dispatcher::ChannelDispatcher;
use ginga_viewer::fits::{FitsHduReader, HduReader};
use ginga_viewer::viewer::Viewer;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::hub::HubEvent;

/// When keyword callbacks get attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    Immediate,
    /// This long after the first successful hub connection.
    Delayed(Duration),
}

/// Whether keyword callbacks are wired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    Attached,
}

/// Owns the routing rules, the dispatcher and the keyword subscriptions.
///
/// Driven by [`GingaActor::run`], which consumes [`HubEvent`]s and handles
/// them one at a time.
pub struct GingaActor<V, R = FitsHduReader> {
    name: String,
    router: Router,
    dispatcher: ChannelDispatcher<V, R>,
    cameras: Vec<CameraId>,
    models: ModelsConfig,
    subscriptions: Subscriptions<EventSource>,
    mode: AttachMode,
    state: AttachState,
}

impl<V: Viewer, R: HduReader> GingaActor<V, R> {
    /// Build the actor from configuration.
    ///
    /// # Parameters
    /// - `name`: actor name used in logs and command replies.
    /// - `config`: cameras, site, routing, attach delay and keyword names.
    /// - `dispatcher`: where routed exposures are sent.
    ///
    /// With no attach delay the callbacks are attached before returning.
    pub fn new(name: impl Into<String>, config: &ActorConfig, dispatcher: ChannelDispatcher<V, R>) -> Self {
        let mode = match config.attach.delay() {
            Some(delay) => AttachMode::Delayed(delay),
            None => AttachMode::Immediate,
        };
        let mut actor = Self {
            name: name.into(),
            router: Router::from_config(config),
            dispatcher,
            cameras: config.cameras.ids.clone(),
            models: config.models.clone(),
            subscriptions: Subscriptions::new(),
            mode,
            state: AttachState::Unattached,
        };
        if mode == AttachMode::Immediate {
            actor.attach();
        }
        actor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn dispatcher(&self) -> &ChannelDispatcher<V, R> {
        &self.dispatcher
    }

    /// Wire one callback per camera plus the SAC and detrend keywords.
    ///
    /// Returns `false` if callbacks were already attached.
    pub fn attach(&mut self) -> bool {
        if self.state == AttachState::Attached {
            return false;
        }

        for camera in &self.cameras {
            self.subscriptions.add(
                &self.models.camera_model(camera),
                &self.models.camera_keyword,
                EventSource::Camera(*camera),
            );
        }
        self.subscriptions
            .add(&self.models.sac_model, &self.models.sac_keyword, EventSource::Sac);
        self.subscriptions.add(
            &self.models.detrend_model,
            &self.models.detrend_keyword,
            EventSource::Detrend,
        );

        self.state = AttachState::Attached;
        info!(
            actor = %self.name,
            callbacks = self.subscriptions.len(),
            "keyword callbacks attached"
        );
        true
    }

    /// Note a hub connection. Returns when callbacks should be attached if
    /// that is still pending.
    pub fn on_connected(&self) -> Option<Instant> {
        match (self.state, self.mode) {
            (AttachState::Unattached, AttachMode::Delayed(delay)) => Some(Instant::now() + delay),
            _ => None,
        }
    }

    /// Route and display every callback registered for `keyvar`.
    ///
    /// Returns the number of exposures the viewer accepted. Dropped,
    /// unroutable and failed displays are not counted.
    pub async fn handle_keyvar(&self, keyvar: &KeyVar) -> usize {
        let mut forwarded = 0;
        for source in self.subscriptions.handlers_for(keyvar) {
            let route = match self.router.route(source, &keyvar.values) {
                Ok(Some(route)) => route,
                Ok(None) => continue,
                Err(e) => {
                    error!(keyword = %keyvar.qualified_name(), error = %e, "cannot route keyword");
                    continue;
                }
            };
            match self.dispatcher.forward(&route).await {
                Ok(()) => forwarded += 1,
                Err(e) => error!(
                    keyword = %keyvar.qualified_name(),
                    channel = %route.channel,
                    path = %route.path.display(),
                    error = %e,
                    "failed to display exposure"
                ),
            }
        }
        forwarded
    }

    /// Consume hub events until the channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<HubEvent>) {
        let mut attach_at: Option<Instant> = None;

        loop {
            let deadline = attach_at.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = time::sleep_until(deadline), if attach_at.is_some() => {
                    attach_at = None;
                    self.attach();
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("hub event channel closed; actor loop exiting");
                        break;
                    };
                    match event {
                        HubEvent::Connected => {
                            if attach_at.is_none() {
                                attach_at = self.on_connected();
                            }
                        }
                        HubEvent::Disconnected => {
                            info!(actor = %self.name, "hub disconnected; waiting for reconnect");
                        }
                        HubEvent::Keys(keys) => {
                            for keyvar in &keys {
                                self.handle_keyvar(keyvar).await;
                            }
                        }
                    }
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
