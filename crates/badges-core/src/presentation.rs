use crate::config::BadgeConfig;
use crate::fetcher::{BadgeFetcher, BadgeSource};
use crate::normalize::BadgeNormalizer;
use crate::types::{DisplayBadge, Identity, UserId};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// CSS class of the badge strip container. The host lays it out as a
/// vertically centered flex row.
pub const STRIP_CLASS: &str = "vc-global-badges";

/// One badge image with its tooltip label.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeVisual {
    pub label: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    /// Extra transform scale, if any.
    pub scale: Option<f32>,
}

/// Fragment handed back to the host's profile badge list.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeStrip {
    pub class_name: &'static str,
    pub badges: Vec<BadgeVisual>,
}

impl BadgeStrip {
    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

/// Receives identity changes from the host.
pub trait IdentityObserver: Send + Sync {
    fn identity_changed(&self, user: &dyn Identity);
}

/// Build the visual strip for a list of display badges.
pub fn render_badges(config: &BadgeConfig, badges: &[DisplayBadge]) -> BadgeStrip {
    let badges = badges
        .iter()
        .map(|b| BadgeVisual {
            label: b.label.clone(),
            image_url: b.image_url.clone(),
            width: config.badge_size_px,
            height: config.badge_size_px,
            scale: b
                .label
                .contains(config.scaled_marker.as_str())
                .then_some(config.scaled_factor),
        })
        .collect();

    BadgeStrip {
        class_name: STRIP_CLASS,
        badges,
    }
}

type Listener = dyn Fn(&[DisplayBadge]) + Send + Sync;

#[derive(Default)]
struct ViewState {
    bound: Option<UserId>,
    badges: Vec<DisplayBadge>,
}

/// Binds one displayed user to the badge fetcher.
///
/// Results that arrive for an identity that is no longer bound are dropped.
pub struct PresentationAdapter<S: BadgeSource> {
    fetcher: BadgeFetcher<S>,
    normalizer: Arc<BadgeNormalizer>,
    state: Arc<Mutex<ViewState>>,
    listener: Option<Arc<Listener>>,
}

impl<S: BadgeSource> PresentationAdapter<S> {
    pub fn new(fetcher: BadgeFetcher<S>, normalizer: BadgeNormalizer) -> Self {
        Self {
            fetcher,
            normalizer: Arc::new(normalizer),
            state: Arc::new(Mutex::new(ViewState::default())),
            listener: None,
        }
    }

    /// Register the host's re-render hook, called with the new badge list
    /// whenever it changes.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&[DisplayBadge]) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn fetcher(&self) -> &BadgeFetcher<S> {
        &self.fetcher
    }

    pub fn bound_identity(&self) -> Option<UserId> {
        lock(&self.state).bound.clone()
    }

    pub fn badges(&self) -> Vec<DisplayBadge> {
        lock(&self.state).badges.clone()
    }

    /// Bind `user`, resolving its badges if it differs from the bound one.
    ///
    /// Returns the fetch task handle when a network fetch was started.
    pub fn observe(&self, user: &dyn Identity) -> Option<JoinHandle<()>> {
        let id = user.user_id();
        let cleared = {
            let mut state = lock(&self.state);
            if state.bound.as_ref() == Some(&id) {
                return None;
            }
            state.bound = Some(id.clone());
            !std::mem::take(&mut state.badges).is_empty()
        };
        if cleared {
            self.notify(&[]);
        }

        let state = self.state.clone();
        let normalizer = self.normalizer.clone();
        let listener = self.listener.clone();
        let requested = id.clone();

        self.fetcher.resolve(id, move |raw| {
            let badges = normalizer.normalize(&raw);
            {
                let mut state = lock(&state);
                if state.bound.as_ref() != Some(&requested) {
                    debug!("Dropping badges for {}, no longer displayed", requested);
                    return;
                }
                state.badges = badges.clone();
            }
            if let Some(listener) = listener {
                listener(&badges);
            }
        })
    }

    /// Render the current badges. Empty until the first resolution lands.
    pub fn render(&self) -> BadgeStrip {
        render_badges(self.normalizer.config(), &lock(&self.state).badges)
    }

    /// Host extension point: bind `user` and render whatever is known so far.
    pub fn render_global_badges(&self, user: &dyn Identity) -> BadgeStrip {
        self.observe(user);
        self.render()
    }

    /// Follow a channel of identities, re-binding on every change.
    ///
    /// The task ends when the sender is dropped.
    pub fn watch(self: Arc<Self>, mut identities: watch::Receiver<Option<UserId>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let current = identities.borrow_and_update().clone();
                if let Some(id) = current {
                    self.identity_changed(&id);
                }
                if identities.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn notify(&self, badges: &[DisplayBadge]) {
        if let Some(listener) = &self.listener {
            listener(badges);
        }
    }
}

impl<S: BadgeSource> IdentityObserver for PresentationAdapter<S> {
    fn identity_changed(&self, user: &dyn Identity) {
        self.observe(user);
    }
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
