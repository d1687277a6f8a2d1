//! Redirect-to-login on an unauthorized episode.
//!
//! `RedirectHandler` is mounted once at the application root. The first
//! unauthorized signal moves it from `Idle` to `Redirecting`: the local
//! credential is cleared, the session is signed out, and the navigator is
//! sent to the login route with a `callbackUrl` pointing back at the current
//! location. Every later signal is ignored for the lifetime of the handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::session::SessionProvider;
use super::token_store::CredentialStore;
use super::unauthorized::{Subscription, UnauthorizedBridge};

/// Query parameter carrying the page to return to after login
const RETURN_PARAM: &str = "callbackUrl";

/// Where the application currently is, and how to move it elsewhere.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;
    fn navigate(&self, location: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectState {
    Idle,
    Redirecting,
}

#[derive(Error, Debug)]
pub enum MountError {
    #[error("redirect handler must be mounted inside a Tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub struct RedirectHandler {
    redirecting: AtomicBool,
    store: CredentialStore,
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    done: watch::Sender<bool>,
}

impl RedirectHandler {
    pub fn new(
        store: CredentialStore,
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Arc<Self> {
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            redirecting: AtomicBool::new(false),
            store,
            session,
            navigator,
            login_route: login_route.into(),
            done,
        })
    }

    pub fn state(&self) -> RedirectState {
        if self.redirecting.load(Ordering::SeqCst) {
            RedirectState::Redirecting
        } else {
            RedirectState::Idle
        }
    }

    /// Subscribe to `bridge`. Must be called from within a Tokio runtime,
    /// which is where the sign-out and navigation will run.
    pub fn mount(self: &Arc<Self>, bridge: &UnauthorizedBridge) -> Result<MountedRedirectHandler, MountError> {
        let runtime = Handle::try_current()?;
        let handler = Arc::clone(self);
        let subscription = bridge.subscribe(move || handler.on_signal(&runtime));
        debug!(login_route = %self.login_route, "Redirect handler mounted");

        Ok(MountedRedirectHandler {
            handler: Arc::clone(self),
            _subscription: subscription,
        })
    }

    /// Runs synchronously inside `UnauthorizedBridge::publish`.
    fn on_signal(self: &Arc<Self>, runtime: &Handle) {
        if self
            .redirecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Redirect already in progress, ignoring unauthorized signal");
            return;
        }

        info!("Session no longer authorized, redirecting to login");
        self.store.clear();

        let handler = Arc::clone(self);
        runtime.spawn(async move { handler.finish_redirect().await });
    }

    async fn finish_redirect(&self) {
        let target = match self.session.sign_out().await {
            Ok(()) => self.login_url(&self.navigator.current_location()),
            Err(e) => {
                warn!(error = %e, "Sign-out failed, navigating to login directly");
                self.login_route.clone()
            }
        };

        debug!(target = %target, "Navigating to login");
        self.navigator.navigate(&target);
        self.done.send_replace(true);
    }

    /// Login route with the return location attached as a query parameter
    pub fn login_url(&self, return_to: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(RETURN_PARAM, return_to)
            .finish();
        let separator = if self.login_route.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.login_route, separator, query)
    }

    /// Resolves once a redirect has navigated away. Pending forever while idle.
    pub async fn wait_redirected(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// A handler subscribed to a bridge. Dropping it unmounts the handler.
pub struct MountedRedirectHandler {
    handler: Arc<RedirectHandler>,
    _subscription: Subscription,
}

impl MountedRedirectHandler {
    pub fn state(&self) -> RedirectState {
        self.handler.state()
    }

    pub fn handler(&self) -> &Arc<RedirectHandler> {
        &self.handler
    }

    pub async fn wait_redirected(&self) {
        self.handler.wait_redirected().await
    }
}
