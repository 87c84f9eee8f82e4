//! Message bridge between UI surfaces and the controller.
//!
//! Requests go through a bounded queue to a single worker task that owns the
//! controller and the session, so state-mutating intents never interleave.
//! Every request carries its own reply channel and the worker sends exactly
//! one reply per request. Intents whose answer needs no state (the default
//! list) are answered by the handle directly.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::controller::ProxyController;
use crate::domains::DEFAULT_PROXIED_DOMAINS;
use crate::error::CoreError;
use crate::indicator::{Badge, StatusIndicator};
use crate::platform::ProxyPlatform;
use crate::state::ProxyState;
use crate::store::SettingsStore;
use crate::subscription::{Session, Subscription, UserRecord};

/// Queue depth before senders wait.
const QUEUE_CAPACITY: usize = 64;

/// Banner shown while the backend cannot be reached.
pub const OFFLINE_BANNER: &str = "Subscription server unreachable, using cached status";

/// Errors returned to bridge callers.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The worker task has stopped.
    #[error("bridge worker is not running")]
    Closed,
}

/// How an intent is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Answered by the handle without queueing.
    Immediate,
    /// Answered by the worker once the operation settles.
    Deferred,
}

/// A UI-originated request.
#[derive(Clone)]
pub enum Intent {
    Connect,
    Disconnect,
    UpdateRules,
    GetDefaults,
    AddDomain(String),
    RemoveDomain(String),
    GetDomains,
    GetStatus,
    RefreshSubscription,
    SignIn { email: String, password: String },
    SignOut,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::UpdateRules => "updateRules",
            Self::GetDefaults => "getDefaults",
            Self::AddDomain(_) => "addDomain",
            Self::RemoveDomain(_) => "removeDomain",
            Self::GetDomains => "getDomains",
            Self::GetStatus => "getStatus",
            Self::RefreshSubscription => "refreshSubscription",
            Self::SignIn { .. } => "signIn",
            Self::SignOut => "signOut",
        }
    }

    pub fn reply_mode(&self) -> ReplyMode {
        match self {
            Self::GetDefaults => ReplyMode::Immediate,
            _ => ReplyMode::Deferred,
        }
    }
}

// Hand-written so credentials never reach the logs.
impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddDomain(d) | Self::RemoveDomain(d) => write!(f, "{}({:?})", self.name(), d),
            Self::SignIn { email, .. } => write!(f, "signIn({:?})", email),
            _ => f.write_str(self.name()),
        }
    }
}

/// Snapshot of everything the popup renders.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: ProxyState,
    pub label: &'static str,
    pub connected: bool,
    pub badge: Badge,
    pub subscription_active: bool,
    pub subscription_expires: Option<String>,
    pub email: Option<String>,
    pub banner: Option<String>,
    pub upstream: String,
}

/// Default and custom domain lists.
#[derive(Debug, Clone, Serialize)]
pub struct DomainsReport {
    pub defaults: Vec<String>,
    pub custom: Vec<String>,
}

/// Successful answer to an intent.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusReport),
    Defaults(Vec<String>),
    Domains(DomainsReport),
    Added(String),
    Removed(bool),
    Refreshed(bool),
}

fn default_list() -> Vec<String> {
    DEFAULT_PROXIED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

struct Request {
    intent: Intent,
    reply: oneshot::Sender<Result<Reply, CoreError>>,
}

/// Cloneable sender side of the bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<Request>,
}

impl BridgeHandle {
    /// Dispatches `intent` and waits for its reply.
    pub async fn send(&self, intent: Intent) -> Result<Reply, BridgeError> {
        if intent.reply_mode() == ReplyMode::Immediate {
            debug!(intent = intent.name(), "Answering immediately");
            return Ok(Reply::Defaults(default_list()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request {
                intent,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::Closed)?;

        Ok(reply_rx.await.map_err(|_| BridgeError::Closed)??)
    }

    /// True once the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Worker state: the controller plus the cached session.
pub struct Bridge<S, P, I, B> {
    controller: ProxyController<S, P, I>,
    session: Session,
    backend: Arc<B>,
}

impl<S, P, I, B> Bridge<S, P, I, B>
where
    S: SettingsStore,
    P: ProxyPlatform,
    I: StatusIndicator,
    B: Backend,
{
    pub fn new(controller: ProxyController<S, P, I>, session: Session, backend: Arc<B>) -> Self {
        Self {
            controller,
            session,
            backend,
        }
    }

    /// Starts the worker task and returns its handle.
    ///
    /// The worker stops when every handle has been dropped.
    pub fn spawn(self) -> BridgeHandle {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(self.run(rx));
        BridgeHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        info!("Bridge worker started");
        while let Some(Request { intent, reply }) = rx.recv().await {
            let name = intent.name();
            let result = self.handle(intent).await;
            if let Err(e) = &result {
                debug!(intent = name, error = %e, "Intent failed");
            }
            if reply.send(result).is_err() {
                debug!(intent = name, "Caller went away before the reply");
            }
        }
        info!("Bridge worker stopped");
    }

    /// Runs one intent to completion.
    pub async fn handle(&mut self, intent: Intent) -> Result<Reply, CoreError> {
        match intent {
            Intent::Connect => {
                let subscription = self.subscription();
                self.controller.connect(&subscription)?;
                Ok(Reply::Status(self.status()))
            }
            Intent::Disconnect => {
                self.controller.disconnect()?;
                Ok(Reply::Status(self.status()))
            }
            Intent::UpdateRules => Ok(Reply::Refreshed(self.controller.refresh_rules()?)),
            Intent::GetDefaults => Ok(Reply::Defaults(default_list())),
            Intent::AddDomain(input) => {
                let domain = self.controller.add_domain(&input)?;
                Ok(Reply::Added(domain.into_string()))
            }
            Intent::RemoveDomain(input) => {
                Ok(Reply::Removed(self.controller.remove_domain(&input)?))
            }
            Intent::GetDomains => Ok(Reply::Domains(self.domains())),
            Intent::GetStatus => {
                let subscription = self.subscription();
                self.controller.enforce_subscription(&subscription)?;
                Ok(Reply::Status(self.status()))
            }
            Intent::RefreshSubscription => {
                let api_key = self
                    .session
                    .user()
                    .map(|u| u.api_key.clone())
                    .ok_or(CoreError::NotSignedIn)?;
                let fetched = self.backend.status(&api_key).await;
                self.accept_user(fetched)?;
                Ok(Reply::Status(self.status()))
            }
            Intent::SignIn { email, password } => {
                let fetched = self.backend.login(&email, &password).await;
                self.accept_user(fetched)?;
                info!(email = %email, "Signed in");
                Ok(Reply::Status(self.status()))
            }
            Intent::SignOut => {
                self.controller.sign_out()?;
                self.session.replace_user(None);
                self.session.set_banner(None);
                Ok(Reply::Status(self.status()))
            }
        }
    }

    /// Caches a record fetched from the backend and re-checks gating.
    ///
    /// A network failure keeps the cached record in force, gating included,
    /// and raises the offline banner.
    fn accept_user(&mut self, fetched: Result<UserRecord, CoreError>) -> Result<(), CoreError> {
        let user = match fetched {
            Ok(user) => user,
            Err(CoreError::NetworkUnavailable(reason)) => {
                warn!(reason = %reason, "Backend unreachable, keeping cached subscription");
                self.session.set_banner(Some(OFFLINE_BANNER.to_string()));
                let cached = self.subscription();
                self.controller.enforce_subscription(&cached)?;
                return Err(CoreError::NetworkUnavailable(reason));
            }
            Err(e) => return Err(e),
        };

        self.controller.remember_user(&user)?;
        self.session.replace_user(Some(user));
        self.session.set_banner(None);

        let subscription = self.subscription();
        self.controller.enforce_subscription(&subscription)?;
        Ok(())
    }

    fn subscription(&self) -> Subscription {
        self.session.subscription(Utc::now())
    }

    fn status(&self) -> StatusReport {
        let subscription = self.subscription();
        let state = self.controller.view(&subscription);
        StatusReport {
            state,
            label: state.label(),
            connected: self.controller.state().is_connected(),
            badge: self.controller.badge(),
            subscription_active: subscription.active,
            subscription_expires: subscription.expires_ymd(),
            email: self.session.user().map(|u| u.email.clone()),
            banner: self.session.banner().map(str::to_string),
            upstream: self.controller.upstream().to_string(),
        }
    }

    fn domains(&self) -> DomainsReport {
        DomainsReport {
            defaults: default_list(),
            custom: self
                .controller
                .domains()
                .custom()
                .iter()
                .map(|d| d.as_str().to_string())
                .collect(),
        }
    }
}
