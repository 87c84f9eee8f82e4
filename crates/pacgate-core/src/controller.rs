//! Proxy state controller.
//!
//! Owns the connection flag and is the only component that touches the
//! platform proxy settings. Every transition persists the flag before it is
//! reflected on the badge, and a failed apply always ends in
//! `Disconnected` with the flag written back to `false`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domains::{Domain, DomainSet};
use crate::error::{CoreError, Result};
use crate::indicator::{Badge, StatusIndicator};
use crate::pac::{generate, PacScript, Upstream};
use crate::platform::ProxyPlatform;
use crate::state::ProxyState;
use crate::store::{persist_with_retry, SettingsStore};
use crate::subscription::{Subscription, UserRecord};

/// Drives the connect/disconnect state machine.
pub struct ProxyController<S, P, I> {
    store: Arc<S>,
    domains: DomainSet<S>,
    platform: P,
    indicator: I,
    upstream: Upstream,
    state: ProxyState,
    badge: Badge,
    /// Fingerprint of the script the platform currently has.
    applied: Option<String>,
}

impl<S, P, I> ProxyController<S, P, I>
where
    S: SettingsStore,
    P: ProxyPlatform,
    I: StatusIndicator,
{
    /// Creates a controller and loads the custom domain list.
    ///
    /// Call [`bootstrap`](Self::bootstrap) before serving requests.
    pub fn new(store: Arc<S>, platform: P, indicator: I, upstream: Upstream) -> Result<Self> {
        let domains = DomainSet::load(Arc::clone(&store))?;
        Ok(Self {
            store,
            domains,
            platform,
            indicator,
            upstream,
            state: ProxyState::Disconnected,
            badge: Badge::OFF,
            applied: None,
        })
    }

    /// First-run initialization and restart recovery.
    ///
    /// Writes `isConnected = false` and an empty custom list only when those
    /// keys are absent, then re-derives the badge from the stored flag. With
    /// `reapply` set, a stored `true` re-installs the PAC; if that fails the
    /// controller falls back to `Disconnected` and returns the error.
    ///
    /// A stored `true` is only honored while `subscription` is active.
    /// Otherwise the proxy the OS may still hold is cleared, the flag is
    /// written back to `false` and the controller starts `Disabled`.
    pub fn bootstrap(
        &mut self,
        subscription: &Subscription,
        reapply: bool,
    ) -> Result<ProxyState> {
        let connected = match self.store.load_connected()? {
            Some(flag) => flag,
            None => {
                info!("First run, initializing connection flag");
                self.persist_flag(false)?;
                false
            }
        };

        if self.store.load_custom_domains()?.is_none() {
            persist_with_retry("custom domains", || self.store.save_custom_domains(&[]))?;
        }

        if !connected {
            self.set_state(ProxyState::Disconnected);
            return Ok(self.state);
        }

        if !subscription.active {
            warn!("Stored connection flag set but subscription is not active, clearing proxy");
            if let Err(e) = self.platform.clear() {
                error!(error = %e, "Failed to clear system proxy");
            }
            self.applied = None;
            self.persist_flag(false)?;
            self.set_state(ProxyState::Disabled);
            return Ok(self.state);
        }

        if reapply {
            let script = self.current_script();
            if let Err(e) = self.install(&script) {
                return Err(self.fall_back(e));
            }
        }

        self.set_state(ProxyState::Connected);
        info!(reapplied = reapply, "Restored connected state");
        Ok(self.state)
    }

    /// Applies the PAC for the current domain set.
    ///
    /// Refused with [`CoreError::SubscriptionInactive`] when `subscription`
    /// is not active. In that case nothing reaches the platform and the state
    /// becomes `Disabled`.
    pub fn connect(&mut self, subscription: &Subscription) -> Result<ProxyState> {
        if !subscription.active {
            if self.state.is_connected() {
                self.disconnect()?;
            }
            info!("Connect refused, subscription is not active");
            self.set_state(ProxyState::Disabled);
            return Err(CoreError::SubscriptionInactive);
        }

        self.set_state(ProxyState::Connecting);

        let script = self.current_script();
        if let Err(e) = self.install(&script) {
            return Err(self.fall_back(e));
        }

        if let Err(e) = self.persist_flag(true) {
            return Err(self.fall_back(e));
        }

        self.set_state(ProxyState::Connected);
        info!(
            domains = script.domains().len(),
            upstream = %self.upstream,
            "Proxy connected"
        );
        Ok(self.state)
    }

    /// Restores direct connections.
    ///
    /// A platform clear failure is logged and does not stop the transition.
    /// Only a persistence failure is returned, after the state and badge have
    /// already moved to `Disconnected`.
    pub fn disconnect(&mut self) -> Result<ProxyState> {
        if let Err(e) = self.platform.clear() {
            error!(error = %e, "Failed to clear system proxy");
        }
        self.applied = None;

        let persisted = self.persist_flag(false);
        self.set_state(ProxyState::Disconnected);
        persisted?;

        info!("Proxy disconnected");
        Ok(self.state)
    }

    /// Re-applies the PAC when connected. Returns whether anything ran.
    pub fn refresh_rules(&mut self) -> Result<bool> {
        if !self.state.is_connected() {
            debug!(state = %self.state, "Skipping rule refresh while not connected");
            return Ok(false);
        }

        let script = self.current_script();
        if let Err(e) = self.install(&script) {
            return Err(self.fall_back(e));
        }

        debug!(domains = script.domains().len(), "Rules refreshed");
        Ok(true)
    }

    /// Adds a custom domain and refreshes the active rules before returning.
    pub fn add_domain(&mut self, input: &str) -> Result<Domain> {
        let domain = self.domains.add(input)?;
        self.refresh_rules()?;
        Ok(domain)
    }

    /// Removes a custom domain and refreshes the active rules before returning.
    pub fn remove_domain(&mut self, input: &str) -> Result<bool> {
        let removed = self.domains.remove(input)?;
        self.refresh_rules()?;
        Ok(removed)
    }

    /// Disconnects and forgets the signed-in user.
    pub fn sign_out(&mut self) -> Result<()> {
        let disconnected = self.disconnect();
        let forgotten = persist_with_retry("current user", || self.store.save_user(None));
        disconnected?;
        forgotten?;
        info!("Signed out");
        Ok(())
    }

    /// Caches the signed-in user record.
    pub fn remember_user(&self, user: &UserRecord) -> Result<()> {
        persist_with_retry("current user", || self.store.save_user(Some(user)))
    }

    /// Brings the state in line with a freshly fetched subscription.
    ///
    /// An expired subscription while connected disconnects.
    pub fn enforce_subscription(&mut self, subscription: &Subscription) -> Result<ProxyState> {
        match (subscription.active, self.state) {
            (false, ProxyState::Connected) => {
                warn!("Subscription expired while connected, disconnecting");
                self.disconnect()?;
                self.set_state(ProxyState::Disabled);
            }
            (false, _) => self.set_state(ProxyState::Disabled),
            (true, ProxyState::Disabled) => self.set_state(ProxyState::Disconnected),
            (true, _) => {}
        }
        Ok(self.state)
    }

    /// The state the UI should show for `subscription`.
    ///
    /// An applied proxy is always reported as `Connected`, whatever the
    /// subscription says.
    pub fn view(&self, subscription: &Subscription) -> ProxyState {
        if self.state.is_connected() {
            self.state
        } else if !subscription.active {
            ProxyState::Disabled
        } else if self.state == ProxyState::Disabled {
            ProxyState::Disconnected
        } else {
            self.state
        }
    }

    /// PAC for the current combined domain set.
    pub fn current_script(&self) -> PacScript {
        generate(self.domains.combined(), &self.upstream)
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn badge(&self) -> Badge {
        self.badge
    }

    pub fn domains(&self) -> &DomainSet<S> {
        &self.domains
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Fingerprint of the script last installed, if any.
    pub fn applied_fingerprint(&self) -> Option<&str> {
        self.applied.as_deref()
    }

    fn install(&mut self, script: &PacScript) -> Result<()> {
        let fingerprint = script.fingerprint();
        if self.applied.as_deref() == Some(fingerprint.as_str()) {
            debug!("PAC unchanged, skipping apply");
            return Ok(());
        }

        self.platform.apply_pac(script).map_err(|e| match e {
            CoreError::ConfigurationApply(_) => e,
            other => CoreError::ConfigurationApply(other.to_string()),
        })?;

        debug!(fingerprint = %fingerprint, "PAC applied");
        self.applied = Some(fingerprint);
        Ok(())
    }

    /// Returns to `Disconnected` after a failed apply or flag write and
    /// hands back `cause`.
    fn fall_back(&mut self, cause: CoreError) -> CoreError {
        error!(error = %cause, "Proxy could not be kept, falling back to direct");

        if let Err(e) = self.platform.clear() {
            warn!(error = %e, "Failed to clear proxy during fallback");
        }
        self.applied = None;

        if let Err(e) = self.persist_flag(false) {
            error!(error = %e, "Failed to persist disconnected flag during fallback");
        }

        self.set_state(ProxyState::Disconnected);
        cause
    }

    fn persist_flag(&self, connected: bool) -> Result<()> {
        persist_with_retry("connection flag", || self.store.save_connected(connected))
    }

    fn set_state(&mut self, state: ProxyState) {
        if state != self.state {
            debug!(from = %self.state, to = %state, "State transition");
        }
        self.state = state;

        // The badge only changes once a transition has settled.
        if state != ProxyState::Connecting {
            self.badge = Badge::for_connected(state.is_connected());
            self.indicator.show(self.badge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{DomainError, Origin, DEFAULT_PROXIED_DOMAINS};
    use crate::indicator::LogIndicator;
    use crate::platform::RecordingPlatform;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestController<S = MemoryStore> = ProxyController<S, RecordingPlatform, LogIndicator>;

    fn active() -> Subscription {
        let now = Utc::now();
        Subscription::at(Some(now + Duration::days(30)), now)
    }

    fn expired() -> Subscription {
        let now = Utc::now();
        Subscription::at(Some(now - Duration::days(1)), now)
    }

    fn controller() -> (Arc<MemoryStore>, TestController) {
        let store = Arc::new(MemoryStore::new());
        let mut ctl = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), true).unwrap();
        (store, ctl)
    }

    /// Store whose connection-flag writes fail a set number of times.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        flag_failures: AtomicUsize,
        flag_writes: AtomicUsize,
    }

    impl FlakyStore {
        fn failing_flag_writes(n: usize) -> Self {
            Self {
                flag_failures: AtomicUsize::new(n),
                ..Self::default()
            }
        }
    }

    impl SettingsStore for FlakyStore {
        fn load_connected(&self) -> Result<Option<bool>> {
            self.inner.load_connected()
        }

        fn save_connected(&self, connected: bool) -> Result<()> {
            self.flag_writes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.flag_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.flag_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CoreError::Persistence("disk full".into()));
            }
            self.inner.save_connected(connected)
        }

        fn load_custom_domains(&self) -> Result<Option<Vec<String>>> {
            self.inner.load_custom_domains()
        }

        fn save_custom_domains(&self, domains: &[String]) -> Result<()> {
            self.inner.save_custom_domains(domains)
        }

        fn load_user(&self) -> Result<Option<UserRecord>> {
            self.inner.load_user()
        }

        fn save_user(&self, user: Option<&UserRecord>) -> Result<()> {
            self.inner.save_user(user)
        }
    }

    // ==================== Bootstrap ====================

    #[test]
    fn first_run_initializes_keys() {
        let (store, ctl) = controller();

        assert_eq!(store.load_connected().unwrap(), Some(false));
        assert_eq!(store.load_custom_domains().unwrap(), Some(vec![]));
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert_eq!(ctl.badge(), Badge::OFF);
    }

    #[test]
    fn bootstrap_leaves_existing_keys_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(false).unwrap();
        store.save_custom_domains(&["example.com".into()]).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), true).unwrap();
        ctl.bootstrap(&active(), true).unwrap();

        assert_eq!(
            store.load_custom_domains().unwrap(),
            Some(vec!["example.com".to_string()])
        );
    }

    #[test]
    fn restart_restores_connected_badge() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(true).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        let state = ctl.bootstrap(&active(), true).unwrap();

        assert_eq!(state, ProxyState::Connected);
        assert_eq!(ctl.badge(), Badge::ON);
        assert_eq!(ctl.indicator().current(), Some(Badge::ON));
        assert!(ctl.platform().active().is_some());
    }

    #[test]
    fn restart_without_reapply_trusts_flag() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(true).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store,
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), false).unwrap();

        assert_eq!(ctl.state(), ProxyState::Connected);
        assert_eq!(ctl.platform().apply_count(), 0);
    }

    #[test]
    fn restart_reapply_failure_falls_back() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(true).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::failing(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        let err = ctl.bootstrap(&active(), true).unwrap_err();

        assert!(matches!(err, CoreError::ConfigurationApply(_)));
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn restart_with_expired_subscription_clears_proxy() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(true).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        let state = ctl.bootstrap(&expired(), true).unwrap();

        assert_eq!(state, ProxyState::Disabled);
        assert_eq!(ctl.badge(), Badge::OFF);
        assert_eq!(ctl.platform().apply_count(), 0);
        assert_eq!(ctl.platform().clear_count(), 1);
        assert!(ctl.platform().active().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn restart_signed_out_without_reapply_still_clears() {
        let store = Arc::new(MemoryStore::new());
        store.save_connected(true).unwrap();

        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&Subscription::inactive(), false).unwrap();

        assert_eq!(ctl.state(), ProxyState::Disabled);
        assert_eq!(ctl.platform().clear_count(), 1);
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    // ==================== Connect / disconnect ====================

    #[test]
    fn connect_applies_and_persists() {
        let (store, mut ctl) = controller();

        let state = ctl.connect(&active()).unwrap();

        assert_eq!(state, ProxyState::Connected);
        assert_eq!(store.load_connected().unwrap(), Some(true));
        assert_eq!(ctl.badge(), Badge::ON);
        let script = ctl.platform().active().unwrap();
        assert_eq!(script.domains().len(), DEFAULT_PROXIED_DOMAINS.len());
        assert!(script.route("web.telegram.org").is_proxied());
    }

    #[test]
    fn inactive_subscription_is_disabled_without_apply() {
        let (store, mut ctl) = controller();

        let err = ctl.connect(&expired()).unwrap_err();

        assert!(matches!(err, CoreError::SubscriptionInactive));
        assert_eq!(ctl.state(), ProxyState::Disabled);
        assert_eq!(ctl.platform().apply_count(), 0);
        assert_eq!(store.load_connected().unwrap(), Some(false));
        assert_eq!(ctl.badge(), Badge::OFF);
    }

    #[test]
    fn apply_failure_falls_back_to_disconnected() {
        let (store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        ctl.platform_mut().set_failing(true);
        ctl.domains.add("example.com").unwrap();
        let err = ctl.refresh_rules().unwrap_err();

        assert!(matches!(err, CoreError::ConfigurationApply(_)));
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert_eq!(store.load_connected().unwrap(), Some(false));
        assert_eq!(ctl.badge(), Badge::OFF);
        assert!(ctl.platform().active().is_none());
    }

    #[test]
    fn connect_failure_never_claims_connected() {
        let store = Arc::new(MemoryStore::new());
        let mut ctl: TestController = ProxyController::new(
            store.clone(),
            RecordingPlatform::failing(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), true).unwrap();

        assert!(ctl.connect(&active()).is_err());
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn connect_twice_applies_once() {
        let (_store, mut ctl) = controller();

        ctl.connect(&active()).unwrap();
        let first = ctl.platform().active().cloned();
        ctl.connect(&active()).unwrap();

        assert_eq!(ctl.platform().apply_count(), 1);
        assert_eq!(ctl.platform().active().cloned(), first);
    }

    #[test]
    fn disconnect_without_prior_connect_succeeds() {
        let (store, mut ctl) = controller();

        assert_eq!(ctl.disconnect().unwrap(), ProxyState::Disconnected);
        assert_eq!(store.load_connected().unwrap(), Some(false));
        assert_eq!(ctl.platform().clear_count(), 1);
    }

    #[test]
    fn disconnect_clears_platform() {
        let (store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        ctl.disconnect().unwrap();

        assert!(ctl.platform().active().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
        assert_eq!(ctl.badge(), Badge::OFF);
    }

    #[test]
    fn reconnect_after_disconnect_reapplies() {
        let (_store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();
        ctl.disconnect().unwrap();
        ctl.connect(&active()).unwrap();

        assert_eq!(ctl.platform().apply_count(), 2);
    }

    // ==================== Persistence failures ====================

    #[test]
    fn flag_write_is_retried_once() {
        let store = Arc::new(FlakyStore::default());
        let mut ctl: TestController<FlakyStore> = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), true).unwrap();
        let writes_before = store.flag_writes.load(Ordering::SeqCst);

        store.flag_failures.store(1, Ordering::SeqCst);
        ctl.connect(&active()).unwrap();

        assert_eq!(store.flag_writes.load(Ordering::SeqCst) - writes_before, 2);
        assert_eq!(store.load_connected().unwrap(), Some(true));
    }

    #[test]
    fn persistent_flag_failure_undoes_apply() {
        let store = Arc::new(FlakyStore::default());
        let mut ctl: TestController<FlakyStore> = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), true).unwrap();

        store.flag_failures.store(2, Ordering::SeqCst);
        let err = ctl.connect(&active()).unwrap_err();

        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert!(ctl.platform().active().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn reconnect_flag_failure_writes_back_false() {
        let store = Arc::new(FlakyStore::default());
        store.inner.save_connected(true).unwrap();
        let mut ctl: TestController<FlakyStore> = ProxyController::new(
            store.clone(),
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();
        ctl.bootstrap(&active(), false).unwrap();
        assert_eq!(ctl.state(), ProxyState::Connected);

        // Both attempts at `true` fail; the fallback write of `false` succeeds.
        store.flag_failures.store(2, Ordering::SeqCst);
        let err = ctl.connect(&active()).unwrap_err();

        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert!(ctl.platform().active().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn first_run_surfaces_persistence_failure() {
        let store = Arc::new(FlakyStore::failing_flag_writes(2));
        let mut ctl: TestController<FlakyStore> = ProxyController::new(
            store,
            RecordingPlatform::new(),
            LogIndicator::new(),
            Upstream::default(),
        )
        .unwrap();

        assert!(matches!(
            ctl.bootstrap(&active(), true),
            Err(CoreError::Persistence(_))
        ));
    }

    // ==================== Domain mutations ====================

    #[test]
    fn add_domain_refreshes_active_rules() {
        let (_store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        ctl.add_domain("www.example.com").unwrap();

        let script = ctl.platform().active().unwrap();
        assert!(script.route("example.com").is_proxied());
        assert_eq!(ctl.platform().apply_count(), 2);
    }

    #[test]
    fn remove_domain_refreshes_active_rules() {
        let (_store, mut ctl) = controller();
        ctl.add_domain("example.com").unwrap();
        ctl.connect(&active()).unwrap();

        assert!(ctl.remove_domain("example.com").unwrap());

        let script = ctl.platform().active().unwrap();
        assert!(!script.route("example.com").is_proxied());
    }

    #[test]
    fn domain_changes_while_disconnected_do_not_apply() {
        let (_store, mut ctl) = controller();

        ctl.add_domain("example.com").unwrap();
        ctl.remove_domain("example.com").unwrap();

        assert_eq!(ctl.platform().apply_count(), 0);
        assert!(!ctl.refresh_rules().unwrap());
    }

    #[test]
    fn add_default_domain_is_rejected_without_refresh() {
        let (_store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        let err = ctl.add_domain("telegram.org").unwrap_err();

        assert!(matches!(
            err,
            CoreError::Domain(DomainError::AlreadyPresent(Origin::Default))
        ));
        assert!(ctl.domains().custom().is_empty());
        assert_eq!(ctl.platform().apply_count(), 1);
    }

    #[test]
    fn combined_scenario() {
        let (_store, mut ctl) = controller();

        assert!(ctl.add_domain("telegram.org").is_err());
        assert!(ctl.domains().custom().is_empty());

        ctl.add_domain("example.com").unwrap();
        let combined = ctl.domains().combined();
        assert!(combined.iter().any(|d| d == "telegram.org"));
        assert_eq!(combined.last().map(String::as_str), Some("example.com"));
    }

    // ==================== Subscription gating ====================

    #[test]
    fn expired_subscription_disconnects() {
        let (store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        let state = ctl.enforce_subscription(&expired()).unwrap();

        assert_eq!(state, ProxyState::Disabled);
        assert!(ctl.platform().active().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }

    #[test]
    fn renewed_subscription_leaves_disabled() {
        let (_store, mut ctl) = controller();
        let _ = ctl.connect(&expired());
        assert_eq!(ctl.state(), ProxyState::Disabled);

        assert_eq!(
            ctl.enforce_subscription(&active()).unwrap(),
            ProxyState::Disconnected
        );
    }

    #[test]
    fn view_reflects_subscription() {
        let (_store, mut ctl) = controller();
        ctl.connect(&active()).unwrap();

        assert_eq!(ctl.view(&active()), ProxyState::Connected);
        assert_eq!(ctl.view(&expired()), ProxyState::Connected);

        ctl.disconnect().unwrap();
        assert_eq!(ctl.view(&active()), ProxyState::Disconnected);
        assert_eq!(ctl.view(&expired()), ProxyState::Disabled);
    }

    #[test]
    fn sign_out_disconnects_and_forgets_user() {
        let (store, mut ctl) = controller();
        let user = UserRecord {
            email: "a@b.c".into(),
            api_key: "k".into(),
            sub_expires: active().expires,
        };
        ctl.remember_user(&user).unwrap();
        ctl.connect(&active()).unwrap();

        ctl.sign_out().unwrap();

        assert_eq!(ctl.state(), ProxyState::Disconnected);
        assert!(store.load_user().unwrap().is_none());
        assert_eq!(store.load_connected().unwrap(), Some(false));
    }
}
