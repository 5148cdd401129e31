//! The only writer of live chain parameters.
//!
//! Every edit goes to the [`ParameterStore`] first.  If a chain is attached
//! the sanitized value is then pushed to its stage; otherwise it is only
//! stored and picked up by the next session start.  The controller holds the
//! chain through a `Weak`, so a push racing a teardown finds nothing to
//! write to and becomes a no-op.
//!
//! Lock order: store, then chain reference, then guard.
//!
//! [`ParameterStore`]: crate::params::ParameterStore

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::chain::{ChainControls, ParameterPush};
use crate::params::{ActiveProfile, Band, ParameterSet, SharedStore};
use crate::profiles::{ProfileCatalog, ProfileError};

use super::guard::HighGainGuard;
use super::state::{EventSender, SessionEvent};

pub struct ChainController {
    store: SharedStore,
    chain: Mutex<Option<Weak<ChainControls>>>,
    guard: Mutex<HighGainGuard>,
    events: EventSender,
}

impl ChainController {
    pub fn new(store: SharedStore, high_gain_threshold: f32, events: EventSender) -> Self {
        Self {
            store,
            chain: Mutex::new(None),
            guard: Mutex::new(HighGainGuard::new(high_gain_threshold)),
            events,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Snapshot of the current parameters.
    pub fn params(&self) -> ParameterSet {
        self.store.lock().params()
    }

    pub fn active_profile(&self) -> ActiveProfile {
        self.store.lock().active_profile().clone()
    }

    // ---- Manual edits ------------------------------------------------------

    pub fn set_input_gain(&self, percent: f32) -> f32 {
        let mut store = self.store.lock();
        let value = store.set_input_gain(percent);
        self.push(ParameterPush::InputGain(value));
        value
    }

    pub fn set_output_gain(&self, percent: f32) -> f32 {
        let mut store = self.store.lock();
        let value = store.set_output_gain(percent);
        self.push(ParameterPush::OutputGain(value));
        self.check_output_gain(value);
        value
    }

    pub fn set_balance(&self, balance: i32) -> i32 {
        let mut store = self.store.lock();
        let value = store.set_balance(balance);
        self.push(ParameterPush::Balance(value));
        value
    }

    pub fn set_band_gain(&self, band: Band, db: f32) -> f32 {
        let mut store = self.store.lock();
        let value = store.set_band_gain(band, db);
        self.push(ParameterPush::Band(band, value));
        value
    }

    // ---- Profiles ----------------------------------------------------------

    /// Resolve `name` and apply it to the store and, if live, the chain.
    ///
    /// On error nothing changes.
    pub fn apply_profile(
        &self,
        name: &str,
        catalog: &ProfileCatalog,
    ) -> Result<ParameterSet, ProfileError> {
        let params = catalog.resolve(name)?;
        let active = ProfileCatalog::active_for(name);

        let mut store = self.store.lock();
        store.apply(active, params);
        if let Some(controls) = self.live_controls() {
            controls.apply(&params);
        }
        self.check_output_gain(params.output_gain);
        drop(store);

        log::info!("[controller] applied profile '{name}'");
        Ok(params)
    }

    // ---- High-gain warning -------------------------------------------------

    /// Dismiss the current high-gain warning.
    pub fn acknowledge_warning(&self) {
        self.guard.lock().acknowledge();
    }

    pub fn warning_pending(&self) -> bool {
        self.guard.lock().is_pending()
    }

    pub fn high_gain_threshold(&self) -> f32 {
        self.guard.lock().threshold()
    }

    // ---- Chain attachment (session lifecycle only) -------------------------

    /// Bind to a freshly built chain as the session goes live.
    ///
    /// The current store values are re-pushed so edits made while the chain
    /// was being built are not lost, and the high-gain guard is re-armed and
    /// evaluated.
    pub(crate) fn attach(&self, controls: Weak<ChainControls>) {
        let store = self.store.lock();
        let params = store.params();
        if let Some(live) = controls.upgrade() {
            live.apply(&params);
        }
        *self.chain.lock() = Some(controls);

        let mut guard = self.guard.lock();
        guard.reset();
        if guard.observe(params.output_gain) {
            self.warn(params.output_gain);
        }
    }

    /// Forget the chain; later edits are stored only.
    pub(crate) fn detach(&self) {
        self.chain.lock().take();
        self.guard.lock().acknowledge();
    }

    pub fn is_attached(&self) -> bool {
        self.chain.lock().is_some()
    }

    /// Upgrade the chain reference.  `None` when idle or already torn down.
    pub(crate) fn live_controls(&self) -> Option<Arc<ChainControls>> {
        let chain = self.chain.lock();
        let weak = chain.as_ref()?;
        let controls = weak.upgrade();
        if controls.is_none() {
            log::debug!("[controller] chain already torn down, push skipped");
        }
        controls
    }

    fn push(&self, push: ParameterPush) {
        if let Some(controls) = self.live_controls() {
            controls.push(push);
        }
    }

    /// Runs the guard only while a chain is attached.
    fn check_output_gain(&self, output_gain: f32) {
        if !self.is_attached() {
            return;
        }
        if self.guard.lock().observe(output_gain) {
            self.warn(output_gain);
        }
    }

    fn warn(&self, output_gain: f32) {
        log::warn!("[controller] output gain {output_gain}% exceeds the safe threshold");
        // Ignore send errors; the receiver may have been dropped.
        let _ = self
            .events
            .send(SessionEvent::HighGainWarning { output_gain });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
