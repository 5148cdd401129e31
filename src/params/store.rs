//! Parameter Store: current control values plus the identity of the active
//! profile.  Pure state, no I/O.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::set::{sanitize_balance, sanitize_gain};
use super::{Band, ParameterSet};

/// Label shown for the flat built-in state.
pub const DEFAULT_PROFILE_NAME: &str = "default";
/// Label shown once any control has been edited by hand.
pub const CUSTOM_PROFILE_NAME: &str = "custom";

// ---------------------------------------------------------------------------
// ActiveProfile
// ---------------------------------------------------------------------------

/// Which profile the current parameters came from.
///
/// This is derived from edit history: any manual edit turns it into
/// [`ActiveProfile::Custom`] and only applying a profile turns it back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveProfile {
    /// The built-in flat state.
    #[default]
    Default,
    /// A named built-in or user profile.
    Named(String),
    /// Parameters were edited after the last profile application.
    Custom,
}

impl ActiveProfile {
    /// Display name (`"default"`, `"custom"` or the profile name).
    pub fn name(&self) -> &str {
        match self {
            ActiveProfile::Default => DEFAULT_PROFILE_NAME,
            ActiveProfile::Named(name) => name,
            ActiveProfile::Custom => CUSTOM_PROFILE_NAME,
        }
    }
}

impl fmt::Display for ActiveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ParameterStore
// ---------------------------------------------------------------------------

/// Current [`ParameterSet`] and [`ActiveProfile`].
///
/// Single-field setters sanitize their input, mark the store as
/// [`ActiveProfile::Custom`] and return the value actually stored so the
/// caller can push exactly that value to the live chain.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: ParameterSet,
    active: ActiveProfile,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all parameters.
    pub fn params(&self) -> ParameterSet {
        self.params
    }

    pub fn active_profile(&self) -> &ActiveProfile {
        &self.active
    }

    pub fn set_input_gain(&mut self, percent: f32) -> f32 {
        self.params.input_gain = sanitize_gain(percent);
        self.active = ActiveProfile::Custom;
        self.params.input_gain
    }

    pub fn set_output_gain(&mut self, percent: f32) -> f32 {
        self.params.output_gain = sanitize_gain(percent);
        self.active = ActiveProfile::Custom;
        self.params.output_gain
    }

    pub fn set_balance(&mut self, balance: i32) -> i32 {
        self.params.balance = sanitize_balance(balance as f64);
        self.active = ActiveProfile::Custom;
        self.params.balance
    }

    pub fn set_band_gain(&mut self, band: Band, db: f32) -> f32 {
        let stored = self.params.eq.set(band, db);
        self.active = ActiveProfile::Custom;
        stored
    }

    /// Replace every parameter at once and record where they came from.
    pub fn apply(&mut self, active: ActiveProfile, params: ParameterSet) {
        self.params = params.sanitized();
        self.active = active;
    }
}

/// Store shared between the controller and the front end.
pub type SharedStore = Arc<Mutex<ParameterStore>>;

/// Construct a new [`SharedStore`] holding the default state.
pub fn new_shared_store() -> SharedStore {
    Arc::new(Mutex::new(ParameterStore::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ActiveProfile {
        ActiveProfile::Named(name.into())
    }

    #[test]
    fn starts_at_default() {
        let store = ParameterStore::new();
        assert_eq!(store.active_profile(), &ActiveProfile::Default);
        assert_eq!(store.params(), ParameterSet::default());
    }

    #[test]
    fn apply_sets_all_fields_and_name() {
        let mut store = ParameterStore::new();
        let p = ParameterSet::new(130.0, 120.0, [-2.0, -4.0, 0.0, 6.0, 5.0, 3.0], 0);
        store.apply(named("Gespräch"), p);
        assert_eq!(store.params(), p);
        assert_eq!(store.active_profile().name(), "Gespräch");
    }

    #[test]
    fn every_single_edit_marks_custom() {
        type Edit = fn(&mut ParameterStore);
        let edits: [Edit; 4] = [
            |s| {
                s.set_input_gain(90.0);
            },
            |s| {
                s.set_output_gain(90.0);
            },
            |s| {
                s.set_balance(10);
            },
            |s| {
                s.set_band_gain(Band::Hz250, 1.0);
            },
        ];

        for edit in edits {
            let mut store = ParameterStore::new();
            store.apply(named("Musik"), ParameterSet::default());
            edit(&mut store);
            assert_eq!(store.active_profile(), &ActiveProfile::Custom);
        }
    }

    #[test]
    fn edit_to_identical_value_still_marks_custom() {
        let mut store = ParameterStore::new();
        store.apply(named("Musik"), ParameterSet::default());
        store.set_balance(0);
        assert_eq!(store.active_profile(), &ActiveProfile::Custom);
    }

    #[test]
    fn setters_return_sanitized_value() {
        let mut store = ParameterStore::new();
        assert_eq!(store.set_input_gain(f32::NAN), 100.0);
        assert_eq!(store.set_output_gain(999.0), 300.0);
        assert_eq!(store.set_balance(-250), -100);
        assert_eq!(store.set_band_gain(Band::Hz4000, -30.0), -20.0);
        assert!(store.params().is_valid());
    }

    #[test]
    fn active_profile_labels() {
        assert_eq!(ActiveProfile::Default.to_string(), "default");
        assert_eq!(ActiveProfile::Custom.to_string(), "custom");
        assert_eq!(named("TV").to_string(), "TV");
    }
}
