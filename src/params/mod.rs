//! Adjustable parameters: the six fixed [`Band`]s, [`ParameterSet`]
//! snapshots with their sanitization rules, and the [`ParameterStore`] that
//! tracks the current values and the active profile.

pub mod band;
pub mod set;
pub mod store;

pub use band::Band;
pub use set::{
    sanitize_balance, sanitize_band_gain, sanitize_gain, EqGains, ParameterSet, DEFAULT_GAIN,
    MAX_BALANCE, MAX_BAND_GAIN, MAX_GAIN, MIN_BALANCE, MIN_BAND_GAIN, MIN_GAIN,
};
pub use store::{
    new_shared_store, ActiveProfile, ParameterStore, SharedStore, CUSTOM_PROFILE_NAME,
    DEFAULT_PROFILE_NAME,
};
