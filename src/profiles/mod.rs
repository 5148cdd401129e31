//! Profiles: named, reusable snapshots of every adjustable parameter.
//!
//! * [`BUILTIN_PROFILES`]: immutable table that seeds every session.
//! * [`UserProfiles`]: user-extensible list persisted as `profiles.json`.
//! * [`ProfileCatalog`]: resolves names and accepts new user profiles.

pub mod builtin;
pub mod catalog;
pub mod stored;

pub use builtin::{builtin_profiles, BuiltinProfile, BUILTIN_PROFILES};
pub use catalog::{ProfileCatalog, ProfileError};
pub use stored::{StoredProfile, UserProfiles};

use crate::params::ParameterSet;

/// A named parameter snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub params: ParameterSet,
}
