//! Profile Catalog: built-in profiles followed by the user list.

use thiserror::Error;

use crate::params::{ActiveProfile, ParameterSet, CUSTOM_PROFILE_NAME, DEFAULT_PROFILE_NAME};

use super::builtin::builtin_profiles;
use super::{Profile, UserProfiles};

// ---------------------------------------------------------------------------
// ProfileError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("no profile named '{0}'")]
    NotFound(String),

    #[error("a profile named '{0}' already exists")]
    DuplicateName(String),

    #[error("profile name is empty")]
    EmptyName,

    #[error("'{0}' is reserved and cannot be used as a profile name")]
    ReservedName(String),

    #[error("could not write the profile list: {0}")]
    Persist(String),
}

// ---------------------------------------------------------------------------
// ProfileCatalog
// ---------------------------------------------------------------------------

/// Resolves profile names to parameter snapshots and accepts new user
/// profiles.
///
/// Lookups search built-ins first, then user profiles, by exact
/// (case-sensitive) name.  Saving only ever appends.
pub struct ProfileCatalog {
    builtin: Vec<Profile>,
    user: UserProfiles,
}

impl ProfileCatalog {
    /// User profiles sharing a built-in's name are dropped.
    pub fn new(mut user: UserProfiles) -> Self {
        let builtin = builtin_profiles();
        user.discard_shadowed(&builtin);
        Self { builtin, user }
    }

    /// Sanitized parameters of the profile called `name`.
    pub fn resolve(&self, name: &str) -> Result<ParameterSet, ProfileError> {
        self.find(name)
            .map(|p| p.params.sanitized())
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// The [`ActiveProfile`] tag that applying `name` produces.
    pub fn active_for(name: &str) -> ActiveProfile {
        if name == DEFAULT_PROFILE_NAME {
            ActiveProfile::Default
        } else {
            ActiveProfile::Named(name.to_string())
        }
    }

    /// Append a user profile and persist the list.
    ///
    /// The name is trimmed first.  Returns the stored profile.
    pub fn save(&mut self, name: &str, params: ParameterSet) -> Result<Profile, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if name == CUSTOM_PROFILE_NAME {
            return Err(ProfileError::ReservedName(name.to_string()));
        }
        if self.find(name).is_some() {
            return Err(ProfileError::DuplicateName(name.to_string()));
        }

        let profile = Profile {
            name: name.to_string(),
            params: params.sanitized(),
        };
        self.user
            .append(profile.clone())
            .map_err(|e| ProfileError::Persist(e.to_string()))?;
        log::info!("[profiles] saved '{}'", profile.name);
        Ok(profile)
    }

    /// Every selectable name, built-ins first.
    pub fn names(&self) -> Vec<String> {
        self.builtin
            .iter()
            .chain(self.user.profiles())
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn builtin(&self) -> &[Profile] {
        &self.builtin
    }

    pub fn user(&self) -> &[Profile] {
        self.user.profiles()
    }

    fn find(&self, name: &str) -> Option<&Profile> {
        self.builtin
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.user.find(name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
