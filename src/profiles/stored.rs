//! Persisted user profiles.
//!
//! [`UserProfiles`] keeps the user-extensible list as a JSON array in
//! `profiles.json` next to `settings.toml`:
//!
//! ```json
//! [
//!   { "name": "Küche", "preAmp": 140, "volume": 110,
//!     "eq": { "125": -4, "250": -2, "500": 0, "1000": 4, "2000": 4, "4000": 2 },
//!     "balance": 0 }
//! ]
//! ```
//!
//! The file may have been edited by hand, so every field is read leniently:
//! missing, `null` or non-numeric values fall back to their defaults.  Names
//! are trimmed; an entry whose name is blank, reserved or already taken is
//! skipped.  A missing or unparsable file yields an empty list.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::{
    sanitize_balance, Band, EqGains, ParameterSet, CUSTOM_PROFILE_NAME, DEFAULT_GAIN,
};

use super::Profile;

// ---------------------------------------------------------------------------
// StoredProfile
// ---------------------------------------------------------------------------

/// On-disk shape of one user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub name: String,
    #[serde(rename = "preAmp", default)]
    pub pre_amp: Option<Value>,
    #[serde(default)]
    pub volume: Option<Value>,
    /// Band gain keyed by center frequency in Hz.
    #[serde(default)]
    pub eq: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub balance: Option<Value>,
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

impl StoredProfile {
    /// Convert into a sanitized [`Profile`].
    ///
    /// Returns the profile and whether any field had to be replaced by its
    /// default.
    pub fn to_profile(&self) -> (Profile, bool) {
        let mut repaired = false;
        let mut field = |v: Option<f64>, default: f64| {
            v.unwrap_or_else(|| {
                repaired = true;
                default
            })
        };

        let input_gain = field(number(self.pre_amp.as_ref()), DEFAULT_GAIN as f64) as f32;
        let output_gain = field(number(self.volume.as_ref()), DEFAULT_GAIN as f64) as f32;
        let balance = field(number(self.balance.as_ref()), 0.0);

        let mut eq = [0.0_f32; Band::COUNT];
        for band in Band::ALL {
            let value = self
                .eq
                .as_ref()
                .and_then(|m| m.get(&band.frequency().to_string()));
            eq[band.index()] = field(number(value), 0.0) as f32;
        }

        let raw = ParameterSet {
            input_gain,
            output_gain,
            eq: EqGains::from_array(eq),
            balance: sanitize_balance(balance),
        };
        let params = raw.sanitized();
        let out_of_range = !(input_gain.is_finite() && output_gain.is_finite())
            || params.input_gain != input_gain
            || params.output_gain != output_gain
            || params.eq.iter().any(|(b, g)| g != eq[b.index()])
            || params.balance as f64 != balance;

        (
            Profile {
                name: self.name.trim().to_string(),
                params,
            },
            repaired || out_of_range,
        )
    }

    pub fn from_profile(profile: &Profile) -> Self {
        let p = &profile.params;
        let eq = p
            .eq
            .iter()
            .map(|(band, g)| (band.frequency().to_string(), Value::from(g as f64)))
            .collect();
        Self {
            name: profile.name.clone(),
            pre_amp: Some(Value::from(p.input_gain as f64)),
            volume: Some(Value::from(p.output_gain as f64)),
            eq: Some(eq),
            balance: Some(Value::from(p.balance)),
        }
    }
}

// ---------------------------------------------------------------------------
// UserProfiles
// ---------------------------------------------------------------------------

/// The user-extensible profile list and where it is persisted.
///
/// A `None` path keeps the list in memory only.
#[derive(Debug, Clone, Default)]
pub struct UserProfiles {
    profiles: Vec<Profile>,
    path: Option<PathBuf>,
}

impl UserProfiles {
    /// An empty, non-persisted list.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing or unreadable file gives an empty list.
    pub fn load_from(path: PathBuf) -> Self {
        let profiles = Self::load_entries(&path);
        Self {
            profiles,
            path: Some(path),
        }
    }

    fn load_entries(path: &Path) -> Vec<Profile> {
        if !path.exists() {
            return Vec::new();
        }

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("[profiles] cannot read {} ({e}); using none", path.display());
                return Vec::new();
            }
        };

        let entries: Vec<Value> = match serde_json::from_str(&data) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("[profiles] cannot parse {} ({e}); using none", path.display());
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<StoredProfile>(entry) {
                Ok(stored) => {
                    let (profile, repaired) = stored.to_profile();
                    if profile.name.is_empty() {
                        log::warn!("[profiles] skipping entry with empty name");
                        return None;
                    }
                    if profile.name == CUSTOM_PROFILE_NAME {
                        log::warn!("[profiles] skipping entry using the reserved name '{CUSTOM_PROFILE_NAME}'");
                        return None;
                    }
                    if !seen.insert(profile.name.clone()) {
                        log::warn!("[profiles] skipping duplicate '{}'", profile.name);
                        return None;
                    }
                    if repaired {
                        log::warn!("[profiles] '{}' had invalid fields; defaults used", profile.name);
                    }
                    Some(profile)
                }
                Err(e) => {
                    log::warn!("[profiles] skipping malformed entry ({e})");
                    None
                }
            })
            .collect()
    }

    /// Drop entries whose name is already taken by one of `taken`.
    pub(crate) fn discard_shadowed(&mut self, taken: &[Profile]) {
        self.profiles.retain(|p| {
            let shadowed = taken.iter().any(|t| t.name == p.name);
            if shadowed {
                log::warn!("[profiles] skipping '{}', the name belongs to a built-in", p.name);
            }
            !shadowed
        });
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Persist the list with `profile` appended, then append it in memory.
    ///
    /// If writing fails the in-memory list is left unchanged.
    pub fn append(&mut self, profile: Profile) -> std::io::Result<()> {
        if let Some(path) = &self.path {
            let stored: Vec<StoredProfile> = self
                .profiles
                .iter()
                .chain(std::iter::once(&profile))
                .map(StoredProfile::from_profile)
                .collect();
            let data = serde_json::to_string_pretty(&stored)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, data)?;
        }
        self.profiles.push(profile);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Profile {
        Profile {
            name: "Küche".into(),
            params: ParameterSet::new(140.0, 110.0, [-4.0, -2.0, 0.0, 4.0, 4.0, 2.0], -10),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().expect("temp dir");
        let list = UserProfiles::load_from(dir.path().join("profiles.json"));
        assert!(list.profiles().is_empty());
    }

    #[test]
    fn garbage_file_is_empty() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(UserProfiles::load_from(path).profiles().is_empty());
    }

    #[test]
    fn append_persists_and_reloads() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("profiles.json");

        let mut list = UserProfiles::load_from(path.clone());
        list.append(sample()).expect("append");

        let reloaded = UserProfiles::load_from(path);
        assert_eq!(reloaded.profiles(), &[sample()]);
    }

    #[test]
    fn malformed_fields_are_defaulted() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"[{"name":"Hand","preAmp":"loud","volume":null,
                 "eq":{"125":5,"4000":99},"balance":12.4}]"#,
        )
        .unwrap();

        let list = UserProfiles::load_from(path);
        let p = &list.profiles()[0].params;
        assert_eq!(p.input_gain, 100.0);
        assert_eq!(p.output_gain, 100.0);
        assert_eq!(p.eq.get(Band::Hz125), 5.0);
        assert_eq!(p.eq.get(Band::Hz250), 0.0);
        assert_eq!(p.eq.get(Band::Hz4000), 20.0);
        assert_eq!(p.balance, 12);
        assert!(p.is_valid());
    }

    #[test]
    fn entries_without_name_are_skipped() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, r#"[{"preAmp":120},{"name":"  "},{"name":"Ok"}]"#).unwrap();

        let list = UserProfiles::load_from(path);
        assert_eq!(list.profiles().len(), 1);
        assert_eq!(list.profiles()[0].name, "Ok");
    }

    #[test]
    fn names_are_trimmed_and_deduplicated_on_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"[{"name":" Mine ","preAmp":120},{"name":"Mine","preAmp":80},
                {"name":"custom"},{"name":"Other"}]"#,
        )
        .unwrap();

        let list = UserProfiles::load_from(path);
        let names: Vec<&str> = list.profiles().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mine", "Other"]);
        assert_eq!(list.profiles()[0].params.input_gain, 120.0);
    }

    #[test]
    fn discard_shadowed_removes_taken_names() {
        let mut list = UserProfiles::in_memory();
        list.append(sample()).expect("in memory");
        list.append(Profile {
            name: "Eigen".into(),
            params: ParameterSet::default(),
        })
        .expect("in memory");

        list.discard_shadowed(&[sample()]);
        assert_eq!(list.profiles().len(), 1);
        assert_eq!(list.profiles()[0].name, "Eigen");
    }

    #[test]
    fn stored_profile_reports_repairs() {
        let stored = StoredProfile::from_profile(&sample());
        let (profile, repaired) = stored.to_profile();
        assert_eq!(profile, sample());
        assert!(!repaired);

        let mut broken = stored;
        broken.volume = None;
        assert!(broken.to_profile().1);
    }

    #[test]
    fn failed_write_leaves_list_unchanged() {
        let dir = tempdir().expect("temp dir");
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("profiles.json");
        std::fs::create_dir(&path).unwrap();

        let mut list = UserProfiles {
            profiles: Vec::new(),
            path: Some(path),
        };
        assert!(list.append(sample()).is_err());
        assert!(list.profiles().is_empty());
    }
}
