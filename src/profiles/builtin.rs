//! Built-in hearing profiles.  Immutable; they seed every session.

use crate::params::{Band, ParameterSet, DEFAULT_PROFILE_NAME};

use super::Profile;

/// Compile-time description of a built-in profile.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProfile {
    pub name: &'static str,
    pub input_gain: f32,
    pub output_gain: f32,
    /// Band gains in ascending frequency order (125 Hz … 4 kHz).
    pub eq: [f32; Band::COUNT],
    pub balance: i32,
}

impl BuiltinProfile {
    pub fn params(&self) -> ParameterSet {
        ParameterSet::new(self.input_gain, self.output_gain, self.eq, self.balance)
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            name: self.name.to_string(),
            params: self.params(),
        }
    }
}

/// The built-in catalog, in picker order.  The first entry is the flat state.
pub const BUILTIN_PROFILES: [BuiltinProfile; 6] = [
    BuiltinProfile {
        name: DEFAULT_PROFILE_NAME,
        input_gain: 100.0,
        output_gain: 100.0,
        eq: [0.0; Band::COUNT],
        balance: 0,
    },
    // Speech intelligibility: cut rumble, lift the consonant range.
    BuiltinProfile {
        name: "Gespräch",
        input_gain: 130.0,
        output_gain: 120.0,
        eq: [-2.0, -4.0, 0.0, 6.0, 5.0, 3.0],
        balance: 0,
    },
    BuiltinProfile {
        name: "Fernsehen",
        input_gain: 120.0,
        output_gain: 130.0,
        eq: [-3.0, -2.0, 2.0, 5.0, 6.0, 4.0],
        balance: 0,
    },
    BuiltinProfile {
        name: "Musik",
        input_gain: 100.0,
        output_gain: 110.0,
        eq: [3.0, 2.0, 0.0, 1.0, 2.0, 3.0],
        balance: 0,
    },
    // Noisy rooms: strong low cut so chatter and clatter don't mask voices.
    BuiltinProfile {
        name: "Restaurant",
        input_gain: 140.0,
        output_gain: 120.0,
        eq: [-8.0, -6.0, -2.0, 6.0, 6.0, 4.0],
        balance: 0,
    },
    BuiltinProfile {
        name: "Natur",
        input_gain: 150.0,
        output_gain: 130.0,
        eq: [-6.0, -4.0, 0.0, 3.0, 8.0, 10.0],
        balance: 0,
    },
];

/// All built-in profiles as owned [`Profile`] values.
pub fn builtin_profiles() -> Vec<Profile> {
    BUILTIN_PROFILES.iter().map(BuiltinProfile::to_profile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = BUILTIN_PROFILES.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), BUILTIN_PROFILES.len());
    }

    #[test]
    fn every_builtin_is_already_in_range() {
        for p in BUILTIN_PROFILES {
            let unsanitized = ParameterSet {
                input_gain: p.input_gain,
                output_gain: p.output_gain,
                eq: crate::params::EqGains::from_array(p.eq),
                balance: p.balance,
            };
            assert!(unsanitized.is_valid(), "{} is out of range", p.name);
            assert_eq!(unsanitized, p.params());
        }
    }

    #[test]
    fn first_entry_is_the_flat_default() {
        assert_eq!(BUILTIN_PROFILES[0].name, DEFAULT_PROFILE_NAME);
        assert_eq!(BUILTIN_PROFILES[0].params(), ParameterSet::default());
    }
}
