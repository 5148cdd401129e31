//! The six fixed equalizer bands.

use std::fmt;

// ---------------------------------------------------------------------------
// Band
// ---------------------------------------------------------------------------

/// One of the six fixed equalizer center frequencies.
///
/// The set is closed: bands are never added or removed at runtime.  The
/// derived ordering is ascending frequency, which is also the order in which
/// equalizer stages are wired into the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Hz125,
    Hz250,
    Hz500,
    Hz1000,
    Hz2000,
    Hz4000,
}

impl Band {
    /// Number of bands.
    pub const COUNT: usize = 6;

    /// All bands in ascending frequency order.
    pub const ALL: [Band; Band::COUNT] = [
        Band::Hz125,
        Band::Hz250,
        Band::Hz500,
        Band::Hz1000,
        Band::Hz2000,
        Band::Hz4000,
    ];

    /// Center frequency in Hz.
    pub fn frequency(self) -> u32 {
        match self {
            Band::Hz125 => 125,
            Band::Hz250 => 250,
            Band::Hz500 => 500,
            Band::Hz1000 => 1000,
            Band::Hz2000 => 2000,
            Band::Hz4000 => 4000,
        }
    }

    /// Position of this band in [`Band::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short slider label, e.g. `"1k"`.
    pub fn label(self) -> &'static str {
        match self {
            Band::Hz125 => "125",
            Band::Hz250 => "250",
            Band::Hz500 => "500",
            Band::Hz1000 => "1k",
            Band::Hz2000 => "2k",
            Band::Hz4000 => "4k",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.frequency())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_ascending() {
        let freqs: Vec<u32> = Band::ALL.iter().map(|b| b.frequency()).collect();
        assert_eq!(freqs, vec![125, 250, 500, 1000, 2000, 4000]);
        assert!(Band::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn index_matches_position() {
        for (i, band) in Band::ALL.iter().enumerate() {
            assert_eq!(band.index(), i);
        }
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(Band::Hz2000.to_string(), "2000 Hz");
    }
}
