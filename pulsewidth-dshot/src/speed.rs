//! DShot bit-rate presets

use pulsewidth_core::TimingSpec;

/// DShot speed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DshotSpeed {
    DShot150,
    DShot300,
    DShot600,
    DShot1200,
}

impl DshotSpeed {
    /// Bit rate in bits per second
    pub const fn bit_rate(self) -> u32 {
        match self {
            Self::DShot150 => 150_000,
            Self::DShot300 => 300_000,
            Self::DShot600 => 600_000,
            Self::DShot1200 => 1_200_000,
        }
    }

    /// Symbol timing for this speed
    ///
    /// High times are 75% (one) and 37.5% (zero) of the bit period; the
    /// tolerance is about 12% of it.
    pub const fn timing(self) -> TimingSpec {
        match self {
            Self::DShot150 => TimingSpec::uniform(5000, 1666, 2500, 4167, 800, 13333),
            Self::DShot300 => TimingSpec::uniform(2500, 833, 1250, 2083, 400, 6666),
            Self::DShot600 => TimingSpec::uniform(1250, 416, 625, 1041, 200, 3333),
            Self::DShot1200 => TimingSpec::uniform(625, 208, 313, 520, 100, 1666),
        }
    }
}
