//! Discrete heat levels.
//!
//! Each row splits one modulation cycle between the three fuel valves.
//! Valve 1 has the smallest orifice, valve 3 the largest, so shifting
//! time towards higher valves raises the average firing rate.
//!
//! Every row's duty percentages must sum to exactly 100: anything else
//! leaves the burner without gas for part of a cycle (flame loss) or
//! asks for more than one valve at once.

/// One immutable row of the heat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatLevel {
    /// Share of the cycle each valve is open, in percent.
    pub duty: [u8; 3],
    /// Nominal heat output in watts (informational).
    pub capacity_w: u32,
    /// Nominal gas consumption in litres per hour (informational).
    pub gas_usage_lph: u16,
}

impl HeatLevel {
    pub const fn new(duty: [u8; 3], capacity_w: u32, gas_usage_lph: u16) -> Self {
        Self {
            duty,
            capacity_w,
            gas_usage_lph,
        }
    }

    /// Whether the duty split covers the whole cycle.
    pub fn is_valid(&self) -> bool {
        self.duty.iter().map(|&d| u16::from(d)).sum::<u16>() == 100
    }
}

/// Heat levels, lowest output first.  Index 0 is the safe minimum.
pub static HEAT_LEVELS: [HeatLevel; 8] = [
    HeatLevel::new([100, 0, 0], 8_000, 850),
    HeatLevel::new([75, 25, 0], 10_000, 1_060),
    HeatLevel::new([50, 50, 0], 12_000, 1_270),
    HeatLevel::new([25, 75, 0], 14_000, 1_480),
    HeatLevel::new([0, 100, 0], 16_000, 1_690),
    HeatLevel::new([0, 75, 25], 18_500, 1_950),
    HeatLevel::new([0, 50, 50], 21_000, 2_220),
    HeatLevel::new([0, 0, 100], 26_000, 2_750),
];
