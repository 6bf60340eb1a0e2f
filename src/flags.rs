//! Logical input/output identities and the bit-set that holds them.
//!
//! Each flag is a closed enum variant with a fixed bit position, so a
//! `match` over the enum is exhaustive and the bit layout cannot drift.
//!
//! ```text
//!  InputFlag   bit   OutputFlag      bit
//!  ─────────── ───   ─────────────── ───
//!  DhwRequest   0    Fan              0
//!  ChRequest    1    Pump             1
//!  Airflow      2    Igniter          2
//!  Flame        3    SecurityValve    3
//!  Overheat     4    Valve1           4
//!                    Valve2           5
//!                    Valve3           6
//!                    StatusLed        7
//! ```

use core::fmt;
use core::marker::PhantomData;

/// A closed set of flags that fit in one byte.
pub trait Flag: Copy + Eq + fmt::Debug + 'static {
    /// Every variant, in bit order.
    const ALL: &'static [Self];

    /// Single-bit mask for this flag.
    fn mask(self) -> u8;
}

/// Logical sensor inputs, after polarity correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputFlag {
    DhwRequest = 0,
    ChRequest = 1,
    Airflow = 2,
    Flame = 3,
    Overheat = 4,
}

impl Flag for InputFlag {
    const ALL: &'static [Self] = &[
        Self::DhwRequest,
        Self::ChRequest,
        Self::Airflow,
        Self::Flame,
        Self::Overheat,
    ];

    fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Actuator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputFlag {
    Fan = 0,
    Pump = 1,
    Igniter = 2,
    SecurityValve = 3,
    Valve1 = 4,
    Valve2 = 5,
    Valve3 = 6,
    StatusLed = 7,
}

impl OutputFlag {
    /// Outputs that let gas reach the burner or light it.
    pub const GAS: [Self; 5] = [
        Self::SecurityValve,
        Self::Valve1,
        Self::Valve2,
        Self::Valve3,
        Self::Igniter,
    ];

    /// The three modulating fuel valves.
    pub const FUEL_VALVES: [Self; 3] = [Self::Valve1, Self::Valve2, Self::Valve3];
}

impl Flag for OutputFlag {
    const ALL: &'static [Self] = &[
        Self::Fan,
        Self::Pump,
        Self::Igniter,
        Self::SecurityValve,
        Self::Valve1,
        Self::Valve2,
        Self::Valve3,
        Self::StatusLed,
    ];

    fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Fixed-size bit-set over one flag family.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlagSet<F: Flag> {
    bits: u8,
    _family: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _family: PhantomData,
        }
    }

    pub fn contains(&self, flag: F) -> bool {
        self.bits & flag.mask() != 0
    }

    /// Set or clear `flag`.  Returns `true` if the stored value changed.
    pub fn assign(&mut self, flag: F, on: bool) -> bool {
        let before = self.bits;
        if on {
            self.bits |= flag.mask();
        } else {
            self.bits &= !flag.mask();
        }
        before != self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Raw byte, for the dashboard.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of flags from `among` that are set.
    pub fn count_of(&self, among: &[F]) -> usize {
        among.iter().filter(|f| self.contains(**f)).count()
    }

    /// Set flags, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(|f| self.contains(*f))
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
