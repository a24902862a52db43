use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of housing plots on the map. Plot IDs and priorities both live in `1..=TOTAL_PLOTS`.
pub const TOTAL_PLOTS: u32 = 53;

/// A value outside `1..=TOTAL_PLOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub value: u32,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is outside the accepted range 1..={TOTAL_PLOTS}", self.value)
    }
}

impl std::error::Error for OutOfRange {}

const fn check_range(value: u32) -> Result<u32, OutOfRange> {
    if value >= 1 && value <= TOTAL_PLOTS {
        Ok(value)
    } else {
        Err(OutOfRange { value })
    }
}

/// Housing plot identifier.
///
/// Deserialization is lenient so that a roster with stray entries still loads;
/// [`crate::PlotData::repair`] drops anything out of range afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotId(u32);

impl PlotId {
    pub const fn new(value: u32) -> Result<Self, OutOfRange> {
        match check_range(value) {
            Ok(value) => Ok(Self(value)),
            Err(e) => Err(e),
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        check_range(self.0).is_ok()
    }

    /// Every plot on the map, in ascending order.
    pub fn all() -> impl Iterator<Item = PlotId> {
        (1..=TOTAL_PLOTS).map(PlotId)
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rank a member gives a plot. 1 is the most wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u32);

impl Priority {
    pub const FIRST: Priority = Priority(1);

    pub const fn new(value: u32) -> Result<Self, OutOfRange> {
        match check_range(value) {
            Ok(value) => Ok(Self(value)),
            Err(e) => Err(e),
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        check_range(self.0).is_ok()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
