//! Additive priority scale for queued tasks.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Dispatch priority. Higher values run first; equal values run in insertion order.
///
/// Levels add up, so a task that must beat everything at `HIGH` can ask for
/// `Priority::HIGH + Priority::HIGH`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub u16);

impl Priority {
    pub const LOW: Priority = Priority(10);
    pub const NORMAL: Priority = Priority(20);
    pub const HIGH: Priority = Priority(30);

    pub fn value(self) -> u16 {
        self.0
    }
}

impl Add for Priority {
    type Output = Priority;

    fn add(self, rhs: Priority) -> Priority {
        Priority(self.0.saturating_add(rhs.0))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::LOW => f.write_str("low"),
            Self::NORMAL => f.write_str("normal"),
            Self::HIGH => f.write_str("high"),
            Priority(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Priority::LOW < Priority::NORMAL);
        assert!(Priority::NORMAL < Priority::HIGH);
    }

    #[test]
    fn boosted_priority_outranks_every_base_level() {
        let boosted = Priority::HIGH + Priority::HIGH;
        assert!(boosted > Priority::HIGH);
        assert_eq!(boosted.value(), 60);
        assert_eq!(boosted.to_string(), "60");
        assert_eq!(Priority::HIGH.to_string(), "high");
    }

    #[test]
    fn addition_saturates() {
        assert_eq!(Priority(u16::MAX) + Priority::HIGH, Priority(u16::MAX));
    }
}
