#![forbid(unsafe_code)]

//! Identifiers for observed regions.
//!
//! A *sentinel* is any DOM region the activation system watches: a zone, a
//! step inside a stepped zone, or a gap between zones.

use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create an id from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Unique id of a canvas zone.
    ZoneId
);

string_id!(
    /// Unique id of a gap region between zones.
    GapId
);

/// Any region registered for visibility tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SentinelId {
    /// A whole zone.
    Zone(ZoneId),
    /// One step of a stepped zone.
    Step(ZoneId, usize),
    /// A gap between zones.
    Gap(GapId),
}

impl SentinelId {
    /// Sentinel for a zone.
    #[must_use]
    pub fn zone(id: impl Into<ZoneId>) -> Self {
        Self::Zone(id.into())
    }

    /// Sentinel for a step of `zone`.
    #[must_use]
    pub fn step(zone: impl Into<ZoneId>, index: usize) -> Self {
        Self::Step(zone.into(), index)
    }

    /// Sentinel for a gap.
    #[must_use]
    pub fn gap(id: impl Into<GapId>) -> Self {
        Self::Gap(id.into())
    }

    /// The zone this sentinel belongs to, if any.
    #[must_use]
    pub fn zone_id(&self) -> Option<&ZoneId> {
        match self {
            Self::Zone(zone) | Self::Step(zone, _) => Some(zone),
            Self::Gap(_) => None,
        }
    }

    /// Short kind label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Zone(_) => "zone",
            Self::Step(..) => "step",
            Self::Gap(_) => "gap",
        }
    }
}

impl fmt::Display for SentinelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone(zone) => write!(f, "zone:{zone}"),
            Self::Step(zone, index) => write!(f, "step:{zone}#{index}"),
            Self::Gap(gap) => write!(f, "gap:{gap}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(SentinelId::zone("a").to_string(), "zone:a");
        assert_eq!(SentinelId::step("a", 2).to_string(), "step:a#2");
        assert_eq!(SentinelId::gap("g").to_string(), "gap:g");
    }

    #[test]
    fn zone_id_of_step_is_parent() {
        let step = SentinelId::step("intro", 0);
        assert_eq!(step.zone_id(), Some(&ZoneId::from("intro")));
        assert_eq!(SentinelId::gap("g").zone_id(), None);
    }

    #[test]
    fn ids_compare_by_content() {
        assert_eq!(ZoneId::new(String::from("x")), ZoneId::from("x"));
        assert!(ZoneId::from("a") < ZoneId::from("b"));
    }
}
