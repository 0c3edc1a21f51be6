//! Fragment categories as a finite set.
//!
//! A fragment's kind combines one **size class** (`GREATER` or `LESSER`) with
//! one **origin class** (`NORMAL`, `DEMON` or `EMPOWERED_DEMON`). Query masks
//! are arbitrary unions of these flags; a fragment matches a mask when the two
//! sets intersect.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::FragmentError;

bitflags! {
    /// Set of fragment category flags.
    ///
    /// Used both as the concrete kind of a spawned fragment and as the filter
    /// mask for counts and consumption.
    ///
    /// # Example
    ///
    /// ```
    /// use shardfall_core::fragment::FragmentKind;
    ///
    /// let demon = FragmentKind::greater_demon();
    /// assert!(demon.matches(FragmentKind::ANY_DEMON));
    /// assert!(demon.matches(FragmentKind::ANY_GREATER));
    /// assert!(!demon.matches(FragmentKind::LESSER));
    /// ```
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FragmentKind: u8 {
        /// Small fragment.
        const LESSER = 1 << 0;
        /// Large fragment.
        const GREATER = 1 << 1;
        /// Spawned from an ordinary source.
        const NORMAL = 1 << 2;
        /// Spawned from a demon.
        const DEMON = 1 << 3;
        /// Spawned from an empowered demon.
        const EMPOWERED_DEMON = 1 << 4;

        /// Every greater fragment, whatever its origin.
        const ANY_GREATER = Self::GREATER.bits();
        /// Every demon-origin fragment.
        const ANY_DEMON = Self::DEMON.bits() | Self::EMPOWERED_DEMON.bits();
        /// Every fragment.
        const ANY = Self::LESSER.bits()
            | Self::GREATER.bits()
            | Self::NORMAL.bits()
            | Self::DEMON.bits()
            | Self::EMPOWERED_DEMON.bits();
    }
}

impl FragmentKind {
    /// Size-class flags.
    pub const SIZE_CLASS: Self = Self::LESSER.union(Self::GREATER);

    /// Origin-class flags.
    pub const ORIGIN_CLASS: Self = Self::NORMAL
        .union(Self::DEMON)
        .union(Self::EMPOWERED_DEMON);

    /// A lesser fragment from an ordinary source.
    #[must_use]
    pub const fn lesser() -> Self {
        Self::LESSER.union(Self::NORMAL)
    }

    /// A greater fragment from an ordinary source.
    #[must_use]
    pub const fn greater() -> Self {
        Self::GREATER.union(Self::NORMAL)
    }

    /// A greater fragment dropped by a demon.
    #[must_use]
    pub const fn greater_demon() -> Self {
        Self::GREATER.union(Self::DEMON)
    }

    /// A greater fragment dropped by an empowered demon.
    #[must_use]
    pub const fn empowered_demon() -> Self {
        Self::GREATER.union(Self::EMPOWERED_DEMON)
    }

    /// Returns true if this kind shares at least one flag with `mask`.
    #[must_use]
    pub const fn matches(self, mask: Self) -> bool {
        self.intersects(mask)
    }

    /// Checks that this kind can describe a single spawned fragment.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::InvalidKind`] unless exactly one size class
    /// and exactly one origin class are set.
    pub fn validate(self) -> Result<Self, FragmentError> {
        let sizes = self.intersection(Self::SIZE_CLASS).bits().count_ones();
        let origins = self.intersection(Self::ORIGIN_CLASS).bits().count_ones();
        if sizes == 1 && origins == 1 {
            Ok(self)
        } else {
            Err(FragmentError::InvalidKind(self))
        }
    }

    /// Human-readable label for a concrete kind.
    ///
    /// Masks that do not describe a single fragment read as "soul fragment".
    #[must_use]
    pub fn label(self) -> &'static str {
        if self.validate().is_err() {
            "soul fragment"
        } else if self.contains(Self::EMPOWERED_DEMON) {
            "empowered demon fragment"
        } else if self.contains(Self::DEMON) {
            if self.contains(Self::GREATER) {
                "greater demon fragment"
            } else {
                "lesser demon fragment"
            }
        } else if self.contains(Self::GREATER) {
            "greater soul fragment"
        } else {
            "lesser soul fragment"
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod set_tests {
        use super::*;

        #[test]
        fn named_kinds_are_valid() {
            for kind in [
                FragmentKind::lesser(),
                FragmentKind::greater(),
                FragmentKind::greater_demon(),
                FragmentKind::empowered_demon(),
            ] {
                assert_eq!(kind.validate(), Ok(kind));
            }
        }

        #[test]
        fn masks_are_not_spawnable() {
            for mask in [
                FragmentKind::ANY,
                FragmentKind::ANY_DEMON,
                FragmentKind::GREATER,
                FragmentKind::empty(),
            ] {
                assert!(mask.validate().is_err());
            }
        }

        #[test]
        fn any_matches_everything() {
            assert!(FragmentKind::lesser().matches(FragmentKind::ANY));
            assert!(FragmentKind::empowered_demon().matches(FragmentKind::ANY));
        }

        #[test]
        fn greater_mask_ignores_lesser() {
            assert!(FragmentKind::greater().matches(FragmentKind::ANY_GREATER));
            assert!(FragmentKind::greater_demon().matches(FragmentKind::ANY_GREATER));
            assert!(!FragmentKind::lesser().matches(FragmentKind::ANY_GREATER));
        }

        #[test]
        fn demon_mask_covers_both_demon_origins() {
            assert!(FragmentKind::greater_demon().matches(FragmentKind::ANY_DEMON));
            assert!(FragmentKind::empowered_demon().matches(FragmentKind::ANY_DEMON));
            assert!(!FragmentKind::greater().matches(FragmentKind::ANY_DEMON));
        }

        #[test]
        fn empty_mask_matches_nothing() {
            assert!(!FragmentKind::greater().matches(FragmentKind::empty()));
        }

        #[test]
        fn union_of_masks() {
            let mask = FragmentKind::LESSER | FragmentKind::ANY_DEMON;
            assert!(FragmentKind::lesser().matches(mask));
            assert!(FragmentKind::greater_demon().matches(mask));
            assert!(!FragmentKind::greater().matches(mask));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(FragmentKind::lesser().to_string(), "lesser soul fragment");
        assert_eq!(FragmentKind::greater().to_string(), "greater soul fragment");
        assert_eq!(FragmentKind::greater_demon().to_string(), "greater demon fragment");
        assert_eq!(
            FragmentKind::empowered_demon().to_string(),
            "empowered demon fragment"
        );
        assert_eq!(FragmentKind::ANY.to_string(), "soul fragment");
    }
}
