//! Fragment count queries.
//!
//! Decision scripts ask for fragment counts through a dotted expression:
//!
//! ```text
//! <category>[.<filter>]
//!
//! category := soul_fragments | greater_soul_fragments
//!           | lesser_soul_fragments | demon_soul_fragments
//! filter   := active | inactive | total        (default: active)
//! ```
//!
//! Both tokens match ASCII case-insensitively. Expressions are parsed once, up
//! front; an unknown token is an error, never a silent default.
//!
//! # Example
//!
//! ```
//! use shardfall_core::query::{CountFilter, FragmentQuery};
//!
//! let query: FragmentQuery = "Greater_Soul_Fragments.TOTAL".parse().unwrap();
//! assert_eq!(query.filter(), CountFilter::Total);
//! assert_eq!(query.to_string(), "greater_soul_fragments.total");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::fragment::FragmentKind;
use crate::registry::FragmentRegistry;

/// Which fragment states a query counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountFilter {
    /// Active fragments only.
    #[default]
    Active,
    /// Pending fragments only.
    Inactive,
    /// Pending and Active fragments.
    Total,
}

impl CountFilter {
    /// The filter's token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Total => "total",
        }
    }
}

impl FromStr for CountFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "total" => Ok(Self::Total),
            _ => Err(QueryError::UnknownFilter(s.to_owned())),
        }
    }
}

/// Named fragment category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentCategory {
    /// Every fragment.
    Soul,
    /// Greater fragments, demon or not.
    GreaterSoul,
    /// Lesser fragments.
    LesserSoul,
    /// Demon and empowered demon fragments.
    DemonSoul,
}

impl FragmentCategory {
    /// The category's token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Soul => "soul_fragments",
            Self::GreaterSoul => "greater_soul_fragments",
            Self::LesserSoul => "lesser_soul_fragments",
            Self::DemonSoul => "demon_soul_fragments",
        }
    }

    /// The kind mask the category selects.
    #[must_use]
    pub const fn mask(self) -> FragmentKind {
        match self {
            Self::Soul => FragmentKind::ANY,
            Self::GreaterSoul => FragmentKind::ANY_GREATER,
            Self::LesserSoul => FragmentKind::LESSER,
            Self::DemonSoul => FragmentKind::ANY_DEMON,
        }
    }
}

impl FromStr for FragmentCategory {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "soul_fragments" => Ok(Self::Soul),
            "greater_soul_fragments" => Ok(Self::GreaterSoul),
            "lesser_soul_fragments" => Ok(Self::LesserSoul),
            "demon_soul_fragments" => Ok(Self::DemonSoul),
            _ => Err(QueryError::UnknownCategory(s.to_owned())),
        }
    }
}

/// A parsed count query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentQuery {
    category: FragmentCategory,
    filter: CountFilter,
}

impl FragmentQuery {
    /// Builds a query directly.
    #[must_use]
    pub const fn new(category: FragmentCategory, filter: CountFilter) -> Self {
        Self { category, filter }
    }

    /// The queried category.
    #[must_use]
    pub const fn category(self) -> FragmentCategory {
        self.category
    }

    /// The state filter.
    #[must_use]
    pub const fn filter(self) -> CountFilter {
        self.filter
    }

    /// Counts matching fragments in `registry`.
    #[must_use]
    pub fn evaluate(&self, registry: &FragmentRegistry) -> usize {
        let mask = self.category.mask();
        match self.filter {
            CountFilter::Active => registry.count_active(mask),
            CountFilter::Inactive => registry.count_inactive(mask),
            CountFilter::Total => registry.count_total(mask),
        }
    }
}

impl FromStr for FragmentQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.trim().split('.');
        let category = match tokens.next() {
            Some(token) if !token.is_empty() => token.parse::<FragmentCategory>()?,
            _ => return Err(QueryError::Malformed(s.to_owned())),
        };
        let filter = match tokens.next() {
            Some(token) => token.parse::<CountFilter>()?,
            None => CountFilter::default(),
        };
        if tokens.next().is_some() {
            return Err(QueryError::Malformed(s.to_owned()));
        }
        Ok(Self { category, filter })
    }
}

impl fmt::Display for FragmentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category.name(), self.filter.name())
    }
}
