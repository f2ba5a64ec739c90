//! Filter dimensions and their value domains
//!
//! Each dimension maps onto one or two API query parameters. Value order is
//! fixed so a run visits the refinement tree deterministically.

use crate::catalog::FilterCatalog;
use serde::Deserialize;
use std::fmt;

/// Dimension order used when the configuration does not override it
pub const DEFAULT_REFINEMENT_ORDER: [FilterDimension; 6] = [
    FilterDimension::AgeRange,
    FilterDimension::Sex,
    FilterDimension::WantedByCountry,
    FilterDimension::Nationality,
    FilterDimension::ForenameInitial,
    FilterDimension::SurnameInitial,
];

/// Ordered, non-overlapping partition of ages 18 through 120
pub const AGE_RANGES: [AgeRange; 18] = [
    AgeRange::new(18, 24),
    AgeRange::new(25, 25),
    AgeRange::new(26, 26),
    AgeRange::new(27, 27),
    AgeRange::new(28, 28),
    AgeRange::new(29, 29),
    AgeRange::new(30, 30),
    AgeRange::new(31, 31),
    AgeRange::new(32, 32),
    AgeRange::new(33, 33),
    AgeRange::new(34, 34),
    AgeRange::new(35, 35),
    AgeRange::new(36, 39),
    AgeRange::new(40, 44),
    AgeRange::new(45, 49),
    AgeRange::new(50, 69),
    AgeRange::new(70, 89),
    AgeRange::new(90, 120),
];

/// A refinable axis of the search API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterDimension {
    AgeRange,
    Sex,
    WantedByCountry,
    Nationality,
    ForenameInitial,
    SurnameInitial,
}

impl FilterDimension {
    /// Returns the kebab-case name used in configuration files and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgeRange => "age-range",
            Self::Sex => "sex",
            Self::WantedByCountry => "wanted-by-country",
            Self::Nationality => "nationality",
            Self::ForenameInitial => "forename-initial",
            Self::SurnameInitial => "surname-initial",
        }
    }

    /// Enumerates every legal value of this dimension, in refinement order
    ///
    /// The two country dimensions draw their values from the catalog; all
    /// other dimensions have fixed domains.
    pub fn values(&self, catalog: &FilterCatalog) -> Vec<FilterValue> {
        match self {
            Self::AgeRange => AGE_RANGES.iter().copied().map(FilterValue::Age).collect(),
            Self::Sex => Sex::ALL.iter().copied().map(FilterValue::Sex).collect(),
            Self::WantedByCountry | Self::Nationality => catalog
                .codes()
                .iter()
                .cloned()
                .map(FilterValue::Country)
                .collect(),
            Self::ForenameInitial | Self::SurnameInitial => {
                ('A'..='Z').map(FilterValue::Initial).collect()
            }
        }
    }

    /// Returns true if `value` belongs to this dimension's domain type
    pub fn accepts(&self, value: &FilterValue) -> bool {
        matches!(
            (self, value),
            (Self::AgeRange, FilterValue::Age(_))
                | (Self::Sex, FilterValue::Sex(_))
                | (Self::WantedByCountry, FilterValue::Country(_))
                | (Self::Nationality, FilterValue::Country(_))
                | (Self::ForenameInitial, FilterValue::Initial(_))
                | (Self::SurnameInitial, FilterValue::Initial(_))
        )
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive age bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }
}

/// Sex filter as encoded by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Unknown,
    Female,
    Male,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Unknown, Sex::Female, Sex::Male];

    /// Returns the `sexId` parameter value
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "U",
            Self::Female => "F",
            Self::Male => "M",
        }
    }
}

/// A concrete value bound to one dimension of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Age(AgeRange),
    Sex(Sex),
    Country(String),
    Initial(char),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Age(range) => write!(f, "{}-{}", range.min, range.max),
            Self::Sex(sex) => f.write_str(sex.code()),
            Self::Country(code) => f.write_str(code),
            Self::Initial(letter) => write!(f, "{}", letter),
        }
    }
}
