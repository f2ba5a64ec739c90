//! Query model for the search API
//!
//! # Components
//!
//! - `FilterDimension`: the refinable axes and their value domains
//! - `FilterValue`: a concrete value for one dimension
//! - `Query`: an immutable set of dimension bindings, one API call's filters

mod dimension;
mod filter;

pub use dimension::{
    AgeRange, FilterDimension, FilterValue, Sex, AGE_RANGES, DEFAULT_REFINEMENT_ORDER,
};
pub use filter::Query;
