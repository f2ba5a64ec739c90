//! Refinement plan outline for dry runs

use crate::catalog::FilterCatalog;
use crate::query::FilterDimension;

/// One level of the refinement tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLevel {
    pub dimension: FilterDimension,
    pub values: usize,
}

/// Shape of the refinement tree, without any requests made
#[derive(Debug, Clone)]
pub struct PlanOutline {
    pub levels: Vec<PlanLevel>,
}

impl PlanOutline {
    pub fn new(order: &[FilterDimension], catalog: &FilterCatalog) -> Self {
        Self {
            levels: order
                .iter()
                .map(|&dimension| PlanLevel {
                    dimension,
                    values: dimension.values(catalog).len(),
                })
                .collect(),
        }
    }

    /// Leaf count if every query at every level were oversized
    pub fn worst_case_leaves(&self) -> u64 {
        self.levels
            .iter()
            .fold(1u64, |acc, level| acc.saturating_mul(level.values.max(1) as u64))
    }
}

pub fn print_plan(outline: &PlanOutline) {
    println!("Refinement order:");
    let mut fan_out: u64 = 1;
    for (depth, level) in outline.levels.iter().enumerate() {
        fan_out = fan_out.saturating_mul(level.values.max(1) as u64);
        println!(
            "  {}. {} ({} values, up to {} queries at this depth)",
            depth + 1,
            level.dimension,
            level.values,
            fan_out
        );
    }
    println!(
        "\nWorst case: {} fully refined queries",
        outline.worst_case_leaves()
    );
}
