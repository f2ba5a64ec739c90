use crate::query::dimension::{FilterDimension, FilterValue};
use std::collections::BTreeMap;
use std::fmt;

/// One API call's filter set
///
/// A query binds a subset of the filter dimensions to one value each. Queries
/// are immutable; refinement produces a new query with one more binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    bindings: BTreeMap<FilterDimension, FilterValue>,
}

impl Query {
    /// Creates the query with no filters at all
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Returns a copy of this query with `dimension` bound to `value`
    ///
    /// Returns `None` if the dimension is already bound or the value does not
    /// belong to the dimension.
    pub fn extend(&self, dimension: FilterDimension, value: FilterValue) -> Option<Self> {
        if self.binds(dimension) || !dimension.accepts(&value) {
            return None;
        }

        let mut bindings = self.bindings.clone();
        bindings.insert(dimension, value);
        Some(Self { bindings })
    }

    /// Returns true if the dimension carries a value in this query
    pub fn binds(&self, dimension: FilterDimension) -> bool {
        self.bindings.contains_key(&dimension)
    }

    /// Returns the value bound to a dimension
    pub fn get(&self, dimension: FilterDimension) -> Option<&FilterValue> {
        self.bindings.get(&dimension)
    }

    /// Number of bound dimensions
    pub fn depth(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the first dimension of `order` this query leaves unbound
    pub fn next_unbound(&self, order: &[FilterDimension]) -> Option<FilterDimension> {
        order.iter().copied().find(|d| !self.binds(*d))
    }

    /// Returns true if `self` is `parent` plus exactly one binding
    pub fn extends(&self, parent: &Query) -> bool {
        self.depth() == parent.depth() + 1
            && parent
                .bindings
                .iter()
                .all(|(dimension, value)| self.get(*dimension) == Some(value))
    }

    /// Converts the bindings into API query parameters
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(self.bindings.len() + 1);

        for (dimension, value) in &self.bindings {
            match (dimension, value) {
                (FilterDimension::AgeRange, FilterValue::Age(range)) => {
                    params.push(("ageMin", range.min.to_string()));
                    params.push(("ageMax", range.max.to_string()));
                }
                (FilterDimension::Sex, FilterValue::Sex(sex)) => {
                    params.push(("sexId", sex.code().to_string()));
                }
                (FilterDimension::WantedByCountry, value) => {
                    params.push(("arrestWarrantCountryId", value.to_string()));
                }
                (FilterDimension::Nationality, value) => {
                    params.push(("nationality", value.to_string()));
                }
                (FilterDimension::ForenameInitial, value) => {
                    params.push(("forename", value.to_string()));
                }
                (FilterDimension::SurnameInitial, value) => {
                    params.push(("name", value.to_string()));
                }
                // `extend` rejects mismatched values
                _ => {}
            }
        }

        params
    }
}

impl fmt::Display for Query {
    /// Formats as the query string an operator can paste to re-run the slice
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unfiltered() {
            return f.write_str("<unfiltered>");
        }

        let rendered: Vec<String> = self
            .to_params()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        f.write_str(&rendered.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::dimension::{AgeRange, Sex};

    fn sex_male() -> Query {
        Query::unfiltered()
            .extend(FilterDimension::Sex, FilterValue::Sex(Sex::Male))
            .unwrap()
    }

    #[test]
    fn test_extend_adds_one_binding() {
        let parent = sex_male();
        let child = parent
            .extend(
                FilterDimension::Nationality,
                FilterValue::Country("FR".to_string()),
            )
            .unwrap();

        assert_eq!(child.depth(), 2);
        assert!(child.extends(&parent));
        assert!(!parent.extends(&child));
        assert!(!child.extends(&Query::unfiltered()));
    }

    #[test]
    fn test_extend_rejects_rebinding_and_wrong_type() {
        let query = sex_male();
        assert!(query
            .extend(FilterDimension::Sex, FilterValue::Sex(Sex::Female))
            .is_none());
        assert!(query
            .extend(FilterDimension::AgeRange, FilterValue::Initial('A'))
            .is_none());
    }

    #[test]
    fn test_next_unbound_follows_order() {
        let order = [
            FilterDimension::Sex,
            FilterDimension::AgeRange,
            FilterDimension::ForenameInitial,
        ];

        assert_eq!(
            Query::unfiltered().next_unbound(&order),
            Some(FilterDimension::Sex)
        );
        assert_eq!(
            sex_male().next_unbound(&order),
            Some(FilterDimension::AgeRange)
        );
    }

    #[test]
    fn test_params_use_api_names() {
        let query = Query::unfiltered()
            .extend(
                FilterDimension::AgeRange,
                FilterValue::Age(AgeRange::new(36, 39)),
            )
            .and_then(|q| q.extend(FilterDimension::Sex, FilterValue::Sex(Sex::Female)))
            .and_then(|q| {
                q.extend(
                    FilterDimension::WantedByCountry,
                    FilterValue::Country("US".to_string()),
                )
            })
            .and_then(|q| {
                q.extend(
                    FilterDimension::Nationality,
                    FilterValue::Country("MX".to_string()),
                )
            })
            .and_then(|q| q.extend(FilterDimension::ForenameInitial, FilterValue::Initial('J')))
            .and_then(|q| q.extend(FilterDimension::SurnameInitial, FilterValue::Initial('R')))
            .unwrap();

        assert_eq!(
            query.to_params(),
            vec![
                ("ageMin", "36".to_string()),
                ("ageMax", "39".to_string()),
                ("sexId", "F".to_string()),
                ("arrestWarrantCountryId", "US".to_string()),
                ("nationality", "MX".to_string()),
                ("forename", "J".to_string()),
                ("name", "R".to_string()),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Query::unfiltered().to_string(), "<unfiltered>");
        assert_eq!(sex_male().to_string(), "sexId=M");
    }
}
