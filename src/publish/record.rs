use crate::crawler::Notice;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder for every field the API left out
pub const UNKNOWN: &str = "unknown";

/// The record shape delivered downstream
///
/// Every field is present; absent or null source fields carry the `"unknown"`
/// sentinel so consumers never branch on absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub entity_id: String,
    pub name: String,
    pub forename: String,
    pub date_of_birth: String,
    pub nationalities: Vec<String>,
    pub image: Value,
}

impl CleanRecord {
    /// Builds the downstream record; `None` if the notice has no identity
    pub fn from_notice(notice: &Notice) -> Option<Self> {
        let entity_id = notice.identity()?.to_string();

        let nationalities: Vec<String> = notice
            .raw()
            .get("nationalities")
            .and_then(Value::as_array)
            .map(|codes| {
                codes
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let image = notice
            .raw()
            .pointer("/_links/images")
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(UNKNOWN.to_string()));

        Some(Self {
            entity_id,
            name: text_or_unknown(notice, "name"),
            forename: text_or_unknown(notice, "forename"),
            date_of_birth: text_or_unknown(notice, "date_of_birth"),
            nationalities: if nationalities.is_empty() {
                vec![UNKNOWN.to_string()]
            } else {
                nationalities
            },
            image,
        })
    }
}

fn text_or_unknown(notice: &Notice, key: &str) -> String {
    notice
        .text(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_notice() {
        let notice = Notice::new(json!({
            "entity_id": "2021/555",
            "name": "DOE",
            "forename": "JANE",
            "date_of_birth": "1980/04/01",
            "nationalities": ["FR", "DE"],
            "_links": {"images": {"href": "https://api.example.org/2021-555/images"}}
        }));

        let record = CleanRecord::from_notice(&notice).unwrap();
        assert_eq!(record.entity_id, "2021/555");
        assert_eq!(record.forename, "JANE");
        assert_eq!(record.nationalities, vec!["FR", "DE"]);
        assert_eq!(
            record.image,
            json!({"href": "https://api.example.org/2021-555/images"})
        );
    }

    #[test]
    fn test_missing_fields_become_unknown() {
        let notice = Notice::new(json!({
            "entity_id": "2021/556",
            "name": null,
            "nationalities": null
        }));

        let record = CleanRecord::from_notice(&notice).unwrap();
        assert_eq!(record.name, UNKNOWN);
        assert_eq!(record.forename, UNKNOWN);
        assert_eq!(record.date_of_birth, UNKNOWN);
        assert_eq!(record.nationalities, vec![UNKNOWN]);
        assert_eq!(record.image, json!(UNKNOWN));
    }

    #[test]
    fn test_notice_without_identity_is_rejected() {
        let notice = Notice::new(json!({"name": "DOE"}));
        assert!(CleanRecord::from_notice(&notice).is_none());
    }
}
