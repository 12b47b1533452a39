//! Family record returned by the upstream lookup service

use serde::Deserialize;

/// Family/group record. Every field is optional upstream; rendering
/// substitutes a placeholder for anything missing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupRecord {
    #[serde(default)]
    pub scheme_name: Option<String>,
    #[serde(default)]
    pub home_dist_name: Option<String>,
    #[serde(default)]
    pub home_state_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub member_details_list: Vec<FamilyMember>,
}

/// One entry of `memberDetailsList`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FamilyMember {
    #[serde(default, rename = "memberName")]
    pub name: Option<String>,
    // Upstream spells it this way
    #[serde(default, rename = "releationship_name")]
    pub relationship: Option<String>,
    #[serde(default, rename = "memberId", deserialize_with = "string_or_number")]
    pub member_id: Option<String>,
}

impl LookupRecord {
    pub fn members(&self) -> &[FamilyMember] {
        &self.member_details_list
    }

    /// A record is usable only if it lists at least one member
    pub fn is_usable(&self) -> bool {
        !self.member_details_list.is_empty()
    }
}

/// Member ids arrive as strings from most deployments and as bare numbers
/// from some.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_upstream_field_names() {
        let record: LookupRecord = serde_json::from_value(json!({
            "schemeName": "PHH",
            "homeDistName": "Lucknow",
            "homeStateName": "Uttar Pradesh",
            "address": "12 Station Road",
            "memberDetailsList": [
                { "memberName": "Ramesh", "releationship_name": "SELF", "memberId": "998877665544" },
                { "memberName": "Sunita", "releationship_name": "WIFE", "memberId": 112233445566u64 }
            ]
        }))
        .unwrap();

        assert_eq!(record.scheme_name.as_deref(), Some("PHH"));
        assert_eq!(record.members().len(), 2);
        assert_eq!(record.members()[0].relationship.as_deref(), Some("SELF"));
        assert_eq!(record.members()[1].member_id.as_deref(), Some("112233445566"));
        assert!(record.is_usable());
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let record: LookupRecord = serde_json::from_value(json!({
            "memberDetailsList": [ {} ]
        }))
        .unwrap();

        assert_eq!(record.address, None);
        assert_eq!(record.members()[0], FamilyMember::default());
    }

    #[test]
    fn test_empty_member_list_is_not_usable() {
        let record: LookupRecord = serde_json::from_value(json!({ "memberDetailsList": [] })).unwrap();
        assert!(!record.is_usable());
    }
}
