//! Typed arguments for the openFDA tools.
//!
//! The engine hands arguments over as loosely typed JSON, so these structs
//! accept what models commonly send: `limit` as an integer, a float or a
//! numeric string, and `drug_name` where the label tool expects `term`.
//! With the `mcp` feature the same structs double as MCP input schemas.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Largest page size openFDA accepts.
pub const MAX_LIMIT: u32 = 100;

/// Clamps a requested result count into `1..=MAX_LIMIT`.
#[must_use]
pub fn clamp_limit(requested: Option<i64>, default: u32) -> u32 {
    requested.map_or(default, |n| {
        u32::try_from(n.clamp(1, i64::from(MAX_LIMIT))).unwrap_or(default)
    })
}

/// Accepts `5`, `5.0` and `"5"` for a limit; anything else means "unset".
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    #[allow(clippy::cast_possible_truncation)]
    let limit = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(limit)
}

/// Arguments for `search_adverse_events`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchAdverseEventsParams {
    /// Brand or generic drug name.
    #[serde(default)]
    pub drug_name: Option<String>,

    /// MedDRA reaction term (e.g. "cough").
    #[serde(default)]
    pub reaction: Option<String>,

    /// Only serious events.
    #[serde(default)]
    pub serious: Option<bool>,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for tools that only take a page size.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct LimitParams {
    /// Number of results (1-100).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `get_drug_label`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct DrugLabelParams {
    /// Brand or generic drug name.
    #[serde(alias = "drug_name")]
    pub term: String,

    /// Number of labels (1-100, default 1).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `search_drug_labels`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchDrugLabelsParams {
    /// Text to find in indications or warnings.
    #[serde(default)]
    pub search_term: Option<String>,

    /// Manufacturer name.
    #[serde(default)]
    pub manufacturer: Option<String>,

    /// Start of the label effective date range (YYYYMMDD).
    #[serde(default)]
    pub effective_time_start: Option<String>,

    /// End of the label effective date range (YYYYMMDD).
    #[serde(default)]
    pub effective_time_end: Option<String>,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `search_recalls`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchRecallsParams {
    /// Product, drug or company name.
    #[serde(default)]
    pub term: Option<String>,

    /// "Class I", "Class II" or "Class III".
    #[serde(default)]
    pub risk_level: Option<String>,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `get_recalls_by_classification`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct RecallClassificationParams {
    /// "Class I", "Class II" or "Class III".
    pub classification: String,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `search_drug_shortages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchDrugShortagesParams {
    /// Generic name, brand name or company.
    #[serde(default)]
    pub term: Option<String>,

    /// Dosage form (e.g. "Tablet").
    #[serde(default)]
    pub dosage_form: Option<String>,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

/// Arguments for `search_shortages_by_manufacturer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct ManufacturerShortagesParams {
    /// Manufacturer / company name.
    pub manufacturer: String,

    /// Number of results (1-100, default 15).
    #[serde(default, deserialize_with = "lenient_limit")]
    #[cfg_attr(feature = "mcp", schemars(with = "Option<i64>"))]
    pub limit: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(None, 15 => 15 ; "unset uses default")]
    #[test_case(Some(0), 15 => 1 ; "zero raised to one")]
    #[test_case(Some(-7), 15 => 1 ; "negative raised to one")]
    #[test_case(Some(5), 15 => 5 ; "in range kept")]
    #[test_case(Some(1000), 15 => 100 ; "capped at max")]
    fn test_clamp_limit(requested: Option<i64>, default: u32) -> u32 {
        clamp_limit(requested, default)
    }

    #[test]
    fn test_lenient_limit_forms() {
        for raw in [json!({"limit": 5}), json!({"limit": 5.0}), json!({"limit": "5"})] {
            let p: LimitParams =
                serde_json::from_value(raw).unwrap_or_else(|e| panic!("parse: {e}"));
            assert_eq!(p.limit, Some(5));
        }
        let p: LimitParams = serde_json::from_value(json!({"limit": null}))
            .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(p.limit, None);
    }

    #[test]
    fn test_label_accepts_drug_name_alias() {
        let p: DrugLabelParams = serde_json::from_value(json!({"drug_name": "Lisinopril"}))
            .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(p.term, "Lisinopril");
    }

    #[test]
    fn test_required_field_missing_is_error() {
        let parsed: Result<ManufacturerShortagesParams, _> =
            serde_json::from_value(json!({"limit": 3}));
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn clamp_limit_always_in_range(n in any::<i64>(), default in 1u32..=100) {
            let limit = clamp_limit(Some(n), default);
            prop_assert!((1..=MAX_LIMIT).contains(&limit));
        }
    }
}
