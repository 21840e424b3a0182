//! Translation of tool calls into openFDA queries.
//!
//! Everything here is pure: a tool name plus its JSON arguments becomes an
//! [`FdaRequest`], and an `FdaRequest` plus today's date becomes an
//! [`FdaQuery`] (endpoint, Lucene-style `search` string, page size). The
//! HTTP side lives in [`super::client`].

use chrono::{Days, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::params::{
    DrugLabelParams, LimitParams, ManufacturerShortagesParams, RecallClassificationParams,
    SearchAdverseEventsParams, SearchDrugLabelsParams, SearchDrugShortagesParams,
    SearchRecallsParams, clamp_limit,
};
use crate::error::FdaError;

/// How far back "recent" queries look.
pub const RECENT_WINDOW_DAYS: u64 = 100;

/// openFDA drug endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/drug/event.json`
    AdverseEvents,
    /// `/drug/label.json`
    Labels,
    /// `/drug/enforcement.json`
    Recalls,
    /// `/drug/shortages.json`
    Shortages,
}

impl Endpoint {
    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::AdverseEvents => "/drug/event.json",
            Self::Labels => "/drug/label.json",
            Self::Recalls => "/drug/enforcement.json",
            Self::Shortages => "/drug/shortages.json",
        }
    }
}

/// A ready-to-send openFDA query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdaQuery {
    /// Endpoint to hit.
    pub endpoint: Endpoint,
    /// Value of the `search` parameter, if any.
    pub search: Option<String>,
    /// Value of the `limit` parameter.
    pub limit: u32,
    /// Keep only results whose `update_date` (MM/DD/YYYY) falls inside this
    /// inclusive window. The shortages endpoint cannot search by it.
    pub updated_within: Option<(NaiveDate, NaiveDate)>,
}

/// A parsed, validated tool call.
#[derive(Debug, Clone)]
pub enum FdaRequest {
    /// `search_adverse_events`
    SearchAdverseEvents(SearchAdverseEventsParams),
    /// `get_serious_adverse_events`
    SeriousAdverseEvents(LimitParams),
    /// `get_drug_label`
    DrugLabel(DrugLabelParams),
    /// `search_drug_labels`
    SearchDrugLabels(SearchDrugLabelsParams),
    /// `search_recalls`
    SearchRecalls(SearchRecallsParams),
    /// `get_recent_drug_recalls`
    RecentRecalls(LimitParams),
    /// `get_recalls_by_classification`
    RecallsByClassification(RecallClassificationParams),
    /// `get_critical_recalls`
    CriticalRecalls(LimitParams),
    /// `search_drug_shortages`
    SearchDrugShortages(SearchDrugShortagesParams),
    /// `get_current_drug_shortages`
    CurrentShortages(LimitParams),
    /// `search_shortages_by_manufacturer`
    ShortagesByManufacturer(ManufacturerShortagesParams),
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Map<String, Value>) -> Result<T, FdaError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| FdaError::InvalidArguments(format!("invalid arguments for {tool}: {e}")))
}

impl FdaRequest {
    /// Parses a tool call by name.
    ///
    /// # Errors
    ///
    /// Returns [`FdaError::UnknownTool`] for names outside the catalogue and
    /// [`FdaError::InvalidArguments`] when required arguments are missing or
    /// mistyped.
    pub fn parse(tool: &str, args: &Map<String, Value>) -> Result<Self, FdaError> {
        Ok(match tool {
            "search_adverse_events" => Self::SearchAdverseEvents(parse_args(tool, args)?),
            "get_serious_adverse_events" => Self::SeriousAdverseEvents(parse_args(tool, args)?),
            "get_drug_label" => Self::DrugLabel(parse_args(tool, args)?),
            "search_drug_labels" => Self::SearchDrugLabels(parse_args(tool, args)?),
            "search_recalls" => Self::SearchRecalls(parse_args(tool, args)?),
            "get_recent_drug_recalls" => Self::RecentRecalls(parse_args(tool, args)?),
            "get_recalls_by_classification" => {
                Self::RecallsByClassification(parse_args(tool, args)?)
            }
            "get_critical_recalls" => Self::CriticalRecalls(parse_args(tool, args)?),
            "search_drug_shortages" => Self::SearchDrugShortages(parse_args(tool, args)?),
            "get_current_drug_shortages" => Self::CurrentShortages(parse_args(tool, args)?),
            "search_shortages_by_manufacturer" => {
                Self::ShortagesByManufacturer(parse_args(tool, args)?)
            }
            other => return Err(FdaError::UnknownTool(other.to_string())),
        })
    }

    /// Builds the openFDA query for this request.
    ///
    /// `today` anchors the "last 100 days" windows.
    ///
    /// # Errors
    ///
    /// Returns [`FdaError::InvalidArguments`] for blank required terms or an
    /// unrecognised recall classification.
    pub fn to_query(&self, today: NaiveDate) -> Result<FdaQuery, FdaError> {
        let window = recent_window(today);
        let report_window = format!(
            "report_date:[{} TO {}]",
            ymd(window.0),
            ymd(window.1)
        );

        let query = match self {
            Self::SearchAdverseEvents(p) => {
                let mut parts = Vec::new();
                if let Some(drug) = clean(p.drug_name.as_deref()) {
                    parts.push(format!(
                        "(openfda.generic_name:\"{drug}\" OR openfda.brand_name:\"{drug}\")"
                    ));
                }
                if let Some(reaction) = clean(p.reaction.as_deref()) {
                    parts.push(format!("patient.reaction.reactionmeddrapt:\"{reaction}\""));
                }
                if p.serious.unwrap_or(false) {
                    parts.push("serious:1".to_string());
                }
                query(Endpoint::AdverseEvents, and(parts), clamp_limit(p.limit, 15))
            }
            Self::SeriousAdverseEvents(p) => query(
                Endpoint::AdverseEvents,
                Some(format!(
                    "receivedate:[{} TO {}] AND serious:1",
                    ymd(window.0),
                    ymd(window.1)
                )),
                clamp_limit(p.limit, 50),
            ),
            Self::DrugLabel(p) => {
                let term = require(Some(&p.term), "term")?;
                query(
                    Endpoint::Labels,
                    Some(format!(
                        "(openfda.brand_name:\"{term}\") OR (openfda.generic_name:\"{term}\")"
                    )),
                    clamp_limit(p.limit, 1),
                )
            }
            Self::SearchDrugLabels(p) => {
                let mut parts = Vec::new();
                if let Some(text) = clean(p.search_term.as_deref()) {
                    parts.push(format!(
                        "(indications_and_usage:\"{text}\" OR warnings:\"{text}\")"
                    ));
                }
                if let Some(maker) = clean(p.manufacturer.as_deref()) {
                    parts.push(format!("openfda.manufacturer_name:\"{maker}\""));
                }
                if let (Some(start), Some(end)) = (
                    clean(p.effective_time_start.as_deref()),
                    clean(p.effective_time_end.as_deref()),
                ) {
                    parts.push(format!("effective_time:[{start} TO {end}]"));
                }
                query(Endpoint::Labels, and(parts), clamp_limit(p.limit, 15))
            }
            Self::SearchRecalls(p) => {
                let mut parts = vec![report_window];
                if let Some(term) = clean(p.term.as_deref()) {
                    parts.push(format!("\"{term}\""));
                }
                if let Some(level) = p.risk_level.as_deref().filter(|s| !s.trim().is_empty()) {
                    parts.push(format!("classification:\"{}\"", classification(level)?));
                }
                query(Endpoint::Recalls, and(parts), clamp_limit(p.limit, 15))
            }
            Self::RecentRecalls(p) => {
                query(Endpoint::Recalls, Some(report_window), clamp_limit(p.limit, 50))
            }
            Self::RecallsByClassification(p) => query(
                Endpoint::Recalls,
                Some(format!(
                    "classification:\"{}\" AND {report_window}",
                    classification(&p.classification)?
                )),
                clamp_limit(p.limit, 15),
            ),
            Self::CriticalRecalls(p) => query(
                Endpoint::Recalls,
                Some(format!("classification:\"Class I\" AND {report_window}")),
                clamp_limit(p.limit, 50),
            ),
            Self::SearchDrugShortages(p) => {
                let mut parts = Vec::new();
                if let Some(term) = clean(p.term.as_deref()) {
                    parts.push(format!(
                        "(generic_name:\"{term}\" OR brand_name:\"{term}\" OR company_name:\"{term}\")"
                    ));
                }
                if let Some(form) = clean(p.dosage_form.as_deref()) {
                    parts.push(format!("dosage_form:\"{form}\""));
                }
                query(Endpoint::Shortages, and(parts), clamp_limit(p.limit, 15))
            }
            Self::CurrentShortages(p) => FdaQuery {
                updated_within: Some(window),
                ..query(Endpoint::Shortages, None, clamp_limit(p.limit, 50))
            },
            Self::ShortagesByManufacturer(p) => {
                let maker = require(Some(&p.manufacturer), "manufacturer")?;
                query(
                    Endpoint::Shortages,
                    Some(format!("company_name:\"{maker}\"")),
                    clamp_limit(p.limit, 15),
                )
            }
        };

        Ok(query)
    }
}

const fn query(endpoint: Endpoint, search: Option<String>, limit: u32) -> FdaQuery {
    FdaQuery {
        endpoint,
        search,
        limit,
        updated_within: None,
    }
}

/// `[today - 100 days, today]`.
#[must_use]
pub fn recent_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

fn ymd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn and(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

/// Trims a user-supplied term and strips characters that would break out
/// of a quoted openFDA phrase. Blank terms count as absent.
fn clean(term: Option<&str>) -> Option<String> {
    let cleaned: String = term?
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect::<String>()
        .trim()
        .to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn require(term: Option<&str>, field: &str) -> Result<String, FdaError> {
    clean(term).ok_or_else(|| FdaError::InvalidArguments(format!("'{field}' must not be empty")))
}

/// Normalizes "class ii", "II", "Class 2" etc. to openFDA's "Class II".
fn classification(raw: &str) -> Result<&'static str, FdaError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let level = lowered.strip_prefix("class").map_or(lowered.as_str(), str::trim);
    match level {
        "i" | "1" => Ok("Class I"),
        "ii" | "2" => Ok("Class II"),
        "iii" | "3" => Ok("Class III"),
        _ => Err(FdaError::InvalidArguments(
            "Invalid classification. Must be one of: Class I, Class II, Class III".to_string(),
        )),
    }
}

/// Keeps shortage records whose `update_date` (MM/DD/YYYY) falls inside
/// `window`. Records without a parseable date are dropped.
#[must_use]
pub fn filter_updated_within(results: Vec<Value>, window: (NaiveDate, NaiveDate)) -> Vec<Value> {
    results
        .into_iter()
        .filter(|item| {
            item.get("update_date")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%m/%d/%Y").ok())
                .is_some_and(|d| d >= window.0 && d <= window.1)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap_or_else(|| panic!("valid date"))
    }

    fn args(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn build(tool: &str, v: Value) -> Result<FdaQuery, FdaError> {
        FdaRequest::parse(tool, &args(v))?.to_query(today())
    }

    #[test]
    fn test_label_query_matches_brand_or_generic() {
        let q = build("get_drug_label", json!({"term": "Lisinopril"}))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(q.endpoint, Endpoint::Labels);
        assert_eq!(q.limit, 1);
        assert_eq!(
            q.search.as_deref(),
            Some(r#"(openfda.brand_name:"Lisinopril") OR (openfda.generic_name:"Lisinopril")"#)
        );
    }

    #[test]
    fn test_recall_search_uses_100_day_window() {
        let q = build(
            "search_recalls",
            json!({"term": "Tylenol", "risk_level": "class i", "limit": 5}),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(q.endpoint, Endpoint::Recalls);
        assert_eq!(q.limit, 5);
        assert_eq!(
            q.search.as_deref(),
            Some(r#"report_date:[20251024 TO 20260201] AND "Tylenol" AND classification:"Class I""#)
        );
    }

    #[test]
    fn test_critical_recalls_are_class_one() {
        let q = build("get_critical_recalls", json!({"limit": 5})).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            q.search.as_deref(),
            Some(r#"classification:"Class I" AND report_date:[20251024 TO 20260201]"#)
        );
    }

    #[test]
    fn test_adverse_event_parts_are_anded() {
        let q = build(
            "search_adverse_events",
            json!({"drug_name": "ibuprofen", "serious": true}),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(q.limit, 15);
        assert_eq!(
            q.search.as_deref(),
            Some(
                r#"(openfda.generic_name:"ibuprofen" OR openfda.brand_name:"ibuprofen") AND serious:1"#
            )
        );
    }

    #[test]
    fn test_unfiltered_searches_have_no_search_param() {
        let q = build("search_drug_shortages", json!({})).unwrap_or_else(|e| panic!("{e}"));
        assert!(q.search.is_none());
        let q = build("search_drug_labels", json!({"effective_time_start": "20240101"}))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(q.search.is_none(), "a half-open date range is ignored");
    }

    #[test]
    fn test_current_shortages_filter_after_fetch() {
        let q = build("get_current_drug_shortages", json!({}))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(q.limit, 50);
        assert!(q.search.is_none());
        assert_eq!(q.updated_within, Some(recent_window(today())));
    }

    #[test]
    fn test_quotes_are_stripped_from_terms() {
        let q = build(
            "search_shortages_by_manufacturer",
            json!({"manufacturer": "Acme\" OR \"x"}),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(q.search.as_deref(), Some(r#"company_name:"Acme OR x""#));
    }

    #[test_case("Class II" => Ok("Class II") ; "canonical")]
    #[test_case("class iii" => Ok("Class III") ; "lowercase")]
    #[test_case("I" => Ok("Class I") ; "bare numeral")]
    #[test_case("Class 2" => Ok("Class II") ; "arabic")]
    fn test_classification_normalizes(raw: &str) -> Result<&'static str, String> {
        classification(raw).map_err(|e| e.to_string())
    }

    #[test]
    fn test_invalid_classification_is_argument_error() {
        let err = build("get_recalls_by_classification", json!({"classification": "Class IV"}))
            .err()
            .unwrap_or_else(|| panic!("expected error"));
        assert!(matches!(err, FdaError::InvalidArguments(_)));
    }

    #[test]
    fn test_blank_required_term_is_argument_error() {
        assert!(matches!(
            build("get_drug_label", json!({"term": "  "})),
            Err(FdaError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_unknown_tool() {
        assert!(matches!(
            build("delete_everything", json!({})),
            Err(FdaError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_filter_updated_within() {
        let window = recent_window(today());
        let items = vec![
            json!({"generic_name": "a", "update_date": "01/06/2026"}),
            json!({"generic_name": "b", "update_date": "01/06/2020"}),
            json!({"generic_name": "c"}),
            json!({"generic_name": "d", "update_date": "not a date"}),
        ];
        let kept = filter_updated_within(items, window);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["generic_name"], "a");
    }
}
