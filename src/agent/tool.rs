//! Tool registry for engine function-calling.
//!
//! Declares the openFDA lookups the reasoning engine may request, their
//! JSON argument schemas, and the progress labels shown to users while a
//! lookup is running. Every descriptor maps 1:1 onto an operation of the
//! [`DataSource`](crate::fda::DataSource) adapter.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A tool the engine may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (unique within a registry, matches the adapter dispatch).
    pub name: String,
    /// Description the engine uses to decide when to call the tool.
    pub description: String,
    /// JSON Schema object describing the tool's arguments.
    pub parameters: serde_json::Value,
    /// Short progress label for chat clients ("Checking recalls...").
    pub display_label: String,
}

/// A tool call requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments, exactly as the engine produced them.
    pub arguments: String,
}

/// The static set of tools offered to the engine.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// The openFDA drug tool catalogue.
    #[must_use]
    pub fn fda() -> Self {
        Self {
            descriptors: vec![
                def_search_adverse_events(),
                def_get_serious_adverse_events(),
                def_get_drug_label(),
                def_search_drug_labels(),
                def_search_recalls(),
                def_get_recent_drug_recalls(),
                def_get_recalls_by_classification(),
                def_get_critical_recalls(),
                def_search_drug_shortages(),
                def_get_current_drug_shortages(),
                def_search_shortages_by_manufacturer(),
            ],
        }
    }

    /// Returns all descriptors in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Looks up a descriptor by tool name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Progress label for a tool, falling back to a generic label for
    /// names the registry does not know (the engine can hallucinate them).
    #[must_use]
    pub fn label_for(&self, name: &str) -> String {
        self.get(name)
            .map_or_else(|| format!("Running {name}"), |d| d.display_label.clone())
    }

    /// Returns `true` if this registry contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the number of tools.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.descriptors.len()
    }
}

fn limit_schema(default: u32) -> serde_json::Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 100,
        "default": default,
        "description": format!("Number of results to return (1-100). Defaults to {default}.")
    })
}

fn descriptor(
    name: &str,
    label: &str,
    description: &str,
    parameters: serde_json::Value,
) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
        display_label: label.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Adverse events
// ---------------------------------------------------------------------------

fn def_search_adverse_events() -> ToolDescriptor {
    descriptor(
        "search_adverse_events",
        "Searching adverse event reports",
        "Search FDA adverse event (side effect) reports by drug name and/or reaction. \
         Optionally restrict to serious events.",
        json!({
            "type": "object",
            "properties": {
                "drug_name": {
                    "type": "string",
                    "description": "Brand or generic drug name, e.g. \"Lisinopril\"."
                },
                "reaction": {
                    "type": "string",
                    "description": "MedDRA reaction term, e.g. \"cough\"."
                },
                "serious": {
                    "type": "boolean",
                    "default": false,
                    "description": "Only return serious adverse events."
                },
                "limit": limit_schema(15)
            }
        }),
    )
}

fn def_get_serious_adverse_events() -> ToolDescriptor {
    descriptor(
        "get_serious_adverse_events",
        "Fetching recent serious adverse events",
        "Get serious adverse event reports received in the last 100 days.",
        json!({
            "type": "object",
            "properties": { "limit": limit_schema(50) }
        }),
    )
}

// ---------------------------------------------------------------------------
// Labeling
// ---------------------------------------------------------------------------

fn def_get_drug_label() -> ToolDescriptor {
    descriptor(
        "get_drug_label",
        "Looking up the official drug label",
        "Get the official FDA product label (indications, dosage, warnings, side effects) \
         for a drug by brand or generic name.",
        json!({
            "type": "object",
            "properties": {
                "term": {
                    "type": "string",
                    "description": "Brand or generic drug name, e.g. \"Lisinopril\"."
                },
                "limit": limit_schema(1)
            },
            "required": ["term"]
        }),
    )
}

fn def_search_drug_labels() -> ToolDescriptor {
    descriptor(
        "search_drug_labels",
        "Searching drug labels",
        "Search drug labels by indication/warning text, manufacturer, or label effective date range \
         (YYYYMMDD).",
        json!({
            "type": "object",
            "properties": {
                "search_term": {
                    "type": "string",
                    "description": "Text to find in indications or warnings."
                },
                "manufacturer": {
                    "type": "string",
                    "description": "Manufacturer name."
                },
                "effective_time_start": {
                    "type": "string",
                    "description": "Start of effective date range, YYYYMMDD."
                },
                "effective_time_end": {
                    "type": "string",
                    "description": "End of effective date range, YYYYMMDD."
                },
                "limit": limit_schema(15)
            }
        }),
    )
}

// ---------------------------------------------------------------------------
// Recalls
// ---------------------------------------------------------------------------

fn def_search_recalls() -> ToolDescriptor {
    descriptor(
        "search_recalls",
        "Checking recalls",
        "Search drug recall enforcement reports from the last 100 days by product or company \
         term, optionally filtered by risk level.",
        json!({
            "type": "object",
            "properties": {
                "term": {
                    "type": "string",
                    "description": "Product, drug, or company name."
                },
                "risk_level": {
                    "type": "string",
                    "enum": ["Class I", "Class II", "Class III"],
                    "description": "Recall classification."
                },
                "limit": limit_schema(15)
            }
        }),
    )
}

fn def_get_recent_drug_recalls() -> ToolDescriptor {
    descriptor(
        "get_recent_drug_recalls",
        "Fetching recent recalls",
        "Get all drug recalls reported in the last 100 days.",
        json!({
            "type": "object",
            "properties": { "limit": limit_schema(50) }
        }),
    )
}

fn def_get_recalls_by_classification() -> ToolDescriptor {
    descriptor(
        "get_recalls_by_classification",
        "Checking recall risk level",
        "Get drug recalls from the last 100 days with a given classification.",
        json!({
            "type": "object",
            "properties": {
                "classification": {
                    "type": "string",
                    "enum": ["Class I", "Class II", "Class III"],
                    "description": "Recall classification."
                },
                "limit": limit_schema(15)
            },
            "required": ["classification"]
        }),
    )
}

fn def_get_critical_recalls() -> ToolDescriptor {
    descriptor(
        "get_critical_recalls",
        "Fetching critical (Class I) recalls",
        "Get Class I recalls (serious or life-threatening risk) from the last 100 days.",
        json!({
            "type": "object",
            "properties": { "limit": limit_schema(50) }
        }),
    )
}

// ---------------------------------------------------------------------------
// Shortages
// ---------------------------------------------------------------------------

fn def_search_drug_shortages() -> ToolDescriptor {
    descriptor(
        "search_drug_shortages",
        "Checking drug shortages",
        "Search the FDA drug shortage list by drug or company name and/or dosage form.",
        json!({
            "type": "object",
            "properties": {
                "term": {
                    "type": "string",
                    "description": "Generic name, brand name, or company."
                },
                "dosage_form": {
                    "type": "string",
                    "description": "Dosage form, e.g. \"Tablet\" or \"Injection\"."
                },
                "limit": limit_schema(15)
            }
        }),
    )
}

fn def_get_current_drug_shortages() -> ToolDescriptor {
    descriptor(
        "get_current_drug_shortages",
        "Fetching current shortages",
        "Get drug shortages updated in the last 100 days.",
        json!({
            "type": "object",
            "properties": { "limit": limit_schema(50) }
        }),
    )
}

fn def_search_shortages_by_manufacturer() -> ToolDescriptor {
    descriptor(
        "search_shortages_by_manufacturer",
        "Checking manufacturer shortages",
        "Get drug shortages reported for a given manufacturer.",
        json!({
            "type": "object",
            "properties": {
                "manufacturer": {
                    "type": "string",
                    "description": "Manufacturer / company name."
                },
                "limit": limit_schema(15)
            },
            "required": ["manufacturer"]
        }),
    )
}
