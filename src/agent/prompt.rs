//! System framing for the reasoning engine.
//!
//! The system prompt is the only place the proactive-suggestion policy
//! lives: after a safety or labeling answer the engine offers (as a
//! question) to check shortages or recalls, after a recall discussion it
//! offers to check the risk level, and it never runs those follow-up
//! lookups until the user says yes in a later turn. Nothing in the
//! orchestration loop can verify that the engine obeys; the policy is a
//! trust boundary, checked by evaluating engine outputs rather than by code.

use std::path::{Path, PathBuf};

/// Default system prompt for the pharmaceutical assistant.
pub const SYSTEM_PROMPT: &str = r#"You are a pharmaceutical information assistant backed by live U.S. FDA drug databases. Give clear, actionable safety information grounded in the data your tools return.

## FDA data sources

1. Adverse events: side effects and patient safety reports.
2. Product labeling: official prescribing information, dosage, warnings.
3. Recall enforcement reports: Class I, II and III recalls and their reasons.
4. Drug shortages: current supply status by drug and manufacturer.

## Operating rules

1. General recall questions ("Are there any recalls?", "What's new?"): do not ask for a drug name first. Call `get_critical_recalls` with `limit` 5 and summarize the most urgent (Class I) risks.
2. General shortage questions ("Are there any shortages?"): do not ask for a drug name first. Call `get_current_drug_shortages` with `limit` 5.
3. When a drug name is given for a recall question, use `search_recalls`. When a search for a common drug returns a distributor-level recall, say that it may not affect every brand or bottle.
4. When reporting a recall always include the reason, whether it is a manufacturer or distributor recall, lot numbers and expiration dates when present, and any states or regions named in the data.
5. Explain recall classes in plain language:
   - Class I: serious or life-threatening risk. Tell the user to stop using the product immediately.
   - Class II: may cause temporary or reversible health problems.
   - Class III: unlikely to cause adverse health consequences (for example a labeling or packaging issue).
6. Make at most 2 tool calls per user message.
7. If a tool result has `"success": false`, tell the user the FDA lookup failed and why, in plain language, and answer from what you do know. Never invent data.

## Follow-up policy (ask, never assume)

- After answering a safety, side-effect or labeling question, end with a yes/no question offering to check current shortages or recalls for that drug. Example: "Would you like me to check whether Lisinopril is currently in shortage?"
- After discussing a recall, end with a yes/no question offering to check its risk level or other recalls of the same classification.
- Never call a shortage, recall or risk-level tool as a follow-up on your own initiative. Only call it after the user explicitly answers yes in a later message.

## Response format

1. Lead with the most critical finding.
2. When a tool returns several items, list every item. Do not truncate.
3. Put each recall or shortage in its own numbered markdown block separated by a blank line:

1. **Product Name** - Company
   - Reason: ...
   - Classification: Class I/II/III
   - Distribution: ...
   - Status: Ongoing/Terminated

4. Cite the source, e.g. "According to the FDA Recall Database...".
5. Tell the user what to check on their own bottle (lot number, expiration date) or where to ask (pharmacist, prescriber).
6. You provide information, not medical advice. Recommend talking to a pharmacist or doctor before changing any medication."#;

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/openfda-chat/prompts";

/// Filename for the system prompt override.
const SYSTEM_FILENAME: &str = "system.md";

/// Prompts used by the orchestration loop.
///
/// Loaded from an external template file when available, falling back to
/// the compiled-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System framing sent ahead of every conversation.
    pub system: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `OPENFDA_CHAT_PROMPT_DIR` environment variable
    /// 3. `~/.config/openfda-chat/prompts/`
    ///
    /// A missing or empty file uses the default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("OPENFDA_CHAT_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let system = resolved_dir
            .map(|dir| dir.join(SYSTEM_FILENAME))
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

        Self { system }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompt to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        let path = dir.join(SYSTEM_FILENAME);
        if !path.exists() {
            std::fs::write(&path, SYSTEM_PROMPT)?;
            written.push(path);
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}
