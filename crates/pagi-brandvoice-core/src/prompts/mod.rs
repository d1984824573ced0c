//! Prompt templates and the composer that assembles them into one system instruction.

pub mod brand;
pub mod search;
pub mod ux;

pub use brand::{BRAND_PREAMBLE, OUTPUT_RULES};
pub use search::{SEARCH_MODE_BODY, SEARCH_MODE_TAG};
pub use ux::{UX_MODE_BODY, UX_MODE_TAG};

use crate::error::ComposeError;

/// A mode-specific instruction body keyed by its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTemplate {
    pub tag: String,
    pub body: String,
}

impl ModeTemplate {
    pub fn new(tag: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            body: body.into(),
        }
    }
}

/// Assembles preamble + negative block + mode body + quoted input. Holds only static templates.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    preamble: String,
    templates: Vec<ModeTemplate>,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptComposer {
    /// Brand preamble with the UX and SEARCH modes.
    pub fn builtin() -> Self {
        Self::new(
            BRAND_PREAMBLE,
            vec![
                ModeTemplate::new(UX_MODE_TAG, UX_MODE_BODY),
                ModeTemplate::new(SEARCH_MODE_TAG, SEARCH_MODE_BODY),
            ],
        )
    }

    pub fn new(preamble: impl Into<String>, templates: Vec<ModeTemplate>) -> Self {
        Self {
            preamble: preamble.into(),
            templates,
        }
    }

    /// Available mode tags, in registration order.
    pub fn modes(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.tag.as_str()).collect()
    }

    /// Exact-match lookup; there is no default mode.
    pub fn mode_body(&self, mode: &str) -> Result<&str, ComposeError> {
        self.templates
            .iter()
            .find(|t| t.tag == mode)
            .map(|t| t.body.as_str())
            .ok_or_else(|| ComposeError::UnknownMode(mode.to_string()))
    }

    /// Builds the full instruction. `user_input` is embedded verbatim between triple quotes.
    pub fn compose(&self, mode: &str, user_input: &str, negative_block: &str) -> Result<String, ComposeError> {
        let body = self.mode_body(mode)?;

        let mut out = String::with_capacity(
            self.preamble.len() + negative_block.len() + body.len() + user_input.len() + OUTPUT_RULES.len() + 64,
        );
        out.push_str(&self.preamble);
        out.push_str("\n\n");
        if !negative_block.is_empty() {
            out.push_str(negative_block);
            out.push_str("\n\n");
        }
        out.push_str(body);
        out.push_str("\n\nInput text:\n\"\"\"\n");
        out.push_str(user_input);
        out.push_str("\n\"\"\"\n\n");
        out.push_str(OUTPUT_RULES);
        Ok(out)
    }
}
