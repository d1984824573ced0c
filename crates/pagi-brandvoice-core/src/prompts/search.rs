//! SEARCH mode: evidence-backed answers in the brand voice, with an optional source line.

pub const SEARCH_MODE_TAG: &str = "SEARCH";

/// The `[[SOURCE]]` marker here must match [`crate::SOURCE_DELIMITER`].
pub const SEARCH_MODE_BODY: &str = r#"Task (search / evidence tone):
Answer or rewrite the input as a short, factual explanation in the brand voice.
- State only facts you are confident about; prefer material, dimension, and care information.
- Keep a calm, informative tone: evidence first, warmth second.
- If a public source supports the statement, end with a new line containing exactly `[[SOURCE]] ` followed by the URL. This source line is the only exception to the output rules. Omit it when you have no source."#;
