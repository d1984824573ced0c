//! Negative-example extractor: turns recent thumbs-down records into a "do not repeat" block.

use crate::record::InteractionRecord;

const NEGATIVE_HEADER: &str = "[AVOID THESE STYLES]\n\
The user rated the following conversions as unsatisfactory. \
Do not use this style again: avoid their tone, phrasing, and structure.";

/// Builds the negative-example block from records in store (append) order.
///
/// Keeps the last `window` negative records. Returns an empty string when there are none.
pub fn build_negative_block(records: &[InteractionRecord], window: usize) -> String {
    let negatives: Vec<&InteractionRecord> = records.iter().filter(|r| r.is_negative()).collect();
    let start = negatives.len().saturating_sub(window);
    let recent = &negatives[start..];
    if recent.is_empty() {
        return String::new();
    }

    let blocks: Vec<String> = recent
        .iter()
        .enumerate()
        .map(|(i, r)| format_example(i + 1, r))
        .collect();

    format!("{}\n\n{}", NEGATIVE_HEADER, blocks.join("\n\n"))
}

fn format_example(n: usize, record: &InteractionRecord) -> String {
    let mut out = format!(
        "### Bad example {}\n- Original: \"{}\"\n- Bad conversion: \"{}\"",
        n, record.original_text, record.converted_text
    );
    if let Some(reason) = &record.reason {
        out.push_str(&format!("\n- Reason: {}", reason));
    }
    if let Some(comment) = &record.comment {
        out.push_str(&format!("\n- Comment: {}", comment));
    }
    out
}

/// Per-session cache of the negative block. Refreshed at session start and after a persisted thumbs-down.
#[derive(Debug, Clone, Default)]
pub struct NegativeExampleCache {
    block: String,
}

impl NegativeExampleCache {
    pub fn new(block: String) -> Self {
        Self { block }
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn replace(&mut self, block: String) {
        self.block = block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Feedback;

    fn neg(i: usize) -> InteractionRecord {
        InteractionRecord::new(
            "UX",
            &format!("input {}", i),
            &format!("bad {}", i),
            &Feedback::Negative {
                reason: Some(format!("reason {}", i)),
                comment: None,
            },
        )
    }

    fn pos(i: usize) -> InteractionRecord {
        InteractionRecord::new("UX", &format!("input {}", i), &format!("good {}", i), &Feedback::Positive)
    }

    #[test]
    fn empty_when_no_negatives() {
        assert_eq!(build_negative_block(&[], 10), "");
        assert_eq!(build_negative_block(&[pos(1), pos(2)], 10), "");
    }

    #[test]
    fn never_exceeds_window() {
        let records: Vec<_> = (0..25).map(neg).collect();
        let block = build_negative_block(&records, 10);
        assert_eq!(block.matches("### Bad example").count(), 10);
        // Tail-truncated: the oldest kept is #15, the newest #24.
        assert!(!block.contains("\"input 14\""));
        assert!(block.contains("\"input 15\""));
        assert!(block.contains("\"input 24\""));
    }

    #[test]
    fn filters_positives_and_keeps_order() {
        let records = vec![neg(1), pos(2), neg(3)];
        let block = build_negative_block(&records, 10);
        assert!(block.starts_with("[AVOID THESE STYLES]"));
        assert!(!block.contains("good 2"));
        let first = block.find("bad 1").unwrap();
        let second = block.find("bad 3").unwrap();
        assert!(first < second);
        assert!(block.contains("- Reason: reason 3"));
    }

    #[test]
    fn deterministic_for_same_input() {
        let records = vec![neg(1), neg(2)];
        assert_eq!(build_negative_block(&records, 10), build_negative_block(&records, 10));
    }

    #[test]
    fn comment_rendered_when_present() {
        let rec = InteractionRecord::new(
            "UX",
            "a",
            "b",
            &Feedback::Negative {
                reason: None,
                comment: Some("sounds like a bank".into()),
            },
        );
        let block = build_negative_block(&[rec], 10);
        assert!(block.contains("- Comment: sounds like a bank"));
        assert!(!block.contains("- Reason:"));
    }
}
