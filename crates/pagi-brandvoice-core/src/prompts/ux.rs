//! UX mode: rewrite product and interface copy in the brand voice.

pub const UX_MODE_TAG: &str = "UX";

pub const UX_MODE_BODY: &str = r#"Task (UX writing):
Rewrite the input as customer-facing UX copy in the brand voice.
- Keep the meaning of the input; do not invent product facts, prices, or promises.
- Prefer one or two short sentences suitable for a product card, button hint, or banner.
- Lead with the benefit the customer feels, then the detail that supports it."#;
