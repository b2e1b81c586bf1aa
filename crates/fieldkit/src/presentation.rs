#![forbid(unsafe_code)]

//! Presentation data derived from field state. Pure functions, no state.

/// Glyph prefixed to the label text of required fields.
pub const REQUIRED_MARKER: &str = "*";

/// Prefix for identifiers derived from a field name.
pub const INPUT_ID_PREFIX: &str = "input-";

/// Identifier used when a descriptor does not set one explicitly.
#[must_use]
pub fn input_id_by_name(name: &str) -> String {
    format!("{INPUT_ID_PREFIX}{name}")
}

/// Flags a renderer needs to style an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StyledProjection {
    /// The current error text is non-empty.
    pub has_error: bool,
    pub required: bool,
    pub read_only: bool,
    pub disabled: bool,
    /// Do not reserve space for an error line.
    pub ignore_error_margin: bool,
}

/// A label to render next to the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelDescriptor {
    /// Identifier of the input the label belongs to.
    pub html_for: String,
    /// Visible text, including the required marker if any.
    pub text: String,
}

/// Build the label for a field. An empty label yields `None`.
#[must_use]
pub fn label_descriptor(label: &str, required: bool, input_id: &str) -> Option<LabelDescriptor> {
    if label.is_empty() {
        return None;
    }
    let marker = if required { REQUIRED_MARKER } else { "" };
    Some(LabelDescriptor {
        html_for: input_id.to_string(),
        text: format!("{marker}{label}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_label_gets_marker() {
        let label = label_descriptor("Name", true, "input-name").unwrap();
        assert_eq!(label.text, "*Name");
        assert_eq!(label.html_for, "input-name");
    }

    #[test]
    fn optional_label_is_plain() {
        let label = label_descriptor("Name", false, "input-name").unwrap();
        assert_eq!(label.text, "Name");
    }

    #[test]
    fn empty_label_has_no_descriptor() {
        assert_eq!(label_descriptor("", true, "input-name"), None);
    }

    #[test]
    fn derived_id_uses_prefix() {
        assert_eq!(input_id_by_name("email"), "input-email");
    }
}
