//! Per-field validation messages.

use std::collections::BTreeMap;

use validator::ValidationErrors;

/// Key for errors that do not belong to a single input.
pub const NON_FIELD: &str = "__all__";

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages for `field`, empty when it is valid.
    pub fn get(&self, field: &str) -> Vec<String> {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.get(NON_FIELD)
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, list) in errors.field_errors() {
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                out.add(field, message);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_merges_messages() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());
        assert!(errors.get("title").is_empty());

        errors.add("title", "Required.");
        let mut more = FormErrors::new();
        more.add("title", "Too long.");
        more.add(NON_FIELD, "Try again.");
        errors.merge(more);

        assert_eq!(errors.get("title"), vec!["Required.", "Too long."]);
        assert_eq!(errors.non_field(), vec!["Try again."]);
        assert!(errors.has("title"));
        assert!(errors.into_result().is_err());
    }
}
