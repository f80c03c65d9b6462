use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use plate_core::Editor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("`{field}` is required")]
    MissingField { field: String },
    #[error("`{field}`: {message}")]
    InvalidField { field: String, message: String },
}

impl PromptError {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => field,
        }
    }
}

pub type CleanFn = Arc<dyn Fn(String) -> String + Send + Sync>;
pub type ValidateFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A single-line text input in a prompt.
#[derive(Clone)]
pub struct TextField {
    label: String,
    required: bool,
    default: Option<String>,
    clean: Option<CleanFn>,
    validate: Option<ValidateFn>,
}

impl fmt::Debug for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextField")
            .field("label", &self.label)
            .field("required", &self.required)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl TextField {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            required: false,
            default: None,
            clean: None,
            validate: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Rewrites the value after it passed validation.
    pub fn clean(mut self, clean: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.clean = Some(Arc::new(clean));
        self
    }

    /// Returns a message when the value is unacceptable.
    pub fn validate(
        mut self,
        validate: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    fn read(&self, name: &str, raw: Option<&str>) -> Result<String, PromptError> {
        let value = match raw {
            Some(raw) => raw.trim().to_string(),
            None => self.default.clone().unwrap_or_default(),
        };
        if value.is_empty() {
            if self.required {
                return Err(PromptError::MissingField { field: name.into() });
            }
            return Ok(value);
        }
        if let Some(message) = self.validate.as_ref().and_then(|validate| validate(&value)) {
            return Err(PromptError::InvalidField {
                field: name.into(),
                message,
            });
        }
        Ok(match &self.clean {
            Some(clean) => clean(value),
            None => value,
        })
    }
}

/// Field values by field name, as typed or as accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptValues(BTreeMap<String, String>);

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Like `get`, but treats an empty value as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PromptValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    title: String,
    fields: Vec<(String, TextField)>,
}

impl Prompt {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field: TextField) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[(String, TextField)] {
        &self.fields
    }

    /// Validates and cleans `input`, field by field in declaration order.
    pub fn read(&self, input: &PromptValues) -> Result<PromptValues, PromptError> {
        let mut values = PromptValues::new();
        for (name, field) in &self.fields {
            let value = field.read(name, input.get(name))?;
            values.insert(name.clone(), value);
        }
        Ok(values)
    }
}

pub type ResumeFn = Box<dyn FnOnce(&mut Editor, &PromptValues) -> bool>;

/// A command suspended on user input. Nothing has been applied yet.
pub struct PendingPrompt {
    prompt: Prompt,
    resume: ResumeFn,
}

impl fmt::Debug for PendingPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPrompt")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// A rejected confirmation. The prompt stays open.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PromptRejected {
    pub pending: PendingPrompt,
    #[source]
    pub error: PromptError,
}

impl PendingPrompt {
    pub fn new(
        prompt: Prompt,
        resume: impl FnOnce(&mut Editor, &PromptValues) -> bool + 'static,
    ) -> Self {
        Self {
            prompt,
            resume: Box::new(resume),
        }
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Validates `input`, cleans it, and resumes the suspended command.
    pub fn confirm(self, editor: &mut Editor, input: &PromptValues) -> Result<bool, PromptRejected> {
        let values = match self.prompt.read(input) {
            Ok(values) => values,
            Err(error) => {
                tracing::debug!(prompt = %self.prompt.title, %error, "prompt input rejected");
                return Err(PromptRejected {
                    pending: self,
                    error,
                });
            }
        };
        tracing::debug!(prompt = %self.prompt.title, "prompt confirmed");
        Ok((self.resume)(editor, &values))
    }

    pub fn cancel(self) {
        tracing::debug!(prompt = %self.prompt.title, "prompt cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> TextField {
        TextField::new("Target")
            .required()
            .validate(|value| value.contains(' ').then(|| "no spaces".to_string()))
            .clean(|value| value.to_uppercase())
    }

    #[test]
    fn read_validates_before_cleaning() {
        let prompt = Prompt::new("Test").field("target", field());
        let values = prompt
            .read(&PromptValues::from_iter([("target", "abc")]))
            .unwrap();
        assert_eq!(values.get("target"), Some("ABC"));

        assert_eq!(
            prompt.read(&PromptValues::from_iter([("target", "a b")])),
            Err(PromptError::InvalidField {
                field: "target".into(),
                message: "no spaces".into(),
            })
        );
        assert_eq!(
            prompt.read(&PromptValues::new()),
            Err(PromptError::MissingField {
                field: "target".into()
            })
        );
    }

    #[test]
    fn defaults_fill_missing_values() {
        let prompt = Prompt::new("Test")
            .field("count", TextField::new("Count").required().default_value("1"))
            .field("note", TextField::new("Note"));
        let values = prompt.read(&PromptValues::new()).unwrap();
        assert_eq!(values.get("count"), Some("1"));
        assert_eq!(values.get("note"), Some(""));
        assert_eq!(values.non_empty("note"), None);
    }

    #[test]
    fn blank_input_counts_as_missing() {
        let prompt = Prompt::new("Test").field("target", field());
        assert_eq!(
            prompt.read(&PromptValues::from_iter([("target", "   ")])),
            Err(PromptError::MissingField {
                field: "target".into()
            })
        );
        let values = prompt
            .read(&PromptValues::from_iter([("target", " abc\t")]))
            .unwrap();
        assert_eq!(values.get("target"), Some("ABC"));
    }
}
