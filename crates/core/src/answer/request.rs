use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    #[default]
    Pilot,
    InternalTest,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleContext {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartContext {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub oem_part_number: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub radius_miles: Option<f64>,
}

/// What the caller already knows about the vehicle, part, and search area. The same
/// shape carries the entities an extraction pass pulls out of a question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerContext {
    #[serde(default)]
    pub vehicle: Option<VehicleContext>,
    #[serde(default)]
    pub part: Option<PartContext>,
    #[serde(default)]
    pub location: Option<LocationContext>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<AnswerContext>,
    #[serde(default)]
    pub mode: AnswerMode,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), context: None, mode: AnswerMode::default() }
    }

    pub fn with_context(mut self, context: AnswerContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Parses and validates an untyped request body. Every problem found is reported.
    pub fn from_json(value: Value) -> Result<Self, DomainError> {
        if !value.is_object() {
            return Err(DomainError::InvalidRequest(vec![
                "body: expected a JSON object".to_owned(),
            ]));
        }
        if value.get("question").map_or(true, Value::is_null) {
            return Err(DomainError::InvalidRequest(vec!["question: required".to_owned()]));
        }

        let request: Self = serde_json::from_value(value)
            .map_err(|error| DomainError::InvalidRequest(vec![error.to_string()]))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut details = Vec::new();

        if self.question.trim().is_empty() {
            details.push("question: must contain at least one non-whitespace character".to_owned());
        }

        let radius = self
            .context
            .as_ref()
            .and_then(|context| context.location.as_ref())
            .and_then(|location| location.radius_miles);
        if let Some(radius) = radius {
            if !radius.is_finite() || radius < 0.0 {
                details.push(
                    "context.location.radius_miles: must be a non-negative number".to_owned(),
                );
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidRequest(details))
        }
    }
}
