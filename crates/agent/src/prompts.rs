//! Prompt templates for the extraction and drafting calls.

use serde_json::{json, Value};
use tera::{Context, Tera};

use answer_core::answer::{AnswerContext, ConfidenceLevel};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "Output must be strict JSON. No extra text.

You are an information extraction engine for an automotive parts Answer Engine.
Return ONLY valid JSON that matches the provided schema.
Do not guess missing fields. Use null when unknown.
Choose intent ONLY from:
PART_AVAILABILITY_LOCAL, PART_ELIGIBILITY, PART_AVAILABILITY_AND_ELIGIBILITY, CLARIFY_REQUEST, UNKNOWN_INTENT";

pub const DRAFT_SYSTEM_PROMPT: &str = "You are Answer Engine\u{2122}. You return ONE direct operational answer.
Rules:
- No links, no lists.
- Do not claim you checked inventory systems.
- Match tone to a dealership operator: concise, confident, calm.
- If confidence=unknown: answer must be \"Unknown\" or \"I can't confirm yet.\"
- If confidence=medium: use \"likely\" or \"probably\" once, not repeatedly.
Return ONLY valid JSON.";

const EXTRACTION_SCHEMA: &str = r#"{
  "intent": "string",
  "entities": {
    "vehicle": { "year": 0, "make": "string", "model": "string", "trim": "string|null", "engine": "string|null", "vin": "string|null" },
    "part": { "name": "string|null", "oem_part_number": "string|null" },
    "location": { "postal_code": "string|null", "radius_miles": 0 }
  },
  "missing_required_fields": ["string"],
  "notes": "string|null"
}"#;

const DRAFT_SCHEMA: &str = r#"{
  "answer": "string",
  "reason": "string",
  "next_action": "string"
}"#;

const EXTRACTION_TEMPLATE: &str = "extraction_user.txt";
const DRAFT_TEMPLATE: &str = "draft_user.txt";

/// Compiled user-prompt templates. The schemas are passed in as values so their braces
/// never reach the template parser.
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            EXTRACTION_TEMPLATE,
            "Question: {{ question }}\nContext: {{ context }}\n\nReturn JSON with this schema:\n{{ schema }}",
        )?;
        tera.add_raw_template(
            DRAFT_TEMPLATE,
            "Normalized question: {{ question }}\nExtracted entities: {{ entities }}\nConfidence: {{ confidence }}\nMissing fields: {{ missing_fields }}\n\nReturn JSON with this schema:\n{{ schema }}",
        )?;
        Ok(Self { tera })
    }

    pub fn extraction_prompt(
        &self,
        question: &str,
        context: Option<&AnswerContext>,
    ) -> Result<String, tera::Error> {
        let mut values = Context::new();
        values.insert("question", question);
        values.insert("context", &object_or_empty(context).to_string());
        values.insert("schema", EXTRACTION_SCHEMA);
        self.tera.render(EXTRACTION_TEMPLATE, &values)
    }

    pub fn draft_prompt(
        &self,
        question: &str,
        entities: Option<&AnswerContext>,
        confidence: ConfidenceLevel,
        missing_fields: &[String],
    ) -> Result<String, tera::Error> {
        let mut values = Context::new();
        values.insert("question", question);
        values.insert("entities", &object_or_empty(entities).to_string());
        values.insert("confidence", confidence.as_str());
        values.insert("missing_fields", &json!(missing_fields).to_string());
        values.insert("schema", DRAFT_SCHEMA);
        self.tera.render(DRAFT_TEMPLATE, &values)
    }
}

fn object_or_empty(context: Option<&AnswerContext>) -> Value {
    match context {
        Some(context) => json!(context),
        None => json!({}),
    }
}
