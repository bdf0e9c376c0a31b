use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::answer::request::{AnswerContext, LocationContext, PartContext, VehicleContext};

pub const MAX_QUESTION_CHARS: usize = 400;

fn pictographic() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\p{Extended_Pictographic}").ok()).as_ref()
}

/// Strips emoji and other pictographs, collapses whitespace runs, and caps the length.
pub fn normalize_question(input: &str) -> String {
    let stripped = match pictographic() {
        Some(pattern) => pattern.replace_all(input, ""),
        None => Cow::Borrowed(input),
    };

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_QUESTION_CHARS {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(MAX_QUESTION_CHARS).collect();
    truncated.trim_end().to_owned()
}

/// Trims every optional string and drops the ones left empty. Absent sections stay absent.
pub fn normalize_context(context: Option<&AnswerContext>) -> Option<AnswerContext> {
    let context = context?;
    Some(AnswerContext {
        vehicle: context.vehicle.as_ref().map(|vehicle| VehicleContext {
            year: vehicle.year,
            make: clean(&vehicle.make),
            model: clean(&vehicle.model),
            trim: clean(&vehicle.trim),
            engine: clean(&vehicle.engine),
            vin: clean(&vehicle.vin),
        }),
        part: context.part.as_ref().map(|part| PartContext {
            name: clean(&part.name),
            oem_part_number: clean(&part.oem_part_number),
        }),
        location: context.location.as_ref().map(|location| LocationContext {
            postal_code: clean(&location.postal_code),
            radius_miles: location.radius_miles,
        }),
    })
}

fn clean(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty()).map(str::to_owned)
}
