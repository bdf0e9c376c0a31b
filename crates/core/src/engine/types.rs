use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Provider,
    Feed,
    Public,
}

/// One part-availability listing from a lookup source.
///
/// Relevance signals are semantically in `[0, 1]`; anything else is clamped by the
/// scorer. Missing or non-numeric signals deserialize to `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub source: CandidateSource,
    #[serde(default, deserialize_with = "lenient_signal")]
    pub authority: f64,
    #[serde(default, deserialize_with = "lenient_signal")]
    pub agreement: f64,
    #[serde(default, deserialize_with = "lenient_signal")]
    pub freshness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_label: Option<String>,
}

impl Candidate {
    /// Distance in miles; `NaN` counts as absent.
    pub fn distance(&self) -> Option<f64> {
        self.distance_miles.filter(|miles| !miles.is_nan())
    }

    /// Sort key for distance ordering: absent distances sort last.
    pub fn distance_key(&self) -> f64 {
        self.distance().unwrap_or(f64::INFINITY)
    }

    /// Any non-empty availability counts as stated, whitespace included.
    pub fn availability_text(&self) -> Option<&str> {
        self.availability.as_deref().filter(|text| !text.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateBuckets {
    pub provider: Vec<Candidate>,
    pub feed: Vec<Candidate>,
    pub public: Vec<Candidate>,
}

impl CandidateBuckets {
    pub fn len(&self) -> usize {
        self.provider.len() + self.feed.len() + self.public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Local,
    National,
}

/// Everything the engine remembers between turns. The caller persists it per
/// conversation and hands it back unchanged on the next turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineState {
    pub clarification_asked: bool,
    pub location_asked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,
    pub mode: SearchMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Resolved,
    Denied,
    Unclear,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineLocation {
    pub status: LocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_zip: Option<String>,
}

impl EngineLocation {
    pub fn resolved(city_zip: impl Into<String>) -> Self {
        Self { status: LocationStatus::Resolved, city_zip: Some(city_zip.into()) }
    }

    /// The city or ZIP, only when upstream marked the location as resolved.
    pub fn resolved_city_zip(&self) -> Option<&str> {
        match self.status {
            LocationStatus::Resolved => present(&self.city_zip),
            LocationStatus::Denied | LocationStatus::Unclear => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInput {
    /// Carried through for callers; the engine does not interpret it.
    #[serde(default)]
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EngineLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_answer: Option<String>,
    #[serde(default)]
    pub candidates: CandidateBuckets,
    #[serde(default)]
    pub state: EngineState,
    #[serde(default)]
    pub allow_national: bool,
}

impl EngineInput {
    pub fn location_input_text(&self) -> Option<&str> {
        present(&self.location_input)
    }

    pub fn clarification_answer_text(&self) -> Option<&str> {
        present(&self.clarification_answer)
    }
}

/// Treats blank text the same as absent text.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}

fn lenient_signal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let signal = match value {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(signal)
}
