use crate::engine::outcome::DecisionRule;
use crate::engine::types::{EngineInput, EngineState};

/// Where the conversation's search is anchored for this turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationResolution {
    Resolved { location: String, state: EngineState, rule: DecisionRule },
    /// Nothing usable yet and the user has not been asked; this turn asks.
    AskLocation { state: EngineState },
    /// Already asked once and still nothing to fall back on.
    Unresolved { state: EngineState },
}

impl LocationResolution {
    pub fn state(&self) -> &EngineState {
        match self {
            Self::Resolved { state, .. }
            | Self::AskLocation { state }
            | Self::Unresolved { state } => state,
        }
    }
}

/// Picks the effective location in priority order: an upstream-resolved city or ZIP,
/// then free-text location input, then a one-time prompt, then the sticky location
/// remembered from earlier turns.
pub fn resolve_location(input: &EngineInput, state: &EngineState) -> LocationResolution {
    let resolved = input.location.as_ref().and_then(|location| location.resolved_city_zip());
    if let Some(city_zip) = resolved {
        let location = city_zip.to_owned();
        return LocationResolution::Resolved {
            state: EngineState { last_location: Some(location.clone()), ..state.clone() },
            location,
            rule: DecisionRule::LocationResolved,
        };
    }

    if let Some(text) = input.location_input_text() {
        let location = text.to_owned();
        return LocationResolution::Resolved {
            state: EngineState {
                location_asked: true,
                last_location: Some(location.clone()),
                ..state.clone()
            },
            location,
            rule: DecisionRule::LocationFromInput,
        };
    }

    if !state.location_asked {
        return LocationResolution::AskLocation {
            state: EngineState { location_asked: true, ..state.clone() },
        };
    }

    match state.last_location.as_deref().filter(|location| !location.trim().is_empty()) {
        Some(location) => LocationResolution::Resolved {
            location: location.to_owned(),
            state: state.clone(),
            rule: DecisionRule::LocationSticky,
        },
        None => LocationResolution::Unresolved { state: state.clone() },
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_location, LocationResolution};
    use crate::engine::outcome::DecisionRule;
    use crate::engine::types::{
        EngineInput, EngineLocation, EngineState, LocationStatus, SearchMode,
    };

    #[test]
    fn resolved_upstream_location_wins_over_free_text() {
        let input = EngineInput {
            location: Some(EngineLocation::resolved("80112")),
            location_input: Some("Boulder".to_owned()),
            ..EngineInput::default()
        };

        let resolution = resolve_location(&input, &EngineState::default());
        match resolution {
            LocationResolution::Resolved { location, state, rule } => {
                assert_eq!(location, "80112");
                assert_eq!(state.last_location.as_deref(), Some("80112"));
                assert!(!state.location_asked);
                assert_eq!(state.mode, SearchMode::Local);
                assert_eq!(rule, DecisionRule::LocationResolved);
            }
            other => panic!("expected resolved location, got {other:?}"),
        }
    }

    #[test]
    fn denied_location_falls_through_to_free_text() {
        let input = EngineInput {
            location: Some(EngineLocation {
                status: LocationStatus::Denied,
                city_zip: Some("80112".to_owned()),
            }),
            location_input: Some("Boulder, CO".to_owned()),
            ..EngineInput::default()
        };

        let resolution = resolve_location(&input, &EngineState::default());
        match resolution {
            LocationResolution::Resolved { location, state, rule } => {
                assert_eq!(location, "Boulder, CO");
                assert!(state.location_asked);
                assert_eq!(state.last_location.as_deref(), Some("Boulder, CO"));
                assert_eq!(rule, DecisionRule::LocationFromInput);
            }
            other => panic!("expected free-text location, got {other:?}"),
        }
    }

    #[test]
    fn first_turn_without_location_asks_once() {
        let resolution = resolve_location(&EngineInput::default(), &EngineState::default());
        assert_eq!(
            resolution,
            LocationResolution::AskLocation {
                state: EngineState { location_asked: true, ..EngineState::default() }
            }
        );
    }

    #[test]
    fn later_turns_reuse_remembered_location() {
        let state = EngineState {
            location_asked: true,
            last_location: Some("Denver".to_owned()),
            mode: SearchMode::National,
            ..EngineState::default()
        };

        let resolution = resolve_location(&EngineInput::default(), &state);
        match resolution {
            LocationResolution::Resolved { location, state: next, rule } => {
                assert_eq!(location, "Denver");
                assert_eq!(next, state);
                assert_eq!(rule, DecisionRule::LocationSticky);
            }
            other => panic!("expected sticky location, got {other:?}"),
        }
    }

    #[test]
    fn already_asked_without_memory_is_unresolved() {
        let state = EngineState { location_asked: true, ..EngineState::default() };
        let input = EngineInput { location_input: Some("  ".to_owned()), ..EngineInput::default() };

        let resolution = resolve_location(&input, &state);
        assert_eq!(resolution, LocationResolution::Unresolved { state: state.clone() });
        assert_eq!(resolution.state(), &state);
    }
}
