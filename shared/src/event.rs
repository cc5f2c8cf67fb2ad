use serde::{Deserialize, Serialize};

use crate::capabilities::HttpResult;
use crate::config::LocationsConfig;
use crate::gateway::ListRequest;
use crate::model::{CascadeSelection, Level};

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Shell-originated
    Configure(Box<LocationsConfig>),
    LoadCountries,
    Select {
        level: Level,
        id: String,
    },
    Clear {
        level: Level,
    },
    Retry {
        level: Level,
    },
    Restore(Box<CascadeSelection>),
    ResolveNames {
        chains: Vec<CascadeSelection>,
    },

    // Capability responses
    #[serde(skip)]
    OptionsLoaded {
        generation: u64,
        request: Box<ListRequest>,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    NamesLoaded {
        request: Box<ListRequest>,
        result: Box<HttpResult>,
    },
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::LoadCountries => "load_countries",
            Event::Select { .. } => "select",
            Event::Clear { .. } => "clear",
            Event::Retry { .. } => "retry",
            Event::Restore(_) => "restore",
            Event::ResolveNames { .. } => "resolve_names",
            Event::OptionsLoaded { .. } => "options_loaded",
            Event::NamesLoaded { .. } => "names_loaded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_decode_from_shell_json() {
        let event: Event =
            serde_json::from_str(r#"{"type":"select","level":"department","id":"D1"}"#).unwrap();
        assert!(matches!(
            event,
            Event::Select { level: Level::Department, ref id } if id == "D1"
        ));

        let event: Event = serde_json::from_str(
            r#"{"type":"restore","countryId":"CO","departmentId":"","villageId":null}"#,
        )
        .unwrap();
        let Event::Restore(selection) = event else {
            panic!("expected restore, got {event:?}");
        };
        assert_eq!(selection.get(Level::Country).unwrap().as_str(), "CO");
        assert!(selection.get(Level::Department).is_none());
    }

    #[test]
    fn configure_and_resolve_names_decode() {
        let event: Event = serde_json::from_str(
            r#"{"type":"configure","gateway":{"base_url":"https://api.test"}}"#,
        )
        .unwrap();
        let Event::Configure(config) = event else {
            panic!("expected configure, got {event:?}");
        };
        assert_eq!(config.gateway.base_url, "https://api.test");

        let event: Event = serde_json::from_str(
            r#"{"type":"resolve_names","chains":[{"countryId":"CO"},{}]}"#,
        )
        .unwrap();
        assert!(matches!(event, Event::ResolveNames { ref chains } if chains.len() == 2));
        assert_eq!(event.name(), "resolve_names");
    }

    #[test]
    fn unknown_and_response_events_are_rejected() {
        assert!(serde_json::from_str::<Event>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<Event>(r#"{"type":"options_loaded"}"#).is_err());
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(size <= 40, "Event is {size} bytes, box more variants");
    }
}
