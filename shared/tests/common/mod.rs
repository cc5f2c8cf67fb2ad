#![allow(dead_code)]

use farm_locations::capabilities::testing::{settle, FakeBackend, Tester};
use farm_locations::{Event, GatewayConfig, LocationNode, LocationsConfig, Model, ResolverConfig};
use serde_json::json;

/// The backend mixes all three list envelopes; so does the dataset.
pub fn dataset() -> FakeBackend {
    FakeBackend::new()
        .with_json(
            "/locations/countries",
            json!([
                {"id": "CO", "name": "Colombia"},
                {"id": "PE", "name": "Perú"},
            ]),
        )
        .with_json(
            "/locations/department-states/CO",
            json!({"data": [
                {"id": "D1", "name": "Antioquia"},
                {"id": "D2", "name": "Caldas"},
            ]}),
        )
        .with_json(
            "/locations/department-states/PE",
            json!({"success": true, "data": [{"id": "D7", "name": "Cusco"}]}),
        )
        .with_json(
            "/locations/municipalities/D1",
            json!({"success": true, "data": [
                {"id": "M9", "name": "Jardín"},
                {"id": "M10", "name": "Jericó"},
            ]}),
        )
        .with_json(
            "/locations/municipalities/D2",
            json!({"success": true, "data": []}),
        )
        .with_json(
            "/locations/villages/M9",
            json!([{"id": "V1", "name": "La Linda"}]),
        )
        .with_json("/locations/villages/M10", json!([]))
}

/// A fresh form, configured against the test backend.
pub fn app() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    let config = LocationsConfig {
        gateway: GatewayConfig::new("https://api.test"),
        resolver: ResolverConfig::default(),
    };
    let update = app.update(Event::Configure(Box::new(config)), &mut model);
    assert!(update.effects.iter().all(|effect| !matches!(
        effect,
        farm_locations::Effect::Http(_)
    )));
    (app, model)
}

/// Dispatches `event` and serves every request it leads to. Returns the
/// routes requested, in order.
pub fn run(app: &Tester, model: &mut Model, backend: &FakeBackend, event: Event) -> Vec<String> {
    let update = app.update(event, model);
    settle(app, model, backend, update)
}

pub fn names(options: &[LocationNode]) -> Vec<&str> {
    options.iter().map(|node| node.name.as_str()).collect()
}
