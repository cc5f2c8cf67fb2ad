//! The location picker core as a Crux app.
//!
//! One instance backs one form. `update` keeps the cascade and the name
//! resolver consistent and asks the shell for lists through the Http
//! capability; `view` is everything the pickers and the read-only farm
//! screens render.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, HttpResult};
use crate::cascade::{CascadeError, CascadeState, LevelView, PendingFetch, SelectOutcome};
use crate::config::{LocationsConfig, ResolverConfig};
use crate::error::LocationError;
use crate::event::Event;
use crate::gateway::{ListOutcome, ListRequest, LocationGateway};
use crate::model::{CascadeSelection, Level, LocationId};
use crate::resolver::{ListKey, NamesState, ResolvedNames};

#[derive(Default)]
pub struct App;

#[derive(Default)]
pub struct Model {
    gateway: Option<LocationGateway>,
    resolver: ResolverConfig,
    config_error: Option<String>,
    cascade: CascadeState,
    rejected: Option<CascadeError>,
    names: NamesState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub levels: [LevelView; 4],
    pub selection: CascadeSelection,
    /// Last selection the cascade refused, cleared by the next accepted one.
    pub rejected: Option<CascadeError>,
    pub names: Vec<ResolvedNames>,
    pub names_pending: bool,
    pub config_error: Option<String>,
}

impl ViewModel {
    #[must_use]
    pub fn level(&self, level: Level) -> &LevelView {
        &self.levels[level.depth()]
    }
}

impl App {
    fn configure(config: LocationsConfig, model: &mut Model) {
        let validated = config
            .validate()
            .and_then(|()| LocationGateway::new(config.gateway.clone()));
        match validated {
            Ok(gateway) => {
                info!(base_url = %config.gateway.base_url, "location service configured");
                model.names.configure(&config.resolver);
                model.gateway = Some(gateway);
                model.resolver = config.resolver;
                model.config_error = None;
            }
            Err(error) => {
                warn!(%error, "rejected location configuration");
                model.config_error = Some(error.to_string());
            }
        }
    }

    fn apply_selection(
        outcome: Result<SelectOutcome, CascadeError>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        match outcome {
            Ok(outcome) => {
                model.rejected = None;
                if let SelectOutcome::Fetch(pending) = outcome {
                    Self::fetch_options(pending, model, caps);
                }
            }
            Err(error) => {
                debug!(%error, "selection rejected");
                model.rejected = Some(error);
            }
        }
    }

    fn fetch_options(pending: PendingFetch, model: &mut Model, caps: &Capabilities) {
        let PendingFetch {
            level,
            parent,
            generation,
        } = pending;
        let sent = ListRequest::new(level, parent.as_ref().map(LocationId::as_str))
            .and_then(|request| Self::send_options(request, generation, model, caps));
        if let Err(error) = sent {
            warn!(%level, %error, "could not request options");
            model.cascade.apply(level, generation, Err(error));
        }
    }

    fn send_options(
        request: ListRequest,
        generation: u64,
        model: &Model,
        caps: &Capabilities,
    ) -> Result<(), LocationError> {
        let gateway = model
            .gateway
            .as_ref()
            .ok_or_else(LocationError::not_configured)?;
        gateway.send(&caps.http, request, move |request, result| {
            Event::OptionsLoaded {
                generation,
                request: Box::new(request),
                result: Box::new(result),
            }
        })
    }

    fn options_loaded(
        generation: u64,
        request: ListRequest,
        result: HttpResult,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let level = request.level;
        if !model.cascade.is_current(level, generation) {
            debug!(%level, parent = ?request.parent, "discarding result for a superseded selection");
            return;
        }

        let result = match Self::read(&request, result, model) {
            ListOutcome::Loaded(nodes) => Ok(nodes),
            ListOutcome::Failed(error) => Err(error),
            ListOutcome::Retry(next) => match Self::send_options(next, generation, model, caps) {
                Ok(()) => return,
                Err(error) => Err(error),
            },
        };
        model.cascade.apply(level, generation, result);
        caps.render.render();
    }

    fn resolve_names(chains: Vec<CascadeSelection>, model: &mut Model, caps: &Capabilities) {
        for key in model.names.begin(chains) {
            let sent = ListRequest::new(key.0, key.1.as_ref().map(LocationId::as_str))
                .and_then(|request| Self::send_names(request, model, caps));
            if let Err(error) = sent {
                model.names.apply(&key, Err(error));
            }
        }
    }

    fn send_names(
        request: ListRequest,
        model: &Model,
        caps: &Capabilities,
    ) -> Result<(), LocationError> {
        let gateway = model
            .gateway
            .as_ref()
            .ok_or_else(LocationError::not_configured)?;
        gateway.send(&caps.http, request, |request, result| Event::NamesLoaded {
            request: Box::new(request),
            result: Box::new(result),
        })
    }

    fn names_loaded(
        request: ListRequest,
        result: HttpResult,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let key: ListKey = (request.level, request.parent.clone());
        let result = match Self::read(&request, result, model) {
            ListOutcome::Loaded(nodes) => Ok(nodes),
            ListOutcome::Failed(error) => Err(error),
            ListOutcome::Retry(next) => match Self::send_names(next, model, caps) {
                Ok(()) => return,
                Err(error) => Err(error),
            },
        };
        model.names.apply(&key, result);
        caps.render.render();
    }

    fn read(request: &ListRequest, result: HttpResult, model: &Model) -> ListOutcome {
        match &model.gateway {
            Some(gateway) => gateway.read(request, result),
            None => ListOutcome::Failed(LocationError::not_configured()),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::Configure(config) => Self::configure(*config, model),
            Event::LoadCountries => {
                let pending = model.cascade.load_countries();
                Self::fetch_options(pending, model, caps);
            }
            Event::Select { level, id } => {
                let outcome = model.cascade.select(level, &id);
                if outcome.is_ok() {
                    info!(%level, %id, "selection applied");
                }
                Self::apply_selection(outcome, model, caps);
            }
            Event::Clear { level } => {
                model.cascade.clear(level);
                model.rejected = None;
            }
            Event::Retry { level } => {
                let outcome = model.cascade.retry(level);
                Self::apply_selection(outcome, model, caps);
            }
            Event::Restore(selection) => {
                let pending = model.cascade.restore(*selection);
                info!(depth = pending.len(), "restoring persisted selection");
                model.rejected = None;
                for fetch in pending {
                    Self::fetch_options(fetch, model, caps);
                }
            }
            Event::ResolveNames { chains } => Self::resolve_names(chains, model, caps),

            // Responses render only when they change what is shown
            Event::OptionsLoaded {
                generation,
                request,
                result,
            } => {
                Self::options_loaded(generation, *request, *result, model, caps);
                return;
            }
            Event::NamesLoaded { request, result } => {
                Self::names_loaded(*request, *result, model, caps);
                return;
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            levels: model.cascade.views(),
            selection: model.cascade.selection().clone(),
            rejected: model.rejected.clone(),
            names: model.names.resolved(&model.resolver.unknown_label),
            names_pending: model.names.is_pending(),
            config_error: model.config_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::testing::{
        header, http_requests, renders, request_route, settle, FakeBackend, Tester,
    };
    use crate::capabilities::REQUEST_ID_HEADER;
    use crate::cascade::Availability;
    use crate::config::GatewayConfig;
    use serde_json::json;

    fn configured() -> (Tester, Model) {
        let app = Tester::default();
        let mut model = Model::default();
        let config = LocationsConfig {
            gateway: GatewayConfig::new("https://api.test"),
            resolver: ResolverConfig::default(),
        };
        app.update(Event::Configure(Box::new(config)), &mut model);
        (app, model)
    }

    #[test]
    fn fetching_before_configure_fails_the_level() {
        let app = Tester::default();
        let mut model = Model::default();

        let update = app.update(Event::LoadCountries, &mut model);
        assert!(http_requests(update.effects).is_empty());

        let view = app.view(&model);
        assert_eq!(view.level(Level::Country).availability, Availability::Failed);
        assert!(view.level(Level::Country).error.as_ref().is_some_and(LocationError::is_retryable));
    }

    #[test]
    fn bad_configuration_is_reported() {
        let app = Tester::default();
        let mut model = Model::default();
        let config = LocationsConfig {
            gateway: GatewayConfig::new("ftp://api.test"),
            resolver: ResolverConfig::default(),
        };

        let update = app.update(Event::Configure(Box::new(config)), &mut model);
        assert_eq!(renders(&update.effects), 1);
        assert!(app.view(&model).config_error.is_some());
    }

    #[test]
    fn select_renders_and_requests_children_with_a_request_id() {
        let (app, mut model) = configured();

        let update = app.update(
            Event::Select {
                level: Level::Country,
                id: "CO".into(),
            },
            &mut model,
        );
        assert_eq!(renders(&update.effects), 1);
        let requests = http_requests(update.effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            request_route(&requests[0].operation),
            "/locations/department-states/CO"
        );
        assert!(header(&requests[0].operation, REQUEST_ID_HEADER).is_some_and(|id| !id.is_empty()));
        assert!(app.view(&model).level(Level::Department).loading);
    }

    #[test]
    fn rejected_selection_is_visible_and_changes_nothing() {
        let (app, mut model) = configured();

        let update = app.update(
            Event::Select {
                level: Level::Village,
                id: "V1".into(),
            },
            &mut model,
        );
        assert!(http_requests(update.effects).is_empty());

        let view = app.view(&model);
        assert_eq!(
            view.rejected,
            Some(CascadeError::ParentNotSelected {
                level: Level::Village
            })
        );
        assert!(view.selection.is_empty());
    }

    #[test]
    fn path_failure_falls_back_before_rendering_the_result() {
        let (app, mut model) = configured();
        let backend = FakeBackend::new().with_json(
            "/locations/department-states?countryId=CO",
            json!([{"id": "D1", "name": "Antioquia"}]),
        );

        let update = app.update(
            Event::Select {
                level: Level::Country,
                id: "CO".into(),
            },
            &mut model,
        );
        let routes = settle(&app, &mut model, &backend, update);

        assert_eq!(
            routes,
            vec![
                "/locations/department-states/CO",
                "/locations/department-states?countryId=CO",
            ]
        );
        assert_eq!(
            app.view(&model).level(Level::Department).availability,
            Availability::Options
        );
    }

    #[test]
    fn server_reported_failure_is_final() {
        let (app, mut model) = configured();
        let backend = FakeBackend::new().with_json(
            "/locations/countries",
            json!({"success": false, "message": "db offline"}),
        );

        let update = app.update(Event::LoadCountries, &mut model);
        let routes = settle(&app, &mut model, &backend, update);

        assert_eq!(routes, vec!["/locations/countries"]);
        let view = app.view(&model);
        let error = view.level(Level::Country).error.clone().unwrap();
        assert!(error.request_id().is_some());
        assert_eq!(
            view.level(Level::Country).message.as_deref(),
            Some("Could not load countries. Check your connection and try again.")
        );
    }
}
