//! Side effects the shell performs for the core.
//!
//! Location lists only need read-only HTTP `GET`s and redraws. Auth headers,
//! TLS and timeouts stay on the shell side.

mod http;

pub use self::http::{
    route_of, BaseUrl, HttpResult, InvalidUrl, DEFAULT_MAX_RESPONSE_BYTES, MAX_URL_LENGTH,
    REQUEST_ID_HEADER,
};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Scripted location backend for driving [`App`] through `AppTester`.

    use std::collections::{HashMap, VecDeque};

    use crux_core::testing::{AppTester, Update};
    use crux_core::Request;
    use crux_http::http::StatusCode;
    use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult as ShellResult};
    use crux_http::testing::ResponseBuilder;
    use serde_json::Value;
    use url::Url;

    use super::{route_of, App, Effect};
    use crate::app::Model;
    use crate::event::Event;

    pub type Tester = AppTester<App, Effect>;
    pub type HttpRequestHandle = Request<HttpRequest>;

    /// A finished exchange, as the Http capability hands it to a callback.
    pub fn list_response(status: u16, body: &Value) -> super::HttpResult {
        let status = StatusCode::try_from(status).expect("valid status code");
        let body = serde_json::to_vec(body).expect("serializable body");
        Ok(ResponseBuilder::with_status(status).body(body).build())
    }

    /// Answers location routes (`/locations/villages/M9`,
    /// `/locations/department-states?countryId=CO`). Unknown routes get a 404.
    #[derive(Debug, Clone, Default)]
    pub struct FakeBackend {
        routes: HashMap<String, (u16, Value)>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_json(mut self, route: &str, value: Value) -> Self {
            self.respond(route, 200, value);
            self
        }

        #[must_use]
        pub fn with_status(mut self, route: &str, status: u16, value: Value) -> Self {
            self.respond(route, status, value);
            self
        }

        pub fn respond(&mut self, route: &str, status: u16, value: Value) {
            self.routes.insert(route.to_string(), (status, value));
        }

        /// Makes both the path form and the query form of a list fail.
        pub fn fail_list(&mut self, path_route: &str, query_route: &str) {
            let down = serde_json::json!({ "message": "service unavailable" });
            self.respond(path_route, 503, down.clone());
            self.respond(query_route, 503, down);
        }

        pub fn reply(&self, request: &HttpRequest) -> ShellResult {
            let route = request_route(request);
            let (status, body) = self.routes.get(&route).cloned().unwrap_or_else(|| {
                (
                    404,
                    serde_json::json!({ "message": format!("no fixture for {route}") }),
                )
            });
            let body = serde_json::to_vec(&body).expect("serializable body");
            ShellResult::Ok(HttpResponse::status(status).body(body).build())
        }
    }

    pub fn request_route(request: &HttpRequest) -> String {
        Url::parse(&request.url).map_or_else(|_| request.url.clone(), |url| route_of(&url))
    }

    pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    /// HTTP requests among `effects`, in emission order.
    pub fn http_requests(effects: Vec<Effect>) -> Vec<HttpRequestHandle> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Http(request) => Some(request),
                Effect::Render(_) => None,
            })
            .collect()
    }

    pub fn renders(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Render(_)))
            .count()
    }

    /// Resolves one request and feeds the resulting events back into the app.
    /// Returns the requests those events issued.
    pub fn answer(
        app: &Tester,
        model: &mut Model,
        backend: &FakeBackend,
        mut request: HttpRequestHandle,
    ) -> Vec<HttpRequestHandle> {
        let reply = backend.reply(&request.operation);
        let update = app
            .resolve(&mut request, reply)
            .expect("http request resolves");
        feed(app, model, update)
    }

    /// Runs the events of `update` through the app and collects new requests.
    pub fn feed(
        app: &Tester,
        model: &mut Model,
        update: Update<Effect, Event>,
    ) -> Vec<HttpRequestHandle> {
        let mut pending = http_requests(update.effects);
        let mut events: VecDeque<Event> = update.events.into();
        while let Some(event) = events.pop_front() {
            let update = app.update(event, model);
            pending.extend(http_requests(update.effects));
            events.extend(update.events);
        }
        pending
    }

    /// Serves every request `update` leads to until the app goes quiet.
    /// Returns the routes requested, in order.
    pub fn settle(
        app: &Tester,
        model: &mut Model,
        backend: &FakeBackend,
        update: Update<Effect, Event>,
    ) -> Vec<String> {
        let mut queue: VecDeque<HttpRequestHandle> = feed(app, model, update).into();
        let mut routes = Vec::new();
        while let Some(request) = queue.pop_front() {
            routes.push(request_route(&request.operation));
            queue.extend(answer(app, model, backend, request));
        }
        routes
    }
}
