//! Shared core for the farm location pickers.
//!
//! Country, department, municipality and village are chosen through four
//! dependent pickers. The Crux [`App`] keeps one form's chain consistent while
//! options load and turns persisted chains back into names for read-only
//! screens. Every list goes through the [`LocationGateway`], which owns the
//! wire format; HTTP itself is performed by the shell through the Http
//! capability.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod capabilities;
pub mod cascade;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod model;
pub mod resolver;

pub use crux_core::{render::Render, App as CruxApp};

pub use app::{App, Model, ViewModel};
pub use capabilities::{BaseUrl, Capabilities, Effect, InvalidUrl};
pub use cascade::{
    Availability, CascadeError, CascadeState, LevelView, OptionSet, PendingFetch, SelectOutcome,
};
pub use config::{ConfigError, GatewayConfig, LocationsConfig, ResolverConfig};
pub use error::{ErrorKind, LocationError};
pub use event::Event;
pub use gateway::{normalize, ListOutcome, ListRequest, LocationGateway, RouteForm};
pub use model::{CascadeSelection, EmptyLocationId, Level, LocationId, LocationNode};
pub use resolver::{NameResolution, NamesState, ResolvedNames};
