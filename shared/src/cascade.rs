//! Per-screen cascading picker state.
//!
//! [`CascadeState`] owns one selection chain and the option list of every
//! level. Each level carries a generation counter: any change at level N bumps
//! the counters of the levels below it, a fetch remembers the counter it was
//! started under, and its result is dropped if the counter moved in between.
//! The state never performs I/O; it hands out [`PendingFetch`]es and the app
//! sends them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::LocationError;
use crate::model::{CascadeSelection, Level, LocationId, LocationNode};

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeError {
    #[error("cannot select a {level} before its parent")]
    ParentNotSelected { level: Level },
}

/// Option list of one level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionSet {
    #[default]
    Idle,
    Loading,
    Ready(Vec<LocationNode>),
    Failed(LocationError),
}

impl OptionSet {
    #[must_use]
    pub fn availability(&self) -> Availability {
        match self {
            OptionSet::Idle => Availability::NotRequested,
            OptionSet::Loading => Availability::Loading,
            OptionSet::Ready(items) if items.is_empty() => Availability::NoOptions,
            OptionSet::Ready(_) => Availability::Options,
            OptionSet::Failed(_) => Availability::Failed,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[LocationNode] {
        match self {
            OptionSet::Ready(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    NotRequested,
    Loading,
    Options,
    /// The parent has no children registered. Not an error.
    NoOptions,
    Failed,
}

/// What a picker for one level renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    pub level: Level,
    pub options: Vec<LocationNode>,
    pub loading: bool,
    pub error: Option<LocationError>,
    pub availability: Availability,
    pub selected: Option<LocationId>,
    /// Name of `selected`, once the option list contains it.
    pub selected_name: Option<String>,
    pub message: Option<String>,
}

/// An option list to request, valid while `generation` is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub level: Level,
    pub parent: Option<LocationId>,
    pub generation: u64,
}

/// What a selection change asks of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Load the child options.
    Fetch(PendingFetch),
    Cleared,
    /// A village was selected; there is nothing below it to load.
    Leaf,
}

#[derive(Debug, Default)]
struct LevelState {
    options: OptionSet,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct CascadeState {
    selection: CascadeSelection,
    levels: [LevelState; 4],
}

impl CascadeState {
    pub fn selection(&self) -> &CascadeSelection {
        &self.selection
    }

    pub fn options(&self, level: Level) -> &OptionSet {
        &self.level(level).options
    }

    /// Starts, or restarts, the country fetch.
    pub fn load_countries(&mut self) -> PendingFetch {
        self.begin(Level::Country, None)
    }

    /// Selects `id` at `level`, clears everything below it and starts the
    /// child fetch. A blank `id` clears the level instead.
    pub fn select(&mut self, level: Level, id: &str) -> Result<SelectOutcome, CascadeError> {
        let Ok(id) = LocationId::new(id) else {
            self.clear(level);
            return Ok(SelectOutcome::Cleared);
        };

        if let Some(parent) = level.parent() {
            if self.selection.get(parent).is_none() {
                return Err(CascadeError::ParentNotSelected { level });
            }
        }

        self.selection.set(level, Some(id.clone()));
        self.selection.clear_below(level);
        self.reset_below(level);
        Ok(match level.child() {
            Some(child) => SelectOutcome::Fetch(self.begin(child, Some(id))),
            None => SelectOutcome::Leaf,
        })
    }

    /// Clears `level` and every level below it.
    pub fn clear(&mut self, level: Level) {
        self.selection.set(level, None);
        self.selection.clear_below(level);
        self.reset_below(level);
    }

    /// Reloads `level` under its current parent by re-selecting that parent.
    pub fn retry(&mut self, level: Level) -> Result<SelectOutcome, CascadeError> {
        let Some(parent) = level.parent() else {
            return Ok(SelectOutcome::Fetch(self.load_countries()));
        };
        match self.selection.get(parent).cloned() {
            Some(id) => self.select(parent, id.as_str()),
            None => Err(CascadeError::ParentNotSelected { level }),
        }
    }

    /// Seeds the state with a persisted chain. Returns a fetch for every
    /// level the chain reaches, countries first.
    pub fn restore(&mut self, selection: CascadeSelection) -> Vec<PendingFetch> {
        let selection = selection.normalized();
        self.selection = selection.clone();
        self.reset_below(Level::Country);

        let mut pending = vec![self.begin(Level::Country, None)];
        for level in Level::Country.descendants() {
            let parent = level.parent().and_then(|parent| selection.get(parent));
            match parent {
                Some(id) => pending.push(self.begin(level, Some(id.clone()))),
                None => break,
            }
        }
        pending
    }

    #[must_use]
    pub fn is_current(&self, level: Level, generation: u64) -> bool {
        self.level(level).generation == generation
    }

    /// Stores a fetch result. Returns `false`, changing nothing, when the
    /// selection moved on after the fetch started.
    pub fn apply(
        &mut self,
        level: Level,
        generation: u64,
        result: Result<Vec<LocationNode>, LocationError>,
    ) -> bool {
        let slot = self.level_mut(level);
        if slot.generation != generation {
            return false;
        }
        slot.options = match result {
            Ok(nodes) => OptionSet::Ready(nodes),
            Err(error) => OptionSet::Failed(error),
        };
        true
    }

    /// The selected node of `level`, once its option list contains it.
    pub fn selected_node(&self, level: Level) -> Option<&LocationNode> {
        let id = self.selection.get(level)?;
        self.options(level).items().iter().find(|node| &node.id == id)
    }

    pub fn view(&self, level: Level) -> LevelView {
        let options = self.options(level);
        let availability = options.availability();
        let error = match options {
            OptionSet::Failed(error) => Some(error.clone()),
            _ => None,
        };
        let parent_missing = level
            .parent()
            .is_some_and(|parent| self.selection.get(parent).is_none());

        let message = match availability {
            Availability::NoOptions => Some(format!("No {} registered", level.plural_label())),
            Availability::Failed => error.as_ref().map(|e| e.user_facing_message(level)),
            Availability::NotRequested if parent_missing => level
                .parent()
                .map(|parent| format!("Select a {parent} first.")),
            _ => None,
        };

        LevelView {
            level,
            options: options.items().to_vec(),
            loading: availability == Availability::Loading,
            error,
            availability,
            selected: self.selection.get(level).cloned(),
            selected_name: self.selected_node(level).map(|node| node.name.clone()),
            message,
        }
    }

    pub fn views(&self) -> [LevelView; 4] {
        Level::ALL.map(|level| self.view(level))
    }

    fn level(&self, level: Level) -> &LevelState {
        &self.levels[level.depth()]
    }

    fn level_mut(&mut self, level: Level) -> &mut LevelState {
        &mut self.levels[level.depth()]
    }

    /// Drops every option list below `level` and invalidates their fetches.
    fn reset_below(&mut self, level: Level) {
        for descendant in level.descendants() {
            let slot = self.level_mut(descendant);
            slot.options = OptionSet::Idle;
            slot.generation = slot.generation.wrapping_add(1);
        }
    }

    fn begin(&mut self, level: Level, parent: Option<LocationId>) -> PendingFetch {
        let slot = self.level_mut(level);
        slot.options = OptionSet::Loading;
        slot.generation = slot.generation.wrapping_add(1);
        PendingFetch {
            level,
            parent,
            generation: slot.generation,
        }
    }
}
