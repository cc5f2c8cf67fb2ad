use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// One tier of the administrative hierarchy, ordered root to leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Country,
    Department,
    Municipality,
    Village,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::Country,
        Level::Department,
        Level::Municipality,
        Level::Village,
    ];

    #[must_use]
    pub const fn depth(self) -> usize {
        match self {
            Level::Country => 0,
            Level::Department => 1,
            Level::Municipality => 2,
            Level::Village => 3,
        }
    }

    #[must_use]
    pub const fn parent(self) -> Option<Level> {
        match self {
            Level::Country => None,
            Level::Department => Some(Level::Country),
            Level::Municipality => Some(Level::Department),
            Level::Village => Some(Level::Municipality),
        }
    }

    #[must_use]
    pub const fn child(self) -> Option<Level> {
        match self {
            Level::Country => Some(Level::Department),
            Level::Department => Some(Level::Municipality),
            Level::Municipality => Some(Level::Village),
            Level::Village => None,
        }
    }

    /// Levels strictly below `self`, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = Level> {
        Self::ALL.into_iter().skip(self.depth() + 1)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Department => "department",
            Level::Municipality => "municipality",
            Level::Village => "village",
        }
    }

    #[must_use]
    pub const fn plural_label(self) -> &'static str {
        match self {
            Level::Country => "countries",
            Level::Department => "departments",
            Level::Municipality => "municipalities",
            Level::Village => "villages",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("location id cannot be empty")]
pub struct EmptyLocationId;

/// Opaque identifier of a hierarchy node. Never empty, stored trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyLocationId> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(EmptyLocationId);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LocationId {
    type Error = EmptyLocationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocationId> for String {
    fn from(id: LocationId) -> Self {
        id.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier as it shows up on the wire: the backend emits both strings and numbers.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    pub(crate) fn into_id(self) -> Option<LocationId> {
        match self {
            RawId::Text(text) => LocationId::new(text).ok(),
            RawId::Number(number) => LocationId::new(number.to_string()).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationNode {
    pub id: LocationId,
    /// Display only; not unique within a level.
    pub name: String,
    pub level: Level,
}

impl LocationNode {
    #[must_use]
    pub fn new(id: LocationId, name: impl Into<String>, level: Level) -> Self {
        Self {
            id,
            name: name.into(),
            level,
        }
    }
}

/// Selected ids along one root-to-leaf chain, as stored on a farm record.
///
/// Blank or missing ids deserialize as absent. The cascade only ever holds a
/// [`normalized`](Self::normalized) chain, in which a value at one level
/// implies a value at every level above it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSelection {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    country_id: Option<LocationId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    department_id: Option<LocationId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    municipality_id: Option<LocationId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    village_id: Option<LocationId>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<LocationId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.and_then(RawId::into_id))
}

impl CascadeSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form; a blank `id` leaves the level absent.
    #[must_use]
    pub fn with(mut self, level: Level, id: impl Into<String>) -> Self {
        self.set(level, LocationId::new(id).ok());
        self
    }

    #[must_use]
    pub fn get(&self, level: Level) -> Option<&LocationId> {
        match level {
            Level::Country => self.country_id.as_ref(),
            Level::Department => self.department_id.as_ref(),
            Level::Municipality => self.municipality_id.as_ref(),
            Level::Village => self.village_id.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, level: Level, id: Option<LocationId>) {
        let slot = match level {
            Level::Country => &mut self.country_id,
            Level::Department => &mut self.department_id,
            Level::Municipality => &mut self.municipality_id,
            Level::Village => &mut self.village_id,
        };
        *slot = id;
    }

    pub(crate) fn clear_below(&mut self, level: Level) {
        for descendant in level.descendants() {
            self.set(descendant, None);
        }
    }

    /// True when no level is set without its parent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        Level::ALL.into_iter().all(|level| {
            self.get(level).is_none()
                || level
                    .parent()
                    .map_or(true, |parent| self.get(parent).is_some())
        })
    }

    /// Truncates the chain at its first absent level.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(gap) = Level::ALL.into_iter().find(|level| self.get(*level).is_none()) {
            self.clear_below(gap);
        }
        self
    }

    /// Deepest level with a value, assuming a consistent chain.
    #[must_use]
    pub fn deepest(&self) -> Option<Level> {
        Level::ALL
            .into_iter()
            .rev()
            .find(|level| self.get(*level).is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.country_id.is_none()
    }
}
