//! Transient markers and their names.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use smol_str::{SmolStr, format_smolstr};

use crate::document::ModelRange;
use crate::error::ModelError;

/// A named annotation over a range. Not document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub name: SmolStr,
    pub range: ModelRange,
}

impl Marker {
    /// Group this marker belongs to: the part of the name before the first `:`.
    pub fn group(&self) -> &str {
        marker_group(&self.name)
    }
}

fn marker_group(name: &str) -> &str {
    name.split_once(':').map(|(group, _)| group).unwrap_or(name)
}

/// Markers of one document, keyed and ordered by name.
#[derive(Debug, Clone, Default)]
pub struct MarkerCollection {
    markers: BTreeMap<SmolStr, Marker>,
}

impl MarkerCollection {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Every marker whose name is `group` or starts with `group:`.
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers
            .values()
            .filter(move |marker| marker.group() == group)
    }

    pub(crate) fn insert(&mut self, marker: Marker) -> Result<(), ModelError> {
        if self.markers.contains_key(&marker.name) {
            return Err(ModelError::DuplicateMarker(marker.name));
        }
        self.markers.insert(marker.name.clone(), marker);
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Marker> {
        self.markers.remove(name)
    }
}

/// Parsed form of a highlighting marker name, `group:class:sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerName {
    pub group: SmolStr,
    pub class: SmolStr,
    pub sequence: u64,
}

impl MarkerName {
    pub fn new(group: impl Into<SmolStr>, class: impl Into<SmolStr>, sequence: u64) -> Self {
        Self {
            group: group.into(),
            class: class.into(),
            sequence,
        }
    }

    pub fn to_smolstr(&self) -> SmolStr {
        format_smolstr!("{}:{}:{}", self.group, self.class, self.sequence)
    }
}

impl fmt::Display for MarkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.class, self.sequence)
    }
}

impl FromStr for MarkerName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidMarkerName(SmolStr::new(s));
        // The class sits between the first and last `:` and may contain more.
        let (group, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (class, sequence) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if group.is_empty() || class.is_empty() {
            return Err(invalid());
        }
        let sequence = sequence.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(group, class, sequence))
    }
}
