//! Bibliographic record model.
//!
//! A [`BibliographicRecord`] is produced from one raw catalogue record by the
//! MARC parser. Its holdings are grouped by [`LibraryLocation`] in the order
//! they were encountered; the availability annotator later fills in the
//! per-holding [`Availability`] and the per-library aggregate.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Availability of a copy, ordered from worst to best.
///
/// The aggregate availability of a library is the maximum over its holdings.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Unavailable,
    #[default]
    Unknown,
    Stack,
    Reference,
    Available,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Unavailable => "unavailable",
            Availability::Unknown => "unknown",
            Availability::Stack => "stack",
            Availability::Reference => "reference",
            Availability::Available => "available",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical library location: branch code followed by sub-branch codes.
///
/// Equality and hashing are structural, so a location can key a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryLocation(Vec<String>);

impl LibraryLocation {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments joined with `/`
    pub fn identifier(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for LibraryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl Serialize for LibraryLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identifier())
    }
}

/// One physical copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub shelfmark: Option<String>,
    pub materials_specified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_display: Option<String>,
}

/// A point of interest returned by the places service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Any further attributes the places service provides
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl PointOfInterest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The copies a single library holds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Library {
    pub holdings: Vec<Holding>,

    /// Best availability over `holdings`, set once availability is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poi: Option<PointOfInterest>,
}

impl Library {
    /// Maximum availability over the holdings, `None` if there are none
    pub fn best_availability(&self) -> Option<Availability> {
        self.holdings.iter().map(|h| h.availability).max()
    }
}

/// A parsed catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BibliographicRecord {
    pub control_number: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub edition: Option<String>,
    pub description: Option<String>,
    pub isbns: Vec<String>,
    pub issns: Vec<String>,

    /// Number of location fields in the source record
    pub copies: usize,

    pub libraries: IndexMap<LibraryLocation, Library>,
}

impl BibliographicRecord {
    /// Number of distinct libraries holding a copy
    pub fn holding_libraries(&self) -> usize {
        self.libraries.len()
    }

    /// Iterate over every holding with its location
    pub fn holdings(&self) -> impl Iterator<Item = (&LibraryLocation, &Holding)> {
        self.libraries
            .iter()
            .flat_map(|(location, library)| library.holdings.iter().map(move |h| (location, h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_availability_ordering() {
        assert!(Availability::Unavailable < Availability::Unknown);
        assert!(Availability::Unknown < Availability::Stack);
        assert!(Availability::Stack < Availability::Reference);
        assert!(Availability::Reference < Availability::Available);
        assert_eq!(Availability::default(), Availability::Unknown);
    }

    #[test]
    fn test_best_availability() {
        let library = Library {
            holdings: [
                Availability::Unknown,
                Availability::Available,
                Availability::Reference,
            ]
            .into_iter()
            .map(|availability| Holding {
                availability,
                ..Default::default()
            })
            .collect(),
            ..Default::default()
        };
        assert_eq!(library.best_availability(), Some(Availability::Available));
        assert_eq!(Library::default().best_availability(), None);
    }

    #[test]
    fn test_location_is_a_value_key() {
        let mut map = HashMap::new();
        map.insert(LibraryLocation::new(["BOD", "BODBL"]), 1);
        assert_eq!(map.get(&LibraryLocation::new(["BOD", "BODBL"])), Some(&1));
        assert_eq!(map.get(&LibraryLocation::new(["BOD"])), None);
        assert_eq!(LibraryLocation::new(["BOD", "BODBL"]).to_string(), "BOD/BODBL");
    }

    #[test]
    fn test_location_serializes_as_joined_key() {
        let mut libraries = IndexMap::new();
        libraries.insert(LibraryLocation::new(["RSL"]), Library::default());
        let value = serde_json::to_value(&libraries).unwrap();
        assert!(value.get("RSL").is_some());
        assert_eq!(
            serde_json::to_value(Availability::Reference).unwrap(),
            "reference"
        );
    }

    #[test]
    fn test_point_of_interest_keeps_extra_attributes() {
        let poi: PointOfInterest = serde_json::from_str(
            r#"{"id": "oxpoints:23233598", "name": "Radcliffe Science Library", "lat": 51.759}"#,
        )
        .unwrap();
        assert_eq!(poi.name.as_deref(), Some("Radcliffe Science Library"));
        assert_eq!(poi.attributes.get("lat"), Some(&serde_json::json!(51.759)));
    }
}
