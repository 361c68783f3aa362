//! JSON and HAL representations of records and result pages.

use serde_json::{json, Map, Value};
use std::str::FromStr;
use url::form_urlencoded;

use super::params::SearchParams;
use crate::models::{BibliographicRecord, SearchResultPage};

/// Output representation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Representation {
    /// Plain JSON field map
    #[default]
    Json,
    /// HAL: adds `_links` and `_embedded`
    HalJson,
}

impl Representation {
    pub fn content_type(&self) -> &'static str {
        match self {
            Representation::Json => "application/json",
            Representation::HalJson => "application/hal+json",
        }
    }

    /// Pick a representation from an `Accept` header value
    pub fn from_accept(accept: &str) -> Self {
        if accept.contains("application/hal+json") {
            Representation::HalJson
        } else {
            Representation::Json
        }
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Representation::Json),
            "hal" | "hal+json" | "hal-json" => Ok(Representation::HalJson),
            other => Err(format!("unknown representation: {other}")),
        }
    }
}

/// Builds link targets under a path prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<base>/item:<id>/`
    pub fn item(&self, control_number: &str) -> String {
        format!(
            "{}/item:{}/",
            self.base,
            urlencoding::encode(control_number)
        )
    }

    /// `<base>/search?<echoed params>&start=..&count=..`
    pub fn search(&self, params: &SearchParams, start: usize, count: usize) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params.query_pairs() {
            query.append_pair(key, &value);
        }
        query.append_pair("start", &start.to_string());
        query.append_pair("count", &count.to_string());
        format!("{}/search?{}", self.base, query.finish())
    }
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self::new("/library")
    }
}

fn href(target: String) -> Value {
    json!({ "href": target })
}

/// Navigation links for one page of `size` results
pub fn page_links(
    links: &LinkBuilder,
    params: &SearchParams,
    start: usize,
    count: usize,
    size: usize,
) -> Map<String, Value> {
    let count = count.max(1);
    let last = size.saturating_sub(1) / count * count;

    let mut map = Map::new();
    map.insert("self".into(), href(links.search(params, start, count)));
    map.insert("first".into(), href(links.search(params, 0, count)));
    map.insert("last".into(), href(links.search(params, last, count)));
    if start.saturating_add(count) < size {
        map.insert("next".into(), href(links.search(params, start + count, count)));
    }
    if start > 0 {
        map.insert(
            "prev".into(),
            href(links.search(params, start.saturating_sub(count), count)),
        );
    }
    map
}

/// Flat field map of a record. Points of interest are left out.
fn record_fields(record: &BibliographicRecord) -> Map<String, Value> {
    let libraries: Map<String, Value> = record
        .libraries
        .iter()
        .map(|(location, library)| {
            let mut entry = json!({ "holdings": library.holdings });
            if let Some(availability) = library.availability {
                entry["availability"] = json!(availability);
            }
            (location.identifier(), entry)
        })
        .collect();

    let value = json!({
        "id": record.control_number,
        "title": record.title,
        "author": record.author,
        "publisher": record.publisher,
        "edition": record.edition,
        "description": record.description,
        "isbns": record.isbns,
        "issns": record.issns,
        "copies": record.copies,
        "holding_libraries": record.holding_libraries(),
        "libraries": libraries,
    });

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Plain JSON form of a record, points of interest inline
pub fn record_json(record: &BibliographicRecord) -> Value {
    let mut fields = record_fields(record);
    if let Some(Value::Object(libraries)) = fields.get_mut("libraries") {
        for (location, library) in &record.libraries {
            if let (Some(poi), Some(entry)) = (&library.poi, libraries.get_mut(&location.identifier())) {
                entry["poi"] = json!(poi);
            }
        }
    }
    Value::Object(fields)
}

/// HAL form of a record: self link and embedded points of interest
pub fn record_hal(record: &BibliographicRecord, links: &LinkBuilder) -> Value {
    let mut fields = record_fields(record);
    fields.insert(
        "_links".into(),
        json!({ "self": href(links.item(&record.control_number)) }),
    );

    let pois: Map<String, Value> = record
        .libraries
        .iter()
        .filter_map(|(location, library)| {
            library
                .poi
                .as_ref()
                .map(|poi| (location.identifier(), json!(poi)))
        })
        .collect();
    if !pois.is_empty() {
        fields.insert("_embedded".into(), Value::Object(pois));
    }

    Value::Object(fields)
}

fn echoed_query(params: &SearchParams) -> Value {
    json!({
        "title": params.title,
        "author": params.author,
        "isbn": params.isbn,
        "issn": params.issn,
    })
}

/// Plain JSON form of a result page
pub fn search_json(params: &SearchParams, page: &SearchResultPage) -> Value {
    json!({
        "query": echoed_query(params),
        "size": page.size,
        "start": page.start,
        "count": page.count,
        "results": page.results.iter().map(record_json).collect::<Vec<_>>(),
    })
}

/// HAL form of a result page
pub fn search_hal(params: &SearchParams, page: &SearchResultPage, links: &LinkBuilder) -> Value {
    let items: Vec<Value> = page
        .results
        .iter()
        .map(|record| record_hal(record, links))
        .collect();

    json!({
        "query": echoed_query(params),
        "size": page.size,
        "start": page.start,
        "count": page.count,
        "_links": page_links(links, params, page.start, page.count, page.size),
        "_embedded": { "items": items },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::parse_record;
    use crate::models::{LibraryLocation, PointOfInterest};
    use crate::transport::RawRecord;

    fn params() -> SearchParams {
        SearchParams {
            title: Some("Dune".to_string()),
            ..SearchParams::default()
        }
    }

    fn record() -> BibliographicRecord {
        let mut record = parse_record(&RawRecord::from(
            "header\n001 012345678\n245 10$aDune\n852   $bBOD $cBODBL $hM88 $t1\n852   $bRSL $hQA1",
        ))
        .unwrap();
        record.libraries[&LibraryLocation::new(["RSL"])].poi =
            Some(PointOfInterest::new("oxpoints:1").name("Radcliffe Science Library"));
        record
    }

    #[test]
    fn test_item_link() {
        let links = LinkBuilder::default();
        assert_eq!(links.item("012345678"), "/library/item:012345678/");
        assert_eq!(LinkBuilder::new("/api/").item("1"), "/api/item:1/");
    }

    #[test]
    fn test_page_links_first_page() {
        let links = page_links(&LinkBuilder::default(), &params(), 0, 10, 25);
        assert_eq!(
            links["next"]["href"],
            "/library/search?title=Dune&start=10&count=10"
        );
        assert_eq!(
            links["last"]["href"],
            "/library/search?title=Dune&start=20&count=10"
        );
        assert!(links.get("prev").is_none());
    }

    #[test]
    fn test_page_links_last_page() {
        let links = page_links(&LinkBuilder::default(), &params(), 20, 10, 25);
        assert!(links.get("next").is_none());
        assert_eq!(
            links["prev"]["href"],
            "/library/search?title=Dune&start=10&count=10"
        );
    }

    #[test]
    fn test_page_links_exact_multiple_and_empty() {
        let links = page_links(&LinkBuilder::default(), &params(), 0, 10, 20);
        assert_eq!(
            links["last"]["href"],
            "/library/search?title=Dune&start=10&count=10"
        );

        let links = page_links(&LinkBuilder::default(), &params(), 0, 10, 0);
        assert_eq!(
            links["last"]["href"],
            "/library/search?title=Dune&start=0&count=10"
        );
        assert!(links.get("next").is_none());
    }

    #[test]
    fn test_record_json_inlines_poi() {
        let value = record_json(&record());
        assert_eq!(value["id"], "012345678");
        assert_eq!(value["title"], "Dune");
        assert_eq!(value["holding_libraries"], 2);
        assert_eq!(
            value["libraries"]["BOD/BODBL"]["holdings"][0]["shelfmark"],
            "M88 (copy 1)"
        );
        assert_eq!(value["libraries"]["RSL"]["poi"]["id"], "oxpoints:1");
        assert!(value.get("_links").is_none());
    }

    #[test]
    fn test_record_hal_embeds_poi() {
        let value = record_hal(&record(), &LinkBuilder::default());
        assert_eq!(value["_links"]["self"]["href"], "/library/item:012345678/");
        assert_eq!(
            value["_embedded"]["RSL"]["name"],
            "Radcliffe Science Library"
        );
        assert!(value["libraries"]["RSL"].get("poi").is_none());
    }

    #[test]
    fn test_search_hal() {
        let page = SearchResultPage {
            size: 1,
            results: vec![record()],
            start: 0,
            count: 35,
        };
        let value = search_hal(&params(), &page, &LinkBuilder::default());
        assert_eq!(value["query"]["title"], "Dune");
        assert_eq!(value["size"], 1);
        assert_eq!(value["_embedded"]["items"].as_array().unwrap().len(), 1);
        assert!(value["_links"].get("next").is_none());

        let value = search_json(&params(), &page);
        assert_eq!(value["results"][0]["id"], "012345678");
    }

    #[test]
    fn test_representation_parsing() {
        assert_eq!("hal".parse::<Representation>(), Ok(Representation::HalJson));
        assert_eq!("JSON".parse::<Representation>(), Ok(Representation::Json));
        assert!("xml".parse::<Representation>().is_err());
        assert_eq!(
            Representation::from_accept("application/hal+json, */*"),
            Representation::HalJson
        );
        assert_eq!(
            Representation::HalJson.content_type(),
            "application/hal+json"
        );
    }
}
