//! Lenient parser for the circulation-status XML feed.
//!
//! ```xml
//! <circ-status>
//!   <item-data>
//!     <location>M88.E01234</location>
//!     <due-date>Reference</due-date>
//!   </item-data>
//! </circ-status>
//! ```
//!
//! Only `item-data` elements directly under the `circ-status` root count.
//! Namespaces are ignored and mismatched end tags are tolerated. When the
//! markup breaks part-way, the items read before the break are kept.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::AnnotationError;

/// One `item-data` entry of the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CirculationItem {
    /// Shelfmark of the physical item
    pub location: Option<String>,

    /// Either a `DD/MM/YY` due date or a status text. Empty when missing.
    pub due_date: String,
}

#[derive(Default)]
struct ItemBuilder {
    location: Option<String>,
    due_date: Option<String>,
}

impl ItemBuilder {
    fn set(&mut self, field: &[u8], text: String) {
        let slot = match field {
            b"location" => &mut self.location,
            b"due-date" => &mut self.due_date,
            _ => return,
        };
        match slot {
            Some(existing) => existing.push_str(&text),
            None => *slot = Some(text),
        }
    }

    fn build(self) -> CirculationItem {
        CirculationItem {
            location: self.location,
            due_date: self.due_date.unwrap_or_default(),
        }
    }
}

/// Parse the items of a circulation-status response
pub fn parse_circulation_status(xml: &str) -> Result<Vec<CirculationItem>, AnnotationError> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut items = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    // children already seen in the current item; only the first of each counts
    let mut closed_fields: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(e.local_name().as_ref().to_vec());
                if is_item_path(&path) {
                    current = Some(ItemBuilder::default());
                    closed_fields.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                if path.len() == 2 && is_item_path(&path) {
                    if let Some(item) = current.as_mut() {
                        let field = e.local_name().as_ref().to_vec();
                        if !closed_fields.contains(&field) {
                            item.set(&field, String::new());
                            closed_fields.push(field);
                        }
                    }
                } else if path.len() == 1
                    && path[0] == b"circ-status"
                    && e.local_name().as_ref() == b"item-data"
                {
                    items.push(CirculationItem::default());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = open_field(&path, &closed_fields) {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            tracing::debug!("Keeping raw text of malformed entity: {}", err);
                            String::from_utf8_lossy(&e).into_owned()
                        }
                    };
                    if let Some(item) = current.as_mut() {
                        item.set(field, text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) = open_field(&path, &closed_fields) {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if let Some(item) = current.as_mut() {
                        item.set(field, text);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if let Some(field) = item_field(&path) {
                    closed_fields.push(field.to_vec());
                } else if is_item_path(&path) {
                    if let Some(item) = current.take() {
                        items.push(item.build());
                    }
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                if items.is_empty() {
                    return Err(AnnotationError::Xml(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    )));
                }
                tracing::warn!(
                    "Stopped reading circulation status after {} items: {}",
                    items.len(),
                    e
                );
                break;
            }
        }
    }

    Ok(items)
}

fn is_item_path(path: &[Vec<u8>]) -> bool {
    matches!(path, [root, item] if root == b"circ-status" && item == b"item-data")
}

/// The item child element the reader is inside, if any
fn item_field(path: &[Vec<u8>]) -> Option<&[u8]> {
    match path {
        [root, item, field] if root == b"circ-status" && item == b"item-data" => {
            Some(field.as_slice())
        }
        _ => None,
    }
}

/// The item child the reader is inside, unless an earlier sibling of the
/// same name already closed
fn open_field<'a>(path: &'a [Vec<u8>], closed_fields: &[Vec<u8>]) -> Option<&'a [u8]> {
    item_field(path).filter(|field| !closed_fields.iter().any(|f| f.as_slice() == *field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(location: &str, due_date: &str) -> CirculationItem {
        CirculationItem {
            location: Some(location.to_string()),
            due_date: due_date.to_string(),
        }
    }

    #[test]
    fn test_parse_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<circ-status>
  <item-data>
    <location>M88.E01234 (copy 1)</location>
    <due-date>Reference</due-date>
    <loan-status>A</loan-status>
  </item-data>
  <item-data>
    <location>QA76.73.C15 KER</location>
    <due-date>15/03/24</due-date>
  </item-data>
</circ-status>"#;

        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(
            items,
            [
                item("M88.E01234 (copy 1)", "Reference"),
                item("QA76.73.C15 KER", "15/03/24")
            ]
        );
    }

    #[test]
    fn test_only_root_items_count() {
        let xml = "<circ-status>\
            <session><item-data><location>X</location></item-data></session>\
            <item-data><location>Y</location><due-date>Available</due-date></item-data>\
            </circ-status>";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items, [item("Y", "Available")]);

        let other_root = "<error><item-data><location>Z</location></item-data></error>";
        assert!(parse_circulation_status(other_root).unwrap().is_empty());
    }

    #[test]
    fn test_first_child_wins_and_missing_due_date_is_empty() {
        let xml = "<circ-status><item-data>\
            <location>A</location><location>B</location>\
            </item-data><item-data><location>C</location><due-date/></item-data></circ-status>";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items, [item("A", ""), item("C", "")]);
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = "<circ-status><item-data><location>A &amp; B</location>\
            <due-date>Check shelf</due-date></item-data></circ-status>";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items, [item("A & B", "Check shelf")]);
    }

    #[test]
    fn test_bare_ampersand_keeps_raw_text() {
        let xml = "<circ-status>\
            <item-data><location>QA1</location><due-date>Available</due-date></item-data>\
            <item-data><location>A & B</location><due-date>Reference</due-date></item-data>\
            </circ-status>";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items[0], item("QA1", "Available"));
        assert_eq!(items[1], item("A & B", "Reference"));
    }

    #[test]
    fn test_first_child_wins_for_cdata() {
        let xml = "<circ-status><item-data>\
            <location>A</location><location><![CDATA[B]]></location>\
            <due-date><![CDATA[Available]]></due-date>\
            </item-data></circ-status>";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items, [item("A", "Available")]);
    }

    #[test]
    fn test_truncated_document_keeps_complete_items() {
        let xml = "<circ-status><item-data><location>A</location><due-date>Available</due-date>\
            </item-data><item-data><location>B</loc";
        let items = parse_circulation_status(xml).unwrap();
        assert_eq!(items, [item("A", "Available")]);
    }

    #[test]
    fn test_garbage_fails() {
        assert!(parse_circulation_status("<circ-status><<<").is_err());
    }
}
