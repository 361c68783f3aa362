//! Matching of circulation items to holdings by shelfmark.

use chrono::NaiveDate;

use super::circ_status::CirculationItem;
use crate::models::{Availability, BibliographicRecord};

/// Display text for items held in closed stacks
pub const CLOSED_STACK_DISPLAY: &str = "Closed Stack / Request via SOLO";

const DUE_DATE_FORMAT: &str = "%d/%m/%y";

/// Availability and display text derived from one feed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CirculationStatus {
    pub availability: Availability,
    pub due: Option<NaiveDate>,
    pub display: Option<String>,
}

/// Bare shelfmark: everything before `(copy`, trimmed
pub fn sanitize_shelfmark(shelfmark: &str) -> &str {
    let bare = match shelfmark.find("(copy") {
        Some(index) => &shelfmark[..index],
        None => shelfmark,
    };
    bare.trim()
}

/// Availability for a status text from the feed
pub fn availability_from_status(status: &str) -> Availability {
    match status {
        "Available" => Availability::Available,
        "Reference" | "Confined" => Availability::Reference,
        "Check shelf" | "Please check shelf" | "" => Availability::Unknown,
        "In place" => Availability::Stack,
        "Missing" | "Temporarily missing" | "Reported Missing" | "Withdrawn" => {
            Availability::Unavailable
        }
        _ => Availability::Unavailable,
    }
}

/// Interpret a feed `due-date` value.
///
/// A `DD/MM/YY` date means the copy is on loan. Anything else is a status
/// text. A trailing `*` marks a closed-stack item whatever the rest says.
pub fn interpret_due_date(raw: &str) -> CirculationStatus {
    let mut status = match NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT) {
        Ok(due) => CirculationStatus {
            availability: Availability::Unavailable,
            due: Some(due),
            display: Some(format!("Due back: {raw}")),
        },
        Err(_) => CirculationStatus {
            availability: availability_from_status(raw),
            due: None,
            display: (!raw.is_empty()).then(|| raw.to_string()),
        },
    };

    if raw.ends_with('*') {
        status.availability = Availability::Stack;
        status.display = Some(CLOSED_STACK_DISPLAY.to_string());
    }
    status
}

/// Annotate the holdings of `record` from the feed items.
///
/// Each holding with a shelfmark takes the first unused item whose location
/// starts with its bare shelfmark. An item serves at most one holding.
/// Holdings without a match keep their availability.
pub fn reconcile(record: &mut BibliographicRecord, items: &[CirculationItem]) {
    let mut consumed = vec![false; items.len()];

    for (location, library) in record.libraries.iter_mut() {
        for holding in library.holdings.iter_mut() {
            let Some(shelfmark) = holding.shelfmark.as_deref() else {
                continue;
            };
            let bare = sanitize_shelfmark(shelfmark);
            if bare.is_empty() {
                continue;
            }

            let matched = items.iter().enumerate().find(|(index, item)| {
                !consumed[*index]
                    && item
                        .location
                        .as_deref()
                        .is_some_and(|item_location| item_location.starts_with(bare))
            });

            let Some((index, item)) = matched else {
                tracing::info!(
                    control_number = %record.control_number,
                    library = %location,
                    "Couldn't find match for location - {}",
                    bare
                );
                continue;
            };

            consumed[index] = true;
            let status = interpret_due_date(&item.due_date);
            holding.availability = status.availability;
            holding.due = status.due;
            holding.availability_display = status.display;
        }
    }
}

/// Set each library's availability to the best of its holdings
pub fn aggregate(record: &mut BibliographicRecord) {
    for library in record.libraries.values_mut() {
        library.availability = library.best_availability();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::parse_record;
    use crate::models::LibraryLocation;
    use crate::transport::RawRecord;

    fn record() -> BibliographicRecord {
        parse_record(&RawRecord::from(
            "header\n\
             001 012345678\n\
             852   $bBOD $cBODBL $hM88.E01234 $t1\n\
             852   $bBOD $cBODBL $hM88.E01234 $t2\n\
             852   $bRSL $hQA76.73.C15 KER\n\
             852   $bSAC $3Vol. 1",
        ))
        .unwrap()
    }

    fn item(location: &str, due_date: &str) -> CirculationItem {
        CirculationItem {
            location: Some(location.to_string()),
            due_date: due_date.to_string(),
        }
    }

    #[test]
    fn test_sanitize_shelfmark() {
        assert_eq!(sanitize_shelfmark("QA76.1 (copy 2)"), "QA76.1");
        assert_eq!(sanitize_shelfmark("QA76.1"), "QA76.1");
        assert_eq!(sanitize_shelfmark(sanitize_shelfmark("QA76.1 (copy 2)")), "QA76.1");
        assert_eq!(sanitize_shelfmark("  M88.E01234 "), "M88.E01234");
    }

    #[test]
    fn test_status_table() {
        assert_eq!(availability_from_status("Available"), Availability::Available);
        assert_eq!(availability_from_status("Confined"), Availability::Reference);
        assert_eq!(availability_from_status("Please check shelf"), Availability::Unknown);
        assert_eq!(availability_from_status(""), Availability::Unknown);
        assert_eq!(availability_from_status("In place"), Availability::Stack);
        assert_eq!(availability_from_status("Withdrawn"), Availability::Unavailable);
        assert_eq!(availability_from_status("On order"), Availability::Unavailable);
    }

    #[test]
    fn test_due_date() {
        let status = interpret_due_date("15/03/24");
        assert_eq!(status.availability, Availability::Unavailable);
        assert_eq!(status.due, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(status.display.as_deref(), Some("Due back: 15/03/24"));
    }

    #[test]
    fn test_closed_stack_overrides() {
        let status = interpret_due_date("15/03/24*");
        assert_eq!(status.availability, Availability::Stack);
        assert_eq!(status.due, None);
        assert_eq!(status.display.as_deref(), Some(CLOSED_STACK_DISPLAY));

        assert_eq!(interpret_due_date("Available*").availability, Availability::Stack);
    }

    #[test]
    fn test_reconcile_consumes_items_in_order() {
        let mut record = record();
        let items = [
            item("M88.E01234 (copy 1)", "Reference"),
            item("M88.E01234 (copy 2)", "15/03/24"),
            item("QA76.73.C15 KER", "Available"),
        ];
        reconcile(&mut record, &items);
        aggregate(&mut record);

        let bod = &record.libraries[&LibraryLocation::new(["BOD", "BODBL"])];
        assert_eq!(bod.holdings[0].availability, Availability::Reference);
        assert_eq!(bod.holdings[0].availability_display.as_deref(), Some("Reference"));
        assert_eq!(bod.holdings[1].availability, Availability::Unavailable);
        assert_eq!(bod.holdings[1].due, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(bod.availability, Some(Availability::Reference));

        let rsl = &record.libraries[&LibraryLocation::new(["RSL"])];
        assert_eq!(rsl.availability, Some(Availability::Available));
    }

    #[test]
    fn test_unmatched_and_shelfmarkless_holdings_stay_unknown() {
        let mut record = record();
        reconcile(&mut record, &[item("ZZZ", "Available")]);
        aggregate(&mut record);

        for (_, holding) in record.holdings() {
            assert_eq!(holding.availability, Availability::Unknown);
        }
        let sac = &record.libraries[&LibraryLocation::new(["SAC"])];
        assert_eq!(sac.availability, Some(Availability::Unknown));
    }

    #[test]
    fn test_item_serves_one_holding() {
        let mut record = record();
        reconcile(&mut record, &[item("M88.E01234", "Available")]);

        let bod = &record.libraries[&LibraryLocation::new(["BOD", "BODBL"])];
        assert_eq!(bod.holdings[0].availability, Availability::Available);
        assert_eq!(bod.holdings[1].availability, Availability::Unknown);
    }

    #[test]
    fn test_empty_library_aggregate_is_none() {
        let mut record = record();
        record.libraries[0].holdings.clear();
        aggregate(&mut record);
        assert_eq!(record.libraries[0].availability, None);
    }
}
