use common::{ConnectionStatus, DataPoint, Record};
use sync_core::CollectionState;

pub const EMPTY_COLLECTION_MESSAGE: &str = "No items found. Add your first item.";
pub const REQUIRED_FIELDS_MESSAGE: &str = "title and description are required";

pub fn record_line(record: &Record) -> String {
    format!("#{} {}: {}", record.id, record.title, record.description)
}

pub fn collection(state: &CollectionState) -> String {
    if state.is_loading() {
        return "Loading...\n".to_string();
    }
    if let Some(message) = state.error() {
        return format!("{message}\n");
    }
    if state.records().is_empty() {
        return format!("{EMPTY_COLLECTION_MESSAGE}\n");
    }

    let mut out = String::new();
    for record in state.records() {
        let marker = if state.editing() == Some(record.id) { "*" } else { " " };
        out.push_str(&format!("{marker} {}\n", record_line(record)));
    }
    out
}

pub fn data_table(points: &[DataPoint]) -> String {
    let mut out = format!("{:<8} {:>10} {:>12}\n", "month", "sales", "revenue");
    for point in points {
        out.push_str(&format!(
            "{:<8} {:>10.2} {:>12.2}\n",
            point.month, point.sales, point.revenue
        ));
    }
    out
}

pub fn status(status: &ConnectionStatus) -> String {
    let headline = if status.connected {
        "Connected"
    } else {
        "Not Connected"
    };
    format!("{headline}\n{}\n", status.message)
}
