use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level envelope returned by the availability endpoint. The inventory
/// backend uses the same shape, so the decoded snapshot seeds the response.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub availability: Availability,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Availability {
    pub title_id: String,
    pub display: HashMap<String, String>,
    pub items: Vec<Item>,
    pub request_options: Vec<RequestOption>,
    pub bound_with: Vec<BoundWithItem>,
}

/// A single physical or electronic copy inside availability.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub barcode: String,
    pub on_shelf: bool,
    pub unavailable: bool,
    pub notice: String,
    pub library: String,
    pub library_id: String,
    pub current_location: String,
    pub home_location_id: String,
    pub call_number: String,
    pub volume: String,
    #[serde(rename = "special_collections_location")]
    pub sc_notes: String,
    pub map: MapRef,
}

/// URL and label for an item location map.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapRef {
    pub name: String,
    #[serde(rename = "map", skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Related items bound with this work.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundWithItem {
    pub is_parent: bool,
    pub title_id: String,
    pub call_number: String,
    pub title: String,
    pub author: String,
}

/// A category of request a patron can make. `option_type` is the only stable
/// key on the list; the pipeline maintains at most one option per type and its
/// value is one of: hold, scan, directLink, aeon, videoReserve.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOption {
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(rename = "button_label")]
    pub label: String,
    pub description: String,
    pub create_url: String,
    pub sign_in_required: bool,
    pub streaming_reserve: bool,
    pub item_options: Vec<ItemOption>,
}

/// A selectable item in a RequestOption.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOption {
    pub label: String,
    pub barcode: String,
    #[serde(rename = "notes")]
    pub sc_notes: String,
    pub library: String,
    pub location: String,
    pub notice: String,
}

/// Search index response container.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SolrResponse {
    #[serde(default)]
    pub response: SolrResponseBody,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SolrResponseBody {
    #[serde(rename = "numFound")]
    pub num_found: usize,
    pub docs: Vec<CatalogRecord>,
}

/// Bibliographic metadata for a single catalog record. Read-only input to the
/// decoration pipeline; every multi-valued field defaults to empty so a
/// degraded or missing record never aborts a request.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRecord {
    pub id: String,
    #[serde(rename = "anon_availability_a")]
    pub anon_availability: Vec<String>,
    #[serde(rename = "author_a")]
    pub author: Vec<String>,
    #[serde(rename = "barcode_a")]
    pub barcode: Vec<String>,
    #[serde(rename = "call_number_a")]
    pub call_number: Vec<String>,
    pub copy: String,
    #[serde(rename = "description_a")]
    pub description: Vec<String>,
    pub edition: String,
    #[serde(rename = "format_a")]
    pub format: Vec<String>,
    #[serde(rename = "hathi_etas_f")]
    pub hathi_etas: Vec<String>,
    pub issue: String,
    #[serde(rename = "isbn_a")]
    pub isbn: Vec<String>,
    #[serde(rename = "issn_a")]
    pub issn: Vec<String>,
    #[serde(rename = "library_a")]
    pub library: Vec<String>,
    #[serde(rename = "location2_a")]
    pub location: Vec<String>,
    #[serde(rename = "local_notes_a")]
    pub local_notes: Vec<String>,
    #[serde(rename = "medium_a")]
    pub medium: Vec<String>,
    #[serde(rename = "pool_f")]
    pub pool: Vec<String>,
    #[serde(rename = "published_date")]
    pub publication_date: String,
    #[serde(rename = "published_location_a")]
    pub published_location: Vec<String>,
    #[serde(rename = "publisher_name_a")]
    pub publisher_name: Vec<String>,
    #[serde(rename = "sc_availability_large_single")]
    pub sc_availability: String,
    #[serde(rename = "source_a")]
    pub source: Vec<String>,
    #[serde(rename = "title_a")]
    pub title: Vec<String>,
    #[serde(rename = "url_a")]
    pub url: Vec<String>,
    #[serde(rename = "workType_a")]
    pub work_types: Vec<String>,
    pub volume: String,
}

/// The closed set of request option types the pipeline produces. Replace and
/// remove rules key on these values, so at most one option of a given type is
/// present at a time.
pub mod option_type {
    pub const HOLD: &str = "hold";
    pub const SCAN: &str = "scan";
    pub const DIRECT_LINK: &str = "directLink";
    pub const AEON: &str = "aeon";
    pub const VIDEO_RESERVE: &str = "videoReserve";
}

/// Fields requested from the search index for availability decoration.
pub const CATALOG_FIELDS: &[&str] = &[
    "id",
    "anon_availability_a",
    "author_a",
    "barcode_a",
    "call_number_a",
    "description_a",
    "format_a",
    "hathi_etas_f",
    "isbn_a",
    "issn_a",
    "library_a",
    "location2_a",
    "local_notes_a",
    "medium_a",
    "pool_f",
    "published_date",
    "published_location_a",
    "publisher_name_a",
    "sc_availability_large_single",
    "source_a",
    "title_a",
    "url_a",
    "workType_a",
];

pub fn catalog_field_list() -> String {
    CATALOG_FIELDS.join(",")
}

/// Case-insensitive substring match over a multi-valued field.
pub fn contains_ci(values: &[String], target: &str) -> bool {
    let needle = target.to_lowercase();
    values.iter().any(|v| v.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ci_matches_anywhere() {
        let values = vec!["Harrison Small Special Collections".to_string()];
        assert!(contains_ci(&values, "special collections"));
        assert!(!contains_ci(&values, "law library"));
        assert!(!contains_ci(&[], "anything"));
    }

    #[test]
    fn snapshot_with_missing_fields_decodes() {
        let raw = r#"{"availability":{"title_id":"u1","items":[{"barcode":"b1"}]}}"#;
        let resp: AvailabilityResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.availability.title_id, "u1");
        assert_eq!(resp.availability.items[0].barcode, "b1");
        assert!(resp.availability.items[0].library_id.is_empty());
    }
}
