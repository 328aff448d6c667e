//! Availability decoration pipeline.
//!
//! A decoded inventory snapshot plus the matching catalog record run through a
//! fixed sequence of condition-gated rules, each mutating the availability
//! document in place. Rule order is an invariant: the Aeon rule reads items
//! merged by the archival rule, and the emergency access override replaces
//! options added by everything before it.

use lazy_static::lazy_static;
use regex::Regex;
use url::form_urlencoded;

use crate::maps::MapTable;
use crate::model::{contains_ci, option_type, Availability, CatalogRecord, Item, ItemOption, RequestOption};
use crate::reserves::is_streaming_video;

/// Library id marking special collections holdings.
pub const SPECIAL_COLLECTIONS_LIBRARY_ID: &str = "SPEC-COLL";

/// Home library code for health sciences patrons.
pub const HEALTH_SCIENCES_LIBRARY: &str = "HEALTHSCI";

const AEON_LOGON_URL: &str = "https://virginia.aeon.atlas-sys.com/logon";

const ETAS_DESCRIPTION: &str = "Use the link above to read this item online through the \
<a target=\"_blank\" href=\"https://www.library.virginia.edu/services/etas\">Emergency Temporary Access Service.</a>\
<p>Because of U.S. Copyright law, any item made available online through ETAS cannot be also physically circulated. \
Buttons above reflect any requests that can be made for this item. \
<a href=\"https://www.library.virginia.edu/news/covid-19/\" target=\"blank\">Read more about digital and physical access during COVID-19.</a></p>";

/// Patron attributes the pipeline rules are gated on.
#[derive(Debug, Default, Clone)]
pub struct Caller {
    pub home_library: String,
    pub can_place_reserve: bool,
}

/// Inputs shared by every rule. The map table is the only process-wide state
/// and it is read-only after startup.
pub struct PipelineContext<'a> {
    pub title_id: &'a str,
    pub record: &'a CatalogRecord,
    pub caller: &'a Caller,
    pub maps: &'a MapTable,
    pub hsl_illiad_url: &'a str,
}

type Rule = fn(&mut Availability, &PipelineContext);

/// Runs the full decoration sequence over an availability document.
pub fn decorate(avail: &mut Availability, ctx: &PipelineContext) {
    let rules: &[Rule] = &[
        seed_display_labels,
        substitute_health_sciences_scan,
        add_streaming_video_reserve,
        merge_stored_special_collections,
        append_aeon_option,
        apply_emergency_access,
        add_map_info,
    ];
    for rule in rules {
        rule(avail, ctx);
    }
}

/// Fixed item field to display label mapping.
fn seed_display_labels(avail: &mut Availability, _ctx: &PipelineContext) {
    avail.display.insert("library".to_string(), "Library".to_string());
    avail.display.insert("current_location".to_string(), "Current Location".to_string());
    avail.display.insert("call_number".to_string(), "Call Number".to_string());
    avail.display.insert("barcode".to_string(), "Barcode".to_string());
}

/// Health sciences patrons get their scans through ILLiad instead of the
/// standard scan workflow. Absence of a prior scan option is not an error.
fn substitute_health_sciences_scan(avail: &mut Availability, ctx: &PipelineContext) {
    if ctx.caller.home_library != HEALTH_SCIENCES_LIBRARY {
        return;
    }
    tracing::info!(title_id = %ctx.title_id, "substituting scan option for health sciences patron");
    if let Some(idx) = avail
        .request_options
        .iter()
        .position(|opt| opt.option_type == option_type::SCAN)
    {
        avail.request_options.remove(idx);
    }
    avail.request_options.push(RequestOption {
        option_type: option_type::DIRECT_LINK.to_string(),
        label: "Request a scan".to_string(),
        description: "Select a portion of this item to be scanned.".to_string(),
        create_url: open_url_query(ctx.hsl_illiad_url, ctx.record),
        sign_in_required: false,
        ..Default::default()
    });
}

/// Streaming video titles can be put on course reserve by qualified patrons.
/// Covers both "Internet materials" video holdings and Avalon sourced items.
fn add_streaming_video_reserve(avail: &mut Availability, ctx: &PipelineContext) {
    if !ctx.caller.can_place_reserve || !is_streaming_video(ctx.record) {
        return;
    }
    tracing::info!(title_id = %ctx.title_id, "adding streaming video reserve option");
    avail.request_options.push(RequestOption {
        option_type: option_type::VIDEO_RESERVE.to_string(),
        label: "Video reserve request".to_string(),
        description: "Request a video reserve for streaming".to_string(),
        sign_in_required: true,
        streaming_reserve: true,
        ..Default::default()
    });
}

/// Archival records carry their item list as a JSON blob on the catalog
/// record instead of in the inventory snapshot. A decode failure contributes
/// no items and is not fatal.
fn merge_stored_special_collections(avail: &mut Availability, ctx: &PipelineContext) {
    if ctx.record.sc_availability.is_empty() {
        return;
    }
    // Archival records do not populate the title id from the snapshot.
    avail.title_id = ctx.record.id.clone();
    match serde_json::from_str::<Vec<Item>>(&ctx.record.sc_availability) {
        Ok(items) => avail.items.extend(items),
        Err(err) => {
            tracing::error!(title_id = %ctx.title_id, %err, "unable to parse stored special collections availability");
        }
    }
}

/// Special collections titles are requested through Aeon.
fn append_aeon_option(avail: &mut Availability, ctx: &PipelineContext) {
    if !contains_ci(&ctx.record.library, "Special Collections") {
        return;
    }
    let item_options = aeon_item_options(avail, ctx.record);
    avail.request_options.push(RequestOption {
        option_type: option_type::AEON.to_string(),
        label: "Request this in Special Collections".to_string(),
        description: String::new(),
        create_url: aeon_url(ctx.record),
        sign_in_required: false,
        item_options,
        ..Default::default()
    });
}

/// Titles flagged for emergency temporary access are online-only: the hold
/// option is replaced in place by a HathiTrust link and circulating copies are
/// dropped from the item list.
fn apply_emergency_access(avail: &mut Availability, ctx: &PipelineContext) {
    if ctx.record.hathi_etas.is_empty() {
        return;
    }
    tracing::info!(title_id = %ctx.title_id, "emergency access found, removing request options");
    let mut option = RequestOption {
        option_type: option_type::DIRECT_LINK.to_string(),
        description: ETAS_DESCRIPTION.to_string(),
        sign_in_required: false,
        ..Default::default()
    };
    if let Some(url) = ctx.record.url.first() {
        option.create_url = url.clone();
        option.label = "Read via HathiTrust".to_string();
    }

    // Replace the hold option at its index, preserving list position. Valid
    // only under the single-instance-per-type invariant.
    match avail
        .request_options
        .iter()
        .position(|opt| opt.option_type == option_type::HOLD)
    {
        Some(idx) => avail.request_options[idx] = option,
        None => avail.request_options.push(option),
    }

    avail
        .items
        .retain(|item| item.library_id == SPECIAL_COLLECTIONS_LIBRARY_ID);
}

fn add_map_info(avail: &mut Availability, ctx: &PipelineContext) {
    ctx.maps.annotate(&mut avail.items);
}

/// Builds the Aeon item choices from the current item list. Items qualify when
/// they live in special collections or the record carries stored archival
/// availability.
fn aeon_item_options(avail: &Availability, doc: &CatalogRecord) -> Vec<ItemOption> {
    let mut options = Vec::new();
    for item in &avail.items {
        if item.library_id != SPECIAL_COLLECTIONS_LIBRARY_ID && doc.sc_availability.is_empty() {
            continue;
        }
        let notes = if !item.sc_notes.is_empty() {
            item.sc_notes.clone()
        } else if !doc.local_notes.is_empty() {
            condense_local_notes(&doc.local_notes)
        } else {
            "(no location notes)".to_string()
        };
        options.push(ItemOption {
            barcode: item.barcode.clone(),
            label: item.call_number.clone(),
            location: item.home_location_id.clone(),
            library: item.library.clone(),
            sc_notes: notes,
            notice: item.notice.clone(),
        });
    }
    options
}

lazy_static! {
    static ref SC_NOTE_PREFIX: Regex =
        Regex::new(r"^\s*SPECIAL\s+COLLECTIONS:\s+").expect("valid regex");
    static ref SC_NAME_PREFIX: Regex =
        Regex::new(r"^\s*Harrison Small Special Collections,").expect("valid regex");
}

/// Cleans record-level location notes for display in an Aeon item choice:
/// drops the department prefix, abbreviates the building name, trims and
/// caps the combined string at 999 bytes.
fn condense_local_notes(local_notes: &[String]) -> String {
    let mut notes = String::new();
    for note in local_notes {
        let note = SC_NOTE_PREFIX.replace(note, "");
        let note = SC_NAME_PREFIX.replace(&note, "H. Small,");
        notes.push_str(note.trim());
        notes.push_str(";\n");
    }
    truncate_to_boundary(&mut notes, 999);
    notes
}

fn truncate_to_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// ILLiad OpenURL for health sciences scan requests. Empty fields are
/// omitted; multi-valued fields are joined with "; " apart from ISSN.
fn open_url_query(base_url: &str, doc: &CatalogRecord) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("Action", "10");
    query.append_pair("Form", "21");
    if !doc.issn.is_empty() {
        query.append_pair("issn", &doc.issn.join(", "));
    }
    if !doc.author.is_empty() {
        query.append_pair("loanauthor", &doc.author.join("; "));
    }
    if !doc.publication_date.is_empty() {
        query.append_pair("loandate", &doc.publication_date);
    }
    if !doc.edition.is_empty() {
        query.append_pair("loanedition", &doc.edition);
    }
    query.append_pair("loantitle", &doc.title.join("; "));
    if !doc.issue.is_empty() {
        query.append_pair("photojournalissue", &doc.issue);
    }
    if !doc.volume.is_empty() {
        query.append_pair("photojournalvolume", &doc.volume);
    }
    format!("{}/illiad.dll?{}", base_url, query.finish())
}

/// Aeon logon URL carrying the record metadata. Item-specific values (notes,
/// barcode, call number, special requests) are filled in by the client for
/// the chosen item, so their parameters are sent empty.
fn aeon_url(doc: &CatalogRecord) -> String {
    // Manuscripts and archival collections use the manuscript request form.
    let manuscript = contains_ci(&doc.work_types, "manuscript")
        || contains_ci(&doc.medium, "manuscript")
        || contains_ci(&doc.format, "manuscript")
        || contains_ci(&doc.work_types, "collection");
    let form_value = if manuscript {
        "GenericRequestManuscript"
    } else {
        "GenericRequestMonograph"
    };

    let author = match doc.author.len() {
        0 => String::new(),
        1 => doc.author[0].clone(),
        _ => format!("{}; ...", doc.author[0]),
    };
    let mut isxn = doc.isbn.clone();
    isxn.extend(doc.issn.iter().cloned());

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("Action", "10");
    query.append_pair("CallNumber", "");
    query.append_pair("Form", "20");
    query.append_pair("ItemAuthor", &author);
    query.append_pair("ItemDate", &doc.publication_date);
    query.append_pair("ItemEdition", &doc.edition);
    query.append_pair("ItemISxN", &isxn.join(";"));
    query.append_pair("ItemInfo1", &doc.description.join("; "));
    query.append_pair("ItemInfo2", &doc.copy);
    query.append_pair("ItemIssuesue", &doc.issue);
    query.append_pair("ItemNumber", "");
    query.append_pair("ItemPlace", &doc.published_location.join("; "));
    query.append_pair("ItemPublisher", &doc.publisher_name.join("; "));
    query.append_pair("ItemTitle", &doc.title.join("; "));
    query.append_pair("ItemVolume", &doc.volume);
    query.append_pair("Location", "");
    query.append_pair("Notes", "");
    query.append_pair("ReferenceNumber", &doc.id);
    query.append_pair("SpecialRequest", "");
    query.append_pair("Value", form_value);
    format!("{}?{}", AEON_LOGON_URL, query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_notes_are_cleaned_and_joined() {
        let notes = condense_local_notes(&[
            "  SPECIAL COLLECTIONS: shelved in vault".to_string(),
            "Harrison Small Special Collections, box 3".to_string(),
        ]);
        assert_eq!(notes, "shelved in vault;\nH. Small, box 3;\n");
    }

    #[test]
    fn long_notes_are_capped() {
        let notes = condense_local_notes(&["x".repeat(2000)]);
        assert_eq!(notes.len(), 999);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut s = "aé".repeat(400);
        truncate_to_boundary(&mut s, 999);
        assert!(s.len() <= 999);
        assert!(s.is_char_boundary(s.len()));
    }

    #[test]
    fn open_url_omits_empty_fields() {
        let doc = CatalogRecord {
            title: vec!["Gray's Anatomy".to_string()],
            issn: vec!["0001".to_string(), "0002".to_string()],
            ..Default::default()
        };
        let url = open_url_query("https://hsl.example.edu", &doc);
        assert!(url.starts_with("https://hsl.example.edu/illiad.dll?Action=10&Form=21"));
        assert!(url.contains("issn=0001%2C+0002"));
        assert!(url.contains("loantitle=Gray%27s+Anatomy"));
        assert!(!url.contains("loanedition"));
        assert!(!url.contains("photojournalvolume"));
    }

    #[test]
    fn aeon_url_selects_manuscript_form() {
        let doc = CatalogRecord {
            id: "u42".to_string(),
            work_types: vec!["collection".to_string()],
            ..Default::default()
        };
        let url = aeon_url(&doc);
        assert!(url.contains("Value=GenericRequestManuscript"));
        assert!(url.contains("ReferenceNumber=u42"));

        let plain = CatalogRecord::default();
        assert!(aeon_url(&plain).contains("Value=GenericRequestMonograph"));
    }

    #[test]
    fn aeon_url_abbreviates_author_list() {
        let doc = CatalogRecord {
            author: vec!["Adams, A.".to_string(), "Brown, B.".to_string()],
            ..Default::default()
        };
        assert!(aeon_url(&doc).contains("ItemAuthor=Adams%2C+A.%3B+..."));
    }
}
