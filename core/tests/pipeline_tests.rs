use availability_core::maps::MapTable;
use availability_core::model::{option_type, Availability, CatalogRecord, Item, RequestOption};
use availability_core::pipeline::{decorate, Caller, PipelineContext};

fn run(avail: &mut Availability, record: &CatalogRecord, caller: &Caller) {
    run_with_maps(avail, record, caller, &MapTable::default());
}

fn run_with_maps(avail: &mut Availability, record: &CatalogRecord, caller: &Caller, maps: &MapTable) {
    let ctx = PipelineContext {
        title_id: "u100",
        record,
        caller,
        maps,
        hsl_illiad_url: "https://hsl.example.edu",
    };
    decorate(avail, &ctx);
}

fn option(option_type: &str) -> RequestOption {
    RequestOption {
        option_type: option_type.to_string(),
        ..Default::default()
    }
}

fn spec_coll_item(barcode: &str) -> Item {
    Item {
        barcode: barcode.to_string(),
        library_id: "SPEC-COLL".to_string(),
        call_number: "MSS 1234".to_string(),
        home_location_id: "SC-STACKS".to_string(),
        ..Default::default()
    }
}

#[test]
fn empty_snapshot_renders_with_default_labels() {
    // Inventory 404: the pipeline runs over an empty document without error.
    let mut avail = Availability::default();
    run(&mut avail, &CatalogRecord::default(), &Caller::default());

    assert!(avail.items.is_empty());
    assert!(avail.request_options.is_empty());
    assert_eq!(avail.display.get("library").unwrap(), "Library");
    assert_eq!(avail.display.get("current_location").unwrap(), "Current Location");
    assert_eq!(avail.display.get("call_number").unwrap(), "Call Number");
    assert_eq!(avail.display.get("barcode").unwrap(), "Barcode");
}

#[test]
fn health_sciences_patron_gets_illiad_scan_link() {
    let mut avail = Availability::default();
    avail.request_options = vec![option(option_type::HOLD), option(option_type::SCAN)];
    let caller = Caller {
        home_library: "HEALTHSCI".to_string(),
        can_place_reserve: false,
    };
    let record = CatalogRecord {
        title: vec!["Gray's Anatomy".to_string()],
        ..Default::default()
    };
    run(&mut avail, &record, &caller);

    let types: Vec<&str> = avail.request_options.iter().map(|o| o.option_type.as_str()).collect();
    assert_eq!(types, vec![option_type::HOLD, option_type::DIRECT_LINK]);
    let link = avail.request_options.last().unwrap();
    assert_eq!(link.label, "Request a scan");
    assert!(link.create_url.starts_with("https://hsl.example.edu/illiad.dll?"));
}

#[test]
fn scan_substitution_tolerates_missing_scan_option() {
    let mut avail = Availability::default();
    let caller = Caller {
        home_library: "HEALTHSCI".to_string(),
        can_place_reserve: false,
    };
    run(&mut avail, &CatalogRecord::default(), &caller);
    assert_eq!(avail.request_options.len(), 1);
    assert_eq!(avail.request_options[0].option_type, option_type::DIRECT_LINK);
}

#[test]
fn other_patrons_keep_the_scan_option() {
    let mut avail = Availability::default();
    avail.request_options = vec![option(option_type::SCAN)];
    run(&mut avail, &CatalogRecord::default(), &Caller::default());
    assert_eq!(avail.request_options.len(), 1);
    assert_eq!(avail.request_options[0].option_type, option_type::SCAN);
}

#[test]
fn streaming_video_reserve_requires_capability() {
    let record = CatalogRecord {
        source: vec!["Avalon Media System".to_string()],
        ..Default::default()
    };

    let mut avail = Availability::default();
    run(&mut avail, &record, &Caller::default());
    assert!(avail.request_options.is_empty());

    let caller = Caller {
        home_library: String::new(),
        can_place_reserve: true,
    };
    let mut avail = Availability::default();
    run(&mut avail, &record, &caller);
    assert_eq!(avail.request_options.len(), 1);
    let opt = &avail.request_options[0];
    assert_eq!(opt.option_type, option_type::VIDEO_RESERVE);
    assert!(opt.sign_in_required);
    assert!(opt.streaming_reserve);
}

#[test]
fn stored_availability_merges_archival_items() {
    let record = CatalogRecord {
        id: "sc123".to_string(),
        sc_availability: r#"[{"barcode":"X1","library_id":"SPEC-COLL"},{"barcode":"X2","library_id":"SPEC-COLL"}]"#.to_string(),
        ..Default::default()
    };
    let mut avail = Availability::default();
    avail.items.push(spec_coll_item("B0"));
    run(&mut avail, &record, &Caller::default());

    assert_eq!(avail.title_id, "sc123");
    let barcodes: Vec<&str> = avail.items.iter().map(|i| i.barcode.as_str()).collect();
    assert_eq!(barcodes, vec!["B0", "X1", "X2"]);
}

#[test]
fn records_without_stored_availability_leave_items_untouched() {
    let mut avail = Availability::default();
    avail.title_id = "u100".to_string();
    avail.items.push(spec_coll_item("B0"));
    run(&mut avail, &CatalogRecord::default(), &Caller::default());
    assert_eq!(avail.items.len(), 1);
    assert_eq!(avail.title_id, "u100");
}

#[test]
fn undecodable_stored_availability_contributes_no_items() {
    let record = CatalogRecord {
        id: "sc123".to_string(),
        sc_availability: "not json".to_string(),
        ..Default::default()
    };
    let mut avail = Availability::default();
    run(&mut avail, &record, &Caller::default());
    assert!(avail.items.is_empty());
    assert_eq!(avail.title_id, "sc123");
}

#[test]
fn aeon_option_notes_fall_back_to_placeholder() {
    // Special collections record, one SPEC-COLL item, no notes anywhere.
    let record = CatalogRecord {
        library: vec!["Special Collections".to_string()],
        ..Default::default()
    };
    let mut avail = Availability::default();
    avail.items.push(spec_coll_item("B1"));
    run(&mut avail, &record, &Caller::default());

    let aeon = avail
        .request_options
        .iter()
        .find(|o| o.option_type == option_type::AEON)
        .expect("aeon option");
    assert_eq!(aeon.label, "Request this in Special Collections");
    assert!(aeon.create_url.starts_with("https://virginia.aeon.atlas-sys.com/logon?"));
    assert_eq!(aeon.item_options.len(), 1);
    assert_eq!(aeon.item_options[0].sc_notes, "(no location notes)");
    assert_eq!(aeon.item_options[0].label, "MSS 1234");
    assert_eq!(aeon.item_options[0].location, "SC-STACKS");
}

#[test]
fn aeon_item_notes_prefer_item_level_notes() {
    let record = CatalogRecord {
        library: vec!["Special Collections".to_string()],
        local_notes: vec!["SPECIAL COLLECTIONS: from the record".to_string()],
        ..Default::default()
    };
    let mut item = spec_coll_item("B1");
    item.sc_notes = "box 12, folder 3".to_string();
    let mut avail = Availability::default();
    avail.items.push(item);
    avail.items.push(spec_coll_item("B2"));
    run(&mut avail, &record, &Caller::default());

    let aeon = avail
        .request_options
        .iter()
        .find(|o| o.option_type == option_type::AEON)
        .unwrap();
    assert_eq!(aeon.item_options[0].sc_notes, "box 12, folder 3");
    // The second item has no notes of its own and inherits the cleaned
    // record-level notes.
    assert_eq!(aeon.item_options[1].sc_notes, "from the record;\n");
}

#[test]
fn aeon_item_options_skip_circulating_copies() {
    let record = CatalogRecord {
        library: vec!["Special Collections".to_string()],
        ..Default::default()
    };
    let mut avail = Availability::default();
    avail.items.push(spec_coll_item("B1"));
    avail.items.push(Item {
        barcode: "C1".to_string(),
        library_id: "ALDERMAN".to_string(),
        ..Default::default()
    });
    run(&mut avail, &record, &Caller::default());

    let aeon = avail
        .request_options
        .iter()
        .find(|o| o.option_type == option_type::AEON)
        .unwrap();
    assert_eq!(aeon.item_options.len(), 1);
    assert_eq!(aeon.item_options[0].barcode, "B1");
}

#[test]
fn emergency_access_replaces_hold_in_place() {
    let record = CatalogRecord {
        hathi_etas: vec!["true".to_string()],
        url: vec!["https://x".to_string()],
        ..Default::default()
    };
    let mut avail = Availability::default();
    avail.request_options = vec![option(option_type::SCAN), option(option_type::HOLD)];
    avail.items.push(spec_coll_item("B1"));
    avail.items.push(Item {
        barcode: "C1".to_string(),
        library_id: "ALDERMAN".to_string(),
        ..Default::default()
    });
    run(&mut avail, &record, &Caller::default());

    assert_eq!(avail.request_options.len(), 2);
    assert_eq!(avail.request_options[0].option_type, option_type::SCAN);
    let link = &avail.request_options[1];
    assert_eq!(link.option_type, option_type::DIRECT_LINK);
    assert_eq!(link.label, "Read via HathiTrust");
    assert_eq!(link.create_url, "https://x");

    let holds = avail
        .request_options
        .iter()
        .filter(|o| o.option_type == option_type::HOLD)
        .count();
    assert_eq!(holds, 0);

    // Online-only access: circulating copies are dropped.
    assert_eq!(avail.items.len(), 1);
    assert_eq!(avail.items[0].barcode, "B1");
}

#[test]
fn emergency_access_appends_when_no_hold_exists() {
    let record = CatalogRecord {
        hathi_etas: vec!["true".to_string()],
        ..Default::default()
    };
    let mut avail = Availability::default();
    run(&mut avail, &record, &Caller::default());

    assert_eq!(avail.request_options.len(), 1);
    let link = &avail.request_options[0];
    assert_eq!(link.option_type, option_type::DIRECT_LINK);
    // No catalog URL: the notice stands alone without a link or label.
    assert!(link.create_url.is_empty());
    assert!(link.label.is_empty());
}

#[test]
fn map_enrichment_uses_wildcard_lookups() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("maps.csv"),
        "ID,URL,NAME\n7,https://maps.example.edu/alderman2.pdf,Alderman Floor 2\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("map_lookups.csv"), "RANGE,LOCATION,MAP\n*,STACKS,7\n").unwrap();
    let maps = MapTable::load(dir.path());

    let mut avail = Availability::default();
    avail.items.push(Item {
        home_location_id: "STACKS".to_string(),
        ..Default::default()
    });
    avail.items.push(Item {
        home_location_id: "ELSEWHERE".to_string(),
        ..Default::default()
    });
    run_with_maps(&mut avail, &CatalogRecord::default(), &Caller::default(), &maps);

    assert_eq!(avail.items[0].map.name, "Alderman Floor 2");
    assert_eq!(avail.items[0].map.url, "https://maps.example.edu/alderman2.pdf");
    assert_eq!(avail.items[1].map.name, "N/A");
    assert!(avail.items[1].map.url.is_empty());
}
