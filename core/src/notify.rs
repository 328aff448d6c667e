//! Reserve request notification assembly.
//!
//! Requested items are split into video and non-video buckets, each non-empty
//! bucket renders one plain text message, and recipients are routed by the
//! target reserve library.

use serde::Deserialize;
use std::fmt::Write as _;

/// A submitted course reserves request.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReserveRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub request: RequestParams,
    pub items: Vec<RequestItem>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    #[serde(rename = "onBehalfOf")]
    pub on_behalf_of: String,
    #[serde(rename = "instructorName")]
    pub instructor_name: String,
    #[serde(rename = "instructorEmail")]
    pub instructor_email: String,
    pub name: String,
    pub email: String,
    pub course: String,
    pub semester: String,
    pub library: String,
    pub period: String,
    pub lms: String,
    #[serde(rename = "otherLMS")]
    pub other_lms: String,
}

/// A single requested title as sent by the client. The Virgo link and the
/// availability summary are attached during processing, not parsed from the
/// request body.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RequestItem {
    pub pool: String,
    #[serde(rename = "isVideo")]
    pub is_video: bool,
    #[serde(rename = "catalogKey")]
    pub catalog_key: String,
    #[serde(rename = "callNumber")]
    pub call_number: Vec<String>,
    pub title: String,
    pub author: String,
    pub period: String,
    pub notes: String,
    #[serde(rename = "audioLanguage")]
    pub audio_language: String,
    pub subtitles: String,
    #[serde(rename = "subtitleLanguage")]
    pub subtitle_language: String,
    #[serde(skip)]
    pub virgo_url: String,
    #[serde(skip)]
    pub availability: Vec<AvailabilitySummary>,
}

/// Per-copy availability for a requested item, reduced to the four fields the
/// reserves staff need.
#[derive(Debug, Default, Clone)]
pub struct AvailabilitySummary {
    pub library: String,
    pub location: String,
    pub availability: String,
    pub call_number: String,
}

/// Lightweight availability payload from the circulation backend: a flat
/// name/value field list per item.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub availability: SummaryBody,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SummaryBody {
    #[serde(default)]
    pub items: Vec<FieldedItem>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FieldedItem {
    #[serde(default)]
    pub fields: Vec<ItemField>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ItemField {
    pub name: String,
    pub value: String,
}

impl SummaryResponse {
    /// Filters each item's field list down to the summary fields.
    pub fn summaries(&self) -> Vec<AvailabilitySummary> {
        self.availability
            .items
            .iter()
            .map(|item| {
                let mut summary = AvailabilitySummary::default();
                for field in &item.fields {
                    match field.name.as_str() {
                        "Library" => summary.library = field.value.clone(),
                        "Availability" => summary.availability = field.value.clone(),
                        "Current Location" => summary.location = field.value.clone(),
                        "Call Number" => summary.call_number = field.value.clone(),
                        _ => {}
                    }
                }
                summary
            })
            .collect()
    }
}

/// An assembled outbound message for the email transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub subject: String,
    pub to: Vec<String>,
    pub cc: Option<String>,
    pub reply_to: Option<String>,
    pub from: String,
    pub body: String,
}

/// Reserve mailbox routing configuration.
#[derive(Debug, Clone)]
pub struct Mailboxes {
    pub course_reserves: String,
    pub law_reserves: String,
    pub default_sender: String,
}

/// Builds the outgoing reserve emails for a request whose items already carry
/// availability summaries. Video and non-video items go out as separate
/// messages; an empty bucket sends nothing.
pub fn assemble(req: &ReserveRequest, mailboxes: &Mailboxes) -> Vec<EmailMessage> {
    let (video, non_video): (Vec<&RequestItem>, Vec<&RequestItem>) =
        req.items.iter().partition(|item| item.is_video);

    let mut messages = Vec::new();
    for (items, is_video) in [(non_video, false), (video, true)] {
        if items.is_empty() {
            continue;
        }
        let (to, cc, from, subject_name) = route(&req.request, mailboxes);
        messages.push(EmailMessage {
            subject: format!("{} - {}: {}", req.request.semester, subject_name, req.request.course),
            to,
            cc,
            reply_to: None,
            from,
            body: render_body(req, &items, is_video),
        });
    }
    messages
}

/// Recipient routing. Law reserves go to the law mailbox plus the requester
/// (and instructor when known) from the service sender; everything else goes
/// to the general mailbox, sent by the instructor with the requester CC'd
/// when an instructor email was supplied, else sent by the requester.
fn route(params: &RequestParams, mailboxes: &Mailboxes) -> (Vec<String>, Option<String>, String, String) {
    if params.library == "law" {
        let mut to = vec![mailboxes.law_reserves.clone(), params.email.clone()];
        if !params.instructor_email.is_empty() {
            to.push(params.instructor_email.clone());
        }
        return (to, None, mailboxes.default_sender.clone(), params.name.clone());
    }

    let to = vec![mailboxes.course_reserves.clone()];
    if !params.instructor_email.is_empty() {
        (to, Some(params.email.clone()), params.instructor_email.clone(), params.instructor_name.clone())
    } else {
        (to, None, params.email.clone(), params.name.clone())
    }
}

fn render_body(req: &ReserveRequest, items: &[&RequestItem], is_video: bool) -> String {
    let params = &req.request;
    let mut out = String::new();
    if is_video {
        out.push_str("Video reserves request\n\n");
    } else {
        out.push_str("Course reserves request\n\n");
    }

    let _ = writeln!(out, "Requested by: {} <{}>", params.name, params.email);
    if !params.on_behalf_of.is_empty() {
        let _ = writeln!(out, "On behalf of: {}", params.on_behalf_of);
    }
    if !params.instructor_name.is_empty() {
        let _ = writeln!(out, "Instructor: {} <{}>", params.instructor_name, params.instructor_email);
    }
    let _ = writeln!(out, "Course: {}", params.course);
    let _ = writeln!(out, "Semester: {}", params.semester);
    let _ = writeln!(out, "Reserve library: {}", params.library);
    let _ = writeln!(out, "Loan period: {}", params.period);
    if !params.lms.is_empty() {
        let _ = writeln!(out, "LMS: {}", params.lms);
    }
    if !params.other_lms.is_empty() {
        let _ = writeln!(out, "Other LMS: {}", params.other_lms);
    }

    for (idx, item) in items.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", idx + 1, item.title);
        if !item.author.is_empty() {
            let _ = writeln!(out, "   Author: {}", item.author);
        }
        if !item.call_number.is_empty() {
            let _ = writeln!(out, "   Call number: {}", item.call_number.join(", "));
        }
        let _ = writeln!(out, "   Virgo: {}", item.virgo_url);
        if !item.period.is_empty() {
            let _ = writeln!(out, "   Loan period: {}", item.period);
        }
        if !item.notes.is_empty() {
            let _ = writeln!(out, "   Notes: {}", item.notes);
        }
        if is_video {
            let _ = writeln!(out, "   Audio language: {}", item.audio_language);
            let _ = writeln!(out, "   Subtitles: {}", item.subtitles);
            if !item.subtitle_language.is_empty() {
                let _ = writeln!(out, "   Subtitle language: {}", item.subtitle_language);
            }
        }
        if item.availability.is_empty() {
            let _ = writeln!(out, "   Availability: unknown");
        } else {
            let _ = writeln!(out, "   Availability:");
            for avail in &item.availability {
                let _ = writeln!(
                    out,
                    "     {} | {} | {} | {}",
                    avail.library, avail.location, avail.call_number, avail.availability
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(library: &str, instructor_email: &str, items: Vec<RequestItem>) -> ReserveRequest {
        ReserveRequest {
            user_id: "tst1".to_string(),
            request: RequestParams {
                name: "Patron, Pat".to_string(),
                email: "pat@example.edu".to_string(),
                instructor_name: "Smith, J.".to_string(),
                instructor_email: instructor_email.to_string(),
                course: "CS 101".to_string(),
                semester: "Fall 2020".to_string(),
                library: library.to_string(),
                ..Default::default()
            },
            items,
        }
    }

    fn item(title: &str, is_video: bool) -> RequestItem {
        RequestItem {
            title: title.to_string(),
            is_video,
            catalog_key: "u1".to_string(),
            ..Default::default()
        }
    }

    fn mailboxes() -> Mailboxes {
        Mailboxes {
            course_reserves: "reserves@example.edu".to_string(),
            law_reserves: "law-reserves@example.edu".to_string(),
            default_sender: "no-reply@example.edu".to_string(),
        }
    }

    #[test]
    fn law_requests_go_to_law_mailbox_and_requester() {
        let req = request("law", "smith@example.edu", vec![item("Torts", false)]);
        let messages = assemble(&req, &mailboxes());
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(
            msg.to,
            vec!["law-reserves@example.edu", "pat@example.edu", "smith@example.edu"]
        );
        assert_eq!(msg.from, "no-reply@example.edu");
        assert!(msg.cc.is_none());
        assert_eq!(msg.subject, "Fall 2020 - Patron, Pat: CS 101");
    }

    #[test]
    fn instructor_email_becomes_sender_with_requester_cc() {
        let req = request("clemons", "smith@example.edu", vec![item("Dune", false)]);
        let messages = assemble(&req, &mailboxes());
        let msg = &messages[0];
        assert_eq!(msg.to, vec!["reserves@example.edu"]);
        assert_eq!(msg.from, "smith@example.edu");
        assert_eq!(msg.cc.as_deref(), Some("pat@example.edu"));
        assert_eq!(msg.subject, "Fall 2020 - Smith, J.: CS 101");
    }

    #[test]
    fn without_instructor_the_requester_is_sender() {
        let req = request("clemons", "", vec![item("Dune", false)]);
        let msg = &assemble(&req, &mailboxes())[0];
        assert_eq!(msg.from, "pat@example.edu");
        assert!(msg.cc.is_none());
    }

    #[test]
    fn buckets_split_and_empty_buckets_are_skipped() {
        let req = request(
            "clemons",
            "",
            vec![item("Dune", false), item("Koyaanisqatsi", true)],
        );
        let messages = assemble(&req, &mailboxes());
        assert_eq!(messages.len(), 2);
        assert!(messages[0].body.starts_with("Course reserves request"));
        assert!(messages[0].body.contains("Dune"));
        assert!(messages[1].body.starts_with("Video reserves request"));
        assert!(messages[1].body.contains("Koyaanisqatsi"));

        let video_only = request("clemons", "", vec![item("Koyaanisqatsi", true)]);
        let messages = assemble(&video_only, &mailboxes());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.starts_with("Video reserves request"));
    }

    #[test]
    fn body_includes_availability_rows() {
        let mut it = item("Dune", false);
        it.availability = vec![AvailabilitySummary {
            library: "Alderman".to_string(),
            location: "STACKS".to_string(),
            availability: "On Shelf".to_string(),
            call_number: "PS3600".to_string(),
        }];
        let req = request("clemons", "", vec![it]);
        let body = &assemble(&req, &mailboxes())[0].body;
        assert!(body.contains("Alderman | STACKS | PS3600 | On Shelf"));
    }

    #[test]
    fn summary_response_filters_fields() {
        let raw = r#"{"availability":{"items":[{"fields":[
            {"name":"Library","value":"Alderman"},
            {"name":"Availability","value":"On Shelf"},
            {"name":"Current Location","value":"STACKS"},
            {"name":"Call Number","value":"PS3600"},
            {"name":"Barcode","value":"ignored"}]}]}}"#;
        let resp: SummaryResponse = serde_json::from_str(raw).unwrap();
        let summaries = resp.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].library, "Alderman");
        assert_eq!(summaries[0].location, "STACKS");
        assert_eq!(summaries[0].call_number, "PS3600");
        assert_eq!(summaries[0].availability, "On Shelf");
    }
}
