//! Course reserve grouping and validation.
//!
//! Reserve associations arrive as flat `courseID|courseName|instructor` tags
//! embedded in catalog records. Searching folds matching tags into a two-level
//! tree (instructor to courses or course to instructors); the fold accumulates
//! into hash maps, so every level is sorted afterwards to keep output
//! deterministic regardless of input record order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{contains_ci, CatalogRecord};

/// A parsed reserve tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveTag {
    pub course_id: String,
    pub course_name: String,
    pub instructor: String,
}

impl ReserveTag {
    /// Parses the pipe-delimited tag format. Tags with fewer than three
    /// fields are malformed and rejected; extra separators are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split('|').collect();
        if parts.len() < 3 {
            return None;
        }
        Some(Self {
            course_id: parts[0].to_string(),
            course_name: parts[1].to_string(),
            instructor: parts[2].to_string(),
        })
    }
}

/// A catalog record matched by a reserves search.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReserveHit {
    pub id: String,
    #[serde(rename = "title_a")]
    pub title: Vec<String>,
    #[serde(rename = "work_primary_author_a")]
    pub author: Vec<String>,
    #[serde(rename = "call_number_a")]
    pub call_number: Vec<String>,
    #[serde(rename = "reserve_id_course_name_a")]
    pub reserve_info: Vec<String>,
}

/// Fields requested from the search index for reserves searches.
pub const RESERVE_FIELDS: &str = "id,reserve_id_course_name_a,title_a,work_primary_author_a,call_number_a";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReserveSearchResponse {
    #[serde(default)]
    pub response: ReserveSearchBody,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReserveSearchBody {
    #[serde(rename = "numFound")]
    pub num_found: usize,
    pub docs: Vec<ReserveHit>,
}

/// A single title on reserve.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReserveItem {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "callNumber")]
    pub call_number: String,
}

impl ReserveItem {
    fn from_hit(hit: &ReserveHit) -> Self {
        Self {
            id: hit.id.clone(),
            title: hit.title.first().cloned().unwrap_or_default(),
            author: hit.author.join("; "),
            call_number: hit.call_number.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseItems {
    #[serde(rename = "courseName")]
    pub course_name: String,
    #[serde(rename = "courseID")]
    pub course_id: String,
    pub items: Vec<ReserveItem>,
}

#[derive(Debug, Serialize)]
pub struct InstructorGroup {
    #[serde(rename = "instructorName")]
    pub instructor_name: String,
    pub courses: Vec<CourseItems>,
}

#[derive(Debug, Serialize)]
pub struct InstructorItems {
    #[serde(rename = "instructorName")]
    pub instructor_name: String,
    pub items: Vec<ReserveItem>,
}

#[derive(Debug, Serialize)]
pub struct CourseGroup {
    #[serde(rename = "courseName")]
    pub course_name: String,
    #[serde(rename = "courseID")]
    pub course_id: String,
    pub instructors: Vec<InstructorItems>,
}

/// Groups matching tags as instructor, then courses, then items. The query is
/// a case-insensitive prefix on the instructor name.
pub fn group_by_instructor(query: &str, hits: &[ReserveHit]) -> Vec<InstructorGroup> {
    fold_tags(hits, query, |tag| {
        (
            (tag.instructor.clone(), tag.instructor.clone()),
            (tag.course_id.clone(), tag.course_name.clone()),
        )
    })
    .into_iter()
    .map(|outer| InstructorGroup {
        instructor_name: outer.label,
        courses: outer
            .inner
            .into_iter()
            .map(|inner| CourseItems {
                course_id: inner.key,
                course_name: inner.label,
                items: inner.items,
            })
            .collect(),
    })
    .collect()
}

/// Groups matching tags as course, then instructors, then items. The query is
/// a case-insensitive prefix on the course id.
pub fn group_by_course(query: &str, hits: &[ReserveHit]) -> Vec<CourseGroup> {
    fold_tags(hits, query, |tag| {
        (
            (tag.course_id.clone(), tag.course_name.clone()),
            (tag.instructor.clone(), tag.instructor.clone()),
        )
    })
    .into_iter()
    .map(|outer| CourseGroup {
        course_id: outer.key,
        course_name: outer.label,
        instructors: outer
            .inner
            .into_iter()
            .map(|inner| InstructorItems {
                instructor_name: inner.label,
                items: inner.items,
            })
            .collect(),
    })
    .collect()
}

struct OuterGroup {
    key: String,
    label: String,
    inner: Vec<InnerGroup>,
}

struct InnerGroup {
    key: String,
    label: String,
    items: Vec<ReserveItem>,
}

struct InnerAcc {
    label: String,
    seen: HashSet<String>,
    items: Vec<ReserveItem>,
}

struct OuterAcc {
    label: String,
    inner: HashMap<String, InnerAcc>,
}

/// Folds flat tags into a two-level tree keyed by (outer, inner). The select
/// function decides which tag fields form each level; the prefix filter is
/// anchored at position 0 of the outer key and matched case-insensitively. An
/// item is added to an inner group at most once even when a record carries
/// duplicate tags for the same pair.
fn fold_tags<F>(hits: &[ReserveHit], prefix: &str, select: F) -> Vec<OuterGroup>
where
    F: Fn(&ReserveTag) -> ((String, String), (String, String)),
{
    let prefix = prefix.to_lowercase();
    let mut accum: HashMap<String, OuterAcc> = HashMap::new();

    for hit in hits {
        for raw in &hit.reserve_info {
            let Some(tag) = ReserveTag::parse(raw) else {
                tracing::warn!(tag = %raw, record = %hit.id, "skipping malformed reserve tag");
                continue;
            };
            let ((outer_key, outer_label), (inner_key, inner_label)) = select(&tag);
            if !outer_key.to_lowercase().starts_with(&prefix) {
                continue;
            }

            let item = ReserveItem::from_hit(hit);
            let outer = accum.entry(outer_key).or_insert_with(|| OuterAcc {
                label: outer_label,
                inner: HashMap::new(),
            });
            let inner = outer.inner.entry(inner_key).or_insert_with(|| InnerAcc {
                label: inner_label,
                seen: HashSet::new(),
                items: Vec::new(),
            });
            if inner.seen.insert(item.id.clone()) {
                inner.items.push(item);
            }
        }
    }

    let mut out: Vec<OuterGroup> = accum
        .into_iter()
        .map(|(key, acc)| {
            let mut inner: Vec<InnerGroup> = acc
                .inner
                .into_iter()
                .map(|(ikey, iacc)| {
                    let mut items = iacc.items;
                    items.sort_by(|a, b| a.title.cmp(&b.title));
                    InnerGroup { key: ikey, label: iacc.label, items }
                })
                .collect();
            inner.sort_by(|a, b| a.key.cmp(&b.key));
            OuterGroup { key, label: acc.label, inner }
        })
        .collect();
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out
}

/// Eligibility and type flags for a single validated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResult {
    pub id: String,
    pub reserve: bool,
    pub is_video: bool,
}

/// True when the backend's classification needs a second look against the
/// catalog record.
pub fn needs_video_recheck(result: &ValidateResult) -> bool {
    !result.reserve || !result.is_video
}

/// The streaming video signal: a video pool title held as internet materials,
/// or anything sourced from Avalon.
pub fn is_streaming_video(record: &CatalogRecord) -> bool {
    (record.pool.first().map(|p| p == "video").unwrap_or(false)
        && contains_ci(&record.location, "Internet materials"))
        || contains_ci(&record.source, "Avalon")
}

/// Upgrades entries the circulation backend flagged as ineligible or
/// non-video when the catalog record shows they are streaming video. The
/// backend does not have enough information to detect these on its own.
pub fn reclassify_streaming(results: &mut [ValidateResult], records: &HashMap<String, CatalogRecord>) {
    for result in results.iter_mut() {
        if !needs_video_recheck(result) {
            continue;
        }
        if let Some(record) = records.get(&result.id) {
            if is_streaming_video(record) {
                tracing::info!(id = %result.id, "reclassified as streaming video");
                result.is_video = true;
                result.reserve = true;
            }
        }
    }
}
