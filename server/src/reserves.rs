//! Course reserves endpoints: search, validation and request creation.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use availability_core::notify::{assemble, AvailabilitySummary, ReserveRequest, SummaryResponse};
use availability_core::reserves::{
    group_by_course, group_by_instructor, needs_video_recheck, reclassify_streaming,
    ReserveSearchResponse, ValidateResult, RESERVE_FIELDS,
};

use crate::auth::Auth;
use crate::availability::fetch_catalog_record;
use crate::error::ServiceError;
use crate::SharedContext;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub search_type: String,
    #[serde(default)]
    pub query: String,
}

pub async fn search_reserves(
    State(svc): State<SharedContext>,
    auth: Auth,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    if params.search_type != "instructor_name" && params.search_type != "course_id" {
        tracing::error!(search_type = %params.search_type, "invalid course reserves search type");
        return Err(ServiceError::BadRequest(format!(
            "{} is not a valid search type",
            params.search_type
        )));
    }
    tracing::info!(
        user = %auth.claims.user_id,
        search_type = %params.search_type,
        query = %params.query,
        "searching course reserves"
    );

    let mut query_str = params.query.clone();
    if !query_str.contains('*') {
        query_str.push('*');
    }
    let solr_query = if params.search_type == "instructor_name" {
        format!("reserve_instructor_tl:{query_str}")
    } else {
        // Course ids are upper case in the index; force the query to match
        // and escape embedded spaces.
        format!("reserve_id_a:{}", query_str.to_uppercase().replace(' ', "\\ "))
    };

    let resp = match svc
        .clients
        .solr_select(&[("fl", RESERVE_FIELDS), ("q", solr_query.as_str()), ("rows", "5000")])
        .await
    {
        Ok(body) => serde_json::from_slice::<ReserveSearchResponse>(&body).unwrap_or_else(|err| {
            tracing::error!(%err, "unable to parse reserves search response");
            ReserveSearchResponse::default()
        }),
        Err(err) => {
            tracing::error!(status = err.status, message = %err.message, "reserves search failed");
            ReserveSearchResponse::default()
        }
    };
    tracing::info!(matches = resp.response.num_found, "reserves search complete");

    // The raw query (without the appended wildcard) anchors the prefix filter.
    let groups = if params.search_type == "instructor_name" {
        serde_json::to_value(group_by_instructor(&params.query, &resp.response.docs))
    } else {
        serde_json::to_value(group_by_course(&params.query, &resp.response.docs))
    };
    groups
        .map(Json)
        .map_err(|err| ServiceError::Internal(err.to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub items: Vec<String>,
}

pub async fn validate_reserves(
    State(svc): State<SharedContext>,
    auth: Auth,
    body: Bytes,
) -> Result<Json<Vec<ValidateResult>>, ServiceError> {
    let req: ValidateRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(%err, "unable to parse validate request");
        ServiceError::BadRequest(err.to_string())
    })?;
    tracing::info!(items = ?req.items, "validate course reserve items");

    let body = svc
        .clients
        .ils_post("v4/course_reserves/validate", &req, &auth.token)
        .await?;
    let mut results: Vec<ValidateResult> = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(%err, "unable to parse reserve validation response");
        ServiceError::Internal(err.to_string())
    })?;

    // The circulation backend under-detects streaming video; re-check any
    // entry it rejected against the catalog record.
    if auth.claims.can_place_reserve {
        tracing::info!("checking flagged items for streaming video");
        let mut records = HashMap::new();
        for result in results.iter().filter(|r| needs_video_recheck(r)) {
            let record = fetch_catalog_record(&svc, &result.id).await;
            records.insert(result.id.clone(), record);
        }
        reclassify_streaming(&mut results, &records);
    }

    Ok(Json(results))
}

pub async fn create_reserves(
    State(svc): State<SharedContext>,
    auth: Auth,
    body: Bytes,
) -> Result<&'static str, ServiceError> {
    let mut req: ReserveRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(%err, "unable to parse reserve request");
        ServiceError::BadRequest(err.to_string())
    })?;
    tracing::info!(user = %req.user_id, items = req.items.len(), "received course reserves request");

    for item in req.items.iter_mut() {
        item.virgo_url = format!(
            "{}/sources/{}/items/{}",
            svc.config.virgo_url, item.pool, item.catalog_key
        );
        item.availability = fetch_item_summary(&svc, &item.catalog_key, &auth.token).await;
    }

    let messages = assemble(&req, &svc.mailboxes());
    for message in &messages {
        svc.mailer.send(message).await.map_err(|err| {
            tracing::error!(%err, "unable to send reserve email");
            ServiceError::Internal(err.to_string())
        })?;
    }

    Ok("Reserve emails sent")
}

/// Pulls the lightweight availability summary for a requested item. Failures
/// leave the summary empty; the request still goes out.
async fn fetch_item_summary(
    svc: &SharedContext,
    catalog_key: &str,
    jwt: &str,
) -> Vec<AvailabilitySummary> {
    tracing::info!(%catalog_key, "checking reserve item availability");
    let body = match svc.clients.ils_get(&format!("availability/{catalog_key}"), jwt).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(%catalog_key, status = err.status, message = %err.message, "unable to get availability for reserve item");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<SummaryResponse>(&body) {
        Ok(resp) => resp.summaries(),
        Err(err) => {
            tracing::warn!(%catalog_key, %err, "invalid availability payload for reserve item");
            Vec::new()
        }
    }
}
