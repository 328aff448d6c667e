//! Item availability endpoint: inventory snapshot + catalog record through
//! the decoration pipeline.

use axum::extract::{Path, State};
use axum::Json;

use availability_core::model::{catalog_field_list, AvailabilityResponse, CatalogRecord, SolrResponse};
use availability_core::pipeline::{decorate, PipelineContext};

use crate::auth::Auth;
use crate::error::ServiceError;
use crate::SharedContext;

pub async fn get_availability(
    State(svc): State<SharedContext>,
    auth: Auth,
    Path(id): Path<String>,
) -> Result<Json<AvailabilityResponse>, ServiceError> {
    tracing::info!(title_id = %id, "getting availability");

    let mut response = match svc.clients.ils_get(&format!("v4/availability/{id}"), &auth.token).await {
        Ok(body) => serde_json::from_slice::<AvailabilityResponse>(&body).unwrap_or_else(|err| {
            // Titles managed outside the circulation system may still have
            // availability from the catalog alone.
            tracing::info!(title_id = %id, %err, "no usable inventory payload, starting empty");
            AvailabilityResponse::default()
        }),
        Err(err) if err.is_not_found() => AvailabilityResponse::default(),
        Err(err) if err.status == 503 => {
            tracing::error!(title_id = %id, "circulation backend is offline");
            return Err(ServiceError::Upstream {
                status: err.status,
                message: "Availability information is currently unavailable. Please try again later."
                    .to_string(),
            });
        }
        Err(err) => {
            tracing::error!(title_id = %id, status = err.status, message = %err.message, "inventory lookup failed");
            return Err(ServiceError::Upstream {
                status: err.status,
                message: "There was a problem retrieving availability. Please try again later."
                    .to_string(),
            });
        }
    };

    let record = fetch_catalog_record(&svc, &id).await;
    let caller = auth.caller();
    let ctx = PipelineContext {
        title_id: &id,
        record: &record,
        caller: &caller,
        maps: &svc.maps,
        hsl_illiad_url: &svc.config.hsl_illiad_url,
    };
    decorate(&mut response.availability, &ctx);

    Ok(Json(response))
}

/// Best-effort catalog record lookup. Anomalies (request failure, undecodable
/// payload, zero or multiple matches) are logged and degrade to a default
/// record so availability still renders.
pub(crate) async fn fetch_catalog_record(svc: &SharedContext, id: &str) -> CatalogRecord {
    let fields = catalog_field_list();
    let query = format!("id:{id}");
    let body = match svc
        .clients
        .solr_select(&[("fl", fields.as_str()), ("q", query.as_str())])
        .await
    {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(%id, status = err.status, message = %err.message, "catalog record request failed");
            return CatalogRecord::default();
        }
    };

    let resp: SolrResponse = match serde_json::from_slice(&body) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(%id, %err, "unable to parse catalog response");
            return CatalogRecord::default();
        }
    };
    if resp.response.num_found != 1 {
        tracing::error!(%id, num_found = resp.response.num_found, "expected exactly one catalog record");
    }
    // Degrade to the first match (or an empty record) rather than failing the
    // request over a catalog irregularity.
    resp.response.docs.into_iter().next().unwrap_or_default()
}
