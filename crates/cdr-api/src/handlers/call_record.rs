//! Call record handlers
//!
//! Every route requires a bearer token; deleting additionally requires the
//! admin role. Writes are validated in full by [`CallRecordService`] before
//! anything reaches the store.

use crate::dto::{ApiResponse, CallRecordListQuery, CallRecordResponse};
use actix_web::{
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use cdr_auth::{AdminUser, AuthenticatedUser};
use cdr_core::{traits::PaginatedResponse, validation::CandidateRecord, AppError};
use cdr_services::CallRecordService;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// List call records with filtering and pagination
///
/// ```text
/// GET /cdr?start_time=2023-11-20T00:00:00Z&call_status=SUCCESS&page=1&per_page=50
/// ```
#[instrument(skip(records, query, user), fields(username = %user.username))]
pub async fn list_call_records(
    user: AuthenticatedUser,
    query: Query<CallRecordListQuery>,
    records: Data<CallRecordService>,
) -> Result<Json<PaginatedResponse<CallRecordResponse>>, AppError> {
    query.validate().map_err(|e| {
        warn!("Invalid query parameters: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let filter = query.to_filter()?;
    debug!(?filter, page = query.pagination.page, "Listing call records");

    let (rows, total) = records.list(&filter, &query.pagination.pagination()).await?;
    let data: Vec<CallRecordResponse> = rows.into_iter().map(CallRecordResponse::from).collect();

    debug!("Retrieved {} call records out of {} total", data.len(), total);

    Ok(Json(query.pagination.paginate(data, total)))
}

/// GET /cdr/{id}
#[instrument(skip(records, _user))]
pub async fn get_call_record(
    _user: AuthenticatedUser,
    path: Path<i64>,
    records: Data<CallRecordService>,
) -> Result<Json<ApiResponse<CallRecordResponse>>, AppError> {
    let stored = records.get(path.into_inner()).await?;
    Ok(Json(ApiResponse::success(stored.into())))
}

/// Create a call record
///
/// Responds 201 on success, 400 with a `fields` map when validation fails,
/// and 409 when the `call_id` is already stored.
#[instrument(skip(records, body, user), fields(username = %user.username))]
pub async fn create_call_record(
    user: AuthenticatedUser,
    body: Json<CandidateRecord>,
    records: Data<CallRecordService>,
) -> Result<HttpResponse, AppError> {
    let stored = records.create(&body).await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        CallRecordResponse::from(stored),
        "Call record created",
    )))
}

/// Replace a call record (PUT); every field is required
#[instrument(skip(records, body, user), fields(username = %user.username))]
pub async fn replace_call_record(
    user: AuthenticatedUser,
    path: Path<i64>,
    body: Json<CandidateRecord>,
    records: Data<CallRecordService>,
) -> Result<Json<ApiResponse<CallRecordResponse>>, AppError> {
    let id = path.into_inner();
    let stored = records.replace(id, &body).await?;

    info!(id, "Call record replaced");
    Ok(Json(ApiResponse::success(stored.into())))
}

/// Partially update a call record (PATCH)
///
/// Supplied fields are merged onto the stored record and the merged record
/// is validated as a whole.
#[instrument(skip(records, body, user), fields(username = %user.username))]
pub async fn patch_call_record(
    user: AuthenticatedUser,
    path: Path<i64>,
    body: Json<CandidateRecord>,
    records: Data<CallRecordService>,
) -> Result<Json<ApiResponse<CallRecordResponse>>, AppError> {
    let id = path.into_inner();
    let stored = records.patch(id, body.into_inner()).await?;

    info!(id, "Call record updated");
    Ok(Json(ApiResponse::success(stored.into())))
}

/// DELETE /cdr/{id} (admin only)
#[instrument(skip(records, admin), fields(username = %admin.username))]
pub async fn delete_call_record(
    admin: AdminUser,
    path: Path<i64>,
    records: Data<CallRecordService>,
) -> Result<HttpResponse, AppError> {
    records.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
