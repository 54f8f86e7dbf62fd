//! Bulk CSV upload
//!
//! `POST /cdr/upload_cdr` takes a multipart form with the CSV in a `file`
//! field. The response is always the import summary; individual bad lines
//! never turn the request into an error.

use crate::dto::ApiResponse;
use actix_multipart::{Multipart, MultipartError};
use actix_web::{
    web::{Data, Query},
    HttpResponse,
};
use cdr_auth::AuthenticatedUser;
use cdr_core::{
    config::{HeaderMode, ImportConfig},
    AppError,
};
use cdr_services::CdrImporter;
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Multipart field carrying the CSV body
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// `auto`, `present` or `absent`; falls back to the configured default
    pub header: Option<String>,
}

impl UploadQuery {
    fn header_mode(&self, default: HeaderMode) -> Result<HeaderMode, AppError> {
        match self.header.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => HeaderMode::parse(raw).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "header must be one of auto, present, absent; got '{}'",
                    raw
                ))
            }),
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    warn!(error = %err, "Malformed multipart upload");
    AppError::InvalidInput(format!("Malformed multipart body: {}", err))
}

/// Read the `file` field into memory, refusing anything over `limit` bytes
///
/// Other fields are drained and ignored. Returns `None` when the form has no
/// `file` field.
async fn read_file_field(payload: &mut Multipart, limit: usize) -> Result<Option<Vec<u8>>, AppError> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "Ignoring multipart field");
            while field.try_next().await.map_err(multipart_error)?.is_some() {}
            continue;
        }

        let mut body = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if body.len() + chunk.len() > limit {
                warn!(limit, "Upload exceeds size limit");
                return Err(AppError::PayloadTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        return Ok(Some(body));
    }

    Ok(None)
}

/// Import an uploaded CSV of call records
#[instrument(skip(user, query, payload, importer, settings), fields(username = %user.username))]
pub async fn upload_cdr(
    user: AuthenticatedUser,
    query: Query<UploadQuery>,
    mut payload: Multipart,
    importer: Data<CdrImporter>,
    settings: Data<ImportConfig>,
) -> Result<HttpResponse, AppError> {
    let header_mode = query.header_mode(settings.header_mode)?;

    let body = read_file_field(&mut payload, settings.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::MissingField(format!("{} not provided", FILE_FIELD)))?;

    info!(bytes = body.len(), %header_mode, "Importing uploaded CDR file");

    let summary = importer.import(body.as_slice(), header_mode).await;
    let message = format!(
        "Imported {} of {} rows ({} failed)",
        summary.imported, summary.total_rows, summary.failed
    );

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(summary, message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_mode_from_query() {
        let query = |header: Option<&str>| UploadQuery {
            header: header.map(str::to_string),
        };

        assert_eq!(
            query(None).header_mode(HeaderMode::Present).unwrap(),
            HeaderMode::Present
        );
        assert_eq!(
            query(Some("ABSENT")).header_mode(HeaderMode::Auto).unwrap(),
            HeaderMode::Absent
        );
        assert!(matches!(
            query(Some("sometimes")).header_mode(HeaderMode::Auto),
            Err(AppError::InvalidInput(_))
        ));
    }
}
