use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppResult},
    models::Certificate,
    services,
};

/// Serves a certificate PDF either as a download or for in-browser viewing.
fn pdf_response(file_name: &str, bytes: Vec<u8>, disposition: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/certificates/user",
    responses((status = 200, description = "Caller's certificates", body = [Certificate]))
)]
pub async fn user_certificates(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Vec<Certificate>> {
    Ok(ApiResponse::ok(
        services::certificates::user_certificates(&state, &auth).await,
    ))
}

/// enrollment_certificate
///
/// [Authenticated Route] Certificate of an enrollment. Completed enrollments that have none
/// yet get one generated on the spot.
#[utoipa::path(
    get,
    path = "/api/certificates/enrollment/{enrollment_id}",
    params(("enrollment_id" = String, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Certificate", body = Certificate),
        (status = 404, description = "Enrollment not completed", body = crate::error::ErrorBody)
    )
)]
pub async fn enrollment_certificate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> ApiResult<Certificate> {
    let certificate =
        services::certificates::certificate_for_enrollment(&state, &auth, &enrollment_id).await?;
    Ok(ApiResponse::ok(certificate))
}

#[utoipa::path(
    get,
    path = "/api/certificates/{certificate_id}",
    params(("certificate_id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate metadata", body = Certificate),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody)
    )
)]
pub async fn get_certificate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> ApiResult<Certificate> {
    let certificate = services::certificates::certificate(&state, &auth, &certificate_id).await?;
    Ok(ApiResponse::ok(certificate))
}

#[utoipa::path(
    get,
    path = "/api/certificates/download/{certificate_id}",
    params(("certificate_id" = String, Path, description = "Certificate id")),
    responses((status = 200, description = "PDF attachment", content_type = "application/pdf"))
)]
pub async fn download_certificate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> AppResult<Response> {
    let (certificate, bytes) =
        services::certificates::certificate_document(&state, &auth, &certificate_id).await?;
    Ok(pdf_response(&certificate.file_name, bytes, "attachment"))
}

#[utoipa::path(
    get,
    path = "/api/certificates/view/{certificate_id}",
    params(("certificate_id" = String, Path, description = "Certificate id")),
    responses((status = 200, description = "PDF for inline display", content_type = "application/pdf"))
)]
pub async fn view_certificate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> AppResult<Response> {
    let (certificate, bytes) =
        services::certificates::certificate_document(&state, &auth, &certificate_id).await?;
    Ok(pdf_response(&certificate.file_name, bytes, "inline"))
}
