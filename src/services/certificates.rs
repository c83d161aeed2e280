use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{Certificate, Course, Enrollment, EnrollmentStatus, User},
    pdf::{Font, PdfPage},
    services::{courses::course_not_found, progress::owned_enrollment},
    storage::StorageError,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";
// Certificate numbers are random; retry a few times on the unlikely collision.
const NUMBER_ATTEMPTS: usize = 5;

fn certificate_not_found() -> AppError {
    AppError::not_found("CERTIFICATE_NOT_FOUND", "Certificate not found")
}

fn certificate_number(now: DateTime<Utc>) -> String {
    let serial: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    format!("CERT-{}-{}", now.year(), serial)
}

fn object_key(state: &AppState, file_name: &str) -> String {
    format!(
        "{}/{}",
        state.config.certificate_storage_path.trim_end_matches('/'),
        file_name
    )
}

fn ensure_owner(caller: &AuthUser, certificate: &Certificate) -> AppResult<()> {
    if certificate.user_id == caller.id || caller.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %caller.id, certificate_id = %certificate.certificate_id, "certificate access denied");
        Err(AppError::forbidden(
            "UNAUTHORIZED",
            "You are not authorized to access this certificate",
        ))
    }
}

/// render_certificate
///
/// Lays out the single-page completion certificate.
pub fn render_certificate(
    student_name: &str,
    course_title: &str,
    certificate_number: &str,
    completed_on: DateTime<Utc>,
    instructor_name: &str,
) -> Vec<u8> {
    let top = PdfPage::height();
    PdfPage::new()
        .with_border()
        .centered(top - 120.0, 34.0, Font::Bold, "CERTIFICATE OF COMPLETION")
        .centered(top - 180.0, 16.0, Font::Regular, "This is to certify that")
        .centered(top - 230.0, 28.0, Font::Bold, student_name)
        .centered(top - 280.0, 16.0, Font::Regular, "has successfully completed the course")
        .centered(top - 325.0, 22.0, Font::Bold, course_title)
        .centered(
            top - 400.0,
            12.0,
            Font::Regular,
            &format!("Certificate Number: {certificate_number}"),
        )
        .centered(
            top - 420.0,
            12.0,
            Font::Regular,
            &format!("Completion Date: {}", completed_on.format("%B %d, %Y")),
        )
        .centered(
            top - 440.0,
            12.0,
            Font::Regular,
            &format!("Instructor: {instructor_name}"),
        )
        .to_bytes()
}

fn display_name(user: &User) -> String {
    let full = user.full_name();
    if full.is_empty() { user.user_name.clone() } else { full }
}

async fn certificate_parties(state: &AppState, enrollment: &Enrollment) -> AppResult<(User, Course, String)> {
    let student = state
        .repo
        .get_user(&enrollment.user_id)
        .await
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))?;
    let course = state
        .repo
        .get_course(&enrollment.course_id)
        .await
        .ok_or_else(course_not_found)?;
    let instructor = state
        .repo
        .get_user(&course.instructor_id)
        .await
        .map(|u| display_name(&u))
        .unwrap_or_else(|| "Course Instructor".to_string());
    Ok((student, course, instructor))
}

/// issue_certificate
///
/// Idempotent: an enrollment that already has a certificate gets the existing one back.
/// The enrollment must be COMPLETED.
pub async fn issue_certificate(state: &AppState, enrollment: &Enrollment) -> AppResult<Certificate> {
    if let Some(existing) = state
        .repo
        .get_certificate_by_enrollment(&enrollment.enrollment_id)
        .await
    {
        return Ok(existing);
    }
    if enrollment.status != EnrollmentStatus::Completed {
        return Err(AppError::bad_request(
            "COURSE_NOT_COMPLETED",
            "Course must be completed before a certificate is issued",
        ));
    }

    let (student, course, instructor) = certificate_parties(state, enrollment).await?;
    let now = Utc::now();
    let completed_on = enrollment.completed_at.unwrap_or(now);
    let file_name = format!(
        "certificate_{}_{}.pdf",
        enrollment.enrollment_id,
        now.format("%Y%m%d_%H%M%S")
    );

    for _ in 0..NUMBER_ATTEMPTS {
        let number = certificate_number(now);
        let document = render_certificate(
            &display_name(&student),
            &course.title,
            &number,
            completed_on,
            &instructor,
        );
        state
            .storage
            .put_object(&object_key(state, &file_name), document, PDF_CONTENT_TYPE)
            .await?;

        let certificate_id = ids::new_id(ids::CERTIFICATE);
        let certificate = Certificate {
            certificate_url: format!("/api/certificates/download/{certificate_id}"),
            certificate_id,
            enrollment_id: enrollment.enrollment_id.clone(),
            user_id: enrollment.user_id.clone(),
            course_id: enrollment.course_id.clone(),
            certificate_number: number,
            file_name: file_name.clone(),
            issued_at: now,
        };

        if let Some(created) = state.repo.create_certificate(certificate).await {
            tracing::info!(
                certificate_id = %created.certificate_id,
                enrollment_id = %enrollment.enrollment_id,
                "certificate issued"
            );
            return Ok(created);
        }

        // A concurrent request may have issued it in the meantime.
        if let Some(existing) = state
            .repo
            .get_certificate_by_enrollment(&enrollment.enrollment_id)
            .await
        {
            return Ok(existing);
        }
    }

    Err(AppError::persistence("certificate"))
}

pub async fn user_certificates(state: &AppState, caller: &AuthUser) -> Vec<Certificate> {
    state.repo.list_user_certificates(&caller.id).await
}

/// certificate_for_enrollment
///
/// Generates the certificate on first request when the enrollment is completed.
pub async fn certificate_for_enrollment(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
) -> AppResult<Certificate> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    if let Some(existing) = state.repo.get_certificate_by_enrollment(enrollment_id).await {
        return Ok(existing);
    }
    if enrollment.status != EnrollmentStatus::Completed {
        return Err(certificate_not_found());
    }
    issue_certificate(state, &enrollment).await
}

pub async fn certificate(state: &AppState, caller: &AuthUser, certificate_id: &str) -> AppResult<Certificate> {
    let certificate = state
        .repo
        .get_certificate(certificate_id)
        .await
        .ok_or_else(certificate_not_found)?;
    ensure_owner(caller, &certificate)?;
    Ok(certificate)
}

/// certificate_document
///
/// Returns the stored PDF. A document missing from storage is rendered again from the
/// certificate record and written back.
pub async fn certificate_document(
    state: &AppState,
    caller: &AuthUser,
    certificate_id: &str,
) -> AppResult<(Certificate, Vec<u8>)> {
    let certificate = certificate(state, caller, certificate_id).await?;
    let key = object_key(state, &certificate.file_name);

    match state.storage.get_object(&key).await {
        Ok(bytes) => Ok((certificate, bytes)),
        Err(StorageError::NotFound(_)) => {
            tracing::warn!(certificate_id = %certificate_id, "certificate document missing, regenerating");
            let enrollment = state
                .repo
                .get_enrollment(&certificate.enrollment_id)
                .await
                .ok_or_else(certificate_not_found)?;
            let (student, course, instructor) = certificate_parties(state, &enrollment).await?;
            let document = render_certificate(
                &display_name(&student),
                &course.title,
                &certificate.certificate_number,
                enrollment.completed_at.unwrap_or(certificate.issued_at),
                &instructor,
            );
            state
                .storage
                .put_object(&key, document.clone(), PDF_CONTENT_TYPE)
                .await?;
            Ok((certificate, document))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn certificate_numbers_carry_year_and_six_digits() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let number = certificate_number(now);
        let (prefix, serial) = number.rsplit_once('-').unwrap();
        assert_eq!(prefix, "CERT-2025");
        assert_eq!(serial.len(), 6);
        assert!(serial.parse::<u32>().unwrap() >= 100_000);
    }

    #[test]
    fn rendered_certificate_contains_the_details() {
        let when = Utc.with_ymd_and_hms(2025, 1, 5, 9, 30, 0).unwrap();
        let pdf = render_certificate("Ada Lovelace", "Rust 101", "CERT-2025-123456", when, "Grace Hopper");
        let text = String::from_utf8(pdf).unwrap();

        assert!(text.contains("(CERTIFICATE OF COMPLETION)"));
        assert!(text.contains("(Ada Lovelace)"));
        assert!(text.contains("(Rust 101)"));
        assert!(text.contains("Certificate Number: CERT-2025-123456"));
        assert!(text.contains("Completion Date: January 05, 2025"));
        assert!(text.contains("Instructor: Grace Hopper"));
    }
}
