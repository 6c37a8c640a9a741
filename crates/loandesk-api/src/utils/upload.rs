//! Multipart parsing for document submissions.

use axum::extract::Multipart;
use loandesk_core::models::ApplicantDetails;
use loandesk_core::AppError;
use loandesk_services::UploadedFile;

/// Limits applied while the body is read.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub max_files: usize,
}

/// Everything a submission form carries.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub applicant: ApplicantDetails,
    pub files: Vec<UploadedFile>,
}

impl SubmissionForm {
    /// Names of required text fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.applicant.user_id.trim().is_empty() {
            missing.push("userId");
        }
        if self.applicant.full_name.trim().is_empty() {
            missing.push("fullName");
        }
        missing
    }
}

/// Read every part: parts with a filename are files, the rest are text
/// fields. Unknown text fields are ignored, and so are file parts with an
/// empty filename (an `<input type="file">` left blank).
pub async fn read_submission_form(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            if file_name.trim().is_empty() {
                tracing::debug!(field = field.name().unwrap_or_default(), "Skipping file part without a filename");
                continue;
            }
            if form.files.len() >= limits.max_files {
                return Err(AppError::PayloadTooLarge(format!(
                    "At most {} files may be submitted at once",
                    limits.max_files
                )));
            }
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;
            validate_file_size(&file_name, data.len(), limits.max_file_size)?;

            form.files.push(UploadedFile {
                file_name,
                content_type,
                data,
            });
            continue;
        }

        let name = field.name().unwrap_or_default().to_string();
        let value = field
            .text()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read field {}: {}", name, e)))?;
        set_text_field(&mut form.applicant, &name, value);
    }

    Ok(form)
}

fn set_text_field(applicant: &mut ApplicantDetails, name: &str, value: String) {
    let value = value.trim().to_string();
    match name {
        "userId" => applicant.user_id = value,
        "loanType" => applicant.loan_type = value,
        "fullName" => applicant.full_name = value,
        "permanentAddress" => applicant.permanent_address = value,
        "currentAddress" => applicant.current_address = value,
        other => tracing::debug!(field = other, "Ignoring unknown form field"),
    }
}

pub fn validate_file_size(file_name: &str, file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "{} exceeds the maximum allowed size of {} MB",
            file_name,
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size("a.pdf", 10, 10).is_ok());
        let err = validate_file_size("a.pdf", 11 * 1024 * 1024, 10 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(ref m) if m.contains("10 MB")));
    }

    #[test]
    fn test_text_fields_map_to_applicant() {
        let mut applicant = ApplicantDetails::default();
        set_text_field(&mut applicant, "userId", " u-1 ".into());
        set_text_field(&mut applicant, "fullName", "Jane Roe".into());
        set_text_field(&mut applicant, "nickname", "JR".into());

        assert_eq!(applicant.user_id, "u-1");
        assert_eq!(applicant.full_name, "Jane Roe");
    }

    #[test]
    fn test_missing_fields() {
        let mut form = SubmissionForm::default();
        assert_eq!(form.missing_fields(), vec!["userId", "fullName"]);
        form.applicant.user_id = "u".into();
        assert_eq!(form.missing_fields(), vec!["fullName"]);
    }
}
