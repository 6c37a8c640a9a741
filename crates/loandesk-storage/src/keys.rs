//! Shared key generation for storage backends.

use uuid::Uuid;

/// Storage key for a generated spreadsheet: `excel/{submission_id}/{file_name}`.
///
/// Path separators and parent-directory sequences in `file_name` are replaced so
/// the key always stays under the submission's prefix.
pub fn spreadsheet_key(submission_id: Uuid, file_name: &str) -> String {
    let safe_name = file_name.replace(['/', '\\'], "_").replace("..", "_");
    format!("excel/{}/{}", submission_id, safe_name)
}
