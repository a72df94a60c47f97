//! Wire Models
//!
//! Request/response shapes for the four gather operations, with boundary
//! validation. Validation always happens before any upstream call.

pub mod batch;
pub mod context;
pub mod coverage;
pub mod duplicates;

use crate::utils::error::{AppError, AppResult};

/// Validate a project identifier: 24 hexadecimal characters
/// (MongoDB ObjectId format, assigned by the upstream content system).
pub fn validate_project_id(project_id: &str) -> AppResult<()> {
    if project_id.len() != 24 {
        return Err(AppError::validation(format!(
            "projectId must be 24 characters, got {}",
            project_id.len()
        )));
    }
    if !project_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation(
            "projectId must be a valid hex string",
        ));
    }
    Ok(())
}
