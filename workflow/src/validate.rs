//! Submission-time payload validation.
//!
//! Out-of-range submissions are rejected *before* an Application record
//! exists — a bad payload is not a workflow state. The same checks run on
//! resubmission, since that replaces the payload wholesale.

use crate::error::{Result, WorkflowError};
use crate::types::ApplicationPayload;

/// Accepted applicant age range, inclusive.
pub const MIN_AGE: u32 = 16;
pub const MAX_AGE: u32 = 100;

/// Accepted requested funding amount, inclusive, in minor currency units.
pub const MIN_REQUESTED_AMOUNT: i64 = 100;
pub const MAX_REQUESTED_AMOUNT: i64 = 999_999;

/// Accepted declared household salary, inclusive.
pub const MIN_SALARY: i64 = 0;
pub const MAX_SALARY: i64 = 999_999_999;

/// Validate a submission payload against the fixed bounds.
pub fn validate_payload(payload: &ApplicationPayload) -> Result<()> {
    if payload.full_name.trim().is_empty() {
        return Err(WorkflowError::ValidationFailed(
            "applicant name must not be empty".to_string(),
        ));
    }
    if !(MIN_AGE..=MAX_AGE).contains(&payload.age) {
        return Err(WorkflowError::ValidationFailed(format!(
            "age {} outside accepted range {MIN_AGE}..={MAX_AGE}",
            payload.age
        )));
    }
    if !(MIN_REQUESTED_AMOUNT..=MAX_REQUESTED_AMOUNT).contains(&payload.requested_amount) {
        return Err(WorkflowError::ValidationFailed(format!(
            "requested amount {} outside accepted range \
             {MIN_REQUESTED_AMOUNT}..={MAX_REQUESTED_AMOUNT}",
            payload.requested_amount
        )));
    }
    if !(MIN_SALARY..=MAX_SALARY).contains(&payload.household_salary) {
        return Err(WorkflowError::ValidationFailed(format!(
            "household salary {} outside accepted range {MIN_SALARY}..={MAX_SALARY}",
            payload.household_salary
        )));
    }
    Ok(())
}
