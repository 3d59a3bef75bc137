//! Expense record management for the expense tracking application.
//!
//! This module contains everything related to expense records:
//! - The `ExpenseRecord` model and date normalization for submissions
//! - Database functions for storing and querying records
//! - The HTTP endpoints for submitting and listing records

pub(crate) mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{
    ExpenseRecord, NewExpenseRecord, canonical_date_string, create_record, create_record_table,
    get_recent_records, normalize_submission_date,
};
pub use create_endpoint::{RecordData, RecordForm, create_record_endpoint};
pub use list_endpoint::{ListedRecord, list_records_endpoint};

#[cfg(test)]
pub use core::{count_records, get_records_by_user};
