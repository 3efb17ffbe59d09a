//! Interpretation of the record store's human-readable replies.
//!
//! The store reports success only through message text ("alice successfully added",
//! "inserted 1 of 1 records", ...). Every check against that text lives here so the
//! matching has exactly one point of change.

use crate::{models::StoreReply, store::StoreError};

/// The result a write operation is expected to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// `add_user` created the account.
    UserAdded,
    /// An `insert` wrote exactly one record.
    InsertedOne,
    /// An `update` changed exactly one record.
    UpdatedOne,
}

impl Expectation {
    const fn marker(self) -> &'static str {
        match self {
            Expectation::UserAdded => "successfully added",
            Expectation::InsertedOne => "inserted 1 of 1 records",
            Expectation::UpdatedOne => "updated 1 of 1 records",
        }
    }
}

/// The store error message for a rejected credential.
const LOGIN_FAILED: &str = "Login failed";

/// check
///
/// Returns the reply back as `Err` when its message does not contain the expected
/// marker, so the caller can forward it untouched. A reply with no message fails.
pub fn check(expectation: Expectation, reply: StoreReply) -> Result<StoreReply, StoreReply> {
    let matched = reply
        .message
        .as_deref()
        .is_some_and(|message| message.contains(expectation.marker()));

    if matched { Ok(reply) } else { Err(reply) }
}

/// True when the store rejected a request because the credential is wrong.
pub fn is_login_failure(error: &StoreError) -> bool {
    matches!(error, StoreError::Rejected { message, .. } if message == LOGIN_FAILED)
}
