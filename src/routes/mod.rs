/// Router Module Index
///
/// Routing split by access requirement, so the token check is applied once per
/// module rather than per handler.

/// Routes accessible without a credential.
pub mod public;

/// Routes that require the `hdb-token` header.
pub mod authenticated;
