pub(crate) mod extractors;
mod ownership;

pub use extractors::{extract_caller_id, AuthError, CallerId, USER_ID_HEADER};
pub use ownership::{check_ownership, OwnershipError};
