#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("You are not authorised to do that")]
    NotAuthorized,
}

/// The caller may only touch the user whose id matches their own.
pub fn check_ownership(path_id: u32, caller_id: u32) -> Result<(), OwnershipError> {
    if path_id != caller_id {
        return Err(OwnershipError::NotAuthorized);
    }
    Ok(())
}
