use thiserror::Error;

use crate::error::StoreError;
use crate::range::CellRef;
use crate::store::SheetStore;

const EMAIL_COLUMN: u16 = 1;
const FIRST_NAME_COLUMN: u16 = 2;
const LAST_NAME_COLUMN: u16 = 3;
/// Row 1 of the roster is the header
const FIRST_DATA_ROW: u32 = 2;

/// A roster member who passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// Submitted email, trimmed and lower-cased
    pub email: String,

    /// "First Last" as stored in the roster
    pub full_name: String,
}

/// Why verification did not grant access
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Email is required.")]
    MissingInput,

    #[error("Email not found or unauthorized.")]
    PermissionDenied,

    #[error("roster lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    /// Message shown to the person at the landing page
    ///
    /// Store failures are reported generically; the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::Store(_) => {
                "An error occurred while verifying your email. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Look an email up in the roster worksheet
///
/// Blank input is rejected before any remote call. The email column is read
/// once and compared case-insensitively; on a match the first and last name
/// cells of that row are read to build the display name.
pub async fn verify(
    store: &dyn SheetStore,
    roster_sheet: &str,
    email: &str,
) -> Result<Verified, VerifyError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(VerifyError::MissingInput);
    }

    let column = store.column_values(roster_sheet, EMAIL_COLUMN).await?;
    let index = column
        .iter()
        .skip(1)
        .position(|candidate| candidate.trim().to_lowercase() == email)
        .ok_or(VerifyError::PermissionDenied)?;
    let row = FIRST_DATA_ROW + index as u32;

    let first = store
        .cell_value(roster_sheet, CellRef::new(FIRST_NAME_COLUMN, row))
        .await?
        .unwrap_or_default();
    let last = store
        .cell_value(roster_sheet, CellRef::new(LAST_NAME_COLUMN, row))
        .await?
        .unwrap_or_default();

    Ok(Verified {
        email,
        full_name: format!("{} {}", first, last),
    })
}
