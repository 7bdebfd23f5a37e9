pub mod episodes;
pub mod shows;

use showrunner_core::ShowId;

use crate::DbError;

/// SQLite integers are signed, so ids above [`crate::MAX_SERIES_ID`] are refused.
pub(crate) fn series_id(id: ShowId) -> Result<i64, DbError> {
    i64::try_from(id.id).map_err(|_| DbError::IdOutOfRange(id))
}
