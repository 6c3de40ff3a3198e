//! Project-specific utilities live here.

use time::OffsetDateTime;

/// Calendar year in UTC, used for popularity.
pub fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}
