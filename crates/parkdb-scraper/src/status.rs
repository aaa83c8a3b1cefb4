//! Occupancy status derivation for one observation.

use parkdb_core::LotStatus;

use crate::normalize::{parse_vacancy_bucket, UnknownBucketError};

/// Derived status plus the free-space estimate, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub status: LotStatus,
    pub num_free: Option<u32>,
    /// Vacancy text that matched no bucket. An `open` observation already
    /// records it as `error`; a `nodata` one must be rejected by the caller.
    pub unrecognized: Option<UnknownBucketError>,
}

/// Derives the status of an observation.
///
/// Starts at `nodata`; `valid_data` moves it to `open`; `open` without a
/// recognized vacancy bucket ends in `error` with no free count. There is no
/// way out of `error`. A recognized bucket sets `num_free` even when the
/// source does not flag the data as valid. Unknown vacancy text is returned
/// in [`Occupancy::unrecognized`] whatever the status.
#[must_use]
pub fn derive_occupancy(
    valid_data: bool,
    vacancy_text: Option<&str>,
    buckets: &[(&str, u32)],
) -> Occupancy {
    let mut status = LotStatus::Nodata;
    if valid_data {
        status = LotStatus::Open;
    }

    let text = vacancy_text.map(str::trim).filter(|t| !t.is_empty());
    let (num_free, unrecognized) = match text.map(|t| parse_vacancy_bucket(t, buckets)) {
        Some(Ok(num_free)) => (Some(num_free), None),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "vacancy text not in bucket table");
            (None, Some(err))
        }
        None => (None, None),
    };

    if status == LotStatus::Open && num_free.is_none() {
        status = LotStatus::Error;
    }

    Occupancy {
        status,
        num_free,
        unrecognized,
    }
}
