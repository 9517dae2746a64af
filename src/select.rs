//! Orders candidate episodes and trims them to the published shortlist.

use thiserror::Error;

use crate::episode::{chronological, Episode};

/// Maximum number of items the published feed carries.
pub const MAX_FEED_ITEMS: usize = 20;

/// Errors that can occur during selection.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The export produced no qualifying listening activity at all.
    #[error("no listening activity found in the export")]
    NoActivity,
}

/// Turns the unordered candidate list into the feed shortlist.
///
/// Sorts most recent first (stable, so ties keep extraction order), then
/// drops the single newest episode if it was only partially heard, then caps
/// the list at [`MAX_FEED_ITEMS`]. A partial listen at the very top tends to
/// reappear with an updated timestamp on the next run; leaving it out keeps
/// transient entries out of the published feed. Partial episodes further
/// down the list are kept.
///
/// # Errors
///
/// Returns [`SelectError::NoActivity`] when the candidate list is empty, so
/// the caller surfaces an empty source document instead of publishing an
/// empty feed.
pub fn select_recent(mut candidates: Vec<Episode>) -> Result<Vec<Episode>, SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::NoActivity);
    }

    candidates.sort_by(|a, b| chronological(b, a));

    if candidates[0].partial {
        candidates.remove(0);
    }

    candidates.truncate(MAX_FEED_ITEMS);
    Ok(candidates)
}
