//! Publishes an RSS activity feed from an Overcast listening-history export.
//!
//! The pipeline is strictly sequential: download the OPML export (or reuse
//! the cached copy), extract the listening events that count as activity,
//! order and trim them, reconcile timestamps against the previously
//! published feed so already-seen items do not reshuffle, and write the
//! result as RSS 2.0.

pub mod cache;
pub mod config;
pub mod episode;
pub mod feed;
pub mod opml;
pub mod overcast;
pub mod reconcile;
pub mod select;
mod util;
