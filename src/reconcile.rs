//! Reconciles fresh timestamps against the previously published feed.
//!
//! An episode's activity date in the export can move between runs, typically
//! when playback resumes. Once a date has been published in the live feed it
//! should stay put, so the shortlist is joined by guid against the previous
//! feed and differing timestamps are overwritten with the published value.
//! This is a pure timestamp merge: it never adds, removes, or otherwise
//! alters episodes.

use std::collections::HashMap;

use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::episode::{chronological, Episode, TIMESTAMP_FORMAT};

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

/// Merges previously published timestamps into `shortlist`.
///
/// Fetches the live feed at `feed_url` (one attempt, no retries) and
/// overwrites the timestamp of every shortlist episode whose guid was
/// already published with a different date. If anything changed, the list is
/// re-sorted most recent first; otherwise the order is untouched.
///
/// The previous feed being unreachable or unreadable is a degraded case, not
/// a failure: the shortlist is returned unchanged and a warning is logged.
pub async fn reconcile(
    shortlist: Vec<Episode>,
    feed_url: &str,
    client: &reqwest::Client,
) -> Vec<Episode> {
    let body = match fetch_previous(feed_url, client).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(url = feed_url, error = %e, "Previous feed unavailable, skipping reconciliation");
            return shortlist;
        }
    };

    let published = match published_dates(&body) {
        Ok(dates) => dates,
        Err(e) => {
            tracing::warn!(url = feed_url, error = %e, "Previous feed unreadable, skipping reconciliation");
            return shortlist;
        }
    };

    apply(shortlist, &published)
}

async fn fetch_previous(url: &str, client: &reqwest::Client) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }
    Ok(response.text().await?)
}

/// Recovers `guid` → published date pairs from a feed document.
///
/// Dates are returned in the compact-offset ISO form used by episode
/// timestamps, keeping the published offset verbatim. Items with a missing
/// or unparseable guid/pubDate are ignored.
pub fn published_dates(body: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    enum ItemField {
        Guid,
        PubDate,
    }

    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut dates = HashMap::new();
    let mut buf = Vec::new();
    let mut in_item = false;
    let mut field: Option<ItemField> = None;
    let mut guid: Option<String> = None;
    let mut pub_date: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => {
                    in_item = true;
                    guid = None;
                    pub_date = None;
                }
                b"guid" if in_item => field = Some(ItemField::Guid),
                b"pubDate" if in_item => field = Some(ItemField::PubDate),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(f) = &field {
                    let text = t.unescape()?.into_owned();
                    match f {
                        ItemField::Guid => guid = Some(text),
                        ItemField::PubDate => pub_date = Some(text),
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"guid" | b"pubDate" => field = None,
                b"item" => {
                    in_item = false;
                    match (guid.take(), pub_date.take()) {
                        (Some(g), Some(d)) => match compact_iso(&d) {
                            Ok(iso) => {
                                dates.insert(g, iso);
                            }
                            Err(e) => {
                                tracing::debug!(guid = %g, error = %e, "Unparseable pubDate in previous feed, ignoring item");
                            }
                        },
                        _ => {
                            tracing::debug!("Previous feed item missing guid or pubDate, ignoring");
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(dates)
}

/// Converts an RFC-822 `pubDate` to compact-offset ISO form.
///
/// The weekday name is presentation only and is not validated against the
/// date: parsing starts after the comma, so a mislabeled weekday cannot
/// reject an otherwise usable published date.
fn compact_iso(pub_date: &str) -> Result<String, chrono::ParseError> {
    let datepart = pub_date
        .split_once(", ")
        .map(|(_, rest)| rest)
        .unwrap_or(pub_date);
    let parsed = DateTime::parse_from_str(datepart, "%d %b %Y %H:%M:%S %z")?;
    Ok(parsed.format(TIMESTAMP_FORMAT).to_string())
}

fn apply(shortlist: Vec<Episode>, published: &HashMap<String, String>) -> Vec<Episode> {
    let mut changed = false;
    let mut merged: Vec<Episode> = shortlist
        .into_iter()
        .map(|episode| match published.get(&episode.guid) {
            Some(prev) if episode.normalized_timestamp() != prev.as_str() => {
                tracing::debug!(
                    guid = %episode.guid,
                    from = %episode.timestamp,
                    to = %prev,
                    "Restoring published timestamp"
                );
                changed = true;
                Episode {
                    timestamp: prev.clone(),
                    ..episode
                }
            }
            _ => episode,
        })
        .collect();

    if changed {
        merged.sort_by(|a, b| chronological(b, a));
    }
    merged
}
