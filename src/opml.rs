//! Extracts listening activity from the Overcast OPML export.
//!
//! Subscriptions are `<outline type="rss">` nodes; the episodes nested under
//! them carry playback markers as attributes. Each episode's markers are
//! decoded once into a [`PlaybackState`], and the activity predicate decides
//! from that whether the episode enters the candidate list.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::episode::Episode;

/// Seconds of listening above which an in-progress episode counts as
/// activity (7 minutes).
const MIN_PROGRESS_SECS: u32 = 7 * 60;

/// Errors that can occur while parsing the export.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Playback status of one episode outline, decoded once at the parse
/// boundary.
///
/// Marker precedence follows the export's conventions: a `played` attribute
/// wins over `progress`, which wins over `userDeleted`. An episode with none
/// of the markers (or an unreadable `progress` value) is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackState {
    /// Listened to completion.
    Played,
    /// Partially heard, with the number of seconds listened.
    InProgress(u32),
    /// Deleted by the user without being played.
    Deleted,
    /// None of the markers present.
    Unknown,
}

/// Raw attributes of one `<outline>` element.
#[derive(Debug, Default)]
struct OutlineAttrs {
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    guid: Option<String>,
    updated: Option<String>,
    episode_id: Option<String>,
    played: bool,
    progress: Option<String>,
    deleted: bool,
}

impl OutlineAttrs {
    fn read(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Self, OpmlError> {
        let mut attrs = Self::default();
        for attr_result in e.attributes() {
            let attr = match attr_result {
                Ok(attr) => attr,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed outline attribute");
                    continue;
                }
            };
            let decoder = reader.decoder();
            match attr.key.as_ref() {
                b"type" => attrs.kind = Some(attr.decode_and_unescape_value(decoder)?.to_string()),
                b"title" => attrs.title = Some(attr.decode_and_unescape_value(decoder)?.to_string()),
                b"url" => attrs.url = Some(attr.decode_and_unescape_value(decoder)?.to_string()),
                b"overcastUrl" => {
                    attrs.guid = Some(attr.decode_and_unescape_value(decoder)?.to_string())
                }
                b"userUpdatedDate" => {
                    attrs.updated = Some(attr.decode_and_unescape_value(decoder)?.to_string())
                }
                b"overcastId" => {
                    attrs.episode_id = Some(attr.decode_and_unescape_value(decoder)?.to_string())
                }
                b"played" => attrs.played = true,
                b"progress" => {
                    attrs.progress = Some(attr.decode_and_unescape_value(decoder)?.to_string())
                }
                b"userDeleted" => attrs.deleted = true,
                _ => {}
            }
        }
        Ok(attrs)
    }

    fn playback_state(&self) -> PlaybackState {
        if self.played {
            return PlaybackState::Played;
        }
        if let Some(raw) = &self.progress {
            return match raw.parse::<u32>() {
                Ok(secs) => PlaybackState::InProgress(secs),
                Err(_) => PlaybackState::Unknown,
            };
        }
        if self.deleted {
            PlaybackState::Deleted
        } else {
            PlaybackState::Unknown
        }
    }
}

/// Walks the export and returns the unordered candidate list of episodes
/// that count as listening activity.
///
/// Played episodes always qualify; in-progress episodes qualify once more
/// than seven minutes have been heard; deleted episodes are dropped
/// silently. An episode in none of those states is dropped with a warning
/// naming its id and title, since that is an unclassified state worth
/// surfacing to the operator.
///
/// # Errors
///
/// Returns an error if the document is not well-formed XML. Individual
/// episodes with missing attributes are skipped with a warning instead.
pub fn extract_episodes(content: &str) -> Result<Vec<Episode>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut episodes = Vec::new();
    let mut buf = Vec::new();
    // One entry per open <outline>; the innermost Some(..) is the
    // subscription the current episode outlines belong to.
    let mut scopes: Vec<Option<String>> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                let outline = OutlineAttrs::read(&e, &reader)?;
                match outline.kind.as_deref() {
                    Some("rss") => scopes.push(outline.title),
                    Some("podcast-episode") => {
                        if let Some(ep) = build_episode(outline, subscription(&scopes)) {
                            episodes.push(ep);
                        }
                        scopes.push(None);
                    }
                    _ => scopes.push(None),
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                let outline = OutlineAttrs::read(&e, &reader)?;
                if outline.kind.as_deref() == Some("podcast-episode") {
                    if let Some(ep) = build_episode(outline, subscription(&scopes)) {
                        episodes.push(ep);
                    }
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                scopes.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(episodes)
}

fn subscription(scopes: &[Option<String>]) -> Option<&str> {
    scopes.iter().rev().find_map(|title| title.as_deref())
}

/// Applies the activity predicate and assembles an [`Episode`].
///
/// Returns `None` for episodes that do not qualify. `partial` is set from
/// the presence of the `progress` marker, matching the export's meaning of
/// "not heard to the end".
fn build_episode(attrs: OutlineAttrs, podcast: Option<&str>) -> Option<Episode> {
    let include = match attrs.playback_state() {
        PlaybackState::Played => true,
        PlaybackState::InProgress(secs) => secs > MIN_PROGRESS_SECS,
        PlaybackState::Deleted => false,
        PlaybackState::Unknown => {
            tracing::warn!(
                id = attrs.episode_id.as_deref().unwrap_or("?"),
                title = attrs.title.as_deref().unwrap_or("?"),
                "Episode was neither played, in progress, nor deleted"
            );
            false
        }
    };
    if !include {
        return None;
    }

    let Some(podcast) = podcast else {
        tracing::warn!(
            title = attrs.title.as_deref().unwrap_or("?"),
            "Episode outline outside any subscription, skipping"
        );
        return None;
    };

    let partial = attrs.progress.is_some();
    match (attrs.title, attrs.url, attrs.guid, attrs.updated) {
        (Some(title), Some(url), Some(guid), Some(timestamp)) => Some(Episode {
            podcast: podcast.to_string(),
            title,
            url,
            guid,
            timestamp,
            partial,
        }),
        _ => {
            tracing::warn!(
                id = attrs.episode_id.as_deref().unwrap_or("?"),
                "Episode outline missing required attributes, skipping"
            );
            None
        }
    }
}
