//! Renders and publishes the RSS activity feed.
//!
//! Episodes are written in the order given; ordering is the selector's and
//! reconciler's responsibility, never the serializer's.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::FeedConfig;
use crate::episode::{Episode, PUBDATE_FORMAT};
use crate::util::write_atomic;

/// Renders the complete RSS 2.0 document.
///
/// `generated_at` becomes the channel `<pubDate>` (RFC-822, UTC); it is a
/// parameter so tests can pin it.
///
/// # Errors
///
/// Fails if any episode's timestamp cannot be parsed for date rendering.
pub fn render_feed(
    episodes: &[Episode],
    feed: &FeedConfig,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let now = generated_at.format(PUBDATE_FORMAT);

    let mut out = String::with_capacity(512 + episodes.len() * 400);
    out.push_str(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <rss xmlns:atom=\"http://www.w3.org/2005/Atom\" version=\"2.0\">\n",
    );
    out.push_str(&format!(
        "<channel>\n\
         <atom:link href=\"{href}\" rel=\"self\" type=\"application/rss+xml\" />\
         <title>{title}</title>\
         <link>https://overcast.fm</link><pubDate>{now}</pubDate>\
         <description>{title}</description><language>en-us</language>\n",
        href = feed.href,
        title = feed.title,
    ));

    for episode in episodes {
        let item = episode.to_feed_item().with_context(|| {
            format!(
                "Failed to render item '{}' ({})",
                episode.title, episode.timestamp
            )
        })?;
        out.push_str(&item);
    }

    out.push_str("</channel></rss>\n");
    Ok(out)
}

/// Renders the feed and writes it atomically to the configured output path.
pub fn write_feed(
    episodes: &[Episode],
    feed: &FeedConfig,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    let document = render_feed(episodes, feed, generated_at)?;
    write_atomic(&feed.filename, document.as_bytes())
        .with_context(|| format!("Failed to write feed to '{}'", feed.filename.display()))?;
    tracing::debug!(
        path = %feed.filename.display(),
        items = episodes.len(),
        "Wrote feed"
    );
    Ok(())
}
