//! Episode model: one listening event, its timestamp forms, and its ordering.
//!
//! Timestamps arrive from the export as ISO-8601 text with a colon-separated
//! offset (`2024-01-02T10:00:00-05:00`) and leave in the feed as RFC-822
//! dates. [`normalize_offset`] converts between the two offset spellings;
//! [`chronological`] defines the total order the pipeline sorts by.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use quick_xml::escape::escape;

/// Timestamp layout once the offset is in compact form (`-0400`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// RFC-822 layout required by RSS `<pubDate>`.
pub const PUBDATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// One listening event from the export.
///
/// `guid` is stable across runs and is the join key against the previously
/// published feed. All fields are set at construction; the reconciler
/// replaces whole values instead of mutating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Show title the episode belongs to.
    pub podcast: String,
    /// Episode title.
    pub title: String,
    /// Canonical episode URL.
    pub url: String,
    /// Permanent identifier, used verbatim as the feed `<guid>`.
    pub guid: String,
    /// Activity date, ISO-8601 with a colon-separated or compact offset.
    pub timestamp: String,
    /// True when the episode was only partially heard.
    pub partial: bool,
}

impl Episode {
    /// The timestamp with its offset in compact form.
    pub fn normalized_timestamp(&self) -> Cow<'_, str> {
        normalize_offset(&self.timestamp)
    }

    /// Parses the timestamp into an absolute instant.
    pub fn instant(&self) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_str(&self.normalized_timestamp(), TIMESTAMP_FORMAT)
    }

    /// RFC-822 rendering of the timestamp, keeping the episode's own offset.
    pub fn pub_date(&self) -> Result<String, chrono::ParseError> {
        Ok(self.instant()?.format(PUBDATE_FORMAT).to_string())
    }

    /// Renders the episode as one RSS `<item>` line.
    ///
    /// `podcast` and `title` are XML-escaped in the visible title; `url` and
    /// `guid` pass through verbatim. They are already feed-safe values, and
    /// rewriting a published guid would break reconciliation on later runs.
    pub fn to_feed_item(&self) -> Result<String, chrono::ParseError> {
        let date = self.pub_date()?;
        Ok(format!(
            "<item>\
             <title>{podcast}: {title}</title>\
             <pubDate>{date}</pubDate>\
             <link>{url}</link>\
             <guid isPermaLink=\"true\">{guid}</guid>\
             <description><![CDATA[{raw_podcast}: {raw_title} on {date}]]></description>\
             </item>\n",
            podcast = escape(self.podcast.as_str()),
            title = escape(self.title.as_str()),
            url = self.url,
            guid = self.guid,
            raw_podcast = self.podcast,
            raw_title = self.title,
        ))
    }
}

/// Converts a colon-separated offset (`-04:00`) to compact form (`-0400`).
///
/// Detection is by fixed byte positions: the 6th byte from the end must be
/// `+`/`-` and the 3rd from the end must be `:`. Anything else, including a
/// timestamp already in compact form, is returned unchanged, so the date
/// portion can never be misread as an offset. Idempotent.
pub fn normalize_offset(timestamp: &str) -> Cow<'_, str> {
    let bytes = timestamp.as_bytes();
    let n = bytes.len();
    if n >= 6 && matches!(bytes[n - 6], b'+' | b'-') && bytes[n - 3] == b':' {
        let mut compact = String::with_capacity(n - 1);
        compact.push_str(&timestamp[..n - 3]);
        compact.push_str(&timestamp[n - 2..]);
        Cow::Owned(compact)
    } else {
        Cow::Borrowed(timestamp)
    }
}

/// Total order over episodes by activity time, oldest first.
///
/// Compares absolute instants, so mixed offsets order correctly. If either
/// timestamp fails to parse, falls back to comparing the normalized strings,
/// which is chronologically correct within a single offset and still total.
/// Descending order is expressed at the call site by swapping the arguments.
pub fn chronological(a: &Episode, b: &Episode) -> Ordering {
    match (a.instant(), b.instant()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.normalized_timestamp().cmp(&b.normalized_timestamp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(timestamp: &str) -> Episode {
        Episode {
            podcast: "Tech Talk".to_string(),
            title: "Episode One".to_string(),
            url: "https://example.com/ep1".to_string(),
            guid: "https://overcast.fm/+abc123".to_string(),
            timestamp: timestamp.to_string(),
            partial: false,
        }
    }

    #[test]
    fn test_normalize_colon_offset() {
        assert_eq!(
            normalize_offset("2024-01-02T10:00:00-05:00"),
            "2024-01-02T10:00:00-0500"
        );
        assert_eq!(
            normalize_offset("2024-06-15T23:59:59+09:30"),
            "2024-06-15T23:59:59+0930"
        );
    }

    #[test]
    fn test_normalize_leaves_compact_offset_unchanged() {
        let compact = "2024-01-02T10:00:00-0500";
        assert!(matches!(normalize_offset(compact), Cow::Borrowed(_)));
        assert_eq!(normalize_offset(compact), compact);
    }

    #[test]
    fn test_normalize_leaves_offsetless_timestamp_unchanged() {
        // The time portion has a ':' 3rd-from-end but no sign 6th-from-end.
        assert_eq!(normalize_offset("2024-01-02T10:00:00"), "2024-01-02T10:00:00");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "2024-01-02T10:00:00-05:00",
            "2024-01-02T10:00:00-0500",
            "2024-01-02T10:00:00+00:00",
            "2024-01-02T10:00:00",
            "",
            "10:00",
        ];
        for input in inputs {
            let once = normalize_offset(input).into_owned();
            let twice = normalize_offset(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_short_strings() {
        assert_eq!(normalize_offset(""), "");
        assert_eq!(normalize_offset("-05:0"), "-05:0");
        // Exactly an offset and nothing else still converts.
        assert_eq!(normalize_offset("-05:00"), "-0500");
    }

    #[test]
    fn test_chronological_within_one_offset() {
        let older = episode("2024-01-01T10:00:00-05:00");
        let newer = episode("2024-01-03T10:00:00-05:00");
        assert_eq!(chronological(&older, &newer), Ordering::Less);
        assert_eq!(chronological(&newer, &older), Ordering::Greater);
    }

    #[test]
    fn test_chronological_across_offsets() {
        // 10:00-0500 is 15:00Z; 16:00+0200 is 14:00Z. String comparison
        // would order these the other way around.
        let later = episode("2024-01-02T10:00:00-05:00");
        let earlier = episode("2024-01-02T16:00:00+02:00");
        assert_eq!(chronological(&later, &earlier), Ordering::Greater);
    }

    #[test]
    fn test_chronological_equal_instants_different_offsets() {
        let a = episode("2024-01-02T10:00:00-05:00");
        let b = episode("2024-01-02T16:00:00+01:00");
        assert_eq!(chronological(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_chronological_falls_back_to_string_order() {
        let bad = episode("not-a-date");
        let good = episode("2024-01-02T10:00:00-05:00");
        // "2..." < "n..." lexicographically.
        assert_eq!(chronological(&good, &bad), Ordering::Less);
        assert_eq!(chronological(&bad, &bad), Ordering::Equal);
    }

    #[test]
    fn test_pub_date_keeps_own_offset() {
        let ep = episode("2024-01-02T09:00:00-05:00");
        assert_eq!(ep.pub_date().unwrap(), "Tue, 02 Jan 2024 09:00:00 -0500");

        let ep = episode("2024-01-02T09:00:00+0930");
        assert_eq!(ep.pub_date().unwrap(), "Tue, 02 Jan 2024 09:00:00 +0930");
    }

    #[test]
    fn test_pub_date_rejects_unparseable_timestamp() {
        assert!(episode("yesterday").pub_date().is_err());
    }

    #[test]
    fn test_to_feed_item_shape() {
        let ep = episode("2024-01-02T09:00:00-05:00");
        let item = ep.to_feed_item().unwrap();
        assert_eq!(
            item,
            "<item><title>Tech Talk: Episode One</title>\
             <pubDate>Tue, 02 Jan 2024 09:00:00 -0500</pubDate>\
             <link>https://example.com/ep1</link>\
             <guid isPermaLink=\"true\">https://overcast.fm/+abc123</guid>\
             <description><![CDATA[Tech Talk: Episode One on Tue, 02 Jan 2024 09:00:00 -0500]]></description>\
             </item>\n"
        );
    }

    #[test]
    fn test_to_feed_item_escapes_titles_only() {
        let mut ep = episode("2024-01-02T09:00:00-05:00");
        ep.podcast = "Q&A".to_string();
        ep.title = "1 < 2".to_string();
        ep.url = "https://example.com/ep?a=1&b=2".to_string();
        ep.guid = "https://overcast.fm/+x?y=1&z=2".to_string();

        let item = ep.to_feed_item().unwrap();
        assert!(item.contains("<title>Q&amp;A: 1 &lt; 2</title>"));
        // url and guid pass through untouched.
        assert!(item.contains("<link>https://example.com/ep?a=1&b=2</link>"));
        assert!(item.contains("<guid isPermaLink=\"true\">https://overcast.fm/+x?y=1&z=2</guid>"));
    }
}
