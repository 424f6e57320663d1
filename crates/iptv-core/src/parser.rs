//! M3U / M3U8 playlist parser
//!
//! Handles the IPTV flavour of extended M3U:
//! - `#EXTM3U` header, optionally carrying `x-tvg-url` / `url-tvg`
//! - `#EXTINF:<duration> [attr="value" ...],<display name>` entries
//! - `http://`, `https://` and `rtmp://` stream lines
//!
//! Parsing never fails; malformed input produces a partial or empty list.

use crate::types::{Channel, UNKNOWN_CHANNEL};
use nom::{
    bytes::complete::{tag_no_case, take_till},
    character::complete::char,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use tracing::debug;
use url::Url;

const EXTINF_TAG: &str = "#EXTINF";
const HEADER_TAG: &str = "#EXTM3U";
const STREAM_SCHEMES: [&str; 3] = ["http://", "https://", "rtmp://"];

/// Parsed playlist document
#[derive(Debug, Clone, Default)]
pub struct ParsedPlaylist {
    pub channels: Vec<Channel>,
    /// EPG guide URL from the `#EXTM3U` header
    pub epg_url: Option<String>,
}

/// Parse playlist content into channels, in source order
pub fn parse(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<Channel> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(EXTINF_TAG) {
            pending = Some(parse_ext_inf(line));
        } else if is_stream_url(line) {
            match pending.take() {
                Some(mut channel) => {
                    channel.url = line.to_string();
                    channels.push(channel);
                }
                None => channels.push(Channel::new(name_from_url(line), line)),
            }
        }
    }

    debug!(channels = channels.len(), "Parsed playlist");
    channels
}

/// Parse content including header metadata
pub fn parse_playlist(content: &str) -> ParsedPlaylist {
    let epg_url = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| l.starts_with(HEADER_TAG))
        .and_then(|header| {
            find_attribute(header, "x-tvg-url").or_else(|| find_attribute(header, "url-tvg"))
        })
        .map(str::to_string);

    ParsedPlaylist {
        channels: parse(content),
        epg_url,
    }
}

/// Parse a single `#EXTINF` line. The returned channel has an empty URL.
pub fn parse_ext_inf(line: &str) -> Channel {
    // Display name is everything after the last comma
    let mut name = line
        .rfind(',')
        .map(|idx| line[idx + 1..].trim().to_string())
        .unwrap_or_default();

    if name.is_empty() {
        name = find_attribute(line, "tvg-name").unwrap_or_default().to_string();
    }
    if name.is_empty() {
        name = UNKNOWN_CHANNEL.to_string();
    }

    Channel {
        name,
        url: String::new(),
        logo: find_attribute(line, "tvg-logo").map(str::to_string),
        group: find_attribute(line, "group-title").map(str::to_string),
    }
}

/// Permissive validity check: a header marker or at least one HTTP(S) URL
pub fn is_valid_m3u(content: &str) -> bool {
    content.contains(HEADER_TAG) || content.contains("http://") || content.contains("https://")
}

/// Distinct group titles in first-seen order
pub fn groups(channels: &[Channel]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for group in channels.iter().filter_map(|c| c.group.as_deref()) {
        if !seen.contains(&group) {
            seen.push(group);
        }
    }
    seen
}

fn is_stream_url(line: &str) -> bool {
    STREAM_SCHEMES.iter().any(|scheme| line.starts_with(scheme))
}

/// Last path segment of a URL, used for entries without `#EXTINF`
fn name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string())
}

/// `key="value"` with a case-insensitive key
fn quoted_attribute<'a>(input: &'a str, key: &str) -> IResult<&'a str, &'a str> {
    preceded(
        (tag_no_case(key), char('=')),
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
    )
    .parse(input)
}

/// Leftmost `key="value"` anywhere on the line
fn find_attribute<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.char_indices()
        .find_map(|(idx, _)| quoted_attribute(&line[idx..], key).ok().map(|(_, value)| value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ext_inf_attributes() {
        let channel = parse_ext_inf(
            r#"#EXTINF:-1 tvg-logo="http://x/l.png" group-title="News",BBC News"#,
        );
        assert_eq!(channel.name, "BBC News");
        assert_eq!(channel.logo.as_deref(), Some("http://x/l.png"));
        assert_eq!(channel.group.as_deref(), Some("News"));
        assert!(channel.url.is_empty());
    }

    #[test]
    fn test_name_uses_last_comma() {
        let channel = parse_ext_inf(r#"#EXTINF:-1 group-title="A,B",Sport, Live"#);
        assert_eq!(channel.name, "Live");
        assert_eq!(channel.group.as_deref(), Some("A,B"));
    }

    #[test]
    fn test_name_falls_back_to_tvg_name() {
        let channel = parse_ext_inf(r#"#EXTINF:-1 TVG-NAME="Channel One","#);
        assert_eq!(channel.name, "Channel One");

        let channel = parse_ext_inf("#EXTINF:-1");
        assert_eq!(channel.name, UNKNOWN_CHANNEL);
    }

    #[test]
    fn test_attribute_case_and_first_match() {
        let line = r#"#EXTINF:-1 Group-Title="First" group-title="Second",X"#;
        assert_eq!(find_attribute(line, "group-title"), Some("First"));
        assert_eq!(find_attribute(line, "tvg-logo"), None);
    }

    #[test]
    fn test_unterminated_attribute_is_ignored() {
        let line = r#"#EXTINF:-1 tvg-logo="http://x/l.png,Name"#;
        assert_eq!(find_attribute(line, "tvg-logo"), None);
    }

    #[test]
    fn test_parse_pairs_in_order() {
        let content = "#EXTM3U\n\
            #EXTINF:-1 group-title=\"News\",CNN\n\
            http://example.com/cnn.ts\n\
            #EXTVLCOPT:http-user-agent=foo\n\
            #EXTINF:-1,BBC\r\n\
            https://example.com/bbc.m3u8\n";
        let channels = parse(content);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].url, "http://example.com/cnn.ts");
        assert_eq!(channels[1].name, "BBC");
        assert_eq!(channels[1].url, "https://example.com/bbc.m3u8");
    }

    #[test]
    fn test_dangling_ext_inf_is_dropped() {
        let channels = parse("#EXTM3U\n#EXTINF:-1,One\nhttp://a/1\n#EXTINF:-1,Two\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "One");
    }

    #[test]
    fn test_later_ext_inf_replaces_pending() {
        let channels = parse("#EXTINF:-1,One\n#EXTINF:-1,Two\nhttp://a/2\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Two");
    }

    #[test]
    fn test_bare_url_lines() {
        let channels = parse("https://example.com/stream.m3u8\nrtmp://live.example.com/app/feed\nhttp://example.com/\n");
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].name, "stream.m3u8");
        assert_eq!(channels[0].logo, None);
        assert_eq!(channels[1].name, "feed");
        assert_eq!(channels[2].name, UNKNOWN_CHANNEL);
    }

    #[test]
    fn test_is_valid_m3u() {
        assert!(is_valid_m3u("#EXTM3U"));
        assert!(is_valid_m3u("https://example.com/a.ts"));
        assert!(!is_valid_m3u("just some text"));
    }

    #[test]
    fn test_header_epg_url() {
        let parsed = parse_playlist("#EXTM3U x-tvg-url=\"http://epg/guide.xml\"\n#EXTINF:-1,A\nhttp://a/1\n");
        assert_eq!(parsed.epg_url.as_deref(), Some("http://epg/guide.xml"));
        assert_eq!(parsed.channels.len(), 1);

        let parsed = parse_playlist("#EXTM3U url-tvg=\"http://epg/alt.xml\"\n");
        assert_eq!(parsed.epg_url.as_deref(), Some("http://epg/alt.xml"));
    }

    #[test]
    fn test_groups_first_seen() {
        let channels = vec![
            Channel::new("a", "http://a").with_group("News"),
            Channel::new("b", "http://b"),
            Channel::new("c", "http://c").with_group("Sport"),
            Channel::new("d", "http://d").with_group("News"),
        ];
        assert_eq!(groups(&channels), vec!["News", "Sport"]);
    }
}
