use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::models::{ExtractedLink, LinkPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    FullUrl,
    Labeled,
    Markdown,
}

struct PlatformRules {
    platform: LinkPlatform,
    patterns: Vec<(MatchKind, Regex)>,
}

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]{1,99}$").unwrap());

static EMAIL_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mailto:)?([a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,})$").unwrap()
});

static PLATFORM_RULES: Lazy<Vec<PlatformRules>> = Lazy::new(|| {
    vec![
        PlatformRules {
            platform: LinkPlatform::LinkedIn,
            patterns: vec![
                (
                    MatchKind::FullUrl,
                    Regex::new(
                        r"(?i)\b((?:https?://)?(?:[a-z]{2,3}\.)?linkedin\.com/(?:in|pub)/[a-z0-9_%\-]+)",
                    )
                    .unwrap(),
                ),
                (
                    MatchKind::Labeled,
                    Regex::new(r"(?i)\blinked[ \t]*in(?:[ \t]+(?:url|profile|id))?[ \t]*:[ \t]*(\S+)").unwrap(),
                ),
                (
                    MatchKind::Markdown,
                    Regex::new(r"(?i)\[[^\]\n]*\]\(\s*([^)\s]*linkedin\.com[^)\s]*)\s*\)").unwrap(),
                ),
            ],
        },
        PlatformRules {
            platform: LinkPlatform::GitHub,
            patterns: vec![
                (
                    MatchKind::FullUrl,
                    Regex::new(r"(?i)\b((?:https?://)?(?:www\.)?github\.com/[a-z0-9][a-z0-9\-]{0,38})")
                        .unwrap(),
                ),
                (
                    MatchKind::Labeled,
                    Regex::new(r"(?i)\bgit[ \t]*hub(?:[ \t]+(?:url|profile|id))?[ \t]*:[ \t]*(\S+)").unwrap(),
                ),
                (
                    MatchKind::Markdown,
                    Regex::new(r"(?i)\[[^\]\n]*\]\(\s*([^)\s]*github\.com[^)\s]*)\s*\)").unwrap(),
                ),
            ],
        },
        PlatformRules {
            platform: LinkPlatform::LeetCode,
            patterns: vec![
                (
                    MatchKind::FullUrl,
                    Regex::new(r"(?i)\b((?:https?://)?(?:www\.)?leetcode\.com/(?:u/)?[a-z0-9_\-]+)")
                        .unwrap(),
                ),
                (
                    MatchKind::Labeled,
                    Regex::new(r"(?i)\bleet[ \t]*code(?:[ \t]+(?:url|profile|id))?[ \t]*:[ \t]*(\S+)").unwrap(),
                ),
                (
                    MatchKind::Markdown,
                    Regex::new(r"(?i)\[[^\]\n]*\]\(\s*([^)\s]*leetcode\.com[^)\s]*)\s*\)").unwrap(),
                ),
            ],
        },
        PlatformRules {
            platform: LinkPlatform::GeeksForGeeks,
            patterns: vec![
                (
                    MatchKind::FullUrl,
                    Regex::new(
                        r"(?i)\b((?:https?://)?(?:www\.|auth\.)?geeksforgeeks\.org/(?:user|profile)/[a-z0-9_\-]+)",
                    )
                    .unwrap(),
                ),
                (
                    MatchKind::Labeled,
                    Regex::new(
                        r"(?i)\b(?:geeks[ \t]*for[ \t]*geeks|gfg)(?:[ \t]+(?:url|profile|id))?[ \t]*:[ \t]*(\S+)",
                    )
                    .unwrap(),
                ),
                (
                    MatchKind::Markdown,
                    Regex::new(r"(?i)\[[^\]\n]*\]\(\s*([^)\s]*geeksforgeeks\.org[^)\s]*)\s*\)")
                        .unwrap(),
                ),
            ],
        },
        PlatformRules {
            platform: LinkPlatform::Email,
            patterns: vec![
                (
                    MatchKind::FullUrl,
                    Regex::new(r"(?i)\b(?:mailto:)?([a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,})\b")
                        .unwrap(),
                ),
                (
                    MatchKind::Labeled,
                    Regex::new(r"(?i)\be-?mail(?:[ \t]+(?:id|address))?[ \t]*:[ \t]*(\S+)").unwrap(),
                ),
                (
                    MatchKind::Markdown,
                    Regex::new(r"(?i)\[[^\]\n]*\]\(\s*mailto:([^)\s]+)\s*\)").unwrap(),
                ),
            ],
        },
    ]
});

const GITHUB_RESERVED: &[&str] = &[
    "about",
    "collections",
    "enterprise",
    "explore",
    "features",
    "join",
    "login",
    "marketplace",
    "orgs",
    "pricing",
    "settings",
    "sponsors",
    "topics",
];

const LEETCODE_RESERVED: &[&str] = &[
    "accounts",
    "contest",
    "discuss",
    "explore",
    "problems",
    "problemset",
    "study-plan",
];

impl LinkPlatform {
    pub fn domain(self) -> &'static str {
        match self {
            LinkPlatform::LinkedIn => "linkedin.com",
            LinkPlatform::GitHub => "github.com",
            LinkPlatform::LeetCode => "leetcode.com",
            LinkPlatform::GeeksForGeeks => "geeksforgeeks.org",
            LinkPlatform::Email => "",
        }
    }

    fn profile_url(self, username: &str) -> String {
        match self {
            LinkPlatform::LinkedIn => format!("https://www.linkedin.com/in/{username}"),
            LinkPlatform::GitHub => format!("https://github.com/{username}"),
            LinkPlatform::LeetCode => format!("https://leetcode.com/u/{username}"),
            LinkPlatform::GeeksForGeeks => {
                format!("https://www.geeksforgeeks.org/user/{username}")
            }
            LinkPlatform::Email => format!("mailto:{}", username.to_lowercase()),
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        [
            LinkPlatform::LinkedIn,
            LinkPlatform::GitHub,
            LinkPlatform::LeetCode,
            LinkPlatform::GeeksForGeeks,
        ]
        .into_iter()
        .find(|platform| host_matches(&host, platform.domain()))
    }
}

/// Ordered set of links keyed on the canonical URL.
#[derive(Debug, Default)]
pub struct LinkCollector {
    seen: HashSet<String>,
    links: Vec<ExtractedLink>,
}

impl LinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: ExtractedLink) -> bool {
        if !self.seen.insert(link.url.clone()) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn into_links(self) -> Vec<ExtractedLink> {
        self.links
    }
}

/// Collects platform links from annotation URIs first, then from the body text.
pub fn extract_links(text: &str, annotations: &[String]) -> Vec<ExtractedLink> {
    let mut collector = LinkCollector::new();

    for uri in annotations {
        match classify_annotation(uri) {
            Some(link) => {
                collector.push(link);
            }
            None => tracing::debug!(uri = %uri, "ignoring non-profile link annotation"),
        }
    }

    for rules in PLATFORM_RULES.iter() {
        for (kind, regex) in &rules.patterns {
            for captures in regex.captures_iter(text) {
                let (Some(whole), Some(value)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };
                if let Some(url) = canonicalize(rules.platform, *kind, value.as_str()) {
                    collector.push(ExtractedLink {
                        url,
                        source_text: whole.as_str().trim().to_string(),
                        platform: rules.platform,
                    });
                }
            }
        }
    }

    collector.into_links()
}

/// Returns the value as an absolute URL when it points at the platform's domain.
/// Unlike the extractor, the path is not required to look like a profile.
pub fn qualified_url(platform: LinkPlatform, value: &str) -> Option<String> {
    if platform == LinkPlatform::Email {
        return canonical_email(value);
    }

    let value = trim_link_value(value);
    if !value.to_ascii_lowercase().contains(platform.domain()) {
        return None;
    }

    let absolute = with_scheme(value);
    let parsed = Url::parse(&absolute).ok()?;
    if !host_matches(parsed.host_str()?, platform.domain()) {
        return None;
    }

    Some(absolute)
}

fn classify_annotation(uri: &str) -> Option<ExtractedLink> {
    let trimmed = uri.trim();
    if trimmed
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
    {
        return canonical_email(trimmed).map(|url| ExtractedLink {
            url,
            source_text: trimmed.to_string(),
            platform: LinkPlatform::Email,
        });
    }

    let parsed = Url::parse(&with_scheme(trim_link_value(trimmed))).ok()?;
    let platform = LinkPlatform::from_host(parsed.host_str()?)?;
    let url = profile_url_from_value(platform, trimmed)?;

    Some(ExtractedLink {
        url,
        source_text: trimmed.to_string(),
        platform,
    })
}

fn canonicalize(platform: LinkPlatform, kind: MatchKind, raw: &str) -> Option<String> {
    if platform == LinkPlatform::Email {
        return canonical_email(raw);
    }

    let value = trim_link_value(raw);
    if value.to_ascii_lowercase().contains(platform.domain()) {
        return profile_url_from_value(platform, value);
    }

    // Only labeled lines may carry a bare username.
    if kind != MatchKind::Labeled {
        return None;
    }

    let username = value.trim_start_matches('@');
    if USERNAME_RE.is_match(username) && !is_reserved(platform, username) {
        return Some(platform.profile_url(username));
    }

    None
}

fn profile_url_from_value(platform: LinkPlatform, value: &str) -> Option<String> {
    let mut parsed = Url::parse(&qualified_url(platform, value)?).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    let is_profile = match platform {
        LinkPlatform::LinkedIn => {
            matches!(segments.first(), Some(&"in") | Some(&"pub")) && segments.len() >= 2
        }
        LinkPlatform::GitHub => segments
            .first()
            .is_some_and(|user| !is_reserved(platform, user)),
        LinkPlatform::LeetCode => match segments.as_slice() {
            ["u", user, ..] => !user.is_empty(),
            [user, ..] => !is_reserved(platform, user) && *user != "u",
            [] => false,
        },
        LinkPlatform::GeeksForGeeks => {
            matches!(segments.first(), Some(&"user") | Some(&"profile")) && segments.len() >= 2
        }
        LinkPlatform::Email => false,
    };

    if !is_profile {
        return None;
    }

    // Query strings and fragments never identify a profile.
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.as_str().trim_end_matches('/').to_string())
}

fn canonical_email(raw: &str) -> Option<String> {
    let value = trim_link_value(raw);
    EMAIL_VALUE_RE
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|email| format!("mailto:{}", email.as_str().to_lowercase()))
}

fn is_reserved(platform: LinkPlatform, segment: &str) -> bool {
    let segment = segment.to_ascii_lowercase();
    match platform {
        LinkPlatform::GitHub => GITHUB_RESERVED.contains(&segment.as_str()),
        LinkPlatform::LeetCode => LEETCODE_RESERVED.contains(&segment.as_str()),
        _ => false,
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn with_scheme(value: &str) -> String {
    if value.to_ascii_lowercase().starts_with("http://")
        || value.to_ascii_lowercase().starts_with("https://")
    {
        value.to_string()
    } else {
        format!("https://{value}")
    }
}

fn trim_link_value(raw: &str) -> &str {
    let mut value = raw.trim();
    if let Some(idx) = value.find("](") {
        value = &value[idx + 2..];
    }
    value
        .trim_matches(|c: char| {
            c.is_whitespace()
                || matches!(c, '<' | '>' | '(' | ')' | '[' | ']' | '"' | '\'' | '*' | '`')
        })
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | '|' | '/'))
}
