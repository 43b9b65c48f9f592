//! Indicator extraction - literal IOCs found in the stage inputs
//!
//! Every address, domain, hash and suspicious account name that appears
//! verbatim in the evidence must end up in the profile, whatever the model
//! chose to list.

use std::net::{Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid ipv4 regex")
});

/// Whole colon-bearing tokens; dots are included so IPv4-mapped and
/// ip:port forms are seen in full and rejected by the parser
static IPV6_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9A-Za-z.]*:[0-9A-Za-z:.]*").expect("valid ipv6 regex")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,24}\b").expect("valid domain regex")
});

static HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Fa-f0-9]{64}|[A-Fa-f0-9]{40}|[A-Fa-f0-9]{32})\b").expect("valid hash regex")
});

static USER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\binvalid user\s+([A-Za-z0-9._-]+)",
        r"(?i)\bfailed password for (?:invalid user\s+)?([A-Za-z0-9._-]+)",
        r"(?i)\buser=([A-Za-z0-9._-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid username regex"))
    .collect()
});

/// Suffixes that look like TLDs but are file names or local zones
const NOT_A_TLD: &[&str] = &[
    "exe", "dll", "sys", "log", "txt", "bat", "cmd", "ps1", "sh", "py", "js", "json", "xml", "conf",
    "cfg", "ini", "tmp", "dat", "bin", "so", "ko", "service", "socket", "timer", "mount", "local",
    "localdomain", "lan", "internal", "html", "php", "zip", "gz", "tar", "msi", "lnk", "db",
];

/// First labels of reverse-DNS identifiers (`org.gnome.Shell`, `com.apple.xpc`)
const REVERSE_DNS_ROOTS: &[&str] = &["com", "org", "net", "edu", "gov", "io"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndicatorKind {
    Ipv4,
    Ipv6,
    Domain,
    Hash,
    Username,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub value: String,
}

impl Indicator {
    fn new(kind: IndicatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Form used in `indicators_of_compromise`
    pub fn render(&self) -> String {
        match self.kind {
            IndicatorKind::Username => format!("username: {}", self.value),
            _ => self.value.clone(),
        }
    }
}

/// All literal indicators in `text`, grouped by kind, first sighting order
pub fn extract_indicators(text: &str) -> Vec<Indicator> {
    let mut found: Vec<Indicator> = Vec::new();
    let mut push = |ind: Indicator| {
        if !found.iter().any(|f| f.kind == ind.kind && f.value.eq_ignore_ascii_case(&ind.value)) {
            found.push(ind);
        }
    };

    for m in IPV4_RE.find_iter(text) {
        if let Ok(ip) = m.as_str().parse::<Ipv4Addr>() {
            if !(ip.is_loopback() || ip.is_unspecified() || ip.is_broadcast()) {
                push(Indicator::new(IndicatorKind::Ipv4, ip.to_string()));
            }
        }
    }

    for m in IPV6_RE.find_iter(text) {
        let token = m.as_str().trim_end_matches('.');
        if let Ok(ip) = token.parse::<Ipv6Addr>() {
            // IPv4-mapped addresses are reported by the IPv4 pass
            if !(ip.is_loopback() || ip.is_unspecified() || ip.to_ipv4_mapped().is_some()) {
                push(Indicator::new(IndicatorKind::Ipv6, token.to_lowercase()));
            }
        }
    }

    for m in DOMAIN_RE.find_iter(text) {
        let domain = m.as_str();
        if !standalone(text, m.start(), m.end()) {
            continue;
        }
        let tld = domain.rsplit('.').next().unwrap_or_default();
        let root = domain.split('.').next().unwrap_or_default();
        if !NOT_A_TLD.contains(&tld) && !REVERSE_DNS_ROOTS.contains(&root) {
            push(Indicator::new(IndicatorKind::Domain, domain));
        }
    }

    for m in HASH_RE.find_iter(text) {
        let hash = m.as_str();
        if hash.chars().any(|c| c.is_ascii_alphabetic()) && hash.chars().any(|c| c.is_ascii_digit()) {
            push(Indicator::new(IndicatorKind::Hash, hash.to_lowercase()));
        }
    }

    for re in USER_RES.iter() {
        for caps in re.captures_iter(text) {
            if let Some(user) = caps.get(1) {
                push(Indicator::new(IndicatorKind::Username, user.as_str()));
            }
        }
    }

    found
}

/// The match is a whole name, not a piece of a longer dotted or mixed-case token.
/// A trailing sentence period is allowed.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if text[..start].chars().next_back().is_some_and(|c| is_token_char(c) || c == '.') {
        return false;
    }
    let mut after = text[end..].chars();
    match after.next() {
        Some('.') => !after.next().is_some_and(|c| c.is_ascii_alphanumeric()),
        Some(c) => !is_token_char(c),
        None => true,
    }
}

/// Model list first (deduplicated), then every extracted indicator the
/// model did not already mention
pub fn merge_indicators(model: Vec<String>, extracted: &[Indicator]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(model.len() + extracted.len());

    for ioc in model {
        let ioc = ioc.trim().to_string();
        if ioc.is_empty() || merged.iter().any(|m| m.eq_ignore_ascii_case(&ioc)) {
            continue;
        }
        merged.push(ioc);
    }

    for ind in extracted {
        if merged.iter().any(|m| mentions(m, &ind.value)) {
            continue;
        }
        merged.push(ind.render());
    }

    merged
}

/// Case-insensitive containment that does not match inside a longer token
fn mentions(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();
    if needle.is_empty() {
        return false;
    }

    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
    haystack.match_indices(&needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.map_or(false, is_token_char) && !after.map_or(false, is_token_char)
    })
}
