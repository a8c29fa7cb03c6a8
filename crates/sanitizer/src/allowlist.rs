use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key whose rules apply to every allowed tag. It never admits a tag by itself.
pub const WILDCARD: &str = "*";

const ARIA_ATTRIBUTE_PATTERN: &str = r"^aria-[\w-]*$";

#[derive(Error, Debug)]
pub enum AllowlistError {
    #[error("Invalid attribute pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid allowlist file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// One permitted-attribute rule: an exact lower-case name or a name pattern.
#[derive(Debug, Clone)]
pub enum AttrRule {
    Name(String),
    Pattern(Regex),
}

impl AttrRule {
    /// Parse a rule string. `/regex/` is a case-insensitive pattern, anything else a name.
    pub fn parse(rule: &str) -> Result<AttrRule, AllowlistError> {
        match rule
            .strip_prefix('/')
            .and_then(|r| r.strip_suffix('/'))
            .filter(|r| !r.is_empty())
        {
            Some(pattern) => regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(AttrRule::Pattern)
                .map_err(|source| AllowlistError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }),
            None => Ok(AttrRule::Name(rule.to_ascii_lowercase())),
        }
    }

    pub fn matches(&self, attr: &str) -> bool {
        match self {
            AttrRule::Name(name) => name.eq_ignore_ascii_case(attr),
            AttrRule::Pattern(re) => re.is_match(attr),
        }
    }
}

impl PartialEq for AttrRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrRule::Name(a), AttrRule::Name(b)) => a == b,
            (AttrRule::Pattern(a), AttrRule::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Tag name → permitted attribute rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Allowlist {
    tags: BTreeMap<String, Vec<AttrRule>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AllowlistFile {
    #[serde(default)]
    extend_default: bool,
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
}

impl Allowlist {
    /// An allowlist that permits nothing.
    pub fn empty() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// Allow `tag` with the given exact attribute names (added to any existing rules).
    pub fn allow(mut self, tag: &str, attrs: &[&str]) -> Self {
        let rules = self.tags.entry(tag.to_ascii_lowercase()).or_default();
        rules.extend(attrs.iter().map(|a| AttrRule::Name(a.to_ascii_lowercase())));
        self
    }

    pub fn insert_rule(&mut self, tag: &str, rule: AttrRule) {
        self.tags
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .push(rule);
    }

    /// Build from a tag → rule-string map, the shape of the `allowList` option.
    pub fn from_tag_map<I, R>(map: I) -> Result<Self, AllowlistError>
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = String>,
    {
        let mut out = Self::empty();
        for (tag, rules) in map {
            // Listing a tag with no rules still admits the tag.
            out.tags.entry(tag.to_ascii_lowercase()).or_default();
            for rule in rules {
                out.insert_rule(&tag, AttrRule::parse(&rule)?);
            }
        }
        Ok(out)
    }

    /// Load from TOML:
    ///
    /// ```toml
    /// extend_default = true
    /// [tags]
    /// "*" = ["class", "/^aria-[\\w-]*$/"]
    /// table = ["summary"]
    /// ```
    pub fn from_toml(source: &str) -> Result<Self, AllowlistError> {
        let file: AllowlistFile = toml::from_str(source)?;
        let loaded = Self::from_tag_map(file.tags)?;
        if !file.extend_default {
            return Ok(loaded);
        }
        let mut merged = Self::default();
        for (tag, rules) in loaded.tags {
            merged.tags.entry(tag).or_default().extend(rules);
        }
        Ok(merged)
    }

    /// True when the element may stay. The wildcard key is not a tag.
    pub fn allows_tag(&self, tag: &str) -> bool {
        tag != WILDCARD && self.tags.contains_key(&tag.to_ascii_lowercase())
    }

    /// True when `attr` matches a rule for `tag` or for the wildcard.
    pub fn allows_attr(&self, tag: &str, attr: &str) -> bool {
        let tag = tag.to_ascii_lowercase();
        [WILDCARD, tag.as_str()]
            .iter()
            .filter_map(|key| self.tags.get(*key))
            .flatten()
            .any(|rule| rule.matches(attr))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn rules(&self, tag: &str) -> &[AttrRule] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for Allowlist {
    /// Markup safe for tooltips, popovers and feedback messages.
    fn default() -> Self {
        let mut list = Self::empty()
            .allow(WILDCARD, &["class", "dir", "id", "lang", "role"])
            .allow("a", &["target", "href", "title", "rel"])
            .allow("img", &["src", "srcset", "alt", "title", "width", "height"]);
        for tag in [
            "area", "b", "br", "col", "code", "div", "em", "hr", "h1", "h2", "h3", "h4", "h5",
            "h6", "i", "li", "ol", "p", "pre", "s", "small", "span", "sub", "sup", "strong", "u",
            "ul",
        ] {
            list = list.allow(tag, &[]);
        }
        match AttrRule::parse(&format!("/{ARIA_ATTRIBUTE_PATTERN}/")) {
            Ok(rule) => list.insert_rule(WILDCARD, rule),
            Err(err) => log::error!(target: "sanitizer", "built-in aria pattern rejected: {err}"),
        }
        list
    }
}
