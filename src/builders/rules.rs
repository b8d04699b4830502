use crate::core::error::{PruneError, Result};
use crate::core::lines::ConfigLine;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Resolver address every entry of the upstream list forwards to.
pub const DEFAULT_RESOLVER: &str = "114.114.114.114";

/// CJK Unified Ideographs.
const CJK_UNIFIED: RangeInclusive<char> = '\u{4E00}'..='\u{9FFF}';
/// CJK Unified Ideographs Extension A.
const CJK_EXTENSION_A: RangeInclusive<char> = '\u{3400}'..='\u{4DBF}';

/// The `RemovalRule` trait decides whether a line should leave the list.
///
/// Rules are pure: they look at one line and never at the rest of the file,
/// which lets the engine evaluate them against an immutable snapshot.
pub trait RemovalRule {
    /// Short name used in reports (e.g. `suffix:.top`).
    fn name(&self) -> String;

    /// Returns `true` if `line` should be removed.
    fn matches(&self, line: &ConfigLine) -> bool;
}

/// Matches `server=/<anything>.<tld>/<resolver>` exactly.
#[derive(Debug, Clone)]
pub struct SuffixRule {
    tld: String,
    regex: Regex,
}

impl SuffixRule {
    /// Builds the rule for a top-level domain label and resolver address.
    /// Both are matched literally.
    pub fn new(tld: &str, resolver: &str) -> Result<Self> {
        let pattern = format!(
            r"^server=/.*\.{}/{}$",
            regex::escape(tld),
            regex::escape(resolver)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| PruneError::InvalidSettings(format!("bad suffix rule for {tld}: {e}")))?;
        Ok(Self {
            tld: tld.to_string(),
            regex,
        })
    }
}

impl RemovalRule for SuffixRule {
    fn name(&self) -> String {
        format!("suffix:.{}", self.tld)
    }

    fn matches(&self, line: &ConfigLine) -> bool {
        line.is_server_rule() && self.regex.is_match(line.text())
    }
}

/// Matches `server=/` lines whose domain contains a CJK ideograph from the
/// basic block or Extension A.
#[derive(Debug, Clone, Copy, Default)]
pub struct CjkRule;

impl CjkRule {
    pub fn is_cjk(c: char) -> bool {
        CJK_UNIFIED.contains(&c) || CJK_EXTENSION_A.contains(&c)
    }
}

impl RemovalRule for CjkRule {
    fn name(&self) -> String {
        "cjk-ideographs".to_string()
    }

    fn matches(&self, line: &ConfigLine) -> bool {
        line.domain_candidate()
            .is_some_and(|domain| domain.chars().any(Self::is_cjk))
    }
}

/// The two pruning configurations the tool ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Remove every `.top` entry.
    Top,
    /// Remove every `.xn--fiqs8s` (`.中国`) entry and every entry whose domain
    /// is written in CJK ideographs.
    Cn,
}

impl Profile {
    /// Label of the top-level domain this profile's suffix rule targets.
    pub fn tld(self) -> &'static str {
        match self {
            Profile::Top => "top",
            Profile::Cn => "xn--fiqs8s",
        }
    }

    /// The rules of this profile, in evaluation order.
    ///
    /// For `cn` the CJK rule comes first, so a line like
    /// `server=/例子.xn--fiqs8s/...` that both rules match is credited to it.
    pub fn rules(self, resolver: &str) -> Result<Vec<Box<dyn RemovalRule>>> {
        let mut rules: Vec<Box<dyn RemovalRule>> = Vec::new();
        if self == Profile::Cn {
            rules.push(Box::new(CjkRule));
        }
        rules.push(Box::new(SuffixRule::new(self.tld(), resolver)?));
        Ok(rules)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Top => write!(f, "top"),
            Profile::Cn => write!(f, "cn"),
        }
    }
}
