use std::collections::BTreeSet;

/// Prefix shared by every forwarding rule in a dnsmasq list.
pub const SERVER_PREFIX: &str = "server=/";

/// A single line of the forwarding list.
///
/// `raw` keeps the line exactly as read, including its terminator, so that
/// untouched lines are written back byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    raw: String,
}

impl ConfigLine {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The line exactly as it appears in the file.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The line with surrounding whitespace and the terminator stripped.
    /// Rules match against this form.
    pub fn text(&self) -> &str {
        self.raw.trim()
    }

    /// Returns `true` if the line starts with `server=/`.
    pub fn is_server_rule(&self) -> bool {
        self.text().starts_with(SERVER_PREFIX)
    }

    /// Extracts the domain token: the substring between the first and the
    /// second `/`.
    ///
    /// Returns `None` when the line holds fewer than two `/` characters or the
    /// token is empty.
    pub fn domain(&self) -> Option<&str> {
        let mut parts = self.text().splitn(3, '/');
        parts.next()?;
        let domain = parts.next()?;
        parts.next()?;
        if domain.is_empty() { None } else { Some(domain) }
    }

    /// The text after the first `/` up to the next `/` or the end of the
    /// line. Unlike [`domain`](Self::domain) this never fails on a line that
    /// starts with `server=/`, which lets rules inspect half-formed entries.
    pub fn domain_candidate(&self) -> Option<&str> {
        let rest = self.text().strip_prefix(SERVER_PREFIX)?;
        Some(rest.split('/').next().unwrap_or(rest))
    }
}

/// The whole file as an ordered sequence of lines.
///
/// The lines read from disk form an immutable snapshot; removals only drop a
/// snapshot position from the live set, so iterating the snapshot while
/// removing can neither skip nor revisit a line.
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    snapshot: Vec<ConfigLine>,
    live: BTreeSet<usize>,
}

impl LineSet {
    /// Splits `content` into lines, keeping each terminator attached.
    pub fn parse(content: &str) -> Self {
        let snapshot: Vec<ConfigLine> = content.split_inclusive('\n').map(ConfigLine::new).collect();
        let live = (0..snapshot.len()).collect();
        Self { snapshot, live }
    }

    /// All lines as originally loaded, removed ones included.
    pub fn snapshot(&self) -> &[ConfigLine] {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns `true` if the snapshot line at `index` has not been removed.
    pub fn contains(&self, index: usize) -> bool {
        self.live.contains(&index)
    }

    /// Returns a copy of this set with the snapshot line at `index` removed.
    /// Returns `None` if that line is already gone.
    pub fn without(&self, index: usize) -> Option<Self> {
        if !self.contains(index) {
            return None;
        }
        let mut next = self.clone();
        next.live.remove(&index);
        Some(next)
    }

    /// Remaining lines in file order.
    pub fn lines(&self) -> impl Iterator<Item = &ConfigLine> {
        self.live.iter().map(|&i| &self.snapshot[i])
    }

    /// The file content for the remaining lines.
    pub fn render(&self) -> String {
        self.lines().map(ConfigLine::raw).collect()
    }
}
