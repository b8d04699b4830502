use crate::builders::reporter::{Reporter, ScanMalformed, ScanMatch};
use crate::builders::rules::RemovalRule;
use crate::core::error::{PruneError, Result};
use crate::core::git::VcsClient;
use crate::core::lines::LineSet;
use crate::core::store::ConfigFile;
use std::thread;
use std::time::Duration;

/// Commit message for one removed domain.
pub fn commit_message(domain: &str) -> String {
    format!("accelerated-domains: remove {domain}")
}

/// A line that was removed and committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntry {
    /// 1-based line number in the file as loaded.
    pub line_number: usize,
    pub domain: String,
    pub rule: String,
}

/// What a run did.
#[derive(Debug)]
pub struct PruneOutcome {
    pub remaining: LineSet,
    pub removed: Vec<RemovedEntry>,
    /// Matched lines left in place because no domain token could be extracted.
    pub skipped: Vec<PruneError>,
}

impl PruneOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Drives the classify, rewrite, stage, commit loop over one file.
pub struct PruneEngine<'a> {
    file: &'a ConfigFile,
    vcs: &'a dyn VcsClient,
    reporter: &'a dyn Reporter,
    commit_delay: Duration,
}

impl<'a> PruneEngine<'a> {
    pub fn new(file: &'a ConfigFile, vcs: &'a dyn VcsClient, reporter: &'a dyn Reporter) -> Self {
        Self {
            file,
            vcs,
            reporter,
            commit_delay: Duration::ZERO,
        }
    }

    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Removes every line any of `rules` matches, one commit per line.
    ///
    /// Iteration runs over the snapshot loaded at the start; each removal
    /// produces a new working set, which is durably written before it is
    /// staged and committed. The first failure aborts the run, leaving earlier
    /// removals committed.
    pub fn run(&self, rules: &[Box<dyn RemovalRule>]) -> Result<PruneOutcome> {
        let mut working = self.file.load()?;
        let snapshot = working.snapshot().to_vec();
        let mut removed = Vec::new();
        let mut skipped = Vec::new();

        for (index, line) in snapshot.iter().enumerate() {
            for rule in rules {
                // An earlier rule may already have taken this line.
                if !working.contains(index) || !rule.matches(line) {
                    continue;
                }

                let Some(domain) = line.domain() else {
                    let err = PruneError::MalformedLine {
                        line_number: index + 1,
                        line: line.text().to_string(),
                    };
                    tracing::warn!(rule = %rule.name(), error = %err, "Skipping matched line");
                    self.reporter.warn(&format!("skipped, no domain token: {err}"));
                    skipped.push(err);
                    break;
                };

                let Some(next) = working.without(index) else {
                    continue;
                };
                self.file.write_durable(&next)?;
                self.vcs.stage(self.file.path())?;
                self.vcs.commit(&commit_message(domain))?;

                self.reporter.success(&format!("removed and committed: {domain}"));
                tracing::debug!(line = index + 1, %domain, rule = %rule.name(), "Removed line");
                removed.push(RemovedEntry {
                    line_number: index + 1,
                    domain: domain.to_string(),
                    rule: rule.name(),
                });
                working = next;

                if !self.commit_delay.is_zero() {
                    thread::sleep(self.commit_delay);
                }
            }
        }

        self.reporter.info(&format!("removed {} domain(s) in total", removed.len()));
        Ok(PruneOutcome {
            remaining: working,
            removed,
            skipped,
        })
    }
}

/// Classifies every line of `lines` without touching anything.
///
/// Each snapshot line is attributed to the first rule that matches it, the
/// same way [`PruneEngine::run`] would remove it.
pub fn scan(lines: &LineSet, rules: &[Box<dyn RemovalRule>]) -> (Vec<ScanMatch>, Vec<ScanMalformed>) {
    let mut matches = Vec::new();
    let mut malformed = Vec::new();

    for (index, line) in lines.snapshot().iter().enumerate() {
        if !lines.contains(index) {
            continue;
        }
        let Some(rule) = rules.iter().find(|r| r.matches(line)) else {
            continue;
        };
        match line.domain() {
            Some(domain) => matches.push(ScanMatch {
                line_number: index + 1,
                domain: domain.to_string(),
                rule: rule.name(),
            }),
            None => malformed.push(ScanMalformed {
                line_number: index + 1,
                line: line.text().to_string(),
                rule: rule.name(),
            }),
        }
    }

    (matches, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::reporter::Level;
    use crate::builders::rules::{DEFAULT_RESOLVER, Profile};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Stage(PathBuf),
        Commit(String),
    }

    /// Records calls; optionally fails the n-th commit, or deletes a file
    /// once the first commit has been recorded.
    #[derive(Default)]
    struct RecordingVcs {
        calls: RefCell<Vec<Call>>,
        fail_commit_at: Option<usize>,
        delete_after_first_commit: Option<PathBuf>,
    }

    impl RecordingVcs {
        fn commits(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Commit(m) => Some(m.clone()),
                    Call::Stage(_) => None,
                })
                .collect()
        }
    }

    impl VcsClient for RecordingVcs {
        fn stage(&self, path: &Path) -> Result<()> {
            self.calls.borrow_mut().push(Call::Stage(path.to_path_buf()));
            Ok(())
        }

        fn commit(&self, message: &str) -> Result<()> {
            if self.fail_commit_at == Some(self.commits().len()) {
                return Err(PruneError::VersionControl {
                    operation: "commit",
                    detail: "exit status: 1".to_string(),
                });
            }
            self.calls.borrow_mut().push(Call::Commit(message.to_string()));
            if self.commits().len() == 1 {
                if let Some(path) = &self.delete_after_first_commit {
                    fs::remove_file(path).unwrap();
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Quiet(RefCell<Vec<Level>>);

    impl Reporter for Quiet {
        fn status(&self, level: Level, _message: &str) {
            self.0.borrow_mut().push(level);
        }
    }

    fn write_list(content: &str) -> (tempfile::TempDir, ConfigFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accelerated-domains.china.conf");
        fs::write(&path, content).unwrap();
        let file = ConfigFile::open(&path).unwrap();
        (dir, file)
    }

    fn run(file: &ConfigFile, vcs: &RecordingVcs, profile: Profile) -> Result<PruneOutcome> {
        let reporter = Quiet::default();
        let rules = profile.rules(DEFAULT_RESOLVER).unwrap();
        PruneEngine::new(file, vcs, &reporter).run(&rules)
    }

    #[test]
    fn test_removes_top_line_with_one_commit() {
        let (_dir, file) = write_list("server=/example.top/114.114.114.114\n");
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Top).unwrap();

        assert_eq!(outcome.removed_count(), 1);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "");
        assert_eq!(
            *vcs.calls.borrow(),
            vec![
                Call::Stage(file.path().to_path_buf()),
                Call::Commit("accelerated-domains: remove example.top".to_string()),
            ]
        );
    }

    #[test]
    fn test_keeps_unrelated_lines_in_order() {
        let content = "server=/a.cn/114.114.114.114\n\
                       server=/x.top/114.114.114.114\n\
                       # comment\n\
                       server=/b.com/114.114.114.114\n\
                       server=/y.top/114.114.114.114\n\
                       server=/c.net/114.114.114.114";
        let (_dir, file) = write_list(content);
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Top).unwrap();

        assert_eq!(outcome.removed_count(), 2);
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "server=/a.cn/114.114.114.114\n\
             # comment\n\
             server=/b.com/114.114.114.114\n\
             server=/c.net/114.114.114.114"
        );
        assert_eq!(
            vcs.commits(),
            vec![
                "accelerated-domains: remove x.top",
                "accelerated-domains: remove y.top"
            ]
        );
    }

    #[test]
    fn test_no_matches_leaves_file_untouched() {
        let content = "server=/a.cn/114.114.114.114\nserver=/b.com/114.114.114.114\n";
        let (_dir, file) = write_list(content);
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Top).unwrap();

        assert_eq!(outcome.removed_count(), 0);
        assert!(vcs.calls.borrow().is_empty());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), content);
    }

    #[test]
    fn test_line_matching_both_rules_commits_once() {
        let (_dir, file) = write_list("server=/例子.xn--fiqs8s/114.114.114.114\n");
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Cn).unwrap();

        assert_eq!(outcome.removed_count(), 1);
        assert_eq!(outcome.removed[0].rule, "cjk-ideographs");
        assert_eq!(vcs.commits(), vec!["accelerated-domains: remove 例子.xn--fiqs8s"]);
    }

    #[test]
    fn test_cjk_rule_alone() {
        let (_dir, file) = write_list(
            "server=/中文.cn/114.114.114.114\nserver=/plain.cn/114.114.114.114\n",
        );
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Cn).unwrap();

        assert_eq!(outcome.removed[0].rule, "cjk-ideographs");
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "server=/plain.cn/114.114.114.114\n"
        );
    }

    #[test]
    fn test_duplicates_are_removed_one_commit_each() {
        let line = "server=/dup.top/114.114.114.114\n";
        let (_dir, file) = write_list(&format!("{line}keep\n{line}"));
        let vcs = RecordingVcs::default();

        let outcome = run(&file, &vcs, Profile::Top).unwrap();

        assert_eq!(outcome.removed_count(), 2);
        assert_eq!(outcome.removed[0].line_number, 1);
        assert_eq!(outcome.removed[1].line_number, 3);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "keep\n");
    }

    #[test]
    fn test_malformed_match_is_skipped() {
        let content = "server=/例子\nserver=/ok.cn/114.114.114.114\n";
        let (_dir, file) = write_list(content);
        let vcs = RecordingVcs::default();
        let reporter = Quiet::default();
        let rules = Profile::Cn.rules(DEFAULT_RESOLVER).unwrap();

        let outcome = PruneEngine::new(&file, &vcs, &reporter).run(&rules).unwrap();

        assert_eq!(outcome.removed_count(), 0);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(outcome.skipped[0], PruneError::MalformedLine { line_number: 1, .. }));
        assert!(reporter.0.borrow().contains(&Level::Warn));
        assert!(vcs.calls.borrow().is_empty());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), content);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let (_dir, file) = write_list(
            "server=/a.top/114.114.114.114\nserver=/b.cn/114.114.114.114\n",
        );
        let vcs = RecordingVcs::default();
        run(&file, &vcs, Profile::Top).unwrap();

        let again = RecordingVcs::default();
        let outcome = run(&file, &again, Profile::Top).unwrap();

        assert_eq!(outcome.removed_count(), 0);
        assert!(again.calls.borrow().is_empty());
    }

    #[test]
    fn test_commit_failure_aborts_and_keeps_progress() {
        let (_dir, file) = write_list(
            "server=/a.top/114.114.114.114\n\
             server=/b.top/114.114.114.114\n\
             server=/c.top/114.114.114.114\n",
        );
        let vcs = RecordingVcs {
            fail_commit_at: Some(1),
            ..Default::default()
        };

        let err = run(&file, &vcs, Profile::Top).unwrap_err();

        assert!(matches!(err, PruneError::VersionControl { .. }));
        assert_eq!(vcs.commits(), vec!["accelerated-domains: remove a.top"]);
        // The failed line's rewrite stays on disk; the third line is untouched.
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "server=/c.top/114.114.114.114\n"
        );
    }

    #[test]
    fn test_write_failure_aborts_before_staging() {
        let (_dir, file) = write_list(
            "server=/a.top/114.114.114.114\n\
             server=/b.top/114.114.114.114\n\
             server=/c.top/114.114.114.114\n",
        );
        let vcs = RecordingVcs {
            delete_after_first_commit: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let err = run(&file, &vcs, Profile::Top).unwrap_err();

        assert!(matches!(err, PruneError::Io { .. }));
        // Only the first line got as far as git; nothing was staged for the second.
        assert_eq!(
            *vcs.calls.borrow(),
            vec![
                Call::Stage(file.path().to_path_buf()),
                Call::Commit("accelerated-domains: remove a.top".to_string()),
            ]
        );
        assert!(!file.path().exists());
    }

    #[test]
    fn test_scan_attributes_first_rule() {
        let lines = LineSet::parse(
            "server=/例子.xn--fiqs8s/114.114.114.114\n\
             server=/中文.cn/114.114.114.114\n\
             server=/例子\n\
             server=/plain.xn--fiqs8s/114.114.114.114\n\
             server=/plain.cn/114.114.114.114\n",
        );
        let rules = Profile::Cn.rules(DEFAULT_RESOLVER).unwrap();

        let (matches, malformed) = scan(&lines, &rules);

        let found: Vec<(usize, &str)> = matches.iter().map(|m| (m.line_number, m.rule.as_str())).collect();
        assert_eq!(
            found,
            vec![
                (1, "cjk-ideographs"),
                (2, "cjk-ideographs"),
                (4, "suffix:.xn--fiqs8s"),
            ]
        );
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].line_number, 3);
    }
}
