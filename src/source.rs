//! The contract with the external fact source.
//!
//! The fact source is the helper that talks to the live package manager.
//! Everything about its lifecycle (spawning, pipes, restarts) belongs to the
//! implementor; this crate only defines the query surface, the JSON line a
//! query renders to, and the whitespace fact line that comes back.
use crate::error::{Error, ErrorContext, ErrorKind};
use crate::version::Version;

/// Helper protocol verbs for package queries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    WhatInstalled,
    WhatAvailable,
}

/// A per-repository toggle for a single query.
///
/// Serializes the way the helper expects it: `{"enable": "updates"}` or
/// `{"disable": "base"}`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoControl {
    Enable(String),
    Disable(String),
}

/// Convert `--enablerepo=`/`--disablerepo=` command line options into repo
/// toggles. Unrecognized options are ignored; repo lists may be
/// comma-separated.
pub fn parse_repo_options<S: AsRef<str>>(options: &[S]) -> Vec<RepoControl> {
    const ENABLE: &str = "--enablerepo=";
    const DISABLE: &str = "--disablerepo=";

    let mut repos = Vec::new();
    for opt in options {
        let opt = opt.as_ref();
        if opt.starts_with(ENABLE) {
            for repo in opt[ENABLE.len()..].split(',') {
                repos.push(RepoControl::Enable(repo.to_owned()));
            }
        } else if opt.starts_with(DISABLE) {
            for repo in opt[DISABLE.len()..].split(',') {
                repos.push(RepoControl::Disable(repo.to_owned()));
            }
        }
    }
    repos
}

/// A single package query for the fact source.
#[derive(Debug, Clone, Default)]
pub struct PackageQuery {
    provides: String,
    version: Option<String>,
    arch: Option<String>,
    repos: Vec<RepoControl>,
}

impl PackageQuery {
    /// Query for a package or capability name.
    pub fn name(name: impl Into<String>) -> PackageQuery {
        PackageQuery {
            provides: name.into(),
            ..Default::default()
        }
    }

    /// Constrain the query to a version (an EVR string, possibly partial).
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Constrain the query to an architecture.
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Restrict which repositories the source may consult.
    pub fn with_repos(mut self, repos: Vec<RepoControl>) -> Self {
        self.repos = repos;
        self
    }

    pub fn provides(&self) -> &str {
        &self.provides
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_ref().map(String::as_str)
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_ref().map(String::as_str)
    }

    pub fn repos(&self) -> &[RepoControl] {
        &self.repos
    }

    /// Render the single JSON line a helper consumes for this query.
    /// Absent fields are omitted entirely.
    pub fn render(&self, action: Action) -> Result<String, Error> {
        #[derive(Serialize)]
        struct Payload<'a> {
            action: Action,
            provides: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            version: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            arch: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            repos: Option<&'a [RepoControl]>,
        }

        let payload = Payload {
            action,
            provides: &self.provides,
            version: self.version(),
            arch: self.arch(),
            repos: if self.repos.is_empty() {
                None
            } else {
                Some(&self.repos)
            },
        };
        serde_json::to_string(&payload).context(ErrorKind::QueryEncode)
    }
}

/// One fact line from the helper: up to three whitespace-delimited tokens,
/// `"<version> <release> <arch>"`, where the literal token `nil` means the
/// field is absent.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RawFact {
    version: Option<String>,
    release: Option<String>,
    arch: Option<String>,
}

impl RawFact {
    /// Parse a fact line. Lenient: missing tokens are absent fields and
    /// extra tokens are ignored.
    pub fn parse(line: &str) -> RawFact {
        let mut tokens = line.split_whitespace().map(|token| {
            if token == "nil" {
                None
            } else {
                Some(token.to_owned())
            }
        });
        RawFact {
            version: tokens.next().unwrap_or(None),
            release: tokens.next().unwrap_or(None),
            arch: tokens.next().unwrap_or(None),
        }
    }

    /// A fact with no content, the source's way of saying "no such package".
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.release.is_none() && self.arch.is_none()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_ref().map(String::as_str)
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_ref().map(String::as_str)
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_ref().map(String::as_str)
    }

    /// The typed version carried by this fact. Epochs never cross the fact
    /// boundary, so the result has none.
    pub fn to_version(&self) -> Version {
        Version::from_parts(None, self.version.clone(), self.release.clone())
    }
}

/// The external fact source: something that can answer package queries by
/// asking the live package manager.
///
/// Calls are synchronous with a bounded deadline on the implementor's side.
/// A timeout, broken pipe or end of stream must surface as the matching
/// stale-class [`ErrorKind`] so the caller knows to invalidate its database
/// and retry (see [`PackageCache`](crate::PackageCache)).
pub trait FactSource {
    /// The best matching fact for a query, or an empty fact when nothing
    /// matches.
    fn query_package(&mut self, action: Action, query: &PackageQuery) -> Result<RawFact, Error>;

    /// The source's own version comparison: negative, zero or positive with
    /// the same sign semantics as [`compare`](crate::compare). Used as a
    /// cross-check entry point.
    fn compare_versions(&mut self, v1: &str, v2: &str) -> Result<i32, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_minimal_query() {
        let query = PackageQuery::name("zabbix-agent");
        let line = query.render(Action::WhatInstalled).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({"action": "whatinstalled", "provides": "zabbix-agent"})
        );
    }

    #[test]
    fn render_full_query() {
        let query = PackageQuery::name("zabbix-agent")
            .with_version("4.0.15-1.fc31")
            .with_arch("x86_64")
            .with_repos(vec![
                RepoControl::Enable("updates".to_owned()),
                RepoControl::Disable("base".to_owned()),
            ]);
        let line = query.render(Action::WhatAvailable).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "whatavailable",
                "provides": "zabbix-agent",
                "version": "4.0.15-1.fc31",
                "arch": "x86_64",
                "repos": [{"enable": "updates"}, {"disable": "base"}],
            })
        );
    }

    #[test]
    fn repo_options() {
        let options = ["--enablerepo=a,b", "--disablerepo=c", "--nogpgcheck"];
        assert_eq!(
            parse_repo_options(&options),
            vec![
                RepoControl::Enable("a".to_owned()),
                RepoControl::Enable("b".to_owned()),
                RepoControl::Disable("c".to_owned()),
            ]
        );
    }

    #[test]
    fn raw_fact_parse() {
        let fact = RawFact::parse("1.2.3 4.el7 x86_64");
        assert_eq!(fact.version(), Some("1.2.3"));
        assert_eq!(fact.release(), Some("4.el7"));
        assert_eq!(fact.arch(), Some("x86_64"));
        assert!(!fact.is_empty());
        assert_eq!(fact.to_version().to_string(), "1.2.3-4.el7");

        let fact = RawFact::parse("1.2 nil x86_64");
        assert_eq!(fact.version(), Some("1.2"));
        assert_eq!(fact.release(), None);
        assert_eq!(fact.arch(), Some("x86_64"));

        assert!(RawFact::parse("nil nil nil").is_empty());
        assert!(RawFact::parse("").is_empty());
        assert!(RawFact::parse("   ").is_empty());

        // trailing junk is ignored
        let fact = RawFact::parse("1.0 2 noarch something-else");
        assert_eq!(fact.arch(), Some("noarch"));
    }
}
