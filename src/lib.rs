//! A library that reproduces the RPM/yum view of package versions and
//! dependencies: which of two version strings is newer, whether an installed
//! package satisfies a `name op version` constraint, and which packages
//! provide a capability.
//!
//! The ordering and satisfaction rules deliberately match the native tool
//! bit for bit, quirks included, because callers make install/upgrade
//! decisions that must agree with it. The pieces:
//!
//!  - [`rpmvercmp`]/[`parse_evr`]: the segment comparator and the lenient
//!    `epoch:version-release` parser
//!  - [`Version`], [`Dependency`], [`Package`]: typed values built once at
//!    the parsing boundary
//!  - [`PackageDb`]: an in-memory multi-index store (by name, by identity,
//!    by provided capability)
//!  - [`PackageCache`]: the handle tying a database to a [`FactSource`],
//!    with coarse invalidate-and-retry on source failures
//!
//! Nothing here installs or modifies packages, resolves transitive
//! dependency graphs, or persists anything across processes.

#[macro_use]
extern crate bitflags;
extern crate atoi;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
#[cfg(not(windows))]
extern crate uname;

mod db;
mod dep;
mod error;
mod package;
mod source;
mod version;

pub use crate::db::PackageDb;
pub use crate::dep::{CmpOp, Dependency};
pub use crate::error::{Error, ErrorContext, ErrorKind};
pub use crate::package::{DbPackage, Package, PackageState};
pub use crate::source::{parse_repo_options, Action, FactSource, PackageQuery, RawFact, RepoControl};
pub use crate::version::{compare, parse_evr, rpmvercmp, Version};

use std::cmp::Ordering;

/// How many times a failed fact-source query is attempted before giving up.
/// Every failed attempt invalidates the whole package database first.
pub const MAX_QUERY_RETRIES: usize = 5;

/// Handle to a package database together with the fact source feeding it.
///
/// The source is owned, not global: whoever builds the cache decides where
/// facts come from and manages that collaborator's lifecycle. The cache
/// itself is single-threaded and synchronous; share it across threads only
/// behind external synchronization.
pub struct PackageCache<S: FactSource> {
    db: PackageDb,
    source: S,
    arch: String,
}

impl<S: FactSource> PackageCache<S> {
    /// Create a builder for a cache around the given fact source.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rpmdb::{PackageCache, FactSource, Action, PackageQuery, RawFact, Error};
    /// # struct Helper;
    /// # impl FactSource for Helper {
    /// #     fn query_package(&mut self, _: Action, _: &PackageQuery) -> Result<RawFact, Error> {
    /// #         unimplemented!()
    /// #     }
    /// #     fn compare_versions(&mut self, _: &str, _: &str) -> Result<i32, Error> {
    /// #         unimplemented!()
    /// #     }
    /// # }
    /// let cache = PackageCache::with_source(Helper)
    ///     .with_arch("x86_64")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_source(source: S) -> PackageCacheBuilder<S> {
        PackageCacheBuilder { source, arch: None }
    }

    /// The database underneath, for direct queries.
    pub fn db(&self) -> &PackageDb {
        &self.db
    }

    /// The default architecture used when a fact does not carry one.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Ingest one package record.
    pub fn push(&mut self, pkg: DbPackage) {
        self.db.push(pkg)
    }

    /// Coarse invalidation: drop the whole database so the next reload
    /// starts from nothing. There is no partial eviction.
    pub fn reset(&mut self) {
        debug!("resetting package cache");
        self.db.clear();
    }

    /// All packages with the given name, highest version first.
    pub fn lookup(&self, name: &str) -> Option<Vec<&DbPackage>> {
        self.db.lookup(name)
    }

    /// Every package satisfying the requirement through one of its provides.
    pub fn what_provides(&self, requirement: &Dependency) -> Vec<&DbPackage> {
        self.db.what_provides(requirement)
    }

    /// The version of the installed package with this name, formatted
    /// `"version.arch"` for display, or `None` when nothing is installed.
    pub fn installed_version(&mut self, name: &str) -> Result<Option<String>, Error> {
        self.fact_version(Action::WhatInstalled, name)
    }

    /// The best available version of the named package, formatted
    /// `"version.arch"`, or `None` when no repository carries it.
    pub fn available_version(&mut self, name: &str) -> Result<Option<String>, Error> {
        self.fact_version(Action::WhatAvailable, name)
    }

    /// Ask the fact source to compare two version strings. Same sign
    /// semantics as [`compare`]; useful as a cross-check against the local
    /// comparator.
    pub fn compare_versions(&mut self, v1: &str, v2: &str) -> Result<Ordering, Error> {
        let sign = self.with_retries(|source| source.compare_versions(v1, v2))?;
        Ok(sign.cmp(&0))
    }

    fn fact_version(&mut self, action: Action, name: &str) -> Result<Option<String>, Error> {
        let query = PackageQuery::name(name);
        let fact = self.with_retries(|source| source.query_package(action, &query))?;
        if fact.version().is_none() {
            return Ok(None);
        }
        let version = fact.to_version();
        let arch = fact.arch().unwrap_or(&self.arch);
        Ok(Some(format!("{}.{}", version, arch)))
    }

    /// Run a fact-source call with the retry contract: a stale-class
    /// failure invalidates the whole database and tries again, anything
    /// else propagates at once, and exhausting the budget is fatal with the
    /// last source error attached.
    fn with_retries<T, F>(&mut self, mut op: F) -> Result<T, Error>
    where
        F: FnMut(&mut S) -> Result<T, Error>,
    {
        let mut last = None;
        for attempt in 1..=MAX_QUERY_RETRIES {
            match op(&mut self.source) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_stale() {
                        return Err(e);
                    }
                    warn!(
                        "fact source failed (attempt {}/{}): {}; invalidating package database",
                        attempt, MAX_QUERY_RETRIES, e
                    );
                    self.db.clear();
                    last = Some(e);
                }
            }
        }
        Err(match last {
            Some(e) => Error::retries_exhausted(MAX_QUERY_RETRIES, e),
            None => ErrorKind::SourceRetriesExhausted(MAX_QUERY_RETRIES).into(),
        })
    }
}

/// Builder-pattern constructor for [`PackageCache`].
///
/// Use `PackageCache::with_source` to get one, `build` to finish. The
/// default architecture comes from the host unless overridden.
pub struct PackageCacheBuilder<S: FactSource> {
    source: S,
    arch: Option<String>,
}

impl<S: FactSource> PackageCacheBuilder<S> {
    /// Use a fixed default architecture instead of detecting the host's.
    pub fn with_arch(mut self, arch: impl AsRef<str>) -> Self {
        self.arch = Some(arch.as_ref().to_owned());
        self
    }

    /// Build the cache.
    pub fn build(self) -> Result<PackageCache<S>, Error> {
        #[cfg(not(windows))]
        let arch = match self.arch {
            Some(arch) => arch,
            None => {
                let info = uname::uname().context(ErrorKind::HostArch)?;
                info!("detected arch: {}", &info.machine);
                info.machine
            }
        };
        #[cfg(windows)]
        let arch = match self.arch {
            Some(arch) => arch,
            None => {
                error!("no way to detect the arch on windows, assuming x86_64");
                "x86_64".to_owned()
            }
        };
        debug!("default arch: {}", &arch);

        Ok(PackageCache {
            db: PackageDb::new(),
            source: self.source,
            arch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// A fact source that replays a scripted sequence of replies.
    struct ScriptedSource {
        replies: VecDeque<Result<RawFact, Error>>,
        calls: usize,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<RawFact, Error>>) -> ScriptedSource {
            ScriptedSource {
                replies: replies.into_iter().collect(),
                calls: 0,
            }
        }
    }

    impl FactSource for ScriptedSource {
        fn query_package(
            &mut self,
            _action: Action,
            _query: &PackageQuery,
        ) -> Result<RawFact, Error> {
            self.calls += 1;
            self.replies
                .pop_front()
                .unwrap_or_else(|| Ok(RawFact::default()))
        }

        fn compare_versions(&mut self, v1: &str, v2: &str) -> Result<i32, Error> {
            self.calls += 1;
            Ok(match compare(v1, v2) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            })
        }
    }

    fn timeout() -> Error {
        io::Error::new(io::ErrorKind::TimedOut, "deadline").into()
    }

    fn cache(replies: Vec<Result<RawFact, Error>>) -> PackageCache<ScriptedSource> {
        PackageCache::with_source(ScriptedSource::new(replies))
            .with_arch("x86_64")
            .build()
            .unwrap()
    }

    fn installed_pkg(name: &str) -> DbPackage {
        DbPackage::new(
            Package::from_evr(name, "1.0-1", "x86_64", vec![]),
            PackageState::INSTALLED,
            "base",
        )
    }

    #[test]
    fn installed_version_formats_for_display() {
        let mut cache = cache(vec![Ok(RawFact::parse("1.2.3 4.el7 x86_64"))]);
        let version = cache.installed_version("foo").unwrap();
        assert_eq!(version, Some("1.2.3-4.el7.x86_64".to_owned()));
    }

    #[test]
    fn fact_without_arch_uses_the_default() {
        let mut cache = cache(vec![Ok(RawFact::parse("2.0 nil nil"))]);
        let version = cache.available_version("foo").unwrap();
        assert_eq!(version, Some("2.0.x86_64".to_owned()));
    }

    #[test]
    fn empty_fact_is_a_miss() {
        let mut cache = cache(vec![Ok(RawFact::parse("nil nil nil"))]);
        assert_eq!(cache.installed_version("foo").unwrap(), None);
    }

    #[test]
    fn stale_failures_invalidate_and_retry() {
        let _ = env_logger::try_init();
        let mut cache = cache(vec![
            Err(timeout()),
            Err(timeout()),
            Ok(RawFact::parse("1.0 1 x86_64")),
        ]);
        cache.push(installed_pkg("foo"));
        assert!(!cache.db().is_empty());

        let version = cache.installed_version("foo").unwrap();
        assert_eq!(version, Some("1.0-1.x86_64".to_owned()));
        assert_eq!(cache.source.calls, 3);
        // each failed attempt wiped the database
        assert!(cache.db().is_empty());
    }

    #[test]
    fn retries_exhaust_with_the_last_error_attached() {
        let replies: Vec<Result<RawFact, Error>> =
            (0..MAX_QUERY_RETRIES).map(|_| Err(timeout())).collect();
        let mut cache = cache(replies);

        let err = cache.installed_version("foo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SourceRetriesExhausted(MAX_QUERY_RETRIES));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(cache.source.calls, MAX_QUERY_RETRIES);
    }

    #[test]
    fn fatal_errors_do_not_retry() {
        let mut cache = cache(vec![
            Err(ErrorKind::QueryEncode.into()),
            Ok(RawFact::parse("1.0 1 x86_64")),
        ]);
        cache.push(installed_pkg("foo"));

        let err = cache.installed_version("foo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::QueryEncode);
        assert_eq!(cache.source.calls, 1);
        // a non-stale failure leaves the database alone
        assert!(!cache.db().is_empty());
    }

    #[test]
    fn source_backed_compare() {
        let mut cache = cache(vec![]);
        assert_eq!(cache.compare_versions("2:1.0", "1.9").unwrap(), Ordering::Greater);
        assert_eq!(cache.compare_versions("1.0", "1.0").unwrap(), Ordering::Equal);
        assert_eq!(cache.compare_versions("0.9", "1.0-1").unwrap(), Ordering::Less);
    }

    #[test]
    fn cache_delegates_to_the_db() {
        let mut cache = cache(vec![]);
        cache.push(installed_pkg("foo"));
        assert_eq!(cache.lookup("foo").unwrap().len(), 1);
        assert_eq!(cache.what_provides(&Dependency::parse("foo")).len(), 1);

        cache.reset();
        assert!(cache.lookup("foo").is_none());
    }
}
