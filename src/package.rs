//! Package identity and the database record wrapping it.
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use crate::dep::Dependency;
use crate::version::Version;

/// A package: name, version, architecture and the capabilities it provides.
///
/// Immutable once built. Every package provides at least itself at its own
/// version, so an empty provides list is filled in at construction.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    version: Version,
    arch: String,
    provides: Vec<Dependency>,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        version: Version,
        arch: impl Into<String>,
        provides: Vec<Dependency>,
    ) -> Package {
        let name = name.into();
        let provides = if provides.is_empty() {
            // we always have one, ourselves!
            vec![Dependency::provide(name.clone(), version.clone())]
        } else {
            provides
        };
        Package {
            name,
            version,
            arch: arch.into(),
            provides,
        }
    }

    /// Build a package from a raw `epoch:version-release` string.
    pub fn from_evr(
        name: impl Into<String>,
        evr: &str,
        arch: impl Into<String>,
        provides: Vec<Dependency>,
    ) -> Package {
        Package::new(name, Version::parse(evr), arch, provides)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn provides(&self) -> &[Dependency] {
        &self.provides
    }

    /// The fully qualified identity, `name-epoch:version-release.arch`.
    /// This is the deduplication key everywhere else.
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.version.evr(), self.arch)
    }

    /// Total order by name, then version, then arch.
    pub fn compare(&self, other: &Package) -> Ordering {
        // easy! :)
        if self.nevra() == other.nevra() {
            return Ordering::Equal;
        }
        match self.name.cmp(&other.name) {
            Ordering::Equal => (),
            ord => return ord,
        }
        match self.version.compare(&other.version) {
            Ordering::Equal => (),
            ord => return ord,
        }
        self.arch.cmp(&other.arch)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Package {}

bitflags! {
    /// Where a package was observed: on the system, in a repository, or both.
    pub struct PackageState: u8 {
        const INSTALLED = 0b01;
        const AVAILABLE = 0b10;
    }
}

/// A package as the database sees it: the immutable identity plus the
/// observed state and originating repository, which may be overwritten on
/// every reload.
#[derive(Debug, Clone)]
pub struct DbPackage {
    package: Package,
    state: PackageState,
    repo_id: String,
}

impl DbPackage {
    pub fn new(package: Package, state: PackageState, repo_id: impl Into<String>) -> DbPackage {
        DbPackage {
            package,
            state,
            repo_id: repo_id.into(),
        }
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn state(&self) -> PackageState {
        self.state
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn installed(&self) -> bool {
        self.state.contains(PackageState::INSTALLED)
    }

    pub fn available(&self) -> bool {
        self.state.contains(PackageState::AVAILABLE)
    }

    pub(crate) fn set_state(&mut self, state: PackageState) {
        self.state = state;
    }

    pub(crate) fn set_repo_id(&mut self, repo_id: String) {
        self.repo_id = repo_id;
    }
}

impl Deref for DbPackage {
    type Target = Package;

    fn deref(&self) -> &Package {
        &self.package
    }
}
