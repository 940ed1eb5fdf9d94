//! The in-memory multi-index package database.
use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::dep::Dependency;
use crate::package::DbPackage;

/// Simple storage for package records: keeps them unique by nevra and
/// queryable by name and by provided capability.
///
/// The nevra index is canonical storage; the name and provides indices hold
/// nevra keys into it, never a second copy of the record. Re-pushing a known
/// nevra refreshes only its observed state, not its identity. Invalidation
/// is wholesale: [`clear`](PackageDb::clear) and reload, never a partial
/// patch.
#[derive(Debug, Default)]
pub struct PackageDb {
    /// package name -> nevras of every version/arch seen under that name
    names: HashMap<String, Vec<String>>,
    /// nevra -> the canonical record
    index: HashMap<String, DbPackage>,
    /// capability name -> nevras of the packages providing it
    provides: HashMap<String, Vec<String>>,
    /// nevras last reported installed
    installed: HashSet<String>,
    /// nevras last reported available
    available: HashSet<String>,
}

impl PackageDb {
    pub fn new() -> PackageDb {
        Default::default()
    }

    /// Insert a package record, or refresh the state of one we already have.
    ///
    /// A nevra seen before keeps its identity fields; only its
    /// installed/available state and repo id are overwritten, and the
    /// membership sets are rewritten to reflect this push.
    pub fn push(&mut self, pkg: DbPackage) {
        let nevra = pkg.nevra();
        if let Some(existing) = self.index.get_mut(&nevra) {
            debug!("refreshing state of {}", nevra);
            existing.set_state(pkg.state());
            existing.set_repo_id(pkg.repo_id().to_owned());
        } else {
            self.names
                .entry(pkg.name().to_owned())
                .or_insert_with(Vec::new)
                .push(nevra.clone());
            for provide in pkg.provides() {
                self.provides
                    .entry(provide.name().to_owned())
                    .or_insert_with(Vec::new)
                    .push(nevra.clone());
            }
            self.index.insert(nevra.clone(), pkg);
        }

        let entry = &self.index[&nevra];
        if entry.installed() {
            self.installed.insert(nevra.clone());
        } else {
            self.installed.remove(&nevra);
        }
        if entry.available() {
            self.available.insert(nevra);
        } else {
            self.available.remove(&nevra);
        }
    }

    /// All packages with the given name, highest version first, or `None`
    /// if the name is unknown.
    pub fn lookup(&self, name: &str) -> Option<Vec<&DbPackage>> {
        self.names.get(name).map(|nevras| {
            let mut pkgs: Vec<&DbPackage> = nevras
                .iter()
                .filter_map(|nevra| self.index.get(nevra))
                .collect();
            pkgs.sort_by(|x, y| y.package().compare(x.package()));
            pkgs
        })
    }

    /// Every package with a provide that satisfies `requirement`. Each
    /// package appears once even when several of its provides match. An
    /// unknown capability is an empty result, not an error.
    pub fn what_provides(&self, requirement: &Dependency) -> Vec<&DbPackage> {
        let nevras = match self.provides.get(requirement.name()) {
            Some(nevras) => nevras,
            None => return Vec::new(),
        };
        nevras
            .iter()
            .unique()
            .filter_map(|nevra| self.index.get(nevra))
            .filter(|pkg| {
                pkg.provides()
                    .iter()
                    .filter(|provide| provide.name() == requirement.name())
                    .any(|provide| requirement.satisfied_by(provide))
            })
            .collect()
    }

    /// Was this package reported installed on the last push?
    pub fn installed(&self, pkg: &DbPackage) -> bool {
        self.installed.contains(&pkg.nevra())
    }

    /// Was this package reported available on the last push?
    pub fn available(&self, pkg: &DbPackage) -> bool {
        self.available.contains(&pkg.nevra())
    }

    /// Number of distinct package names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn installed_len(&self) -> usize {
        self.installed.len()
    }

    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Drop everything. The database is rebuilt wholesale after the fact
    /// source restarts; there is no incremental eviction.
    pub fn clear(&mut self) {
        debug!("clearing package database ({} names)", self.names.len());
        self.names.clear();
        self.index.clear();
        self.provides.clear();
        self.clear_installed();
        self.clear_available();
    }

    pub fn clear_installed(&mut self) {
        self.installed.clear();
    }

    pub fn clear_available(&mut self) {
        self.available.clear();
    }
}
