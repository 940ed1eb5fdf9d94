//! Dependencies (requires and provides) and the satisfaction predicate.
use std::cmp::Ordering;
use std::fmt;

use crate::version::Version;

/// A version comparison operator in a dependency spec.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CmpOp {
    Less,
    LessEq,
    Equal,
    GreaterEq,
    Greater,
}

impl CmpOp {
    /// Parse an operator token; `=` and `==` both mean equality.
    pub fn parse(token: &str) -> Option<CmpOp> {
        match token {
            "<" => Some(CmpOp::Less),
            "<=" => Some(CmpOp::LessEq),
            "=" | "==" => Some(CmpOp::Equal),
            ">=" => Some(CmpOp::GreaterEq),
            ">" => Some(CmpOp::Greater),
            _ => None,
        }
    }

    /// Operators whose range includes the version itself.
    fn is_inclusive(self) -> bool {
        match self {
            CmpOp::Equal | CmpOp::LessEq | CmpOp::GreaterEq => true,
            CmpOp::Less | CmpOp::Greater => false,
        }
    }

    fn accepts_greater(self) -> bool {
        match self {
            CmpOp::Greater | CmpOp::GreaterEq => true,
            _ => false,
        }
    }

    fn accepts_less(self) -> bool {
        match self {
            CmpOp::Less | CmpOp::LessEq => true,
            _ => false,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let token = match self {
            CmpOp::Less => "<",
            CmpOp::LessEq => "<=",
            CmpOp::Equal => "=",
            CmpOp::GreaterEq => ">=",
            CmpOp::Greater => ">",
        };
        write!(f, "{}", token)
    }
}

/// A named capability, optionally constrained to a version range.
///
/// The same type expresses both sides of dependency resolution: what a
/// package *provides* and what a requirement *asks for*. A bare name (no
/// version, no operator) constrains nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    name: String,
    version: Option<Version>,
    flag: Option<CmpOp>,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        version: Option<Version>,
        flag: Option<CmpOp>,
    ) -> Dependency {
        Dependency {
            name: name.into(),
            version,
            flag,
        }
    }

    /// An exact-version provide, the shape every package self-provides.
    pub fn provide(name: impl Into<String>, version: Version) -> Dependency {
        Dependency::new(name, Some(version), Some(CmpOp::Equal))
    }

    /// Parse a dependency spec.
    ///
    /// Two forms are accepted:
    ///
    /// ```text
    /// mtr >= 2:0.71-3.0
    /// mta
    /// ```
    ///
    /// Anything that is not exactly `name op evr` is taken verbatim as a
    /// bare name. Lenient, never fails.
    pub fn parse(spec: &str) -> Dependency {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        if tokens.len() == 3 {
            if let Some(flag) = CmpOp::parse(tokens[1]) {
                return Dependency::new(
                    tokens[0],
                    Some(Version::parse(tokens[2])),
                    Some(flag),
                );
            }
        }
        Dependency::new(spec, None, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn flag(&self) -> Option<CmpOp> {
        self.flag
    }

    /// Does `provider` satisfy the requirement expressed by `self`?
    ///
    /// The sense is the partial comparison of the two versions (a missing
    /// version on either side matches anything), then the rpmdsCompare
    /// truth table decides: overlapping open ranges on either side of the
    /// sense, or compatible inclusive operators when the versions tie. An
    /// unflagged dependency behaves as an exact-version one.
    pub fn satisfied_by(&self, provider: &Dependency) -> bool {
        if self.name != provider.name {
            return false;
        }

        let sense = match (&self.version, &provider.version) {
            (Some(mine), Some(theirs)) => mine.partial_compare(theirs),
            _ => Ordering::Equal,
        };
        let req = self.flag.unwrap_or(CmpOp::Equal);
        let prov = provider.flag.unwrap_or(CmpOp::Equal);

        match sense {
            Ordering::Less => req.accepts_greater() || prov.accepts_less(),
            Ordering::Greater => req.accepts_less() || prov.accepts_greater(),
            Ordering::Equal => {
                (req.is_inclusive() && prov.is_inclusive())
                    || (req == CmpOp::Less && prov == CmpOp::Less)
                    || (req == CmpOp::Greater && prov == CmpOp::Greater)
            }
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.version, self.flag) {
            (Some(version), Some(flag)) => write!(f, "{} {} {}", self.name, flag, version),
            _ => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_constrained() {
        let dep = Dependency::parse("mtr >= 2:0.71-3.0");
        assert_eq!(dep.name(), "mtr");
        assert_eq!(dep.flag(), Some(CmpOp::GreaterEq));
        let version = dep.version().unwrap();
        assert_eq!(version.epoch(), Some(2));
        assert_eq!(version.version(), Some("0.71"));
        assert_eq!(version.release(), Some("3.0"));

        assert_eq!(Dependency::parse("foo = 1.2").flag(), Some(CmpOp::Equal));
        assert_eq!(Dependency::parse("foo == 1.2").flag(), Some(CmpOp::Equal));
    }

    #[test]
    fn parse_bare() {
        let dep = Dependency::parse("mta");
        assert_eq!(dep.name(), "mta");
        assert!(dep.version().is_none());
        assert!(dep.flag().is_none());

        // anything that is not exactly `name op evr` stays a bare name
        assert_eq!(Dependency::parse("foo ~> 1.2").name(), "foo ~> 1.2");
        assert_eq!(Dependency::parse("foo >= 1.2 extra").name(), "foo >= 1.2 extra");
    }

    #[test]
    fn satisfy_ranges() {
        let test_set = vec![
            // requirement, provider, expected
            ("foo >= 1.2", "foo = 1.5", true),
            ("foo >= 1.2", "foo = 1.0", false),
            ("foo > 1.0", "foo = 1.5", true),
            ("foo < 2.0", "foo < 1.0", true),
            ("foo <= 1.0", "foo = 2.0", false),
            ("foo < 2.0", "foo = 1.0", true),
            ("foo >= 1.0", "foo >= 0.9", true),
            ("foo > 1.0", "foo >= 0.9", true),
            ("bar >= 1.2", "foo = 1.5", false),
        ];
        for (req, prov, expected) in test_set {
            assert_eq!(
                Dependency::parse(req).satisfied_by(&Dependency::parse(prov)),
                expected,
                r#"satisfied_by("{}", "{}")"#,
                req,
                prov
            );
        }
    }

    #[test]
    fn satisfy_equal_sense_boundary() {
        // versions tie: inclusive operators on both sides match...
        let test_set = vec![
            ("foo >= 1.2", "foo = 1.2", true),
            ("foo = 1.2", "foo >= 1.2", true),
            ("foo <= 1.2", "foo >= 1.2", true),
            // ...a strict operator on one side only does not...
            ("foo > 1.2", "foo = 1.2", false),
            ("foo < 1.2", "foo = 1.2", false),
            ("foo <= 1.2", "foo > 1.2", false),
            // ...and the same strict operator on both sides does
            ("foo < 1.2", "foo < 1.2", true),
            ("foo > 1.2", "foo > 1.2", true),
            ("foo < 1.2", "foo > 1.2", false),
        ];
        for (req, prov, expected) in test_set {
            assert_eq!(
                Dependency::parse(req).satisfied_by(&Dependency::parse(prov)),
                expected,
                r#"satisfied_by("{}", "{}")"#,
                req,
                prov
            );
        }
    }

    #[test]
    fn satisfy_bare_and_partial() {
        // a bare requirement constrains nothing
        assert!(Dependency::parse("foo").satisfied_by(&Dependency::parse("foo = 1.5")));
        // a bare provide matches any inclusive requirement
        assert!(Dependency::parse("foo >= 1.2").satisfied_by(&Dependency::parse("foo")));
        // partial version match: requirement omits the release
        assert!(Dependency::parse("foo = 1.2").satisfied_by(&Dependency::parse("foo = 1.2-9")));
        assert!(!Dependency::parse("foo").satisfied_by(&Dependency::parse("bar")));
    }
}
