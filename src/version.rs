//! Module to hold logic for parsing and comparing rpm versions.
use std::cmp::Ordering;
use std::fmt;

use atoi::atoi;

/// Parse an `epoch:version-release` string into its three parts.
///
/// The grammar is lenient and this never fails: a leading `"<digits>:"` sets
/// the epoch, a leading bare `":"` sets an explicit epoch of zero, and a
/// colon preceded by anything else is plain version text. The remainder is
/// split on the *last* `-`. Empty version or release text normalizes to
/// `None`; in the worst case the whole input survives as the version.
pub fn parse_evr(evr: &str) -> (Option<u64>, Option<String>, Option<String>) {
    let mut epoch = None;
    let mut rest = evr;
    if let Some(idx) = evr.find(':') {
        if idx == 0 {
            // empty-but-present epoch, distinct from no epoch at all
            epoch = Some(0);
            rest = &evr[1..];
        } else if evr[..idx].bytes().all(|b| b.is_ascii_digit()) {
            if let Some(e) = atoi::<u64>(evr[..idx].as_bytes()) {
                epoch = Some(e);
                rest = &evr[idx + 1..];
            }
            // digits too large for an epoch: keep the whole string as version
        }
    }

    let (version, release) = match rest.rfind('-') {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };
    let version = if version.is_empty() {
        None
    } else {
        Some(version.to_owned())
    };
    let release = release.and_then(|r| {
        if r.is_empty() {
            None
        } else {
            Some(r.to_owned())
        }
    });
    (epoch, version, release)
}

/// Order two arbitrary version strings the way rpm does.
///
/// This follows the reference algorithm in lib/rpmvercmp.c from rpm 4.9.0:
///
///  - non-alphanumeric characters only separate segments and are never
///    themselves compared
///  - segments are maximal runs of digits or of letters, taken from the left
///    input's current character; a digit segment always outranks a letter
///    segment
///  - digit runs compare as integers (leading zeros are insignificant),
///    letter runs compare byte for byte
///  - if every paired segment matched, equal-length exhaustion is equality
///    and otherwise the side with the most unprocessed characters wins
pub fn rpmvercmp(x: &str, y: &str) -> Ordering {
    // easy! :)
    if x == y {
        return Ordering::Equal;
    }

    let x = x.as_bytes();
    let y = y.as_bytes();
    let mut xi = 0;
    let mut yi = 0;

    while xi < x.len() && yi < y.len() {
        // skip over anything that only separates segments
        while xi < x.len() && !x[xi].is_ascii_alphanumeric() {
            xi += 1;
        }
        while yi < y.len() && !y[yi].is_ascii_alphanumeric() {
            yi += 1;
        }
        if xi == x.len() || yi == y.len() {
            break;
        }

        // the left side picks the segment type for this round
        let numeric = x[xi].is_ascii_digit();
        let x_seg = take_segment(&x[xi..], numeric);
        let y_seg = take_segment(&y[yi..], numeric);

        // an empty right segment means the types differ, and numbers
        // always win over letters
        if y_seg.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        xi += x_seg.len();
        yi += y_seg.len();

        let ord = if numeric {
            compare_numeric(x_seg, y_seg)
        } else {
            x_seg.cmp(y_seg)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // segments matched completely; differing separator runs still count
    // as equality
    if xi >= x.len() && yi >= y.len() {
        return Ordering::Equal;
    }

    // the most unprocessed characters left wins
    if x.len() - xi > y.len() - yi {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Maximal same-type run at the start of `input`; empty when the first
/// character is of the other type.
fn take_segment(input: &[u8], numeric: bool) -> &[u8] {
    let end = input
        .iter()
        .position(|b| {
            if numeric {
                !b.is_ascii_digit()
            } else {
                !b.is_ascii_alphabetic()
            }
        })
        .unwrap_or(input.len());
    &input[..end]
}

/// Compare two digit runs as integers without converting (skip leading
/// zeros, then longer wins, then lexicographic), to avoid overflow on
/// absurdly long runs.
fn compare_numeric(x: &[u8], y: &[u8]) -> Ordering {
    let x = discard_zeros(x);
    let y = discard_zeros(y);
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// Remove leading `b'0'`s from a byte string.
fn discard_zeros(input: &[u8]) -> &[u8] {
    let mut pos = 0;
    while input.get(pos) == Some(&b'0') {
        pos += 1;
    }
    &input[pos..]
}

/// An epoch/version/release triple.
///
/// Any field can be absent; an absent epoch is historically "unset" and is
/// not the same thing as an explicit epoch of zero (see [`Version::compare`]).
/// Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Version {
    epoch: Option<u64>,
    version: Option<String>,
    release: Option<String>,
}

impl Version {
    /// Parse an `epoch:version-release` string. Lenient, never fails.
    pub fn parse(evr: &str) -> Version {
        let (epoch, version, release) = parse_evr(evr);
        Version {
            epoch,
            version,
            release,
        }
    }

    /// Assemble a version from already-split parts.
    pub fn from_parts(
        epoch: Option<u64>,
        version: Option<String>,
        release: Option<String>,
    ) -> Version {
        Version {
            epoch,
            version,
            release,
        }
    }

    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_ref().map(String::as_str)
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_ref().map(String::as_str)
    }

    /// Full comparison.
    ///
    /// Epoch first: an unset epoch loses only to a present epoch greater
    /// than zero, and ties with an explicit zero (this asymmetry is a quirk
    /// of the reference implementation, kept on purpose). Then version,
    /// then release, where a present field beats an absent one and present
    /// pairs go through [`rpmvercmp`].
    pub fn compare(&self, other: &Version) -> Ordering {
        self.compare_impl(other, false)
    }

    /// Partial comparison: at each of the three steps an absent field on
    /// either side matches anything, so `2:1.2-1` is equal to `2:1.2` and
    /// to a bare `2:`. Used to check whether an installed package satisfies
    /// a requirement that under-specifies version or release.
    pub fn partial_compare(&self, other: &Version) -> Ordering {
        self.compare_impl(other, true)
    }

    fn compare_impl(&self, other: &Version, partial: bool) -> Ordering {
        if !(partial && (self.epoch.is_none() || other.epoch.is_none())) {
            match (self.epoch, other.epoch) {
                (Some(x), None) if x > 0 => return Ordering::Greater,
                (None, Some(y)) if y > 0 => return Ordering::Less,
                (Some(x), Some(y)) => match x.cmp(&y) {
                    Ordering::Equal => (),
                    ord => return ord,
                },
                _ => (),
            }
        }

        if !(partial && (self.version.is_none() || other.version.is_none())) {
            match (&self.version, &other.version) {
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some(x), Some(y)) => match rpmvercmp(x, y) {
                    Ordering::Equal => (),
                    ord => return ord,
                },
                (None, None) => (),
            }
        }

        if !(partial && (self.release.is_none() || other.release.is_none())) {
            match (&self.release, &other.release) {
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some(x), Some(y)) => match rpmvercmp(x, y) {
                    Ordering::Equal => (),
                    ord => return ord,
                },
                (None, None) => (),
            }
        }

        Ordering::Equal
    }

    /// The canonical `epoch:version-release` rendering, absent parts left
    /// empty. Feeds [`Package::nevra`](crate::Package::nevra).
    pub fn evr(&self) -> String {
        format!(
            "{}:{}-{}",
            self.epoch.map(|e| e.to_string()).unwrap_or_default(),
            self.version.as_ref().map(String::as_str).unwrap_or(""),
            self.release.as_ref().map(String::as_str).unwrap_or(""),
        )
    }
}

impl fmt::Display for Version {
    /// `version` or `version-release`, the display form used in package
    /// version strings.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let version = self.version.as_ref().map(String::as_str).unwrap_or("");
        match &self.release {
            Some(release) => write!(f, "{}-{}", version, release),
            None => write!(f, "{}", version),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare two raw EVR strings with full [`Version`] semantics. Convenience
/// entry point for ad hoc checks.
pub fn compare(v1: &str, v2: &str) -> Ordering {
    Version::parse(v1).compare(&Version::parse(v2))
}
