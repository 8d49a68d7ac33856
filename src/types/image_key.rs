// ABOUTME: Canonical image keys used to correlate runtime tags with pods.
// ABOUTME: Appends :latest to references without any colon; no structured parsing.

use std::fmt;

const DEFAULT_TAG: &str = ":latest";

/// A normalized image reference.
///
/// The only way to build one is [`ImageKey::normalize`], so a key in the
/// registry and a key derived from a tag event always went through the same
/// rule. Two keys match iff their strings are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(String);

impl ImageKey {
    /// Canonicalize a raw image reference.
    ///
    /// A reference with no `:` anywhere gets `:latest` appended. Anything
    /// containing a colon is returned unchanged. This covers `IMAGE:TAG` and
    /// `IMAGE@sha256:DIGEST` alike. It also means `localhost:5000/app` is
    /// taken as already tagged, which is a known approximation.
    pub fn normalize(reference: &str) -> Self {
        if reference.contains(':') {
            Self(reference.to_string())
        } else {
            Self(format!("{reference}{DEFAULT_TAG}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_gets_latest() {
        assert_eq!(ImageKey::normalize("nginx").as_str(), "nginx:latest");
    }

    #[test]
    fn tagged_name_is_unchanged() {
        assert_eq!(ImageKey::normalize("nginx:1.2").as_str(), "nginx:1.2");
    }

    #[test]
    fn digest_is_unchanged() {
        assert_eq!(
            ImageKey::normalize("nginx@sha256:abcd").as_str(),
            "nginx@sha256:abcd"
        );
    }

    #[test]
    fn registry_port_counts_as_tagged() {
        assert_eq!(
            ImageKey::normalize("localhost:5000/app").as_str(),
            "localhost:5000/app"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = ImageKey::normalize("gcr.io/project/app");
        let twice = ImageKey::normalize(once.as_str());
        assert_eq!(once, twice);
    }
}
