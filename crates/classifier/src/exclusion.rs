//! Excluded-container matching

/// Path prefixes whose resources every route drops.
///
/// Matching is path-segment safe: `/audit` excludes `/audit` and
/// `/audit/1`, never `/audit2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    prefixes: Vec<String>,
}

impl ExclusionList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|p| p.as_ref().trim().trim_end_matches('/').to_string())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self { prefixes }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether `identifier` equals, or sits under, an excluded container
    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim_end_matches('/');
        self.prefixes.iter().any(|prefix| {
            identifier == prefix
                || identifier
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_prefix_safe() {
        let list = ExclusionList::new(["/audit"]);
        assert!(list.matches("/audit"));
        assert!(list.matches("/audit/"));
        assert!(list.matches("/audit/1"));
        assert!(list.matches("/audit/a/b"));
        assert!(!list.matches("/audit2"));
        assert!(!list.matches("/aud"));
        assert!(!list.matches("/other/audit"));
    }

    #[test]
    fn test_trailing_slash_on_prefix() {
        let list = ExclusionList::new(["/audit/", "/audit"]);
        assert_eq!(list.len(), 1);
        assert!(list.matches("/audit/x"));
        assert!(!list.matches("/auditx"));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        assert!(!ExclusionList::default().matches("/anything"));
    }

    proptest! {
        #[test]
        fn prop_exclusion_iff_equal_or_under(
            prefix in "/[a-z]{1,6}(/[a-z]{1,4}){0,2}",
            tail in "[a-z0-9/]{0,8}",
        ) {
            let list = ExclusionList::new([prefix.as_str()]);
            let identifier = format!("{prefix}{tail}");
            let trimmed = identifier.trim_end_matches('/');
            let expected = trimmed == prefix || trimmed.starts_with(&format!("{prefix}/"));
            prop_assert_eq!(list.matches(&identifier), expected);
        }

        #[test]
        fn prop_sibling_sharing_string_prefix_never_matches(
            prefix in "/[a-z]{1,6}",
            suffix in "[a-z0-9]{1,6}",
        ) {
            let list = ExclusionList::new([prefix.as_str()]);
            let sibling = format!("{prefix}{suffix}");
            prop_assert!(!list.matches(&sibling));
            let child = format!("{}/x", sibling);
            prop_assert!(!list.matches(&child));
        }
    }
}
