//! README resolution from alternate file locations.

/// How the README of a repository is chosen among its candidate files.
///
/// Candidates are listed in query order (`README.md`, then `readme.md`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadmePolicy {
    /// Walk every candidate; the last non-empty one wins.
    #[default]
    LastNonEmpty,
    /// Stop at the first non-empty candidate.
    FirstNonEmpty,
}

/// Pick the README among `candidates` according to `policy`.
///
/// Missing and empty candidates are skipped. Returns `None` when no
/// candidate has content.
///
/// With two non-empty candidates the policies disagree:
/// `["A", "B"]` resolves to `"B"` under [`ReadmePolicy::LastNonEmpty`] and
/// to `"A"` under [`ReadmePolicy::FirstNonEmpty`].
pub fn resolve_readme<I>(policy: ReadmePolicy, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut present = candidates
        .into_iter()
        .flatten()
        .filter(|text| !text.is_empty());

    match policy {
        ReadmePolicy::LastNonEmpty => present.last(),
        ReadmePolicy::FirstNonEmpty => present.next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_last_non_empty_wins() {
        assert_eq!(
            resolve_readme(ReadmePolicy::LastNonEmpty, candidates(&["A", "B"])),
            Some("B".to_string())
        );
    }

    #[test]
    fn test_trailing_empty_candidate_is_skipped() {
        assert_eq!(
            resolve_readme(ReadmePolicy::LastNonEmpty, candidates(&["A", ""])),
            Some("A".to_string())
        );
    }

    #[test]
    fn test_first_non_empty_stops_early() {
        assert_eq!(
            resolve_readme(ReadmePolicy::FirstNonEmpty, candidates(&["A", "B"])),
            Some("A".to_string())
        );
        assert_eq!(
            resolve_readme(ReadmePolicy::FirstNonEmpty, candidates(&["", "B"])),
            Some("B".to_string())
        );
    }

    #[test]
    fn test_missing_candidates() {
        assert_eq!(
            resolve_readme(ReadmePolicy::LastNonEmpty, vec![None, Some("B".to_string())]),
            Some("B".to_string())
        );
        assert_eq!(resolve_readme(ReadmePolicy::LastNonEmpty, vec![None, None]), None);
        assert_eq!(resolve_readme(ReadmePolicy::FirstNonEmpty, candidates(&["", ""])), None);
    }
}
