use crate::schema::Taxonomy;

/// Coarsest grouping depth ("chapter").
pub const CHAPTER_DEPTH: u8 = 2;
/// Second grouping depth ("subchapter").
pub const SUBCHAPTER_DEPTH: u8 = 4;
/// Finest grouping depth ("item"). Nothing is grouped below it.
pub const ITEM_DEPTH: u8 = 6;

const MAX_SEGMENTS: usize = (ITEM_DEPTH / 2) as usize;

/// Strips every character that is not an ASCII digit or a dot, then drops
/// empty segments so `" .51..01."` comes back as `"51.01"`.
///
/// Total over any input: `None` and garbage both come back as `""`,
/// which callers treat as "unclassifiable".
pub fn normalize(code: Option<&str>) -> String {
    let stripped: String = code
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    segments(&stripped).collect::<Vec<_>>().join(".")
}

fn segments(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split('.').filter(|s| !s.is_empty())
}

/// Number of non-empty dot-segments in an already normalized code.
pub fn segment_count(normalized: &str) -> usize {
    segments(normalized).count()
}

/// Hierarchy depth of a code: 1 segment -> 2, 2 -> 4, 3 or more -> 6, none -> 0.
pub fn depth_of(code: &str) -> u8 {
    match segment_count(&normalize(Some(code))) {
        0 => 0,
        1 => CHAPTER_DEPTH,
        2 => SUBCHAPTER_DEPTH,
        _ => ITEM_DEPTH,
    }
}

/// The single depth-cap rule shared by the aggregator and the controller's
/// dry run. Applies to both taxonomies.
pub fn is_supported_depth(depth: u8) -> bool {
    matches!(depth, CHAPTER_DEPTH | SUBCHAPTER_DEPTH | ITEM_DEPTH)
}

/// Truncates a code to `depth / 2` segments. Unsupported depths and
/// unclassifiable codes both yield `""`.
pub fn group_code(code: &str, depth: u8) -> String {
    if !is_supported_depth(depth) {
        return String::new();
    }

    let normalized = normalize(Some(code));
    let keep = (depth / 2) as usize;

    segments(&normalized)
        .take(keep.min(MAX_SEGMENTS))
        .collect::<Vec<_>>()
        .join(".")
}

/// Removes the last segment. `None` when the code is already a chapter or
/// is unclassifiable.
pub fn parent_code(_taxonomy: Taxonomy, code: &str) -> Option<String> {
    let normalized = normalize(Some(code));
    let parts: Vec<&str> = segments(&normalized).take(MAX_SEGMENTS).collect();

    if parts.len() < 2 {
        return None;
    }

    Some(parts[..parts.len() - 1].join("."))
}

/// Prefix test on normalized codes, on whole segments only: `"51"` matches
/// `"51"` and `"51.01"` but not `"510.01"`. An empty prefix never matches, so
/// a blank exclusion entry cannot wipe out the whole data set.
pub fn has_prefix(normalized_code: &str, normalized_prefix: &str) -> bool {
    if normalized_prefix.is_empty() {
        return false;
    }

    match normalized_code.strip_prefix(normalized_prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_noise() {
        assert_eq!(normalize(Some(" 51.01.02 ")), "51.01.02");
        assert_eq!(normalize(Some("ec:10.01a")), "10.01");
        assert_eq!(normalize(Some("abc")), "");
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some(" .51..01. ")), "51.01");
    }

    #[test]
    fn test_depth_of() {
        assert_eq!(depth_of(""), 0);
        assert_eq!(depth_of("51"), 2);
        assert_eq!(depth_of("51.01"), 4);
        assert_eq!(depth_of("51.01.02"), 6);
        assert_eq!(depth_of("51.01.02.07"), 6);
        assert_eq!(depth_of(" 51 . 01 "), 4);
    }

    #[test]
    fn test_group_code_truncates() {
        assert_eq!(group_code("51.01.02", 2), "51");
        assert_eq!(group_code("51.01.02", 4), "51.01");
        assert_eq!(group_code("51.01.02", 6), "51.01.02");
        assert_eq!(group_code("51.01.02.07", 6), "51.01.02");
        // Shorter codes are returned whole
        assert_eq!(group_code("51.02", 6), "51.02");
    }

    #[test]
    fn test_group_code_rejects_unsupported_depth() {
        assert_eq!(group_code("51.01.02", 0), "");
        assert_eq!(group_code("51.01.02", 3), "");
        assert_eq!(group_code("51.01.02", 8), "");
        assert_eq!(group_code("", 2), "");
    }

    #[test]
    fn test_parent_code() {
        assert_eq!(parent_code(Taxonomy::Functional, "51.01.02"), Some("51.01".to_string()));
        assert_eq!(parent_code(Taxonomy::Economic, "10.01"), Some("10".to_string()));
        assert_eq!(parent_code(Taxonomy::Economic, "10"), None);
        assert_eq!(parent_code(Taxonomy::Functional, ""), None);
    }

    #[test]
    fn test_has_prefix_ignores_empty_prefix() {
        assert!(has_prefix("20.01.01", "20"));
        assert!(!has_prefix("10.01.01", "20"));
        assert!(!has_prefix("10.01.01", ""));
    }

    #[test]
    fn test_has_prefix_matches_whole_segments() {
        assert!(has_prefix("51", "51"));
        assert!(has_prefix("51.01.02", "51.01"));
        assert!(!has_prefix("510.01", "51"));
        assert!(!has_prefix("51.01", "5"));
        assert!(!has_prefix("51.010", "51.01"));
    }
}
