//! Subscription filter matching against MQTT wildcard rules.

/// Decides whether `filter` matches `topic`.
///
/// Levels are compared after splitting both strings on `/`. `+` matches
/// exactly one non-empty level; `#` is only legal as the final level and
/// matches all remaining levels, including zero. A filter starting with a
/// wildcard never matches a topic whose first level starts with `$`. An
/// empty topic or filter never matches.
#[must_use]
pub fn matches(filter: &str, topic: &str) -> bool {
    if filter.is_empty() || topic.is_empty() {
        return false;
    }

    let topic_levels: Vec<&str> = topic.split('/').collect();
    let filter_levels: Vec<&str> = filter.split('/').collect();

    let filter_leads_with_wildcard = filter_levels[0] == "+" || filter_levels[0] == "#";
    if topic_levels[0].starts_with('$') && filter_leads_with_wildcard {
        return false;
    }

    match_levels(&filter_levels, &topic_levels)
}

fn match_levels(filter: &[&str], topic: &[&str]) -> bool {
    match (filter.first(), topic.first()) {
        (Some(&"#"), _) => true,
        (Some(&"+"), Some(t)) if !t.is_empty() => match_levels(&filter[1..], &topic[1..]),
        (Some(&"+"), _) => false,
        (Some(f), Some(t)) if *f == *t => match_levels(&filter[1..], &topic[1..]),
        (Some(_), _) => false,
        (None, None) => true,
        (None, Some(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_everything_non_dollar() {
        assert!(matches("#", "a"));
        assert!(matches("#", "a/b/c"));
    }

    #[test]
    fn hash_excludes_dollar_prefixed() {
        assert!(!matches("#", "$SYS/x"));
    }

    #[test]
    fn plus_matches_single_level() {
        assert!(matches("a/+/c", "a/b/c"));
        assert!(!matches("a/+/c", "a/b/d"));
        assert!(!matches("a/+", "a/b/c"));
    }

    #[test]
    fn plus_does_not_match_empty_level() {
        assert!(!matches("a/+/c", "a//c"));
    }

    #[test]
    fn hash_matches_zero_remaining_levels() {
        assert!(matches("a/#", "a"));
    }

    #[test]
    fn exact_match_required_without_wildcards() {
        assert!(matches("a/b", "a/b"));
        assert!(!matches("a/b", "a/c"));
    }

    #[test]
    fn plus_excludes_dollar_prefixed_first_level() {
        assert!(!matches("+/monitor", "$SYS/monitor"));
    }

    #[test]
    fn empty_inputs_never_match() {
        assert!(!matches("", "a"));
        assert!(!matches("a", ""));
    }
}
