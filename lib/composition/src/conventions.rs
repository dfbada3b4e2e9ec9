use fusion_supergraph::fusion_spec::ResolverKind;

/// Lowercases and drops word separators, so `user_by_id`, `userById` and `UserByID` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// Decides whether a root query field resolves `type_name` by `field_name`.
///
/// Singular forms (`T`, `getTByF`, `TByF`) resolve one entity per call. Plural forms
/// (`Ts`, `getTsByF`, `TsByF`, `getTsByFs`, `TsByFs`) resolve a list of entities in one call.
pub fn match_resolver_convention(
    type_name: &str,
    field_name: &str,
    query_field_name: &str,
) -> Option<ResolverKind> {
    let query_field = normalize_name(query_field_name);
    let single = normalize_name(type_name);
    let plural = normalize_name(&pluralize(type_name));
    let field = normalize_name(field_name);
    let fields = normalize_name(&pluralize(field_name));

    let singular_forms = [
        single.clone(),
        format!("get{single}by{field}"),
        format!("{single}by{field}"),
    ];
    if singular_forms.contains(&query_field) {
        return Some(ResolverKind::Fetch);
    }

    let plural_forms = [
        plural.clone(),
        format!("get{plural}by{field}"),
        format!("{plural}by{field}"),
        format!("get{plural}by{fields}"),
        format!("{plural}by{fields}"),
    ];
    if plural_forms.contains(&query_field) {
        return Some(ResolverKind::Batch);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_common_words() {
        assert_eq!(pluralize("User"), "Users");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("id"), "ids");
    }

    #[test]
    fn singular_forms_fetch() {
        for query_field in ["user", "getUserById", "userById", "user_by_id", "get-user-by-id"] {
            assert_eq!(
                match_resolver_convention("User", "id", query_field),
                Some(ResolverKind::Fetch),
                "{query_field}"
            );
        }
    }

    #[test]
    fn plural_forms_batch() {
        for query_field in [
            "users",
            "getUsersById",
            "usersById",
            "getUsersByIds",
            "usersByIds",
            "USERS_BY_IDS",
        ] {
            assert_eq!(
                match_resolver_convention("User", "id", query_field),
                Some(ResolverKind::Batch),
                "{query_field}"
            );
        }

        assert_eq!(
            match_resolver_convention("Category", "slug", "categoriesBySlugs"),
            Some(ResolverKind::Batch)
        );
    }

    #[test]
    fn unrelated_fields_do_not_match() {
        for query_field in ["me", "userByEmail", "getUser", "allUsers", "posts"] {
            assert_eq!(
                match_resolver_convention("User", "id", query_field),
                None,
                "{query_field}"
            );
        }
    }
}
