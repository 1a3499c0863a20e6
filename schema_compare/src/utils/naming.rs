//! Naming utilities for SchemaCompare
//!
//! Identifier quoting per dialect and the case-insensitive keys used to
//! match objects between two schemas.

use indexmap::IndexMap;

use crate::schema::provider::DatabaseKind;

/// Quote an identifier for the given dialect, doubling embedded quote characters
pub fn quote_ident(kind: DatabaseKind, name: &str) -> String {
    match kind {
        DatabaseKind::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        DatabaseKind::MySql => format!("`{}`", name.replace('`', "``")),
    }
}

/// Quote a comma separated column list
pub fn quote_column_list<S: AsRef<str>>(kind: DatabaseKind, columns: &[S]) -> String {
    columns
        .iter()
        .map(|col| quote_ident(kind, col.as_ref().trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a comma-joined column list as stored on composite foreign keys
pub fn split_column_list(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|col| !col.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop a leading `schema.` or `"schema".` qualifier from a type name.
///
/// Catalogs qualify user-defined types living outside the search path, so the
/// same enum reads `src.mood` in one schema and `tgt.mood` in the other.
pub fn unqualify_type(data_type: &str, schema: &str) -> String {
    let quoted = format!("\"{}\".", schema.replace('"', "\"\""));
    let bare = format!("{}.", schema);
    for prefix in [quoted, bare] {
        if let Some(rest) = data_type.strip_prefix(prefix.as_str()) {
            return rest.to_string();
        }
    }
    data_type.to_string()
}

/// Key used to match object names across source and target
pub fn match_key(name: &str) -> String {
    name.to_lowercase()
}

/// Index items by their case-insensitive name, keeping insertion order.
/// On a name collision the first item wins.
pub fn index_by_name<'a, T, F>(items: &'a [T], name_of: F) -> IndexMap<String, &'a T>
where
    F: Fn(&T) -> &str,
{
    let mut map = IndexMap::with_capacity(items.len());
    for item in items {
        map.entry(match_key(name_of(item))).or_insert(item);
    }
    map
}

/// Union of two key sets: every key of `first` in order, then the keys only in `second`
pub fn union_keys<A, B>(first: &IndexMap<String, A>, second: &IndexMap<String, B>) -> Vec<String> {
    first
        .keys()
        .chain(second.keys().filter(|key| !first.contains_key(*key)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident(DatabaseKind::Postgres, "orders"), "\"orders\"");
        assert_eq!(quote_ident(DatabaseKind::Postgres, "we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_ident(DatabaseKind::MySql, "orders"), "`orders`");
        assert_eq!(quote_ident(DatabaseKind::MySql, "we`ird"), "`we``ird`");
    }

    #[test]
    fn test_quote_column_list() {
        let columns = split_column_list("tenant_id, order_id");
        assert_eq!(columns, vec!["tenant_id", "order_id"]);
        assert_eq!(
            quote_column_list(DatabaseKind::MySql, &columns),
            "`tenant_id`, `order_id`"
        );
    }

    #[test]
    fn test_unqualify_type() {
        assert_eq!(unqualify_type("src.mood", "src"), "mood");
        assert_eq!(unqualify_type("src.mood[]", "src"), "mood[]");
        assert_eq!(unqualify_type("\"My App\".colour", "My App"), "colour");
        assert_eq!(unqualify_type("numeric(10,2)", "src"), "numeric(10,2)");
        assert_eq!(unqualify_type("other.mood", "src"), "other.mood");
    }

    #[test]
    fn test_index_by_name_first_wins() {
        let names = vec![("FK_A", 1), ("fk_a", 2), ("fk_b", 3)];
        let map = index_by_name(&names, |(name, _)| *name);

        assert_eq!(map.len(), 2);
        assert_eq!(map["fk_a"].1, 1);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["fk_a", "fk_b"]);
    }

    #[test]
    fn test_union_keys_keeps_source_order_first() {
        let a: IndexMap<String, ()> = [("b".to_string(), ()), ("a".to_string(), ())].into_iter().collect();
        let b: IndexMap<String, ()> = [("c".to_string(), ()), ("a".to_string(), ())].into_iter().collect();

        assert_eq!(union_keys(&a, &b), vec!["b", "a", "c"]);
    }
}
