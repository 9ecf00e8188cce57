//! OData filter construction.

/// Build an `eq` filter clause, escaping single quotes in the literal.
pub fn odata_eq(field: &str, value: &str) -> String {
    format!("{} eq '{}'", field, value.replace('\'', "''"))
}

/// Parse a filter produced by [`odata_eq`] back into its field and value.
pub fn parse_odata_eq(filter: &str) -> Option<(String, String)> {
    let (field, rest) = filter.trim().split_once(" eq ")?;
    let literal = rest.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    Some((field.trim().to_string(), literal.replace("''", "'")))
}
