//! Storage wire format for filters.

use super::FilterSet;

/// Serialize filters as a JSON array of `{field, op, value}` objects.
///
/// An empty set encodes as `None`, which is bound as SQL `NULL`.
pub fn encode_filters(filters: &FilterSet) -> Result<Option<String>, serde_json::Error> {
    if filters.is_empty() {
        return Ok(None);
    }

    serde_json::to_string(filters).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::{Filter, OperatorTag};

    #[test]
    fn empty_set_is_null() {
        assert_eq!(encode_filters(&FilterSet::new()).unwrap(), None);
    }

    #[test]
    fn encodes_array_in_order() {
        let filters = FilterSet::from(vec![
            Filter::new("status", OperatorTag::In, "online,maintenance"),
            Filter::new("owner", OperatorTag::NotExists, "true"),
        ]);

        let encoded = encode_filters(&filters).unwrap().unwrap();
        assert_eq!(
            encoded,
            r#"[{"field":"status","op":"in","value":"online,maintenance"},{"field":"owner","op":"!exists","value":"true"}]"#
        );
    }
}
