//! Builds a [`FilterSet`] from a raw query string.

use url::form_urlencoded;

use super::{FilterSet, resolve_pair};

impl FilterSet {
    /// Decode `raw` (without the leading `?`) and resolve every pair.
    ///
    /// Pairs are visited in the order they appear, so the resulting filter
    /// order is reproducible. Repeated keys each yield their own filter.
    pub fn from_query(raw: &str) -> Self {
        let mut filters = FilterSet::new();

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            filters.push(resolve_pair(&key, &value));
        }

        filters
    }
}
