//! Resource tags

use std::collections::BTreeMap;

/// Key/value tags, ordered so equality does not depend on provider ordering
pub type Tags = BTreeMap<String, String>;

/// Build [`Tags`] from provider key/value pairs; later duplicates win
pub fn tags_from_pairs<I, K, V>(pairs: I) -> Tags
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
