use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::config::{Configuration, Endpoint};
use crate::types::{LookupMode, LookupRequest};

/// Same set `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Turn raw search terms into a lookup, or `None` if the query isn't ours.
///
/// Only the first term decides: it has to begin with `d:` or `s:`. The word is
/// everything after the prefix in the space-joined query, trimmed.
pub fn classify<S: AsRef<str>>(terms: &[S]) -> Option<LookupRequest> {
    let first = terms.first()?.as_ref();
    let mode = if first.starts_with(LookupMode::Definition.prefix()) {
        LookupMode::Definition
    } else if first.starts_with(LookupMode::Synonym.prefix()) {
        LookupMode::Synonym
    } else {
        return None;
    };

    let query = terms
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    let word = query[mode.prefix().len()..].trim();
    if word.is_empty() {
        debug!("Ignoring {:?} query with no word", mode);
        return None;
    }

    Some(LookupRequest {
        mode,
        word: word.to_string(),
    })
}

/// Page URL for a lookup under the given configuration.
pub fn build_url(endpoint: &Endpoint, request: &LookupRequest, config: &Configuration) -> String {
    let segment = match request.mode {
        LookupMode::Definition => config.dictionary.path_segment(),
        LookupMode::Synonym => config.synonyms.path_segment(),
    };
    format!(
        "{}://{}/{}/{}",
        endpoint.protocol,
        endpoint.host,
        segment,
        utf8_percent_encode(&request.word, COMPONENT)
    )
}
