//! Revision-aware cache keys.
//!
//! A key is the request URL with the revision appended as a query parameter.
//! Changing a resource's revision changes its key, which is what invalidates
//! the previously stored copy.

use std::fmt;

use url::Url;
use url::form_urlencoded;

use crate::Error;

/// Query parameter carrying the revision inside a cache key.
pub const REVISION_PARAM: &str = "__WB_REVISION__";

/// Cache key derived from `(url, revision)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a URL at a revision.
    ///
    /// Without a revision (or with an empty one) the key is the URL as given,
    /// minus its fragment. With a revision, any revision parameter already on
    /// the URL is replaced.
    pub fn new(url: &Url, revision: Option<&str>) -> Self {
        let mut keyed = url.clone();
        keyed.set_fragment(None);

        let Some(revision) = revision.filter(|r| !r.is_empty()) else {
            return Self(keyed.into());
        };

        let rest = strip_revision(&keyed);
        let encoded: String = form_urlencoded::byte_serialize(revision.as_bytes()).collect();
        let pair = format!("{REVISION_PARAM}={encoded}");
        let query = match rest {
            Some(existing) => format!("{existing}&{pair}"),
            None => pair,
        };
        keyed.set_query(Some(&query));

        Self(keyed.into())
    }

    /// Key for a URL without revision tracking.
    pub fn bare(url: &Url) -> Self {
        Self::new(url, None)
    }

    /// Recover the original URL and the embedded revision.
    pub fn parse(key: &str) -> Result<(Url, Option<String>), Error> {
        let mut url = Url::parse(key).map_err(|e| Error::InvalidCacheKey(format!("{key}: {e}")))?;

        let revision = url.query().and_then(|query| {
            query
                .split('&')
                .filter_map(|segment| segment.split_once('='))
                .filter(|(name, _)| *name == REVISION_PARAM)
                .last()
                .map(|(_, value)| {
                    form_urlencoded::parse(format!("r={value}").as_bytes())
                        .next()
                        .map(|(_, v)| v.into_owned())
                        .unwrap_or_default()
                })
        });

        let rest = strip_revision(&url);
        url.set_query(rest.as_deref());

        Ok((url, revision.filter(|r| !r.is_empty())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Query string with every revision parameter removed, `None` if nothing is left.
fn strip_revision(url: &Url) -> Option<String> {
    let query = url.query()?;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| {
            let name = segment.split_once('=').map_or(*segment, |(name, _)| name);
            name != REVISION_PARAM
        })
        .collect();
    if kept.is_empty() { None } else { Some(kept.join("&")) }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
