//! Site evaluation context.

use lyceum_storage::SiteName;

/// The site an operation is being evaluated in.
///
/// Threaded explicitly through every call that needs it (validation, actor
/// dispatch, repository queries) instead of living in ambient global state.
#[derive(Clone, Debug)]
pub struct SiteContext {
    pub site: SiteName,
}

impl SiteContext {
    pub fn new(site: impl Into<String>) -> Self {
        SiteContext {
            site: SiteName(site.into()),
        }
    }
}
