//! URL checks behind the tracker's advisory diagnostics.
//!
//! None of these affect control flow; a URL that fails to parse simply disables
//! the corresponding diagnostic.

use url::Url;

/// Resolves `script_url` against `base`.
pub(crate) fn resolve_script(base: &Url, script_url: &str) -> Option<Url> {
    base.join(script_url).ok()
}

/// Default scope for a script: the directory that contains it.
pub(crate) fn default_scope(base: &Url, script_url: &str) -> Option<Url> {
    resolve_script(base, script_url)?.join("./").ok()
}

/// True if the controller runs the same (resolved) script as the tracked target.
pub(crate) fn is_same_script(base: &Url, script_url: &str, controller_script: &str) -> bool {
    match (
        resolve_script(base, script_url),
        Url::parse(controller_script),
    ) {
        (Some(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Returns `Some(false)` if `page` is not under `scope`, `None` if `scope` is unparsable.
///
/// Matching is a plain prefix test on the serialized URLs, so `/app` covers both
/// `/app/` and `/application`.
pub(crate) fn is_in_scope(page: &Url, scope: &str) -> Option<bool> {
    let scope = Url::parse(scope).ok()?;
    Some(page.as_str().starts_with(scope.as_str()))
}
