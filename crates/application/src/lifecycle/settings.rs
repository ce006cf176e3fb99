//! Collection and folder settings applied around a request.

use relay_domain::{AuthConfig, Collection, Folder, Headers, RequestItem};

/// Scripts with collection and folder layers composed around the request's own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedScripts {
    /// Collection → folders → request.
    pub pre_request: String,
    /// Request → folders → collection.
    pub post_response: String,
    /// Request → folders → collection.
    pub tests: String,
}

/// Returns the item with merged headers and resolved auth, plus its composed scripts.
///
/// `folders` is the chain from the outermost folder to the one holding the request.
#[must_use]
pub fn apply_collection_settings(
    item: &RequestItem,
    collection: &Collection,
    folders: &[Folder],
) -> (RequestItem, ComposedScripts) {
    let mut effective = item.clone();
    effective.headers = merge_headers(item, collection, folders);
    effective.auth = resolve_auth(&item.auth, collection, folders);
    (effective, compose_scripts(item, collection, folders))
}

/// Collection, then folders outer→inner, then request; later wins.
#[must_use]
pub fn merge_headers(item: &RequestItem, collection: &Collection, folders: &[Folder]) -> Headers {
    let mut headers = Headers::new();
    headers.merge_from(&collection.headers);
    for folder in folders {
        headers.merge_from(&folder.headers);
    }
    headers.merge_from(&item.headers);
    headers
}

/// `inherit` resolves to the nearest folder auth that is not `inherit`, else the collection auth.
#[must_use]
pub fn resolve_auth(auth: &AuthConfig, collection: &Collection, folders: &[Folder]) -> AuthConfig {
    if !auth.is_inherit() {
        return auth.clone();
    }
    folders
        .iter()
        .rev()
        .map(|f| &f.auth)
        .find(|a| !a.is_inherit())
        .unwrap_or(&collection.auth)
        .clone()
}

fn compose_scripts(item: &RequestItem, collection: &Collection, folders: &[Folder]) -> ComposedScripts {
    let pre_request = std::iter::once(collection.scripts.pre_request.as_str())
        .chain(folders.iter().map(|f| f.scripts.pre_request.as_str()))
        .chain(std::iter::once(item.scripts.pre_request.as_str()));

    let post_response = std::iter::once(item.scripts.post_response.as_str())
        .chain(folders.iter().rev().map(|f| f.scripts.post_response.as_str()))
        .chain(std::iter::once(collection.scripts.post_response.as_str()));

    let tests = std::iter::once(item.tests.as_str())
        .chain(folders.iter().rev().map(|f| f.tests.as_str()))
        .chain(std::iter::once(collection.tests.as_str()));

    ComposedScripts {
        pre_request: join_scripts(pre_request),
        post_response: join_scripts(post_response),
        tests: join_scripts(tests),
    }
}

fn join_scripts<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
