//! Request selection for the route gate.
//!
//! API and RPC paths are always selected. Everything else is selected
//! unless it is framework output under `/_next` or a static asset.

use std::sync::LazyLock;

use regex::Regex;

static API_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?:api|trpc)").expect("Invalid api prefix regex"));

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.(?:html?|css|js|jpe?g|webp|png|gif|svg|ttf|woff2?|ico|csv|docx?|xlsx?|zip|webmanifest)",
    )
    .expect("Invalid static asset regex")
});

/// Whether the gate should see a request for `path` at all.
pub fn is_selected(path: &str) -> bool {
    if API_PREFIX.is_match(path) {
        return true;
    }

    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.starts_with("_next") {
        return false;
    }

    !has_static_extension(rest)
}

fn has_static_extension(path: &str) -> bool {
    STATIC_ASSET.find_iter(path).any(|m| {
        // ".js" counts, ".json" does not
        !(m.as_str() == ".js" && path[m.end()..].starts_with("on"))
    })
}
