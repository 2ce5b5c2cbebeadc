//! Route Table Builder for on-demand full-stack sampling.
//!
//! Binds `GET {prefix}/` to [`profiles::fgprof`](crate::profiles::fgprof).
//! `seconds` (default 30) sets the duration and `format` selects `pprof`
//! (gzipped protobuf, the default) or `folded` stacks.

use tracing::info;

use crate::adaptor::adapt;
use crate::profiles;
use crate::router::{Router, RouterGroup};

pub const DEFAULT_FGPROF_PREFIX: &str = "/debug/fgprof";

/// First of `prefix_options`, or [`DEFAULT_FGPROF_PREFIX`].
#[must_use]
pub fn get_fgprof_prefix<'a>(prefix_options: &[&'a str]) -> &'a str {
    prefix_options
        .first()
        .copied()
        .unwrap_or(DEFAULT_FGPROF_PREFIX)
}

pub fn fgprof_register(router: &mut Router, prefix_options: &[&str]) {
    let mut root = router.group("/");
    fgprof_route_register(&mut root, prefix_options);
}

pub fn fgprof_route_register(group: &mut RouterGroup<'_>, prefix_options: &[&str]) {
    let mut routes = group.group(get_fgprof_prefix(prefix_options));
    info!(prefix = %routes.base_path(), "Registering fgprof route");
    routes.get("/", adapt(profiles::fgprof));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_get_fgprof_prefix() {
        assert_eq!(get_fgprof_prefix(&[]), "/debug/fgprof");
        assert_eq!(get_fgprof_prefix(&["test/fgprof"]), "test/fgprof");
        assert_eq!(get_fgprof_prefix(&["test/fgprof", "pprof"]), "test/fgprof");
    }

    #[test]
    fn test_group_registration() {
        let mut router = Router::new();
        {
            let mut admin = router.group("/admin");
            fgprof_route_register(&mut admin, &["fgprof"]);
        }
        assert_eq!(router.routes(), vec![(Method::GET, "/admin/fgprof/".to_string())]);
    }
}
