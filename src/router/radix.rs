//! Radix tree for HTTP route matching
//!
//! Paths are split into `/`-separated segments and stored in a tree where
//! each node is one segment, so lookup cost depends on the path length and
//! not on the number of registered routes. Shared prefixes such as
//! `/debug/pprof/` are stored once.
//!
//! - Static segments (e.g. `heap`) match exactly and win over parameters
//! - Parameter segments (e.g. `{id}`) match any single segment
//! - A trailing slash is significant: `/debug/pprof/` and `/debug/pprof`
//!   are different routes
//! - Routes live on terminal nodes, keyed by HTTP method

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::Route;
use crate::context::ParamVec;

/// Segments of a path; the common case stays on the stack.
pub(crate) type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Split `path` into segments. Empty segments are dropped, except that a
/// trailing slash on a non-root path yields a final empty segment.
pub(crate) fn split_path(path: &str) -> Segments<'_> {
    let trimmed = path.trim_start_matches('/');
    let mut segments: Segments<'_> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    if !segments.is_empty() && trimmed.ends_with('/') {
        segments.push("");
    }
    segments
}

#[derive(Clone, Default)]
struct RadixNode {
    segment: String,
    routes: HashMap<Method, Arc<Route>>,
    /// `{id}` -> `Some("id")`
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode>,
    /// Several names may share a position (`/users/{id}` vs `/users/{user_id}/posts`)
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    fn new_param(param_name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(param_name)),
            ..Self::default()
        }
    }

    /// Insert `route`; returns the route it replaced, if any.
    fn insert(&mut self, segments: &[&str], method: Method, route: Arc<Route>) -> Option<Arc<Route>> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.routes.insert(method, route);
        };

        if let Some(name) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                return child.insert(remaining, method, route);
            }
            let mut child = RadixNode::new_param(name);
            let replaced = child.insert(remaining, method, route);
            self.param_children.push(child);
            return replaced;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == segment) {
            return child.insert(remaining, method, route);
        }
        let mut child = RadixNode::new(segment);
        let replaced = child.insert(remaining, method, route);
        self.children.push(child);
        replaced
    }

    fn search(&self, segments: &[&str], method: &Method, params: &mut ParamVec) -> Option<Arc<Route>> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.routes.get(method).cloned();
        };

        for child in &self.children {
            if child.segment == segment {
                if let Some(route) = child.search(remaining, method, params) {
                    return Some(route);
                }
            }
        }

        // an empty trailing segment never binds a parameter
        if segment.is_empty() {
            return None;
        }
        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), segment.to_string()));
                if let Some(route) = child.search(remaining, method, params) {
                    return Some(route);
                }
                params.pop();
            }
        }
        None
    }

    fn has_path(&self, segments: &[&str]) -> bool {
        match segments.split_first() {
            None => !self.routes.is_empty(),
            Some((&segment, remaining)) => {
                self.children
                    .iter()
                    .any(|c| c.segment == segment && c.has_path(remaining))
                    || (!segment.is_empty()
                        && self.param_children.iter().any(|c| c.has_path(remaining)))
            }
        }
    }

    fn collect(&self, prefix: &str, out: &mut Vec<(Method, String)>) {
        for method in self.routes.keys() {
            let path = if prefix.is_empty() { "/" } else { prefix };
            out.push((method.clone(), path.to_string()));
        }
        for child in &self.children {
            child.collect(&format!("{prefix}/{}", child.segment), out);
        }
        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                child.collect(&format!("{prefix}/{{{name}}}"), out);
            }
        }
    }
}

/// Method + path lookup table.
#[derive(Clone, Default)]
pub(crate) struct RadixRouter {
    root: RadixNode,
    len: usize,
}

impl RadixRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `route` under `method` and `path`; a later registration of
    /// the same pair replaces the earlier one, which is returned.
    pub(crate) fn insert(&mut self, method: Method, path: &str, route: Arc<Route>) -> Option<Arc<Route>> {
        let segments = split_path(path);
        let replaced = self.root.insert(&segments, method, route);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Find the route for `method` and `path`, with captured parameters.
    pub(crate) fn route(&self, method: &Method, path: &str) -> Option<(Arc<Route>, ParamVec)> {
        let segments = split_path(path);
        let mut params = ParamVec::new();
        let route = self.root.search(&segments, method, &mut params)?;
        Some((route, params))
    }

    /// Whether any method is registered for `path`.
    pub(crate) fn has_path(&self, path: &str) -> bool {
        self.root.has_path(&split_path(path))
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Every registered `(method, pattern)`, sorted by pattern then method.
    pub(crate) fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect("", &mut out);
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        out
    }
}
