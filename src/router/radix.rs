//! Segment trie used by [`Router`](super::Router) for route matching
//!
//! Each HTTP method owns one tree. Paths are split on `/` (empty segments are
//! dropped, so `/a//b/` and `a/b` are the same path) and every segment is one
//! level of the tree:
//!
//! - Static segments (e.g. `users`) match exactly
//! - Parameter segments (e.g. `:id`) match any single segment and bind it
//! - Wildcard segments (`*` or `*rest`) match the remainder of the path,
//!   zero or more segments; the named form binds the remainder joined by `/`
//!
//! Children are keyed by their literal text as written, so `:id` and `:name`
//! at the same level are two distinct branches.
//!
//! ## Precedence and backtracking
//!
//! At every level the search tries, in order: the exact static child, then
//! parameter children in registration order, then wildcard children in
//! registration order. The order is fixed by the node layout, never by hash
//! iteration order. If a branch fails deeper down, the search backtracks and
//! removes any parameter it bound on that branch before trying the next
//! sibling, so a static route that matches the full path always wins over a
//! parameter route at the same level.
//!
//! Lookup is O(k) in the number of segments for the common case; backtracking
//! only costs extra when sibling parameter branches overlap.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::context::RequestContext;
use crate::handler::Handler;

/// Most request paths have far fewer segments than this.
const MAX_INLINE_SEGMENTS: usize = 16;

pub(crate) type Segments<'a> = SmallVec<[&'a str; MAX_INLINE_SEGMENTS]>;

/// Split a path or pattern into its non-empty segments.
pub(crate) fn split_path(path: &str) -> Segments<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Param,
    Wildcard,
}

impl NodeKind {
    pub(crate) fn of(segment: &str) -> Self {
        if segment.starts_with(':') {
            NodeKind::Param
        } else if segment.starts_with('*') {
            NodeKind::Wildcard
        } else {
            NodeKind::Static
        }
    }
}

/// One level of the route tree.
pub(crate) struct RouteNode {
    /// The segment as written in the pattern (`users`, `:id`, `*`)
    literal: Arc<str>,
    /// Binding name for `:name` and `*name`; `None` for statics and bare `*`
    param_name: Option<Arc<str>>,
    statics: HashMap<Arc<str>, RouteNode>,
    params: Vec<RouteNode>,
    wildcards: Vec<RouteNode>,
    /// Present only on nodes where a registered pattern ends
    handler: Option<Arc<dyn Handler>>,
}

impl RouteNode {
    pub(crate) fn root() -> Self {
        Self::new("")
    }

    fn new(literal: &str) -> Self {
        let param_name = match NodeKind::of(literal) {
            NodeKind::Static => None,
            NodeKind::Param | NodeKind::Wildcard => {
                Some(&literal[1..]).filter(|n| !n.is_empty()).map(Arc::from)
            }
        };
        Self {
            literal: Arc::from(literal),
            param_name,
            statics: HashMap::new(),
            params: Vec::new(),
            wildcards: Vec::new(),
            handler: None,
        }
    }

    /// Walk or create the nodes for `segments` and attach `handler` to the last
    /// one. Returns the handler that was replaced, if any.
    pub(crate) fn insert(
        &mut self,
        segments: &[&str],
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        let mut node = self;
        for segment in segments {
            node = node.child_or_insert(segment);
        }
        node.handler.replace(handler)
    }

    fn child_or_insert(&mut self, segment: &str) -> &mut RouteNode {
        let bucket = match NodeKind::of(segment) {
            NodeKind::Static => {
                return self
                    .statics
                    .entry(Arc::from(segment))
                    .or_insert_with(|| RouteNode::new(segment));
            }
            NodeKind::Param => &mut self.params,
            NodeKind::Wildcard => &mut self.wildcards,
        };
        let idx = match bucket.iter().position(|c| c.literal.as_ref() == segment) {
            Some(idx) => idx,
            None => {
                bucket.push(RouteNode::new(segment));
                bucket.len() - 1
            }
        };
        &mut bucket[idx]
    }

    /// Find the handler for `segments`, binding parameters into `ctx`.
    ///
    /// On failure `ctx.params` is left exactly as it was on entry.
    pub(crate) fn search<'n>(
        &'n self,
        segments: &[&str],
        ctx: &mut RequestContext,
    ) -> Option<&'n Arc<dyn Handler>> {
        let Some((segment, rest)) = segments.split_first() else {
            return self
                .handler
                .as_ref()
                .or_else(|| self.search_wildcards(segments, ctx));
        };

        if let Some(child) = self.statics.get(*segment) {
            if let Some(handler) = child.search(rest, ctx) {
                return Some(handler);
            }
        }

        for child in &self.params {
            let Some(name) = child.param_name.as_ref() else {
                continue;
            };
            let displaced = ctx.replace_param(Arc::clone(name), (*segment).to_owned());
            if let Some(handler) = child.search(rest, ctx) {
                return Some(handler);
            }
            // Backtrack: undo this branch's binding
            match displaced {
                Some(value) => ctx.set_param(Arc::clone(name), value),
                None => {
                    ctx.remove_param(name);
                }
            }
        }

        self.search_wildcards(segments, ctx)
    }

    fn search_wildcards<'n>(
        &'n self,
        remainder: &[&str],
        ctx: &mut RequestContext,
    ) -> Option<&'n Arc<dyn Handler>> {
        let child = self.wildcards.iter().find(|c| c.handler.is_some())?;
        if let Some(name) = child.param_name.as_ref() {
            ctx.set_param(Arc::clone(name), remainder.join("/"));
        }
        child.handler.as_ref()
    }

    /// Collect every registered pattern below this node.
    pub(crate) fn collect_patterns(&self, prefix: &str, out: &mut Vec<String>) {
        let here = if self.literal.is_empty() {
            prefix.to_string()
        } else {
            format!("{}/{}", prefix, self.literal)
        };
        if self.handler.is_some() {
            out.push(if here.is_empty() { "/".to_string() } else { here.clone() });
        }
        let mut statics: Vec<&RouteNode> = self.statics.values().collect();
        statics.sort_by(|a, b| a.literal.cmp(&b.literal));
        for child in statics.into_iter().chain(&self.params).chain(&self.wildcards) {
            child.collect_patterns(&here, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn named(name: &'static str) -> Arc<dyn Handler> {
        Arc::new(move |ctx: &mut RequestContext| -> anyhow::Result<()> {
            ctx.set_attribute("handler", name);
            Ok(())
        })
    }

    fn build(routes: &[(&str, &'static str)]) -> RouteNode {
        let mut root = RouteNode::root();
        for &(pattern, name) in routes {
            root.insert(&split_path(pattern), named(name));
        }
        root
    }

    /// Resolve `path` and run the handler so its name can be asserted.
    fn route(root: &RouteNode, path: &str) -> Option<(&'static str, RequestContext)> {
        let mut ctx = RequestContext::new(Method::GET, path);
        let handler = Arc::clone(root.search(&split_path(path), &mut ctx)?);
        handler.handle(&mut ctx).unwrap();
        let name = *ctx.attribute::<&'static str>("handler").unwrap();
        Some((name, ctx))
    }

    #[test]
    fn test_split_path_discards_empty_segments() {
        assert_eq!(split_path("/a//b/").as_slice(), ["a", "b"]);
        assert_eq!(split_path("a/b").as_slice(), ["a", "b"]);
        assert!(split_path("/").is_empty());
        assert!(split_path("").is_empty());
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(NodeKind::of("users"), NodeKind::Static);
        assert_eq!(NodeKind::of(":id"), NodeKind::Param);
        assert_eq!(NodeKind::of("*"), NodeKind::Wildcard);
        assert_eq!(NodeKind::of("*rest"), NodeKind::Wildcard);
        assert_eq!(RouteNode::new("*").param_name, None);
        assert_eq!(RouteNode::new("*rest").param_name.as_deref(), Some("rest"));
        assert_eq!(RouteNode::new(":id").param_name.as_deref(), Some("id"));
    }

    #[test]
    fn test_simple_route() {
        let root = build(&[("/health", "health_check")]);
        let (name, ctx) = route(&root, "/health").unwrap();
        assert_eq!(name, "health_check");
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn test_root_route() {
        let root = build(&[("/", "index")]);
        assert_eq!(route(&root, "/").unwrap().0, "index");
        assert_eq!(route(&root, "").unwrap().0, "index");
        assert!(route(&root, "/x").is_none());
    }

    #[test]
    fn test_intermediate_nodes_are_not_routes() {
        let root = build(&[("/a/b/c", "deep")]);
        assert!(route(&root, "/a").is_none());
        assert!(route(&root, "/a/b").is_none());
        assert!(route(&root, "/a/b/c/d").is_none());
    }

    #[test]
    fn test_different_param_names_same_position() {
        let root = build(&[
            ("/users/:user_id/posts", "get_user_posts"),
            ("/users/:id/comments", "get_user_comments"),
        ]);

        let (name, ctx) = route(&root, "/users/123/posts").unwrap();
        assert_eq!(name, "get_user_posts");
        assert_eq!(ctx.param("user_id"), Some("123"));
        assert!(ctx.param("id").is_none());

        let (name, ctx) = route(&root, "/users/456/comments").unwrap();
        assert_eq!(name, "get_user_comments");
        assert_eq!(ctx.param("id"), Some("456"));
        assert!(ctx.param("user_id").is_none());
    }

    #[test]
    fn test_backtracking_prefers_deeper_static() {
        let root = build(&[
            ("/files/:name", "file"),
            ("/files/:name/meta", "file_meta"),
            ("/files/shared/readme", "shared_readme"),
        ]);

        let (name, ctx) = route(&root, "/files/shared/readme").unwrap();
        assert_eq!(name, "shared_readme");
        assert!(ctx.params().is_empty());

        // Static branch `shared` fails on `meta`, so the param branch is used
        let (name, ctx) = route(&root, "/files/shared/meta").unwrap();
        assert_eq!(name, "file_meta");
        assert_eq!(ctx.param("name"), Some("shared"));
    }

    #[test]
    fn test_failed_branch_leaves_no_params() {
        let root = build(&[("/a/:x/b", "axb"), ("/a/:y/c/:z", "aycz")]);
        let mut ctx = RequestContext::new(Method::GET, "/a/1/d");
        assert!(root.search(&split_path("/a/1/d"), &mut ctx).is_none());
        assert!(ctx.params().is_empty());

        let (name, ctx) = route(&root, "/a/1/c/2").unwrap();
        assert_eq!(name, "aycz");
        assert_eq!(ctx.param("y"), Some("1"));
        assert_eq!(ctx.param("z"), Some("2"));
        assert!(ctx.param("x").is_none());
    }

    #[test]
    fn test_failed_search_restores_existing_binding() {
        let root = build(&[("/users/:id/x", "user_x")]);
        let mut ctx = RequestContext::new(Method::GET, "/users/1/y");
        ctx.set_param(Arc::from("id"), "keep");
        ctx.set_param(Arc::from("tenant"), "acme");

        assert!(root.search(&split_path("/users/1/y"), &mut ctx).is_none());
        assert_eq!(ctx.param("id"), Some("keep"));
        assert_eq!(ctx.param("tenant"), Some("acme"));
        assert_eq!(ctx.params().len(), 2);
    }

    #[test]
    fn test_wildcard_matches_remainder() {
        let root = build(&[("/files/*", "files"), ("/static/*path", "assets")]);

        let (name, ctx) = route(&root, "/files/a/b/c.txt").unwrap();
        assert_eq!(name, "files");
        assert!(ctx.params().is_empty());

        let (name, ctx) = route(&root, "/static/css/site.css").unwrap();
        assert_eq!(name, "assets");
        assert_eq!(ctx.param("path"), Some("css/site.css"));

        // Zero remaining segments
        let (name, ctx) = route(&root, "/static").unwrap();
        assert_eq!(name, "assets");
        assert_eq!(ctx.param("path"), Some(""));
    }

    #[test]
    fn test_precedence_static_param_wildcard() {
        let root = build(&[
            ("/x/*", "wild"),
            ("/x/:id", "param"),
            ("/x/me", "static"),
        ]);
        assert_eq!(route(&root, "/x/me").unwrap().0, "static");
        assert_eq!(route(&root, "/x/42").unwrap().0, "param");
        assert_eq!(route(&root, "/x/42/more").unwrap().0, "wild");
    }

    #[test]
    fn test_insert_replaces_handler() {
        let mut root = build(&[("/a", "old")]);
        let replaced = root.insert(&split_path("/a"), named("new"));
        assert!(replaced.is_some());
        assert_eq!(route(&root, "/a").unwrap().0, "new");
        assert!(root.insert(&split_path("/b"), named("b")).is_none());
    }

    #[test]
    fn test_collect_patterns() {
        let root = build(&[("/", "i"), ("/users/:id", "u"), ("/files/*", "f")]);
        let mut out = Vec::new();
        root.collect_patterns("", &mut out);
        assert_eq!(out, vec!["/", "/files/*", "/users/:id"]);
    }
}
