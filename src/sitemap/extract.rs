//! Route discovery in front-end source files.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;

/// Finds `Route path=` declarations and `Link to=` targets.
pub struct RouteExtractor {
    route_path: Regex,
    link_to: Regex,
    param: Regex,
    slashes: Regex,
}

impl RouteExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            route_path: Regex::new(r#"Route.*?path=["']([^"']*)["']"#)?,
            link_to: Regex::new(r#"Link.*?to=["']([^"']*)["']"#)?,
            param: Regex::new(r":[^/]+")?,
            slashes: Regex::new(r"/+")?,
        })
    }

    /// Routes declared or linked to in one file.
    pub fn routes_in(&self, content: &str) -> Vec<String> {
        let declared = self
            .route_path
            .captures_iter(content)
            .filter_map(|c| self.clean_route(&c[1]));

        let linked = self.link_to.captures_iter(content).filter_map(|c| {
            let target = &c[1];
            if !target.starts_with('/') {
                return None;
            }
            let target = target.split(['?', '#']).next().unwrap_or_default();
            self.clean_route(target)
        });

        declared.chain(linked).collect()
    }

    /// Strip parameters and wildcards and tidy slashes; `None` if nothing is left.
    fn clean_route(&self, route: &str) -> Option<String> {
        let route = self.param.replace_all(route, "");
        let route = route.replace('*', "");
        let route = self.slashes.replace_all(&route, "/");
        let route = route.strip_suffix('/').unwrap_or(&route);

        if route.is_empty() {
            return None;
        }
        if route.starts_with('/') {
            Some(route.to_string())
        } else {
            Some(format!("/{route}"))
        }
    }
}

/// Collect every routable path under `src_dir`.
///
/// The root `/` is always included.
pub fn extract_routes(src_dir: &Path, extensions: &[String]) -> Result<BTreeSet<String>> {
    let extractor = RouteExtractor::new()?;
    let mut routes = BTreeSet::from(["/".to_string()]);

    for entry in WalkDir::new(src_dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let content = std::fs::read_to_string(entry.path())?;

        let before = routes.len();
        routes.extend(extractor.routes_in(&content));
        log::debug!(
            "{}: {} new routes",
            entry.path().display(),
            routes.len() - before
        );
    }

    Ok(routes)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_route() {
        let extractor = RouteExtractor::new().unwrap();
        let clean_route = |r: &str| extractor.clean_route(r);
        assert_eq!(clean_route("/rotation/:siteId"), Some("/rotation".into()));
        assert_eq!(clean_route("/search/*"), Some("/search".into()));
        assert_eq!(clean_route("//about//team/"), Some("/about/team".into()));
        assert_eq!(clean_route("about"), Some("/about".into()));
        assert_eq!(clean_route("/"), None);
        assert_eq!(clean_route("*"), None);
    }

    #[test]
    fn routes_and_links_are_found() {
        let content = r#"
            <Route path="/search" element={<Search />} />
            <Route exact path='/rotation/:siteId' element={<Detail />} />
            <Link to="/submit-review?from=nav">Review</Link>
            <Link to="https://example.com/about">External</Link>
            <Link to="relative">Relative</Link>
        "#;

        let mut routes = RouteExtractor::new().unwrap().routes_in(content);
        routes.sort();
        assert_eq!(routes, vec!["/rotation", "/search", "/submit-review"]);
    }

    #[test]
    fn walks_only_configured_extensions() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("components/pages");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(
            tmp.path().join("App.jsx"),
            r#"<Route path="/searchAll" /><Route path="/" />"#,
        )
        .unwrap();
        std::fs::write(nested.join("Nav.tsx"), r#"<Link to="/about#team">About</Link>"#).unwrap();
        std::fs::write(nested.join("notes.md"), r#"<Route path="/ignored" />"#).unwrap();

        let extensions = vec!["js".to_string(), "jsx".into(), "ts".into(), "tsx".into()];
        let routes = extract_routes(tmp.path(), &extensions).unwrap();

        let routes: Vec<&str> = routes.iter().map(String::as_str).collect();
        assert_eq!(routes, vec!["/", "/about", "/searchAll"]);
    }

    #[test]
    fn empty_tree_yields_root() {
        let tmp = TempDir::new().unwrap();
        let routes = extract_routes(tmp.path(), &["js".to_string()]).unwrap();
        assert_eq!(routes.into_iter().collect::<Vec<_>>(), vec!["/"]);
    }

    #[test]
    fn unreadable_file_aborts_extraction() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("App.js"), r#"<Route path="/search" />"#).unwrap();
        std::fs::write(tmp.path().join("Bad.js"), [0xffu8, 0xfe, 0x00, 0x80]).unwrap();

        let result = extract_routes(tmp.path(), &["js".to_string()]);
        assert!(matches!(result, Err(crate::error::AppError::Io(_))));
    }
}
