//! Sitemap-protocol XML rendering.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Render a `<urlset>` with one `<url>` per route.
pub fn generate_sitemap(base_url: &str, routes: &BTreeSet<String>, lastmod: DateTime<Utc>) -> String {
    let base = base_url.trim_end_matches('/');
    let lastmod = lastmod.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{SITEMAP_NS}\">\n"));

    for route in routes {
        let priority = if route == "/" { "1.0" } else { "0.8" };
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>weekly</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            escape(&format!("{base}{route}")),
            lastmod,
            priority
        ));
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
