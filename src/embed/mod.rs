//! Embedded static resources for forge.
//!
//! - `build` - Page shell used by the builder
//! - `serve` - Live-reload client injected by the dev server

mod text;

use text::{Embedded, Slots};

pub mod build {
    use super::{Embedded, Slots};

    /// Variables for page.html. Values must already be HTML-safe.
    pub struct PageVars {
        pub title: String,
        pub content: String,
    }

    impl Slots for PageVars {
        fn slots(&self) -> Vec<(&'static str, String)> {
            // Content last so markup in the body is never rescanned
            vec![
                ("__TITLE__", self.title.clone()),
                ("__CONTENT__", self.content.clone()),
            ]
        }
    }

    /// HTML shell wrapped around every rendered page.
    pub const PAGE_HTML: Embedded<PageVars> = Embedded::new(include_str!("build/page.html"));
}

pub mod serve {
    use super::{Embedded, Slots};

    /// Variables for livereload.js.
    pub struct LiveReloadVars {
        pub ws_port: u16,
        pub nonce: Option<String>,
    }

    impl Slots for LiveReloadVars {
        fn slots(&self) -> Vec<(&'static str, String)> {
            vec![("__FORGE_WS_PORT__", self.ws_port.to_string())]
        }

        fn finish(&self, script: String) -> String {
            match &self.nonce {
                Some(nonce) => format!("<script nonce=\"{nonce}\">\n{script}</script>"),
                None => format!("<script>\n{script}</script>"),
            }
        }
    }

    /// Live-reload client, rendered as a complete `<script>` element.
    pub const LIVERELOAD_JS: Embedded<LiveReloadVars> =
        Embedded::new(include_str!("serve/livereload.js"));

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_livereload_tag() {
            let tag = LIVERELOAD_JS.render(&LiveReloadVars {
                ws_port: 5280,
                nonce: None,
            });
            assert!(tag.starts_with("<script>"));
            assert!(tag.ends_with("</script>"));
            assert!(tag.contains(":5280/__forge/ws"));
            assert!(!tag.contains("__FORGE_WS_PORT__"));
        }

        #[test]
        fn test_livereload_tag_with_nonce() {
            let tag = LIVERELOAD_JS.render(&LiveReloadVars {
                ws_port: 1,
                nonce: Some("abc".to_string()),
            });
            assert!(tag.starts_with("<script nonce=\"abc\">"));
        }
    }
}
