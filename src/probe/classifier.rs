//! WordPress signature classifier
//!
//! Turns a probe result into a verdict by running an ordered rule table over
//! the response. Header rules come first, body rules after; the first match
//! wins and every match is positive. All checks are case-insensitive
//! presence tests. Nothing here touches the network or storage.

use crate::probe::fetcher::{ProbeResponse, ProbeResult};
use crate::state::Verdict;
use once_cell::sync::Lazy;
use regex::Regex;

/// Bytes scanned for NUL when deciding whether a body is text
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Versioned asset query strings (`style.css?ver=6.4.2`)
static VERSION_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\.js\?ver=[\d.]+|\.css\?ver=[\d.]+|wp-[\w-]+\.min\.js\?ver=[\d.]+|wp-[\w-]+\.css\?ver=[\d.]+",
    )
    .expect("version query pattern is valid")
});

/// A single presence check
///
/// All needles are lowercase; they are matched against lowercased text.
#[derive(Debug)]
pub enum Check {
    /// Any value of the named header contains the needle
    Header {
        name: &'static str,
        needle: &'static str,
    },

    /// The body contains at least one of the needles
    BodyAny(&'static [&'static str]),

    /// The body contains every needle
    BodyAll(&'static [&'static str]),

    /// The body matches the pattern
    BodyPattern(&'static Lazy<Regex>),
}

/// A named signature rule
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub check: Check,
}

/// Signature rules in evaluation order
pub static RULES: &[Rule] = &[
    // Headers
    Rule {
        name: "powered-by-header",
        check: Check::Header {
            name: "x-powered-by",
            needle: "wordpress",
        },
    },
    Rule {
        name: "pingback-header",
        check: Check::Header {
            name: "x-pingback",
            needle: "xmlrpc.php",
        },
    },
    Rule {
        name: "rest-api-link-header",
        check: Check::Header {
            name: "link",
            needle: "wp-json",
        },
    },
    // Body
    Rule {
        name: "generator-meta",
        check: Check::BodyAny(&[r#"<meta name="generator" content="wordpress"#]),
    },
    Rule {
        name: "core-paths",
        check: Check::BodyAny(&["/wp-content/", "/wp-includes/", "/wp-admin/"]),
    },
    Rule {
        name: "rest-api",
        check: Check::BodyAny(&[
            "wp-json",
            "/wp-json/wp/v2/",
            "wp-json/wp/v2/posts",
            "wp-json/wp/v2/pages",
            "wp-json/wp/v2/users",
        ]),
    },
    Rule {
        name: "login-admin",
        check: Check::BodyAny(&[
            "wp-login.php",
            "/wp-admin/",
            "wp-admin/css/login",
            "wp-admin/css/forms",
        ]),
    },
    Rule {
        name: "xml-rpc",
        check: Check::BodyAny(&["xmlrpc.php", "really simple discovery", "rsd+xml"]),
    },
    Rule {
        name: "rsd-edit-uri",
        check: Check::BodyAll(&["edituri", "xmlrpc.php?rsd"]),
    },
    Rule {
        name: "core-assets",
        check: Check::BodyAny(&[
            "wp-emoji-release.min.js",
            "wp-block-library",
            "dashicons.min.css",
            "/wp-includes/js/",
            "/wp-includes/css/",
            "wp-emoji",
            "emoji-release",
        ]),
    },
    Rule {
        name: "theme-plugin-paths",
        check: Check::BodyAny(&[
            "/wp-content/themes/",
            "/wp-content/plugins/",
            "/wp-content/uploads/",
            "/themes/twentytwentyfour/",
            "/themes/twentytwentythree/",
            "/themes/twentytwentytwo/",
        ]),
    },
    Rule {
        name: "markup-prefixes",
        check: Check::BodyAny(&[
            r#"class="wp-"#,
            r#"id="wp-"#,
            "wp-block-",
            "wp-site-blocks",
            "wp-container-",
            "wp-image-",
            "wp-caption",
            "wp-attachment-",
        ]),
    },
    Rule {
        name: "comment-system",
        check: Check::BodyAny(&[
            "comment-form",
            "comment-list",
            "comment-body",
            "comment-meta",
            "wp-comment-",
            "commentform",
        ]),
    },
    Rule {
        name: "version-query",
        check: Check::BodyPattern(&VERSION_QUERY),
    },
    Rule {
        name: "template-functions",
        check: Check::BodyAny(&[
            "wp_unique_id",
            "wp_enqueue_script",
            "wp_enqueue_style",
            "wp_head",
            "wp_footer",
        ]),
    },
    Rule {
        name: "pingback-link",
        check: Check::BodyAny(&[r#"rel="pingback""#]),
    },
    Rule {
        name: "gallery-blocks",
        check: Check::BodyAny(&["wp-block-image", "wp-block-gallery"]),
    },
    Rule {
        name: "gallery-classes",
        check: Check::BodyAll(&["gallery-", "wp-"]),
    },
    Rule {
        name: "shortlink",
        check: Check::BodyAll(&[r#"rel="shortlink""#, "?p="]),
    },
];

/// A response prepared for rule evaluation
///
/// Bodies that look binary are never decoded; header rules still apply to
/// them, body rules never match.
pub struct Inspection<'a> {
    response: &'a ProbeResponse,
    body: Option<String>,
}

impl<'a> Inspection<'a> {
    /// Decodes and lowercases the body once for all rules
    pub fn new(response: &'a ProbeResponse) -> Self {
        let sniff = &response.body[..response.body.len().min(BINARY_SNIFF_LEN)];
        let body = if sniff.contains(&0) {
            None
        } else {
            Some(String::from_utf8_lossy(&response.body).to_lowercase())
        };
        Self { response, body }
    }

    /// Returns true if a NUL byte showed up in the head of the body
    pub fn is_binary(&self) -> bool {
        self.body.is_none()
    }

    /// Returns true if the body holds nothing but whitespace
    pub fn body_is_empty(&self) -> bool {
        self.response
            .body
            .iter()
            .all(|b| b.is_ascii_whitespace())
    }
}

impl Rule {
    /// Evaluates this rule against an inspected response
    pub fn matches(&self, inspection: &Inspection<'_>) -> bool {
        if let Check::Header { name, needle } = &self.check {
            return inspection
                .response
                .header_values(name)
                .any(|value| value.to_lowercase().contains(needle));
        }

        let Some(body) = inspection.body.as_deref() else {
            return false;
        };
        match &self.check {
            Check::BodyAny(needles) => needles.iter().any(|n| body.contains(n)),
            Check::BodyAll(needles) => needles.iter().all(|n| body.contains(n)),
            Check::BodyPattern(pattern) => pattern.is_match(body),
            Check::Header { .. } => false,
        }
    }
}

/// Finds the first rule that matches a response
pub fn matching_rule(response: &ProbeResponse) -> Option<&'static Rule> {
    let inspection = Inspection::new(response);
    RULES.iter().find(|rule| rule.matches(&inspection))
}

/// Classifies a captured response
///
/// An empty body is `NoReply` even when a signature header is present. A
/// binary body can still be `Positive` through a header rule; otherwise it
/// is `NoReply`.
pub fn classify_response(response: &ProbeResponse) -> Verdict {
    let inspection = Inspection::new(response);

    if inspection.body_is_empty() {
        return Verdict::NoReply;
    }

    match RULES.iter().find(|rule| rule.matches(&inspection)) {
        Some(rule) => {
            tracing::trace!("Matched signature rule '{}'", rule.name);
            Verdict::Positive
        }
        None if inspection.is_binary() => {
            tracing::debug!("Treating binary body as no reply");
            Verdict::NoReply
        }
        None => Verdict::Negative,
    }
}

/// Classifies a probe result
///
/// Failure markers and empty bodies are `NoReply`; otherwise the first
/// matching rule makes the verdict `Positive`, and no match is `Negative`.
///
/// # Example
///
/// ```
/// use wp_census::probe::{classify, ProbeResponse, ProbeResult};
/// use wp_census::Verdict;
///
/// let page = ProbeResponse::ok(r#"<link rel="stylesheet" href="/wp-content/themes/x/style.css">"#);
/// assert_eq!(classify(&ProbeResult::Response(page)), Verdict::Positive);
/// ```
pub fn classify(result: &ProbeResult) -> Verdict {
    match result {
        ProbeResult::Failure { .. } => Verdict::NoReply,
        ProbeResult::Response(response) => classify_response(response),
    }
}
