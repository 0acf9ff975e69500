//! HTML rewrites applied to served pages.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Opening `<script ...>` tag; group 1 holds the attributes.
static SCRIPT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)<script(\s[^>]*)?>").unwrap());

/// `src` or `nonce` attribute present.
static SRC_OR_NONCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)(?:^|\s)(?:src|nonce)\s*=").unwrap());

/// `type` attribute value, quoted or bare.
static TYPE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)(?:^|\s)type\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

const BODY_CLOSE: &[u8] = b"</body>";

/// Insert `script` before the last `</body>`, or append it if there is none.
pub fn inject_script(content: &[u8], script: &str) -> Vec<u8> {
    let script = script.as_bytes();
    let mut result = Vec::with_capacity(content.len() + script.len());

    match content
        .windows(BODY_CLOSE.len())
        .rposition(|w| w.eq_ignore_ascii_case(BODY_CLOSE))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script);
        }
    }
    result
}

/// Tag every inline JavaScript `<script>` with `nonce`.
///
/// Scripts with `src`, an existing `nonce`, or a non-JavaScript `type`
/// (e.g. JSON-LD, templates) are left alone.
pub fn apply_nonce(content: &[u8], nonce: &str) -> Vec<u8> {
    let attribute = format!(" nonce=\"{nonce}\"");
    let mut result = Vec::with_capacity(content.len() + 64);
    let mut last = 0;

    for caps in SCRIPT_OPEN.captures_iter(content) {
        let attrs = caps.get(1).map_or(&b""[..], |m| m.as_bytes());
        if !needs_nonce(attrs) {
            continue;
        }
        // Insert right after `<script`
        let at = caps.get(0).map_or(0, |m| m.start()) + "<script".len();
        result.extend_from_slice(&content[last..at]);
        result.extend_from_slice(attribute.as_bytes());
        last = at;
    }

    result.extend_from_slice(&content[last..]);
    result
}

fn needs_nonce(attrs: &[u8]) -> bool {
    if SRC_OR_NONCE.is_match(attrs) {
        return false;
    }
    let Some(caps) = TYPE_ATTR.captures(attrs) else {
        return true;
    };
    let value = (1..=3)
        .find_map(|i| caps.get(i))
        .map_or(&b""[..], |m| m.as_bytes());
    is_javascript_type(value)
}

fn is_javascript_type(value: &[u8]) -> bool {
    let value = value.trim_ascii();
    value.is_empty()
        || [
            &b"module"[..],
            b"text/javascript",
            b"application/javascript",
            b"text/ecmascript",
            b"application/ecmascript",
        ]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
