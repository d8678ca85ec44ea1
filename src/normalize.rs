//! Canonicalization for crawler-configuration input.
//!
//! These functions are the only place where schema drift between legacy and
//! current payloads is resolved: string shorthands, camelCase key aliases,
//! missing fields, scheme injection and downgrade. Every function is
//! idempotent over its own output.

use serde_json::Value;
use thiserror::Error;

use crate::models::{AllowRule, MatchMode, Seed, TypeFlags};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid scheme \"{scheme}\". Only http:// and https:// are allowed.")]
pub struct SchemeError {
    pub scheme: String,
}

/// Canonicalize one URL row: trim, inject or downgrade the scheme according
/// to `allow_http`, strip any fragment, and give host-only patterns a
/// trailing slash. Non-http(s) schemes are a hard error; everything else is
/// tolerated best-effort.
pub fn normalize_url_row(input: &str, allow_http: bool) -> Result<String, SchemeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let without_fragment = match trimmed.split_once('#') {
        Some((head, _)) => head,
        None => trimmed,
    };

    let mut url = match without_fragment.split_once("://") {
        Some((scheme, rest)) => {
            let scheme = scheme.trim().to_ascii_lowercase();
            match scheme.as_str() {
                "https" => format!("https://{rest}"),
                "http" if allow_http => format!("http://{rest}"),
                "http" => format!("https://{rest}"),
                "" => prepend_scheme(rest, allow_http),
                _ => return Err(SchemeError { scheme }),
            }
        }
        None => prepend_scheme(without_fragment, allow_http),
    };

    let host_and_path = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    if !host_and_path.is_empty() && !host_and_path.contains('/') {
        url.push('/');
    }

    Ok(url)
}

fn prepend_scheme(rest: &str, allow_http: bool) -> String {
    if allow_http {
        format!("http://{rest}")
    } else {
        format!("https://{rest}")
    }
}

/// Reduce free-form input to a bare domain: drop the scheme and everything
/// from the first path separator on.
pub fn normalize_domain_input(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Accept a seed in string shorthand or object form.
pub fn normalize_seed(raw: &Value) -> Seed {
    let (url, allow_http) = match raw {
        Value::String(s) => (s.clone(), false),
        Value::Object(map) => {
            let url = map
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let allow_http = map
                .get("allow_http")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            (url, allow_http)
        }
        _ => (String::new(), false),
    };

    let url = normalize_url_row(&url, allow_http).unwrap_or(url);
    Seed { url, allow_http }
}

/// Accept an allow-rule in string shorthand or object form, resolving the
/// legacy `authProfile` key and filling defaults. Rows whose stored pattern
/// carries a scheme we no longer accept are kept as typed rather than
/// dropped.
pub fn normalize_allow_rule(raw: &Value) -> AllowRule {
    let mut rule = match raw {
        Value::String(s) => AllowRule {
            id: None,
            pattern: s.trim().to_string(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        },
        _ => serde_json::from_value::<AllowRule>(raw.clone()).unwrap_or(AllowRule {
            id: None,
            pattern: String::new(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        }),
    };

    if let Ok(pattern) = normalize_url_row(&rule.pattern, rule.allow_http) {
        rule.pattern = pattern;
    }
    rule.types = normalize_types(&serde_json::to_value(rule.types).unwrap_or(Value::Null));
    if let Some(profile) = rule.auth_profile.as_deref() {
        if profile.trim().is_empty() {
            rule.auth_profile = None;
        }
    }
    rule
}

/// Resolve type flags from whatever shape the payload carries. An absent or
/// effectively empty block falls back to web-only.
pub fn normalize_types(raw: &Value) -> TypeFlags {
    let Value::Object(map) = raw else {
        return TypeFlags::default();
    };

    let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);
    let flags = TypeFlags {
        web: flag("web"),
        pdf: flag("pdf"),
        docx: flag("docx"),
        xlsx: flag("xlsx"),
        pptx: flag("pptx"),
    };

    if flags.any() {
        flags
    } else {
        TypeFlags::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_row_injects_scheme_from_flag() {
        assert_eq!(
            normalize_url_row("example.com", false).unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url_row("example.com", true).unwrap(),
            "http://example.com/"
        );
    }

    #[test]
    fn url_row_downgrades_http_when_not_allowed() {
        assert_eq!(
            normalize_url_row("http://example.com/docs", false).unwrap(),
            "https://example.com/docs"
        );
        assert_eq!(
            normalize_url_row("http://example.com/docs", true).unwrap(),
            "http://example.com/docs"
        );
    }

    #[test]
    fn url_row_rejects_foreign_schemes() {
        let err = normalize_url_row("ftp://x.com", false).unwrap_err();
        assert_eq!(err.scheme, "ftp");
        assert_eq!(
            err.to_string(),
            "Invalid scheme \"ftp\". Only http:// and https:// are allowed."
        );
    }

    #[test]
    fn url_row_strips_fragments_and_slashes_host_only() {
        assert_eq!(
            normalize_url_row("https://x.com#section", false).unwrap(),
            "https://x.com/"
        );
        assert_eq!(
            normalize_url_row("https://x.com/docs#a", false).unwrap(),
            "https://x.com/docs"
        );
    }

    #[test]
    fn url_row_is_idempotent() {
        for (input, allow_http) in [
            ("example.com", false),
            ("http://example.com/a#frag", false),
            ("  HTTPS://Example.com  ", true),
            ("x.com/deep/path", true),
        ] {
            let once = normalize_url_row(input, allow_http).unwrap();
            let twice = normalize_url_row(&once, allow_http).unwrap();
            assert_eq!(once, twice, "input {input:?}");
        }
    }

    #[test]
    fn domain_input_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain_input("https://ads.example.com/track?id=1"),
            "ads.example.com"
        );
        assert_eq!(normalize_domain_input("ads.example.com"), "ads.example.com");
        assert_eq!(
            normalize_domain_input(normalize_domain_input("http://a.b/c").as_str()),
            "a.b"
        );
    }

    #[test]
    fn seed_accepts_string_and_object_forms() {
        let short = normalize_seed(&json!("x.com"));
        assert_eq!(
            short,
            Seed {
                url: "https://x.com/".to_string(),
                allow_http: false
            }
        );

        let full = normalize_seed(&json!({"url": "intranet.local", "allow_http": true}));
        assert_eq!(
            full,
            Seed {
                url: "http://intranet.local/".to_string(),
                allow_http: true
            }
        );
    }

    #[test]
    fn seed_normalization_is_idempotent() {
        let once = normalize_seed(&json!("http://x.com"));
        let twice = normalize_seed(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn allow_rule_accepts_string_shorthand() {
        let rule = normalize_allow_rule(&json!("docs.example.com"));
        assert_eq!(rule.pattern, "https://docs.example.com/");
        assert_eq!(rule.match_mode, MatchMode::Prefix);
        assert!(rule.types.web);
        assert!(!rule.allow_http);
        assert!(rule.auth_profile.is_none());
    }

    #[test]
    fn allow_rule_resolves_legacy_alias_and_blank_profile() {
        let rule = normalize_allow_rule(&json!({
            "pattern": "https://x.com/",
            "authProfile": "campus",
        }));
        assert_eq!(rule.auth_profile.as_deref(), Some("campus"));

        let blank = normalize_allow_rule(&json!({
            "pattern": "https://x.com/",
            "auth_profile": "  ",
        }));
        assert!(blank.auth_profile.is_none());
    }

    #[test]
    fn allow_rule_normalization_is_idempotent() {
        let once = normalize_allow_rule(&json!({
            "pattern": "x.com/docs#frag",
            "match": "exact",
            "types": {"pdf": true},
            "allow_http": true,
        }));
        let twice = normalize_allow_rule(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn types_default_to_web_when_missing_or_empty() {
        assert!(normalize_types(&Value::Null).web);
        assert!(normalize_types(&json!({})).web);
        assert!(normalize_types(&json!({"web": false, "pdf": false})).web);

        let pdf_only = normalize_types(&json!({"pdf": true}));
        assert!(pdf_only.pdf);
        assert!(!pdf_only.web);
    }

    #[test]
    fn types_normalization_is_idempotent() {
        let once = normalize_types(&json!({"pdf": true, "xlsx": true}));
        let twice = normalize_types(&serde_json::to_value(once).unwrap());
        assert_eq!(once, twice);
    }
}
