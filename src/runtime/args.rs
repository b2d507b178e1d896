//! Code-block argument parsing.
//!
//! A component's code-block body is one `key="value"` pair per line. The
//! parser is permissive: quotes are optional, unknown keys are kept (widgets
//! may consume extras), and lines without `=` are ignored. Only a missing
//! required argument is an error.

use std::collections::BTreeMap;

use crate::runtime::definition::ComponentDefinition;
use crate::runtime::error::{RuntimeError, RuntimeResult};

/// Parse a code-block body into the argument shape a definition declares.
///
/// Declared defaults fill omitted arguments; omitted required arguments
/// fail with [`RuntimeError::MissingArgument`].
pub fn parse_args(
    body: &str,
    definition: &ComponentDefinition,
) -> RuntimeResult<BTreeMap<String, String>> {
    let mut args = parse_body(body);

    for spec in &definition.args {
        if args.contains_key(&spec.name) {
            continue;
        }
        if let Some(default) = &spec.default {
            args.insert(spec.name.clone(), default.clone());
        } else if spec.required {
            return Err(RuntimeError::MissingArgument {
                name: spec.name.clone(),
                component: definition.key_name.clone(),
            });
        }
    }

    Ok(args)
}

/// Split the raw body into key/value pairs without schema knowledge.
pub fn parse_body(body: &str) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        args.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    args
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"'
        || bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::runtime::definition::{
        ArgSpec, Capabilities, ComponentDefinition, RefreshPolicy, Render, RenderContext,
        RenderFuture,
    };

    struct NoopRender;

    impl Render for NoopRender {
        fn render(&self, _ctx: RenderContext) -> RenderFuture {
            Box::pin(async { Ok(()) })
        }
    }

    fn countdown_definition() -> ComponentDefinition {
        ComponentDefinition {
            key_name: "countdown".to_string(),
            aliases: vec![],
            args: vec![
                ArgSpec::required("date", "Target date, YYYY-MM-DD"),
                ArgSpec::optional("showTime", "Render hour precision", "false"),
            ],
            settings: vec![],
            refresh: RefreshPolicy::Every(60_000),
            capabilities: Capabilities::default(),
            render: Arc::new(NoopRender),
        }
    }

    #[test]
    fn test_parse_body_pairs() {
        let args = parse_body("date=\"2030-01-01\"\nshowTime=true\n");
        assert_eq!(args.get("date").map(String::as_str), Some("2030-01-01"));
        assert_eq!(args.get("showTime").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_parse_body_permissive() {
        let args = parse_body("  date = '2030-01-01'  \n\nnot a pair\n=orphan\nextra=kept\n");
        assert_eq!(args.get("date").map(String::as_str), Some("2030-01-01"));
        assert_eq!(args.get("extra").map(String::as_str), Some("kept"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_defaults_applied() {
        let def = countdown_definition();
        let args = parse_args("date=\"2030-01-01\"", &def).unwrap();
        assert_eq!(args.get("showTime").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_missing_required_argument() {
        let def = countdown_definition();
        let err = parse_args("showTime=true", &def).unwrap_err();
        match err {
            RuntimeError::MissingArgument { name, component } => {
                assert_eq!(name, "date");
                assert_eq!(component, "countdown");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let def = countdown_definition();
        let args = parse_args("date=x\ncolor=red", &def).unwrap();
        assert_eq!(args.get("color").map(String::as_str), Some("red"));
    }

    #[test]
    fn test_value_with_equals_sign() {
        let args = parse_body("url=\"https://example.com?a=b\"");
        assert_eq!(
            args.get("url").map(String::as_str),
            Some("https://example.com?a=b")
        );
    }
}
