//! Output of `codeql resolve queries --format=bylanguage`.

use qlrun_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-query metadata as reported by the CLI. Kept opaque.
pub type QueryMetadata = serde_json::Map<String, serde_json::Value>;

/// Queries grouped by the language they declare.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQueriesOutput {
    /// Language -> query path -> metadata.
    pub by_language: BTreeMap<String, BTreeMap<String, QueryMetadata>>,
    /// Queries that declare no language.
    pub no_declared_language: BTreeMap<String, QueryMetadata>,
    /// Queries that declare more than one language.
    pub multiple_declared_languages: BTreeMap<String, QueryMetadata>,
}

impl ResolveQueriesOutput {
    /// Parse the CLI's JSON output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputParse`] if the JSON is malformed or any of the
    /// three groupings is missing or mistyped.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::output_parse("resolve queries", e.to_string()))
    }

    /// Languages that have at least one query.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.by_language.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "byLanguage": {
            "javascript": {
                "/q/js/Xss.ql": {},
                "/q/js/Sql.ql": {"kind": "path-problem"}
            },
            "python": {"/q/py/Eval.ql": {}}
        },
        "noDeclaredLanguage": {"/q/Lonely.ql": {}},
        "multipleDeclaredLanguages": {}
    }"#;

    #[test]
    fn test_parse_by_language() {
        let output = ResolveQueriesOutput::from_json(SAMPLE).unwrap();
        assert_eq!(output.languages().collect::<Vec<_>>(), vec!["javascript", "python"]);
        assert_eq!(output.by_language["javascript"].len(), 2);
        assert_eq!(
            output.by_language["javascript"]["/q/js/Sql.ql"]["kind"],
            "path-problem"
        );
        assert!(output.no_declared_language.contains_key("/q/Lonely.ql"));
        assert!(output.multiple_declared_languages.is_empty());
    }

    #[test]
    fn test_missing_grouping() {
        let err = ResolveQueriesOutput::from_json(r#"{"byLanguage": {}, "noDeclaredLanguage": {}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::OutputParse { .. }));
        assert!(err.to_string().contains("multipleDeclaredLanguages"));
    }

    #[test]
    fn test_malformed_json() {
        let err = ResolveQueriesOutput::from_json("Error: no such pack").unwrap_err();
        assert!(matches!(err, Error::OutputParse { .. }));
    }

    #[test]
    fn test_wrong_shape() {
        let err = ResolveQueriesOutput::from_json(
            r#"{"byLanguage": [], "noDeclaredLanguage": {}, "multipleDeclaredLanguages": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::OutputParse { .. }));
    }

    #[test]
    fn test_serializes_with_cli_keys() {
        let json = serde_json::to_value(ResolveQueriesOutput::default()).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["byLanguage", "multipleDeclaredLanguages", "noDeclaredLanguage"]
        );
    }
}
