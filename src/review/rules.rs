//! Per-repository review rules.
//!
//! A repository may ship a YAML file that overrides the built-in defaults.
//! The fragment is deep-merged onto the defaults as a YAML tree and the
//! result is validated into [`RuleConfig`]. Anything that fails along the
//! way leaves the defaults in force.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::review::diff::Exclusions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub message: MessageConfig,
    pub scanner: ScannerConfig,
    pub pycodestyle: CheckerOptions,
    /// Never open a new comment on a clean pull request.
    #[serde(default, deserialize_with = "null_as_default")]
    pub no_blank_comment: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub only_mention_files_with_errors: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub descending_issues_order: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageConfig {
    pub opened: MessageTemplate,
    pub updated: MessageTemplate,
    pub no_errors: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub footer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Only report violations on lines the pull request adds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub diff_only: bool,
}

/// The `pycodestyle` section. Code lists and exclusions are typed; every
/// other key is passed through to the checker as a command-line option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ignore: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub select: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclude: Vec<String>,
    #[serde(flatten)]
    pub options: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Number(i64),
    Decimal(f64),
    Text(String),
    List(Vec<String>),
    /// A key written without a value.
    Null,
}

impl OptionValue {
    /// Render as a command-line argument; falsy values yield nothing.
    fn to_arg(&self, key: &str) -> Option<String> {
        match self {
            OptionValue::Flag(true) => Some(format!("--{key}")),
            OptionValue::Flag(false) | OptionValue::Number(0) | OptionValue::Null => None,
            OptionValue::Number(n) => Some(format!("--{key}={n}")),
            OptionValue::Decimal(n) if *n == 0.0 => None,
            OptionValue::Decimal(n) => Some(format!("--{key}={n}")),
            OptionValue::Text(s) if s.is_empty() => None,
            OptionValue::Text(s) => Some(format!("--{key}={s}")),
            OptionValue::List(items) => list_arg(key, items),
        }
    }
}

/// An explicit null reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn list_arg(key: &str, items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(format!("--{key}={}", items.join(",")))
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        let options = [
            ("max-line-length", OptionValue::Number(79)),
            ("count", OptionValue::Flag(false)),
            ("first", OptionValue::Flag(false)),
            ("show-source", OptionValue::Flag(false)),
            ("statistics", OptionValue::Flag(false)),
            ("hang-closing", OptionValue::Flag(false)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            message: MessageConfig {
                opened: MessageTemplate::default(),
                updated: MessageTemplate::default(),
                no_errors: "There are currently no PEP 8 issues detected in this Pull Request. \
                            Cheers! :beers: "
                    .to_string(),
            },
            scanner: ScannerConfig::default(),
            pycodestyle: CheckerOptions {
                ignore: Vec::new(),
                select: Vec::new(),
                exclude: Vec::new(),
                options,
            },
            no_blank_comment: true,
            only_mention_files_with_errors: true,
            descending_issues_order: false,
        }
    }
}

impl RuleConfig {
    /// Resolve the rules for a repository from its raw YAML fragment.
    pub fn resolve(remote: Option<&str>) -> Self {
        let defaults = RuleConfig::default();
        let Some(raw) = remote else {
            return defaults.normalized();
        };

        let fragment: Value = match serde_yaml::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Repository config is not valid YAML, using defaults");
                return defaults.normalized();
            }
        };
        // An empty file parses as null.
        if !fragment.is_mapping() {
            if !fragment.is_null() {
                tracing::warn!("Repository config is not a mapping, using defaults");
            }
            return defaults.normalized();
        }

        let mut tree = match serde_yaml::to_value(&defaults) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize default rules");
                return defaults.normalized();
            }
        };
        merge(&mut tree, fragment);

        match serde_yaml::from_value::<RuleConfig>(tree) {
            Ok(rules) => rules.normalized(),
            Err(e) => {
                tracing::warn!(error = %e, "Repository config has invalid values, using defaults");
                defaults.normalized()
            }
        }
    }

    /// pycodestyle matches codes case-sensitively.
    fn normalized(mut self) -> Self {
        self.pycodestyle.ignore = self
            .pycodestyle
            .ignore
            .iter()
            .map(|code| code.to_uppercase())
            .collect();
        self
    }

    /// Command-line arguments for the checker.
    pub fn checker_args(&self) -> Vec<String> {
        let opts = &self.pycodestyle;
        let mut args = Vec::new();
        args.extend(list_arg("ignore", &opts.ignore));
        args.extend(list_arg("select", &opts.select));
        args.extend(list_arg("exclude", &opts.exclude));
        args.extend(
            opts.options
                .iter()
                .filter_map(|(key, value)| value.to_arg(key)),
        );
        args
    }

    /// The formatter only honours the ignore list.
    pub fn formatter_args(&self) -> Vec<String> {
        list_arg("ignore", &self.pycodestyle.ignore)
            .into_iter()
            .collect()
    }

    pub fn exclusions(&self) -> Exclusions {
        Exclusions::new(&self.pycodestyle.exclude)
    }
}

/// Deep-merge `overlay` into `base`. Mappings merge key by key; any other
/// value, sequences included, replaces what was there.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                let both_mappings =
                    value.is_mapping() && base_map.get(&key).map_or(false, Value::is_mapping);
                if both_mappings {
                    if let Some(existing) = base_map.get_mut(&key) {
                        merge(existing, value);
                    }
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_missing_or_broken_config_yields_defaults() {
        let defaults = RuleConfig::default();
        assert_eq!(RuleConfig::resolve(None), defaults);
        assert_eq!(RuleConfig::resolve(Some("")), defaults);
        assert_eq!(RuleConfig::resolve(Some("pycodestyle: [unclosed")), defaults);
        assert_eq!(RuleConfig::resolve(Some("- just\n- a list\n")), defaults);
    }

    #[test]
    fn test_type_mismatch_yields_defaults() {
        let rules = RuleConfig::resolve(Some("scanner:\n  diff_only: maybe-later\n"));
        assert_eq!(rules, RuleConfig::default());
    }

    #[test]
    fn test_fragment_overrides_nested_keys_only() {
        let rules = RuleConfig::resolve(Some(
            "scanner:\n  diff_only: true\nmessage:\n  opened:\n    header: Hi there\n",
        ));
        assert!(rules.scanner.diff_only);
        assert_eq!(rules.message.opened.header, "Hi there");
        assert_eq!(rules.message.opened.footer, "");
        assert_eq!(rules.message.no_errors, RuleConfig::default().message.no_errors);
        assert_eq!(
            rules.pycodestyle.options.get("max-line-length"),
            Some(&OptionValue::Number(79))
        );
    }

    #[test]
    fn test_sequences_are_replaced_not_merged() {
        let mut base = yaml("a:\n  list: [1, 2, 3]\n  keep: x\n");
        merge(&mut base, yaml("a:\n  list: [9]\n"));
        assert_eq!(base, yaml("a:\n  list: [9]\n  keep: x\n"));
    }

    #[test]
    fn test_scalar_replaces_mapping() {
        let mut base = yaml("a:\n  b: 1\n");
        merge(&mut base, yaml("a: flat\n"));
        assert_eq!(base, yaml("a: flat\n"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let defaults = serde_yaml::to_value(RuleConfig::default()).unwrap();

        let mut merged = defaults.clone();
        merge(&mut merged, defaults.clone());
        assert_eq!(merged, defaults);

        let fragment = yaml("pycodestyle:\n  ignore: [w503]\n  max-line-length: 100\nscanner:\n  diff_only: true\n");
        let mut once = defaults.clone();
        merge(&mut once, fragment.clone());
        let mut twice = once.clone();
        merge(&mut twice, fragment);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_defaults_round_trip_through_resolve() {
        let text = serde_yaml::to_string(&RuleConfig::default()).unwrap();
        assert_eq!(RuleConfig::resolve(Some(&text)), RuleConfig::default());
    }

    #[test]
    fn test_ignore_codes_are_uppercased() {
        let rules = RuleConfig::resolve(Some("pycodestyle:\n  ignore: [w503, E501, e203]\n"));
        let got: BTreeSet<_> = rules.pycodestyle.ignore.iter().cloned().collect();
        let want: BTreeSet<_> = ["W503", "E501", "E203"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_checker_args() {
        let rules = RuleConfig::resolve(Some(
            "pycodestyle:\n  ignore: [e501, W503]\n  max-line-length: 100\n  statistics: true\n  count: false\n  select: []\n  exclude: [docs/*, build/*]\n  format: pylint\n",
        ));
        assert_eq!(
            rules.checker_args(),
            vec![
                "--ignore=E501,W503",
                "--exclude=docs/*,build/*",
                "--format=pylint",
                "--max-line-length=100",
                "--statistics",
            ]
        );
    }

    #[test]
    fn test_falsy_options_are_omitted() {
        let rules = RuleConfig::resolve(Some(
            "pycodestyle:\n  max-line-length: 0\n  format: ''\n  filename: []\n",
        ));
        assert!(rules.checker_args().is_empty());
    }

    #[test]
    fn test_keys_without_values_keep_the_rest_of_the_config() {
        let rules = RuleConfig::resolve(Some(
            "scanner:\n  diff_only: true\npycodestyle:\n  max-line-length: 100\n  show-source:\n  ignore:\n",
        ));
        assert!(rules.scanner.diff_only);
        assert!(rules.pycodestyle.ignore.is_empty());
        assert_eq!(rules.pycodestyle.options.get("show-source"), Some(&OptionValue::Null));
        assert_eq!(rules.checker_args(), vec!["--max-line-length=100"]);
    }

    #[test]
    fn test_decimal_options_are_passed_through() {
        let rules = RuleConfig::resolve(Some(
            "scanner:\n  diff_only: true\npycodestyle:\n  max-doc-length: 72.0\n  max-line-length: 0.0\n",
        ));
        assert!(rules.scanner.diff_only);
        assert_eq!(rules.checker_args(), vec!["--max-doc-length=72"]);
    }

    #[test]
    fn test_null_section_entries_read_as_defaults() {
        let rules = RuleConfig::resolve(Some(
            "message:\n  opened:\n    header:\n    footer: Bye\nno_blank_comment:\n",
        ));
        assert_eq!(rules.message.opened.header, "");
        assert_eq!(rules.message.opened.footer, "Bye");
        assert!(!rules.no_blank_comment);
    }

    #[test]
    fn test_formatter_args_only_carry_ignore() {
        let rules = RuleConfig::resolve(Some(
            "pycodestyle:\n  ignore: [e501]\n  max-line-length: 120\n",
        ));
        assert_eq!(rules.formatter_args(), vec!["--ignore=E501"]);
        assert!(RuleConfig::default().formatter_args().is_empty());
    }

    #[test]
    fn test_exclusions_come_from_the_checker_section() {
        let rules = RuleConfig::resolve(Some("pycodestyle:\n  exclude: [vendor/*]\n"));
        assert!(rules.exclusions().is_match("vendor/six.py"));
        assert!(!rules.exclusions().is_match("src/six.py"));
    }
}
