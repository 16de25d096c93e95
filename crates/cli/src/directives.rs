//! Order-significant transformer directive parsing (spec §4.2: "group
//! consecutive directives bearing the same transformer kind"). clap's
//! derive flattens repeated flags into a single `Vec`, losing the
//! interleaving `--fake A --format C --fake B` needs to build three
//! instances in that order, so this walks the raw argv once, pulls every
//! transformer-shaped token out into an ordered `TransformerConfig` list,
//! and hands clap whatever's left.

use model::TransformerConfig;

use crate::error::CliError;

const KINDS: &[&str] = &[
    "fake", "mask", "null", "overwrite", "format", "compute", "filter", "expand", "window", "drop",
];

/// Splits `argv` (no program name) into the ordered transformer directives
/// and the remaining tokens, which are handed to `Args::parse_from`.
pub fn extract(argv: &[String]) -> Result<(Vec<TransformerConfig>, Vec<String>), CliError> {
    let mut directives: Vec<TransformerConfig> = Vec::new();
    let mut remaining: Vec<String> = Vec::new();
    let mut last_fake: Option<usize> = None;
    let mut last_mask: Option<usize> = None;

    let mut iter = argv.iter();
    while let Some(token) = iter.next() {
        let kind = token.strip_prefix("--").filter(|k| KINDS.contains(k));
        if let Some(kind) = kind {
            let value = iter.next().ok_or_else(|| CliError::MissingDirectiveValue(token.clone()))?;
            directives.push(TransformerConfig::new(kind, vec![value.clone()]));
            let idx = directives.len() - 1;
            match kind {
                "fake" => last_fake = Some(idx),
                "mask" => last_mask = Some(idx),
                _ => {}
            }
            continue;
        }

        match token.as_str() {
            "--fake-seed" => {
                let value = iter.next().ok_or_else(|| CliError::MissingDirectiveValue(token.clone()))?;
                let idx = last_fake.ok_or_else(|| CliError::DanglingDirectiveOption(token.clone()))?;
                directives[idx].options.insert("seed".into(), value.clone());
            }
            "--fake-seed-column" => {
                let column = iter.next().ok_or_else(|| CliError::MissingDirectiveValue(token.clone()))?;
                let idx = last_fake.ok_or_else(|| CliError::DanglingDirectiveOption(token.clone()))?;
                for arg in directives[idx].args.iter_mut() {
                    if !arg.contains('#') {
                        arg.push_str(&format!("#seed:{column}"));
                    }
                }
            }
            "--mask-skip-null" => {
                let idx = last_mask.ok_or_else(|| CliError::DanglingDirectiveOption(token.clone()))?;
                directives[idx].options.insert("null_policy".into(), "skip-null".into());
            }
            _ => remaining.push(token.clone()),
        }
    }

    Ok((directives, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn consecutive_same_kind_directives_stay_separate_entries() {
        let (directives, remaining) = extract(&args(&["--fake", "a:internet.email", "--fake", "b:internet.email"])).unwrap();
        assert_eq!(directives.len(), 2);
        assert!(remaining.is_empty());
    }

    #[test]
    fn interleaved_kinds_preserve_order() {
        let (directives, _) = extract(&args(&["--fake", "a:x", "--format", "c:{{a}}", "--fake", "b:x"])).unwrap();
        let kinds: Vec<&str> = directives.iter().map(|d| d.kind.as_str()).collect();
        assert_eq!(kinds, vec!["fake", "format", "fake"]);
    }

    #[test]
    fn fake_seed_column_appends_seed_suffix() {
        let (directives, _) = extract(&args(&["--fake", "email:internet.email", "--fake-seed-column", "user_id"])).unwrap();
        assert_eq!(directives[0].args[0], "email:internet.email#seed:user_id");
    }

    #[test]
    fn fake_seed_sets_global_seed_option() {
        let (directives, _) = extract(&args(&["--fake", "email:internet.email", "--fake-seed", "42"])).unwrap();
        assert_eq!(directives[0].options.get("seed"), Some(&"42".to_string()));
    }

    #[test]
    fn mask_skip_null_sets_option() {
        let (directives, _) = extract(&args(&["--mask", "ssn:###-##-####", "--mask-skip-null"])).unwrap();
        assert_eq!(directives[0].options.get("null_policy"), Some(&"skip-null".to_string()));
    }

    #[test]
    fn non_transformer_flags_pass_through_untouched() {
        let (directives, remaining) = extract(&args(&["--input", "csv:in.csv", "--strict-schema"])).unwrap();
        assert!(directives.is_empty());
        assert_eq!(remaining, args(&["--input", "csv:in.csv", "--strict-schema"]));
    }

    #[test]
    fn dangling_seed_column_without_a_preceding_fake_is_an_error() {
        assert!(extract(&args(&["--fake-seed-column", "user_id"])).is_err());
    }
}
