use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{VocabularyConfig, VocabularyEntries};
use crate::error::{PipelineError, Result};
use crate::records::{parse_flag, CanonicalRecord, UnifiedRecord};

#[derive(Debug, Clone, Copy)]
pub struct AliasDescriptor {
    pub variant: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct RuleDescriptor {
    pub contains: &'static [&'static str],
    pub label: &'static str,
}

static ORGANIZATION_ALIASES: Lazy<Vec<AliasDescriptor>> = Lazy::new(|| {
    let alias = |variant: &'static str, label: &'static str| AliasDescriptor { variant, label };
    vec![
        alias("Polícia Rodoviária Federal", "PRF"),
        alias("Policia Rodoviaria Federal", "PRF"),
        alias("PRF", "PRF"),
        alias("Polícia Rodoviária Federal - PRF", "PRF"),
        alias("DETRAN", "DETRAN"),
        alias("DETRAN-PI", "DETRAN"),
        alias("DETRAN/PI", "DETRAN"),
        alias("DETRAN/TI", "DETRAN"),
        alias("Câmara Municipal de Teresina", "Câmara Municipal de Teresina"),
        alias("CAMARA MUNICIPAL DE TERESINA", "Câmara Municipal de Teresina"),
        alias("MPPI", "MPPI"),
        alias("MP-PI", "MPPI"),
        alias("MPE-PI", "MPPI"),
        alias("MPE PI", "MPPI"),
        alias("MPEPI", "MPPI"),
        alias("Ministerio Publico do Estado do Piaui", "MPPI"),
        alias("Ministério Público do Estado do Piauí", "MPPI"),
        alias("Ministerio Publico do Piaui", "MPPI"),
        alias("Ministério Público do Piauí", "MPPI"),
        alias("SAD", "SEAD"),
    ]
});

static ORGANIZATION_RULES: Lazy<Vec<RuleDescriptor>> = Lazy::new(|| {
    vec![RuleDescriptor {
        contains: &["prf", "policia rodoviaria federal"],
        label: "PRF",
    }]
});

pub fn builtin_organization_aliases() -> &'static [AliasDescriptor] {
    ORGANIZATION_ALIASES.as_slice()
}

pub fn builtin_organization_rules() -> &'static [RuleDescriptor] {
    ORGANIZATION_RULES.as_slice()
}

/// Lookup key for vocabulary matching: accents, case, punctuation and spacing
/// differences all collapse (`"DETRAN-PI"` and `"detran/pi"` give `"detran pi"`).
pub fn normalize_key(value: &str) -> String {
    let folded: String = value
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringRule {
    needles: Vec<String>,
    label: String,
}

impl SubstringRule {
    pub fn new<I, S>(needles: I, label: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|needle| normalize_key(needle.as_ref()))
                .filter(|needle| !needle.is_empty())
                .collect(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn matches(&self, key: &str) -> bool {
        self.needles.iter().any(|needle| key.contains(needle.as_str()))
    }
}

/// A controlled vocabulary: exact alias table first, then substring rules in order.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    name: &'static str,
    aliases: BTreeMap<String, String>,
    rules: Vec<SubstringRule>,
}

impl Vocabulary {
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            aliases: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    pub fn builtin_organization() -> Result<Self> {
        let mut vocabulary = Self::empty("organization");
        for descriptor in builtin_organization_aliases() {
            vocabulary.insert_alias(descriptor.variant, descriptor.label)?;
        }
        for descriptor in builtin_organization_rules() {
            vocabulary.push_rule(SubstringRule::new(
                descriptor.contains.iter().copied(),
                descriptor.label,
            ));
        }
        Ok(vocabulary)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.rules.is_empty()
    }

    pub fn insert_alias(&mut self, variant: &str, label: &str) -> Result<()> {
        let key = normalize_key(variant);
        let label = label.trim();
        if key.is_empty() || label.is_empty() {
            return Err(self.invalid(format!(
                "alias '{variant}' -> '{label}' has an empty side"
            )));
        }

        match self.aliases.get(&key) {
            Some(existing) if existing != label => Err(self.invalid(format!(
                "'{variant}' maps to both '{existing}' and '{label}'"
            ))),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(key, label.to_string());
                Ok(())
            }
        }
    }

    pub fn push_rule(&mut self, rule: SubstringRule) {
        self.rules.push(rule);
    }

    pub fn extend(&mut self, entries: &VocabularyEntries) -> Result<()> {
        for (variant, label) in &entries.aliases {
            self.insert_alias(variant, label)?;
        }
        for rule in &entries.rules {
            if rule.label.trim().is_empty() {
                return Err(self.invalid("rule with an empty label".to_string()));
            }
            let rule = SubstringRule::new(&rule.contains, rule.label.trim());
            if rule.needles.is_empty() {
                return Err(self.invalid(format!(
                    "rule for '{}' has no usable needles",
                    rule.label
                )));
            }
            self.push_rule(rule);
        }
        Ok(())
    }

    /// Every canonical label must resolve to itself, otherwise a second pass
    /// through the vocabulary would change values that were already canonical.
    pub fn validate(&self) -> Result<()> {
        let labels = self
            .aliases
            .values()
            .map(String::as_str)
            .chain(self.rules.iter().map(SubstringRule::label));

        for label in labels {
            let resolved = self.canonicalize(label);
            if resolved != label {
                return Err(self.invalid(format!(
                    "canonical label '{label}' resolves to '{resolved}'"
                )));
            }
        }
        Ok(())
    }

    /// Maps a free-text value onto the vocabulary. Unknown values come back
    /// trimmed but otherwise unchanged.
    pub fn canonicalize(&self, value: &str) -> String {
        let key = normalize_key(value);
        if let Some(label) = self.aliases.get(&key) {
            return label.clone();
        }
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&key)) {
            return rule.label.clone();
        }
        value.trim().to_string()
    }

    fn invalid(&self, message: String) -> PipelineError {
        PipelineError::Vocabulary {
            vocabulary: self.name,
            message,
        }
    }
}

/// The three vocabularies used to turn unified records into canonical ones.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    organization: Vocabulary,
    role: Vocabulary,
    affiliation: Vocabulary,
}

impl Canonicalizer {
    pub fn builtin() -> Result<Self> {
        Self::from_config(&VocabularyConfig::default())
    }

    pub fn from_config(config: &VocabularyConfig) -> Result<Self> {
        let mut organization = Vocabulary::builtin_organization()?;
        organization.extend(&config.organization)?;

        let mut role = Vocabulary::empty("role");
        role.extend(&config.role)?;

        let mut affiliation = Vocabulary::empty("affiliation");
        affiliation.extend(&config.affiliation)?;

        for vocabulary in [&organization, &role, &affiliation] {
            vocabulary.validate()?;
        }

        Ok(Self {
            organization,
            role,
            affiliation,
        })
    }

    pub fn organization(&self) -> &Vocabulary {
        &self.organization
    }

    pub fn role(&self) -> &Vocabulary {
        &self.role
    }

    pub fn affiliation(&self) -> &Vocabulary {
        &self.affiliation
    }

    /// `None` when the record has no event; the normalizer drops those rows.
    pub fn canonicalize_record(
        &self,
        record: UnifiedRecord,
        affirmative: &str,
    ) -> Option<CanonicalRecord> {
        let event = record.event?;
        let canonical = |vocabulary: &Vocabulary, value: Option<String>| {
            value.map(|value| vocabulary.canonicalize(&value))
        };

        Some(CanonicalRecord {
            event,
            format: record.format,
            axis: record.axis,
            venue: record.venue,
            participant_name: record.participant_name,
            role: canonical(&self.role, record.role),
            organization: canonical(&self.organization, record.organization),
            affiliation: canonical(&self.affiliation, record.affiliation),
            certified: parse_flag(record.certified.as_deref(), affirmative),
            is_management_role: parse_flag(record.is_management_role.as_deref(), affirmative),
            is_state_employee: parse_flag(record.is_state_employee.as_deref(), affirmative),
            is_external_organization: parse_flag(
                record.is_external_organization.as_deref(),
                affirmative,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;

    #[test]
    fn keys_ignore_case_accents_and_punctuation() {
        assert_eq!(normalize_key("  DETRAN-PI "), "detran pi");
        assert_eq!(normalize_key("DETRAN/PI"), "detran pi");
        assert_eq!(
            normalize_key("Câmara   Municipal de Teresina"),
            "camara municipal de teresina"
        );
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn detran_variants_collapse() {
        let vocabulary = Vocabulary::builtin_organization().unwrap();
        for variant in ["DETRAN-PI", "DETRAN/PI", "detran", "Detran - PI"] {
            assert_eq!(vocabulary.canonicalize(variant), "DETRAN");
        }
    }

    #[test]
    fn substring_rule_catches_unlisted_prf_spellings() {
        let vocabulary = Vocabulary::builtin_organization().unwrap();
        assert_eq!(vocabulary.canonicalize("PRF/PI"), "PRF");
        assert_eq!(
            vocabulary.canonicalize("Superintendência da Polícia Rodoviária Federal"),
            "PRF"
        );
    }

    #[test]
    fn unknown_values_pass_through_trimmed() {
        let vocabulary = Vocabulary::builtin_organization().unwrap();
        assert_eq!(
            vocabulary.canonicalize("  Secretaria da Saúde "),
            "Secretaria da Saúde"
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let canonicalizer = Canonicalizer::builtin().unwrap();
        let vocabulary = canonicalizer.organization();
        let inputs = builtin_organization_aliases()
            .iter()
            .map(|descriptor| descriptor.variant.to_string())
            .chain(
                ["SEAD", " sad ", "Outra Coisa", "prf-pi", "", "Câmara municipal  de teresina"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        for input in inputs {
            let once = vocabulary.canonicalize(&input);
            assert_eq!(vocabulary.canonicalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn conflicting_aliases_are_rejected() {
        let mut config = VocabularyConfig::default();
        config
            .organization
            .aliases
            .insert("detran pi".to_string(), "DETRAN-PI".to_string());
        let err = Canonicalizer::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Vocabulary {
                vocabulary: "organization",
                ..
            }
        ));
    }

    #[test]
    fn label_that_is_not_a_fixed_point_is_rejected() {
        let mut config = VocabularyConfig::default();
        config
            .role
            .aliases
            .insert("Analista TI".to_string(), "Analista".to_string());
        config
            .role
            .aliases
            .insert("Analista".to_string(), "Analista de Sistemas".to_string());
        assert!(Canonicalizer::from_config(&config).is_err());
    }

    #[test]
    fn configured_entries_extend_the_builtin_table() {
        let mut config = VocabularyConfig::default();
        config.affiliation.rules.push(RuleConfig {
            contains: vec!["terceir".to_string()],
            label: "Terceirizado".to_string(),
        });
        let canonicalizer = Canonicalizer::from_config(&config).unwrap();
        assert_eq!(
            canonicalizer.affiliation().canonicalize("terceirizada"),
            "Terceirizado"
        );
        assert_eq!(canonicalizer.organization().canonicalize("SAD"), "SEAD");
    }

    #[test]
    fn record_flags_and_labels_are_resolved_together() {
        let canonicalizer = Canonicalizer::builtin().unwrap();
        let record = UnifiedRecord {
            event: Some("Masterclass".to_string()),
            organization: Some("DETRAN/PI".to_string()),
            role: Some("Agente".to_string()),
            certified: Some("Sim".to_string()),
            is_state_employee: Some("sim".to_string()),
            ..UnifiedRecord::default()
        };
        let canonical = canonicalizer.canonicalize_record(record, "Sim").unwrap();
        assert_eq!(canonical.organization.as_deref(), Some("DETRAN"));
        assert_eq!(canonical.role.as_deref(), Some("Agente"));
        assert!(canonical.certified);
        assert!(!canonical.is_state_employee);
        assert!(!canonical.is_management_role);

        assert!(canonicalizer
            .canonicalize_record(UnifiedRecord::default(), "Sim")
            .is_none());
    }
}
