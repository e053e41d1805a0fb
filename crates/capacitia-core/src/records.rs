use serde::Serialize;

/// One participant-event enrollment after the "choice / other" column pairs were
/// resolved. Boolean-like cells are still raw text here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedRecord {
    pub event: Option<String>,
    pub format: Option<String>,
    pub axis: Option<String>,
    pub venue: Option<String>,
    pub participant_name: Option<String>,
    pub role: Option<String>,
    pub organization: Option<String>,
    pub affiliation: Option<String>,
    pub certified: Option<String>,
    pub is_management_role: Option<String>,
    pub is_state_employee: Option<String>,
    pub is_external_organization: Option<String>,
}

/// A kept enrollment whose labels went through the canonicalizer. Produced only
/// by the normalizer and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub event: String,
    pub format: Option<String>,
    pub axis: Option<String>,
    pub venue: Option<String>,
    pub participant_name: Option<String>,
    pub role: Option<String>,
    pub organization: Option<String>,
    pub affiliation: Option<String>,
    pub certified: bool,
    pub is_management_role: bool,
    pub is_state_employee: bool,
    pub is_external_organization: bool,
}

/// Exact, case-sensitive comparison with the affirmative token. Blank,
/// missing and unrecognised values all read as `false`.
pub fn parse_flag(value: Option<&str>, affirmative: &str) -> bool {
    value == Some(affirmative)
}
