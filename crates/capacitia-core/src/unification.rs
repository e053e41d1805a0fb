use std::collections::BTreeMap;
use std::path::Path;

use capacitia_parser::{normalize_label, RawRow, SourceSchema};

use crate::error::{PipelineError, Result};
use crate::records::UnifiedRecord;

/// Primary-column values meaning "other / unspecified" (compared trimmed, case-insensitive).
pub const UNSPECIFIED_TOKENS: [&str; 4] = ["", "other", "others", "outros"];

/// The structured-choice "other" option of the role column.
pub const ROLE_OTHER_TOKEN: &str = "outro";

/// Override-column values meaning "not applicable".
pub const NOT_APPLICABLE_TOKENS: [&str; 3] = ["", "n/a", "na"];

const FIELD_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Event,
    Format,
    Axis,
    Venue,
    ParticipantName,
    Role,
    RoleOther,
    Organization,
    OrganizationOther,
    Affiliation,
    AffiliationOther,
    Certified,
    ManagementRole,
    StateEmployee,
    ExternalOrganization,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Event,
        Field::Format,
        Field::Axis,
        Field::Venue,
        Field::ParticipantName,
        Field::Role,
        Field::RoleOther,
        Field::Organization,
        Field::OrganizationOther,
        Field::Affiliation,
        Field::AffiliationOther,
        Field::Certified,
        Field::ManagementRole,
        Field::StateEmployee,
        Field::ExternalOrganization,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Event => "event",
            Field::Format => "format",
            Field::Axis => "axis",
            Field::Venue => "venue",
            Field::ParticipantName => "participant_name",
            Field::Role => "role",
            Field::RoleOther => "role_other",
            Field::Organization => "organization",
            Field::OrganizationOther => "organization_other",
            Field::Affiliation => "affiliation",
            Field::AffiliationOther => "affiliation_other",
            Field::Certified => "certified",
            Field::ManagementRole => "is_management_role",
            Field::StateEmployee => "is_state_employee",
            Field::ExternalOrganization => "is_external_organization",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Normalized header labels recognised for this field, in priority order.
    pub fn builtin_aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Event => &["evento", "event"],
            Field::Format => &["formato", "format"],
            Field::Axis => &["eixo", "axis"],
            Field::Venue => &["local_de_realizacao", "local_realizacao", "venue"],
            Field::ParticipantName => &["nome", "participant_name", "name"],
            Field::Role => &["cargo", "role"],
            Field::RoleOther => &["cargo_outros", "role_other"],
            Field::Organization => &["orgao", "secretaria/orgao", "organization"],
            Field::OrganizationOther => &["orgao_outros", "organization_other"],
            Field::Affiliation => &["vinculo", "affiliation"],
            Field::AffiliationOther => &["vinculo_outros", "affiliation_other"],
            Field::Certified => &["certificado", "certified"],
            Field::ManagementRole => &["cargo_de_gestao", "cargo_gestao", "is_management_role"],
            Field::StateEmployee => &[
                "servidor_do_estado",
                "servidor_estado",
                "is_state_employee",
            ],
            Field::ExternalOrganization => &[
                "orgao_externo",
                "is_external_organization",
            ],
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Event)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Configured aliases first, then the built-in ones, all normalized.
pub fn field_aliases(field: Field, extra: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut aliases: Vec<String> = extra
        .get(field.name())
        .into_iter()
        .flatten()
        .map(|alias| normalize_label(alias))
        .collect();
    for alias in field.builtin_aliases() {
        let alias = alias.to_string();
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }
    aliases
}

/// Column position of every logical field in one source schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBindings {
    positions: [Option<usize>; FIELD_COUNT],
}

impl ColumnBindings {
    pub fn resolve(
        schema: &SourceSchema,
        extra: &BTreeMap<String, Vec<String>>,
        path: &Path,
    ) -> Result<Self> {
        let mut positions = [None; FIELD_COUNT];

        for field in Field::ALL {
            let aliases = field_aliases(field, extra);
            let position = aliases.iter().find_map(|alias| schema.position(alias));
            if position.is_none() && field.is_required() {
                return Err(PipelineError::MissingColumn {
                    path: path.to_path_buf(),
                    field: field.name(),
                    aliases,
                });
            }
            positions[field.index()] = position;
        }

        Ok(Self { positions })
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions[field.index()]
    }

    /// Pairs of (field, bound column position), in field order.
    pub fn bound(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |field| self.position(field).map(|idx| (field, idx)))
    }

    fn raw<'a>(&self, row: &RawRow<'a>, field: Field) -> Option<&'a str> {
        self.position(field).and_then(|idx| row.value(idx))
    }

    fn text(&self, row: &RawRow<'_>, field: Field) -> Option<String> {
        self.raw(row, field).and_then(non_blank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyPolicy {
    Standard,
    /// Also treats the role column's own "Outro" choice as absent.
    Role,
}

/// Resolves a "structured choice + free-text other" pair into one value.
pub fn unify(primary: Option<&str>, other: Option<&str>, policy: UnifyPolicy) -> Option<String> {
    if let Some(value) = primary {
        if !is_unspecified(value, policy) {
            return Some(value.trim().to_string());
        }
    }

    match other {
        Some(value) if !is_not_applicable(value) => Some(value.trim().to_string()),
        _ => None,
    }
}

pub fn is_unspecified(value: &str, policy: UnifyPolicy) -> bool {
    let key = value.trim().to_lowercase();
    UNSPECIFIED_TOKENS.contains(&key.as_str())
        || (policy == UnifyPolicy::Role && key == ROLE_OTHER_TOKEN)
}

pub fn is_not_applicable(value: &str) -> bool {
    let key = value.trim().to_lowercase();
    NOT_APPLICABLE_TOKENS.contains(&key.as_str())
}

pub fn unify_row(row: &RawRow<'_>, bindings: &ColumnBindings) -> UnifiedRecord {
    let raw = |field| bindings.raw(row, field);
    let text = |field| bindings.text(row, field);

    UnifiedRecord {
        event: text(Field::Event),
        format: text(Field::Format),
        axis: text(Field::Axis),
        venue: text(Field::Venue),
        participant_name: text(Field::ParticipantName),
        role: unify(raw(Field::Role), raw(Field::RoleOther), UnifyPolicy::Role),
        organization: unify(
            raw(Field::Organization),
            raw(Field::OrganizationOther),
            UnifyPolicy::Standard,
        ),
        affiliation: unify(
            raw(Field::Affiliation),
            raw(Field::AffiliationOther),
            UnifyPolicy::Standard,
        ),
        certified: raw(Field::Certified).map(str::to_string),
        is_management_role: raw(Field::ManagementRole).map(str::to_string),
        is_state_employee: raw(Field::StateEmployee).map(str::to_string),
        is_external_organization: raw(Field::ExternalOrganization).map(str::to_string),
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
