use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::records::CanonicalRecord;
use crate::unification::{is_unspecified, UnifyPolicy};

pub const TOTAL_LABEL: &str = "TOTAL";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummaryRow {
    pub event: String,
    pub format: Option<String>,
    pub axis: Option<String>,
    pub venue: Option<String>,
    pub enrolled_count: u32,
    pub certified_count: u32,
    pub certification_pct: f64,
    pub is_total: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationSummaryRow {
    pub organization: String,
    pub enrolled_count: u32,
    pub certified_count: u32,
    pub attrition_count: u32,
    pub certification_pct: f64,
    pub distinct_event_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSummaryRow {
    pub role: String,
    pub organization: Option<String>,
    pub enrolled_count: u32,
    pub management_count: u32,
    pub state_employee_count: u32,
    pub management_pct: f64,
    pub state_employee_pct: f64,
    pub distinct_event_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalOrganizationSummaryRow {
    pub organization: String,
    pub enrolled_count: u32,
    pub certified_count: u32,
    pub certification_pct: f64,
    pub distinct_event_count: u32,
}

/// Headline numbers for the whole programme.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgrammeKpis {
    pub participants: u32,
    pub events: u32,
    pub organizations: u32,
    pub certified: u32,
    pub certification_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTables {
    pub events: Vec<EventSummaryRow>,
    pub organizations: Vec<OrganizationSummaryRow>,
    pub roles: Vec<RoleSummaryRow>,
    pub external_organizations: Vec<ExternalOrganizationSummaryRow>,
    pub kpis: ProgrammeKpis,
}

/// `count / total * 100` rounded to two decimals; zero when `total` is zero.
pub fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = f64::from(count) / f64::from(total) * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Runs every reducer over the same snapshot. The reducers are independent,
/// so they are fanned out on the rayon pool and joined here.
pub fn aggregate(records: &[CanonicalRecord]) -> DerivedTables {
    let ((events, organizations), (roles, external_organizations)) = rayon::join(
        || rayon::join(|| summarize_events(records), || summarize_organizations(records)),
        || {
            rayon::join(
                || summarize_roles(records),
                || summarize_external_organizations(records),
            )
        },
    );
    let kpis = programme_kpis(records, &events, &organizations);

    info!(
        events = events.len().saturating_sub(1),
        organizations = organizations.len(),
        roles = roles.len(),
        external_organizations = external_organizations.len(),
        "aggregated derived tables"
    );

    DerivedTables {
        events,
        organizations,
        roles,
        external_organizations,
        kpis,
    }
}

#[derive(Default)]
struct EventAccumulator<'a> {
    format: Option<&'a str>,
    axis: Option<&'a str>,
    venue: Option<&'a str>,
    enrolled: u32,
    certified: u32,
}

/// One row per event sorted by label, followed by the synthetic total row.
pub fn summarize_events(records: &[CanonicalRecord]) -> Vec<EventSummaryRow> {
    let mut groups: BTreeMap<&str, EventAccumulator<'_>> = BTreeMap::new();

    for record in records {
        let entry = groups
            .entry(record.event.as_str())
            .or_insert_with(|| EventAccumulator {
                format: record.format.as_deref(),
                axis: record.axis.as_deref(),
                venue: record.venue.as_deref(),
                ..EventAccumulator::default()
            });
        entry.enrolled = entry.enrolled.saturating_add(1);
        entry.certified = entry.certified.saturating_add(u32::from(record.certified));
    }

    let mut rows: Vec<EventSummaryRow> = groups
        .into_iter()
        .map(|(event, acc)| EventSummaryRow {
            event: event.to_string(),
            format: acc.format.map(str::to_string),
            axis: acc.axis.map(str::to_string),
            venue: acc.venue.map(str::to_string),
            enrolled_count: acc.enrolled,
            certified_count: acc.certified,
            certification_pct: percentage(acc.certified, acc.enrolled),
            is_total: false,
        })
        .collect();

    let enrolled = rows
        .iter()
        .fold(0u32, |acc, row| acc.saturating_add(row.enrolled_count));
    let certified = rows
        .iter()
        .fold(0u32, |acc, row| acc.saturating_add(row.certified_count));
    rows.push(EventSummaryRow {
        event: TOTAL_LABEL.to_string(),
        format: None,
        axis: None,
        venue: None,
        enrolled_count: enrolled,
        certified_count: certified,
        certification_pct: percentage(certified, enrolled),
        is_total: true,
    });

    rows
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    enrolled: u32,
    certified: u32,
    management: u32,
    state_employee: u32,
    events: BTreeSet<&'a str>,
}

impl<'a> GroupAccumulator<'a> {
    fn add(&mut self, record: &'a CanonicalRecord) {
        self.enrolled = self.enrolled.saturating_add(1);
        self.certified = self.certified.saturating_add(u32::from(record.certified));
        self.management = self
            .management
            .saturating_add(u32::from(record.is_management_role));
        self.state_employee = self
            .state_employee
            .saturating_add(u32::from(record.is_state_employee));
        self.events.insert(record.event.as_str());
    }

    fn distinct_events(&self) -> u32 {
        u32::try_from(self.events.len()).unwrap_or(u32::MAX)
    }
}

fn resolved_label(value: Option<&str>, policy: UnifyPolicy) -> Option<&str> {
    value.filter(|value| !is_unspecified(value, policy))
}

fn group_by_organization<'a>(
    records: impl Iterator<Item = &'a CanonicalRecord>,
) -> BTreeMap<&'a str, GroupAccumulator<'a>> {
    let mut groups: BTreeMap<&str, GroupAccumulator<'_>> = BTreeMap::new();
    for record in records {
        if let Some(organization) =
            resolved_label(record.organization.as_deref(), UnifyPolicy::Standard)
        {
            groups.entry(organization).or_default().add(record);
        }
    }
    groups
}

/// Sorted by enrolment (largest first), ties broken by organization name.
pub fn summarize_organizations(records: &[CanonicalRecord]) -> Vec<OrganizationSummaryRow> {
    let mut rows: Vec<OrganizationSummaryRow> = group_by_organization(records.iter())
        .into_iter()
        .map(|(organization, acc)| OrganizationSummaryRow {
            organization: organization.to_string(),
            enrolled_count: acc.enrolled,
            certified_count: acc.certified,
            attrition_count: acc.enrolled.saturating_sub(acc.certified),
            certification_pct: percentage(acc.certified, acc.enrolled),
            distinct_event_count: acc.distinct_events(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.enrolled_count
            .cmp(&a.enrolled_count)
            .then_with(|| a.organization.cmp(&b.organization))
    });
    rows
}

pub fn summarize_roles(records: &[CanonicalRecord]) -> Vec<RoleSummaryRow> {
    let mut groups: BTreeMap<(&str, Option<&str>), GroupAccumulator<'_>> = BTreeMap::new();

    for record in records {
        let Some(role) = resolved_label(record.role.as_deref(), UnifyPolicy::Role) else {
            continue;
        };
        let organization = resolved_label(record.organization.as_deref(), UnifyPolicy::Standard);
        groups.entry((role, organization)).or_default().add(record);
    }

    groups
        .into_iter()
        .map(|((role, organization), acc)| RoleSummaryRow {
            role: role.to_string(),
            organization: organization.map(str::to_string),
            enrolled_count: acc.enrolled,
            management_count: acc.management,
            state_employee_count: acc.state_employee,
            management_pct: percentage(acc.management, acc.enrolled),
            state_employee_pct: percentage(acc.state_employee, acc.enrolled),
            distinct_event_count: acc.distinct_events(),
        })
        .collect()
}

pub fn summarize_external_organizations(
    records: &[CanonicalRecord],
) -> Vec<ExternalOrganizationSummaryRow> {
    let external = records.iter().filter(|record| record.is_external_organization);
    group_by_organization(external)
        .into_iter()
        .map(|(organization, acc)| ExternalOrganizationSummaryRow {
            organization: organization.to_string(),
            enrolled_count: acc.enrolled,
            certified_count: acc.certified,
            certification_pct: percentage(acc.certified, acc.enrolled),
            distinct_event_count: acc.distinct_events(),
        })
        .collect()
}

pub fn programme_kpis(
    records: &[CanonicalRecord],
    events: &[EventSummaryRow],
    organizations: &[OrganizationSummaryRow],
) -> ProgrammeKpis {
    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    let participants = count(records.len());
    let certified = count(records.iter().filter(|record| record.certified).count());

    ProgrammeKpis {
        participants,
        events: count(events.iter().filter(|row| !row.is_total).count()),
        organizations: count(organizations.len()),
        certified,
        certification_pct: percentage(certified, participants),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: &str, organization: Option<&str>, certified: bool) -> CanonicalRecord {
        CanonicalRecord {
            event: event.to_string(),
            format: None,
            axis: None,
            venue: None,
            participant_name: None,
            role: None,
            organization: organization.map(str::to_string),
            affiliation: None,
            certified,
            is_management_role: false,
            is_state_employee: false,
            is_external_organization: false,
        }
    }

    #[test]
    fn percentage_rounds_and_handles_zero_total() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn total_row_sums_every_event() {
        let mut first = record("Oficina", None, true);
        first.format = Some("Presencial".to_string());
        let mut second = record("Oficina", None, false);
        second.format = Some("Online".to_string());
        let records = vec![first, second, record("Curso", None, true)];

        let rows = summarize_events(&records);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].event, "Curso");
        assert_eq!(rows[1].event, "Oficina");
        assert_eq!(rows[1].format.as_deref(), Some("Presencial"));
        assert_eq!(rows[1].certification_pct, 50.0);

        let total = rows.last().unwrap();
        assert!(total.is_total);
        assert_eq!(total.event, TOTAL_LABEL);
        let summed: u32 = rows[..2].iter().map(|row| row.enrolled_count).sum();
        assert_eq!(total.enrolled_count, summed);
        assert_eq!(total.certified_count, 2);
    }

    #[test]
    fn group_counters_saturate_at_u32_max() {
        let mut managed = record("A", Some("SEAD"), true);
        managed.is_management_role = true;
        let mut acc = GroupAccumulator {
            enrolled: u32::MAX,
            certified: u32::MAX,
            management: u32::MAX,
            ..GroupAccumulator::default()
        };
        acc.add(&managed);

        assert_eq!(acc.enrolled, u32::MAX);
        assert_eq!(acc.certified, u32::MAX);
        assert_eq!(acc.management, u32::MAX);
        assert_eq!(acc.state_employee, 0);
        assert_eq!(acc.distinct_events(), 1);
    }

    #[test]
    fn empty_input_still_has_a_zero_total_row() {
        let rows = summarize_events(&[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].enrolled_count, 0);
        assert_eq!(rows[0].certification_pct, 0.0);
    }

    #[test]
    fn organizations_skip_unresolved_labels_and_sort_by_enrolment() {
        let records = vec![
            record("A", Some("SEAD"), true),
            record("A", Some("DETRAN"), true),
            record("B", Some("DETRAN"), false),
            record("A", None, true),
            record("A", Some("Outros"), true),
        ];
        let rows = summarize_organizations(&records);
        let names: Vec<&str> = rows.iter().map(|row| row.organization.as_str()).collect();
        assert_eq!(names, vec!["DETRAN", "SEAD"]);
        assert_eq!(rows[0].attrition_count, 1);
        assert_eq!(rows[0].distinct_event_count, 2);
        assert!(rows.iter().all(|row| row.attrition_count <= row.enrolled_count));
    }

    #[test]
    fn role_percentages_stay_within_bounds() {
        let mut managers = record("A", Some("SEAD"), false);
        managers.role = Some("Diretor".to_string());
        managers.is_management_role = true;
        let mut clerk = record("A", Some("SEAD"), false);
        clerk.role = Some("Diretor".to_string());
        clerk.is_state_employee = true;
        let mut unassigned = record("B", None, false);
        unassigned.role = Some("Diretor".to_string());
        let mut other = record("B", None, false);
        other.role = Some("Outro".to_string());

        let rows = summarize_roles(&[managers, clerk, unassigned, other]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].organization, None);
        assert_eq!(rows[0].management_pct, 0.0);
        assert_eq!(rows[1].organization.as_deref(), Some("SEAD"));
        assert_eq!(rows[1].management_pct, 50.0);
        assert_eq!(rows[1].state_employee_pct, 50.0);
        for row in &rows {
            assert!((0.0..=100.0).contains(&row.management_pct));
            assert!((0.0..=100.0).contains(&row.state_employee_pct));
        }
    }

    #[test]
    fn aggregate_fills_every_table_and_kpis() {
        let mut external = record("A", Some("PRF"), true);
        external.is_external_organization = true;
        let records = vec![external, record("B", Some("SEAD"), false)];

        let tables = aggregate(&records);
        assert_eq!(tables.events.len(), 3);
        assert_eq!(tables.organizations.len(), 2);
        assert!(tables.roles.is_empty());
        assert_eq!(tables.external_organizations.len(), 1);
        assert_eq!(tables.external_organizations[0].organization, "PRF");
        assert_eq!(
            tables.kpis,
            ProgrammeKpis {
                participants: 2,
                events: 2,
                organizations: 2,
                certified: 1,
                certification_pct: 50.0,
            }
        );
    }
}
