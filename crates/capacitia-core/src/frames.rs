use std::fmt;

use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use serde::Serialize;

use crate::aggregation::{
    DerivedTables, EventSummaryRow, ExternalOrganizationSummaryRow, OrganizationSummaryRow,
    RoleSummaryRow,
};
use crate::records::CanonicalRecord;

/// Every table the materializer knows how to write, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Records,
    EventSummary,
    OrganizationSummary,
    RoleSummary,
    ExternalOrganizationSummary,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Records,
        Table::EventSummary,
        Table::OrganizationSummary,
        Table::RoleSummary,
        Table::ExternalOrganizationSummary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Records => "records",
            Table::EventSummary => "event_summary",
            Table::OrganizationSummary => "organization_summary",
            Table::RoleSummary => "role_summary",
            Table::ExternalOrganizationSummary => "external_organization_summary",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.parquet", self.name())
    }

    pub fn from_name(name: &str) -> Option<Table> {
        let name = name.trim_end_matches(".parquet");
        Table::ALL.into_iter().find(|table| table.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn text<'a, T: 'a>(
    name: &str,
    rows: &'a [T],
    value: impl Fn(&'a T) -> Option<&'a str>,
) -> Column {
    let values: Vec<Option<&str>> = rows.iter().map(value).collect();
    Series::new(name.into(), values).into()
}

fn count<T>(name: &str, rows: &[T], value: impl Fn(&T) -> u32) -> Column {
    let values: Vec<u32> = rows.iter().map(value).collect();
    Series::new(name.into(), values).into()
}

fn pct<T>(name: &str, rows: &[T], value: impl Fn(&T) -> f64) -> Column {
    let values: Vec<f64> = rows.iter().map(value).collect();
    Series::new(name.into(), values).into()
}

fn flag<T>(name: &str, rows: &[T], value: impl Fn(&T) -> bool) -> Column {
    let values: Vec<bool> = rows.iter().map(value).collect();
    Series::new(name.into(), values).into()
}

/// The normalized fact table, one row per enrollment.
pub fn records_frame(records: &[CanonicalRecord]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        text("event", records, |r| Some(r.event.as_str())),
        text("format", records, |r| r.format.as_deref()),
        text("axis", records, |r| r.axis.as_deref()),
        text("venue", records, |r| r.venue.as_deref()),
        text("participant_name", records, |r| r.participant_name.as_deref()),
        text("role", records, |r| r.role.as_deref()),
        text("organization", records, |r| r.organization.as_deref()),
        text("affiliation", records, |r| r.affiliation.as_deref()),
        flag("certified", records, |r| r.certified),
        flag("is_management_role", records, |r| r.is_management_role),
        flag("is_state_employee", records, |r| r.is_state_employee),
        flag("is_external_organization", records, |r| {
            r.is_external_organization
        }),
    ])
}

pub fn event_summary_frame(rows: &[EventSummaryRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        text("event", rows, |r| Some(r.event.as_str())),
        text("format", rows, |r| r.format.as_deref()),
        text("axis", rows, |r| r.axis.as_deref()),
        text("venue", rows, |r| r.venue.as_deref()),
        count("enrolled_count", rows, |r| r.enrolled_count),
        count("certified_count", rows, |r| r.certified_count),
        pct("certification_pct", rows, |r| r.certification_pct),
        flag("is_total", rows, |r| r.is_total),
    ])
}

pub fn organization_summary_frame(rows: &[OrganizationSummaryRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        text("organization", rows, |r| Some(r.organization.as_str())),
        count("enrolled_count", rows, |r| r.enrolled_count),
        count("certified_count", rows, |r| r.certified_count),
        count("attrition_count", rows, |r| r.attrition_count),
        pct("certification_pct", rows, |r| r.certification_pct),
        count("distinct_event_count", rows, |r| r.distinct_event_count),
    ])
}

pub fn role_summary_frame(rows: &[RoleSummaryRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        text("role", rows, |r| Some(r.role.as_str())),
        text("organization", rows, |r| r.organization.as_deref()),
        count("enrolled_count", rows, |r| r.enrolled_count),
        count("management_count", rows, |r| r.management_count),
        count("state_employee_count", rows, |r| r.state_employee_count),
        pct("management_pct", rows, |r| r.management_pct),
        pct("state_employee_pct", rows, |r| r.state_employee_pct),
        count("distinct_event_count", rows, |r| r.distinct_event_count),
    ])
}

pub fn external_organization_summary_frame(
    rows: &[ExternalOrganizationSummaryRow],
) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        text("organization", rows, |r| Some(r.organization.as_str())),
        count("enrolled_count", rows, |r| r.enrolled_count),
        count("certified_count", rows, |r| r.certified_count),
        pct("certification_pct", rows, |r| r.certification_pct),
        count("distinct_event_count", rows, |r| r.distinct_event_count),
    ])
}

/// Builds every output frame, in `Table::ALL` order.
pub fn build_frames(
    records: &[CanonicalRecord],
    tables: &DerivedTables,
) -> PolarsResult<Vec<(Table, DataFrame)>> {
    Ok(vec![
        (Table::Records, records_frame(records)?),
        (Table::EventSummary, event_summary_frame(&tables.events)?),
        (
            Table::OrganizationSummary,
            organization_summary_frame(&tables.organizations)?,
        ),
        (Table::RoleSummary, role_summary_frame(&tables.roles)?),
        (
            Table::ExternalOrganizationSummary,
            external_organization_summary_frame(&tables.external_organizations)?,
        ),
    ])
}
