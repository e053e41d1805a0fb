use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use capacitia_core::aggregation::{aggregate, DerivedTables, ProgrammeKpis, TOTAL_LABEL};
use capacitia_core::canonical::Canonicalizer;
use capacitia_core::normalizer::{NormalizationStats, NormalizedBatch, RecordNormalizer};
use capacitia_core::unification::ColumnBindings;
use capacitia_parser::{parse_raw_table, DetectOptions};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../capacitia-parser/tests/data")
        .join(name)
}

fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedBatch> {
    let table = parse_raw_table(bytes, &DetectOptions::default())?;
    let bindings = ColumnBindings::resolve(&table.schema, &BTreeMap::new(), Path::new("input"))?;
    let canonicalizer = Canonicalizer::builtin()?;
    Ok(RecordNormalizer::new(&canonicalizer, "Sim").normalize(&table, &bindings))
}

fn normalize_fixture(name: &str) -> Result<NormalizedBatch> {
    normalize_bytes(&std::fs::read(fixture_path(name))?)
}

fn fixture_tables() -> Result<DerivedTables> {
    let batch = normalize_fixture("capacitia_utf8_semicolon.csv")?;
    Ok(aggregate(&batch.records))
}

#[test]
fn native_export_is_normalized_into_five_enrollments() -> Result<()> {
    let batch = normalize_fixture("capacitia_utf8_semicolon.csv")?;
    assert_eq!(
        batch.stats,
        NormalizationStats {
            rows_read: 7,
            rows_kept: 5,
            dropped_blank_event: 1,
            dropped_total_marker: 1,
        }
    );

    let bruno = batch
        .records
        .iter()
        .find(|r| r.participant_name.as_deref() == Some("Bruno Lima"))
        .expect("Bruno is kept");
    assert_eq!(bruno.role.as_deref(), Some("Analista de TI"));
    assert_eq!(bruno.organization.as_deref(), Some("DETRAN"));
    assert!(bruno.is_management_role);
    assert!(bruno.is_external_organization);

    let carla = &batch.records[2];
    assert_eq!(carla.affiliation.as_deref(), Some("Terceirizado"));
    assert_eq!(carla.organization.as_deref(), Some("DETRAN"));

    let elisa = &batch.records[4];
    assert_eq!(elisa.organization.as_deref(), Some("Secretaria da Saúde"));
    assert!(!elisa.certified);
    Ok(())
}

#[test]
fn event_summary_matches_the_export() -> Result<()> {
    let tables = fixture_tables()?;
    let rows: Vec<(&str, u32, u32, f64)> = tables
        .events
        .iter()
        .map(|r| {
            (
                r.event.as_str(),
                r.enrolled_count,
                r.certified_count,
                r.certification_pct,
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Masterclass IA Generativa", 3, 2, 66.67),
            ("Workshop Dados Abertos", 2, 1, 50.0),
            (TOTAL_LABEL, 5, 3, 60.0),
        ]
    );

    let masterclass = &tables.events[0];
    assert_eq!(masterclass.format.as_deref(), Some("Masterclass"));
    assert_eq!(masterclass.venue.as_deref(), Some("Auditório SIA"));
    Ok(())
}

#[test]
fn total_row_equals_sum_of_event_rows() -> Result<()> {
    let tables = fixture_tables()?;
    let (total, events) = tables.events.split_last().expect("total row");
    assert!(total.is_total);
    assert!(events.iter().all(|row| !row.is_total));
    assert_eq!(
        total.enrolled_count,
        events.iter().map(|row| row.enrolled_count).sum::<u32>()
    );
    assert_eq!(
        total.certified_count,
        events.iter().map(|row| row.certified_count).sum::<u32>()
    );
    Ok(())
}

#[test]
fn organization_summary_collapses_variants() -> Result<()> {
    let tables = fixture_tables()?;
    let rows: Vec<(&str, u32, u32, u32)> = tables
        .organizations
        .iter()
        .map(|r| {
            (
                r.organization.as_str(),
                r.enrolled_count,
                r.certified_count,
                r.attrition_count,
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("DETRAN", 2, 1, 1),
            ("PRF", 1, 1, 0),
            ("SEAD", 1, 1, 0),
            ("Secretaria da Saúde", 1, 0, 1),
        ]
    );
    assert!(tables
        .organizations
        .iter()
        .all(|row| row.attrition_count <= row.enrolled_count));
    Ok(())
}

#[test]
fn role_summary_groups_by_role_and_organization() -> Result<()> {
    let tables = fixture_tables()?;
    let keys: Vec<(&str, Option<&str>)> = tables
        .roles
        .iter()
        .map(|r| (r.role.as_str(), r.organization.as_deref()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Agente", Some("DETRAN")),
            ("Analista", Some("SEAD")),
            ("Analista", Some("Secretaria da Saúde")),
            ("Analista de TI", Some("DETRAN")),
            ("Policial", Some("PRF")),
        ]
    );

    let it = &tables.roles[3];
    assert_eq!(it.management_pct, 100.0);
    assert_eq!(it.state_employee_pct, 0.0);
    for row in &tables.roles {
        assert!((0.0..=100.0).contains(&row.management_pct));
        assert!((0.0..=100.0).contains(&row.state_employee_pct));
    }
    Ok(())
}

#[test]
fn external_organizations_and_kpis() -> Result<()> {
    let tables = fixture_tables()?;
    let external: Vec<(&str, u32, u32, f64)> = tables
        .external_organizations
        .iter()
        .map(|r| {
            (
                r.organization.as_str(),
                r.enrolled_count,
                r.certified_count,
                r.certification_pct,
            )
        })
        .collect();
    assert_eq!(
        external,
        vec![("DETRAN", 2, 1, 50.0), ("PRF", 1, 1, 100.0)]
    );

    assert_eq!(
        tables.kpis,
        ProgrammeKpis {
            participants: 5,
            events: 2,
            organizations: 4,
            certified: 3,
            certification_pct: 60.0,
        }
    );
    Ok(())
}

#[test]
fn legacy_export_canonicalizes_ministry_variants() -> Result<()> {
    let batch = normalize_fixture("capacitia_cp1252_comma.csv")?;
    let tables = aggregate(&batch.records);
    assert_eq!(tables.organizations.len(), 1);
    assert_eq!(tables.organizations[0].organization, "MPPI");
    assert_eq!(tables.organizations[0].enrolled_count, 2);
    assert_eq!(tables.organizations[0].certified_count, 1);
    assert_eq!(tables.events[0].event, "Oficina IA na Saúde");
    Ok(())
}

#[test]
fn detran_spellings_share_one_organization_row() -> Result<()> {
    let batch = normalize_bytes(
        "EVENTO;NOME;ÓRGÃO;CERTIFICADO\nOficina;Ana;DETRAN-PI;Sim\nOficina;Bia;DETRAN/PI;Não\n"
            .as_bytes(),
    )?;
    let tables = aggregate(&batch.records);
    assert_eq!(tables.organizations.len(), 1);
    assert_eq!(tables.organizations[0].organization, "DETRAN");
    assert_eq!(tables.organizations[0].enrolled_count, 2);
    Ok(())
}

#[test]
fn blank_certificate_is_enrolled_but_not_certified() -> Result<()> {
    let batch = normalize_bytes("EVENTO;CERTIFICADO\nOficina;\nOficina;Sim\n".as_bytes())?;
    let tables = aggregate(&batch.records);
    assert_eq!(tables.events[0].enrolled_count, 2);
    assert_eq!(tables.events[0].certified_count, 1);
    Ok(())
}

#[test]
fn role_other_falls_through_to_override() -> Result<()> {
    let batch = normalize_bytes(
        "EVENTO;CARGO;CARGO OUTROS\nOficina;Outro;Analista de TI\n".as_bytes(),
    )?;
    assert_eq!(batch.records[0].role.as_deref(), Some("Analista de TI"));
    let tables = aggregate(&batch.records);
    assert_eq!(tables.roles[0].role, "Analista de TI");
    assert_eq!(tables.roles[0].organization, None);
    Ok(())
}

#[test]
fn canonical_labels_are_stable_under_a_second_pass() -> Result<()> {
    let canonicalizer = Canonicalizer::builtin()?;
    let batch = normalize_fixture("capacitia_utf8_semicolon.csv")?;
    for record in &batch.records {
        if let Some(organization) = record.organization.as_deref() {
            assert_eq!(
                canonicalizer.organization().canonicalize(organization),
                organization
            );
        }
    }
    Ok(())
}
