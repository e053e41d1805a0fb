use std::ops::AddAssign;

use capacitia_parser::RawTable;
use serde::Serialize;
use tracing::debug;

use crate::canonical::Canonicalizer;
use crate::records::CanonicalRecord;
use crate::unification::{unify_row, ColumnBindings};

/// Event labels that mark spreadsheet subtotal rows rather than enrollments.
pub const TOTAL_MARKERS: [&str; 2] = ["total", "total geral"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_blank_event: usize,
    pub dropped_total_marker: usize,
}

impl AddAssign for NormalizationStats {
    fn add_assign(&mut self, other: Self) {
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.dropped_blank_event += other.dropped_blank_event;
        self.dropped_total_marker += other.dropped_total_marker;
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<CanonicalRecord>,
    pub stats: NormalizationStats,
}

impl NormalizedBatch {
    /// Appends another source's batch, keeping input order.
    pub fn append(&mut self, other: NormalizedBatch) {
        self.records.extend(other.records);
        self.stats += other.stats;
    }
}

pub fn is_total_marker(event: &str) -> bool {
    let key = event.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    TOTAL_MARKERS.contains(&key.as_str())
}

pub struct RecordNormalizer<'a> {
    canonicalizer: &'a Canonicalizer,
    affirmative_token: &'a str,
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(canonicalizer: &'a Canonicalizer, affirmative_token: &'a str) -> Self {
        Self {
            canonicalizer,
            affirmative_token,
        }
    }

    pub fn normalize(&self, table: &RawTable, bindings: &ColumnBindings) -> NormalizedBatch {
        let mut batch = NormalizedBatch {
            records: Vec::with_capacity(table.len()),
            stats: NormalizationStats {
                rows_read: table.len(),
                ..NormalizationStats::default()
            },
        };

        for (idx, row) in table.rows().enumerate() {
            let unified = unify_row(&row, bindings);

            if unified.event.as_deref().is_some_and(is_total_marker) {
                debug!(row = idx, "dropping spreadsheet total row");
                batch.stats.dropped_total_marker += 1;
                continue;
            }

            match self
                .canonicalizer
                .canonicalize_record(unified, self.affirmative_token)
            {
                Some(record) => batch.records.push(record),
                None => {
                    debug!(row = idx, "dropping row without event");
                    batch.stats.dropped_blank_event += 1;
                }
            }
        }

        batch.stats.rows_kept = batch.records.len();
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use capacitia_parser::{parse_raw_table, DetectOptions};

    fn normalize(source: &str) -> NormalizedBatch {
        let table = parse_raw_table(source.as_bytes(), &DetectOptions::default()).unwrap();
        let bindings =
            ColumnBindings::resolve(&table.schema, &BTreeMap::new(), Path::new("t.csv")).unwrap();
        let canonicalizer = Canonicalizer::builtin().unwrap();
        RecordNormalizer::new(&canonicalizer, "Sim").normalize(&table, &bindings)
    }

    #[test]
    fn blank_events_and_total_rows_are_dropped() {
        let batch = normalize(
            "EVENTO;NOME;ÓRGÃO;CERTIFICADO\n\
             Oficina;Ana;DETRAN-PI;Sim\n\
             ;Bruno;SEAD;Sim\n\
             \x20 ;Carla;SEAD;Não\n\
             Total Geral;;;\n\
             TOTAL;;;\n",
        );

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].organization.as_deref(), Some("DETRAN"));
        assert_eq!(
            batch.stats,
            NormalizationStats {
                rows_read: 5,
                rows_kept: 1,
                dropped_blank_event: 2,
                dropped_total_marker: 2,
            }
        );
    }

    #[test]
    fn blank_certificate_counts_as_not_certified() {
        let batch = normalize("EVENTO;CERTIFICADO\nOficina;\nOficina;SIM\nOficina;Sim\n");
        let flags: Vec<bool> = batch.records.iter().map(|r| r.certified).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn total_marker_matching_is_whole_label_only() {
        assert!(is_total_marker("TOTAL"));
        assert!(is_total_marker(" total  geral "));
        assert!(!is_total_marker("Totalmente Digital"));
        assert!(!is_total_marker("Total de horas"));
    }
}
