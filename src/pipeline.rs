use rayon::prelude::*;

use crate::csr::CsrExtractor;
use crate::match_record::{BuildOutcome, MatchRecordBuilder};
use crate::metadata::MetadataCache;
use crate::record::MatchRecord;
use crate::schema::SchemaAccumulator;
use crate::source::{MatchType, PlayerRef, StatsService};

pub const MAX_HISTORY_PAGE: usize = 25;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub match_count: usize,
    pub match_type: MatchType,
    pub csr: CsrExtractor,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            match_count: 5,
            match_type: MatchType::All,
            csr: CsrExtractor::default(),
        }
    }
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub players: usize,
    pub matches_listed: usize,
    pub records: usize,
    pub aborted: usize,
    pub missing_participants: usize,
    pub columns: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub records: Vec<MatchRecord>,
    pub summary: ExportSummary,
}

pub struct PipelineDriver<'a, S: StatsService + ?Sized> {
    service: &'a S,
    options: RunOptions,
}

impl<'a, S: StatsService + ?Sized> PipelineDriver<'a, S> {
    pub fn new(service: &'a S, options: RunOptions) -> Self {
        Self { service, options }
    }

    pub fn run(&self, roster: &[PlayerRef]) -> ExportTable {
        self.run_with_progress(roster, |_| {})
    }

    /// Phase one builds every record while the schema grows; phase two re-keys them all
    /// against the final schema.
    pub fn run_with_progress(
        &self,
        roster: &[PlayerRef],
        mut on_progress: impl FnMut(ExportProgress),
    ) -> ExportTable {
        let mut metadata = MetadataCache::new(self.service);
        let mut schema = SchemaAccumulator::new();
        let builder = MatchRecordBuilder::new(self.service).with_csr(self.options.csr.clone());
        let count = self.options.match_count.clamp(1, MAX_HISTORY_PAGE);

        let medals = metadata.medal_catalog().len();
        log::info!("medal catalog: {medals} entries");

        let mut summary = ExportSummary {
            players: roster.len(),
            ..ExportSummary::default()
        };
        let mut records = Vec::new();
        let mut current = 0usize;
        let mut total = 0usize;

        for player in roster {
            let history = match self.service.match_history(
                &player.id,
                0,
                count,
                self.options.match_type,
            ) {
                Ok(history) => history,
                Err(err) => {
                    log::warn!("match history for {} unavailable: {err}", player.display_name);
                    summary
                        .errors
                        .push(format!("history {} ({}): {err}", player.display_name, player.id));
                    continue;
                }
            };
            summary.matches_listed += history.len();
            total = total.saturating_add(history.len());

            for (idx, match_id) in history.iter().enumerate() {
                match builder.build(&mut metadata, &mut schema, player, match_id, idx + 1) {
                    BuildOutcome::Emitted(record) => records.push(record),
                    BuildOutcome::ParticipantMissing(record) => {
                        summary.missing_participants += 1;
                        records.push(record);
                    }
                    BuildOutcome::Aborted { error, .. } => {
                        summary.aborted += 1;
                        summary
                            .errors
                            .push(format!("match {match_id} ({}): {error}", player.display_name));
                    }
                }
                current = current.saturating_add(1);
                on_progress(ExportProgress {
                    current,
                    total,
                    message: format!("{}: match {}/{}", player.display_name, idx + 1, history.len()),
                });
            }
        }

        let columns = finalize_records(&mut records, &mut schema);
        summary.records = records.len();
        summary.columns = columns.len();
        ExportTable {
            columns,
            records,
            summary,
        }
    }
}

/// Registers any column a record carries that the schema has not seen, then re-keys every
/// record against the full schema, backfilling missing columns with their defaults.
pub fn finalize_records(records: &mut [MatchRecord], schema: &mut SchemaAccumulator) -> Vec<String> {
    for record in records.iter() {
        schema.absorb(record);
    }
    let columns = schema.to_vec();
    records
        .par_iter_mut()
        .for_each(|record| record.rekey(columns.iter().map(String::as_str)));
    columns
}
