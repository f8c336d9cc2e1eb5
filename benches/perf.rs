use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use halo_match_export::error::{FetchError, FetchResult};
use halo_match_export::match_record::MatchRecordBuilder;
use halo_match_export::metadata::MetadataCache;
use halo_match_export::pipeline::finalize_records;
use halo_match_export::record::MatchRecord;
use halo_match_export::schema::SchemaAccumulator;
use halo_match_export::source::{AssetKind, MatchType, PlayerRef, StatsService};
use halo_match_export::waypoint::parse_body;

/// Serves the same match and skill payloads for every id.
struct StaticService {
    detail: Value,
    skill: Value,
    playlist: Value,
    medals: Value,
}

impl StaticService {
    fn new() -> Self {
        Self {
            detail: parse_body(MATCH_CTF_JSON).unwrap(),
            skill: parse_body(MATCH_SKILL_JSON).unwrap(),
            playlist: parse_body(PLAYLIST_CSR_JSON).unwrap(),
            medals: parse_body(MEDALS_JSON).unwrap(),
        }
    }
}

impl StatsService for StaticService {
    fn match_detail(&self, _match_id: &str) -> FetchResult<Value> {
        Ok(self.detail.clone())
    }

    fn match_skill(&self, _match_id: &str, _player_ids: &[String]) -> FetchResult<Value> {
        Ok(self.skill.clone())
    }

    fn playlist_skill(&self, _playlist_id: &str, _player_ids: &[String]) -> FetchResult<Value> {
        Ok(self.playlist.clone())
    }

    fn medal_catalog(&self) -> FetchResult<Value> {
        Ok(self.medals.clone())
    }

    fn asset(&self, _kind: AssetKind, asset_id: &str, _version_id: &str) -> FetchResult<Value> {
        Ok(json!({"asset_id": asset_id, "public_name": format!("Asset {asset_id}")}))
    }

    fn match_history(
        &self,
        _player_id: &str,
        _offset: usize,
        _count: usize,
        _match_type: MatchType,
    ) -> FetchResult<Vec<String>> {
        Err(FetchError::NotFound("history".into()))
    }
}

fn bench_normalize_keys(c: &mut Criterion) {
    c.bench_function("normalize_match_detail", |b| {
        b.iter(|| {
            let detail = parse_body(black_box(MATCH_CTF_JSON)).unwrap();
            black_box(detail.is_object());
        })
    });
}

fn bench_record_build(c: &mut Criterion) {
    let service = StaticService::new();
    let player = PlayerRef::new("bench", "xuid(2533274818160056)");
    let builder = MatchRecordBuilder::new(&service);
    let mut metadata = MetadataCache::new(&service);

    c.bench_function("record_build", |b| {
        b.iter(|| {
            let mut schema = SchemaAccumulator::new();
            let record = builder
                .build(&mut metadata, &mut schema, &player, black_box("ctf-1"), 1)
                .into_record();
            black_box(record.map(|r| r.len()));
        })
    });
}

fn bench_finalize(c: &mut Criterion) {
    let service = StaticService::new();
    let player = PlayerRef::new("bench", "xuid(2533274818160056)");
    let builder = MatchRecordBuilder::new(&service);
    let mut metadata = MetadataCache::new(&service);
    let mut schema = SchemaAccumulator::new();

    let mut base: Vec<MatchRecord> = Vec::new();
    for idx in 0..500 {
        if let Some(mut record) = builder
            .build(&mut metadata, &mut schema, &player, "ctf-1", idx + 1)
            .into_record()
        {
            record.set(format!("extra_{}_count", idx % 40), 1i64);
            base.push(record);
        }
    }

    c.bench_function("finalize_500_records", |b| {
        b.iter(|| {
            let mut records = base.clone();
            let mut schema = SchemaAccumulator::new();
            let columns = finalize_records(black_box(&mut records), &mut schema);
            black_box(columns.len());
        })
    });
}

criterion_group!(perf, bench_normalize_keys, bench_record_build, bench_finalize);
criterion_main!(perf);

static MATCH_CTF_JSON: &str = include_str!("../tests/fixtures/match_ctf.json");
static MATCH_SKILL_JSON: &str = include_str!("../tests/fixtures/match_skill_rank_recap.json");
static PLAYLIST_CSR_JSON: &str = include_str!("../tests/fixtures/playlist_csr_wrapped.json");
static MEDALS_JSON: &str = include_str!("../tests/fixtures/medals.json");
