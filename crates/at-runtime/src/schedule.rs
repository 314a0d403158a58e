//! The wall-clock Scheduler (spec.md §4.3, §2 component K), grounded on
//! `original_source/autotransform/schema/schema.py` scheduling helpers and
//! the shard-filter lineage under `original_source`'s `filter/` package
//! (recovered per SPEC_FULL.md §4.3).

use at_schema::builtin::filter::KeyHashShardFilter;
use at_schema::{FilterEntry, SchemaMap};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::runner::Runner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Repeats {
    Daily,
    Weekly,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShardFilterConfig {
    pub num_shards: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Schedule {
    pub repeats: Repeats,
    pub hour_of_day: u8,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub shard_filter: Option<ShardFilterConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScheduledSchema {
    pub schema_name: String,
    pub schedule: Schedule,
    #[serde(default)]
    pub max_submissions: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Scheduler {
    pub base_time: i64,
    #[serde(default)]
    pub excluded_days: std::collections::HashSet<u8>,
    pub schemas: Vec<ScheduledSchema>,
}

/// The tick-derived wall-clock coordinates a `now` resolves to (spec.md §4.3
/// steps 1-2), computed once per `run` call and reused by every scheduled
/// entry's gate check.
struct Tick {
    hour_of_day: u8,
    day_of_week: u8,
    elapsed_days: i64,
    elapsed_weeks: i64,
}

fn tick(base_time: i64, now: i64) -> Tick {
    let elapsed_hours = (now - base_time).div_euclid(3600);
    let hour_of_day = elapsed_hours.rem_euclid(24) as u8;
    let elapsed_days = elapsed_hours.div_euclid(24);
    let day_of_week = elapsed_days.rem_euclid(7) as u8;
    let elapsed_weeks = elapsed_days.div_euclid(7);
    Tick { hour_of_day, day_of_week, elapsed_days, elapsed_weeks }
}

fn gate(schedule: &Schedule, tick: &Tick) -> bool {
    if tick.hour_of_day != schedule.hour_of_day {
        return false;
    }
    match schedule.repeats {
        Repeats::Daily => true,
        Repeats::Weekly => Some(tick.day_of_week) == schedule.day_of_week,
    }
}

impl Scheduler {
    pub fn load(path: &std::path::Path) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("reading scheduler config {}: {e}", path.display()))))?;
        serde_json::from_str(&text)
            .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("parsing scheduler config {}: {e}", path.display()))))
    }

    /// `scheduler.run(now)` (spec.md §4.3 contract): one tick, dispatching
    /// every scheduled schema whose gate passes to `remote_runner.run`.
    #[instrument(skip_all, fields(now))]
    pub fn run(&self, now: i64, schema_map: &SchemaMap, remote_runner: &dyn Runner) -> RuntimeResult<()> {
        let tick = tick(self.base_time, now);
        if self.excluded_days.contains(&tick.day_of_week) {
            info!(day_of_week = tick.day_of_week, "day excluded, skipping tick");
            return Ok(());
        }

        for scheduled in &self.schemas {
            if !gate(&scheduled.schedule, &tick) {
                continue;
            }

            let mut schema = schema_map
                .resolve_file(&scheduled.schema_name)
                .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("{e}"))))?;

            if let Some(shard) = &scheduled.schedule.shard_filter {
                let valid_shard = match scheduled.schedule.repeats {
                    Repeats::Daily => tick.elapsed_days.rem_euclid(shard.num_shards as i64),
                    Repeats::Weekly => tick.elapsed_weeks.rem_euclid(shard.num_shards as i64),
                } as u64;
                schema.filters.push(FilterEntry::new(Box::new(KeyHashShardFilter {
                    num_shards: shard.num_shards,
                    valid_shard,
                })));
            }

            if let Some(max_submissions) = scheduled.max_submissions {
                schema.config.max_submissions = Some(max_submissions);
            }

            info!(schema = scheduled.schema_name.as_str(), "dispatching scheduled schema");
            remote_runner.run(&schema)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingRunner {
        runs: std::sync::Mutex<Vec<String>>,
    }

    impl Runner for RecordingRunner {
        fn run(&self, schema: &at_schema::Schema) -> RuntimeResult<()> {
            self.runs.lock().unwrap().push(schema.config.schema_name.clone());
            Ok(())
        }
        fn update(&self, _change: &dyn at_schema::ChangeTarget) -> RuntimeResult<bool> {
            Ok(true)
        }
    }

    fn schema_map_with(dir: &std::path::Path, name: &str) -> SchemaMap {
        std::fs::write(
            dir.join(format!("{name}.json")),
            serde_json::json!({
                "input": {"name": "directory", "path": "."},
                "filters": [],
                "batcher": {"name": "single", "metadata": {"title": "t"}},
                "transformer": {"name": "regex", "pattern": "a", "replacement": "b"},
                "validators": [],
                "commands": [],
                "config": {"schema_name": name},
            })
            .to_string(),
        )
        .unwrap();
        let map_path = dir.join("schema_map.json");
        std::fs::write(
            &map_path,
            serde_json::json!({ name: {"type": "FILE", "target": format!("{name}.json")} }).to_string(),
        )
        .unwrap();
        SchemaMap::load(&map_path).unwrap()
    }

    #[test]
    fn daily_schedule_dispatches_exactly_once_at_its_hour() {
        // spec.md §8 scenario 5: base_time aligned to Monday 00:00, now = +7h,
        // schema scheduled DAILY at hour_of_day=7.
        let dir = tempfile::tempdir().unwrap();
        let map = schema_map_with(dir.path(), "daily-schema");

        let base_time = 0i64;
        let now = base_time + 7 * 3600;
        let scheduler = Scheduler {
            base_time,
            excluded_days: Default::default(),
            schemas: vec![ScheduledSchema {
                schema_name: "daily-schema".into(),
                schedule: Schedule { repeats: Repeats::Daily, hour_of_day: 7, day_of_week: None, shard_filter: None },
                max_submissions: None,
            }],
        };

        let runner = RecordingRunner { runs: std::sync::Mutex::new(vec![]) };
        scheduler.run(now, &map, &runner).unwrap();
        assert_eq!(*runner.runs.lock().unwrap(), vec!["daily-schema".to_string()]);
    }

    #[test]
    fn excluded_day_short_circuits_the_whole_tick() {
        let dir = tempfile::tempdir().unwrap();
        let map = schema_map_with(dir.path(), "daily-schema");

        let base_time = 0i64;
        let now = base_time + 7 * 3600; // day_of_week 0
        let mut excluded_days = std::collections::HashSet::new();
        excluded_days.insert(0u8);
        let scheduler = Scheduler {
            base_time,
            excluded_days,
            schemas: vec![ScheduledSchema {
                schema_name: "daily-schema".into(),
                schedule: Schedule { repeats: Repeats::Daily, hour_of_day: 7, day_of_week: None, shard_filter: None },
                max_submissions: None,
            }],
        };

        let runner = RecordingRunner { runs: std::sync::Mutex::new(vec![]) };
        scheduler.run(now, &map, &runner).unwrap();
        assert!(runner.runs.lock().unwrap().is_empty());
    }

    #[test]
    fn wrong_hour_does_not_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let map = schema_map_with(dir.path(), "daily-schema");

        let scheduler = Scheduler {
            base_time: 0,
            excluded_days: Default::default(),
            schemas: vec![ScheduledSchema {
                schema_name: "daily-schema".into(),
                schedule: Schedule { repeats: Repeats::Daily, hour_of_day: 7, day_of_week: None, shard_filter: None },
                max_submissions: None,
            }],
        };

        let runner = RecordingRunner { runs: std::sync::Mutex::new(vec![]) };
        scheduler.run(8 * 3600, &map, &runner).unwrap();
        assert!(runner.runs.lock().unwrap().is_empty());
    }
}
