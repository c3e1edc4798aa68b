use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use taxi_lakehouse::config::Config;
use taxi_lakehouse::pipeline::steps::{AggregationStage, CleaningStage, Stage};
use taxi_lakehouse::pipeline::{Pipeline, PipelineContext, SnapshotKind};
use taxi_lakehouse::report::{CollectingReporter, ReportEvent};
use taxi_lakehouse::storage::{FileSnapshotStore, SnapshotStore};
use taxi_lakehouse::table::{Table, Value};
use taxi_lakehouse::LakehouseError;

const HEADER: &str = "VendorID,PULocationID,DOLocationID,trip_distance,fare_amount";

struct Lake {
    _dir: TempDir,
    input: PathBuf,
    config: Config,
    reporter: CollectingReporter,
}

impl Lake {
    fn new(lines: &[String]) -> Result<Self> {
        let dir = tempdir()?;
        let input = dir.path().join("taxi_tripdata.csv");
        let mut contents = String::from(HEADER);
        contents.push('\n');
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }
        std::fs::write(&input, contents)?;

        let mut config = Config::default();
        config.storage.base_path = dir.path().display().to_string();
        Ok(Self {
            _dir: dir,
            input,
            config,
            reporter: CollectingReporter::new(),
        })
    }

    /// A fresh context over the same directory, as a new process would build it
    fn context(&self) -> PipelineContext {
        let store = FileSnapshotStore::new(self.config.storage.snapshot_root());
        PipelineContext::new(Arc::new(store), Arc::new(self.reporter.clone()), self.config.clone())
    }

    async fn read(&self, kind: SnapshotKind) -> Result<Table> {
        let ctx = self.context();
        Ok(ctx.store.read(ctx.snapshot_name(kind)).await?)
    }
}

fn trip(fare: f64, distance: f64, pickup: i64, dropoff: i64) -> String {
    format!("1,{},{},{},{}", pickup, dropoff, distance, fare)
}

fn col(table: &Table, name: &str) -> usize {
    table.schema.index_of(name).unwrap()
}

/// (label, rows) for every sample the reporter printed, in order
fn sample_sizes(reporter: &CollectingReporter) -> Vec<(String, usize)> {
    reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::Sample { label, rows } => Some((label, rows)),
            _ => None,
        })
        .collect()
}

async fn run_single(lake: &Lake, stage: impl Stage + 'static) -> taxi_lakehouse::Result<()> {
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(stage)];
    Pipeline::new(stages)?.run(&lake.context()).await.map(|_| ())
}

#[tokio::test]
async fn reference_scenario_end_to_end() -> Result<()> {
    let lake = Lake::new(&[
        trip(10.0, 0.5, 1, 2),
        trip(12.0, 3.0, 1, 2),
        trip(-5.0, 2.0, 1, 3),
        trip(10.0, 0.5, 1, 2),
    ])?;

    let result = Pipeline::standard(&lake.input).run(&lake.context()).await?;
    assert_eq!(result.stage("ingestion").unwrap().rows_out, 4);
    assert_eq!(result.stage("cleaning").unwrap().rows_out, 2);

    let clean = lake.read(SnapshotKind::Clean).await?;
    assert_eq!(clean.len(), 2);
    let tt = col(&clean, "trip_type");
    let dist = col(&clean, "trip_distance");
    for row in &clean.rows {
        let expected = if row[dist].as_f64() == Some(0.5) { "short" } else { "medium" };
        assert_eq!(row[tt].as_str(), Some(expected));
    }

    let summary = lake.read(SnapshotKind::Summary).await?;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary.rows[0], vec![Value::Integer(1), Value::Integer(2), Value::Double(11.0)]);

    let events = lake.reporter.events();
    assert!(events.contains(&ReportEvent::RowCount { label: "Raw".to_string(), count: 4 }));
    assert!(events.contains(&ReportEvent::RowCount { label: "Cleaned".to_string(), count: 2 }));
    // fewer rows than the configured sample size: the whole table is shown
    assert_eq!(
        sample_sizes(&lake.reporter),
        vec![("Raw".to_string(), 4), ("Cleaned".to_string(), 2)]
    );
    match events.last() {
        Some(ReportEvent::Completed { locations }) => assert_eq!(locations.len(), 3),
        other => panic!("expected completion, got {:?}", other),
    }
    Ok(())
}

/// Deterministic mixed population: duplicates, invalid rows and fare outliers
fn synthetic_trips() -> Vec<String> {
    let mut lines = Vec::new();
    for i in 0..400i64 {
        let fare = ((i * 37) % 90) as f64 + 2.5;
        let distance = ((i * 13) % 120) as f64 / 10.0;
        lines.push(trip(fare, distance, i % 7, (i * 3) % 5));
        if i % 25 == 0 {
            lines.push(trip(fare, distance, i % 7, (i * 3) % 5));
        }
    }
    lines.push(trip(0.0, 3.0, 1, 1));
    lines.push(trip(-12.0, 3.0, 1, 1));
    lines.push(trip(5000.0, 4.0, 2, 2));
    lines.push(trip(0.01, 4.0, 2, 2));
    lines
}

#[tokio::test]
async fn cleaned_rows_satisfy_every_invariant() -> Result<()> {
    let lake = Lake::new(&synthetic_trips())?;
    let result = Pipeline::standard(&lake.input).run(&lake.context()).await?;
    let report = result.stage("cleaning").unwrap();
    let p_lower: f64 = report.metadata["p_lower"].parse()?;
    let p_upper: f64 = report.metadata["p_upper"].parse()?;

    let clean = lake.read(SnapshotKind::Clean).await?;
    let (fare, dist, tt) = (col(&clean, "fare_amount"), col(&clean, "trip_distance"), col(&clean, "trip_type"));

    assert!(!clean.is_empty());
    assert_eq!(lake.config.report.sample_rows, 5);
    assert_eq!(
        sample_sizes(&lake.reporter),
        vec![("Raw".to_string(), 5), ("Cleaned".to_string(), 5)]
    );
    for row in &clean.rows {
        let f = row[fare].as_f64().unwrap();
        let d = row[dist].as_f64().unwrap();
        assert!(f > 0.0 && d > 0.0);
        assert!(p_lower <= f && f <= p_upper, "{} outside [{}, {}]", f, p_lower, p_upper);
        let expected = if d < 1.0 {
            "short"
        } else if d < 5.0 {
            "medium"
        } else {
            "long"
        };
        assert_eq!(row[tt].as_str(), Some(expected));
    }
    assert!(clean.rows.iter().all(|r| r[fare].as_f64() != Some(5000.0)));

    let unique: HashSet<&Vec<Value>> = clean.rows.iter().collect();
    assert_eq!(unique.len(), clean.len(), "cleaned rows must be distinct");
    assert!(clean.clone().distinct().same_rows_as(&clean));
    Ok(())
}

#[tokio::test]
async fn summary_matches_independent_group_means() -> Result<()> {
    let lake = Lake::new(&synthetic_trips())?;
    Pipeline::standard(&lake.input).run(&lake.context()).await?;

    let clean = lake.read(SnapshotKind::Clean).await?;
    let (fare, pu, du) = (
        col(&clean, "fare_amount"),
        col(&clean, "PULocationID"),
        col(&clean, "DOLocationID"),
    );
    let mut expected: HashMap<(Value, Value), (f64, usize)> = HashMap::new();
    for row in &clean.rows {
        let entry = expected.entry((row[pu].clone(), row[du].clone())).or_insert((0.0, 0));
        entry.0 += row[fare].as_f64().unwrap();
        entry.1 += 1;
    }

    let summary = lake.read(SnapshotKind::Summary).await?;
    assert_eq!(summary.len(), expected.len());
    for row in &summary.rows {
        let (sum, count) = expected[&(row[0].clone(), row[1].clone())];
        let avg = row[2].as_f64().unwrap();
        assert!((avg - sum / count as f64).abs() < 1e-9);
    }
    Ok(())
}

#[tokio::test]
async fn rerunning_with_overwrite_is_idempotent() -> Result<()> {
    let lake = Lake::new(&synthetic_trips())?;
    Pipeline::standard(&lake.input).run(&lake.context()).await?;
    let first: Vec<Table> = vec![
        lake.read(SnapshotKind::Raw).await?,
        lake.read(SnapshotKind::Clean).await?,
        lake.read(SnapshotKind::Summary).await?,
    ];

    Pipeline::standard(&lake.input).run(&lake.context()).await?;
    let ctx = lake.context();
    for (kind, before) in SnapshotKind::ALL.iter().zip(&first) {
        let after = lake.read(*kind).await?;
        assert!(after.same_rows_as(before), "{} changed on rerun", kind);

        let history = ctx.store.history(ctx.snapshot_name(*kind)).await?;
        assert_eq!(history.iter().map(|h| h.version).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(history[0].content_hash, history[1].content_hash);
    }
    Ok(())
}

#[tokio::test]
async fn each_stage_reruns_from_cold_storage() -> Result<()> {
    let lake = Lake::new(&[trip(10.0, 0.5, 1, 2), trip(20.0, 6.0, 3, 4)])?;
    Pipeline::standard(&lake.input).run(&lake.context()).await?;

    // Replace the clean snapshot by hand, then re-run only aggregation
    let mut clean = lake.read(SnapshotKind::Clean).await?;
    let fare = col(&clean, "fare_amount");
    clean.rows.retain(|r| r[fare].as_f64() == Some(20.0));
    let ctx = lake.context();
    ctx.store
        .write(ctx.snapshot_name(SnapshotKind::Clean), &clean, taxi_lakehouse::storage::WriteMode::Overwrite)
        .await?;

    run_single(&lake, AggregationStage).await?;
    let summary = lake.read(SnapshotKind::Summary).await?;
    assert_eq!(summary.rows, vec![vec![Value::Integer(3), Value::Integer(4), Value::Double(20.0)]]);

    // Older summary version is still readable
    let previous = ctx
        .store
        .read_version(ctx.snapshot_name(SnapshotKind::Summary), 0)
        .await?;
    assert_eq!(previous.len(), 2);
    Ok(())
}

#[tokio::test]
async fn all_invalid_rows_fail_cleaning_with_context() -> Result<()> {
    let lake = Lake::new(&[trip(-1.0, 2.0, 1, 2), trip(4.0, 0.0, 1, 2)])?;
    let err = Pipeline::standard(&lake.input).run(&lake.context()).await.unwrap_err();

    match &err {
        LakehouseError::Stage { stage, snapshot, .. } => {
            assert_eq!(stage, "cleaning");
            assert!(snapshot.ends_with("nyc_taxi_clean"));
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert!(matches!(err.root(), LakehouseError::EmptyPercentileInput { .. }));

    // raw was committed, clean was not
    assert_eq!(lake.read(SnapshotKind::Raw).await?.len(), 2);
    assert!(matches!(
        lake.read(SnapshotKind::Clean).await.unwrap_err().downcast_ref::<LakehouseError>(),
        Some(LakehouseError::SnapshotNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn header_only_source_is_an_empty_population() -> Result<()> {
    let lake = Lake::new(&[])?;
    let err = Pipeline::standard(&lake.input).run(&lake.context()).await.unwrap_err();

    match &err {
        LakehouseError::Stage { stage, .. } => assert_eq!(stage, "cleaning"),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(
        matches!(err.root(), LakehouseError::EmptyPercentileInput { column } if column == "fare_amount"),
        "{:?}",
        err.root()
    );
    assert!(lake.read(SnapshotKind::Raw).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn blank_fares_are_an_empty_population() -> Result<()> {
    let lake = Lake::new(&["1,1,2,3.5,".to_string(), "2,4,5,0.7,".to_string()])?;
    let err = Pipeline::standard(&lake.input).run(&lake.context()).await.unwrap_err();

    assert!(
        matches!(err.root(), LakehouseError::EmptyPercentileInput { .. }),
        "{:?}",
        err.root()
    );
    assert_eq!(lake.read(SnapshotKind::Raw).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn source_without_distance_column_fails_at_clean_boundary() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("trips.csv");
    std::fs::write(&input, "fare_amount,PULocationID,DOLocationID\n10,1,2\n")?;

    let mut config = Config::default();
    config.storage.base_path = dir.path().display().to_string();
    let store = FileSnapshotStore::new(config.storage.snapshot_root());
    let ctx = PipelineContext::new(Arc::new(store), Arc::new(CollectingReporter::new()), config);

    let err = Pipeline::standard(&input).run(&ctx).await.unwrap_err();
    assert!(matches!(
        err.root(),
        LakehouseError::MissingColumn { column, .. } if column == "trip_distance"
    ));
    Ok(())
}

#[tokio::test]
async fn missing_source_fails_ingestion() -> Result<()> {
    let lake = Lake::new(&[])?;
    let err = Pipeline::standard(Path::new("/no/such/taxi.csv"))
        .run(&lake.context())
        .await
        .unwrap_err();
    match &err {
        LakehouseError::Stage { stage, .. } => assert_eq!(stage, "ingestion"),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(matches!(err.root(), LakehouseError::SourceNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn cleaning_alone_reads_only_the_raw_snapshot() -> Result<()> {
    let lake = Lake::new(&[trip(8.0, 2.0, 5, 6)])?;
    Pipeline::standard(&lake.input).run(&lake.context()).await?;

    // Source file gone: cleaning must not need it
    std::fs::remove_file(&lake.input)?;
    run_single(&lake, CleaningStage).await?;

    let ctx = lake.context();
    let history = ctx.store.history(ctx.snapshot_name(SnapshotKind::Clean)).await?;
    assert_eq!(history.len(), 2);
    Ok(())
}
