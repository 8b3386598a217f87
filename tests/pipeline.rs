//! End-to-end pipeline test: synthetic imbalanced CSV -> training ->
//! persisted artifacts -> reload -> streaming scorer.

use std::io::{Cursor, Write};
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};

use flowsentry::artifacts::{ArtifactSet, METADATA_FILE};
use flowsentry::config::Config;
use flowsentry::dataset::Dataset;
use flowsentry::model::BoostConfig;
use flowsentry::resample::ResampleConfig;
use flowsentry::stream::{JsonlFlowSource, StreamingScorer};
use flowsentry::trainer::Trainer;

const HEADER: &str = "src_ip,timestamp,Destination Port,Flow Duration,Total Fwd Packets,\
Total Backward Packets,Total Length of Fwd Packets,Total Length of Bwd Packets,\
Fwd Packet Length Max,Bwd Packet Length Max,Flow Bytes/s,Flow Packets/s,Label";

fn csv_row(port: u16, scale: f32, i: usize, class: &str) -> String {
    let v = scale * (1.0 + (i % 7) as f32 * 0.01);
    format!(
        "10.0.0.{},1699999999,{},{v},{v},{v},{v},{v},{v},{v},{v},{v},{}",
        i % 250,
        port,
        class,
        v = v
    )
}

fn write_dataset() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for i in 0..120 {
        writeln!(file, "{}", csv_row(443, 1.0, i, "BENIGN")).unwrap();
    }
    for i in 0..40 {
        writeln!(file, "{}", csv_row(80, 100.0, i, "DoS")).unwrap();
    }
    for i in 0..14 {
        writeln!(file, "{}", csv_row(22, 10.0, i, "PortScan")).unwrap();
    }
    // Rare classes collapse into one bucket
    for i in 0..2 {
        writeln!(file, "{}", csv_row(8443, 1000.0, i, "Heartbleed")).unwrap();
        writeln!(file, "{}", csv_row(8443, 1000.0, i + 2, "Infiltration")).unwrap();
    }
    // Invalid rows: non-finite rate, missing field
    writeln!(
        file,
        "10.0.0.1,1699999999,443,1,1,1,1,1,1,1,inf,1,BENIGN"
    )
    .unwrap();
    writeln!(file, "10.0.0.2,1699999999,443,1,1,1,1,1,1,,1,1,DoS").unwrap();

    file.flush().unwrap();
    file
}

fn small_config() -> Config {
    let mut config = Config::default();
    config.model = BoostConfig {
        n_estimators: 12,
        learning_rate: 0.3,
        max_depth: 2,
        min_samples_split: 4,
        subsample: 1.0,
        ..Default::default()
    };
    config.resample = ResampleConfig {
        target_count: 60,
        ..Default::default()
    };
    config.trainer.cv_folds = 3;
    config
}

fn flow_json(port: u16, duration_ms: f32, magnitude: f32) -> String {
    format!(
        r#"{{"dst_port":{},"duration_ms":{},"fwd_packets":{m},"bwd_packets":{m},"fwd_bytes":{m},"bwd_bytes":{m},"fwd_max_pkt_len":{mag},"bwd_max_pkt_len":{mag},"total_bytes":{m},"total_packets":{m}}}"#,
        port,
        duration_ms,
        m = magnitude as u64,
        mag = magnitude
    )
}

#[test]
fn train_persist_reload_and_stream() {
    let csv = write_dataset();
    let config = small_config();

    // Preparation: contract projection, cleaning, rare-class collapse
    let dataset = Dataset::load_csv(csv.path(), &config.dataset).unwrap();
    assert_eq!(dataset.rows_read, 180);
    assert_eq!(dataset.rows_dropped, 2);
    assert_eq!(dataset.len(), 178);
    assert_eq!(
        dataset.encoder.classes(),
        &["BENIGN", "DoS", "PortScan", "RareAttack"]
    );

    // Training protocol
    let outcome = Trainer::new(config).run(&dataset).unwrap();
    assert_eq!(outcome.cv_scores.len(), 3);
    assert!(
        outcome.report.weighted_f1 > 0.8,
        "weighted f1 {}",
        outcome.report.weighted_f1
    );
    let shuffled = outcome.shuffled_f1.unwrap();
    assert!(shuffled < outcome.report.weighted_f1);

    // Persist and reload one generation
    let dir = TempDir::new().unwrap();
    outcome.artifacts.save(dir.path()).unwrap();
    let loaded = ArtifactSet::load(dir.path()).unwrap();
    assert_eq!(loaded.generation, outcome.artifacts.generation);
    assert_eq!(loaded.encoder, outcome.artifacts.encoder);

    // Stream: benign-ish flow, zero-duration flow, malformed line, big flow
    let input = format!(
        "{}\n{}\nthis is not a flow record\n{}\n",
        flow_json(443, 100.0, 1.0),
        flow_json(443, 0.0, 1.0),
        flow_json(80, 5.0, 100.0)
    );

    let scorer = StreamingScorer::new(loaded);
    let mut source = JsonlFlowSource::from_reader(Cursor::new(input));
    let stats = scorer.run(&mut source, Duration::ZERO);

    assert_eq!(stats.scored, 3);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn tampered_generation_is_fatal_at_load() {
    let csv = write_dataset();
    let config = small_config();

    let dataset = Dataset::load_csv(csv.path(), &config.dataset).unwrap();
    let outcome = Trainer::new(config).run(&dataset).unwrap();

    let dir = TempDir::new().unwrap();
    outcome.artifacts.save(dir.path()).unwrap();

    // Rewrite the metadata to claim a different generation
    let metadata_path = dir.path().join(METADATA_FILE);
    let tampered = std::fs::read_to_string(&metadata_path)
        .unwrap()
        .replace(&outcome.artifacts.generation, "0000000000000000");
    std::fs::write(&metadata_path, tampered).unwrap();

    assert!(ArtifactSet::load(dir.path()).is_err());
}

#[test]
fn zero_duration_flow_yields_zero_rates_and_a_known_label() {
    let csv = write_dataset();
    let config = small_config();

    let dataset = Dataset::load_csv(csv.path(), &config.dataset).unwrap();
    let outcome = Trainer::new(config).run(&dataset).unwrap();
    let scorer = StreamingScorer::new(outcome.artifacts);

    let flow: flowsentry::FlowRecord =
        serde_json::from_str(&flow_json(443, 0.0, 10.0)).unwrap();
    let features = flowsentry::FeatureVector::from_flow(&flow).unwrap();
    assert_eq!(features.get("Flow Bytes/s"), Some(0.0));
    assert_eq!(features.get("Flow Packets/s"), Some(0.0));

    let prediction = scorer.score(&flow).unwrap();
    assert!(["BENIGN", "DoS", "PortScan", "RareAttack"].contains(&prediction.label.as_str()));
}
