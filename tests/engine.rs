use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use wellsense_lib::db::{Channel, ChannelSample, ContextRecord, Database, SampleSet};
use wellsense_lib::emotion::{EmotionScore, EstimateSource};
use wellsense_lib::store::{Precomputed, Unavailable};
use wellsense_lib::{Engine, EngineSettings, EscalationReason, WellnessStatus};

fn engine(db: &Database) -> Engine<Database, Database> {
    Engine::new(db.clone(), db.clone(), None, None, EngineSettings::default()).unwrap()
}

fn scores(pairs: &[(&str, f64)]) -> Option<Vec<EmotionScore>> {
    Some(pairs.iter().map(|(l, p)| EmotionScore::new(*l, *p)).collect())
}

fn full_sample(eda: f64, temp: f64, bvp: f64, ecg: f64, resp: f64) -> SampleSet {
    SampleSet::default()
        .with(Channel::Eda, ChannelSample::new(eda, 0.5))
        .with(Channel::Temp, ChannelSample::new(temp, 0.3))
        .with(Channel::Bvp, ChannelSample::new(bvp, 5.0))
        .with(Channel::Ecg, ChannelSample::new(ecg, 4.0))
        .with(Channel::Resp, ChannelSample::new(resp, 2.0))
}

#[tokio::test]
async fn crisis_text_escalates_regardless_of_state() {
    let db = Database::in_memory().unwrap();
    db.insert_physiological_sample("S1", &full_sample(2.0, 33.0, 70.0, 72.0, 14.0), Utc::now())
        .await
        .unwrap();
    let engine = engine(&db);

    let outcome = engine
        .infer_with(
            "S1",
            "I think I'm going to kill myself",
            Some(&Precomputed::new("primary", scores(&[("joy", 0.9)]))),
            None::<&Unavailable>,
        )
        .await;

    assert!(outcome.escalation.escalate);
    assert!(outcome.escalation.has(EscalationReason::CrisisKeyword));
    assert_eq!(outcome.escalation.reasons.len(), 1);
}

#[tokio::test]
async fn first_sample_reads_as_index_fifty() {
    let db = Database::in_memory().unwrap();
    db.insert_physiological_sample("S1", &full_sample(2.0, 33.0, 70.0, 72.0, 14.0), Utc::now())
        .await
        .unwrap();
    let engine = engine(&db);

    let outcome = engine.infer("S1", "normal day").await;
    assert_eq!(outcome.wellness.index, Some(50.0));
    assert_eq!(outcome.wellness.status, WellnessStatus::Neutral);
    for value in outcome.wellness.normalized_channels.values() {
        assert!((value - 0.5).abs() < 1e-9);
    }

    // the baseline was persisted from that first observation
    let baseline = db.get_baseline("S1").await.unwrap().unwrap();
    assert_eq!(baseline.channels.eda.mean, Some(2.0));
}

#[tokio::test]
async fn lower_stress_channels_raise_the_index() {
    let db = Database::in_memory().unwrap();
    db.insert_physiological_sample("S1", &full_sample(2.0, 33.0, 70.0, 72.0, 14.0), Utc::now())
        .await
        .unwrap();
    let engine = engine(&db);
    engine.infer("S1", "seeding").await;

    db.insert_physiological_sample(
        "S1",
        &full_sample(1.0, 32.7, 70.0, 72.0, 12.0),
        Utc::now() + chrono::Duration::seconds(1),
    )
    .await
    .unwrap();

    let outcome = engine.infer("S1", "much better").await;
    let index = outcome.wellness.index.unwrap();
    assert!(index > 50.0, "index {index}");
}

#[tokio::test]
async fn subject_without_samples_is_unknown() {
    let db = Database::in_memory().unwrap();
    let engine = engine(&db);

    let outcome = engine.infer("ghost", "hello").await;
    assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
    assert_eq!(outcome.wellness.index, None);
    assert!(db.get_baseline("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn low_confidence_primary_is_blended() {
    let db = Database::in_memory().unwrap();
    let engine = engine(&db);

    let outcome = engine
        .infer_with(
            "S1",
            "not sure how I feel",
            Some(&Precomputed::new(
                "primary",
                scores(&[("sadness", 0.39), ("fear", 0.06)]),
            )),
            Some(&Precomputed::new(
                "secondary",
                scores(&[("sadness", 0.8), ("neutral", 0.1)]),
            )),
        )
        .await;

    assert_eq!(outcome.emotions.source, EstimateSource::Blended);
    let top = outcome.emotions.top().unwrap();
    assert_eq!(top.label, "sadness");
    assert!((top.probability - (0.7 * 0.39 + 0.3 * 0.8)).abs() < 1e-9);
}

#[tokio::test]
async fn without_classifiers_text_keywords_decide() {
    let db = Database::in_memory().unwrap();
    let engine = engine(&db);

    let outcome = engine.infer("S1", "I'm scared of tomorrow").await;
    assert_eq!(outcome.emotions.source, EstimateSource::Keyword);
    assert_eq!(outcome.emotions.labels(), vec!["fear"]);

    let outcome = engine.infer("S1", "the train was on time").await;
    assert_eq!(outcome.emotions.source, EstimateSource::Sentinel);
    assert_eq!(outcome.emotions.labels(), vec!["neutral"]);
}

#[tokio::test]
async fn repeated_distress_needs_low_wellness() {
    let db = Database::in_memory().unwrap();
    for label in ["sadness", "fear", "sadness"] {
        db.insert_context_record(&ContextRecord::new("S1", label, Some(0.8), Utc::now()))
            .await
            .unwrap();
    }
    let engine = engine(&db);

    // no samples: wellness is Unknown, which counts as low
    let outcome = engine.infer("S1", "still here").await;
    assert!(outcome.escalation.escalate);
    assert!(outcome.escalation.has(EscalationReason::RepeatedDistress));

    // a fresh baseline reads Neutral, which does not
    db.insert_physiological_sample("S1", &full_sample(2.0, 33.0, 70.0, 72.0, 14.0), Utc::now())
        .await
        .unwrap();
    let outcome = engine.infer("S1", "still here").await;
    assert_eq!(outcome.wellness.status, WellnessStatus::Neutral);
    assert!(!outcome.escalation.escalate);
}

#[tokio::test]
async fn metrics_follow_requests() {
    let db = Database::in_memory().unwrap();
    let engine = engine(&db);

    engine.infer("S1", "I want to die").await;
    engine.infer("S1", "fine thanks").await;

    let snapshot = engine.metrics().get_snapshot().await;
    assert_eq!(snapshot.inference_count, 2);
    assert_eq!(snapshot.escalation_count, 1);
    assert_eq!(snapshot.unknown_wellness_count, 2);
    assert_eq!(snapshot.degraded_classifier_count, 0);
    assert_eq!(snapshot.recent_inferences.len(), 2);
}

#[tokio::test]
async fn index_stays_bounded_for_random_readings() {
    let db = Database::in_memory().unwrap();
    let engine = engine(&db);
    let mut rng = StdRng::seed_from_u64(7);

    for round in 0..50 {
        let subject = format!("S{}", round % 5);
        let mut set = SampleSet::default();
        for channel in Channel::ALL {
            if rng.gen_bool(0.8) {
                let mean = rng.gen_range(-1_000.0..1_000.0);
                let std = rng.gen_range(-1.0..50.0);
                set.set(channel, ChannelSample::new(mean, std));
            }
        }
        db.insert_physiological_sample(
            &subject,
            &set,
            Utc::now() + chrono::Duration::milliseconds(round),
        )
        .await
        .unwrap();

        let outcome = engine.infer(&subject, "checking in").await;
        match outcome.wellness.index {
            Some(index) => {
                assert!((0.0..=100.0).contains(&index), "index {index}");
                assert_ne!(outcome.wellness.status, WellnessStatus::Unknown);
            }
            None => assert_eq!(outcome.wellness.status, WellnessStatus::Unknown),
        }
    }
}
