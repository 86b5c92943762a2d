//! Synthetic per-source datapoint shapes.
//!
//! Each registered source produces four numeric features. Normal shapes are
//! tight clusters; anomalous shapes are clear outliers.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;

use crate::detect::DataPoint;

type Shape = fn(&mut StdRng, bool) -> (&'static str, BTreeMap<String, f64>);

/// Synthesize one datapoint from a uniformly chosen source generator,
/// anomalous with probability `anomaly_rate_pct / 100`.
pub fn synthesize(rng: &mut StdRng, anomaly_rate_pct: u8) -> DataPoint {
    let anomalous = rng.gen_range(0u32..100) < anomaly_rate_pct as u32;
    let shape = SHAPES[rng.gen_range(0..SHAPES.len())];
    let (source, values) = shape(rng, anomalous);
    DataPoint {
        source: source.to_string(),
        timestamp: Utc::now(),
        values,
    }
}

static SHAPES: &[Shape] = &[
    payment, login, api, database, mail, checkout, search, upload,
];

fn values(pairs: [(&str, f64); 4]) -> BTreeMap<String, f64> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn payment(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("amount", round2(rng.gen_range(3000.0..50000.0))),
            ("response_time_ms", rng.gen_range(2000..8000) as f64),
            ("failed_attempts", rng.gen_range(3..=10) as f64),
            ("num_items", rng.gen_range(1..=3) as f64),
        ])
    } else {
        values([
            ("amount", round2(rng.gen_range(5.0..500.0))),
            ("response_time_ms", rng.gen_range(80..500) as f64),
            ("failed_attempts", 0.0),
            ("num_items", rng.gen_range(1..=10) as f64),
        ])
    };
    ("sensor-payment", v)
}

fn login(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("attempt_count", rng.gen_range(10..=50) as f64),
            ("session_duration_s", rng.gen_range(1..=5) as f64),
            ("failed_count_24h", rng.gen_range(5..=20) as f64),
            ("new_device", 1.0),
        ])
    } else {
        values([
            ("attempt_count", 1.0),
            ("session_duration_s", rng.gen_range(120..=3600) as f64),
            ("failed_count_24h", rng.gen_range(0..=1) as f64),
            ("new_device", 0.0),
        ])
    };
    ("sensor-login", v)
}

fn api(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("response_time_ms", rng.gen_range(5000..30000) as f64),
            ("error_rate_pct", round1(rng.gen_range(30.0..100.0))),
            ("requests_per_min", rng.gen_range(500..5000) as f64),
            ("timeout_count", rng.gen_range(5..=50) as f64),
        ])
    } else {
        values([
            ("response_time_ms", rng.gen_range(50..300) as f64),
            ("error_rate_pct", round1(rng.gen_range(0.0..2.0))),
            ("requests_per_min", rng.gen_range(10..100) as f64),
            ("timeout_count", 0.0),
        ])
    };
    ("sensor-api", v)
}

fn database(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("query_time_ms", rng.gen_range(5000..30000) as f64),
            ("rows_affected", rng.gen_range(50000..1000000) as f64),
            ("pool_usage_pct", round1(rng.gen_range(90.0..100.0))),
            ("deadlocks", rng.gen_range(1..=10) as f64),
        ])
    } else {
        values([
            ("query_time_ms", rng.gen_range(10..200) as f64),
            ("rows_affected", rng.gen_range(1..1000) as f64),
            ("pool_usage_pct", round1(rng.gen_range(10.0..50.0))),
            ("deadlocks", 0.0),
        ])
    };
    ("sensor-database", v)
}

fn mail(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("send_time_ms", rng.gen_range(5000..20000) as f64),
            ("recipient_count", rng.gen_range(1000..50000) as f64),
            ("spam_score_pct", round1(rng.gen_range(70.0..100.0))),
            ("bounce_rate_pct", round1(rng.gen_range(30.0..90.0))),
        ])
    } else {
        values([
            ("send_time_ms", rng.gen_range(100..500) as f64),
            ("recipient_count", rng.gen_range(1..=10) as f64),
            ("spam_score_pct", round1(rng.gen_range(0.0..10.0))),
            ("bounce_rate_pct", round1(rng.gen_range(0.0..3.0))),
        ])
    };
    ("sensor-mail", v)
}

fn checkout(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("cart_value", round2(rng.gen_range(5000.0..50000.0))),
            ("payment_time_s", rng.gen_range(60..300) as f64),
            ("retry_count", rng.gen_range(3..=10) as f64),
            ("failed_payment_24h", rng.gen_range(5..=20) as f64),
        ])
    } else {
        values([
            ("cart_value", round2(rng.gen_range(10.0..300.0))),
            ("payment_time_s", rng.gen_range(2..=10) as f64),
            ("retry_count", 0.0),
            ("failed_payment_24h", rng.gen_range(0..=1) as f64),
        ])
    };
    ("sensor-checkout", v)
}

fn search(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("query_time_ms", rng.gen_range(5000..20000) as f64),
            ("results_count", 0.0),
            ("query_length", rng.gen_range(500..5000) as f64),
            ("cache_miss_rate_pct", round1(rng.gen_range(80.0..100.0))),
        ])
    } else {
        values([
            ("query_time_ms", rng.gen_range(20..200) as f64),
            ("results_count", rng.gen_range(5..100) as f64),
            ("query_length", rng.gen_range(3..50) as f64),
            ("cache_miss_rate_pct", round1(rng.gen_range(0.0..20.0))),
        ])
    };
    ("sensor-search", v)
}

fn upload(rng: &mut StdRng, anomalous: bool) -> (&'static str, BTreeMap<String, f64>) {
    let v = if anomalous {
        values([
            ("file_size_mb", round1(rng.gen_range(500.0..5000.0))),
            ("upload_duration_s", rng.gen_range(600..3600) as f64),
            ("error_count", rng.gen_range(1..=10) as f64),
            ("retry_count", rng.gen_range(3..=10) as f64),
        ])
    } else {
        values([
            ("file_size_mb", round1(rng.gen_range(0.1..50.0))),
            ("upload_duration_s", rng.gen_range(1..30) as f64),
            ("error_count", 0.0),
            ("retry_count", 0.0),
        ])
    };
    ("sensor-upload", v)
}
