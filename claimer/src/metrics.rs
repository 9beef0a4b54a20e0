use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref CLAIMS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("claims_total", "Claim requests by outcome"),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref CLAIM_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("claim_duration_seconds", "Time spent handling a claim")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0])
    )
    .expect("metric can be created");
    pub static ref TOKEN_ACCOUNTS_CREATED: IntCounter = IntCounter::new(
        "token_accounts_created_total",
        "Claims that created the recipient token account"
    )
    .expect("metric can be created");
}

static INIT: Once = Once::new();

pub fn register_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(CLAIMS_TOTAL.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(CLAIM_DURATION.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(TOKEN_ACCOUNTS_CREATED.clone()))
            .expect("collector can be registered");
    });
}

pub fn record_claim(outcome: &str, seconds: f64, created_token_account: bool) {
    CLAIMS_TOTAL.with_label_values(&[outcome]).inc();
    CLAIM_DURATION.observe(seconds);
    if created_token_account {
        TOKEN_ACCOUNTS_CREATED.inc();
    }
}

pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
