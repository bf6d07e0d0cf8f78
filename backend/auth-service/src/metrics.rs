use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> Option<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .map_err(|e| tracing::error!("failed to create {} counter: {}", name, e))
        .ok()
}

// =========================
// Authentication decisions
// =========================

/// Outcome of every authentication attempt, labelled by rejection reason
static AUTH_DECISIONS_TOTAL: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_counter_vec(
        "auth_decisions_total",
        "Authentication decisions by outcome",
        &["outcome"],
    )
});

// =========================
// Account operations
// =========================

static ACCOUNT_OPERATIONS_TOTAL: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_counter_vec(
        "account_operations_total",
        "Register, login and logout calls by result",
        &["operation", "result"],
    )
});

/// Force registration so the series show up before the first request.
pub fn initialize_auth_metrics() {
    Lazy::force(&AUTH_DECISIONS_TOTAL);
    Lazy::force(&ACCOUNT_OPERATIONS_TOTAL);
}

#[inline]
pub fn record_auth_decision(outcome: &str) {
    if let Some(counter) = AUTH_DECISIONS_TOTAL.as_ref() {
        counter.with_label_values(&[outcome]).inc();
    }
}

#[inline]
pub fn record_account_operation(operation: &str, success: bool) {
    if let Some(counter) = ACCOUNT_OPERATIONS_TOTAL.as_ref() {
        let result = if success { "success" } else { "failure" };
        counter.with_label_values(&[operation, result]).inc();
    }
}
