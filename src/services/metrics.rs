use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::time::Duration;

/// Owns its own registry so several app instances (tests) never collide on
/// metric registration.
pub struct MetricsService {
    registry: Registry,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
    restorations: IntCounterVec,
    credits: IntCounterVec,
    payments: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            opts!("http_requests_total", "HTTP requests by method and status"),
            &["method", "status"],
        )?;
        let http_duration = HistogramVec::new(
            histogram_opts!("http_request_duration_seconds", "HTTP request latency"),
            &["method"],
        )?;
        let restorations = IntCounterVec::new(
            opts!("restorations_total", "Restoration attempts by outcome"),
            &["outcome"],
        )?;
        let credits = IntCounterVec::new(
            opts!("photo_credits_total", "Photo credits consumed or refunded"),
            &["direction"],
        )?;
        let payments = IntCounterVec::new(
            opts!("payments_total", "Confirmed payments by plan"),
            &["plan"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_duration.clone()))?;
        registry.register(Box::new(restorations.clone()))?;
        registry.register(Box::new(credits.clone()))?;
        registry.register(Box::new(payments.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_duration,
            restorations,
            credits,
            payments,
        })
    }

    pub fn record_request(&self, method: &str, status: u16, duration: Duration) {
        self.http_requests
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.http_duration
            .with_label_values(&[method])
            .observe(duration.as_secs_f64());
    }

    pub fn record_restoration(&self, outcome: &str) {
        self.restorations.with_label_values(&[outcome]).inc();
    }

    pub fn record_credit_consumed(&self) {
        self.credits.with_label_values(&["consumed"]).inc();
    }

    pub fn record_credit_refunded(&self) {
        self.credits.with_label_values(&["refunded"]).inc();
    }

    pub fn record_payment(&self, plan: &str) {
        self.payments.with_label_values(&[plan]).inc();
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
