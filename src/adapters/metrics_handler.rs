use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Request metrics
    pub requests_total: CounterVec,

    // Receiver metrics
    pub validations_total: CounterVec,

    // Sender metrics
    pub bodies_synthesized: CounterVec,
    pub dispatches_total: CounterVec,
    pub dispatch_duration: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("hermes_requests_total", "Total number of requests"),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let validations_total = CounterVec::new(
            Opts::new("hermes_validations_total", "Payload validations by outcome"),
            &["route", "outcome"],
        )?;
        registry.register(Box::new(validations_total.clone()))?;

        let bodies_synthesized = CounterVec::new(
            Opts::new("hermes_bodies_synthesized_total", "Total synthesized request bodies"),
            &["route"],
        )?;
        registry.register(Box::new(bodies_synthesized.clone()))?;

        let dispatches_total = CounterVec::new(
            Opts::new("hermes_dispatches_total", "Outbound dispatches by status"),
            &["route", "status"],
        )?;
        registry.register(Box::new(dispatches_total.clone()))?;

        let dispatch_duration = HistogramVec::new(
            HistogramOpts::new("hermes_dispatch_duration_seconds", "Outbound dispatch duration"),
            &["route"],
        )?;
        registry.register(Box::new(dispatch_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            validations_total,
            bodies_synthesized,
            dispatches_total,
            dispatch_duration,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        assert!(MetricsCollector::new().is_ok());
    }

    #[test]
    fn test_metrics_encoding() {
        let collector = MetricsCollector::new().unwrap();

        collector
            .validations_total
            .with_label_values(&["POST /orders", "invalid"])
            .inc();
        collector.bodies_synthesized.with_label_values(&["POST /orders"]).inc();

        let metrics_text = collector.encode().unwrap();
        assert!(metrics_text.contains("hermes_validations_total"));
        assert!(metrics_text.contains("outcome=\"invalid\""));
        assert!(metrics_text.contains("hermes_bodies_synthesized_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let collector = Arc::new(MetricsCollector::new().unwrap());
        let handler = MetricsHandler::new(collector.clone());

        collector
            .dispatches_total
            .with_label_values(&["GET /status", "200"])
            .inc();

        let output = handler.metrics().await;
        assert!(output.contains("hermes_dispatches_total"));
    }
}
