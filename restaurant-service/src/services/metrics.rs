//! Prometheus metrics for restaurant-service.
//!
//! HTTP metrics come from the `metrics` recorder installed here and fed by
//! `service_core` middleware. Assistant metrics live in a `prometheus`
//! registry and are appended to the same scrape output.

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock};

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static TOOL_SELECTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static TOOL_EXECUTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT: Mutex<()> = Mutex::new(());

/// Initialize metrics collection. Safe to call more than once.
pub fn init_metrics() -> anyhow::Result<()> {
    let _guard = INIT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let registry = Registry::new();

    // Which tool answered each query, and whether the model chose it
    let tool_selections = IntCounterVec::new(
        Opts::new(
            "assistant_tool_selections_total",
            "Tool selections by tool and source (model or fallback)",
        ),
        &["tool", "source"],
    )?;

    let tool_executions = IntCounterVec::new(
        Opts::new(
            "assistant_tool_executions_total",
            "Tool executions against the catalog by tool and status",
        ),
        &["tool", "status"],
    )?;

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "assistant_provider_latency_seconds",
            "Language model API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model", "operation"],
    )?;

    let provider_errors = IntCounterVec::new(
        Opts::new(
            "assistant_provider_errors_total",
            "Language model provider errors",
        ),
        &["provider", "error_type"],
    )?;

    // type: input, output
    let tokens = IntCounterVec::new(
        Opts::new("assistant_tokens_total", "Total tokens processed"),
        &["model", "type"],
    )?;

    registry.register(Box::new(tool_selections.clone()))?;
    registry.register(Box::new(tool_executions.clone()))?;
    registry.register(Box::new(provider_latency.clone()))?;
    registry.register(Box::new(provider_errors.clone()))?;
    registry.register(Box::new(tokens.clone()))?;

    let _ = METRICS_HANDLE.set(handle);
    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = TOOL_SELECTIONS_TOTAL.set(tool_selections);
    let _ = TOOL_EXECUTIONS_TOTAL.set(tool_executions);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = TOKENS_TOTAL.set(tokens);

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
        }
        match String::from_utf8(buffer) {
            Ok(custom) => output.push_str(&custom),
            Err(e) => tracing::error!(error = %e, "Failed to convert metrics to UTF-8"),
        }
    }

    output
}

/// Record which tool handled a query.
pub fn record_tool_selection(tool: &str, fallback: bool) {
    if let Some(counter) = TOOL_SELECTIONS_TOTAL.get() {
        let source = if fallback { "fallback" } else { "model" };
        counter.with_label_values(&[tool, source]).inc();
    }
}

/// Record the outcome of running a tool.
pub fn record_tool_execution(tool: &str, success: bool) {
    if let Some(counter) = TOOL_EXECUTIONS_TOTAL.get() {
        let status = if success { "success" } else { "error" };
        counter.with_label_values(&[tool, status]).inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, model: &str, operation: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model, operation])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}

/// Record token usage.
pub fn record_tokens(model: &str, input_tokens: u32, output_tokens: u32) {
    if let Some(counter) = TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[model, "input"])
            .inc_by(u64::from(input_tokens));
        counter
            .with_label_values(&[model, "output"])
            .inc_by(u64::from(output_tokens));
    }
}
