use crate::build_info;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};
use prometheus_client::registry::Registry;
use tokio::sync::OnceCell;

/// Registers immutable build metadata for `/metrics` scraping.
///
/// We encode this as a labeled gauge with value `1` so the metric is valid for
/// Prometheus text exposition format and still carries stable build labels.
pub fn register_build_info_metric(registry: &mut Registry, prefix: &str) {
    let build_info_metric = Family::<BuildInfoLabels, Gauge>::default();
    build_info_metric
        .get_or_create(&BuildInfoLabels {
            service: "sentiment_worker",
            version: build_info::VERSION,
            commit: build_info::short_commit_hash(),
        })
        .set(1);
    let sub_registry = registry.sub_registry_with_prefix(prefix);
    sub_registry.register(
        "build_info",
        "Build identity labels for this process",
        build_info_metric,
    );
}

/// Label set for immutable build identity exported on the build-info metric.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct BuildInfoLabels {
    service: &'static str,
    version: &'static str,
    commit: &'static str,
}

/// Failure-class label attached to the failed-survey counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureClassLabels {
    pub failure_class: String,
}

#[derive(Clone)]
pub struct PipelineMetrics {
    /// Delivered batches processed in this process lifetime.
    pub batches_total: Counter,
    /// Survey messages processed and persisted.
    pub surveys_processed_total: Counter,
    /// Survey messages that failed, partitioned by failure class.
    pub surveys_failed_total: Family<FailureClassLabels, Counter>,
    /// Size of the most recently delivered batch.
    pub last_batch_size: Gauge,
}

impl PipelineMetrics {
    fn init() -> Self {
        Self {
            batches_total: Counter::default(),
            surveys_processed_total: Counter::default(),
            surveys_failed_total: Family::default(),
            last_batch_size: Gauge::default(),
        }
    }

    pub fn register(registry: &mut Registry, prefix: &str) -> Self {
        let metrics = Self::init();
        let sub_registry = registry.sub_registry_with_prefix(prefix);
        sub_registry.register(
            "batches",
            "Delivered batches processed",
            metrics.batches_total.clone(),
        );
        sub_registry.register(
            "surveys_processed",
            "Survey messages classified and persisted",
            metrics.surveys_processed_total.clone(),
        );
        sub_registry.register(
            "surveys_failed",
            "Survey messages that failed, by failure class",
            metrics.surveys_failed_total.clone(),
        );
        sub_registry.register(
            "last_batch_size",
            "Size of the most recently delivered batch",
            metrics.last_batch_size.clone(),
        );
        metrics
    }
}

pub static PIPELINE_METRICS: OnceCell<PipelineMetrics> = OnceCell::const_new();
