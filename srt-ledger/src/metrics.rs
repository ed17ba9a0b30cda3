//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_blocks_total` - Blocks appended since start (genesis included)
//! - `ledger_mints_total` - Committed DEPOSIT entries
//! - `ledger_transfers_total` - Committed TRANSFER entries
//! - `ledger_rejections_total` - Mutations rejected before any block was built
//! - `ledger_save_duration_seconds` - Histogram of write-through latencies
//! - `ledger_block_height` - Index of the chain tip

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry, so several engines (or tests) can
/// coexist in one process.
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Blocks appended
    pub blocks_total: IntCounter,

    /// Committed mints
    pub mints_total: IntCounter,

    /// Committed transfers
    pub transfers_total: IntCounter,

    /// Rejected mutations
    pub rejections_total: IntCounter,

    /// Save duration histogram
    pub save_duration: Histogram,

    /// Chain tip index
    pub block_height: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let blocks_total = IntCounter::new("ledger_blocks_total", "Blocks appended since start")?;
        registry.register(Box::new(blocks_total.clone()))?;

        let mints_total = IntCounter::new("ledger_mints_total", "Committed DEPOSIT entries")?;
        registry.register(Box::new(mints_total.clone()))?;

        let transfers_total =
            IntCounter::new("ledger_transfers_total", "Committed TRANSFER entries")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let rejections_total =
            IntCounter::new("ledger_rejections_total", "Mutations rejected by validation")?;
        registry.register(Box::new(rejections_total.clone()))?;

        let save_duration = Histogram::with_opts(
            HistogramOpts::new("ledger_save_duration_seconds", "Histogram of save latencies")
                .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(save_duration.clone()))?;

        let block_height = IntGauge::new("ledger_block_height", "Index of the chain tip")?;
        registry.register(Box::new(block_height.clone()))?;

        Ok(Self {
            blocks_total,
            mints_total,
            transfers_total,
            rejections_total,
            save_duration,
            block_height,
            registry,
        })
    }

    /// Record an appended block at `index`
    pub fn record_block(&self, index: u64) {
        self.blocks_total.inc();
        self.block_height.set(index as i64);
    }

    /// Record a committed mint
    pub fn record_mint(&self) {
        self.mints_total.inc();
    }

    /// Record a committed transfer
    pub fn record_transfer(&self) {
        self.transfers_total.inc();
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self) {
        self.rejections_total.inc();
    }

    /// Record save duration
    pub fn record_save_duration(&self, duration_seconds: f64) {
        self.save_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.blocks_total.get(), 0);
        assert_eq!(metrics.mints_total.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_mint();
        assert_eq!(a.mints_total.get(), 1);
        assert_eq!(b.mints_total.get(), 0);
    }

    #[test]
    fn test_record_block() {
        let metrics = Metrics::new().unwrap();
        metrics.record_block(0);
        metrics.record_block(1);
        assert_eq!(metrics.blocks_total.get(), 2);
        assert_eq!(metrics.block_height.get(), 1);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transfer();
        metrics.record_save_duration(0.002);

        let text = metrics.render();
        assert!(text.contains("ledger_transfers_total 1"));
        assert!(text.contains("ledger_save_duration_seconds_bucket"));
    }
}
