//! Prometheus metrics HTTP server.
//!
//! Exposes cluster statistics in Prometheus text format via HTTP endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::stats::ClusterStats;

/// Start the Prometheus metrics HTTP server.
///
/// Runs in the background and serves metrics at `/metrics`.
/// Returns an error if the server fails to bind to the port.
pub async fn start_metrics_server(
    port: u16,
    stats: Arc<ClusterStats>,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(stats);

    let listener = TcpListener::bind(addr).await?;
    info!("Prometheus metrics server listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(stats): State<Arc<ClusterStats>>) -> impl IntoResponse {
    let output = format_prometheus_metrics(&stats);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

/// Format statistics as Prometheus text format.
fn format_prometheus_metrics(stats: &ClusterStats) -> String {
    let summary = stats.summary();
    let mut output = String::with_capacity(4096);

    // Uptime
    output.push_str("# HELP dxc_uptime_seconds Time since the client started\n");
    output.push_str("# TYPE dxc_uptime_seconds gauge\n");
    output.push_str(&format!("dxc_uptime_seconds {:.3}\n", summary.elapsed_secs));

    // Feed counters
    output.push_str("# HELP dxc_spots_parsed_total Feed lines parsed into spots\n");
    output.push_str("# TYPE dxc_spots_parsed_total counter\n");
    output.push_str(&format!("dxc_spots_parsed_total {}\n", summary.spots_parsed));

    output.push_str("# HELP dxc_parse_failures_total Spot-shaped lines that failed to parse\n");
    output.push_str("# TYPE dxc_parse_failures_total counter\n");
    output.push_str(&format!(
        "dxc_parse_failures_total {}\n",
        summary.parse_failures
    ));

    output.push_str("# HELP dxc_non_spot_lines_total Feed lines that were not spots\n");
    output.push_str("# TYPE dxc_non_spot_lines_total counter\n");
    output.push_str(&format!(
        "dxc_non_spot_lines_total {}\n",
        summary.non_spot_lines
    ));

    output.push_str("# HELP dxc_bytes_processed_total Raw feed bytes processed\n");
    output.push_str("# TYPE dxc_bytes_processed_total counter\n");
    output.push_str(&format!(
        "dxc_bytes_processed_total {}\n",
        summary.bytes_processed
    ));

    // Submission outcomes
    output.push_str("# HELP dxc_submissions_total Spot submissions by outcome\n");
    output.push_str("# TYPE dxc_submissions_total counter\n");
    output.push_str(&format!(
        "dxc_submissions_total{{outcome=\"accepted\"}} {}\n",
        summary.submissions_accepted
    ));
    output.push_str(&format!(
        "dxc_submissions_total{{outcome=\"rejected\"}} {}\n",
        summary.submissions_rejected
    ));

    output.push_str("# HELP dxc_submission_rejections_total Rejected submissions by error kind\n");
    output.push_str("# TYPE dxc_submission_rejections_total counter\n");
    for (kind, count) in &summary.rejections_by_kind {
        output.push_str(&format!(
            "dxc_submission_rejections_total{{kind=\"{}\"}} {}\n",
            kind, count
        ));
    }

    // Submission latency percentiles
    if let Some(ref latency) = summary.submit_latency_ms {
        output.push_str("# HELP dxc_submit_latency_ms Submission round-trip latency\n");
        output.push_str("# TYPE dxc_submit_latency_ms summary\n");
        output.push_str(&format!(
            "dxc_submit_latency_ms{{quantile=\"0.5\"}} {}\n",
            latency.p50
        ));
        output.push_str(&format!(
            "dxc_submit_latency_ms{{quantile=\"0.9\"}} {}\n",
            latency.p90
        ));
        output.push_str(&format!(
            "dxc_submit_latency_ms{{quantile=\"0.99\"}} {}\n",
            latency.p99
        ));
    }

    // Spots by band
    output.push_str("# HELP dxc_spots_by_band Parsed spots by amateur band\n");
    output.push_str("# TYPE dxc_spots_by_band counter\n");
    for (band, count) in &summary.spots_by_band {
        output.push_str(&format!(
            "dxc_spots_by_band{{band=\"{}\"}} {}\n",
            band, count
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmitError;
    use crate::spot::DxSpot;
    use crate::submit::SubmissionResult;
    use std::time::Duration;

    #[test]
    fn test_prometheus_format() {
        let stats = ClusterStats::new();
        stats.record_spot(&DxSpot {
            spotter_callsign: "SP3OCC".to_string(),
            frequency: 3702.0,
            dx_callsign: "SP100IARU".to_string(),
            comment: "SSB".to_string(),
            dx_locator: "28".to_string(),
            time: "1442Z".to_string(),
            spotter_locator: "JO92".to_string(),
        });
        stats.record_submission(&SubmissionResult::Success, Duration::from_millis(300));
        stats.record_submission(
            &SubmissionResult::Failure(SubmitError::InvalidFrequency),
            Duration::from_millis(200),
        );

        let output = format_prometheus_metrics(&stats);

        assert!(output.contains("dxc_spots_parsed_total 1"));
        assert!(output.contains("dxc_submissions_total{outcome=\"accepted\"} 1"));
        assert!(output.contains("dxc_submissions_total{outcome=\"rejected\"} 1"));
        assert!(output.contains("dxc_submission_rejections_total{kind=\"InvalidFrequency\"} 1"));
        assert!(output.contains("dxc_spots_by_band{band=\"80m\"} 1"));
        assert!(output.contains("dxc_submit_latency_ms{quantile=\"0.5\"}"));
    }

    #[test]
    fn test_empty_stats_still_render() {
        let stats = ClusterStats::new();
        let output = format_prometheus_metrics(&stats);
        assert!(output.contains("dxc_uptime_seconds"));
        assert!(output.contains("dxc_spots_parsed_total 0"));
    }
}
