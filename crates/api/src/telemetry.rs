use indexmap::IndexMap;

/// Telemetry collaborator: receives one event per successful upstream
/// feature call.
///
/// The default sink forwards events to [tracing]; deployments with a
/// dedicated analytics pipeline implement this trait and hand the sink to
/// [ApiClient](crate::ApiClient).
pub trait Telemetry: Send + Sync {
    /// Records a named event with string attributes.
    fn record_event(&self, name: &str, attributes: &IndexMap<String, String>);
}

/// Telemetry sink that forwards events to [tracing] at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record_event(&self, name: &str, attributes: &IndexMap<String, String>) {
        tracing::info!(target: "ngd_api::telemetry", event = name, attributes = ?attributes);
    }
}
