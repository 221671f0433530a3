use anyhow::{Result, anyhow};
use base64ct::{Base64, Encoding};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{Tracer, TracerProvider},
};
use std::{collections::HashMap, env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

static TRACER_PROVIDER: OnceCell<TracerProvider> = OnceCell::new();

/// `OTEL_EXPORTER_OTLP_HEADERS` is a comma-separated list of `key=value`
/// pairs; entries without a `=` are dropped.
fn parse_headers_env(raw: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    for pair in raw.split(',') {
        if let Some((key, value)) = pair.split_once('=') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    headers
}

/// Turn parsed header pairs into gRPC metadata. Keys ending in `-bin` carry
/// base64-encoded binary values; everything else must be ASCII.
fn headers_to_metadata(headers: &HashMap<String, String>) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();

        if name.ends_with("-bin") {
            let decoded = Base64::decode_vec(value)
                .map_err(|e| anyhow!("metadata value for {name} is not valid base64: {e}"))?;
            let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("metadata key {name} is not a valid binary key: {e}"))?;
            metadata.insert_bin(key, MetadataValue::from_bytes(&decoded));
        } else {
            let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("metadata key {name} is not a valid ASCII key: {e}"))?;
            let parsed = value
                .parse()
                .map_err(|e| anyhow!("metadata value for {name} is not valid ASCII: {e}"))?;
            metadata.insert(key, parsed);
        }
    }

    Ok(metadata)
}

fn normalize_endpoint(endpoint: String) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint;
    }

    // Scheme-less endpoints are assumed to speak TLS.
    format!("https://{}", endpoint.trim_end_matches('/'))
}

/// Host part of an https endpoint, for TLS server-name verification.
fn tls_domain(endpoint: &str) -> Option<&str> {
    endpoint
        .strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .and_then(|authority| authority.split(':').next())
}

fn init_tracer() -> Result<Tracer> {
    // Only gRPC is spoken here; any other requested protocol is ignored.
    if let Ok(protocol) = var("OTEL_EXPORTER_OTLP_PROTOCOL") {
        if protocol != "grpc" {
            debug!(
                "OTEL_EXPORTER_OTLP_PROTOCOL='{}' ignored: only 'grpc' is supported",
                protocol
            );
        }
    }

    let endpoint = normalize_endpoint(
        var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4317".to_string()),
    );

    let headers = var("OTEL_EXPORTER_OTLP_HEADERS")
        .ok()
        .map(|raw| parse_headers_env(&raw))
        .unwrap_or_default();

    let mut exporter_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_timeout(Duration::from_secs(3));

    if let Some(domain) = tls_domain(&endpoint) {
        let tls = ClientTlsConfig::new()
            .domain_name(domain.to_string())
            .with_native_roots();
        exporter_builder = exporter_builder.with_tls_config(tls);
    }

    if !headers.is_empty() {
        exporter_builder = exporter_builder.with_metadata(headers_to_metadata(&headers)?);
    }

    let exporter = exporter_builder.build()?;

    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());

    let trace_provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
        ]))
        .build();

    // Keep a handle around so the binary can flush buffered spans on exit.
    let _ = TRACER_PROVIDER.set(trace_provider.clone());

    global::set_tracer_provider(trace_provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    Ok(trace_provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Initialize logging, plus the OTLP span exporter when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set (gRPC only).
///
/// # Errors
///
/// Returns an error if tracer or subscriber initialization fails
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    // RUST_LOG still wins over the -v default.
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    let otel_layer = if var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        Some(tracing_opentelemetry::layer().with_tracer(init_tracer()?))
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush and drop the tracer provider; a noop when tracing never started.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = provider.shutdown();
        debug!("tracer provider shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_env_empty() {
        let result = parse_headers_env("");
        assert!(result.is_empty());
    }

    #[test]
    fn parse_headers_env_multiple() {
        let result = parse_headers_env("x-team=identity,x-env=staging");
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("x-team"), Some(&"identity".to_string()));
        assert_eq!(result.get("x-env"), Some(&"staging".to_string()));
    }

    #[test]
    fn parse_headers_env_trims_spaces() {
        let result = parse_headers_env("x-team = identity , x-env = staging");
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("x-team"), Some(&"identity".to_string()));
    }

    #[test]
    fn parse_headers_env_skips_malformed_pairs() {
        let result = parse_headers_env("x-team=identity,malformed,x-env=staging");
        assert_eq!(result.len(), 2);
        assert!(!result.contains_key("malformed"));
    }

    #[test]
    fn headers_to_metadata_ascii() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer token123".to_string());

        let result = headers_to_metadata(&headers);
        assert!(result.is_ok());
        if let Ok(metadata) = result {
            assert_eq!(metadata.len(), 1);
        }
    }

    #[test]
    fn headers_to_metadata_binary() {
        let mut headers = HashMap::new();
        // Base64 encoded "otp-service"
        headers.insert("custom-bin".to_string(), "b3RwLXNlcnZpY2U=".to_string());

        let result = headers_to_metadata(&headers);
        assert!(result.is_ok());
        if let Ok(metadata) = result {
            assert_eq!(metadata.len(), 1);
        }
    }

    #[test]
    fn headers_to_metadata_invalid_base64() {
        let mut headers = HashMap::new();
        headers.insert("custom-bin".to_string(), "!!!not-base64!!!".to_string());

        let result = headers_to_metadata(&headers);
        assert!(result.is_err());
    }

    #[test]
    fn normalize_endpoint_keeps_scheme() {
        let result = normalize_endpoint("http://localhost:4317".to_string());
        assert_eq!(result, "http://localhost:4317");
    }

    #[test]
    fn normalize_endpoint_defaults_to_https() {
        let result = normalize_endpoint("collector.ensaluti.dev:4317".to_string());
        assert_eq!(result, "https://collector.ensaluti.dev:4317");
    }

    #[test]
    fn normalize_endpoint_strips_trailing_slash() {
        let result = normalize_endpoint("collector.ensaluti.dev:4317/".to_string());
        assert_eq!(result, "https://collector.ensaluti.dev:4317");
    }

    #[test]
    fn tls_domain_only_for_https() {
        assert_eq!(
            tls_domain("https://collector.ensaluti.dev:4317"),
            Some("collector.ensaluti.dev")
        );
        assert_eq!(tls_domain("http://localhost:4317"), None);
    }

    #[test]
    fn shutdown_tracer_without_provider() {
        // Should not panic when no provider is initialized
        shutdown_tracer();
    }
}
