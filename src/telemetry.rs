use tracing::{subscriber, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

pub struct Telemetry {}

impl Telemetry {
    /// Set up the process-wide tracing subscriber. `sink` decides where the
    /// bunyan-formatted records end up (stdout for the binary, a sink or
    /// stdout for tests depending on `TEST_LOG`).
    pub fn create<Sink>(name: String, filter_level: String, sink: Sink)
    where
        Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_level));
        let formatting_layer = BunyanFormattingLayer::new(name, sink);

        let subscriber = Registry::default()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(formatting_layer);

        // Redirect records emitted through the log facade (actix internals)
        // into the tracing subscriber
        LogTracer::init().expect("Failed to set LogTracer");
        subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
