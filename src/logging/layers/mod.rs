use tracing::Subscriber;
use tracing_subscriber::layer::Layer;

pub mod console;
pub mod file;
pub mod opentelemetry;

/// Boxed layer type; every sink is boxed against the base registry.
pub type BoxLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Stand-in for a disabled sink.
pub struct NoopLayer;

impl<S> Layer<S> for NoopLayer where S: Subscriber {}

pub fn noop_layer<S>() -> BoxLayer<S>
where
    S: Subscriber + 'static,
{
    Box::new(NoopLayer)
}

/// Unwrap an optional sink, substituting a no-op when absent.
pub fn or_noop<S>(layer: Option<BoxLayer<S>>) -> BoxLayer<S>
where
    S: Subscriber + 'static,
{
    layer.unwrap_or_else(noop_layer)
}
