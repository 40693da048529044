//! Language model call instrumentation.

use tracing::{field, span, Level, Span};

/// Create a span around one language model request.
///
/// `gen_ai.response.length` is recorded by the caller once the reply arrives.
pub fn llm_span(provider: &str, model: &str) -> Span {
    span!(
        Level::INFO,
        "gen_ai",
        otel.name = %format!("chat {}", model),
        otel.kind = "client",
        gen_ai.operation.name = "chat",
        gen_ai.system = provider,
        gen_ai.request.model = model,
        gen_ai.response.length = field::Empty,
    )
}
