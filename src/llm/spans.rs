/// Structured tracing spans for the conversation router.
///
/// Spans follow the hierarchy:
///
/// ```text
/// wingman.turn
///   ├─> wingman.model.call
///   └─> wingman.tool.dispatch
///        └─> wingman.context.switch
/// ```
// Span names (hierarchical, dot-separated)
/// Root span for one transcript, from instant matching to playback.
pub const SPAN_TURN: &str = "wingman.turn";

/// Span for a single chat-completion request.
pub const SPAN_MODEL_CALL: &str = "wingman.model.call";

/// Span for one model-issued function call.
pub const SPAN_TOOL_DISPATCH: &str = "wingman.tool.dispatch";

/// Span for a persona context switch.
pub const SPAN_CONTEXT_SWITCH: &str = "wingman.context.switch";

// Field keys for span attributes
/// Turn identifier (UUID v4).
pub const FIELD_TURN_ID: &str = "turn_id";

/// Transport name field (e.g., "openai").
pub const FIELD_PROVIDER: &str = "provider";

/// Model identifier field.
pub const FIELD_MODEL: &str = "model";

/// Active persona context field.
pub const FIELD_PERSONA: &str = "persona";

/// Function name of a tool call.
pub const FIELD_FUNCTION: &str = "function";

/// Tool call correlation ID.
pub const FIELD_CALL_ID: &str = "call_id";
