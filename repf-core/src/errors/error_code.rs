//! The numeric return-code space shared by engines, the dispatcher, and the
//! delay server. Error enums map into it via [`RepfErrorCode`].

/// Sentinel an instance returns to defer to the next instance in the chain.
pub const RULE_ENGINE_CONTINUE: i64 = 5_000_000;

/// Terminal success; the chain stops and the operation proceeds.
pub const OPERATION_SUCCESS: i64 = 0;

/// Configuration-level failure: unknown plugin or instance, duplicate
/// instance name, malformed policy document or delay condition.
pub const SYS_INVALID_INPUT_PARAM: i64 = -130_000;

/// Engine execution failed with no more specific code available.
pub const RULE_ENGINE_ERROR: i64 = -1_828_000;

/// Maps an error to the numeric code surfaced through dispatch.
pub trait RepfErrorCode {
    fn error_code(&self) -> i64;
}
