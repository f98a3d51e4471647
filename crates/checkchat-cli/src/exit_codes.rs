//! Exit codes of the `checkchat` binary. Part of the public contract.

use checkchat_core::ClientError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_REQUEST_FAILED: i32 = 1; // backend unreachable, non-2xx, bad body, interrupted wait
pub const EXIT_CONFIG_ERROR: i32 = 2; // bad config file or rejected input

/// Map a command error to its exit code. Errors that do not come from the
/// client are treated as configuration errors.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map(ClientError::exit_code)
        .unwrap_or(EXIT_CONFIG_ERROR)
}
