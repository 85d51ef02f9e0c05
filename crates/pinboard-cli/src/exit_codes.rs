//! Process exit codes.
//!
//! Library failures map through `PinsError::exit_code`; anything else
//! (bad CLI state, unreadable input files) is a generic failure.

use pinboard_store::PinsError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PinsError>())
        .map_or(EXIT_FAILURE, PinsError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn pins_errors_keep_their_code_through_context() {
        let err: anyhow::Error = Err::<(), _>(PinsError::Unauthorized {
            message: "bad key".to_string(),
        })
        .context("reading pin")
        .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn other_errors_are_generic_failures() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }
}
