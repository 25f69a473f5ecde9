//! Exit code constants for the awflow CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable files, unknown engine)
//! - 2: Validation failure (parse, schema, or semantic diagnostics)
//! - 3: Internal error (an invariant of the generated job graph was violated)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable input, or an unknown engine id.
pub const USER_ERROR: i32 = 1;

/// Validation failure: the workflow document produced one or more diagnostics.
pub const VALIDATION_FAILURE: i32 = 2;

/// Internal error: the compiler refused to emit an invalid pipeline.
pub const INTERNAL_ERROR: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, VALIDATION_FAILURE, INTERNAL_ERROR];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_have_expected_values() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
        assert_eq!(VALIDATION_FAILURE, 2);
        assert_eq!(INTERNAL_ERROR, 3);
    }
}
