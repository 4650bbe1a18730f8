//! Custom assertion macros
//!
//! Assertions over the gateway's `{success, data?, error?}` result shape.

/// Assert that an operation succeeded and return its data
#[macro_export]
macro_rules! assert_success {
    ($result:expr) => {
        match $result {
            result if result.success => result.data.expect("successful result without data"),
            result => panic!("Expected success, got error: {:?}", result.error),
        }
    };
}

/// Assert that an operation failed with the given message
#[macro_export]
macro_rules! assert_failure {
    ($result:expr, $message:expr) => {
        let result = $result;
        assert!(!result.success, "Expected failure, got success");
        assert_eq!(result.error.as_deref(), Some($message));
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}
