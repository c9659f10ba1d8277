//! Classification of fatal errors into process exit codes.
//!
//! Errors are propagated with [`anyhow`] throughout the crate. Where the category of a failure
//! matters to the caller of the binary, a [`FailureKind`] is attached to the error as context at
//! the point where the failure is first detected. [`exit_code`] recovers it.
use anyhow::Error;

/// The category of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum FailureKind {
    /// Missing file, unreadable configuration or an unknown option value
    #[display("Invalid configuration")]
    Configuration,
    /// Input data does not match the expected schema or references unknown IDs
    #[display("Invalid input data")]
    Schema,
    /// A lookup table has no entry for a requested key
    #[display("Missing lookup table entry")]
    LookupMiss,
    /// Output could not be written
    #[display("Failed to write output")]
    Io,
}

impl FailureKind {
    /// The process exit code corresponding to this kind of failure
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Schema | Self::LookupMiss => 3,
            Self::Io => 4,
        }
    }
}

/// Determine the exit code for an error which aborted the program.
///
/// Errors without an attached [`FailureKind`] are treated as I/O failures if caused by an
/// [`std::io::Error`] and as configuration errors otherwise.
pub fn exit_code(err: &Error) -> i32 {
    if let Some(kind) = err.downcast_ref::<FailureKind>() {
        return kind.exit_code();
    }

    if err.chain().any(|cause| cause.is::<std::io::Error>()) {
        FailureKind::Io.exit_code()
    } else {
        FailureKind::Configuration.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};
    use rstest::rstest;

    #[rstest]
    #[case(FailureKind::Configuration, 2)]
    #[case(FailureKind::Schema, 3)]
    #[case(FailureKind::LookupMiss, 3)]
    #[case(FailureKind::Io, 4)]
    fn test_exit_code_from_context(#[case] kind: FailureKind, #[case] expected: i32) {
        let result: anyhow::Result<()> = Err(anyhow!("root cause"));
        let err = result
            .context(kind)
            .context("Failed to load model.")
            .unwrap_err();
        assert_eq!(exit_code(&err), expected);
    }

    #[test]
    fn test_exit_code_io_cause() {
        let err = Error::new(std::io::Error::other("disk full")).context("Writing output");
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn test_exit_code_unclassified() {
        assert_eq!(exit_code(&anyhow!("something odd")), 2);
    }
}
