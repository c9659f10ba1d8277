//! Integration tests for the `validate` and `validate-fixed` commands.
use dcsim::cli::{handle_validate_command, handle_validate_fixed_command};
use dcsim::log::is_logger_initialised;
use dcsim::model::{FixedRunSection, MobileRunSection};
use dcsim::settings::Settings;
use std::path::Path;

mod common;
use common::{get_model_dir, quiet_logs};

/// An integration test for the validate commands.
///
/// We also check that the logger is initialised after the first is run.
#[test]
fn test_handle_validate_commands() {
    quiet_logs();

    assert!(!is_logger_initialised());

    handle_validate_command(
        &get_model_dir("mobile"),
        &MobileRunSection::default(),
        Some(Settings::default()),
    )
    .unwrap();

    assert!(is_logger_initialised());

    handle_validate_fixed_command(
        &get_model_dir("fixed"),
        &FixedRunSection::default(),
        Some(Settings::default()),
    )
    .unwrap();

    // The wrong engine for the model fails
    assert!(
        handle_validate_command(
            &get_model_dir("fixed"),
            &MobileRunSection::default(),
            Some(Settings::default())
        )
        .is_err()
    );
    assert!(
        handle_validate_fixed_command(
            Path::new("no_such_model"),
            &FixedRunSection::default(),
            Some(Settings::default())
        )
        .is_err()
    );
}
