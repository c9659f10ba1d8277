//! Integration tests for the `example run` command.
use dcsim::cli::RunOpts;
use dcsim::cli::example::{example_names, handle_example_run_command};
use dcsim::settings::Settings;
use tempfile::tempdir;

mod common;
use common::{csv_file_names, quiet_logs};

/// Every bundled example runs with the engine matching its files
#[test]
fn test_handle_example_run_command() {
    quiet_logs();

    for name in example_names() {
        let tempdir = tempdir().unwrap();
        let opts = RunOpts {
            output_dir: Some(tempdir.path().to_path_buf()),
            overwrite: true,
            debug_model: false,
        };
        handle_example_run_command(name, &opts, Some(Settings::default())).unwrap();

        let expected_prefix = if name == "fixed" { "fixed_" } else { "metrics_" };
        assert!(
            csv_file_names(tempdir.path())
                .iter()
                .any(|file| file.starts_with(expected_prefix)),
            "No outputs written for example {name}"
        );
    }
}
