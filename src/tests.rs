use crate::cli::{parse_attribute_id, Cli, Commands, MamCommand};
use crate::device::RewindPreference;
use crate::tape_ops::{MtOperation, SuiteKind};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_cli_parsing() {
    let cli = Cli::try_parse_from(["ltfsadm", "list", "--detailed"]);
    assert!(cli.is_ok());

    if let Ok(cli) = cli {
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::List {
                detailed: true,
                json: false
            }
        ));
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "ltfsadm",
        "status",
        "--verbose",
        "--log-json",
        "--config",
        "/etc/ltfsadm.toml",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert!(cli.log_json);
    assert_eq!(cli.config, Some(PathBuf::from("/etc/ltfsadm.toml")));
}

#[test]
fn test_select_device_args() {
    let cli = Cli::try_parse_from([
        "ltfsadm",
        "select",
        "--drive",
        "1",
        "--non-rewinding",
        "--mode",
        "l",
    ])
    .unwrap();
    match cli.command {
        Commands::Select { target } => {
            assert_eq!(target.drive, Some(1));
            assert_eq!(target.rewind_preference(), RewindPreference::NonRewinding);
            assert_eq!(target.mode.as_deref(), Some("l"));
            assert!(target.device.is_none());
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_device_conflicts_with_selection() {
    assert!(
        Cli::try_parse_from(["ltfsadm", "info", "--device", "/dev/nst0", "--drive", "0"]).is_err()
    );
    assert!(Cli::try_parse_from(["ltfsadm", "select", "--mode", "x"]).is_err());
}

#[test]
fn test_mt_parsing() {
    let cli = Cli::try_parse_from(["ltfsadm", "mt", "--device", "/dev/nst0", "fsf", "3"]).unwrap();
    match cli.command {
        Commands::Mt { target, operation } => {
            assert_eq!(target.device, Some(PathBuf::from("/dev/nst0")));
            assert_eq!(operation, MtOperation::Fsf { count: 3 });
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_mount_parsing() {
    let cli = Cli::try_parse_from([
        "ltfsadm",
        "mount",
        "/mnt/tape",
        "-o",
        "allow_other",
        "-o",
        "uid=1000",
    ])
    .unwrap();
    match cli.command {
        Commands::Mount {
            mount_point,
            options,
            ..
        } => {
            assert_eq!(mount_point, Some(PathBuf::from("/mnt/tape")));
            assert_eq!(options, vec!["allow_other", "uid=1000"]);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_format_parsing() {
    let cli = Cli::try_parse_from([
        "ltfsadm",
        "format",
        "--label",
        "ARCHIVE01",
        "--force",
        "--block-size",
        "524288",
        "--yes",
    ])
    .unwrap();
    match cli.command {
        Commands::Format {
            label,
            force,
            block_size,
            yes,
            ..
        } => {
            assert_eq!(label.as_deref(), Some("ARCHIVE01"));
            assert!(force);
            assert_eq!(block_size, Some(524288));
            assert!(yes);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_diag_parsing() {
    let cli = Cli::try_parse_from(["ltfsadm", "diag", "read-write", "--allow-write"]).unwrap();
    match cli.command {
        Commands::Diag {
            suite,
            allow_write,
            output,
            ..
        } => {
            assert_eq!(suite, SuiteKind::ReadWrite);
            assert!(allow_write);
            assert_eq!(output, None);
        }
        other => panic!("unexpected command: {:?}", other),
    }

    let cli = Cli::try_parse_from(["ltfsadm", "diag", "hardware", "-o", "/tmp/diag.txt"]).unwrap();
    match cli.command {
        Commands::Diag { output, .. } => {
            assert_eq!(output, Some(PathBuf::from("/tmp/diag.txt")));
        }
        other => panic!("unexpected command: {:?}", other),
    }
    assert!(Cli::try_parse_from(["ltfsadm", "diag", "bogus"]).is_err());
}

#[test]
fn test_mam_parsing() {
    let cli = Cli::try_parse_from([
        "ltfsadm", "mam", "write", "--id", "0x0806", "--value", "ABC123L8",
    ])
    .unwrap();
    match cli.command {
        Commands::Mam { action, .. } => assert_eq!(
            action,
            MamCommand::Write {
                id: 0x0806,
                value: "ABC123L8".into(),
                partition: 0
            }
        ),
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_attribute_id_parser() {
    assert_eq!(parse_attribute_id("0x0401"), Ok(0x0401));
    assert_eq!(parse_attribute_id("3"), Ok(3));
    assert!(parse_attribute_id("0xZZ").is_err());
    assert!(parse_attribute_id("70000").is_err());
}
