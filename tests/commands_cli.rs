use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use clap::error::ErrorKind;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

const DEVICES: &str = "Webcam|0x046d|0x082d|3";
const CONTROLS: &str =
    "brightness=128;contrast=32;white_balance_component=2048,1024;absolute_pan_tilt=3600,-7200";

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl uvcc::TerminalClient for FakeTerminalClient {
    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

struct RunOutput {
    outcome: uvcc::DispatchOutcome,
    stdout: String,
    stderr: String,
}

fn working_dir() -> anyhow::Result<PathBuf> {
    let suffix = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let dir = std::env::temp_dir().join(format!("uvcc-cli-{suffix}"));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn fake_transport(failing: Option<&str>) -> anyhow::Result<uvcc::FakeTransport> {
    let builder = uvcc::FakeArgs::builder().devices(DEVICES)?.controls(CONTROLS)?;
    let fake_args = match failing {
        Some(failing) => builder.failing(failing)?.build(),
        None => builder.build(),
    };
    Ok(uvcc::fake_transport(fake_args))
}

async fn run_with_input<const N: usize>(
    transport: &uvcc::FakeTransport,
    argv: [&str; N],
    input: &[u8],
) -> anyhow::Result<RunOutput> {
    let dir = working_dir()?;
    let (runtime, _fake_args) = uvcc::Args::try_parse_from(argv)?.into_runtime_from(&dir)?;
    std::fs::remove_dir_all(dir)?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let outcome = uvcc::run_with_clients(
        &runtime,
        &mut stdout,
        &mut stderr,
        &FakeTerminalClient,
        Arc::new(transport.clone()),
        Box::new(std::io::Cursor::new(input.to_vec())),
    )
    .await?;

    Ok(RunOutput {
        outcome,
        stdout: String::from_utf8(stdout)?,
        stderr: String::from_utf8(stderr)?,
    })
}

async fn run<const N: usize>(
    transport: &uvcc::FakeTransport,
    argv: [&str; N],
) -> anyhow::Result<RunOutput> {
    run_with_input(transport, argv, b"").await
}

#[tokio::test]
async fn devices_command_lists_fake_cameras_without_opening_them() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let output = run(&transport, ["uvcc", "devices"]).await?;

    assert_snapshot!(output.stdout.trim_end(), @r#"
    [
      {
        "name": "Webcam",
        "vendor": 1133,
        "product": 2093,
        "address": 3
      }
    ]
    "#);
    assert_eq!(0, transport.open_count());
    Ok(())
}

#[tokio::test]
async fn controls_command_lists_supported_controls_sorted() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let output = run(&transport, ["uvcc", "controls"]).await?;

    assert_snapshot!(output.stdout.trim_end(), @r#"
    [
      "absolute_pan_tilt",
      "brightness",
      "contrast",
      "white_balance_component"
    ]
    "#);
    assert_eq!(1, transport.close_count());
    Ok(())
}

#[tokio::test]
async fn set_then_get_round_trips_a_two_field_control() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let set = run(
        &transport,
        ["uvcc", "set", "absolute_pan_tilt", "-3600", "0x1c20"],
    )
    .await?;
    let get = run(&transport, ["uvcc", "get", "absolute_pan_tilt"]).await?;

    assert_eq!("", set.stdout);
    assert_snapshot!(get.stdout.trim_end(), @r"
    [
      -3600,
      7200
    ]
    ");
    assert_eq!(
        vec![("absolute_pan_tilt".to_string(), vec![-3600, 7200])],
        transport.writes()
    );
    Ok(())
}

#[tokio::test]
async fn set_rejects_values_wider_than_the_control_field() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let result = run(&transport, ["uvcc", "set", "brightness", "70000"]).await;

    let error = result.err().ok_or_else(|| anyhow::anyhow!("set should fail"))?;
    assert!(format!("{error:#}").ends_with("is outside -32768..=32767"));
    let get = run(&transport, ["uvcc", "get", "brightness"]).await?;
    assert_eq!("128\n", get.stdout);
    assert_eq!(Vec::<(String, Vec<i64>)>::new(), transport.writes());
    Ok(())
}

#[tokio::test]
async fn get_single_field_control_prints_a_bare_number() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let output = run(&transport, ["uvcc", "get", "brightness"]).await?;

    assert_eq!("128\n", output.stdout);
    Ok(())
}

#[tokio::test]
async fn ranges_command_skips_controls_that_fail() -> anyhow::Result<()> {
    let transport = fake_transport(Some("contrast"))?;

    let output = run(&transport, ["uvcc", "ranges"]).await?;

    assert_snapshot!(output.stdout.trim_end(), @r#"
    {
      "absolute_pan_tilt": {
        "min": [
          -2147483648,
          -2147483648
        ],
        "max": [
          2147483647,
          2147483647
        ]
      },
      "brightness": {
        "min": -32768,
        "max": 32767
      },
      "white_balance_component": {
        "min": [
          0,
          0
        ],
        "max": [
          65535,
          65535
        ]
      }
    }
    "#);
    Ok(())
}

#[tokio::test]
async fn range_command_fails_for_unranged_control() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let result = run(&transport, ["uvcc", "range", "power_line_frequency"]).await;

    let error = result.err().ok_or_else(|| anyhow::anyhow!("range should fail"))?;
    assert_eq!(
        "failed to get the range of `power_line_frequency`: could not find a ranged control named `power_line_frequency`",
        format!("{error:#}")
    );
    assert_eq!(1, transport.close_count());
    Ok(())
}

#[tokio::test]
async fn export_then_import_leaves_values_unchanged() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let exported = run(&transport, ["uvcc", "export"]).await?;
    let imported = run_with_input(&transport, ["uvcc", "import"], exported.stdout.as_bytes()).await?;

    assert_snapshot!(exported.stdout.trim_end(), @r#"
    {
      "absolute_pan_tilt": [
        3600,
        -7200
      ],
      "brightness": 128,
      "contrast": 32,
      "white_balance_component": [
        2048,
        1024
      ]
    }
    "#);
    assert_eq!("", imported.stdout);
    let mut writes = transport.writes();
    writes.sort();
    assert_eq!(
        vec![
            ("absolute_pan_tilt".to_string(), vec![3600, -7200]),
            ("brightness".to_string(), vec![128]),
            ("contrast".to_string(), vec![32]),
            ("white_balance_component".to_string(), vec![2048, 1024]),
        ],
        writes
    );
    assert_eq!(
        Some(vec![2048, 1024]),
        transport.current_values("white_balance_component")
    );
    Ok(())
}

#[tokio::test]
async fn import_rejects_non_settable_controls_before_writing() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let result = run_with_input(
        &transport,
        ["uvcc", "import"],
        br#"{"brightness": 10, "analog_lock_status": 1}"#,
    )
    .await;

    let error = result.err().ok_or_else(|| anyhow::anyhow!("import should fail"))?;
    assert!(format!("{error:#}").contains("analog_lock_status"));
    assert_eq!(Vec::<(String, Vec<i64>)>::new(), transport.writes());
    Ok(())
}

#[tokio::test]
async fn unknown_command_is_reported_on_stderr() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let output = run(&transport, ["uvcc", "reset"]).await?;

    assert_eq!(uvcc::DispatchOutcome::UnknownCommand, output.outcome);
    assert_eq!("", output.stdout);
    assert_eq!("unknown command `reset`\n", output.stderr);
    assert_eq!(0, transport.open_count());
    Ok(())
}

#[tokio::test]
async fn unmatched_selector_reports_missing_camera() -> anyhow::Result<()> {
    let transport = fake_transport(None)?;

    let result = run(&transport, ["uvcc", "--vendor", "0x1234", "controls"]).await;

    let error = result.err().ok_or_else(|| anyhow::anyhow!("open should fail"))?;
    assert!(
        error
            .to_string()
            .starts_with("could not find UVC device, is a compatible camera connected?")
    );
    Ok(())
}

#[test]
fn set_requires_a_value() {
    let result = uvcc::Args::try_parse_from(["uvcc", "set", "brightness"]);

    let error = result.expect_err("set without a value should fail parsing");
    assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
}

#[test]
fn fake_fixture_rejects_malformed_records() {
    let result = uvcc::FakeArgs::builder().devices("Webcam|0x046d");

    assert!(matches!(
        result,
        Err(uvcc::FixtureError::InvalidRecordFieldCount)
    ));
}
