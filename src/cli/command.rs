use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand};

use crate::cli::config::{ConfigFile, load_config};
use crate::devices::SelectorMismatchPolicy;
use crate::handlers::CommandName;
use crate::error::{ConfigError, FixtureError};
use crate::hw::{
    ControlFixture, DeviceFixture, DeviceSelector, FailingControls, FakeBackendConfig,
};
use crate::runtime::RuntimeConfiguration;
use crate::utils::parse_int;

/// Command-line options for the UVC configurator.
#[derive(Debug, Parser)]
#[command(
    name = "uvcc",
    version,
    about = "Get, set, export and import USB Video Class (UVC) camera controls."
)]
pub struct Args {
    /// Vendor id of the camera (hex `0x46d` or decimal, 0 = any).
    #[arg(long, global = true, env = "UVCC_VENDOR", value_parser = parse_int::<u16>)]
    vendor: Option<u16>,
    /// Product id of the camera (hex or decimal, 0 = any).
    #[arg(long, global = true, env = "UVCC_PRODUCT", value_parser = parse_int::<u16>)]
    product: Option<u16>,
    /// USB device address of the camera (0 = any).
    #[arg(long, global = true, env = "UVCC_ADDRESS", value_parser = parse_int::<u8>)]
    address: Option<u8>,
    /// Log diagnostics, including skipped controls, to stderr.
    #[arg(
        long,
        global = true,
        env = "UVCC_VERBOSE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    verbose: Option<bool>,
    /// Fail when the opened camera does not match every selector field.
    #[arg(
        long,
        global = true,
        env = "UVCC_STRICT_SELECTOR",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    strict_selector: Option<bool>,
    /// JSON config file; defaults to the nearest `.uvccrc` / `.uvccrc.json`.
    #[arg(long, global = true, env = "UVCC_CONFIG")]
    config: Option<PathBuf>,
    /// Uses the fake UVC transport with fixture-driven devices and controls.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake devices in the form `name|vendor|product|address;...`.
    #[arg(long, global = true, requires = "fake", required_if_eq("fake", "true"))]
    fake_devices: Option<DeviceFixture>,
    /// Fake supported controls and values in the form `name=value[,value];...`.
    #[arg(long, global = true, requires = "fake")]
    fake_controls: Option<ControlFixture>,
    /// Comma-separated fake controls whose transfers stall.
    #[arg(long, global = true, requires = "fake")]
    fake_failing: Option<FailingControls>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use uvcc::{Args, Command};
    ///
    /// let args = Args::new(Command::Get { control: "brightness".to_string() });
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            vendor: None,
            product: None,
            address: None,
            verbose: None,
            strict_selector: None,
            config: None,
            fake: false,
            fake_devices: None,
            fake_controls: None,
            fake_failing: None,
            command,
        }
    }

    /// Selects a device by vendor, product and address.
    #[must_use]
    pub fn with_selector(mut self, selector: DeviceSelector) -> Self {
        self.vendor = selector.vendor();
        self.product = selector.product();
        self.address = selector.address();
        self
    }

    /// Enables fake transport mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            devices,
            controls,
            failing,
            open_delay: _,
        } = fake;

        self.fake = true;
        self.fake_devices = Some(devices);
        self.fake_controls = controls;
        self.fake_failing = failing;
        self
    }

    /// Resolves the runtime configuration against the config file found from
    /// the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable, the config
    /// file cannot be read or parsed, or fake mode lacks a device fixture.
    pub fn into_runtime_and_fake_args(
        self,
    ) -> anyhow::Result<(RuntimeConfiguration, Option<FakeArgs>)> {
        let working_dir = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
        let config = load_config(self.config.as_deref(), &working_dir)?;
        Ok(self.resolve(config)?)
    }

    /// Resolves the runtime configuration using the config file located from
    /// `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or fake
    /// mode lacks a device fixture.
    pub fn into_runtime_from(
        self,
        working_dir: &Path,
    ) -> Result<(RuntimeConfiguration, Option<FakeArgs>), ConfigError> {
        let config = match ConfigFile::locate(self.config.as_deref(), working_dir, None) {
            Some(path) => ConfigFile::load(&path)?,
            None => ConfigFile::default(),
        };
        self.resolve(config)
    }

    fn resolve(
        self,
        config: ConfigFile,
    ) -> Result<(RuntimeConfiguration, Option<FakeArgs>), ConfigError> {
        let Args {
            vendor,
            product,
            address,
            verbose,
            strict_selector,
            config: _,
            fake,
            fake_devices,
            fake_controls,
            fake_failing,
            command,
        } = self;

        let selector = DeviceSelector::from_raw(
            vendor.or(config.vendor).unwrap_or_default(),
            product.or(config.product).unwrap_or_default(),
            address.or(config.address).unwrap_or_default(),
        );
        let mismatch_policy = if strict_selector.or(config.strict_selector).unwrap_or(false) {
            SelectorMismatchPolicy::Reject
        } else {
            SelectorMismatchPolicy::Warn
        };
        let (name, control, values) = command.into_parts();
        let runtime = RuntimeConfiguration::builder()
            .command(name)
            .maybe_control(control)
            .values(values)
            .selector(selector)
            .verbose(verbose.or(config.verbose).unwrap_or(false))
            .mismatch_policy(mismatch_policy)
            .build();

        let fake_args = if fake {
            let Some(devices) = fake_devices else {
                return Err(ConfigError::MissingFakeDeviceFixture);
            };
            Some(FakeArgs {
                devices,
                controls: fake_controls,
                failing: fake_failing,
                open_delay: Duration::ZERO,
            })
        } else {
            None
        };

        Ok((runtime, fake_args))
    }
}

/// Fake transport arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    devices: DeviceFixture,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    controls: Option<ControlFixture>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    failing: Option<FailingControls>,
    #[builder(default)]
    open_delay: Duration,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> FakeBackendConfig {
        let Self {
            devices,
            controls,
            failing,
            open_delay,
        } = self;

        FakeBackendConfig::builder()
            .devices(devices)
            .maybe_controls(controls)
            .maybe_failing(failing)
            .open_delay(open_delay)
            .build()
    }
}

/// Supported commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current value of a control.
    Get { control: String },
    /// Set a control to one value, or two for two-field controls.
    Set {
        control: String,
        #[arg(allow_negative_numbers = true, value_parser = parse_int::<i64>)]
        value1: i64,
        #[arg(allow_negative_numbers = true, value_parser = parse_int::<i64>)]
        value2: Option<i64>,
    },
    /// Print the minimum and maximum of a control.
    Range { control: String },
    /// Print the ranges of every ranged control.
    Ranges,
    /// List the controls the camera supports.
    Controls,
    /// List attached UVC cameras.
    Devices,
    /// Print every settable control value as JSON.
    Export,
    /// Read a JSON object of control values from stdin and apply it.
    Import,
    /// Anything else is reported as an unknown command.
    #[command(external_subcommand)]
    External(Vec<String>),
}

impl Command {
    fn into_parts(self) -> (String, Option<String>, Vec<i64>) {
        match self {
            Self::Get { control } => (CommandName::Get.to_string(), Some(control), Vec::new()),
            Self::Set {
                control,
                value1,
                value2,
            } => (
                CommandName::Set.to_string(),
                Some(control),
                std::iter::once(value1).chain(value2).collect(),
            ),
            Self::Range { control } => (CommandName::Range.to_string(), Some(control), Vec::new()),
            Self::Ranges => (CommandName::Ranges.to_string(), None, Vec::new()),
            Self::Controls => (CommandName::Controls.to_string(), None, Vec::new()),
            Self::Devices => (CommandName::Devices.to_string(), None, Vec::new()),
            Self::Export => (CommandName::Export.to_string(), None, Vec::new()),
            Self::Import => (CommandName::Import.to_string(), None, Vec::new()),
            Self::External(arguments) => (
                arguments.into_iter().next().unwrap_or_default(),
                None,
                Vec::new(),
            ),
        }
    }
}
