use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::time::sleep;

use super::model::{ControlFields, DeviceIdentity, DeviceSelector, DiscoveredDevice, FieldRange};
use super::registry::ControlRegistry;
use super::transport::{DeviceConnection, UvcTransport};
use crate::error::{FixtureError, TransportError};
use crate::utils::{FromRadix, parse_int};

/// Built-in webcam profile: `(control, current, min, max)`.
const DEFAULT_CONTROLS: &[(&str, &[i64], &[i64], &[i64])] = &[
    ("auto_exposure_mode", &[8], &[1], &[8]),
    ("auto_exposure_priority", &[0], &[0], &[1]),
    ("absolute_exposure_time", &[250], &[3], &[2047]),
    ("absolute_focus", &[0], &[0], &[250]),
    ("absolute_zoom", &[100], &[100], &[500]),
    ("absolute_pan_tilt", &[0, 0], &[-36_000, -36_000], &[36_000, 36_000]),
    ("auto_focus", &[1], &[0], &[1]),
    ("brightness", &[128], &[0], &[255]),
    ("contrast", &[128], &[0], &[255]),
    ("saturation", &[128], &[0], &[255]),
    ("sharpness", &[128], &[0], &[255]),
    ("white_balance_temperature", &[4000], &[2000], &[6500]),
    ("white_balance_component", &[2048, 1024], &[0, 0], &[4095, 4095]),
    ("backlight_compensation", &[0], &[0], &[1]),
    ("gain", &[0], &[0], &[255]),
    ("power_line_frequency", &[2], &[0], &[2]),
    ("auto_white_balance_temperature", &[1], &[0], &[1]),
];

/// Parsed fake device discovery records.
#[derive(Debug, Clone, derive_more::Into)]
pub struct DeviceFixture {
    devices: Vec<DiscoveredDevice>,
}

impl FromStr for DeviceFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let devices = parse_device_fixture(value)?;
        Ok(Self { devices })
    }
}

/// Parsed fake control values, in advertised order.
#[derive(Debug, Clone, derive_more::Into)]
pub struct ControlFixture {
    controls: Vec<(String, Vec<i64>)>,
}

impl FromStr for ControlFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let controls = parse_control_fixture(value)?;
        Ok(Self { controls })
    }
}

/// Control names whose simulated transfers stall.
#[derive(Debug, Clone, derive_more::Into)]
pub struct FailingControls {
    names: Vec<String>,
}

impl FromStr for FailingControls {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let names = value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { names })
    }
}

/// Settings for constructing a fake transport.
#[derive(Debug, Builder)]
pub(crate) struct FakeBackendConfig {
    devices: DeviceFixture,
    controls: Option<ControlFixture>,
    failing: Option<FailingControls>,
    #[builder(default)]
    open_delay: Duration,
}

#[derive(Debug, Clone)]
struct FakeControl {
    current: Vec<i64>,
    min: Vec<i64>,
    max: Vec<i64>,
}

#[derive(Debug)]
struct FakeState {
    registry: &'static ControlRegistry,
    supported: Vec<String>,
    controls: Mutex<HashMap<String, FakeControl>>,
    failing: HashSet<String>,
    writes: Mutex<Vec<(String, Vec<i64>)>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Fixture-driven transport used in tests and `--fake` runs.
///
/// Clones share device state, so a clone kept by a test observes every write
/// and close performed through the transport handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct FakeTransport {
    devices: Vec<DiscoveredDevice>,
    open_delay: Duration,
    state: Arc<FakeState>,
}

impl FakeTransport {
    pub(crate) fn new(config: FakeBackendConfig) -> Self {
        let registry = ControlRegistry::standard();
        let entries: Vec<(String, FakeControl)> = match config.controls {
            Some(fixture) => {
                let controls: Vec<(String, Vec<i64>)> = fixture.into();
                controls
                    .into_iter()
                    .map(|(name, current)| {
                        let control = fixture_control(registry, &name, current);
                        (name, control)
                    })
                    .collect()
            }
            None => DEFAULT_CONTROLS
                .iter()
                .map(|(name, current, min, max)| {
                    (
                        (*name).to_string(),
                        FakeControl {
                            current: current.to_vec(),
                            min: min.to_vec(),
                            max: max.to_vec(),
                        },
                    )
                })
                .collect(),
        };
        let failing: Vec<String> = config.failing.map(Into::into).unwrap_or_default();

        Self {
            devices: config.devices.into(),
            open_delay: config.open_delay,
            state: Arc::new(FakeState {
                registry,
                supported: entries.iter().map(|(name, _control)| name.clone()).collect(),
                controls: Mutex::new(entries.into_iter().collect()),
                failing: failing.into_iter().collect(),
                writes: Mutex::new(Vec::new()),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns every successful write, in the order applied.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, Vec<i64>)> {
        self.state
            .writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Returns the current simulated values of a control.
    #[must_use]
    pub fn current_values(&self, name: &str) -> Option<Vec<i64>> {
        self.state
            .controls
            .lock()
            .ok()?
            .get(name)
            .map(|control| control.current.clone())
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls received so far.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UvcTransport for FakeTransport {
    async fn discover(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        Ok(self.devices.clone())
    }

    async fn open(
        &self,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn DeviceConnection>, TransportError> {
        if !self.open_delay.is_zero() {
            sleep(self.open_delay).await;
        }

        let device = self
            .devices
            .iter()
            .find(|device| selector.matches(device.identity()))
            .ok_or(TransportError::NoMatchingDevice)?;
        self.state.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeConnection {
            identity: *device.identity(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeConnection {
    identity: DeviceIdentity,
    state: Arc<FakeState>,
}

impl FakeConnection {
    fn control(&self, name: &str) -> Result<FakeControl, TransportError> {
        if self.state.failing.contains(name) {
            return Err(TransportError::SimulatedStall {
                name: name.to_string(),
            });
        }
        self.state
            .controls
            .lock()
            .map_err(|_poisoned| TransportError::Closed)?
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::UnsupportedControl {
                name: name.to_string(),
            })
    }

    fn fields(&self, name: &str, values: &[i64]) -> Result<ControlFields, TransportError> {
        let descriptor =
            self.state
                .registry
                .get(name)
                .ok_or_else(|| TransportError::UnknownControl {
                    name: name.to_string(),
                })?;
        Ok(ControlFields::new(
            descriptor
                .fields()
                .iter()
                .map(|field| field.name())
                .zip(values.iter().copied())
                .collect(),
        ))
    }
}

#[async_trait]
impl DeviceConnection for FakeConnection {
    fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    fn supported_controls(&self) -> &[String] {
        &self.state.supported
    }

    async fn get(&self, name: &str) -> Result<ControlFields, TransportError> {
        let control = self.control(name)?;
        self.fields(name, &control.current)
    }

    async fn range(&self, name: &str) -> Result<FieldRange, TransportError> {
        let control = self.control(name)?;
        Ok(FieldRange::new(
            self.fields(name, &control.min)?,
            self.fields(name, &control.max)?,
        ))
    }

    async fn set(&self, name: &str, values: &[i64]) -> Result<(), TransportError> {
        self.control(name)?;
        self.state
            .registry
            .get(name)
            .ok_or_else(|| TransportError::UnknownControl {
                name: name.to_string(),
            })?
            .validate(values)?;

        if let Some(control) = self
            .state
            .controls
            .lock()
            .map_err(|_poisoned| TransportError::Closed)?
            .get_mut(name)
        {
            control.current = values.to_vec();
        }
        self.state
            .writes
            .lock()
            .map_err(|_poisoned| TransportError::Closed)?
            .push((name.to_string(), values.to_vec()));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn fixture_control(registry: &ControlRegistry, name: &str, current: Vec<i64>) -> FakeControl {
    let (min, max) = registry.get(name).map_or_else(
        || (vec![i64::MIN; current.len()], vec![i64::MAX; current.len()]),
        |descriptor| {
            (
                descriptor.fields().iter().map(|field| field.min_value()).collect(),
                descriptor.fields().iter().map(|field| field.max_value()).collect(),
            )
        },
    );
    FakeControl { current, min, max }
}

fn parse_device_fixture(raw_fixture: &str) -> Result<Vec<DiscoveredDevice>, FixtureError> {
    if raw_fixture.trim().is_empty() {
        return Err(FixtureError::EmptyFixture);
    }

    raw_fixture
        .split(';')
        .map(parse_device_record)
        .collect::<Result<Vec<_>, _>>()
}

fn parse_device_record(raw_record: &str) -> Result<DiscoveredDevice, FixtureError> {
    let fields: Vec<&str> = raw_record.split('|').map(str::trim).collect();
    let [name, vendor, product, address] = fields.as_slice() else {
        return Err(FixtureError::InvalidRecordFieldCount);
    };
    if [name, vendor, product, address]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(FixtureError::EmptyRecordField);
    }

    let identity = DeviceIdentity::new(
        parse_fixture_number(vendor)?,
        parse_fixture_number(product)?,
        parse_fixture_number(address)?,
    );
    Ok(DiscoveredDevice::new(*name, identity))
}

fn parse_control_fixture(raw_fixture: &str) -> Result<Vec<(String, Vec<i64>)>, FixtureError> {
    raw_fixture
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let Some((name, values)) = entry.split_once('=') else {
                return Err(FixtureError::InvalidControlEntry {
                    entry: entry.to_string(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(FixtureError::InvalidControlEntry {
                    entry: entry.to_string(),
                });
            }
            let values = values
                .split(',')
                .map(|value| parse_fixture_number(value.trim()))
                .collect::<Result<Vec<i64>, _>>()?;
            Ok((name.to_string(), values))
        })
        .collect()
}

fn parse_fixture_number<T>(value: &str) -> Result<T, FixtureError>
where
    T: FromRadix,
{
    parse_int(value).map_err(|source| FixtureError::InvalidNumber {
        value: value.to_string(),
        source,
    })
}
