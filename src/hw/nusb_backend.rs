use std::sync::Mutex;

use async_trait::async_trait;
use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::{Device, DeviceInfo, Interface};
use tracing::{debug, instrument};

use super::model::{ControlFields, DeviceIdentity, DeviceSelector, DiscoveredDevice, FieldRange};
use super::registry::{ControlDescriptor, ControlRegistry, ControlUnit, RequestCode};
use super::transport::{DeviceConnection, UvcTransport};
use crate::error::TransportError;

const VIDEO_CLASS: u8 = 0x0E;
const VIDEO_CONTROL_SUBCLASS: u8 = 0x01;
const CS_INTERFACE: u8 = 0x24;
const VC_INPUT_TERMINAL: u8 = 0x02;
const VC_PROCESSING_UNIT: u8 = 0x05;
const ITT_CAMERA: u16 = 0x0201;

/// UVC transport over the host USB stack.
#[derive(Debug)]
pub(crate) struct NusbTransport {
    registry: &'static ControlRegistry,
}

impl NusbTransport {
    pub(crate) fn new(registry: &'static ControlRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl UvcTransport for NusbTransport {
    #[instrument(skip(self), level = "debug")]
    async fn discover(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let devices = nusb::list_devices()?
            .filter(|info| video_control_interface(info).is_some())
            .map(|info| DiscoveredDevice::new(device_name(&info), identity_of(&info)))
            .collect();
        Ok(devices)
    }

    #[instrument(skip(self), level = "debug", fields(%selector))]
    async fn open(
        &self,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn DeviceConnection>, TransportError> {
        let info = nusb::list_devices()?
            .find(|info| {
                video_control_interface(info).is_some() && selector.matches(&identity_of(info))
            })
            .ok_or(TransportError::NoMatchingDevice)?;
        let interface_number =
            video_control_interface(&info).ok_or(TransportError::MissingVideoControlInterface)?;

        let device = info.open()?;
        let units = read_video_control_units(&device, interface_number)?;
        let interface = device.claim_interface(interface_number)?;
        let supported = units.supported_controls(self.registry);
        debug!(
            identity = %identity_of(&info),
            interface_number,
            supported_controls = supported.len(),
            "opened UVC video control interface"
        );

        Ok(Box::new(NusbConnection {
            identity: identity_of(&info),
            registry: self.registry,
            interface_number,
            units,
            supported,
            handle: Mutex::new(Some(OpenHandle {
                _device: device,
                interface,
            })),
        }))
    }
}

struct OpenHandle {
    _device: Device,
    interface: Interface,
}

struct NusbConnection {
    identity: DeviceIdentity,
    registry: &'static ControlRegistry,
    interface_number: u8,
    units: VideoControlUnits,
    supported: Vec<String>,
    handle: Mutex<Option<OpenHandle>>,
}

impl NusbConnection {
    fn interface(&self) -> Result<Interface, TransportError> {
        let guard = self
            .handle
            .lock()
            .map_err(|_poisoned| TransportError::Closed)?;
        guard
            .as_ref()
            .map(|handle| handle.interface.clone())
            .ok_or(TransportError::Closed)
    }

    fn resolve(&self, name: &str) -> Result<(&'static ControlDescriptor, u8), TransportError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| TransportError::UnknownControl {
                name: name.to_string(),
            })?;
        let unit_id = self
            .units
            .unit_id(descriptor.unit())
            .filter(|_id| self.supported.iter().any(|supported| supported == name))
            .ok_or_else(|| TransportError::UnsupportedControl {
                name: name.to_string(),
            })?;
        Ok((descriptor, unit_id))
    }

    fn index(&self, unit_id: u8) -> u16 {
        (u16::from(unit_id) << 8) | u16::from(self.interface_number)
    }

    async fn read(
        &self,
        request: RequestCode,
        descriptor: &'static ControlDescriptor,
        unit_id: u8,
    ) -> Result<ControlFields, TransportError> {
        let expected = descriptor.payload_len();
        let payload = self
            .interface()?
            .control_in(ControlIn {
                control_type: ControlType::Class,
                recipient: Recipient::Interface,
                request: request.code(),
                value: u16::from(descriptor.selector()) << 8,
                index: self.index(unit_id),
                length: u16::try_from(expected).unwrap_or(u16::MAX),
            })
            .await
            .into_result()?;

        descriptor
            .decode(&payload)
            .map(ControlFields::new)
            .ok_or_else(|| TransportError::ShortResponse {
                name: descriptor.name().to_string(),
                expected,
                actual: payload.len(),
            })
    }
}

#[async_trait]
impl DeviceConnection for NusbConnection {
    fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    fn supported_controls(&self) -> &[String] {
        &self.supported
    }

    async fn get(&self, name: &str) -> Result<ControlFields, TransportError> {
        let (descriptor, unit_id) = self.resolve(name)?;
        self.read(RequestCode::GetCur, descriptor, unit_id).await
    }

    async fn range(&self, name: &str) -> Result<FieldRange, TransportError> {
        let (descriptor, unit_id) = self.resolve(name)?;
        let min = self.read(RequestCode::GetMin, descriptor, unit_id).await?;
        let max = self.read(RequestCode::GetMax, descriptor, unit_id).await?;
        Ok(FieldRange::new(min, max))
    }

    async fn set(&self, name: &str, values: &[i64]) -> Result<(), TransportError> {
        let (descriptor, unit_id) = self.resolve(name)?;
        let payload = descriptor.encode(values)?;

        self.interface()?
            .control_out(ControlOut {
                control_type: ControlType::Class,
                recipient: Recipient::Interface,
                request: RequestCode::SetCur.code(),
                value: u16::from(descriptor.selector()) << 8,
                index: self.index(unit_id),
                data: &payload,
            })
            .await
            .into_result()?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_poisoned| TransportError::Closed)?;
        guard.take().ok_or(TransportError::Closed)?;
        Ok(())
    }
}

/// Camera terminal and processing unit found in the VC interface descriptors.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct VideoControlUnits {
    camera_terminal: Option<UnitControls>,
    processing_unit: Option<UnitControls>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct UnitControls {
    id: u8,
    bm_controls: Vec<u8>,
}

impl UnitControls {
    fn set_bits(&self) -> impl Iterator<Item = u8> + '_ {
        self.bm_controls
            .iter()
            .enumerate()
            .flat_map(|(byte_index, byte)| {
                (0..8u8)
                    .filter(move |bit| byte & (1 << bit) != 0)
                    .filter_map(move |bit| u8::try_from(byte_index * 8 + usize::from(bit)).ok())
            })
    }
}

impl VideoControlUnits {
    fn unit_id(&self, unit: ControlUnit) -> Option<u8> {
        self.unit(unit).map(|controls| controls.id)
    }

    fn unit(&self, unit: ControlUnit) -> Option<&UnitControls> {
        match unit {
            ControlUnit::CameraTerminal => self.camera_terminal.as_ref(),
            ControlUnit::ProcessingUnit => self.processing_unit.as_ref(),
        }
    }

    fn supported_controls(&self, registry: &ControlRegistry) -> Vec<String> {
        [ControlUnit::CameraTerminal, ControlUnit::ProcessingUnit]
            .into_iter()
            .filter_map(|unit| self.unit(unit).map(|controls| (unit, controls)))
            .flat_map(|(unit, controls)| {
                controls
                    .set_bits()
                    .filter_map(move |bit| registry.by_control_bit(unit, bit))
            })
            .map(|descriptor| descriptor.name().to_string())
            .collect()
    }
}

fn read_video_control_units(
    device: &Device,
    interface_number: u8,
) -> Result<VideoControlUnits, TransportError> {
    let configuration =
        device
            .active_configuration()
            .map_err(|error| TransportError::Descriptors {
                reason: error.to_string(),
            })?;
    let descriptors: Vec<Vec<u8>> = configuration
        .interface_alt_settings()
        .filter(|alt| alt.interface_number() == interface_number && alt.alternate_setting() == 0)
        .flat_map(|alt| {
            alt.descriptors()
                .filter(|descriptor| descriptor.descriptor_type() == CS_INTERFACE)
                .map(|descriptor| descriptor.to_vec())
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(parse_video_control_units(&descriptors))
}

fn parse_video_control_units(descriptors: &[Vec<u8>]) -> VideoControlUnits {
    let mut units = VideoControlUnits::default();
    for descriptor in descriptors {
        match descriptor.get(2).copied() {
            Some(VC_INPUT_TERMINAL) if units.camera_terminal.is_none() => {
                let terminal_type = descriptor
                    .get(4..6)
                    .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]));
                if terminal_type == Some(ITT_CAMERA) {
                    units.camera_terminal = unit_controls(descriptor, 3, 14);
                }
            }
            Some(VC_PROCESSING_UNIT) if units.processing_unit.is_none() => {
                units.processing_unit = unit_controls(descriptor, 3, 7);
            }
            _ => {}
        }
    }
    units
}

fn unit_controls(descriptor: &[u8], id_offset: usize, size_offset: usize) -> Option<UnitControls> {
    let id = *descriptor.get(id_offset)?;
    let size = usize::from(*descriptor.get(size_offset)?);
    let start = size_offset + 1;
    let bm_controls = descriptor.get(start..start + size)?.to_vec();
    Some(UnitControls { id, bm_controls })
}

fn video_control_interface(info: &DeviceInfo) -> Option<u8> {
    info.interfaces()
        .find(|interface| {
            interface.class() == VIDEO_CLASS && interface.subclass() == VIDEO_CONTROL_SUBCLASS
        })
        .map(|interface| interface.interface_number())
}

fn identity_of(info: &DeviceInfo) -> DeviceIdentity {
    DeviceIdentity::new(info.vendor_id(), info.product_id(), info.device_address())
}

fn device_name(info: &DeviceInfo) -> String {
    info.product_string()
        .or_else(|| info.manufacturer_string())
        .unwrap_or("UVC device")
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn camera_terminal(id: u8, bm_controls: &[u8]) -> Vec<u8> {
        let mut descriptor = vec![
            0,
            CS_INTERFACE,
            VC_INPUT_TERMINAL,
            id,
            0x01,
            0x02,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
        ];
        descriptor.push(u8::try_from(bm_controls.len()).expect("small bitmap"));
        descriptor.extend_from_slice(bm_controls);
        descriptor[0] = u8::try_from(descriptor.len()).expect("small descriptor");
        descriptor
    }

    fn processing_unit(id: u8, bm_controls: &[u8]) -> Vec<u8> {
        let mut descriptor = vec![0, CS_INTERFACE, VC_PROCESSING_UNIT, id, 0x01, 0x00, 0x40];
        descriptor.push(u8::try_from(bm_controls.len()).expect("small bitmap"));
        descriptor.extend_from_slice(bm_controls);
        descriptor.push(0x00);
        descriptor[0] = u8::try_from(descriptor.len()).expect("small descriptor");
        descriptor
    }

    #[test]
    fn parses_camera_terminal_and_processing_unit_bitmaps() {
        let descriptors = vec![camera_terminal(1, &[0x0A, 0x02, 0x00]), processing_unit(2, &[0x01, 0x10])];

        let units = parse_video_control_units(&descriptors);

        assert_eq!(Some(1), units.unit_id(ControlUnit::CameraTerminal));
        assert_eq!(Some(2), units.unit_id(ControlUnit::ProcessingUnit));
        assert_eq!(
            vec![
                "auto_exposure_mode".to_string(),
                "absolute_exposure_time".to_string(),
                "absolute_zoom".to_string(),
                "brightness".to_string(),
                "auto_white_balance_temperature".to_string(),
            ],
            units.supported_controls(ControlRegistry::standard())
        );
    }

    #[test]
    fn ignores_non_camera_input_terminals() {
        let mut terminal = camera_terminal(1, &[0xFF]);
        terminal[4] = 0x01;
        terminal[5] = 0x04;

        let units = parse_video_control_units(&[terminal]);

        assert_eq!(None, units.unit_id(ControlUnit::CameraTerminal));
        assert_eq!(
            Vec::<String>::new(),
            units.supported_controls(ControlRegistry::standard())
        );
    }

    #[test]
    fn truncated_unit_descriptor_is_skipped() {
        let mut unit = processing_unit(2, &[0xFF, 0xFF]);
        unit.truncate(9);

        let units = parse_video_control_units(&[unit]);

        assert_eq!(None, units.unit_id(ControlUnit::ProcessingUnit));
    }
}
