//! Android Open Accessory (AOA) negotiation
//!
//! Switches an attached Android device into accessory mode using the three
//! vendor requests of the AOA protocol. The USB host stack supplies the
//! control endpoint through the [`ControlPipe`] trait.
//!
//! ```no_run
//! # use lpc17xx_hal::aoa::{self, AccessoryIdentity, ControlPipe, SetupPacket};
//! # struct Host;
//! # impl ControlPipe for Host {
//! #     type Error = ();
//! #     fn control_in(
//! #         &mut self,
//! #         _: &SetupPacket,
//! #         _: &mut [u8],
//! #     ) -> Result<usize, ()> {
//! #         Ok(0)
//! #     }
//! #     fn control_out(
//! #         &mut self,
//! #         _: &SetupPacket,
//! #         _: &[u8],
//! #     ) -> Result<(), ()> {
//! #         Ok(())
//! #     }
//! # }
//! # let mut host = Host;
//! let identity = AccessoryIdentity {
//!     manufacturer: "Embedded Artists AB",
//!     model: "AOA Board - Basic",
//!     description: "LPC1769 accessory",
//!     version: "1.0",
//!     uri: "http://www.embeddedartists.com",
//!     serial: "0000000000000001",
//! };
//! let protocol = aoa::switch_to_accessory(&mut host, &identity)?;
//! # Ok::<(), aoa::Error>(())
//! ```
//!
//! After the switch the device re-enumerates. [`classify_device`] tells the
//! two enumerations apart and [`find_accessory_interface`] locates the bulk
//! endpoints of the accessory interface.

use core::fmt;

mod descriptor;

pub use descriptor::{
    classify_device, find_accessory_interface, AccessoryInterface, DeviceMode,
    Endpoint, ACCESSORY_ADB_PRODUCT_ID, ACCESSORY_PRODUCT_ID,
    GOOGLE_VENDOR_ID, MAX_CONFIG_DESCRIPTOR_LEN,
};

/// Device to host, vendor, device recipient
const REQUEST_TYPE_IN: u8 = 0xC0;
/// Host to device, vendor, device recipient
const REQUEST_TYPE_OUT: u8 = 0x40;

/// Vendor request numbers
const REQ_GET_PROTOCOL: u8 = 51;
const REQ_SEND_STRING: u8 = 52;
const REQ_START_ACCESSORY: u8 = 53;

/// Longest identification string, without the terminating NUL
pub const MAX_STRING_LEN: usize = 255;

/// Errors of the accessory negotiation and descriptor checks
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A control request to the device failed
    DevControlError,
    /// The device descriptor is short or not a device descriptor
    InvalidDeviceData,
    /// The configuration descriptor is longer than
    /// [`MAX_CONFIG_DESCRIPTOR_LEN`]
    DescriptorTooLarge,
    /// The configuration descriptor is malformed
    InvalidConfigData,
    /// No accessory interface with bulk IN and OUT endpoints
    NoCompatibleInterface,
    /// The device does not speak the accessory protocol
    ProtocolUnsupported(u16),
    /// Identification string longer than [`MAX_STRING_LEN`]
    StringTooLong(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DevControlError => f.write_str("control request failed"),
            Error::InvalidDeviceData => {
                f.write_str("invalid device descriptor")
            }
            Error::DescriptorTooLarge => {
                f.write_str("configuration descriptor too large")
            }
            Error::InvalidConfigData => {
                f.write_str("invalid configuration descriptor")
            }
            Error::NoCompatibleInterface => {
                f.write_str("no accessory interface found")
            }
            Error::ProtocolUnsupported(version) => {
                write!(f, "accessory protocol {} not supported", version)
            }
            Error::StringTooLong(len) => {
                write!(f, "identification string of {} bytes too long", len)
            }
        }
    }
}

/// USB SETUP packet
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

/// Control endpoint of an attached device
pub trait ControlPipe {
    type Error;

    /// Run a device to host control transfer, returning the number of bytes
    /// received into `data`.
    fn control_in(
        &mut self,
        setup: &SetupPacket,
        data: &mut [u8],
    ) -> Result<usize, Self::Error>;

    /// Run a host to device control transfer with `data` as the data stage.
    fn control_out(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<T: ControlPipe> ControlPipe for &mut T {
    type Error = T::Error;

    fn control_in(
        &mut self,
        setup: &SetupPacket,
        data: &mut [u8],
    ) -> Result<usize, Self::Error> {
        (**self).control_in(setup, data)
    }

    fn control_out(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        (**self).control_out(setup, data)
    }
}

/// Identification strings, by string index
#[derive(Debug, Clone, Copy)]
pub struct AccessoryIdentity<'a> {
    pub manufacturer: &'a str,
    pub model: &'a str,
    pub description: &'a str,
    pub version: &'a str,
    pub uri: &'a str,
    pub serial: &'a str,
}

impl<'a> AccessoryIdentity<'a> {
    fn strings(&self) -> [&'a str; 6] {
        [
            self.manufacturer,
            self.model,
            self.description,
            self.version,
            self.uri,
            self.serial,
        ]
    }
}

/// Read the accessory protocol version supported by the device. Zero means
/// no accessory support.
pub fn get_protocol<P: ControlPipe>(pipe: &mut P) -> Result<u16, Error> {
    let setup = SetupPacket {
        request_type: REQUEST_TYPE_IN,
        request: REQ_GET_PROTOCOL,
        value: 0,
        index: 0,
        length: 2,
    };
    let mut data = [0u8; 2];
    let len = pipe
        .control_in(&setup, &mut data)
        .map_err(|_| Error::DevControlError)?;
    if len < data.len() {
        return Err(Error::DevControlError);
    }
    Ok(u16::from_le_bytes(data))
}

/// Send identification string `index`, NUL terminated.
pub fn send_string<P: ControlPipe>(
    pipe: &mut P,
    index: u16,
    string: &str,
) -> Result<(), Error> {
    let bytes = string.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(Error::StringTooLong(bytes.len()));
    }

    let mut payload = [0u8; MAX_STRING_LEN + 1];
    payload[..bytes.len()].copy_from_slice(bytes);
    let payload = &payload[..bytes.len() + 1];

    let setup = SetupPacket {
        request_type: REQUEST_TYPE_OUT,
        request: REQ_SEND_STRING,
        value: 0,
        index,
        length: payload.len() as u16,
    };
    pipe.control_out(&setup, payload)
        .map_err(|_| Error::DevControlError)
}

/// Ask the device to re-enumerate in accessory mode.
pub fn start_accessory_mode<P: ControlPipe>(pipe: &mut P) -> Result<(), Error> {
    let setup = SetupPacket {
        request_type: REQUEST_TYPE_OUT,
        request: REQ_START_ACCESSORY,
        value: 0,
        index: 0,
        length: 0,
    };
    pipe.control_out(&setup, &[])
        .map_err(|_| Error::DevControlError)
}

/// Full switch of a device found in [`DeviceMode::NonAccessoryMode`]: check
/// the protocol version, send the identification and start accessory mode.
/// Returns the protocol version.
pub fn switch_to_accessory<P: ControlPipe>(
    pipe: &mut P,
    identity: &AccessoryIdentity<'_>,
) -> Result<u16, Error> {
    let protocol = get_protocol(pipe)?;
    if protocol < 1 {
        warn!("Device does not support accessory mode");
        return Err(Error::ProtocolUnsupported(protocol));
    }
    debug!("Accessory protocol version {}", protocol);

    for (index, string) in identity.strings().iter().enumerate() {
        send_string(pipe, index as u16, string)?;
    }
    start_accessory_mode(pipe)?;
    info!("Requested accessory mode");
    Ok(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Transfer {
        setup: SetupPacket,
        data: Vec<u8>,
    }

    /// Records every transfer and answers GET_PROTOCOL with `protocol`
    struct RecordingPipe {
        protocol: Option<u16>,
        fail_after: Option<usize>,
        log: Vec<Transfer>,
    }

    impl RecordingPipe {
        fn new(protocol: u16) -> Self {
            RecordingPipe {
                protocol: Some(protocol),
                fail_after: None,
                log: Vec::new(),
            }
        }

        fn check(&self) -> Result<(), ()> {
            match self.fail_after {
                Some(n) if self.log.len() >= n => Err(()),
                _ => Ok(()),
            }
        }
    }

    impl ControlPipe for RecordingPipe {
        type Error = ();

        fn control_in(
            &mut self,
            setup: &SetupPacket,
            data: &mut [u8],
        ) -> Result<usize, ()> {
            self.check()?;
            self.log.push(Transfer {
                setup: *setup,
                data: Vec::new(),
            });
            match self.protocol {
                Some(protocol) => {
                    data[..2].copy_from_slice(&protocol.to_le_bytes());
                    Ok(2)
                }
                None => Ok(0),
            }
        }

        fn control_out(
            &mut self,
            setup: &SetupPacket,
            data: &[u8],
        ) -> Result<(), ()> {
            self.check()?;
            self.log.push(Transfer {
                setup: *setup,
                data: data.to_vec(),
            });
            Ok(())
        }
    }

    fn identity() -> AccessoryIdentity<'static> {
        AccessoryIdentity {
            manufacturer: "Embedded Artists AB",
            model: "AOA Board - Basic",
            description: "Demo",
            version: "1.0",
            uri: "http://www.embeddedartists.com",
            serial: "1",
        }
    }

    #[test]
    fn get_protocol_request() {
        let mut pipe = RecordingPipe::new(2);
        assert_eq!(get_protocol(&mut pipe), Ok(2));
        assert_eq!(
            pipe.log[0].setup,
            SetupPacket {
                request_type: 0xC0,
                request: 51,
                value: 0,
                index: 0,
                length: 2,
            }
        );
    }

    #[test]
    fn short_protocol_answer_is_a_control_error() {
        let mut pipe = RecordingPipe::new(0);
        pipe.protocol = None;
        assert_eq!(get_protocol(&mut pipe), Err(Error::DevControlError));
    }

    #[test]
    fn strings_are_nul_terminated() {
        let mut pipe = RecordingPipe::new(1);
        send_string(&mut pipe, 3, "1.0").unwrap();
        let transfer = &pipe.log[0];
        assert_eq!(transfer.setup.request_type, 0x40);
        assert_eq!(transfer.setup.request, 52);
        assert_eq!(transfer.setup.index, 3);
        assert_eq!(transfer.setup.length, 4);
        assert_eq!(transfer.data, b"1.0\0");

        let long = "x".repeat(MAX_STRING_LEN + 1);
        assert_eq!(
            send_string(&mut pipe, 0, &long),
            Err(Error::StringTooLong(MAX_STRING_LEN + 1))
        );
        assert!(send_string(&mut pipe, 0, &long[1..]).is_ok());
    }

    #[test]
    fn switch_sends_identity_then_start() {
        let mut pipe = RecordingPipe::new(1);
        assert_eq!(switch_to_accessory(&mut pipe, &identity()), Ok(1));

        assert_eq!(pipe.log.len(), 8);
        for (i, transfer) in pipe.log[1..7].iter().enumerate() {
            assert_eq!(transfer.setup.request, 52);
            assert_eq!(transfer.setup.index, i as u16);
        }
        assert_eq!(pipe.log[1].data, b"Embedded Artists AB\0");
        assert_eq!(pipe.log[6].data, b"1\0");

        let start = &pipe.log[7];
        assert_eq!(start.setup.request, 53);
        assert_eq!(start.setup.length, 0);
        assert!(start.data.is_empty());
    }

    #[test]
    fn switch_requires_protocol_one() {
        let mut pipe = RecordingPipe::new(0);
        assert_eq!(
            switch_to_accessory(&mut pipe, &identity()),
            Err(Error::ProtocolUnsupported(0))
        );
        assert_eq!(pipe.log.len(), 1);
    }

    #[test]
    fn failed_transfer_stops_the_switch() {
        let mut pipe = RecordingPipe::new(1);
        pipe.fail_after = Some(3);
        assert_eq!(
            switch_to_accessory(&mut pipe, &identity()),
            Err(Error::DevControlError)
        );
        assert_eq!(pipe.log.len(), 3);
        assert!(pipe.log.iter().all(|t| t.setup.request != 53));
    }
}
