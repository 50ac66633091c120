//! Device and configuration descriptor checks for accessory mode

use super::Error;

/// Google vendor id
pub const GOOGLE_VENDOR_ID: u16 = 0x18D1;
/// Product id of a device in accessory mode
pub const ACCESSORY_PRODUCT_ID: u16 = 0x2D00;
/// Product id of a device in accessory mode with ADB
pub const ACCESSORY_ADB_PRODUCT_ID: u16 = 0x2D01;

/// Largest configuration descriptor processed
pub const MAX_CONFIG_DESCRIPTOR_LEN: usize = 512;

const DTYPE_DEVICE: u8 = 0x01;
const DTYPE_CONFIGURATION: u8 = 0x02;
const DTYPE_INTERFACE: u8 = 0x04;
const DTYPE_ENDPOINT: u8 = 0x05;

const DEVICE_DESCRIPTOR_LEN: usize = 18;
const CONFIG_DESCRIPTOR_LEN: usize = 9;
const INTERFACE_DESCRIPTOR_LEN: usize = 9;
const ENDPOINT_DESCRIPTOR_LEN: usize = 7;

const ACCESSORY_CLASS: u8 = 0xFF;
const ACCESSORY_SUBCLASS: u8 = 0xFF;

const ENDPOINT_DIR_IN: u8 = 0x80;
const ENDPOINT_TYPE_MASK: u8 = 0x03;
const ENDPOINT_TYPE_BULK: u8 = 0x02;

/// Enumeration state of an Android device
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Ready for the accessory bulk interface
    AccessoryMode,
    /// Needs [`switch_to_accessory`](super::switch_to_accessory) first
    NonAccessoryMode,
}

/// Bulk endpoint
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint address, including the direction bit
    pub address: u8,
    pub max_packet_size: u16,
}

/// Accessory interface of a device in accessory mode
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessoryInterface {
    pub interface_number: u8,
    pub bulk_in: Endpoint,
    pub bulk_out: Endpoint,
}

fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Classify a device from its device descriptor.
///
/// Devices re-enumerate under another vendor id on some phones, so anything
/// that is not a Google accessory product counts as
/// [`DeviceMode::NonAccessoryMode`] rather than an error.
pub fn classify_device(descriptor: &[u8]) -> Result<DeviceMode, Error> {
    if descriptor.len() < DEVICE_DESCRIPTOR_LEN
        || descriptor[1] != DTYPE_DEVICE
    {
        return Err(Error::InvalidDeviceData);
    }

    let vendor = le_u16(descriptor, 8);
    let product = le_u16(descriptor, 10);
    trace!("Device {:x}:{:x}", vendor, product);

    let accessory = vendor == GOOGLE_VENDOR_ID
        && (product == ACCESSORY_PRODUCT_ID
            || product == ACCESSORY_ADB_PRODUCT_ID);
    Ok(if accessory {
        DeviceMode::AccessoryMode
    } else {
        DeviceMode::NonAccessoryMode
    })
}

/// Walks the descriptors of a configuration, yielding (type, bytes)
struct Descriptors<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = Result<(u8, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let len = self.rest[0] as usize;
        if len < 2 || len > self.rest.len() {
            self.rest = &[];
            return Some(Err(Error::InvalidConfigData));
        }
        let (descriptor, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(Ok((descriptor[1], descriptor)))
    }
}

/// Candidate interface being collected
struct Candidate {
    number: u8,
    bulk_in: Option<Endpoint>,
    bulk_out: Option<Endpoint>,
}

impl Candidate {
    fn complete(&self) -> Option<AccessoryInterface> {
        Some(AccessoryInterface {
            interface_number: self.number,
            bulk_in: self.bulk_in?,
            bulk_out: self.bulk_out?,
        })
    }
}

/// Find the accessory interface (vendor class and subclass) and its bulk IN
/// and OUT endpoints in a full configuration descriptor.
///
/// Interface protocol 0 is accepted as well as 1, since shipping devices
/// report either.
pub fn find_accessory_interface(
    config: &[u8],
) -> Result<AccessoryInterface, Error> {
    if config.len() > MAX_CONFIG_DESCRIPTOR_LEN {
        return Err(Error::DescriptorTooLarge);
    }
    if config.len() < CONFIG_DESCRIPTOR_LEN
        || (config[0] as usize) < CONFIG_DESCRIPTOR_LEN
        || config[1] != DTYPE_CONFIGURATION
    {
        return Err(Error::InvalidConfigData);
    }
    let total = le_u16(config, 2) as usize;
    if total > MAX_CONFIG_DESCRIPTOR_LEN {
        return Err(Error::DescriptorTooLarge);
    }
    if total > config.len() || total < config[0] as usize {
        return Err(Error::InvalidConfigData);
    }

    let descriptors = Descriptors {
        rest: &config[config[0] as usize..total],
    };
    let mut candidate: Option<Candidate> = None;

    for descriptor in descriptors {
        let (kind, bytes) = descriptor?;
        match kind {
            DTYPE_INTERFACE => {
                if let Some(found) =
                    candidate.as_ref().and_then(Candidate::complete)
                {
                    return Ok(found);
                }
                if bytes.len() < INTERFACE_DESCRIPTOR_LEN {
                    return Err(Error::InvalidConfigData);
                }
                let (class, subclass, protocol) =
                    (bytes[5], bytes[6], bytes[7]);
                candidate = if class == ACCESSORY_CLASS
                    && subclass == ACCESSORY_SUBCLASS
                    && (protocol == 0 || protocol == 1)
                {
                    Some(Candidate {
                        number: bytes[2],
                        bulk_in: None,
                        bulk_out: None,
                    })
                } else {
                    None
                };
            }
            DTYPE_ENDPOINT => {
                let Some(current) = candidate.as_mut() else {
                    continue;
                };
                if bytes.len() < ENDPOINT_DESCRIPTOR_LEN {
                    return Err(Error::InvalidConfigData);
                }
                if bytes[3] & ENDPOINT_TYPE_MASK != ENDPOINT_TYPE_BULK {
                    continue;
                }
                let endpoint = Endpoint {
                    address: bytes[2],
                    max_packet_size: le_u16(bytes, 4),
                };
                if endpoint.address & ENDPOINT_DIR_IN != 0 {
                    current.bulk_in.get_or_insert(endpoint);
                } else {
                    current.bulk_out.get_or_insert(endpoint);
                }
            }
            _ => {}
        }
    }

    candidate
        .as_ref()
        .and_then(Candidate::complete)
        .ok_or(Error::NoCompatibleInterface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(vendor: u16, product: u16) -> [u8; 18] {
        let mut d = [0u8; 18];
        d[0] = 18;
        d[1] = DTYPE_DEVICE;
        d[8..10].copy_from_slice(&vendor.to_le_bytes());
        d[10..12].copy_from_slice(&product.to_le_bytes());
        d
    }

    fn interface(number: u8, class: u8, subclass: u8, protocol: u8) -> [u8; 9] {
        [9, DTYPE_INTERFACE, number, 0, 2, class, subclass, protocol, 0]
    }

    fn bulk(address: u8) -> [u8; 7] {
        [7, DTYPE_ENDPOINT, address, ENDPOINT_TYPE_BULK, 0x40, 0, 0]
    }

    fn config(body: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![9, DTYPE_CONFIGURATION, 0, 0, 1, 1, 0, 0x80, 50];
        for part in body {
            out.extend_from_slice(part);
        }
        let total = out.len() as u16;
        out[2..4].copy_from_slice(&total.to_le_bytes());
        out
    }

    #[test]
    fn device_classification() {
        assert_eq!(
            classify_device(&device(0x18D1, 0x2D00)),
            Ok(DeviceMode::AccessoryMode)
        );
        assert_eq!(
            classify_device(&device(0x18D1, 0x2D01)),
            Ok(DeviceMode::AccessoryMode)
        );
        assert_eq!(
            classify_device(&device(0x18D1, 0x4E22)),
            Ok(DeviceMode::NonAccessoryMode)
        );
        // Re-enumerated under the phone maker's vendor id
        assert_eq!(
            classify_device(&device(0x22B8, 0x2D00)),
            Ok(DeviceMode::NonAccessoryMode)
        );

        let mut wrong_type = device(0x18D1, 0x2D00);
        wrong_type[1] = DTYPE_CONFIGURATION;
        assert_eq!(classify_device(&wrong_type), Err(Error::InvalidDeviceData));
        assert_eq!(
            classify_device(&device(0x18D1, 0x2D00)[..12]),
            Err(Error::InvalidDeviceData)
        );
    }

    #[test]
    fn finds_bulk_endpoints() {
        let desc = config(&[
            &interface(0, 0xFF, 0xFF, 0),
            &bulk(0x81),
            &bulk(0x02),
        ]);
        assert_eq!(
            find_accessory_interface(&desc),
            Ok(AccessoryInterface {
                interface_number: 0,
                bulk_in: Endpoint {
                    address: 0x81,
                    max_packet_size: 64
                },
                bulk_out: Endpoint {
                    address: 0x02,
                    max_packet_size: 64
                },
            })
        );
    }

    #[test]
    fn skips_other_interfaces() {
        // ADB interface first, accessory interface second with protocol 1
        let desc = config(&[
            &interface(0, 0xFF, 0x42, 1),
            &bulk(0x83),
            &bulk(0x04),
            &interface(1, 0xFF, 0xFF, 1),
            &[9, 0x21, 0, 0, 0, 0, 0, 0, 0],
            &bulk(0x85),
            &bulk(0x06),
        ]);
        let found = find_accessory_interface(&desc).unwrap();
        assert_eq!(found.interface_number, 1);
        assert_eq!(found.bulk_in.address, 0x85);
        assert_eq!(found.bulk_out.address, 0x06);
    }

    #[test]
    fn interface_needs_both_directions() {
        let desc = config(&[
            &interface(0, 0xFF, 0xFF, 0),
            &bulk(0x81),
            &[7, DTYPE_ENDPOINT, 0x02, 0x03, 8, 0, 10],
        ]);
        assert_eq!(
            find_accessory_interface(&desc),
            Err(Error::NoCompatibleInterface)
        );

        let desc = config(&[
            &interface(0, 0xFF, 0xFF, 2),
            &bulk(0x81),
            &bulk(0x02),
        ]);
        assert_eq!(
            find_accessory_interface(&desc),
            Err(Error::NoCompatibleInterface)
        );
    }

    #[test]
    fn malformed_configurations() {
        let too_large = vec![0u8; MAX_CONFIG_DESCRIPTOR_LEN + 1];
        assert_eq!(
            find_accessory_interface(&too_large),
            Err(Error::DescriptorTooLarge)
        );

        let mut declared_too_large = config(&[]);
        declared_too_large[2..4].copy_from_slice(&600u16.to_le_bytes());
        assert_eq!(
            find_accessory_interface(&declared_too_large),
            Err(Error::DescriptorTooLarge)
        );

        let mut wrong_type = config(&[]);
        wrong_type[1] = DTYPE_DEVICE;
        assert_eq!(
            find_accessory_interface(&wrong_type),
            Err(Error::InvalidConfigData)
        );

        let mut truncated = config(&[&interface(0, 0xFF, 0xFF, 0)]);
        truncated.truncate(14);
        assert_eq!(
            find_accessory_interface(&truncated),
            Err(Error::InvalidConfigData)
        );

        // Zero length descriptor would never advance
        let zero = config(&[&[0, 0, 0]]);
        assert_eq!(
            find_accessory_interface(&zero),
            Err(Error::InvalidConfigData)
        );
    }
}
