//! LPF2 GATT identifiers and advertisement constants

use uuid::Uuid;

/// LPF2 hub service
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00001623_1212_efde_1623_785feabcd123);

/// The single characteristic carrying commands and notifications
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00001624_1212_efde_1623_785feabcd123);

/// Bluetooth SIG company identifier used in hub advertisements
pub const LEGO_COMPANY_ID: u16 = 0x0397;

/// Offset of the system type byte inside the manufacturer data
/// (after the company id has been stripped)
///
/// Byte 0 is the hub button state.
pub const SYSTEM_TYPE_OFFSET: usize = 1;

/// System type bytes advertised by known hubs
pub mod system_type {
    pub const DUPLO_TRAIN_HUB: u8 = 0x20;
    pub const BOOST_MOVE_HUB: u8 = 0x40;
    pub const POWERED_UP_HUB: u8 = 0x41;
    pub const POWERED_UP_REMOTE: u8 = 0x42;
    pub const CONTROL_PLUS_HUB: u8 = 0x80;

    /// Get human-readable name for a system type byte
    pub fn name(id: u8) -> &'static str {
        match id {
            DUPLO_TRAIN_HUB => "DUPLO_TRAIN_HUB",
            BOOST_MOVE_HUB => "BOOST_MOVE_HUB",
            POWERED_UP_HUB => "POWERED_UP_HUB",
            POWERED_UP_REMOTE => "POWERED_UP_REMOTE",
            CONTROL_PLUS_HUB => "CONTROL_PLUS_HUB",
            _ => "UNKNOWN",
        }
    }
}

/// Extract the system type byte from LEGO manufacturer data
pub fn system_type_from_manufacturer_data(data: &[u8]) -> Option<u8> {
    data.get(SYSTEM_TYPE_OFFSET).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_strings() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "00001623-1212-efde-1623-785feabcd123"
        );
        assert_eq!(
            CHARACTERISTIC_UUID.to_string(),
            "00001624-1212-efde-1623-785feabcd123"
        );
    }

    #[test]
    fn test_system_type_extraction() {
        // [button state, system type, capabilities, last network, status, option]
        let data = [0x00, 0x40, 0x06, 0x00, 0x41, 0x00];
        assert_eq!(
            system_type_from_manufacturer_data(&data),
            Some(system_type::BOOST_MOVE_HUB)
        );
        assert_eq!(system_type_from_manufacturer_data(&[0x00]), None);
    }

    #[test]
    fn test_system_type_names() {
        assert_eq!(system_type::name(0x41), "POWERED_UP_HUB");
        assert_eq!(system_type::name(0x07), "UNKNOWN");
    }
}
