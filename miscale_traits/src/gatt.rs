//! GATT identifiers used by the Mi Body Composition Scale 2.

use uuid::Uuid;

/// Bluetooth SIG base UUID `00000000-0000-1000-8000-00805f9b34fb`.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Expand a 16-bit SIG-assigned number into its full 128-bit UUID.
pub const fn short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Weight Scale service (0x181D).
pub const WEIGHT_SCALE_SERVICE: Uuid = short_uuid(0x181d);
/// Body Composition service (0x181B).
pub const BODY_COMPOSITION_SERVICE: Uuid = short_uuid(0x181b);
/// Battery service (0x180F).
pub const BATTERY_SERVICE: Uuid = short_uuid(0x180f);

/// Standard measurement characteristic `00002a9c-…` under the body composition service.
pub const STANDARD_MEASUREMENT: Uuid = short_uuid(0x2a9c);

/// Weight Measurement characteristic `00002a9d-…` under the weight scale service.
/// Mirrors readings of the standard characteristic on some firmware.
pub const WEIGHT_MEASUREMENT: Uuid = short_uuid(0x2a9d);

/// Services a transport should request access to before subscribing.
pub const SCALE_SERVICES: [Uuid; 3] = [
    WEIGHT_SCALE_SERVICE,
    BATTERY_SERVICE,
    BODY_COMPOSITION_SERVICE,
];

/// Parse a characteristic id given either as a full UUID or as a 16-bit short form
/// (`2a9c`, `0x2A9C`).
pub fn parse_characteristic(s: &str) -> Option<Uuid> {
    let t = s.trim();
    let short = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    if short.len() == 4 {
        return u16::from_str_radix(short, 16).ok().map(short_uuid);
    }
    Uuid::parse_str(t).ok()
}
