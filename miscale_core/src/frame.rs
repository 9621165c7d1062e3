//! Frame decoder: one BLE notification in, at most one candidate weight out.
//!
//! Byte 0 is a control byte; the weight is a little-endian `u16` whose offset and
//! divisor depend on the [`FirmwareProfile`]. Frames that are too short, decode to an
//! implausible weight, or otherwise do not make sense are dropped without error.
//! Weight-removed frames skip the range check: the scale reports ~0 kg on step-off.

use std::time::Instant;

use miscale_traits::{RawFrame, Uuid, gatt};

use crate::config::ProfileSelection;

/// Pounds-to-kilograms factor applied when the unit bit is set.
pub const KG_PER_LB: f32 = 0.453_592;

/// Frames at least this long may carry an impedance field.
pub const IMPEDANCE_FRAME_LEN: usize = 13;

/// Control byte (byte 0) of a measurement frame.
///
/// The bit layout is reverse-engineered from vendor traffic. Only the unit,
/// stabilized and weight-removed bits influence decoding; the others are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags(pub u8);

impl ControlFlags {
    const POUNDS: u8 = 1 << 0;
    const TIMESTAMP: u8 = 1 << 1;
    const USER_ID: u8 = 1 << 2;
    const BMI: u8 = 1 << 3;
    const STABILIZED: u8 = 1 << 5;
    const WEIGHT_REMOVED: u8 = 1 << 7;

    #[inline]
    pub fn is_pounds(self) -> bool {
        self.0 & Self::POUNDS != 0
    }
    #[inline]
    pub fn has_timestamp(self) -> bool {
        self.0 & Self::TIMESTAMP != 0
    }
    #[inline]
    pub fn has_user_id(self) -> bool {
        self.0 & Self::USER_ID != 0
    }
    #[inline]
    pub fn has_bmi(self) -> bool {
        self.0 & Self::BMI != 0
    }
    #[inline]
    pub fn is_stabilized(self) -> bool {
        self.0 & Self::STABILIZED != 0
    }
    #[inline]
    pub fn is_weight_removed(self) -> bool {
        self.0 & Self::WEIGHT_REMOVED != 0
    }
}

/// Byte layouts observed across firmware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareProfile {
    /// Weight at offset 1, 5 g resolution (divisor 200); impedance at offset 9.
    /// Used on the generic notify channel and on the standard measurement characteristic.
    Mi2,
    /// Weight at offset 2, 10 g resolution (divisor 100); impedance at offset 11.
    Centigram,
}

impl FirmwareProfile {
    /// Probe order in auto mode: primary first, then alternates.
    pub const PROBE_ORDER: [Self; 2] = [Self::Mi2, Self::Centigram];

    #[inline]
    pub const fn weight_offset(self) -> usize {
        match self {
            Self::Mi2 => 1,
            Self::Centigram => 2,
        }
    }

    #[inline]
    pub const fn divisor(self) -> f32 {
        match self {
            Self::Mi2 => 200.0,
            Self::Centigram => 100.0,
        }
    }

    #[inline]
    pub const fn impedance_offset(self) -> usize {
        match self {
            Self::Mi2 => 9,
            Self::Centigram => 11,
        }
    }

    /// Shortest frame that still holds the weight field.
    #[inline]
    pub const fn min_len(self) -> usize {
        self.weight_offset() + 2
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mi2 => "mi2",
            Self::Centigram => "centigram",
        }
    }
}

impl std::fmt::Display for FirmwareProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which characteristic a notification came in on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// `00002a9c-…`, the standard measurement characteristic.
    Standard,
    /// Any other notify characteristic.
    Generic,
}

impl Channel {
    pub fn of(characteristic: &Uuid) -> Self {
        if *characteristic == gatt::STANDARD_MEASUREMENT {
            Self::Standard
        } else {
            Self::Generic
        }
    }
}

/// Plausible body-weight range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightLimits {
    pub min_kg: f32,
    pub max_kg: f32,
}

impl Default for WeightLimits {
    fn default() -> Self {
        Self {
            min_kg: 5.0,
            max_kg: 300.0,
        }
    }
}

impl WeightLimits {
    #[inline]
    pub fn contains(&self, kg: f32) -> bool {
        kg.is_finite() && kg >= self.min_kg && kg <= self.max_kg
    }
}

/// A decoded reading. Not yet trusted as a final weight.
///
/// `weight_kg` is within the limits unless `is_weight_removed` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMeasurement {
    pub weight_kg: f32,
    pub is_stabilized: bool,
    pub is_weight_removed: bool,
    pub impedance_ohms: Option<u16>,
    pub captured_at: Instant,
    pub characteristic: Uuid,
    pub channel: Channel,
    pub profile: FirmwareProfile,
}

#[inline]
fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let lo = *bytes.get(offset)?;
    let hi = *bytes.get(offset + 1)?;
    Some(u16::from_le_bytes([lo, hi]))
}

/// Decode the weight in kilograms without range validation.
#[inline]
fn raw_weight_kg(payload: &[u8], flags: ControlFlags, profile: FirmwareProfile) -> Option<f32> {
    if payload.len() < profile.min_len() {
        return None;
    }
    let raw = read_u16_le(payload, profile.weight_offset())?;
    let kg = if flags.is_pounds() {
        f32::from(raw) / 100.0 * KG_PER_LB
    } else {
        f32::from(raw) / profile.divisor()
    };
    Some(kg)
}

/// Decode one frame under a fixed profile.
///
/// Returns `None` for frames shorter than the profile's minimum and for weights outside
/// `limits`, except that a weight-removed frame only needs a finite weight. Never panics
/// on arbitrary input.
pub fn decode_frame(
    frame: &RawFrame,
    profile: FirmwareProfile,
    limits: &WeightLimits,
) -> Option<CandidateMeasurement> {
    let payload = frame.payload.as_slice();
    let Some(&control) = payload.first() else {
        tracing::debug!("dropping empty frame");
        return None;
    };
    let flags = ControlFlags(control);

    let Some(weight_kg) = raw_weight_kg(payload, flags, profile) else {
        tracing::debug!(len = payload.len(), %profile, "dropping short frame");
        return None;
    };
    let in_range = if flags.is_weight_removed() {
        weight_kg.is_finite()
    } else {
        limits.contains(weight_kg)
    };
    if !in_range {
        tracing::debug!(weight_kg, %profile, "dropping out-of-range weight");
        return None;
    }

    let impedance_ohms = if payload.len() >= IMPEDANCE_FRAME_LEN {
        read_u16_le(payload, profile.impedance_offset()).filter(|&z| z != 0)
    } else {
        None
    };

    Some(CandidateMeasurement {
        weight_kg,
        is_stabilized: flags.is_stabilized(),
        is_weight_removed: flags.is_weight_removed(),
        impedance_ohms,
        captured_at: frame.received_at,
        characteristic: frame.characteristic,
        channel: Channel::of(&frame.characteristic),
        profile,
    })
}

/// Per-device profile selection.
///
/// With a fixed selection every frame is decoded under that profile. In auto mode the
/// probe tries [`FirmwareProfile::PROBE_ORDER`] until one yields an in-range weight,
/// then locks that profile until [`ProfileProbe::reset`]. A weight-removed frame never
/// locks: its ~0 kg payload decodes under every layout.
#[derive(Debug, Clone)]
pub struct ProfileProbe {
    selection: ProfileSelection,
    locked: Option<FirmwareProfile>,
}

impl ProfileProbe {
    pub fn new(selection: ProfileSelection) -> Self {
        let locked = match selection {
            ProfileSelection::Fixed(p) => Some(p),
            ProfileSelection::Auto => None,
        };
        Self { selection, locked }
    }

    /// Profile in use, if one has been fixed or probed.
    pub fn locked(&self) -> Option<FirmwareProfile> {
        self.locked
    }

    /// Forget a probed profile (new device). A fixed selection stays fixed.
    pub fn reset(&mut self) {
        if let ProfileSelection::Auto = self.selection {
            self.locked = None;
        }
    }

    pub fn decode(&mut self, frame: &RawFrame, limits: &WeightLimits) -> Option<CandidateMeasurement> {
        if let Some(profile) = self.locked {
            return decode_frame(frame, profile, limits);
        }
        for profile in FirmwareProfile::PROBE_ORDER {
            if let Some(c) = decode_frame(frame, profile, limits) {
                if c.is_weight_removed {
                    return Some(c);
                }
                tracing::info!(%profile, "firmware profile locked");
                self.locked = Some(profile);
                return Some(c);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(bytes: &[u8]) -> RawFrame {
        RawFrame::new(gatt::STANDARD_MEASUREMENT, bytes, Instant::now())
    }

    #[test]
    fn control_flags_bits() {
        let f = ControlFlags(0b1010_1111);
        assert!(f.is_pounds());
        assert!(f.has_timestamp());
        assert!(f.has_user_id());
        assert!(f.has_bmi());
        assert!(f.is_stabilized());
        assert!(f.is_weight_removed());
        let f = ControlFlags(0);
        assert!(!f.is_pounds() && !f.is_stabilized() && !f.is_weight_removed());
    }

    #[rstest]
    #[case(&[], None)]
    #[case(&[0x00], None)]
    #[case(&[0x00, 0xb0], None)]
    #[case(&[0x00, 0xb0, 0x36], Some(70.0))]
    fn mi2_minimum_length(#[case] bytes: &[u8], #[case] expected: Option<f32>) {
        let got = decode_frame(&frame(bytes), FirmwareProfile::Mi2, &WeightLimits::default())
            .map(|c| c.weight_kg);
        assert_eq!(got, expected);
    }

    #[test]
    fn centigram_reads_offset_two() {
        let c = decode_frame(
            &frame(&[0x00, 0xff, 0xb0, 0x36]),
            FirmwareProfile::Centigram,
            &WeightLimits::default(),
        )
        .expect("in range");
        assert!((c.weight_kg - 140.0).abs() < 1e-4);
        assert_eq!(c.profile, FirmwareProfile::Centigram);
    }

    #[test]
    fn pounds_use_hundredths_of_a_pound() {
        // raw 15432 -> 154.32 lb -> ~70.0 kg
        let raw = 15_432u16.to_le_bytes();
        let c = decode_frame(
            &frame(&[0x01, raw[0], raw[1]]),
            FirmwareProfile::Mi2,
            &WeightLimits::default(),
        )
        .expect("in range");
        assert!((c.weight_kg - 69.998).abs() < 0.01, "got {}", c.weight_kg);
    }

    #[test]
    fn impedance_per_profile_offset() {
        let mut mi2 = [0u8; 13];
        mi2[0] = 0x20;
        mi2[1..3].copy_from_slice(&14_000u16.to_le_bytes());
        mi2[9..11].copy_from_slice(&500u16.to_le_bytes());
        let c = decode_frame(&frame(&mi2), FirmwareProfile::Mi2, &WeightLimits::default())
            .expect("decodes");
        assert_eq!(c.impedance_ohms, Some(500));
        assert!(c.is_stabilized);

        let mut cg = [0u8; 13];
        cg[2..4].copy_from_slice(&7_000u16.to_le_bytes());
        cg[11..13].copy_from_slice(&480u16.to_le_bytes());
        let c = decode_frame(&frame(&cg), FirmwareProfile::Centigram, &WeightLimits::default())
            .expect("decodes");
        assert_eq!(c.impedance_ohms, Some(480));
        assert!((c.weight_kg - 70.0).abs() < 1e-4);
    }

    #[test]
    fn zero_impedance_and_short_frames_have_none() {
        let mut bytes = [0u8; 13];
        bytes[1..3].copy_from_slice(&14_000u16.to_le_bytes());
        let c = decode_frame(&frame(&bytes), FirmwareProfile::Mi2, &WeightLimits::default())
            .expect("decodes");
        assert_eq!(c.impedance_ohms, None);

        let mut short = [0u8; 12];
        short[1..3].copy_from_slice(&14_000u16.to_le_bytes());
        short[9..11].copy_from_slice(&500u16.to_le_bytes());
        let c = decode_frame(&frame(&short), FirmwareProfile::Mi2, &WeightLimits::default())
            .expect("decodes");
        assert_eq!(c.impedance_ohms, None);
    }

    #[test]
    fn channel_classification() {
        assert_eq!(Channel::of(&gatt::STANDARD_MEASUREMENT), Channel::Standard);
        assert_eq!(Channel::of(&gatt::short_uuid(0x2a2f)), Channel::Generic);
    }

    #[test]
    fn probe_falls_back_then_locks() {
        // Mi2 reads 0 kg (out of range); Centigram reads 0x1b00 / 100 = 69.12 kg.
        let bytes = [0x00, 0x00, 0x00, 0x1b];
        let mut probe = ProfileProbe::new(ProfileSelection::Auto);
        let c = probe
            .decode(&frame(&bytes), &WeightLimits::default())
            .expect("alternate succeeds");
        assert_eq!(c.profile, FirmwareProfile::Centigram);
        assert_eq!(probe.locked(), Some(FirmwareProfile::Centigram));

        // Locked: a frame only Mi2 could decode is now rejected.
        assert!(
            probe
                .decode(&frame(&[0x00, 0xb0, 0x36]), &WeightLimits::default())
                .is_none()
        );

        probe.reset();
        assert_eq!(probe.locked(), None);
        let c = probe
            .decode(&frame(&[0x00, 0xb0, 0x36]), &WeightLimits::default())
            .expect("primary succeeds");
        assert_eq!(c.profile, FirmwareProfile::Mi2);
    }

    #[test]
    fn weight_removed_frame_skips_range_check() {
        let removed = frame(&[0x82, 0x00, 0x00]);
        let c = decode_frame(&removed, FirmwareProfile::Mi2, &WeightLimits::default())
            .expect("removal frame decodes");
        assert!(c.is_weight_removed);
        assert!(c.weight_kg.abs() < 1e-6);
        // Without bit 7 the same payload is out of range.
        assert!(
            decode_frame(&frame(&[0x02, 0x00, 0x00]), FirmwareProfile::Mi2, &WeightLimits::default())
                .is_none()
        );
    }

    #[test]
    fn weight_removed_frame_does_not_lock_profile() {
        let mut probe = ProfileProbe::new(ProfileSelection::Auto);
        let c = probe
            .decode(&frame(&[0x82, 0x00, 0x00, 0x00]), &WeightLimits::default())
            .expect("removal frame decodes");
        assert!(c.is_weight_removed);
        assert_eq!(probe.locked(), None);
    }

    #[test]
    fn fixed_selection_survives_reset() {
        let mut probe = ProfileProbe::new(ProfileSelection::Fixed(FirmwareProfile::Mi2));
        probe.reset();
        assert_eq!(probe.locked(), Some(FirmwareProfile::Mi2));
    }
}
