//! Frame encoding as the scale firmware does it. Used by the simulator.

/// Byte layouts a simulated scale can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLayout {
    /// Weight at offset 1 in 5 g units, impedance at offset 9.
    #[default]
    Mi2,
    /// Weight at offset 2 in 10 g units, impedance at offset 11.
    Centigram,
}

impl FrameLayout {
    const fn weight_offset(self) -> usize {
        match self {
            Self::Mi2 => 1,
            Self::Centigram => 2,
        }
    }

    const fn units_per_kg(self) -> f32 {
        match self {
            Self::Mi2 => 200.0,
            Self::Centigram => 100.0,
        }
    }

    const fn impedance_offset(self) -> usize {
        match self {
            Self::Mi2 => 9,
            Self::Centigram => 11,
        }
    }
}

pub const FLAG_POUNDS: u8 = 1 << 0;
pub const FLAG_STABILIZED: u8 = 1 << 5;
pub const FLAG_WEIGHT_REMOVED: u8 = 1 << 7;

/// Full-length frame length (control byte through impedance).
pub const FRAME_LEN: usize = 13;

const LB_PER_KG: f32 = 1.0 / 0.453_592;

/// Encode a 13-byte measurement frame.
///
/// Weights that do not fit the 16-bit field saturate. With `FLAG_POUNDS` set, the
/// weight is written in hundredths of a pound regardless of layout.
pub fn encode_frame(layout: FrameLayout, flags: u8, weight_kg: f32, impedance: Option<u16>) -> Vec<u8> {
    let mut out = vec![0u8; FRAME_LEN];
    out[0] = flags;
    let units = if flags & FLAG_POUNDS != 0 {
        weight_kg * LB_PER_KG * 100.0
    } else {
        weight_kg * layout.units_per_kg()
    };
    let raw = units.round().clamp(0.0, f32::from(u16::MAX)) as u16;
    let w = layout.weight_offset();
    out[w..w + 2].copy_from_slice(&raw.to_le_bytes());
    if let Some(z) = impedance {
        let i = layout.impedance_offset();
        out[i..i + 2].copy_from_slice(&z.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mi2_layout() {
        let f = encode_frame(FrameLayout::Mi2, FLAG_STABILIZED, 70.0, Some(500));
        assert_eq!(f.len(), FRAME_LEN);
        assert_eq!(f[0], 0x20);
        assert_eq!(u16::from_le_bytes([f[1], f[2]]), 14_000);
        assert_eq!(u16::from_le_bytes([f[9], f[10]]), 500);
    }

    #[test]
    fn centigram_layout() {
        let f = encode_frame(FrameLayout::Centigram, 0, 70.0, Some(480));
        assert_eq!(u16::from_le_bytes([f[2], f[3]]), 7_000);
        assert_eq!(u16::from_le_bytes([f[11], f[12]]), 480);
    }

    #[test]
    fn saturates_large_weights() {
        let f = encode_frame(FrameLayout::Mi2, 0, 1_000.0, None);
        assert_eq!(u16::from_le_bytes([f[1], f[2]]), u16::MAX);
    }
}
