//! `decode`: show what the decoder makes of a single payload.

use std::time::Instant;

use eyre::WrapErr;
use miscale_core::config::DecoderCfg;
use miscale_core::{
    CandidateMeasurement, ControlFlags, FirmwareProfile, ProfileProbe, ProfileSelection,
    WeightLimits,
};
use miscale_traits::RawFrame;
use miscale_traits::gatt::parse_characteristic;

use crate::cli::ProfileArg;

/// Decoder verdict under one profile; `candidate` is `None` when the frame was dropped.
#[derive(Debug)]
pub struct Verdict {
    pub profile: FirmwareProfile,
    pub candidate: Option<CandidateMeasurement>,
}

#[derive(Debug)]
pub struct Inspection {
    pub len: usize,
    pub flags: Option<ControlFlags>,
    pub verdicts: Vec<Verdict>,
}

/// Parse hex with optional whitespace or `:` separators.
pub fn parse_payload(s: &str) -> eyre::Result<Vec<u8>> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&compact).wrap_err_with(|| format!("invalid hex payload '{s}'"))
}

pub fn inspect(
    payload: &str,
    characteristic: &str,
    profile: Option<ProfileArg>,
    decoder: &DecoderCfg,
) -> eyre::Result<Inspection> {
    let bytes = parse_payload(payload)?;
    let characteristic = parse_characteristic(characteristic)
        .ok_or_else(|| eyre::eyre!("invalid characteristic id '{characteristic}'"))?;
    let frame = RawFrame::new(characteristic, bytes, Instant::now());
    let limits = WeightLimits {
        min_kg: decoder.min_weight_kg,
        max_kg: decoder.max_weight_kg,
    };

    let verdicts = match profile {
        Some(ProfileArg::Mi2) => vec![verdict(&frame, FirmwareProfile::Mi2, &limits)],
        Some(ProfileArg::Centigram) => vec![verdict(&frame, FirmwareProfile::Centigram, &limits)],
        Some(ProfileArg::Auto) => {
            let mut probe = ProfileProbe::new(ProfileSelection::Auto);
            let candidate = probe.decode(&frame, &limits);
            probe
                .locked()
                .map(|profile| Verdict { profile, candidate })
                .into_iter()
                .collect()
        }
        None => FirmwareProfile::PROBE_ORDER
            .iter()
            .map(|&p| verdict(&frame, p, &limits))
            .collect(),
    };

    Ok(Inspection {
        len: frame.len(),
        flags: frame.payload.first().copied().map(ControlFlags),
        verdicts,
    })
}

fn verdict(frame: &RawFrame, profile: FirmwareProfile, limits: &WeightLimits) -> Verdict {
    Verdict {
        profile,
        candidate: miscale_core::decode_frame(frame, profile, limits),
    }
}

pub fn render_json(ins: &Inspection) -> String {
    use serde_json::json;

    let flags = ins.flags.map(|f| {
        json!({
            "raw": f.0,
            "pounds": f.is_pounds(),
            "timestamp": f.has_timestamp(),
            "user_id": f.has_user_id(),
            "bmi": f.has_bmi(),
            "stabilized": f.is_stabilized(),
            "weight_removed": f.is_weight_removed(),
        })
    });
    let verdicts: Vec<_> = ins
        .verdicts
        .iter()
        .map(|v| {
            json!({
                "profile": v.profile,
                "candidate": v.candidate.as_ref().map(|c| json!({
                    "weight_kg": c.weight_kg,
                    "is_stabilized": c.is_stabilized,
                    "is_weight_removed": c.is_weight_removed,
                    "impedance_ohms": c.impedance_ohms,
                    "channel": c.channel,
                })),
            })
        })
        .collect();
    json!({ "len": ins.len, "flags": flags, "profiles": verdicts }).to_string()
}

pub fn render_text(ins: &Inspection) -> String {
    let mut lines = vec![format!("Length: {} byte(s)", ins.len)];
    if let Some(f) = ins.flags {
        lines.push(format!(
            "Flags: 0x{:02x} (unit {}, stabilized {}, weight removed {})",
            f.0,
            if f.is_pounds() { "lb" } else { "kg" },
            f.is_stabilized(),
            f.is_weight_removed()
        ));
    }
    if ins.verdicts.is_empty() {
        lines.push("No profile yields an in-range weight.".to_string());
    }
    for v in &ins.verdicts {
        match &v.candidate {
            Some(c) => {
                let z = c
                    .impedance_ohms
                    .map_or_else(|| "none".to_string(), |z| format!("{z} ohm"));
                lines.push(format!(
                    "{}: {:.2} kg, impedance {z}",
                    v.profile, c.weight_kg
                ));
            }
            None => lines.push(format!("{}: dropped", v.profile)),
        }
    }
    let mut s = lines.join("\n");
    s.push('\n');
    s
}
