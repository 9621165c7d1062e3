#![no_main]
use std::time::Duration;

use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use miscale_core::{FirmwareProfile, ScaleSession, WeightLimits, decode_frame};
use miscale_traits::{Clock, ManualClock, RawFrame, gatt};

#[derive(Debug, Arbitrary)]
struct Input {
    frames: Vec<(bool, u16, Vec<u8>)>,
}

fuzz_target!(|input: Input| {
    let limits = WeightLimits::default();
    let clock = ManualClock::new();
    let Ok(mut session) = ScaleSession::builder()
        .with_clock(Box::new(clock.clone()))
        .build()
    else {
        return;
    };
    if session.start_session(170.0).is_err() {
        return;
    }

    for (generic, gap_ms, payload) in input.frames {
        let characteristic = if generic {
            gatt::WEIGHT_MEASUREMENT
        } else {
            gatt::STANDARD_MEASUREMENT
        };
        clock.advance(Duration::from_millis(u64::from(gap_ms)));
        let frame = RawFrame::new(characteristic, payload, clock.now());

        for profile in FirmwareProfile::PROBE_ORDER {
            if let Some(c) = decode_frame(&frame, profile, &limits) {
                assert!(c.is_weight_removed || limits.contains(c.weight_kg));
            }
        }
        // Frames must never panic the session, whatever the state.
        let _ = session.handle_frame(&frame);
    }
});
