//! Weighing commands: session assembly, the run itself, and result rendering.

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use eyre::WrapErr;
use miscale_config::{CapturedFrame, Config, ProfileName};
use miscale_core::error::Result as CoreResult;
use miscale_core::{
    FinalizedMeasurement, FirmwareProfile, ListenMode, ScaleSession, SessionOutcome, SessionStats,
    WeightTrend,
};
use miscale_traits::{Clock, FrameSource, ManualClock, MonotonicClock};
use miscale_transport::{FrameLayout, ReplayTransport, ScriptedFrame, SimulatedScale};

use crate::cli::{LayoutArg, ProfileArg, SessionArgs};

/// Listener queue depth for `--threaded`.
const LISTENER_CAPACITY: usize = 64;

/// Exit code for a session that timed out (with or without a fallback reading).
pub const EXIT_TIMED_OUT: i32 = 3;
/// Exit code for a session cancelled by Ctrl-C.
pub const EXIT_CANCELLED: i32 = 4;

impl From<ProfileArg> for ProfileName {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Auto => Self::Auto,
            ProfileArg::Mi2 => Self::Mi2,
            ProfileArg::Centigram => Self::Centigram,
        }
    }
}

impl From<LayoutArg> for FrameLayout {
    fn from(l: LayoutArg) -> Self {
        match l {
            LayoutArg::Mi2 => Self::Mi2,
            LayoutArg::Centigram => Self::Centigram,
        }
    }
}

/// Fold command-line overrides into the loaded config before it is validated.
pub fn apply_overrides(cfg: &mut Config, args: &SessionArgs) {
    if let Some(h) = args.height {
        cfg.user.height_cm = h;
    }
    if let Some(p) = args.profile {
        cfg.decoder.profile = p.into();
    }
}

/// Everything the renderers need about one finished run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: SessionOutcome,
    pub profile: Option<FirmwareProfile>,
    pub stats: SessionStats,
    pub height_cm: f32,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            SessionOutcome::Stabilized(_) => 0,
            SessionOutcome::TimedOut { .. } => EXIT_TIMED_OUT,
            SessionOutcome::Cancelled => EXIT_CANCELLED,
        }
    }

    fn outcome_name(&self) -> &'static str {
        match self.outcome {
            SessionOutcome::Stabilized(_) => "stabilized",
            SessionOutcome::TimedOut { .. } => "timed_out",
            SessionOutcome::Cancelled => "cancelled",
        }
    }
}

/// Turn capture rows into a replay script.
pub fn script_from_capture(rows: Vec<CapturedFrame>) -> Vec<ScriptedFrame> {
    rows.into_iter()
        .map(|r| ScriptedFrame {
            at_ms: r.t_ms,
            characteristic: r.characteristic,
            payload: r.payload,
        })
        .collect()
}

/// Simulator knobs from the `simulate` command.
#[derive(Debug, Clone)]
pub struct SimulateOpts {
    pub weight_kg: f32,
    pub impedance: Option<u16>,
    pub layout: LayoutArg,
    pub pounds: bool,
    pub mirror_ms: Option<u64>,
    pub no_settle: bool,
    pub noise_kg: Option<f32>,
    pub seed: Option<u32>,
}

pub fn simulated_script(opts: &SimulateOpts) -> Vec<ScriptedFrame> {
    let mut sim = SimulatedScale {
        impedance: opts.impedance,
        layout: opts.layout.into(),
        pounds: opts.pounds,
        mirror_ms: opts.mirror_ms,
        ..SimulatedScale::new(opts.weight_kg)
    };
    if let Some(n) = opts.noise_kg {
        sim.noise_kg = n;
    }
    if let Some(s) = opts.seed {
        sim.seed = s;
    }
    if opts.no_settle {
        sim.settle_frames = 0;
        sim.step_off = false;
    }
    sim.script()
}

/// Replay `script` through a fresh session built from `cfg`.
///
/// Without `realtime` the replay and the session share a `ManualClock`, so waiting
/// (including the session timeout) costs no wall-clock time. In threaded mode the
/// listener may run that clock ahead once the script is exhausted; queued frames are
/// still judged by their own arrival stamps.
pub fn weigh(
    cfg: &Config,
    args: &SessionArgs,
    script: Vec<ScriptedFrame>,
    shutdown: &AtomicBool,
) -> CoreResult<RunReport> {
    if args.realtime {
        let clock = MonotonicClock::new();
        let mode = listen_mode(args.threaded);
        let source = ReplayTransport::new(script, clock);
        drive(cfg, args, source, Box::new(clock), mode, shutdown)
    } else {
        let clock = ManualClock::new();
        let mode = listen_mode(args.threaded);
        let source = ReplayTransport::new(script, clock.clone());
        drive(cfg, args, source, Box::new(clock), mode, shutdown)
    }
}

fn listen_mode(threaded: bool) -> ListenMode {
    if threaded {
        ListenMode::Threaded {
            capacity: LISTENER_CAPACITY,
        }
    } else {
        ListenMode::Direct
    }
}

fn drive<S>(
    cfg: &Config,
    args: &SessionArgs,
    source: S,
    clock: Box<dyn Clock + Send + Sync>,
    mode: ListenMode,
    shutdown: &AtomicBool,
) -> CoreResult<RunReport>
where
    S: FrameSource + Send + 'static,
{
    let mut session: ScaleSession =
        miscale_core::build_session(cfg, Some(clock)).wrap_err("building session")?;
    session.set_previous_weight_kg(args.previous_kg);

    let height_cm = cfg.user.height_cm;
    let started = Instant::now();
    let outcome = miscale_core::run(&mut session, source, height_cm, Some(shutdown), mode)?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let stats = session.stats();
    tracing::info!(
        frames = stats.frames,
        dropped = stats.dropped,
        duplicates = stats.duplicates,
        removals = stats.removals,
        duration_ms,
        "session finished"
    );
    Ok(RunReport {
        outcome,
        profile: session.profile(),
        stats,
        height_cm,
        duration_ms,
    })
}

/// One JSON line describing the run.
pub fn render_json(report: &RunReport) -> String {
    use serde_json::json;

    json!({
        "outcome": report.outcome_name(),
        "measurement": report.outcome.measurement(),
        "profile": report.profile,
        "height_cm": report.height_cm,
        "duration_ms": report.duration_ms,
        "frames": report.stats.frames,
        "dropped": report.stats.dropped,
        "duplicates": report.stats.duplicates,
        "removals": report.stats.removals,
    })
    .to_string()
}

/// Plain-text summary for the terminal.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let headline = match &report.outcome {
        SessionOutcome::Stabilized(_) => "Weighing complete.".to_string(),
        SessionOutcome::TimedOut { fallback: Some(_) } => {
            "Timed out before the weight settled; showing the most recent reading.".to_string()
        }
        SessionOutcome::TimedOut { fallback: None } => {
            "Timed out; no weight was captured.".to_string()
        }
        SessionOutcome::Cancelled => "Weighing cancelled.".to_string(),
    };
    out.push_str(&headline);
    out.push('\n');
    if let Some(m) = report.outcome.measurement() {
        out.push_str(&render_measurement(m, report.profile));
    }
    out
}

fn render_measurement(m: &FinalizedMeasurement, profile: Option<FirmwareProfile>) -> String {
    let mut lines = Vec::with_capacity(8);
    let profile = profile.map_or("unknown", FirmwareProfile::name);
    lines.push(format!(
        "Weight: {:.2} kg ({} sample(s), profile {profile})",
        m.weight_kg, m.sample_count
    ));
    lines.push(format!("BMI: {:.1} ({})", m.bmi, m.bmi_category.label()));
    match &m.composition {
        Some(c) => {
            lines.push(format!("Body fat: {:.1} %", c.body_fat_pct));
            lines.push(format!("Muscle mass: {:.1} kg", c.muscle_mass_kg));
            lines.push(format!("Body water: {:.1} %", c.body_water_pct));
            lines.push(format!(
                "Basal metabolism: {:.1} kcal",
                c.basal_metabolism_kcal
            ));
        }
        None => lines.push("Composition: unavailable (no impedance reported)".to_string()),
    }
    if let Some(t) = m.trend {
        let t = match t {
            WeightTrend::Up => "up",
            WeightTrend::Down => "down",
            WeightTrend::Steady => "steady",
        };
        lines.push(format!("Trend: {t}"));
    }
    if m.is_degraded() {
        lines.push("Note: single reading, not stabilized".to_string());
    }
    let mut s = lines.join("\n");
    s.push('\n');
    s
}

/// Run one default simulated weighing against `cfg`; errors unless it stabilizes.
pub fn self_check(cfg: &Config) -> CoreResult<RunReport> {
    let args = SessionArgs {
        height: None,
        profile: None,
        previous_kg: None,
        threaded: false,
        realtime: false,
    };
    let script = SimulatedScale::new(70.0).script();
    let report = weigh(cfg, &args, script, &AtomicBool::new(false))?;
    if !matches!(report.outcome, SessionOutcome::Stabilized(_)) {
        eyre::bail!(
            "self-check: simulated weighing ended as {} instead of stabilizing",
            report.outcome_name()
        );
    }
    Ok(report)
}
