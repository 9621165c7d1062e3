//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use miscale_core::error::{BuildError, ScaleError};

    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [decoder], [stabilization], [session] or [estimator] sections.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::Disconnected => "What happened: The scale disconnected before the weighing finished.\nLikely causes: The scale went to sleep, moved out of range, or the capture ended early.\nHow to fix: Step on the scale to wake it and start a new weighing.".to_string(),
            ScaleError::Timeout => "What happened: Timed out waiting for a notification.\nLikely causes: The scale is not advertising or notifications were not subscribed.\nHow to fix: Wake the scale and check that the measurement characteristic is subscribed.".to_string(),
            ScaleError::InvalidHeight(h) => format!(
                "What happened: Height {h} cm is outside the accepted range.\nLikely causes: A typo in --height or [user].height_cm, or the value was given in metres.\nHow to fix: Give the height in centimetres, between 50 and 250."
            ),
            ScaleError::SessionInProgress => "What happened: A weighing session is already collecting.\nLikely causes: A second weighing was started before the first one finished.\nHow to fix: Wait for the session to finish or cancel it first.".to_string(),
            ScaleError::Config(msg) => format!(
                "What happened: Configuration rejected ({msg}).\nLikely causes: Out-of-range or unknown values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            ScaleError::Transport(msg) => format!(
                "What happened: Transport error ({msg}).\nLikely causes: Bluetooth adapter failure or a broken notification stream.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: A syntax error, an unknown profile name, or a value of the wrong type.\nHow to fix: Fix the config file. Parser said: {}",
            te.message()
        );
    }

    // String-based heuristics for errors coming from file loading
    let msg = err.to_string();
    let chain = format!("{err:#}");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("capture csv must have headers") {
        return "Invalid headers in capture CSV. Expected 't_ms,characteristic,payload'.".to_string();
    }

    if lower.contains("goes back in time") {
        return "What happened: Capture rows are out of order.\nLikely causes: The capture was edited or merged from several files.\nHow to fix: Sort the rows by t_ms.".to_string();
    }

    if lower.contains("invalid csv row") {
        return format!(
            "What happened: A capture row could not be read.\nLikely causes: A non-numeric t_ms, an unknown characteristic id, or a payload that is not hex.\nHow to fix: Fix the row named here: {chain}"
        );
    }

    if lower.contains("invalid hex payload") {
        return format!(
            "What happened: The payload is not valid hex.\nLikely causes: An odd number of digits or a stray character.\nHow to fix: Pass the bytes as hex pairs, optionally separated by spaces or ':'. Original: {chain}"
        );
    }

    if lower.contains("open capture csv") || lower.contains("read config") {
        return format!(
            "What happened: An input file could not be opened.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path and rerun. Original: {chain}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name for an error, used as `reason` in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    use miscale_core::error::{BuildError, ScaleError};

    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Disconnected) => "Disconnected",
        Some(ScaleError::Timeout) => "Timeout",
        Some(ScaleError::InvalidHeight(_)) => "InvalidHeight",
        Some(ScaleError::SessionInProgress) => "SessionInProgress",
        Some(ScaleError::Config(_)) => "InvalidConfig",
        Some(ScaleError::Transport(_)) => "Transport",
        None => "Error",
    }
}

/// Errors always exit with 1; 3 and 4 are reserved for timed-out and cancelled sessions.
pub fn exit_code_for_error(_err: &eyre::Report) -> i32 {
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "outcome": "error",
        "reason": reason_name(err),
        "message": humanize(err),
    })
    .to_string()
}
