//! Human-readable error descriptions and structured JSON error formatting.

use loadnode_core::error::{BuildError, CalibrationError, NodeError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(ne) = err.downcast_ref::<NodeError>() {
        return match ne {
            NodeError::Timeout => "What happened: Load cell read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeouts.sensor_ms too low.\nHow to fix: Verify DT/SCK pins and power, and consider raising timeouts.sensor_ms in the config.".to_string(),
            NodeError::Hardware(m) | NodeError::HardwareFault(m) => format!(
                "What happened: Load cell fault ({m}).\nLikely causes: Wrong [pins], GPIO permissions, or a damaged amplifier.\nHow to fix: Check the [pins] section and wiring; run with --log-level=debug for driver detail."
            ),
            NodeError::Link(m) => format!(
                "What happened: Serial link failed ({m}).\nLikely causes: Host closed the port or the UART is unavailable.\nHow to fix: Reconnect the host application and restart the node."
            ),
            NodeError::Storage(m) => format!(
                "What happened: Calibration store failed ({m}).\nLikely causes: Unwritable [storage].path or a corrupt store file.\nHow to fix: Check the file permissions, or move the store file aside to start uncalibrated."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return format!(
            "What happened: {ce}.\nLikely causes: Readings taken without a load change, or a zero reference load.\nHow to fix: Repeat the measurement with the reference load on the cell."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reference csv must have headers") {
        return "Invalid headers in reference CSV. Expected 'reading,load'.".to_string();
    }

    if lower.contains("parse config") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Malformed TOML or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("gpio") || lower.contains("uart") {
        return format!(
            "What happened: Failed to initialize hardware ({msg}).\nLikely causes: Incorrect pin numbers, missing [pins], or insufficient permissions.\nHow to fix: Fix the [pins]/[serial] values; ensure the process may access GPIO and the UART."
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

/// Stable exit codes for failures the operator can act on; anything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<NodeError>() {
        Some(NodeError::Timeout) => 3,
        Some(NodeError::Hardware(_) | NodeError::HardwareFault(_)) => 4,
        Some(NodeError::Link(_)) => 5,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ne) = err.downcast_ref::<NodeError>() {
        return match ne {
            NodeError::Timeout => "SensorTimeout",
            NodeError::Hardware(_) | NodeError::HardwareFault(_) => "HardwareFault",
            NodeError::Link(_) => "LinkFault",
            NodeError::Storage(_) => "StorageFault",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if err.downcast_ref::<CalibrationError>().is_some() {
        return "CalibrationRejected";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
