/// Build version. Release pipelines stamp it through `REGIONPULSE_VERSION`.
pub const VERSION: &str = match option_env!("REGIONPULSE_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Sent on every outbound peer probe so target logs can tell probes apart
/// from user traffic.
pub fn user_agent() -> String {
    format!("regionpulse/{VERSION}")
}
