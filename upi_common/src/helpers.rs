use std::net::IpAddr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parses a comma-separated list of IP addresses. Entries that are not valid addresses are returned in the second
/// element so that the caller can report them.
pub fn parse_ip_list(value: &str) -> (Vec<IpAddr>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).for_each(|s| match s.parse::<IpAddr>() {
        Ok(ip) => valid.push(ip),
        Err(_) => invalid.push(s.to_string()),
    });
    (valid, invalid)
}
