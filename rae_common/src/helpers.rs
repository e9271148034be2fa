/// Parse an integer environment value, falling back to the default on absence or garbage.
pub fn parse_int_flag(value: Option<String>, default: i64) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
