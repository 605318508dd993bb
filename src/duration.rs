const SECONDS_PER_HOUR: f64 = 3600.0;

/// Parse `"HH:MM:SS"` into seconds.
///
/// Returns 0 when the string does not split into exactly three parts or when
/// any part is not a finite number. Blank parts count as zero.
pub fn parse_duration(value: &str) -> f64 {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return 0.0;
    }

    let mut numbers = [0.0f64; 3];
    for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
        match parse_component(part) {
            Some(number) => *slot = number,
            None => return 0.0,
        }
    }

    let [hours, minutes, seconds] = numbers;
    hours * SECONDS_PER_HOUR + minutes * 60.0 + seconds
}

/// Same contract as [`parse_duration`], expressed in fractional hours.
pub fn hours_from_duration(value: &str) -> f64 {
    parse_duration(value) / SECONDS_PER_HOUR
}

/// Format seconds as zero-padded `HH:MM:SS`, flooring each component.
///
/// Non-finite and negative input formats as `00:00:00`.
pub fn format_duration(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return "00:00:00".to_string();
    }

    let hours = (total_seconds / SECONDS_PER_HOUR).floor();
    let minutes = ((total_seconds % SECONDS_PER_HOUR) / 60.0).floor();
    let seconds = (total_seconds % 60.0).floor();
    format!("{:02}:{:02}:{:02}", hours as u64, minutes as u64, seconds as u64)
}

fn parse_component(part: &str) -> Option<f64> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}
