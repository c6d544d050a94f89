//! Trimming of engine output for error messages and task reasons.

const MAX_LINE_LENGTH: usize = 200;
const MAX_TOTAL_LENGTH: usize = 1000;

fn truncate_chars(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Reduce raw subprocess output to something safe to surface to a caller.
///
/// Keeps at most `max_lines` lines, each cut to a fixed width, and caps the
/// total length.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    let mut result = String::new();

    for line in output.lines().take(max_lines) {
        let line = line.trim_end();
        let truncated = if line.chars().count() > MAX_LINE_LENGTH {
            format!("{}...", truncate_chars(line, MAX_LINE_LENGTH))
        } else {
            line.to_string()
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            return result;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if output.lines().count() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}
