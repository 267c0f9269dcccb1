use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// One timed subtitle entry parsed from a transcript block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Index line of the source block
    pub id: i64,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Subtitle text, lines joined with `\n`
    pub text: String,
}

impl Cue {
    pub fn new(id: i64, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into().trim().to_string(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.id,
            format_srt_timestamp(self.start),
            format_srt_timestamp(self.end),
            self.text
        )
    }
}

fn block_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\n\s*\n").expect("block separator pattern is valid"))
}

fn line_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\r?\n").expect("line separator pattern is valid"))
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2})[,.]([0-9]{1,3})$").expect("timestamp pattern is valid")
    })
}

/// Parse a transcript into cues sorted by start time.
///
/// Parsing never fails: blocks without a numeric index line or a ` --> `
/// timing line are skipped, and malformed timestamps decode to zero.
pub fn parse_srt(content: &str) -> Vec<Cue> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut cues: Vec<Cue> = block_separator()
        .split(content)
        .filter_map(parse_block)
        .collect();

    // Stable, so blocks sharing a start keep their file order
    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    cues
}

fn parse_block(block: &str) -> Option<Cue> {
    let lines: Vec<&str> = line_separator().split(block.trim()).collect();
    if lines.len() < 2 {
        return None;
    }

    let id = parse_leading_int(lines[0])?;

    let timing = lines[1];
    let arrow = timing.find(" --> ")?;
    let start = parse_timestamp(&timing[..arrow]);
    let end = parse_timestamp(&timing[arrow + 5..]);

    let text = lines[2..].join("\n").trim().to_string();

    Some(Cue {
        id,
        start,
        end,
        text,
    })
}

/// Leading integer of a line, ignoring anything after the digits.
pub(crate) fn parse_leading_int(line: &str) -> Option<i64> {
    let line = line.trim_start_matches('\u{feff}').trim_start();
    let (negative, rest) = match line.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, line.strip_prefix('+').unwrap_or(line)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    // Oversized index lines saturate instead of dropping the block
    let value = rest[..end].bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
    });
    Some(if negative { value.saturating_neg() } else { value })
}

/// Decode `HH:MM:SS,mmm` (or `.mmm`, 1–3 fraction digits) to seconds.
///
/// The fraction is right-padded, so `"00:00:00.5"` is half a second.
/// Anything that does not match decodes to `0.0`.
pub fn parse_timestamp(timestamp: &str) -> f64 {
    decode_timestamp(timestamp.trim()).unwrap_or(0.0)
}

fn decode_timestamp(timestamp: &str) -> Option<f64> {
    let caps = timestamp_pattern().captures(timestamp)?;

    let field = |i: usize| caps[i].parse::<u64>().ok();
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis: u64 = format!("{:0<3}", &caps[4]).parse().ok()?;

    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Serialize cues back into SRT text, renumbering from 1.
pub fn to_srt(cues: &[Cue]) -> String {
    let mut srt_content = String::new();

    for (i, cue) in cues.iter().enumerate() {
        let numbered = Cue {
            id: (i + 1) as i64,
            ..cue.clone()
        };
        srt_content.push_str(&numbered.to_string());
        srt_content.push('\n');
    }

    srt_content
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:04,000\nHello, world!\n\n2\n00:00:05,000 --> 00:00:08,000\nThis is a test.\nWith two lines.\n\n3\n00:00:09,000 --> 00:00:12,500\nFinal subtitle.\n";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_basic_srt() {
        let cues = parse_srt(SAMPLE);

        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].id, 1);
        assert!(approx(cues[0].start, 1.0));
        assert!(approx(cues[0].end, 4.0));
        assert_eq!(cues[0].text, "Hello, world!");
        assert_eq!(cues[1].text, "This is a test.\nWith two lines.");
        assert!(approx(cues[2].end, 12.5));
    }

    #[test]
    fn test_timestamp_decoding() {
        assert!(approx(parse_timestamp("00:01:23,456"), 83.456));
        assert!(approx(parse_timestamp("00:00:00.5"), 0.5));
        assert!(approx(parse_timestamp("00:00:01.25"), 1.25));
        assert!(approx(parse_timestamp("01:00:00,000"), 3600.0));
        assert!(approx(parse_timestamp("  00:00:02,000 "), 2.0));
    }

    #[test]
    fn test_malformed_timestamp_is_zero() {
        assert_eq!(parse_timestamp("garbage"), 0.0);
        assert_eq!(parse_timestamp("0:00:01,000"), 0.0);
        assert_eq!(parse_timestamp("00:00:01"), 0.0);
        assert_eq!(parse_timestamp("00:00:01,1234"), 0.0);
        assert_eq!(parse_timestamp(""), 0.0);
        // Only ASCII digits count
        assert_eq!(parse_timestamp("\u{0660}\u{0660}:00:05,000"), 0.0);
        assert_eq!(parse_timestamp("00:00:05,\u{0661}"), 0.0);
    }

    #[test]
    fn test_non_ascii_digits_decode_whole_time_to_zero() {
        let content = "1\n\u{0660}\u{0660}:00:05,000 --> 00:00:06,000\nkept\n";
        let cues = parse_srt(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 0.0);
        assert!(approx(cues[0].end, 6.0));
    }

    #[test]
    fn test_output_sorted_regardless_of_input_order() {
        let content = "3\n00:00:09,000 --> 00:00:10,000\nthird\n\n1\n00:00:01,000 --> 00:00:02,000\nfirst\n\n2\n00:00:05,000 --> 00:00:06,000\nsecond\n";
        let cues = parse_srt(content);

        let starts: Vec<f64> = cues.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![1.0, 5.0, 9.0]);
        assert_eq!(cues[0].text, "first");
        assert_eq!(cues[2].id, 3);
    }

    #[test]
    fn test_invalid_blocks_are_dropped() {
        let content = "lonely line\n\nabc\n00:00:01,000 --> 00:00:02,000\nno index\n\n2\n00:00:03,000 -> 00:00:04,000\nbad arrow\n\n4\n00:00:05,000 --> 00:00:06,000\nkept\n";
        let cues = parse_srt(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, 4);
        assert_eq!(cues[0].text, "kept");
    }

    #[test]
    fn test_malformed_times_keep_block() {
        let content = "1\nxx:00:01,000 --> 00:00:02,000\nstill here\n";
        let cues = parse_srt(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 0.0);
        assert!(approx(cues[0].end, 2.0));
    }

    #[test]
    fn test_crlf_bom_and_blank_whitespace_lines() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nfirst\r\n \r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nsecond\r\n";
        let cues = parse_srt(content);

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].id, 1);
        assert_eq!(cues[0].text, "first");
        assert_eq!(cues[1].text, "second");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("   \n\n  ").is_empty());
    }

    #[test]
    fn test_leading_int_matches_lenient_index_lines() {
        assert_eq!(parse_leading_int("12"), Some(12));
        assert_eq!(parse_leading_int(" 7 extra"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_leading_int("-99999999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn test_oversized_index_keeps_block() {
        let content = "123456789012345678901234567890\n00:00:01,000 --> 00:00:02,000\nhuge index\n";
        let cues = parse_srt(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, i64::MAX);
        assert_eq!(cues[0].text, "huge index");
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_srt_timestamp(3661.0), "01:01:01,000");
        assert_eq!(format_srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn test_to_srt_renumbers_and_reparses() {
        let cues = vec![
            Cue::new(10, 1.0, 2.0, "a"),
            Cue::new(20, 3.0, 4.5, "b\nc"),
        ];
        let srt = to_srt(&cues);

        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\na\n"));
        let reparsed = parse_srt(&srt);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[1].id, 2);
        assert_eq!(reparsed[1].text, "b\nc");
    }
}
