use serde::Serialize;

use crate::age::AgeResult;
use crate::session::InsightSlot;

const ALIGN_WIDTH: usize = 36;

pub const INSIGHT_LOADING: &str = "Loading historical insight...";
pub const INSIGHT_UNAVAILABLE: &str = "Insights unavailable.";

// Utilities for building aligned text rows

fn build_stat_row(key: &str, value: &str, align_width: usize) -> String {
    let key_part = format!("{key}: ");
    let base_len = key_part.len() + value.len();
    let available = align_width.saturating_sub(base_len);

    let dots = match available {
        0 => "".to_string(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => format!("{} ", ".".repeat(n - 1)),
    };

    format!("{key_part}{dots}{value}")
}

fn build_header_line(label: &str, align_width: usize) -> String {
    let base = format!("-- {label} ");
    let dash_count = align_width.saturating_sub(base.len());
    format!("{base}{}", "-".repeat(dash_count))
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Renders the calculation panel: headline, totals and next birthday.
pub fn render_result(result: &AgeResult) -> String {
    let mut lines = vec![
        build_header_line("You are currently", ALIGN_WIDTH),
        format!("{} old", result.summary()),
        String::new(),
        build_header_line("Totals", ALIGN_WIDTH),
    ];

    let totals = [
        ("Total Months", u64::from(result.total_months)),
        ("Total Weeks", result.total_weeks),
        ("Total Days", result.total_days),
        ("Total Hours", result.total_hours),
    ];
    for (label, value) in totals {
        lines.push(build_stat_row(label, &group_thousands(value), ALIGN_WIDTH));
    }

    let next = &result.next_birthday;
    lines.push(String::new());
    lines.push(build_header_line("Next Birthday", ALIGN_WIDTH));
    if next.is_today() {
        lines.push(format!("Today is your birthday, a {}!", next.day_of_week));
    } else {
        lines.push(build_stat_row("Months", &next.months.to_string(), ALIGN_WIDTH));
        lines.push(build_stat_row("Days", &next.days.to_string(), ALIGN_WIDTH));
        lines.push(format!(
            "Your special day is coming up on a {} ({}).",
            next.day_of_week, next.date
        ));
    }

    lines.join("\n")
}

/// Renders the insight panel for the current slot state.
pub fn render_insight(slot: &InsightSlot) -> String {
    let body = match slot {
        InsightSlot::Loading => INSIGHT_LOADING,
        InsightSlot::Ready(text) => text.as_str(),
        InsightSlot::Idle | InsightSlot::Unavailable => INSIGHT_UNAVAILABLE,
    };

    format!(
        "{}\n{body}",
        build_header_line("AI Historical Insights", ALIGN_WIDTH)
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    #[serde(flatten)]
    age: &'a AgeResult,
    insight: Option<&'a str>,
    insight_status: &'static str,
}

/// JSON document with the widget's field names plus the insight text, if any,
/// and the insight state (`loading`, `ready` or `unavailable`).
pub fn render_json(result: &AgeResult, slot: &InsightSlot) -> serde_json::Result<String> {
    let (insight, insight_status) = match slot {
        InsightSlot::Ready(text) => (Some(text.as_str()), "ready"),
        InsightSlot::Loading => (None, "loading"),
        InsightSlot::Idle | InsightSlot::Unavailable => (None, "unavailable"),
    };
    serde_json::to_string_pretty(&Report {
        age: result,
        insight,
        insight_status,
    })
}
