//! Time Normalizer
//!
//! Turns the loose date and time words of a question ("amanhã", "10/10",
//! "de manhã", "19h") into a concrete [`TimeWindow`] relative to a reference
//! instant.
//!
//! `normalize` is total. Anything it does not recognize degrades to a wide
//! window instead of an error:
//!
//! | input                         | result                                   |
//! |-------------------------------|------------------------------------------|
//! | no date, "today", "hoje"      | reference date                           |
//! | "tomorrow", "amanhã"          | reference date + 1                       |
//! | "day after tomorrow"          | reference date + 2                       |
//! | "yesterday", "ontem"          | reference date - 1                       |
//! | weekday name                  | next such day, the reference day included|
//! | "next"/"próxima" + weekday    | next such day after the reference day    |
//! | `dd/mm`, `dd/mm/yyyy`, ISO    | that date; impossible dates fall back    |
//! | other date text               | reference date                           |
//! | no time, "now", "agora"       | `[ref, ref + 1h)`                        |
//! | morning / afternoon / evening | 08-12 / 13-18 / 18-22                    |
//! | `19h`, `19h30`, `19:30`       | one hour from that minute                |
//! | other time text               | `[07:00, 23:00)`                         |
//!
//! Windows never cross midnight; an end past 24:00 is clamped to the last
//! instant of the day.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;
use sdk::TimeWindow;
use std::sync::OnceLock;

/// Fallback window for time text we can't read
pub const FALLBACK_START: (u32, u32) = (7, 0);
pub const FALLBACK_END: (u32, u32) = (23, 0);

/// Named periods of the day and their canonical windows
const PERIODS: &[(&[&str], (u32, u32), (u32, u32))] = &[
    (&["manha", "morning"], (8, 0), (12, 0)),
    (&["tarde", "afternoon"], (13, 0), (18, 0)),
    (&["noite", "evening", "night", "tonight"], (18, 0), (22, 0)),
];

/// Leading words that carry no date or time information
const FILLER_WORDS: &[&str] = &[
    "on", "at", "this", "next", "em", "na", "no", "as", "a", "proxima", "proximo", "nesta",
    "neste",
];

/// Words that push a weekday past the reference day ("next friday")
const NEXT_WORDS: &[&str] = &["next", "proxima", "proximo"];

static DAY_MONTH: OnceLock<Regex> = OnceLock::new();
static ISO_DATE: OnceLock<Regex> = OnceLock::new();
static CLOCK_TIME: OnceLock<Regex> = OnceLock::new();

fn day_month_pattern() -> &'static Regex {
    DAY_MONTH.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?$").expect("Invalid day/month pattern")
    })
}

fn iso_date_pattern() -> &'static Regex {
    ISO_DATE
        .get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("Invalid ISO pattern"))
}

fn clock_time_pattern() -> &'static Regex {
    CLOCK_TIME.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\s*(?:h\s*(\d{2})?|:(\d{2})\s*h?|\s+horas?)$")
            .expect("Invalid clock pattern")
    })
}

/// Resolve date and time expressions into a concrete window.
///
/// `None` and blank strings mean "not mentioned".
pub fn normalize(
    date_expr: Option<&str>,
    time_expr: Option<&str>,
    reference: NaiveDateTime,
) -> TimeWindow {
    let date = resolve_date(date_expr.unwrap_or(""), reference.date());
    let (start, end) = resolve_time(time_expr.unwrap_or(""), reference.time());

    let window = TimeWindow::new(date, start, end).unwrap_or(TimeWindow {
        date,
        start: hm(FALLBACK_START),
        end: hm(FALLBACK_END),
    });

    tracing::debug!(
        date_expr = date_expr.unwrap_or(""),
        time_expr = time_expr.unwrap_or(""),
        "Normalized to {}",
        window
    );

    window
}

/// Resolve a date expression against the reference date.
pub fn resolve_date(expr: &str, reference: NaiveDate) -> NaiveDate {
    let folded = fold(expr);
    let text = strip_fillers(&folded);

    match text.as_str() {
        "" | "today" | "hoje" => return reference,
        "tomorrow" | "amanha" => return reference + Duration::days(1),
        "day after tomorrow" | "depois de amanha" => return reference + Duration::days(2),
        "yesterday" | "ontem" => return reference - Duration::days(1),
        _ => {}
    }

    if let Some(weekday) = parse_weekday(&text) {
        let mut ahead = (weekday.num_days_from_monday() + 7
            - reference.weekday().num_days_from_monday())
            % 7;
        if ahead == 0 && folded.split(' ').any(|w| NEXT_WORDS.contains(&w)) {
            ahead = 7;
        }
        return reference + Duration::days(i64::from(ahead));
    }

    if let Some(caps) = day_month_pattern().captures(&text) {
        let day = caps[1].parse::<u32>().ok();
        let month = caps[2].parse::<u32>().ok();
        let year = match caps.get(3) {
            Some(y) if y.as_str().len() == 2 => y.as_str().parse::<i32>().ok().map(|y| 2000 + y),
            Some(y) => y.as_str().parse::<i32>().ok(),
            None => Some(reference.year()),
        };
        if let (Some(d), Some(m), Some(y)) = (day, month, year) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return date;
            }
        }
        return reference;
    }

    if let Some(caps) = iso_date_pattern().captures(&text) {
        let parsed = (
            caps[1].parse::<i32>().ok(),
            caps[2].parse::<u32>().ok(),
            caps[3].parse::<u32>().ok(),
        );
        if let (Some(y), Some(m), Some(d)) = parsed {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return date;
            }
        }
    }

    reference
}

/// Resolve a time expression against the reference time of day.
///
/// Returns `(start, end)` with `start < end`.
pub fn resolve_time(expr: &str, reference: NaiveTime) -> (NaiveTime, NaiveTime) {
    let text = strip_fillers(&fold(expr));

    if matches!(text.as_str(), "" | "now" | "agora" | "right now" | "ja") {
        return (reference, one_hour_after(reference));
    }

    if let Some(caps) = clock_time_pattern().captures(&text) {
        let hour = caps[1].parse::<u32>().ok();
        let minute = match caps.get(2).or_else(|| caps.get(3)) {
            Some(m) => m.as_str().parse::<u32>().ok(),
            None => Some(0),
        };
        if let Some(start) = hour
            .zip(minute)
            .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        {
            return (start, one_hour_after(start));
        }
        return (hm(FALLBACK_START), hm(FALLBACK_END));
    }

    for word in text.split(|c: char| !c.is_alphanumeric()) {
        for (names, start, end) in PERIODS {
            if names.contains(&word) {
                return (hm(*start), hm(*end));
            }
        }
    }

    (hm(FALLBACK_START), hm(FALLBACK_END))
}

fn one_hour_after(start: NaiveTime) -> NaiveTime {
    let (end, wrapped) = start.overflowing_add_signed(Duration::hours(1));
    if wrapped != 0 {
        end_of_day()
    } else {
        end
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_weekday(text: &str) -> Option<Weekday> {
    let word = text
        .trim_end_matches("-feira")
        .trim_end_matches(" feira")
        .trim();

    let weekday = match word {
        "monday" | "segunda" => Weekday::Mon,
        "tuesday" | "terca" => Weekday::Tue,
        "wednesday" | "quarta" => Weekday::Wed,
        "thursday" | "quinta" => Weekday::Thu,
        "friday" | "sexta" => Weekday::Fri,
        "saturday" | "sabado" => Weekday::Sat,
        "sunday" | "domingo" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Lowercase, trim and drop Portuguese diacritics.
fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_fillers(text: &str) -> String {
    let mut words: Vec<&str> = text.split(' ').collect();
    while words.len() > 1 && FILLER_WORDS.contains(&words[0]) {
        words.remove(0);
    }
    words.join(" ")
}
