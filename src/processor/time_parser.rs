use anyhow::anyhow;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use regex::Regex;
use thiserror::Error;

/// Exam times are published in China Standard Time.
pub const UTC_OFFSET_SECONDS: i32 = 8 * 3600;

/// `2025年11月15日(10:25-12:15)` and similar.
pub const LOCALIZED_PATTERN: &str =
    r"(\d{4})年(\d{1,2})月(\d{1,2})日.*?(\d{1,2}:\d{2})\s*[-~至]\s*(\d{1,2}:\d{2})";

/// `(2025-11-18) 13:30-15:20` and similar; the parentheses are optional.
pub const ISO_PATTERN: &str =
    r"\(?(\d{4}-\d{1,2}-\d{1,2})\)?.*?(\d{1,2}:\d{2})\s*[-~至]\s*(\d{1,2}:\d{2})";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Missing time data")]
    Missing,
    #[error("Unrecognized date format")]
    Unrecognized,
    #[error("Parsing exception: {0}")]
    Construction(String),
}

/// Raw capture groups of whichever grammar matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarMatch {
    Localized {
        year: String,
        month: String,
        day: String,
        start: String,
        end: String,
    },
    Iso {
        date: String,
        start: String,
        end: String,
    },
}

/// A resolved exam time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSlot {
    pub date: NaiveDate,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// End minus start on the same calendar day; negative when the end clock
    /// time is earlier than the start.
    pub duration_minutes: i64,
}

impl ExamSlot {
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn start_timestamp(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn end_timestamp(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

pub struct TimeParser {
    localized: Regex,
    iso: Regex,
    offset: FixedOffset,
}

impl TimeParser {
    pub fn new() -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(UTC_OFFSET_SECONDS)
            .ok_or_else(|| anyhow!("invalid UTC offset: {}", UTC_OFFSET_SECONDS))?;

        Ok(TimeParser {
            localized: Regex::new(LOCALIZED_PATTERN)?,
            iso: Regex::new(ISO_PATTERN)?,
            offset,
        })
    }

    pub fn parse(&self, raw: &str) -> Result<ExamSlot, TimeParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TimeParseError::Missing);
        }

        let matched = self
            .match_grammar(raw)
            .ok_or(TimeParseError::Unrecognized)?;
        self.resolve(&matched)
    }

    /// Tries the localized grammar first; it wins whenever both would match.
    pub fn match_grammar(&self, raw: &str) -> Option<GrammarMatch> {
        if let Some(caps) = self.localized.captures(raw) {
            return Some(GrammarMatch::Localized {
                year: caps[1].to_string(),
                month: caps[2].to_string(),
                day: caps[3].to_string(),
                start: caps[4].to_string(),
                end: caps[5].to_string(),
            });
        }

        self.iso.captures(raw).map(|caps| GrammarMatch::Iso {
            date: caps[1].to_string(),
            start: caps[2].to_string(),
            end: caps[3].to_string(),
        })
    }

    pub fn resolve(&self, matched: &GrammarMatch) -> Result<ExamSlot, TimeParseError> {
        let (date, start, end) = match matched {
            GrammarMatch::Localized { year, month, day, start, end } => {
                (build_date(year, month, day)?, start, end)
            }
            GrammarMatch::Iso { date, start, end } => {
                let mut parts = date.splitn(3, '-');
                let (year, month, day) = (
                    parts.next().unwrap_or_default(),
                    parts.next().unwrap_or_default(),
                    parts.next().unwrap_or_default(),
                );
                (build_date(year, month, day)?, start, end)
            }
        };

        let start = self.instant(date, start)?;
        let end = self.instant(date, end)?;

        Ok(ExamSlot {
            date,
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        })
    }

    fn instant(&self, date: NaiveDate, clock: &str) -> Result<DateTime<FixedOffset>, TimeParseError> {
        let time = parse_clock(clock)?;
        date.and_time(time)
            .and_local_timezone(self.offset)
            .single()
            .ok_or_else(|| TimeParseError::Construction(format!("ambiguous local time {} {}", date, clock)))
    }
}

fn build_date(year: &str, month: &str, day: &str) -> Result<NaiveDate, TimeParseError> {
    let invalid = || TimeParseError::Construction(format!("invalid calendar date {}-{}-{}", year, month, day));

    let y: i32 = ascii_digits(year).parse().map_err(|_| invalid())?;
    let m: u32 = ascii_digits(month).parse().map_err(|_| invalid())?;
    let d: u32 = ascii_digits(day).parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)
}

fn parse_clock(clock: &str) -> Result<NaiveTime, TimeParseError> {
    let invalid = || TimeParseError::Construction(format!("invalid clock time {}", clock));

    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = ascii_digits(hour).parse().map_err(|_| invalid())?;
    let minute: u32 = ascii_digits(minute).parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

// `\d` also matches full-width digits, which `str::parse` rejects.
fn ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            other => other,
        })
        .collect()
}
