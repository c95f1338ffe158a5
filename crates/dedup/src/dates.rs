//! Recency window: which dated records count as "the latest observation".

use chrono::NaiveDate;

use crate::config::MergeConfig;
use crate::model::FactoryRecord;

/// Parse `text` with the first format that accepts it.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Records selected by [`RecencyWindow::select`].
#[derive(Debug)]
pub struct Recent<'r> {
    /// Raw date text of the newest record.
    pub max_date: String,
    /// Members inside the window, in group order.
    pub members: Vec<&'r FactoryRecord>,
    /// Dates that could not be parsed; those records only qualify by exact match.
    pub parse_failures: usize,
}

#[derive(Debug, Clone)]
pub struct RecencyWindow<'c> {
    formats: &'c [String],
    days: i64,
    lexicographic: bool,
}

impl<'c> RecencyWindow<'c> {
    pub fn new(formats: &'c [String], days: u32, lexicographic: bool) -> Self {
        Self {
            formats,
            days: i64::from(days),
            lexicographic,
        }
    }

    pub fn from_config(config: &'c MergeConfig) -> Self {
        Self::new(
            &config.dates.formats,
            config.dates.recency_window_days,
            config.compat.lexicographic_max_date,
        )
    }

    /// Pick the newest date and every member within the window of it.
    ///
    /// Members without a date are treated as an empty date string; callers
    /// only route fully dated groups here.
    pub fn select<'r>(&self, members: &'r [FactoryRecord]) -> Recent<'r> {
        if self.lexicographic {
            self.select_lexicographic(members)
        } else {
            self.select_calendar(members)
        }
    }

    fn within(&self, a: NaiveDate, b: NaiveDate) -> bool {
        (a - b).num_days().abs() <= self.days
    }

    fn select_calendar<'r>(&self, members: &'r [FactoryRecord]) -> Recent<'r> {
        let parsed: Vec<Option<NaiveDate>> = members
            .iter()
            .map(|m| parse_date(date_text(m), self.formats))
            .collect();
        let parse_failures = parsed.iter().filter(|d| d.is_none()).count();

        let newest = parsed
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (i, d)))
            // max_by_key keeps the last maximum; reverse so the first one wins
            .rev()
            .max_by_key(|(_, d)| *d);

        let Some((newest_index, newest_date)) = newest else {
            // nothing parses: fall back to string order and exact matches
            let mut recent = self.select_lexicographic_exact(members);
            recent.parse_failures = parse_failures;
            return recent;
        };

        let max_date = date_text(&members[newest_index]).to_string();
        let recent = members
            .iter()
            .zip(&parsed)
            .filter(|(m, d)| {
                date_text(m) == max_date || d.is_some_and(|d| self.within(d, newest_date))
            })
            .map(|(m, _)| m)
            .collect();

        Recent {
            max_date,
            members: recent,
            parse_failures,
        }
    }

    fn select_lexicographic_exact<'r>(&self, members: &'r [FactoryRecord]) -> Recent<'r> {
        let max_date = lexicographic_max(members);
        let recent = members
            .iter()
            .filter(|m| date_text(m) == max_date)
            .collect();
        Recent {
            max_date,
            members: recent,
            parse_failures: 0,
        }
    }

    fn select_lexicographic<'r>(&self, members: &'r [FactoryRecord]) -> Recent<'r> {
        let max_date = lexicographic_max(members);
        let mut parse_failures = 0;
        let mut recent = Vec::new();

        for member in members {
            let text = date_text(member);
            if text == max_date {
                recent.push(member);
                continue;
            }
            match self.parse_pair(text, &max_date) {
                Some((d, newest)) => {
                    if self.within(d, newest) {
                        recent.push(member);
                    }
                }
                None => parse_failures += 1,
            }
        }

        Recent {
            max_date,
            members: recent,
            parse_failures,
        }
    }

    /// Both dates parsed with the first format that accepts both.
    fn parse_pair(&self, a: &str, b: &str) -> Option<(NaiveDate, NaiveDate)> {
        self.formats.iter().find_map(|fmt| {
            let a = NaiveDate::parse_from_str(a, fmt).ok()?;
            let b = NaiveDate::parse_from_str(b, fmt).ok()?;
            Some((a, b))
        })
    }
}

fn date_text(record: &FactoryRecord) -> &str {
    record.date.as_deref().unwrap_or("")
}

fn lexicographic_max(members: &[FactoryRecord]) -> String {
    members
        .iter()
        .map(date_text)
        .max()
        .unwrap_or_default()
        .to_string()
}
