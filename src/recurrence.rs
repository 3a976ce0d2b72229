//! Recurring rules and the date expansion that turns one rule into a series
//! of dated tasks.
//!
//! Expansion is one-shot: it runs when a recurring task is added, the
//! resulting tasks are created in a single batch, and the rule is kept on
//! each task only so it can be described later ("Every 2 weeks on Mon").

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::models::{NewTask, Priority, SeriesLink};

/// How a rule repeats.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Daily,
    Weekly,
    Monthly,
    Custom,
    /// Anything else found in stored data. Expands to nothing.
    #[serde(other)]
    #[value(skip)]
    Unrecognized,
}

impl FromStr for Pattern {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Pattern::Daily),
            "weekly" | "week" => Ok(Pattern::Weekly),
            "monthly" | "month" => Ok(Pattern::Monthly),
            "custom" => Ok(Pattern::Custom),
            other => Err(RuleError::UnknownPattern(other.to_string())),
        }
    }
}

/// Weekday names as they appear in a rule's `selectedDays`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
            Day::Saturday => "Sat",
            Day::Sunday => "Sun",
        }
    }
}

impl From<Weekday> for Day {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl FromStr for Day {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "monday" => Ok(Day::Monday),
            "tue" | "tues" | "tuesday" => Ok(Day::Tuesday),
            "wed" | "wednesday" => Ok(Day::Wednesday),
            "thu" | "thur" | "thurs" | "thursday" => Ok(Day::Thursday),
            "fri" | "friday" => Ok(Day::Friday),
            "sat" | "saturday" => Ok(Day::Saturday),
            "sun" | "sunday" => Ok(Day::Sunday),
            other => Err(RuleError::UnknownWeekday(other.to_string())),
        }
    }
}

/// Parses a comma separated list such as `mon,wed,fri`.
pub fn parse_days(list: &str) -> Result<BTreeSet<Day>, RuleError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Which day a monthly rule lands on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonthlyType {
    /// Same day of the month as the start date (the 31st).
    #[default]
    Date,
    /// Same weekday occurrence as the start date (the 2nd Tuesday).
    Day,
}

/// Step size of a custom rule.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CustomUnit {
    #[default]
    Days,
    Weeks,
    Months,
    Years,
}

impl CustomUnit {
    fn singular(self) -> &'static str {
        match self {
            CustomUnit::Days => "day",
            CustomUnit::Weeks => "week",
            CustomUnit::Months => "month",
            CustomUnit::Years => "year",
        }
    }
}

impl FromStr for CustomUnit {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" | "days" => Ok(CustomUnit::Days),
            "w" | "week" | "weeks" => Ok(CustomUnit::Weeks),
            "m" | "month" | "months" => Ok(CustomUnit::Months),
            "y" | "year" | "years" => Ok(CustomUnit::Years),
            other => Err(RuleError::UnknownUnit(other.to_string())),
        }
    }
}

fn one() -> u32 {
    1
}

/// Declarative description of how a task repeats.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRule {
    pub pattern: Pattern,
    /// "Every N" days, weeks or months. Ignored by custom rules.
    #[serde(default = "one")]
    pub frequency: u32,
    /// Only consulted by weekly rules.
    #[serde(default)]
    pub selected_days: BTreeSet<Day>,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive. Without it the series is capped by count instead.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_type: MonthlyType,
    #[serde(default)]
    pub custom_interval: Option<u32>,
    #[serde(default)]
    pub custom_unit: Option<CustomUnit>,
}

impl RecurringRule {
    pub fn new(pattern: Pattern, start_date: NaiveDate) -> Self {
        RecurringRule {
            pattern,
            frequency: 1,
            selected_days: BTreeSet::new(),
            start_date,
            end_date: None,
            monthly_type: MonthlyType::Date,
            custom_interval: None,
            custom_unit: None,
        }
    }

    pub fn daily(start_date: NaiveDate) -> Self {
        Self::new(Pattern::Daily, start_date)
    }

    pub fn weekly(start_date: NaiveDate, days: impl IntoIterator<Item = Day>) -> Self {
        let mut rule = Self::new(Pattern::Weekly, start_date);
        rule.selected_days = days.into_iter().collect();
        rule
    }

    pub fn monthly(start_date: NaiveDate, monthly_type: MonthlyType) -> Self {
        let mut rule = Self::new(Pattern::Monthly, start_date);
        rule.monthly_type = monthly_type;
        rule
    }

    pub fn custom(start_date: NaiveDate, interval: u32, unit: CustomUnit) -> Self {
        let mut rule = Self::new(Pattern::Custom, start_date);
        rule.custom_interval = Some(interval);
        rule.custom_unit = Some(unit);
        rule
    }

    pub fn every(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Frequency with non-positive values treated as 1.
    pub fn effective_frequency(&self) -> u32 {
        self.frequency.max(1)
    }

    pub fn effective_interval(&self) -> u32 {
        self.custom_interval.unwrap_or(1).max(1)
    }

    pub fn effective_unit(&self) -> CustomUnit {
        self.custom_unit.unwrap_or_default()
    }

    /// Checks what the add form would refuse to submit.
    ///
    /// The generator itself never calls this; it tolerates anything.
    pub fn validate(&self) -> Result<(), RuleError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(RuleError::EndBeforeStart { start: self.start_date, end });
            }
        }
        if self.pattern == Pattern::Weekly && self.selected_days.is_empty() {
            return Err(RuleError::NoDaysSelected);
        }
        if self.pattern == Pattern::Unrecognized {
            return Err(RuleError::UnknownPattern("unrecognized".into()));
        }
        Ok(())
    }

    /// Human readable summary, e.g. "Every 2 weeks on Mon, Wed".
    pub fn describe(&self) -> String {
        let freq = self.effective_frequency();
        let every = |unit: &str| {
            if freq == 1 { format!("Every {unit}") } else { format!("Every {freq} {unit}s") }
        };
        let mut text = match self.pattern {
            Pattern::Daily => every("day"),
            Pattern::Weekly => {
                let days: Vec<&str> = self.selected_days.iter().map(|d| d.short_name()).collect();
                format!("{} on {}", every("week"), days.join(", "))
            }
            Pattern::Monthly => match self.monthly_type {
                MonthlyType::Date => {
                    format!("{} on the {}", every("month"), ordinal(self.start_date.day()))
                }
                MonthlyType::Day => format!(
                    "{} on the {} {}",
                    every("month"),
                    ordinal(week_of_month(self.start_date)),
                    self.start_date.weekday_name(),
                ),
            },
            Pattern::Custom => {
                let n = self.effective_interval();
                let unit = self.effective_unit().singular();
                if n == 1 { format!("Every {unit}") } else { format!("Every {n} {unit}s") }
            }
            Pattern::Unrecognized => "Unknown schedule".to_string(),
        };
        if let Some(end) = self.end_date {
            text.push_str(&format!(" until {end}"));
        }
        text
    }

    /// Date the loop is looking at on the given iteration.
    ///
    /// Month and year steps are measured from the start date rather than
    /// from the previous cursor so a clamp in February does not pull every
    /// later occurrence back to the 28th.
    fn cursor_at(&self, iteration: u32) -> Option<NaiveDate> {
        let start = self.start_date;
        match self.pattern {
            Pattern::Daily | Pattern::Weekly => start.checked_add_days(Days::new(iteration.into())),
            Pattern::Monthly => match self.monthly_type {
                MonthlyType::Date => start.checked_add_months(Months::new(iteration)),
                MonthlyType::Day => start.with_day(1)?.checked_add_months(Months::new(iteration)),
            },
            Pattern::Custom => match self.effective_unit() {
                CustomUnit::Days => start.checked_add_days(Days::new(iteration.into())),
                CustomUnit::Weeks => start.checked_add_days(Days::new(u64::from(iteration) * 7)),
                CustomUnit::Months => start.checked_add_months(Months::new(iteration)),
                CustomUnit::Years => start.checked_add_months(Months::new(iteration.checked_mul(12)?)),
            },
            Pattern::Unrecognized => None,
        }
    }

    /// The due date emitted for `cursor`, if the rule includes it.
    fn occurrence(&self, cursor: NaiveDate, iteration: u32) -> Option<NaiveDate> {
        let freq = self.effective_frequency();
        match self.pattern {
            Pattern::Daily => (iteration % freq == 0).then_some(cursor),
            Pattern::Weekly => {
                let on_day = self.selected_days.contains(&Day::from(cursor.weekday()));
                (on_day && (iteration / 7) % freq == 0).then_some(cursor)
            }
            Pattern::Monthly => {
                if iteration % freq != 0 {
                    return None;
                }
                match self.monthly_type {
                    MonthlyType::Date => (cursor.day() == self.start_date.day()).then_some(cursor),
                    MonthlyType::Day => {
                        let n = u8::try_from(week_of_month(self.start_date)).ok()?;
                        let date = NaiveDate::from_weekday_of_month_opt(
                            cursor.year(),
                            cursor.month(),
                            self.start_date.weekday(),
                            n,
                        )?;
                        let in_range = date >= self.start_date
                            && self.end_date.map_or(true, |end| date <= end);
                        in_range.then_some(date)
                    }
                }
            }
            Pattern::Custom => (iteration % self.effective_interval() == 0).then_some(cursor),
            Pattern::Unrecognized => None,
        }
    }
}

/// Parses the compact rule syntax typed into the TUI, for example
/// `weekly every 2 on mon,thu until 2025-06-30` or `custom every 3 weeks`.
///
/// Recognised words: `every N [unit]`, `on DAYS`, `by date|day`,
/// `from DATE`, `until DATE`. Dates are `YYYY-MM-DD`.
pub fn parse_rule(input: &str, default_start: NaiveDate) -> Result<RecurringRule, RuleError> {
    let mut tokens = input.split_whitespace().peekable();
    let pattern: Pattern = tokens.next().ok_or(RuleError::Empty)?.parse()?;
    let mut rule = RecurringRule::new(pattern, default_start);

    while let Some(word) = tokens.next() {
        match word.to_lowercase().as_str() {
            "every" => {
                let n: u32 = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                if pattern == Pattern::Custom {
                    rule.custom_interval = Some(n);
                    if let Some(unit) = tokens.peek().and_then(|t| t.parse::<CustomUnit>().ok()) {
                        rule.custom_unit = Some(unit);
                        tokens.next();
                    }
                } else {
                    rule.frequency = n;
                    // "every 2 weeks" reads naturally; the unit is implied by the pattern.
                    if tokens.peek().is_some_and(|t| t.parse::<CustomUnit>().is_ok()) {
                        tokens.next();
                    }
                }
            }
            "on" => {
                let list = tokens.next().ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                rule.selected_days = parse_days(list)?;
            }
            "by" => {
                let kind = tokens.next().ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                rule.monthly_type = match kind.to_lowercase().as_str() {
                    "date" => MonthlyType::Date,
                    "day" | "weekday" => MonthlyType::Day,
                    other => return Err(RuleError::UnexpectedToken(other.to_string())),
                };
            }
            "unit" => {
                let unit = tokens.next().ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                rule.custom_unit = Some(unit.parse()?);
            }
            "from" | "starting" => {
                let date = tokens.next().ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                rule.start_date = parse_date(date)?;
            }
            "until" | "to" => {
                let date = tokens.next().ok_or_else(|| RuleError::MissingValue(word.to_string()))?;
                rule.end_date = Some(parse_date(date)?);
            }
            other => return Err(RuleError::UnexpectedToken(other.to_string())),
        }
    }
    Ok(rule)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, RuleError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| RuleError::InvalidDate(s.to_string()))
}

/// Bounds that guarantee expansion terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Hard ceiling on loop iterations, with or without an end date.
    pub max_iterations: u32,
    /// Ceiling on emitted tasks, applied only when the rule has no end date.
    pub max_instances: usize,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        ExpansionLimits { max_iterations: 365, max_instances: 30 }
    }
}

/// What the generator needs to know about the task being repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    pub title: String,
    pub priority: Priority,
    pub category: String,
}

/// One dated occurrence produced by [`expand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInstance {
    /// Position in the series, starting at 0.
    pub ordinal: usize,
    pub due_date: NaiveDate,
    pub is_root: bool,
    /// Ordinal of the root instance. `None` on the root itself.
    pub root: Option<usize>,
}

/// Why expansion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Walked past the end date (or off the calendar).
    Exhausted,
    /// Reached `max_instances` on an open-ended rule. The series may be incomplete.
    InstanceCap,
    /// Reached `max_iterations`. The series may be incomplete.
    IterationCap,
    /// Unknown pattern or a weekly rule with no days.
    InvalidRule,
}

impl StopReason {
    pub fn is_truncated(self) -> bool {
        matches!(self, StopReason::InstanceCap | StopReason::IterationCap)
    }
}

/// The materialized result of expanding a rule.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub template: TaskTemplate,
    pub rule: RecurringRule,
    pub instances: Vec<TaskInstance>,
    pub stop: StopReason,
    /// Number of loop iterations performed.
    pub iterations: u32,
}

impl Expansion {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Turns the instances into records ready for
    /// [`crate::storage::TaskStore::create_many`].
    ///
    /// `now` stamps creation time and the sort order, so the output is
    /// deterministic for a fixed `now`.
    pub fn to_new_tasks(&self, now: DateTime<Utc>) -> Vec<NewTask> {
        let base = now.timestamp_millis();
        self.instances
            .iter()
            .map(|inst| NewTask {
                title: self.template.title.clone(),
                priority: self.template.priority,
                category: self.template.category.clone(),
                due_date: Some(inst.due_date),
                created_at: now,
                order: base.saturating_add(inst.ordinal as i64),
                recurring: Some(self.rule.clone()),
                series: Some(if inst.is_root { SeriesLink::Root } else { SeriesLink::Member }),
            })
            .collect()
    }
}

/// Expands `rule` into concrete dated instances of `template`.
///
/// Never fails: a rule that cannot produce anything yields an empty
/// expansion with [`StopReason::InvalidRule`].
pub fn expand(template: &TaskTemplate, rule: &RecurringRule, limits: &ExpansionLimits) -> Expansion {
    let (instances, stop, iterations) = expand_dates(rule, limits);
    tracing::debug!(
        pattern = ?rule.pattern,
        count = instances.len(),
        iterations,
        stop = ?stop,
        "expanded recurring rule"
    );
    Expansion {
        template: template.clone(),
        rule: rule.clone(),
        instances,
        stop,
        iterations,
    }
}

fn expand_dates(rule: &RecurringRule, limits: &ExpansionLimits) -> (Vec<TaskInstance>, StopReason, u32) {
    if rule.pattern == Pattern::Unrecognized
        || (rule.pattern == Pattern::Weekly && rule.selected_days.is_empty())
    {
        return (Vec::new(), StopReason::InvalidRule, 0);
    }

    let mut instances: Vec<TaskInstance> = Vec::new();
    let mut iteration: u32 = 0;

    let stop = loop {
        if rule.end_date.is_none() && instances.len() >= limits.max_instances {
            break StopReason::InstanceCap;
        }
        let Some(cursor) = rule.cursor_at(iteration) else {
            break StopReason::Exhausted;
        };
        if rule.end_date.is_some_and(|end| cursor > end) {
            break StopReason::Exhausted;
        }
        if iteration >= limits.max_iterations {
            break StopReason::IterationCap;
        }

        if let Some(due_date) = rule.occurrence(cursor, iteration) {
            let ordinal = instances.len();
            instances.push(TaskInstance {
                ordinal,
                due_date,
                is_root: ordinal == 0,
                root: (ordinal > 0).then_some(0),
            });
        }
        iteration += 1;
    };

    (instances, stop, iteration)
}

/// 1-based week of the month a date falls in (1..=5).
fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

trait WeekdayName {
    fn weekday_name(&self) -> &'static str;
}

impl WeekdayName for NaiveDate {
    fn weekday_name(&self) -> &'static str {
        match self.weekday() {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}

impl fmt::Display for RecurringRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template() -> TaskTemplate {
        TaskTemplate { title: "Water plants".into(), priority: Priority::Low, category: "Home".into() }
    }

    fn dates(rule: &RecurringRule) -> Vec<NaiveDate> {
        expand(&template(), rule, &ExpansionLimits::default())
            .instances
            .iter()
            .map(|i| i.due_date)
            .collect()
    }

    #[test]
    fn daily_every_other_day() {
        let rule = RecurringRule::daily(date(2025, 1, 1)).every(2).until(date(2025, 1, 7));
        assert_eq!(dates(&rule), vec![date(2025, 1, 1), date(2025, 1, 3), date(2025, 1, 5), date(2025, 1, 7)]);
    }

    #[test]
    fn weekly_every_two_weeks_uses_iteration_blocks() {
        // 2024-01-01 is a Monday.
        let rule = RecurringRule::weekly(date(2024, 1, 1), [Day::Monday, Day::Thursday])
            .every(2)
            .until(date(2024, 1, 31));
        assert_eq!(
            dates(&rule),
            vec![date(2024, 1, 1), date(2024, 1, 4), date(2024, 1, 15), date(2024, 1, 18), date(2024, 1, 29)]
        );
    }

    #[test]
    fn monthly_by_date_skips_short_months_without_drifting() {
        let rule = RecurringRule::monthly(date(2024, 1, 31), MonthlyType::Date).until(date(2024, 12, 31));
        let got = dates(&rule);
        assert!(got.iter().all(|d| d.day() == 31));
        assert_eq!(got.len(), 7);
    }

    #[test]
    fn monthly_by_weekday_lands_on_same_ordinal_weekday() {
        // 2024-01-09 is the 2nd Tuesday of January.
        let rule = RecurringRule::monthly(date(2024, 1, 9), MonthlyType::Day).until(date(2024, 4, 30));
        assert_eq!(dates(&rule), vec![date(2024, 1, 9), date(2024, 2, 13), date(2024, 3, 12), date(2024, 4, 9)]);
    }

    #[test]
    fn monthly_by_weekday_skips_months_without_a_fifth_occurrence() {
        // 2024-01-29 is the 5th Monday of January; February 2024 has only four.
        let rule = RecurringRule::monthly(date(2024, 1, 29), MonthlyType::Day).until(date(2024, 4, 30));
        assert_eq!(dates(&rule), vec![date(2024, 1, 29), date(2024, 4, 29)]);
    }

    #[test]
    fn custom_weeks_step_by_seven_days() {
        let rule = RecurringRule::custom(date(2025, 3, 3), 1, CustomUnit::Weeks).until(date(2025, 3, 24));
        assert_eq!(dates(&rule), vec![date(2025, 3, 3), date(2025, 3, 10), date(2025, 3, 17), date(2025, 3, 24)]);
    }

    #[test]
    fn custom_interval_filters_iterations() {
        let rule = RecurringRule::custom(date(2025, 1, 15), 2, CustomUnit::Months).until(date(2025, 7, 15));
        assert_eq!(dates(&rule), vec![date(2025, 1, 15), date(2025, 3, 15), date(2025, 5, 15), date(2025, 7, 15)]);
    }

    #[test]
    fn custom_years_from_leap_day_clamps() {
        let rule = RecurringRule::custom(date(2024, 2, 29), 1, CustomUnit::Years).until(date(2028, 3, 1));
        assert_eq!(
            dates(&rule),
            vec![date(2024, 2, 29), date(2025, 2, 28), date(2026, 2, 28), date(2027, 2, 28), date(2028, 2, 29)]
        );
    }

    #[test]
    fn zero_frequency_is_treated_as_one() {
        let rule = RecurringRule::daily(date(2025, 1, 1)).every(0).until(date(2025, 1, 3));
        assert_eq!(dates(&rule).len(), 3);
    }

    #[test]
    fn unrecognized_pattern_expands_to_nothing() {
        let json = r#"{"pattern":"fortnightly","startDate":"2025-01-01"}"#;
        let rule: RecurringRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.pattern, Pattern::Unrecognized);
        let out = expand(&template(), &rule, &ExpansionLimits::default());
        assert!(out.is_empty());
        assert_eq!(out.stop, StopReason::InvalidRule);
    }

    #[test]
    fn open_ended_rule_reports_instance_cap() {
        let out = expand(&template(), &RecurringRule::daily(date(2025, 1, 1)), &ExpansionLimits::default());
        assert_eq!(out.len(), 30);
        assert_eq!(out.stop, StopReason::InstanceCap);
        assert!(out.stop.is_truncated());
    }

    #[test]
    fn limits_are_configurable() {
        let limits = ExpansionLimits { max_iterations: 10, max_instances: 5 };
        let open = expand(&template(), &RecurringRule::daily(date(2025, 1, 1)), &limits);
        assert_eq!(open.len(), 5);

        let bounded = RecurringRule::daily(date(2025, 1, 1)).until(date(2025, 12, 31));
        let out = expand(&template(), &bounded, &limits);
        assert_eq!(out.len(), 10);
        assert_eq!(out.stop, StopReason::IterationCap);
    }

    #[test]
    fn only_first_instance_is_root() {
        let rule = RecurringRule::daily(date(2025, 1, 1)).until(date(2025, 1, 4));
        let out = expand(&template(), &rule, &ExpansionLimits::default());
        assert!(out.instances[0].is_root);
        assert_eq!(out.instances[0].root, None);
        assert!(out.instances[1..].iter().all(|i| !i.is_root && i.root == Some(0)));
    }

    #[test]
    fn new_tasks_are_stamped_deterministically() {
        let rule = RecurringRule::daily(date(2025, 1, 1)).until(date(2025, 1, 3));
        let out = expand(&template(), &rule, &ExpansionLimits::default());
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let tasks = out.to_new_tasks(now);
        assert_eq!(tasks, out.to_new_tasks(now));
        assert_eq!(tasks[0].series, Some(SeriesLink::Root));
        assert_eq!(tasks[2].series, Some(SeriesLink::Member));
        assert_eq!(tasks[2].order, now.timestamp_millis() + 2);
        assert_eq!(tasks[1].due_date, Some(date(2025, 1, 2)));
        assert_eq!(tasks[1].recurring.as_ref(), Some(&rule));
    }

    #[test]
    fn describe_reads_naturally() {
        let start = date(2024, 1, 9);
        assert_eq!(RecurringRule::daily(start).describe(), "Every day");
        assert_eq!(
            RecurringRule::weekly(start, [Day::Wednesday, Day::Monday]).every(2).describe(),
            "Every 2 weeks on Mon, Wed"
        );
        assert_eq!(RecurringRule::monthly(start, MonthlyType::Date).describe(), "Every month on the 9th");
        assert_eq!(RecurringRule::monthly(start, MonthlyType::Day).describe(), "Every month on the 2nd Tuesday");
        assert_eq!(
            RecurringRule::custom(start, 3, CustomUnit::Weeks).until(date(2024, 6, 1)).describe(),
            "Every 3 weeks until 2024-06-01"
        );
    }

    #[test]
    fn parse_rule_compact_syntax() {
        let start = date(2025, 1, 6);
        let rule = parse_rule("weekly every 2 weeks on mon,thu until 2025-03-01", start).unwrap();
        assert_eq!(rule.pattern, Pattern::Weekly);
        assert_eq!(rule.frequency, 2);
        assert_eq!(rule.selected_days, [Day::Monday, Day::Thursday].into_iter().collect());
        assert_eq!(rule.end_date, Some(date(2025, 3, 1)));

        let custom = parse_rule("custom every 3 months from 2025-02-01", start).unwrap();
        assert_eq!(custom.custom_interval, Some(3));
        assert_eq!(custom.custom_unit, Some(CustomUnit::Months));
        assert_eq!(custom.start_date, date(2025, 2, 1));

        let monthly = parse_rule("monthly by day", start).unwrap();
        assert_eq!(monthly.monthly_type, MonthlyType::Day);
    }

    #[test]
    fn parse_rule_rejects_garbage() {
        let start = date(2025, 1, 6);
        assert!(matches!(parse_rule("", start), Err(RuleError::Empty)));
        assert!(matches!(parse_rule("hourly", start), Err(RuleError::UnknownPattern(_))));
        assert!(matches!(parse_rule("weekly on funday", start), Err(RuleError::UnknownWeekday(_))));
        assert!(matches!(parse_rule("daily every", start), Err(RuleError::MissingValue(_))));
        assert!(matches!(parse_rule("daily until 01/02/2025", start), Err(RuleError::InvalidDate(_))));
    }

    #[test]
    fn validate_catches_caller_errors() {
        let start = date(2025, 5, 1);
        let backwards = RecurringRule::daily(start).until(date(2025, 4, 1));
        assert!(matches!(backwards.validate(), Err(RuleError::EndBeforeStart { .. })));
        assert!(matches!(RecurringRule::weekly(start, []).validate(), Err(RuleError::NoDaysSelected)));
        assert!(RecurringRule::daily(start).validate().is_ok());
    }

    #[test]
    fn rule_serializes_with_camel_case_fields() {
        let rule = RecurringRule::weekly(date(2025, 1, 6), [Day::Friday]).until(date(2025, 2, 1));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["pattern"], "weekly");
        assert_eq!(json["selectedDays"][0], "friday");
        assert_eq!(json["startDate"], "2025-01-06");
        assert_eq!(json["monthlyType"], "date");
    }
}
