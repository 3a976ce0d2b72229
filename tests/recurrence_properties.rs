//! Property-based tests for recurring task expansion.
//!
//! Uses proptest to verify:
//! 1. A daily rule over an N-day range yields N + 1 consecutive dates.
//! 2. A weekly rule with no selected days yields nothing.
//! 3. A single-weekday weekly rule over 4 weeks yields 4 dates 7 days apart.
//! 4. A monthly rule started on the 31st only ever lands on the 31st.
//! 5. Open-ended rules stop at the instance cap.
//! 6. Bounded rules never loop more than the iteration cap.
//! 7. Every date lies within [start, end] and dates strictly increase.

use chrono::{Datelike, Days, NaiveDate};
use proptest::prelude::*;
use taskflow::models::Priority;
use taskflow::recurrence::*;

fn template() -> TaskTemplate {
    TaskTemplate {
        title: "Prop".to_string(),
        priority: Priority::Medium,
        category: "Personal".to_string(),
    }
}

fn due_dates(rule: &RecurringRule) -> Vec<NaiveDate> {
    expand(&template(), rule, &ExpansionLimits::default())
        .instances
        .iter()
        .map(|i| i.due_date)
        .collect()
}

// --- Strategies ---

/// Dates between 2000-01-01 and roughly 2054.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..20_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.checked_add_days(Days::new(offset)))
            .unwrap()
    })
}

fn arb_day() -> impl Strategy<Value = Day> {
    prop_oneof![
        Just(Day::Monday),
        Just(Day::Tuesday),
        Just(Day::Wednesday),
        Just(Day::Thursday),
        Just(Day::Friday),
        Just(Day::Saturday),
        Just(Day::Sunday),
    ]
}

fn arb_pattern() -> impl Strategy<Value = Pattern> {
    prop_oneof![
        Just(Pattern::Daily),
        Just(Pattern::Weekly),
        Just(Pattern::Monthly),
        Just(Pattern::Custom),
    ]
}

fn arb_unit() -> impl Strategy<Value = CustomUnit> {
    prop_oneof![
        Just(CustomUnit::Days),
        Just(CustomUnit::Weeks),
        Just(CustomUnit::Months),
        Just(CustomUnit::Years),
    ]
}

fn arb_monthly_type() -> impl Strategy<Value = MonthlyType> {
    prop_oneof![Just(MonthlyType::Date), Just(MonthlyType::Day)]
}

/// Any well-formed open-ended rule. Frequency 0 is allowed on purpose.
fn arb_rule() -> impl Strategy<Value = RecurringRule> {
    (
        arb_pattern(),
        arb_date(),
        0u32..6,
        prop::collection::btree_set(arb_day(), 1..=7),
        arb_monthly_type(),
        prop::option::of(0u32..10),
        prop::option::of(arb_unit()),
    )
        .prop_map(|(pattern, start, frequency, days, monthly_type, interval, unit)| {
            let mut rule = RecurringRule::new(pattern, start).every(frequency);
            rule.selected_days = days;
            rule.monthly_type = monthly_type;
            rule.custom_interval = interval;
            rule.custom_unit = unit;
            rule
        })
}

// --- Properties ---

proptest! {
    #[test]
    fn daily_range_has_one_instance_per_day(start in arb_date(), span in 0u64..200) {
        let end = start.checked_add_days(Days::new(span)).unwrap();
        let got = due_dates(&RecurringRule::daily(start).until(end));

        prop_assert_eq!(got.len() as u64, span + 1);
        for (i, d) in got.iter().enumerate() {
            prop_assert_eq!(*d, start.checked_add_days(Days::new(i as u64)).unwrap());
        }
    }

    #[test]
    fn weekly_without_days_is_empty(start in arb_date(), span in 0u64..1000, frequency in 0u32..5) {
        let end = start.checked_add_days(Days::new(span)).unwrap();
        let rule = RecurringRule::weekly(start, Vec::<Day>::new()).every(frequency).until(end);
        let out = expand(&template(), &rule, &ExpansionLimits::default());

        prop_assert!(out.instances.is_empty());
        prop_assert_eq!(out.stop, StopReason::InvalidRule);
    }

    #[test]
    fn single_weekday_over_four_weeks(start in arb_date()) {
        let end = start.checked_add_days(Days::new(27)).unwrap();
        let rule = RecurringRule::weekly(start, [Day::from(start.weekday())]).until(end);
        let got = due_dates(&rule);

        prop_assert_eq!(got.len(), 4);
        prop_assert_eq!(got[0], start);
        for pair in got.windows(2) {
            prop_assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
    }

    #[test]
    fn monthly_from_the_31st_stays_on_the_31st(span in 0u64..3000, frequency in 1u32..4) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let end = start.checked_add_days(Days::new(span)).unwrap();
        let rule = RecurringRule::monthly(start, MonthlyType::Date).every(frequency).until(end);
        let got = due_dates(&rule);

        prop_assert!(!got.is_empty());
        prop_assert!(got.iter().all(|d| d.day() == 31));
    }

    #[test]
    fn open_ended_rules_stop_at_instance_cap(rule in arb_rule()) {
        let limits = ExpansionLimits::default();
        let out = expand(&template(), &rule, &limits);

        prop_assert!(out.instances.len() <= limits.max_instances);
        prop_assert!(out.iterations <= limits.max_iterations);
    }

    #[test]
    fn bounded_rules_respect_iteration_cap_and_range(rule in arb_rule(), span in 0u64..5000) {
        let end = rule.start_date.checked_add_days(Days::new(span)).unwrap();
        let rule = rule.until(end);
        let limits = ExpansionLimits::default();
        let out = expand(&template(), &rule, &limits);

        prop_assert!(out.iterations <= limits.max_iterations);
        prop_assert!(out.instances.len() <= limits.max_iterations as usize);
        for inst in &out.instances {
            prop_assert!(inst.due_date >= rule.start_date);
            prop_assert!(inst.due_date <= end);
        }
        for pair in out.instances.windows(2) {
            prop_assert!(pair[0].due_date < pair[1].due_date);
        }
    }

    #[test]
    fn only_the_first_instance_is_the_root(rule in arb_rule()) {
        let out = expand(&template(), &rule, &ExpansionLimits::default());
        for (i, inst) in out.instances.iter().enumerate() {
            prop_assert_eq!(inst.ordinal, i);
            prop_assert_eq!(inst.is_root, i == 0);
            prop_assert_eq!(inst.root, if i == 0 { None } else { Some(0) });
        }
    }
}
