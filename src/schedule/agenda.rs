//! Sidebar agenda and list-view narrowing over already fetched appointments.

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::time::{to_local, CLOCK_FORMAT};
use crate::models::{AgendaFilter, Appointment, Priority, SortBy};

/// Appointments starting on `date` (local), earliest first.
pub fn day_agenda<'a>(appointments: &'a [Appointment], date: NaiveDate, tz: Tz) -> Vec<&'a Appointment> {
    let mut day: Vec<_> = appointments
        .iter()
        .filter_map(|a| Some((a, a.starts_at()?)))
        .filter(|(_, start)| to_local(*start, tz).date_naive() == date)
        .collect();
    day.sort_by_key(|(_, start)| *start);
    day.into_iter().map(|(a, _)| a).collect()
}

fn matches_search(appt: &Appointment, needle: &str, tz: Tz) -> bool {
    if needle.is_empty() {
        return true;
    }
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&appt.first_name)
        || contains(&appt.last_name)
        || contains(&appt.title)
        || appt.extra.notes.as_deref().is_some_and(contains)
        || appt
            .starts_at()
            .is_some_and(|start| to_local(start, tz).format(CLOCK_FORMAT).to_string().contains(needle))
}

/// Search, priority filter and sort for the list view.
///
/// Search is case-insensitive over first name, last name, title, notes and
/// the local `HH:MM` start. Priority sort puts high first; a missing
/// priority ranks as low. Ties (and the time sort) go by start time, with
/// unparseable starts last.
pub fn filter_agenda<'a>(
    appointments: &'a [Appointment],
    filter: &AgendaFilter,
    tz: Tz,
) -> Vec<&'a Appointment> {
    let needle = filter.search.trim().to_lowercase();
    let mut hits: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| matches_search(a, &needle, tz))
        .filter(|a| filter.priority.is_none() || a.priority() == filter.priority)
        .collect();

    let start_key = |a: &Appointment| (a.starts_at().is_none(), a.starts_at());
    match filter.sort {
        SortBy::Time => hits.sort_by_key(|a| start_key(a)),
        SortBy::Priority => hits.sort_by_key(|a| (Priority::rank(a.priority()), start_key(a))),
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::appointment;

    fn with_priority(mut a: Appointment, p: Option<Priority>) -> Appointment {
        a.extra.priority = p;
        a
    }

    fn ids(list: &[&Appointment]) -> Vec<String> {
        list.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn day_agenda_is_sorted_and_limited_to_the_date() {
        let appts = vec![
            appointment("late", "2024-01-01T15:00:00", "2024-01-01T16:00:00"),
            appointment("other-day", "2024-01-02T08:00:00", "2024-01-02T09:00:00"),
            appointment("early", "2024-01-01T08:00:00", "2024-01-01T09:00:00"),
            appointment("broken", "??", "2024-01-01T09:00:00"),
        ];
        let day = day_agenda(&appts, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Tz::UTC);
        assert_eq!(ids(&day), vec!["early", "late"]);
    }

    #[test]
    fn search_matches_names_title_notes_and_clock() {
        let mut noted = appointment("n", "2024-01-01T11:00:00", "2024-01-01T12:00:00");
        noted.extra.notes = Some("Bring X-ray".into());
        let mut named = appointment("m", "2024-01-01T13:30:00", "2024-01-01T14:00:00");
        named.last_name = "Wiśniewska".into();
        let appts = vec![noted, named];

        let search = |q: &str| {
            let filter = AgendaFilter {
                search: q.into(),
                ..AgendaFilter::default()
            };
            ids(&filter_agenda(&appts, &filter, Tz::UTC))
        };
        assert_eq!(search("x-RAY"), vec!["n"]);
        assert_eq!(search("wiśniew"), vec!["m"]);
        assert_eq!(search("13:30"), vec!["m"]);
        assert_eq!(search("visit"), vec!["n", "m"]);
        assert!(search("nobody").is_empty());
    }

    #[test]
    fn priority_filter_keeps_only_matching() {
        let appts = vec![
            with_priority(appointment("h", "2024-01-01T09:00:00", "2024-01-01T10:00:00"), Some(Priority::High)),
            with_priority(appointment("l", "2024-01-01T08:00:00", "2024-01-01T09:00:00"), Some(Priority::Low)),
            appointment("none", "2024-01-01T07:00:00", "2024-01-01T08:00:00"),
        ];
        let filter = AgendaFilter {
            priority: Some(Priority::High),
            ..AgendaFilter::default()
        };
        assert_eq!(ids(&filter_agenda(&appts, &filter, Tz::UTC)), vec!["h"]);
    }

    #[test]
    fn priority_sort_breaks_ties_by_time() {
        let appts = vec![
            appointment("none", "2024-01-01T07:00:00", "2024-01-01T08:00:00"),
            with_priority(appointment("low", "2024-01-01T06:00:00", "2024-01-01T07:00:00"), Some(Priority::Low)),
            with_priority(appointment("med", "2024-01-01T09:00:00", "2024-01-01T10:00:00"), Some(Priority::Medium)),
            with_priority(appointment("high-late", "2024-01-01T12:00:00", "2024-01-01T13:00:00"), Some(Priority::High)),
            with_priority(appointment("high-early", "2024-01-01T10:00:00", "2024-01-01T11:00:00"), Some(Priority::High)),
        ];
        let filter = AgendaFilter {
            sort: SortBy::Priority,
            ..AgendaFilter::default()
        };
        assert_eq!(
            ids(&filter_agenda(&appts, &filter, Tz::UTC)),
            vec!["high-early", "high-late", "med", "low", "none"]
        );
    }

    #[test]
    fn time_sort_puts_unparseable_last() {
        let appts = vec![
            appointment("broken", "n/a", "n/a"),
            appointment("b", "2024-01-01T10:00:00", "2024-01-01T11:00:00"),
            appointment("a", "2024-01-01T09:00:00", "2024-01-01T10:00:00"),
        ];
        let sorted = filter_agenda(&appts, &AgendaFilter::default(), Tz::UTC);
        assert_eq!(ids(&sorted), vec!["a", "b", "broken"]);
    }
}
