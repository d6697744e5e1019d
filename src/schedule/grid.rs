//! Calendar grid: visible dates per view, appointment bucketing, block layout.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::time::{end_of_day, start_of_day, to_local};
use crate::models::{Appointment, ViewMode};

/// Month view always shows six full Monday-first weeks.
pub const MONTH_GRID_CELLS: usize = 42;

pub const DEFAULT_FIRST_HOUR: u32 = 8;
pub const DEFAULT_LAST_HOUR: u32 = 20;
pub const DEFAULT_HOUR_HEIGHT_PX: f32 = 80.0;
pub const DEFAULT_MIN_BLOCK_HEIGHT_PX: f32 = 36.0;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Display parameters for day/week views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridOptions {
    /// First hour row shown (inclusive).
    pub first_hour: u32,
    /// Last hour row shown (inclusive).
    pub last_hour: u32,
    /// Pixel height of one hour row.
    pub hour_height_px: f32,
    /// Blocks never render shorter than this.
    pub min_block_height_px: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            first_hour: DEFAULT_FIRST_HOUR,
            last_hour: DEFAULT_LAST_HOUR,
            hour_height_px: DEFAULT_HOUR_HEIGHT_PX,
            min_block_height_px: DEFAULT_MIN_BLOCK_HEIGHT_PX,
        }
    }
}

impl GridOptions {
    pub fn hours(&self) -> RangeInclusive<u32> {
        self.first_hour.min(23)..=self.last_hour.min(23)
    }
}

/// Inclusive span of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }

    pub fn days(&self) -> i64 {
        (self.last - self.first).num_days() + 1
    }

    /// UTC bounds for a range query: start of the first local day to
    /// 23:59:59 local of the last. Defined for every date, DST days included.
    pub fn utc_bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (start_of_day(self.first, tz), end_of_day(self.last, tz))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HourCell {
    pub hour: u32,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for month-view padding days outside the displayed month.
    pub in_focus: bool,
    /// Every appointment starting on this local date, in input order.
    pub appointments: Vec<Appointment>,
    /// Hour rows for day/week views; empty in month view.
    pub hours: Vec<HourCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleGrid {
    pub mode: ViewMode,
    pub anchor: NaiveDate,
    pub days: Vec<DayCell>,
}

impl ScheduleGrid {
    pub fn day(&self, date: NaiveDate) -> Option<&DayCell> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn cell(&self, date: NaiveDate, hour: u32) -> Option<&HourCell> {
        self.day(date)?.hours.iter().find(|h| h.hour == hour)
    }

    pub fn range(&self) -> Option<DateRange> {
        Some(DateRange {
            first: self.days.first()?.date,
            last: self.days.last()?.date,
        })
    }
}

/// Rendered position of an appointment inside its hour row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockLayout {
    pub top_px: f32,
    pub height_px: f32,
    pub duration_minutes: i64,
    /// Longer than an hour or not aligned to full hours.
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

// ═══════════════════════════════════════════════════════════
// Date arithmetic
// ═══════════════════════════════════════════════════════════

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Dates shown by a view: 1 day, a Monday-first week, or a 42-cell month.
pub fn visible_dates(mode: ViewMode, anchor: NaiveDate) -> Vec<NaiveDate> {
    let (first, count) = match mode {
        ViewMode::Day => (anchor, 1),
        ViewMode::Week => (week_start(anchor), 7),
        ViewMode::Month => (week_start(month_start(anchor)), MONTH_GRID_CELLS),
    };
    first.iter_days().take(count).collect()
}

/// Date span a view needs from the backend.
pub fn fetch_range(mode: ViewMode, anchor: NaiveDate) -> DateRange {
    let dates = visible_dates(mode, anchor);
    DateRange {
        first: dates.first().copied().unwrap_or(anchor),
        last: dates.last().copied().unwrap_or(anchor),
    }
}

/// Move the anchor one view-length backward or forward.
///
/// Month steps clamp to the end of shorter months (Jan 31 → Feb 29).
pub fn navigate(mode: ViewMode, anchor: NaiveDate, direction: NavDirection) -> NaiveDate {
    let moved = match (mode, direction) {
        (ViewMode::Day, NavDirection::Previous) => anchor.checked_sub_signed(Duration::days(1)),
        (ViewMode::Day, NavDirection::Next) => anchor.checked_add_signed(Duration::days(1)),
        (ViewMode::Week, NavDirection::Previous) => anchor.checked_sub_signed(Duration::weeks(1)),
        (ViewMode::Week, NavDirection::Next) => anchor.checked_add_signed(Duration::weeks(1)),
        (ViewMode::Month, NavDirection::Previous) => anchor.checked_sub_months(Months::new(1)),
        (ViewMode::Month, NavDirection::Next) => anchor.checked_add_months(Months::new(1)),
    };
    moved.unwrap_or(anchor)
}

// ═══════════════════════════════════════════════════════════
// Bucketing
// ═══════════════════════════════════════════════════════════

/// Group appointments into the cells of a view.
///
/// Pure function of its inputs. An appointment lands in the day (and, for
/// day/week views, the hour row) of its local start time. Records with an
/// unparseable start are left out. Input order is preserved within a cell.
pub fn bucket(
    appointments: &[Appointment],
    mode: ViewMode,
    anchor: NaiveDate,
    tz: Tz,
    options: &GridOptions,
) -> ScheduleGrid {
    let dates = visible_dates(mode, anchor);
    let focus_month = (anchor.year(), anchor.month());
    let hours = options.hours();

    let mut days: Vec<DayCell> = dates
        .iter()
        .map(|&date| DayCell {
            date,
            in_focus: mode != ViewMode::Month || (date.year(), date.month()) == focus_month,
            appointments: Vec::new(),
            hours: match mode {
                ViewMode::Month => Vec::new(),
                ViewMode::Day | ViewMode::Week => hours
                    .clone()
                    .map(|hour| HourCell {
                        hour,
                        appointments: Vec::new(),
                    })
                    .collect(),
            },
        })
        .collect();

    let Some(&first) = dates.first() else {
        return ScheduleGrid { mode, anchor, days };
    };

    let mut skipped = 0usize;
    for appt in appointments {
        let Some(start) = appt.starts_at() else {
            skipped += 1;
            continue;
        };
        let local = to_local(start, tz);
        let offset = (local.date_naive() - first).num_days();
        let Some(day) = usize::try_from(offset).ok().and_then(|i| days.get_mut(i)) else {
            continue;
        };
        day.appointments.push(appt.clone());
        if let Some(cell) = day.hours.iter_mut().find(|c| c.hour == local.hour()) {
            cell.appointments.push(appt.clone());
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Appointments with unparseable start left out of grid");
    }

    ScheduleGrid { mode, anchor, days }
}

/// Position and size of an appointment block inside its starting hour row.
///
/// Returns `None` when the appointment has no valid window.
pub fn block_layout(appt: &Appointment, tz: Tz, options: &GridOptions) -> Option<BlockLayout> {
    let slot = appt.slot()?;
    let start = to_local(slot.start(), tz);
    let end = to_local(slot.end(), tz);
    let duration_minutes = slot.duration().num_minutes();

    let top_px = start.minute() as f32 / 60.0 * options.hour_height_px;
    let height_px =
        (duration_minutes as f32 / 60.0 * options.hour_height_px).max(options.min_block_height_px);

    Some(BlockLayout {
        top_px,
        height_px,
        duration_minutes,
        expanded: duration_minutes > 60 || start.minute() > 0 || end.minute() > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::appointment;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_grid_has_42_cells_starting_on_monday() {
        for year in 2023..=2025 {
            for month in 1..=12 {
                let anchor = date(year, month, 15);
                let dates = visible_dates(ViewMode::Month, anchor);
                let first_of_month = date(year, month, 1);
                assert_eq!(dates.len(), MONTH_GRID_CELLS);
                assert_eq!(dates[0].weekday(), Weekday::Mon);
                assert!(dates[0] <= first_of_month);
                assert!((first_of_month - dates[0]).num_days() < 7);
                assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
            }
        }
    }

    #[test]
    fn month_starting_on_monday_begins_with_the_first() {
        // January 2024 starts on a Monday.
        let dates = visible_dates(ViewMode::Month, date(2024, 1, 20));
        assert_eq!(dates[0], date(2024, 1, 1));
        assert_eq!(dates[41], date(2024, 2, 11));
    }

    #[test]
    fn week_view_is_monday_first() {
        let dates = visible_dates(ViewMode::Week, date(2024, 1, 4));
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], date(2024, 1, 1));
        assert_eq!(dates[6], date(2024, 1, 7));

        let sunday = visible_dates(ViewMode::Week, date(2024, 1, 7));
        assert_eq!(sunday[0], date(2024, 1, 1));
    }

    #[test]
    fn day_view_shows_only_the_anchor() {
        assert_eq!(visible_dates(ViewMode::Day, date(2024, 2, 29)), vec![date(2024, 2, 29)]);
    }

    #[test]
    fn buckets_by_date_and_hour() {
        let appts = vec![
            appointment("a", "2024-01-01T09:00:00", "2024-01-01T10:00:00"),
            appointment("b", "2024-01-01T09:30:00", "2024-01-01T09:45:00"),
            appointment("c", "2024-01-03T14:10:00", "2024-01-03T15:00:00"),
            appointment("d", "2024-01-09T09:00:00", "2024-01-09T10:00:00"),
        ];
        let grid = bucket(&appts, ViewMode::Week, date(2024, 1, 2), Tz::UTC, &GridOptions::default());

        assert_eq!(grid.days.len(), 7);
        let monday = grid.day(date(2024, 1, 1)).unwrap();
        let ids: Vec<_> = monday.appointments.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let nine = grid.cell(date(2024, 1, 1), 9).unwrap();
        assert_eq!(nine.appointments.len(), 2);
        assert!(grid.cell(date(2024, 1, 1), 10).unwrap().appointments.is_empty());
        assert_eq!(grid.cell(date(2024, 1, 3), 14).unwrap().appointments[0].id, "c");

        // Next week's appointment is outside the grid.
        let total: usize = grid.days.iter().map(|d| d.appointments.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn invalid_start_is_excluded_not_an_error() {
        let appts = vec![
            appointment("ok", "2024-01-01T09:00:00", "2024-01-01T10:00:00"),
            appointment("bad", "yesterday-ish", "2024-01-01T10:00:00"),
        ];
        let grid = bucket(&appts, ViewMode::Day, date(2024, 1, 1), Tz::UTC, &GridOptions::default());
        assert_eq!(grid.days[0].appointments.len(), 1);
        assert_eq!(grid.days[0].appointments[0].id, "ok");
    }

    #[test]
    fn bucketing_uses_display_timezone() {
        let tz: Tz = "Europe/Warsaw".parse().unwrap();
        // 23:30 UTC on Jan 1 is 00:30 local on Jan 2.
        let appts = vec![appointment("late", "2024-01-01T23:30:00", "2024-01-02T00:30:00")];
        let options = GridOptions {
            first_hour: 0,
            last_hour: 23,
            ..GridOptions::default()
        };
        let grid = bucket(&appts, ViewMode::Week, date(2024, 1, 1), tz, &options);
        assert!(grid.day(date(2024, 1, 1)).unwrap().appointments.is_empty());
        assert_eq!(grid.cell(date(2024, 1, 2), 0).unwrap().appointments.len(), 1);
    }

    #[test]
    fn appointments_outside_hour_rows_stay_in_day_cell() {
        let appts = vec![appointment("early", "2024-01-01T06:00:00", "2024-01-01T07:00:00")];
        let grid = bucket(&appts, ViewMode::Day, date(2024, 1, 1), Tz::UTC, &GridOptions::default());
        let day = &grid.days[0];
        assert_eq!(day.appointments.len(), 1);
        assert!(day.hours.iter().all(|h| h.appointments.is_empty()));
        assert_eq!(day.hours.first().unwrap().hour, 8);
        assert_eq!(day.hours.last().unwrap().hour, 20);
    }

    #[test]
    fn month_view_marks_padding_days_and_has_no_hours() {
        let appts = vec![appointment("x", "2024-02-01T09:00:00", "2024-02-01T10:00:00")];
        let grid = bucket(&appts, ViewMode::Month, date(2024, 1, 10), Tz::UTC, &GridOptions::default());
        assert_eq!(grid.days.len(), 42);
        assert!(grid.days.iter().all(|d| d.hours.is_empty()));
        let feb_first = grid.day(date(2024, 2, 1)).unwrap();
        assert!(!feb_first.in_focus);
        assert_eq!(feb_first.appointments.len(), 1);
        assert!(grid.day(date(2024, 1, 31)).unwrap().in_focus);
    }

    #[test]
    fn bucketing_is_deterministic() {
        let appts = vec![
            appointment("a", "2024-01-01T09:00:00", "2024-01-01T10:00:00"),
            appointment("b", "2024-01-02T11:00:00", "2024-01-02T12:00:00"),
        ];
        let opts = GridOptions::default();
        let one = bucket(&appts, ViewMode::Week, date(2024, 1, 1), Tz::UTC, &opts);
        let two = bucket(&appts, ViewMode::Week, date(2024, 1, 1), Tz::UTC, &opts);
        assert_eq!(
            serde_json::to_value(&one).unwrap(),
            serde_json::to_value(&two).unwrap()
        );
    }

    #[test]
    fn fetch_range_spans_visible_dates() {
        let range = fetch_range(ViewMode::Month, date(2024, 3, 10));
        assert_eq!(range.first, date(2024, 2, 26));
        assert_eq!(range.days(), 42);
        assert!(range.contains(date(2024, 3, 31)));

        let (from, to) = range.utc_bounds(Tz::UTC);
        assert_eq!(from.date_naive(), date(2024, 2, 26));
        assert_eq!(to.date_naive(), range.last);
    }

    #[test]
    fn navigation_steps_by_view_length() {
        let anchor = date(2024, 1, 31);
        assert_eq!(navigate(ViewMode::Day, anchor, NavDirection::Next), date(2024, 2, 1));
        assert_eq!(navigate(ViewMode::Week, anchor, NavDirection::Previous), date(2024, 1, 24));
        assert_eq!(navigate(ViewMode::Month, anchor, NavDirection::Next), date(2024, 2, 29));
        assert_eq!(navigate(ViewMode::Month, date(2024, 3, 31), NavDirection::Previous), date(2024, 2, 29));
    }

    #[test]
    fn block_layout_follows_minutes_and_duration() {
        let opts = GridOptions::default();
        let hour = appointment("h", "2024-01-01T09:00:00", "2024-01-01T10:00:00");
        let layout = block_layout(&hour, Tz::UTC, &opts).unwrap();
        assert_eq!(layout.top_px, 0.0);
        assert_eq!(layout.height_px, 80.0);
        assert!(!layout.expanded);

        let short = appointment("s", "2024-01-01T09:30:00", "2024-01-01T09:45:00");
        let layout = block_layout(&short, Tz::UTC, &opts).unwrap();
        assert_eq!(layout.top_px, 40.0);
        assert_eq!(layout.height_px, 36.0);
        assert_eq!(layout.duration_minutes, 15);
        assert!(layout.expanded);

        let long = appointment("l", "2024-01-01T09:00:00", "2024-01-01T11:00:00");
        let layout = block_layout(&long, Tz::UTC, &opts).unwrap();
        assert_eq!(layout.height_px, 160.0);
        assert!(layout.expanded);

        let broken = appointment("b", "2024-01-01T09:00:00", "nope");
        assert!(block_layout(&broken, Tz::UTC, &opts).is_none());
    }
}
