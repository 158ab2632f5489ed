//! Simulation, release and meteo-prefetch windows derived from a start date.

use crate::domain::{Direction, FlexpartError, FlexpartResult, SimulationDate};
use chrono::{Duration, NaiveDateTime};

/// Added to the release duration when computing the meteo window.
pub const METEO_PREFETCH_PAD_SECONDS: i64 = 3600;

pub const METEO_WINDOW_FORMAT: &str = "%Y%m%d%H";
pub const COMMAND_DATE_FORMAT: &str = "%Y%m%d";
pub const COMMAND_TIME_FORMAT: &str = "%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub beginning: NaiveDateTime,
    pub ending: NaiveDateTime,
}

impl TimeWindow {
    /// Builds a window from two instants, swapping them when they are inverted.
    pub fn ordered(first: NaiveDateTime, second: NaiveDateTime) -> Self {
        if first > second {
            Self {
                beginning: second,
                ending: first,
            }
        } else {
            Self {
                beginning: first,
                ending: second,
            }
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.ending - self.beginning).num_seconds()
    }

    pub fn beginning_pair(&self) -> [String; 2] {
        command_pair(self.beginning)
    }

    pub fn ending_pair(&self) -> [String; 2] {
        command_pair(self.ending)
    }
}

/// `[YYYYMMDD, HHMMSS]` as written into COMMAND and RELEASES.
pub fn command_pair(instant: NaiveDateTime) -> [String; 2] {
    [
        instant.format(COMMAND_DATE_FORMAT).to_string(),
        instant.format(COMMAND_TIME_FORMAT).to_string(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationPeriod {
    pub simulation: TimeWindow,
    pub release: TimeWindow,
    pub age_class_seconds: i64,
}

/// Moves `instant` by `seconds`, failing instead of leaving chrono's range.
fn shift(instant: NaiveDateTime, seconds: Option<i64>, what: &str) -> FlexpartResult<NaiveDateTime> {
    seconds
        .and_then(Duration::try_seconds)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| {
            FlexpartError::input_validation(
                "INPUT.TIME_WINDOW",
                format!("{what} moves {instant} outside the representable date range"),
            )
        })
}

impl SimulationPeriod {
    pub fn compute(
        start: SimulationDate,
        age_class_seconds: i64,
        release_duration_seconds: i64,
        direction: Direction,
    ) -> FlexpartResult<Self> {
        let start = start.datetime();
        let sign = direction.sign();
        let release_end = shift(
            start,
            sign.checked_mul(release_duration_seconds),
            "release duration",
        )?;
        let simulation_end = shift(
            release_end,
            sign.checked_mul(age_class_seconds),
            "age class",
        )?;

        Ok(Self {
            simulation: TimeWindow::ordered(start, simulation_end),
            release: TimeWindow::ordered(start, release_end),
            age_class_seconds,
        })
    }

    pub fn compute_from_str(
        start: &str,
        age_class_seconds: i64,
        release_duration_seconds: i64,
        direction: Direction,
    ) -> FlexpartResult<Self> {
        let start = SimulationDate::parse(start)?;
        Self::compute(start, age_class_seconds, release_duration_seconds, direction)
    }
}

/// Date range handed to the meteo staging scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeteoWindow {
    pub start: String,
    pub end: String,
}

impl MeteoWindow {
    pub fn compute(
        start: SimulationDate,
        age_class_seconds: i64,
        release_duration_seconds: i64,
        direction: Direction,
    ) -> FlexpartResult<Self> {
        let padded = release_duration_seconds
            .checked_add(METEO_PREFETCH_PAD_SECONDS)
            .ok_or_else(|| {
                FlexpartError::input_validation(
                    "INPUT.TIME_WINDOW",
                    format!("release duration {release_duration_seconds}s cannot take the meteo pad"),
                )
            })?;
        let period = SimulationPeriod::compute(start, age_class_seconds, padded, direction)?;
        Ok(Self {
            start: period
                .simulation
                .beginning
                .format(METEO_WINDOW_FORMAT)
                .to_string(),
            end: period
                .simulation
                .ending
                .format(METEO_WINDOW_FORMAT)
                .to_string(),
        })
    }
}

/// Splits a release window into consecutive `[t - chunk, t]` slices.
pub fn release_chunks(release: &TimeWindow, chunk_seconds: i64) -> FlexpartResult<Vec<TimeWindow>> {
    if chunk_seconds <= 0 {
        return Err(FlexpartError::input_validation(
            "INPUT.RELEASE_CHUNK",
            format!("release chunk must be a positive number of seconds, got {chunk_seconds}"),
        ));
    }

    let mut chunks = Vec::new();
    let mut beginning = release.beginning;
    loop {
        let ending = shift(beginning, Some(chunk_seconds), "release chunk")?;
        if ending > release.ending {
            break;
        }
        chunks.push(TimeWindow { beginning, ending });
        beginning = ending;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::{MeteoWindow, SimulationPeriod, TimeWindow, release_chunks};
    use crate::domain::{Direction, SimulationDate};

    const DAY: i64 = 86_400;

    fn date(value: &str) -> SimulationDate {
        SimulationDate::parse(value).expect("test date should parse")
    }

    #[test]
    fn backward_window_collapses_onto_start_date() {
        let start = date("2021-01-02 00:00:00");
        let period = SimulationPeriod::compute(start, DAY, DAY, Direction::Backward)
            .expect("window");

        assert_eq!(period.simulation.ending, start.datetime());
        assert_eq!(
            period.simulation.beginning,
            date("2020-12-31 00:00:00").datetime()
        );
        assert_eq!(period.release.beginning, date("2021-01-01 00:00:00").datetime());
        assert_eq!(period.release.ending, start.datetime());
        assert_eq!(period.age_class_seconds, DAY);
    }

    #[test]
    fn forward_window_extends_past_release() {
        let start = date("2021-01-02 00:00:00");
        let period = SimulationPeriod::compute(start, DAY, 3 * 3600, Direction::Forward).expect("window");

        assert_eq!(period.simulation.beginning, start.datetime());
        assert_eq!(
            period.simulation.ending,
            date("2021-01-03 03:00:00").datetime()
        );
        assert_eq!(period.release.ending, date("2021-01-02 03:00:00").datetime());
    }

    #[test]
    fn beginning_never_exceeds_ending() {
        let start = date("2020-02-28 18:00:00");
        for direction in [Direction::Forward, Direction::Backward] {
            for age_class in [0, 3600, DAY, 10 * DAY] {
                for release_duration in [0, 1800, DAY] {
                    let period =
                        SimulationPeriod::compute(start, age_class, release_duration, direction)
                            .expect("window");
                    assert!(period.simulation.beginning <= period.simulation.ending);
                    assert!(period.release.beginning <= period.release.ending);
                }
            }
        }
    }

    #[test]
    fn repeated_computation_is_identical() {
        let start = date("2021-06-15 12:00:00");
        let first = MeteoWindow::compute(start, 2 * DAY, DAY, Direction::Backward).expect("window");
        let second = MeteoWindow::compute(start, 2 * DAY, DAY, Direction::Backward).expect("window");
        assert_eq!(first, second);
    }

    #[test]
    fn meteo_window_carries_one_hour_pad() {
        let start = date("2021-01-02 00:00:00");
        let window = MeteoWindow::compute(start, DAY, DAY, Direction::Backward).expect("window");
        assert_eq!(window.start, "2020123023");
        assert_eq!(window.end, "2021010200");

        let forward = MeteoWindow::compute(start, DAY, DAY, Direction::Forward).expect("window");
        assert_eq!(forward.start, "2021010200");
        assert_eq!(forward.end, "2021010401");
    }

    #[test]
    fn malformed_start_propagates_parse_error() {
        let error = SimulationPeriod::compute_from_str("02.01.2021", DAY, DAY, Direction::Forward)
            .expect_err("malformed date should fail");
        assert_eq!(error.placeholder(), "INPUT.DATE_FORMAT");
    }

    #[test]
    fn command_pairs_split_date_and_time() {
        let window = TimeWindow::ordered(
            date("2021-01-02 03:00:00").datetime(),
            date("2021-01-01 21:30:00").datetime(),
        );
        assert_eq!(window.beginning_pair(), ["20210101".to_string(), "213000".to_string()]);
        assert_eq!(window.ending_pair(), ["20210102".to_string(), "030000".to_string()]);
        assert_eq!(window.duration_seconds(), 5 * 3600 + 1800);
    }

    #[test]
    fn release_is_split_into_whole_chunks() {
        let release = TimeWindow::ordered(
            date("2021-01-01 00:00:00").datetime(),
            date("2021-01-01 10:00:00").datetime(),
        );
        let chunks = release_chunks(&release, 3 * 3600).expect("chunks should be computed");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].beginning, release.beginning);
        assert_eq!(chunks[2].ending, date("2021-01-01 09:00:00").datetime());

        let error = release_chunks(&release, 0).expect_err("zero chunk is rejected");
        assert_eq!(error.placeholder(), "INPUT.RELEASE_CHUNK");
    }

    #[test]
    fn out_of_range_durations_are_input_errors() {
        let start = date("2021-01-02 00:00:00");
        let error = SimulationPeriod::compute(start, 9_000_000_000_000, DAY, Direction::Backward)
            .expect_err("age class leaves the date range");
        assert_eq!(error.placeholder(), "INPUT.TIME_WINDOW");
        assert_eq!(error.exit_code(), 2);

        let error = MeteoWindow::compute(start, DAY, i64::MAX, Direction::Forward)
            .expect_err("padded release overflows");
        assert_eq!(error.placeholder(), "INPUT.TIME_WINDOW");

        let error = SimulationPeriod::compute(start, DAY, i64::MIN, Direction::Backward)
            .expect_err("negated release overflows");
        assert_eq!(error.placeholder(), "INPUT.TIME_WINDOW");
    }
}
