//! Calendar helpers: simulation date expressions and inversion chunking.

use crate::domain::{FlexpartError, FlexpartResult, SimulationDate};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn parse_day(value: &str) -> FlexpartResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).map_err(|source| {
        FlexpartError::input_validation(
            "INPUT.DATE_FORMAT",
            format!("invalid date '{}': expected '{}' ({})", value.trim(), DAY_FORMAT, source),
        )
    })
}

fn midnight(day: NaiveDate) -> FlexpartResult<SimulationDate> {
    day.and_hms_opt(0, 0, 0)
        .map(SimulationDate::from_datetime)
        .ok_or_else(|| {
            FlexpartError::internal("SYS.DATE_MIDNIGHT", format!("no midnight for '{day}'"))
        })
}

/// Expands date expressions into simulation start dates at midnight.
///
/// `2021-01-02--2021-01-04` is an inclusive daily range, `2021-01-02, 2021-01-10`
/// a list and `2021-01-02` a single day. Expressions are expanded in order and
/// duplicates are kept.
pub fn expand_simulation_dates<S: AsRef<str>>(expressions: &[S]) -> FlexpartResult<Vec<SimulationDate>> {
    let mut dates = Vec::new();
    for expression in expressions {
        let expression = expression.as_ref();
        if expression.contains(',') {
            for day in expression.split(',') {
                dates.push(midnight(parse_day(day)?)?);
            }
        } else if let Some((first, last)) = expression.split_once("--") {
            let first = parse_day(first)?;
            let last = parse_day(last)?;
            if last < first {
                return Err(FlexpartError::input_validation(
                    "INPUT.DATE_RANGE",
                    format!("date range '{expression}' ends before it starts"),
                ));
            }
            for day in first.iter_days().take_while(|day| *day <= last) {
                dates.push(midnight(day)?);
            }
        } else {
            dates.push(midnight(parse_day(expression)?)?);
        }
    }
    Ok(dates)
}

/// `YYYY-MM-DD--YYYY-MM-DD`
pub fn parse_date_range(value: &str) -> FlexpartResult<(NaiveDate, NaiveDate)> {
    let (first, last) = value.split_once("--").ok_or_else(|| {
        FlexpartError::input_validation(
            "INPUT.DATE_RANGE",
            format!("date range '{value}' must look like 'YYYY-MM-DD--YYYY-MM-DD'"),
        )
    })?;
    Ok((parse_day(first)?, parse_day(last)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chunk {
    Month,
    Year,
}

impl Chunk {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub const fn months(self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Year => 12,
        }
    }

    pub fn validate_width(self, width: &str) -> FlexpartResult<bool> {
        let allowed = match self {
            Self::Month => ["month", "3month"],
            Self::Year => ["year", "3year"],
        };
        if !allowed.contains(&width) {
            return Err(FlexpartError::input_validation(
                "INPUT.CHUNK_WIDTH",
                format!(
                    "chunk width '{}' is invalid for chunk '{}'; expected one of {:?}",
                    width,
                    self.as_str(),
                    allowed
                ),
            ));
        }
        Ok(width != self.as_str())
    }
}

impl Display for Chunk {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn shift_months(day: NaiveDate, months: i64) -> FlexpartResult<NaiveDate> {
    let magnitude = Months::new(months.unsigned_abs() as u32);
    let shifted = if months < 0 {
        day.checked_sub_months(magnitude)
    } else {
        day.checked_add_months(magnitude)
    };
    shifted.ok_or_else(|| {
        FlexpartError::input_validation(
            "INPUT.DATE_RANGE",
            format!("shifting '{day}' by {months} months leaves the supported calendar"),
        )
    })
}

/// Window of one chunk, widened by a full step on both sides when the chunk
/// width differs from the chunk itself (e.g. `year` chunks with `3year` width).
pub fn widened_chunk(start: NaiveDate, chunk: Chunk, width: &str) -> FlexpartResult<ChunkRange> {
    let widen = chunk.validate_width(width)?;
    let step = i64::from(chunk.months());
    let pad = if widen { step } else { 0 };
    Ok(ChunkRange {
        start: shift_months(start, -pad)?,
        end: shift_months(start, step + pad)?,
    })
}

/// Consecutive chunks covering `[start, end)`.
pub fn chunk_ranges(
    start: NaiveDate,
    end: NaiveDate,
    chunk: Chunk,
    width: &str,
) -> FlexpartResult<Vec<ChunkRange>> {
    chunk.validate_width(width)?;
    let mut ranges = Vec::new();
    let mut current = start;
    while current < end {
        ranges.push(widened_chunk(current, chunk, width)?);
        current = shift_months(current, i64::from(chunk.months()))?;
    }
    Ok(ranges)
}
