use std::sync::LazyLock;

use chrono::{
  DateTime,
  Local,
  NaiveDate,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{
  TaskError,
  TaskResult
};

const TIMEZONE_ENV_VAR: &str =
  "DONEZO_TIMEZONE";
const DATE_INPUT_FORMAT: &str =
  "%Y-%m-%d";

static DATE_INPUT_RE: LazyLock<
  Result<Regex, regex::Error>
> = LazyLock::new(|| {
  Regex::new(r"^\d{4}-\d{2}-\d{2}$")
});

/// Zone used to turn instants into
/// calendar dates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Zone {
  #[default]
  Local,
  Named(Tz)
}

impl Zone {
  /// `$DONEZO_TIMEZONE` beats the config
  /// value; neither set means system
  /// local time.
  pub fn resolve(
    configured: Option<&str>
  ) -> Self {
    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
      && let Some(tz) = parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
    {
      return Zone::Named(tz);
    }

    if let Some(raw) = configured
      && let Some(tz) =
        parse_timezone(raw, "timezone")
    {
      return Zone::Named(tz);
    }

    Zone::Local
  }

  #[must_use]
  pub fn date_of(
    &self,
    dt: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Zone::Local => {
        dt.with_timezone(&Local)
          .date_naive()
      }
      | Zone::Named(tz) => {
        dt.with_timezone(tz)
          .date_naive()
      }
    }
  }

  /// First instant of `date` in this
  /// zone.
  #[must_use]
  pub fn start_of_day(
    &self,
    date: NaiveDate
  ) -> DateTime<Utc> {
    let midnight =
      date.and_hms_opt(0, 0, 0);
    let one_am =
      date.and_hms_opt(1, 0, 0);

    let resolved = match self {
      | Zone::Local => {
        midnight
          .and_then(|ndt| {
            Local
              .from_local_datetime(&ndt)
              .earliest()
          })
          .or_else(|| {
            one_am.and_then(|ndt| {
              Local
                .from_local_datetime(
                  &ndt
                )
                .earliest()
            })
          })
          .map(|dt| dt.with_timezone(&Utc))
      }
      | Zone::Named(tz) => {
        midnight
          .and_then(|ndt| {
            tz.from_local_datetime(&ndt)
              .earliest()
          })
          .or_else(|| {
            one_am.and_then(|ndt| {
              tz.from_local_datetime(
                &ndt
              )
              .earliest()
            })
          })
          .map(|dt| dt.with_timezone(&Utc))
      }
    };

    resolved.unwrap_or_else(|| {
      tracing::warn!(
        %date,
        "no local midnight for date; \
         using UTC midnight"
      );
      date
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
    })
  }
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(err) => {
      tracing::error!(
        source,
        timezone = trimmed,
        error = %err,
        "invalid timezone; ignoring"
      );
      None
    }
  }
}

/// Source of "now". Sessions use the
/// system clock, tests pin a fixed
/// instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
  #[default]
  System,
  Fixed(DateTime<Utc>)
}

impl Clock {
  #[must_use]
  pub fn now(&self) -> DateTime<Utc> {
    match self {
      | Clock::System => Utc::now(),
      | Clock::Fixed(at) => *at
    }
  }
}

/// How a due date relates to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
  Overdue,
  Today,
  Future
}

#[must_use]
pub fn due_state(
  due: DateTime<Utc>,
  today: NaiveDate,
  zone: &Zone
) -> DueState {
  let due_date = zone.date_of(due);
  if due_date < today {
    DueState::Overdue
  } else if due_date == today {
    DueState::Today
  } else {
    DueState::Future
  }
}

/// Parses a date-only form value.
///
/// Blank input clears the due date;
/// anything that is not a real
/// `YYYY-MM-DD` date is rejected rather
/// than dropped.
pub fn parse_due_input(
  raw: &str,
  zone: &Zone
) -> TaskResult<Option<DateTime<Utc>>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }

  let date_re =
    DATE_INPUT_RE.as_ref().map_err(|e| {
      TaskError::InvalidArgument(format!(
        "internal regex compile \
         failure: {e}"
      ))
    })?;
  if !date_re.is_match(trimmed) {
    return Err(TaskError::validation(
      "due_date",
      format!(
        "expected YYYY-MM-DD, got \
         '{trimmed}'"
      )
    ));
  }

  let date = NaiveDate::parse_from_str(
    trimmed,
    DATE_INPUT_FORMAT
  )
  .map_err(|err| {
    TaskError::validation(
      "due_date",
      format!(
        "'{trimmed}' is not a calendar \
         date: {err}"
      )
    )
  })?;

  tracing::trace!(%date, "parsed due date input");
  Ok(Some(zone.start_of_day(date)))
}

#[must_use]
pub fn format_date_input(
  dt: DateTime<Utc>,
  zone: &Zone
) -> String {
  zone
    .date_of(dt)
    .format(DATE_INPUT_FORMAT)
    .to_string()
}

/// Short label such as `Oct 18`.
#[must_use]
pub fn format_due_label(
  dt: DateTime<Utc>,
  zone: &Zone
) -> String {
  zone
    .date_of(dt)
    .format("%b %-d")
    .to_string()
}
