use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "LINTEL_TIMEZONE";
const TIMEZONE_CONFIG_KEY: &str =
  "time.zone";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "Europe/Moscow";

pub fn resolve_timezone(
  cfg: &Config
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) =
    cfg.get(TIMEZONE_CONFIG_KEY)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_CONFIG_KEY
    )
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(
  tz: &Tz,
  now: DateTime<Utc>
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format("%d.%m.%Y").to_string()
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format("%d.%m.%Y %H:%M")
    .to_string()
}

// The backend emits naive UTC
// timestamps (Python isoformat);
// offsets also accepted.
pub fn parse_backend_timestamp(
  raw: &str
) -> anyhow::Result<DateTime<Utc>> {
  let token = raw.trim();

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }
  }

  Err(anyhow!(
    "unrecognized timestamp: {raw} \
     (expected RFC3339 or \
     YYYY-MM-DDTHH:MM:SS[.ffffff])"
  ))
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    format_date,
    format_timestamp,
    parse_backend_timestamp,
    resolve_timezone,
    today_in
  };
  use crate::config::Config;

  #[test]
  fn parses_naive_isoformat_as_utc() {
    let parsed =
      parse_backend_timestamp(
        "2024-06-15T10:30:00.123456"
      )
      .expect("parse");
    assert_eq!(
      parsed
        .format("%Y-%m-%d %H:%M:%S")
        .to_string(),
      "2024-06-15 10:30:00"
    );

    let no_fraction =
      parse_backend_timestamp(
        "2024-06-15T10:30:00"
      )
      .expect("parse");
    let expected = Utc
      .with_ymd_and_hms(
        2024, 6, 15, 10, 30, 0
      )
      .single()
      .expect("valid instant");
    assert_eq!(no_fraction, expected);
  }

  #[test]
  fn parses_rfc3339_with_offset() {
    let parsed =
      parse_backend_timestamp(
        "2024-06-15T13:30:00+03:00"
      )
      .expect("parse");
    assert_eq!(
      parsed
        .format("%H:%M")
        .to_string(),
      "10:30"
    );
  }

  #[test]
  fn rejects_garbage_timestamps() {
    assert!(
      parse_backend_timestamp(
        "15.06.2024 10:30"
      )
      .is_err()
    );
    assert!(
      parse_backend_timestamp("soon")
        .is_err()
    );
  }

  #[test]
  fn formats_dates_and_timestamps_in_display_convention() {
    let tz: chrono_tz::Tz =
      "Europe/Moscow"
        .parse()
        .expect("tz");
    let dt = Utc
      .with_ymd_and_hms(
        2024, 6, 15, 10, 30, 0
      )
      .single()
      .expect("valid instant");
    assert_eq!(
      format_timestamp(dt, &tz),
      "15.06.2024 13:30"
    );
    assert_eq!(
      format_date(today_in(&tz, dt)),
      "15.06.2024"
    );
  }

  #[test]
  fn bad_config_timezone_falls_back_to_default() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc =
      dir.path().join("lintelrc");
    std::fs::write(
      &rc,
      "time.zone = Not/AZone\n"
    )
    .expect("write rc");
    let cfg = Config::load(Some(&rc))
      .expect("load config");
    assert_eq!(
      resolve_timezone(&cfg),
      chrono_tz::Europe::Moscow
    );
  }
}
