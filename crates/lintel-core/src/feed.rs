use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::color::{DEFAULT_USER_COLOR, Rgb};
use crate::datetime::parse_backend_timestamp;
use crate::schedule::{DaySlots, DoorType, Installer, Role, SlotBooking, TimeSlot};

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarFeed {
    pub calendar: Vec<FeedDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedDay {
    pub date: String,
    #[serde(default)]
    pub morning: Option<FeedBooking>,
    #[serde(default)]
    pub afternoon: Option<FeedBooking>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedBooking {
    pub id: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time_slot: Option<String>,
    #[serde(default)]
    pub door_type: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub is_weekend: bool,
    #[serde(default)]
    pub user: Option<FeedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub user_color: Option<String>,
}

#[tracing::instrument(skip(data_dir))]
pub fn load_day_slots(data_dir: &Path, door: DoorType) -> anyhow::Result<Vec<DaySlots>> {
    let path = data_dir.join(format!("{}.json", door.as_str()));
    if !path.exists() {
        // An absent feed is an empty calendar, not an error.
        debug!(file = %path.display(), "no feed file; calendar is empty");
        return Ok(vec![]);
    }

    debug!(file = %path.display(), "loading calendar feed");
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let feed: CalendarFeed = serde_json::from_str(&text)
        .with_context(|| format!("failed parsing {}", path.display()))?;

    let days = day_slots_from_feed(feed, door)
        .with_context(|| format!("invalid feed {}", path.display()))?;
    debug!(count = days.len(), "loaded calendar days");
    Ok(days)
}

pub fn day_slots_from_feed(feed: CalendarFeed, door: DoorType) -> anyhow::Result<Vec<DaySlots>> {
    let mut days = Vec::with_capacity(feed.calendar.len());
    for (idx, entry) in feed.calendar.into_iter().enumerate() {
        let day = day_from_entry(entry, door).with_context(|| format!("calendar entry {idx}"))?;
        days.push(day);
    }
    Ok(days)
}

fn day_from_entry(entry: FeedDay, door: DoorType) -> anyhow::Result<DaySlots> {
    let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid date {:?}: {err}", entry.date))?;

    let morning = entry
        .morning
        .map(|b| booking_from_feed(b, date, TimeSlot::Morning, door))
        .transpose()?;
    let afternoon = entry
        .afternoon
        .map(|b| booking_from_feed(b, date, TimeSlot::Afternoon, door))
        .transpose()?;

    Ok(DaySlots {
        date,
        morning,
        afternoon,
    })
}

fn booking_from_feed(
    raw: FeedBooking,
    date: NaiveDate,
    slot: TimeSlot,
    door: DoorType,
) -> anyhow::Result<SlotBooking> {
    if let Some(wire_date) = &raw.date {
        let booking_date = NaiveDate::parse_from_str(wire_date, "%Y-%m-%d")
            .map_err(|err| anyhow!("booking {} has invalid date {wire_date:?}: {err}", raw.id))?;
        if booking_date != date {
            return Err(anyhow!(
                "booking {} dated {booking_date} listed under {date}",
                raw.id
            ));
        }
    }

    if let Some(wire_slot) = &raw.time_slot
        && wire_slot != slot.as_str()
    {
        return Err(anyhow!(
            "booking {} has time slot {wire_slot:?} but sits in the {} slot",
            raw.id,
            slot.as_str()
        ));
    }

    if let Some(wire_door) = &raw.door_type {
        let booking_door: DoorType = wire_door
            .parse()
            .with_context(|| format!("booking {}", raw.id))?;
        if booking_door != door {
            return Err(anyhow!(
                "booking {} is for {} but appears in the {} feed",
                raw.id,
                booking_door.as_str(),
                door.as_str()
            ));
        }
    }

    let user = raw
        .user
        .ok_or_else(|| anyhow!("booking {} has no user", raw.id))?;
    let color = match user.user_color.as_deref() {
        Some(raw_color) => Rgb::parse(raw_color)
            .with_context(|| format!("booking {} user color", raw.id))?,
        None => DEFAULT_USER_COLOR,
    };

    let updated_at = raw
        .updated_at
        .as_deref()
        .map(parse_backend_timestamp)
        .transpose()
        .with_context(|| format!("booking {} updated_at", raw.id))?;

    let mut booking = SlotBooking {
        id: raw.id,
        installer: Installer {
            id: user.id,
            username: user.username,
            role: user.role,
            color,
        },
        is_weekend: raw.is_weekend,
        invoice_number: raw.invoice_number,
        address: raw.address,
        comment: raw.comment,
        updated_at,
    };
    booking.normalize_weekend();
    Ok(booking)
}
