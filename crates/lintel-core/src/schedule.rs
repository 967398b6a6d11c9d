use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoorType {
    Entrance,
    Interior,
}

impl DoorType {
    pub const ALL: [DoorType; 2] = [DoorType::Entrance, DoorType::Interior];

    pub fn as_str(self) -> &'static str {
        match self {
            DoorType::Entrance => "entrance",
            DoorType::Interior => "interior",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DoorType::Entrance => "entrance doors",
            DoorType::Interior => "interior doors",
        }
    }
}

impl std::str::FromStr for DoorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entrance" => Ok(DoorType::Entrance),
            "interior" => Ok(DoorType::Interior),
            other => Err(anyhow!(
                "unknown door type: {other} (expected entrance or interior)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 2] = [TimeSlot::Morning, TimeSlot::Afternoon];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
        }
    }

    pub fn window(self) -> &'static str {
        match self {
            TimeSlot::Morning => "9:00-13:00",
            TimeSlot::Afternoon => "15:00-18:00",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    InstallerEntrance,
    InstallerInterior,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::InstallerEntrance => "installer_entrance",
            Role::InstallerInterior => "installer_interior",
        }
    }

    pub fn default_door(self) -> DoorType {
        match self {
            Role::InstallerInterior => DoorType::Interior,
            Role::Admin | Role::Manager | Role::InstallerEntrance => DoorType::Entrance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Installer {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub color: Rgb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotBooking {
    pub id: i64,
    pub installer: Installer,
    #[serde(default)]
    pub is_weekend: bool,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SlotBooking {
    // Weekend markers block the slot but never carry billing details.
    pub fn normalize_weekend(&mut self) {
        if self.is_weekend {
            self.invoice_number = None;
            self.address = None;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySlots {
    pub date: NaiveDate,
    #[serde(default)]
    pub morning: Option<SlotBooking>,
    #[serde(default)]
    pub afternoon: Option<SlotBooking>,
}

impl DaySlots {
    pub fn open(date: NaiveDate) -> Self {
        Self {
            date,
            morning: None,
            afternoon: None,
        }
    }

    pub fn slot(&self, slot: TimeSlot) -> Option<&SlotBooking> {
        match slot {
            TimeSlot::Morning => self.morning.as_ref(),
            TimeSlot::Afternoon => self.afternoon.as_ref(),
        }
    }

    pub fn is_fully_open(&self) -> bool {
        self.morning.is_none() && self.afternoon.is_none()
    }
}
