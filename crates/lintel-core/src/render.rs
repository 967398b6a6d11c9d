use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::color::{Rgb, WEEKEND_COLOR};
use crate::config::Config;
use crate::datetime::{format_date, format_timestamp};
use crate::grid::CalendarGrid;
use crate::schedule::{DaySlots, DoorType, SlotBooking, TimeSlot};
use crate::view::ViewModel;

const CELL_WIDTH: usize = 13;
const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, grid, today))]
    pub fn print_month(
        &mut self,
        grid: &CalendarGrid,
        door: DoorType,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{} ({})", grid.month(), door.label())?;
        for name in WEEKDAY_NAMES {
            write!(out, "{} ", fit_width(name, CELL_WIDTH))?;
        }
        writeln!(out)?;

        for row in grid.rows() {
            for day in row {
                let label = match day {
                    Some(day) => day.date.day().to_string(),
                    None => String::new(),
                };
                let cell = fit_width(&label, CELL_WIDTH);
                let cell = if day.as_ref().is_some_and(|d| d.date == today) {
                    self.paint(&cell, "1;33")
                } else {
                    cell
                };
                write!(out, "{cell} ")?;
            }
            writeln!(out)?;

            for slot in TimeSlot::ALL {
                for day in row {
                    write!(out, "{} ", self.slot_cell(day.as_ref(), slot))?;
                }
                writeln!(out)?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, grid, vm, today))]
    pub fn print_week(
        &mut self,
        grid: &CalendarGrid,
        door: DoorType,
        vm: &ViewModel,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let week = grid.week(vm.week_index)?;
        let mut out = io::stdout().lock();

        writeln!(
            out,
            "{} ({}) week {}/{}",
            grid.month(),
            door.label(),
            vm.week_index + 1,
            vm.week_count
        )?;

        for day in week.iter().flatten() {
            let header = format!("{} {}", day.date.weekday(), format_date(day.date));
            let header = if day.date == today {
                self.paint(&header, "1;33")
            } else {
                header
            };
            writeln!(out, "{header}")?;

            for slot in TimeSlot::ALL {
                writeln!(
                    out,
                    "  {} {}  {}",
                    fit_width(slot.as_str(), 9),
                    fit_width(slot.window(), 11),
                    self.slot_text(day, slot)
                )?;
            }
        }

        let mut nav = Vec::new();
        if vm.has_prev_week() {
            nav.push(format!("prev: week {}", vm.week_index));
        }
        if vm.has_next_week() {
            nav.push(format!("next: week {}", vm.week_index + 2));
        }
        if !nav.is_empty() {
            writeln!(out, "{}", nav.join("  "))?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, grid))]
    pub fn print_list(&mut self, grid: &CalendarGrid, door: DoorType) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Date".to_string(),
            "Slot".to_string(),
            "Installer".to_string(),
            "Invoice".to_string(),
            "Address".to_string(),
            "Comment".to_string(),
        ];

        let mut rows = Vec::new();
        for day in grid.rows().iter().flatten().flatten() {
            for slot in TimeSlot::ALL {
                let Some(booking) = day.slot(slot) else {
                    continue;
                };
                let installer = if booking.is_weekend {
                    "day off".to_string()
                } else {
                    self.paint(&booking.installer.username, &fg_code(booking.installer.color))
                };
                rows.push(vec![
                    format_date(day.date),
                    slot.as_str().to_string(),
                    installer,
                    booking.invoice_number.clone().unwrap_or_default(),
                    booking.address.clone().unwrap_or_default(),
                    booking.comment.clone().unwrap_or_default(),
                ]);
            }
        }

        writeln!(out, "{} ({})", grid.month(), door.label())?;
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, booking, tz))]
    pub fn print_booking_info(
        &mut self,
        booking: &SlotBooking,
        date: NaiveDate,
        slot: TimeSlot,
        door: DoorType,
        tz: Tz,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", booking.id)?;
        if booking.is_weekend {
            writeln!(out, "status    day off")?;
        }
        writeln!(out, "door      {}", door.as_str())?;
        writeln!(out, "date      {}", format_date(date))?;
        writeln!(out, "slot      {} ({})", slot.as_str(), slot.window())?;
        writeln!(
            out,
            "installer {}",
            self.paint(&booking.installer.username, &fg_code(booking.installer.color))
        )?;
        if let Some(role) = booking.installer.role {
            writeln!(out, "role      {}", role.as_str())?;
        }
        writeln!(out, "color     {}", booking.installer.color)?;
        if let Some(invoice) = &booking.invoice_number {
            writeln!(out, "invoice   {invoice}")?;
        }
        if let Some(address) = &booking.address {
            writeln!(out, "address   {address}")?;
        }
        if let Some(comment) = &booking.comment {
            writeln!(out, "comment   {comment}")?;
        }
        if let Some(updated) = booking.updated_at {
            writeln!(out, "updated   {}", format_timestamp(updated, &tz))?;
        }

        Ok(())
    }

    fn slot_cell(&self, day: Option<&DaySlots>, slot: TimeSlot) -> String {
        let Some(day) = day else {
            return " ".repeat(CELL_WIDTH);
        };
        match day.slot(slot) {
            Some(b) if b.is_weekend => {
                self.paint(&fit_width("day off", CELL_WIDTH), &block_code(WEEKEND_COLOR))
            }
            Some(b) => self.paint(
                &fit_width(&b.installer.username, CELL_WIDTH),
                &block_code(b.installer.color),
            ),
            None => self.paint(&fit_width("free", CELL_WIDTH), "2"),
        }
    }

    fn slot_text(&self, day: &DaySlots, slot: TimeSlot) -> String {
        match day.slot(slot) {
            Some(b) if b.is_weekend => self.paint("day off", &block_code(WEEKEND_COLOR)),
            Some(b) => {
                let name = self.paint(&b.installer.username, &fg_code(b.installer.color));
                match &b.invoice_number {
                    Some(invoice) => format!("{name} {invoice}"),
                    None => name,
                }
            }
            None => self.paint("free", "2"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn fg_code(color: Rgb) -> String {
    format!("38;2;{};{};{}", color.r, color.g, color.b)
}

// Background plus the readable text color for that background, as one SGR code.
fn block_code(bg: Rgb) -> String {
    let fg = bg.contrast_text();
    format!(
        "48;2;{};{};{};38;2;{};{};{}",
        bg.r, bg.g, bg.b, fg.r, fg.g, fg.b
    )
}

// Truncates to the display width, then pads; wide characters never split.
fn fit_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }

    out.push_str(&" ".repeat(width - used));
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
