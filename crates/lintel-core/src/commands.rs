use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cli::{Invocation, ViewOptions};
use crate::config::Config;
use crate::datetime::{resolve_timezone, today_in};
use crate::feed::load_day_slots;
use crate::grid::{CalendarGrid, MonthRef, WeekRow};
use crate::render::Renderer;
use crate::schedule::{DoorType, TimeSlot};
use crate::view::{
    DEFAULT_VIEWPORT_PX, PresentationMode, ViewModel, ViewState, WEEK_VIEW_BREAKPOINT_PX,
};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "view",
        "month",
        "week",
        "list",
        "info",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(cfg, data_dir, renderer, opts, inv))]
pub fn dispatch(
    cfg: &Config,
    data_dir: &Path,
    renderer: &mut Renderer,
    opts: ViewOptions,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tz = resolve_timezone(cfg);
    let command = inv.command.as_str();

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "view" => cmd_view(cfg, data_dir, renderer, opts, &inv.command_args, now, tz),
        "month" => cmd_month(cfg, data_dir, renderer, opts, &inv.command_args, now, tz),
        "week" => cmd_week(cfg, data_dir, renderer, opts, &inv.command_args, now, tz),
        "list" => cmd_list(cfg, data_dir, renderer, opts, &inv.command_args, now, tz),
        "info" => cmd_info(data_dir, renderer, &inv.command_args, tz),
        "export" => cmd_export(cfg, data_dir, opts, &inv.command_args, now, tz),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!(
            "unknown command: {other} (known commands: {})",
            known_command_names().join(", ")
        )),
    }
}

#[instrument(skip(cfg, data_dir, renderer, opts, args, now, tz))]
fn cmd_view(
    cfg: &Config,
    data_dir: &Path,
    renderer: &mut Renderer,
    opts: ViewOptions,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command view");

    let today = today_in(&tz, now);
    let door = resolve_door(cfg, opts)?;
    let month = resolve_month(args, today)?;
    let days = load_day_slots(data_dir, door)?;
    let grid = CalendarGrid::build(month, &days);

    let mut state = ViewState::new(door, month);
    if let Some(mode) = opts.mode {
        state.set_mode(mode);
    }
    let viewport = resolve_viewport(cfg, opts)?;
    let breakpoint = resolve_breakpoint(cfg)?;
    state.handle_resize(viewport, breakpoint);
    state.clamp_week(grid.week_count());
    if state.mode == PresentationMode::Week {
        state.week_index = initial_week_index(&grid, today);
    }

    debug!(
        mode = ?state.mode,
        viewport,
        breakpoint,
        week_count = grid.week_count(),
        "resolved view"
    );

    match state.mode {
        PresentationMode::Month => renderer.print_month(&grid, door, today),
        PresentationMode::Week => {
            let vm = ViewModel::of(&state, &grid);
            renderer.print_week(&grid, door, &vm, today)
        }
    }
}

#[instrument(skip(cfg, data_dir, renderer, opts, args, now, tz))]
fn cmd_month(
    cfg: &Config,
    data_dir: &Path,
    renderer: &mut Renderer,
    opts: ViewOptions,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command month");

    let today = today_in(&tz, now);
    let door = resolve_door(cfg, opts)?;
    let month = resolve_month(args, today)?;
    let days = load_day_slots(data_dir, door)?;
    let grid = CalendarGrid::build(month, &days);

    renderer.print_month(&grid, door, today)
}

#[instrument(skip(cfg, data_dir, renderer, opts, args, now, tz))]
fn cmd_week(
    cfg: &Config,
    data_dir: &Path,
    renderer: &mut Renderer,
    opts: ViewOptions,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command week");

    let today = today_in(&tz, now);
    let door = resolve_door(cfg, opts)?;

    // Positional args: a bare number is the week, anything else is the month.
    let mut month_arg = None;
    let mut week_arg = None;
    for arg in args {
        if let Ok(n) = arg.parse::<usize>() {
            if n == 0 {
                return Err(anyhow!("week numbers start at 1"));
            }
            week_arg = Some(n - 1);
        } else {
            month_arg = Some(arg.parse::<MonthRef>()?);
        }
    }

    let month = month_arg.unwrap_or_else(|| MonthRef::of(today));
    let days = load_day_slots(data_dir, door)?;
    let grid = CalendarGrid::build(month, &days);

    let mut state = ViewState::new(door, month);
    state.set_mode(PresentationMode::Week);
    state.week_index = week_arg.unwrap_or_else(|| initial_week_index(&grid, today));
    state.clamp_week(grid.week_count());

    let vm = ViewModel::of(&state, &grid);
    renderer.print_week(&grid, door, &vm, today)
}

#[instrument(skip(cfg, data_dir, renderer, opts, args, now, tz))]
fn cmd_list(
    cfg: &Config,
    data_dir: &Path,
    renderer: &mut Renderer,
    opts: ViewOptions,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command list");

    let today = today_in(&tz, now);
    let door = resolve_door(cfg, opts)?;
    let month = resolve_month(args, today)?;
    let days = load_day_slots(data_dir, door)?;
    let grid = CalendarGrid::build(month, &days);

    renderer.print_list(&grid, door)
}

#[instrument(skip(data_dir, renderer, args, tz))]
fn cmd_info(
    data_dir: &Path,
    renderer: &mut Renderer,
    args: &[String],
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command info");

    let raw = args
        .first()
        .ok_or_else(|| anyhow!("info requires a booking id"))?;
    let id: i64 = raw
        .parse()
        .with_context(|| format!("invalid booking id: {raw}"))?;

    for door in DoorType::ALL {
        let days = load_day_slots(data_dir, door)?;
        for day in &days {
            for slot in TimeSlot::ALL {
                if let Some(booking) = day.slot(slot)
                    && booking.id == id
                {
                    return renderer.print_booking_info(booking, day.date, slot, door, tz);
                }
            }
        }
    }

    Err(anyhow!("no booking with id {id}"))
}

#[derive(Debug, Serialize)]
struct ExportDoc<'a> {
    month: MonthRef,
    door: DoorType,
    mode: PresentationMode,
    week_index: usize,
    week_count: usize,
    weeks: &'a [WeekRow],
}

#[instrument(skip(cfg, data_dir, opts, args, now, tz))]
fn cmd_export(
    cfg: &Config,
    data_dir: &Path,
    opts: ViewOptions,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command export");

    let today = today_in(&tz, now);
    let door = resolve_door(cfg, opts)?;
    let month = resolve_month(args, today)?;
    let days = load_day_slots(data_dir, door)?;
    let grid = CalendarGrid::build(month, &days);

    let mut state = ViewState::new(door, month);
    if let Some(mode) = opts.mode {
        state.set_mode(mode);
    }
    state.handle_resize(resolve_viewport(cfg, opts)?, resolve_breakpoint(cfg)?);
    state.clamp_week(grid.week_count());

    let doc = ExportDoc {
        month,
        door,
        mode: state.mode,
        week_index: state.week_index,
        week_count: grid.week_count(),
        weeks: grid.rows(),
    };

    let out = serde_json::to_string(&doc)?;
    println!("{out}");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Implemented commands: view, month, week, list, info, export, help, version");
    Ok(())
}

fn resolve_door(cfg: &Config, opts: ViewOptions) -> anyhow::Result<DoorType> {
    if let Some(door) = opts.door {
        return Ok(door);
    }
    match cfg.get("door.default") {
        Some(value) => value.parse().context("config key door.default"),
        None => Ok(DoorType::Entrance),
    }
}

fn resolve_month(args: &[String], today: NaiveDate) -> anyhow::Result<MonthRef> {
    match args.first() {
        Some(raw) => raw.parse(),
        None => Ok(MonthRef::of(today)),
    }
}

fn resolve_viewport(cfg: &Config, opts: ViewOptions) -> anyhow::Result<u32> {
    if let Some(viewport) = opts.viewport {
        return Ok(viewport);
    }
    Ok(cfg.get_u32("view.viewport")?.unwrap_or(DEFAULT_VIEWPORT_PX))
}

fn resolve_breakpoint(cfg: &Config) -> anyhow::Result<u32> {
    Ok(cfg
        .get_u32("view.breakpoint")?
        .unwrap_or(WEEK_VIEW_BREAKPOINT_PX))
}

// The week view opens on today's week when the focused month contains today.
fn initial_week_index(grid: &CalendarGrid, today: NaiveDate) -> usize {
    grid.rows()
        .iter()
        .position(|row| row.iter().flatten().any(|day| day.date == today))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        dispatch, expand_command_abbrev, initial_week_index, known_command_names, resolve_door,
        resolve_month, resolve_viewport,
    };
    use crate::cli::{Invocation, ViewOptions};
    use crate::config::Config;
    use crate::grid::{CalendarGrid, MonthRef};
    use crate::render::Renderer;
    use crate::schedule::DoorType;

    fn cfg_with(text: &str) -> Config {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc_path = dir.path().join("lintelrc");
        std::fs::write(&rc_path, text).expect("write rc");
        Config::load(Some(&rc_path)).expect("load config")
    }

    fn no_opts() -> ViewOptions {
        ViewOptions {
            door: None,
            viewport: None,
            mode: None,
        }
    }

    #[test]
    fn abbreviations_expand_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("vi", &known), Some("view"));
        assert_eq!(expand_command_abbrev("w", &known), Some("week"));
        assert_eq!(expand_command_abbrev("m", &known), Some("month"));
        assert_eq!(expand_command_abbrev("ex", &known), Some("export"));
        assert_eq!(expand_command_abbrev("list", &known), Some("list"));
        // "v" could be view or version.
        assert_eq!(expand_command_abbrev("v", &known), None);
        assert_eq!(expand_command_abbrev("nope", &known), None);
    }

    #[test]
    fn unknown_commands_list_the_known_ones() {
        let cfg = cfg_with("");
        let data = tempfile::tempdir().expect("tempdir");
        let mut renderer = Renderer::new(&cfg).expect("renderer");
        let inv = Invocation {
            command: "frobnicate".to_string(),
            command_args: vec![],
        };

        let err = dispatch(&cfg, data.path(), &mut renderer, no_opts(), inv).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown command: frobnicate"));
        assert!(message.contains("known commands: view"));
        assert!(message.contains("export"));
    }

    #[test]
    fn door_resolution_prefers_the_flag_over_config() {
        let cfg = cfg_with("door.default = interior\n");
        assert_eq!(resolve_door(&cfg, no_opts()).expect("door"), DoorType::Interior);

        let opts = ViewOptions {
            door: Some(DoorType::Entrance),
            ..no_opts()
        };
        assert_eq!(resolve_door(&cfg, opts).expect("door"), DoorType::Entrance);

        let bad = cfg_with("door.default = revolving\n");
        assert!(resolve_door(&bad, no_opts()).is_err());
    }

    #[test]
    fn viewport_resolution_prefers_the_flag_over_config() {
        let cfg = cfg_with("view.viewport = 700\n");
        assert_eq!(resolve_viewport(&cfg, no_opts()).expect("viewport"), 700);

        let opts = ViewOptions {
            viewport: Some(1440),
            ..no_opts()
        };
        assert_eq!(resolve_viewport(&cfg, opts).expect("viewport"), 1440);
    }

    #[test]
    fn month_argument_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date");
        let month = resolve_month(&[], today).expect("month");
        assert_eq!(month.to_string(), "2024-06");

        let month = resolve_month(&["2025-01".to_string()], today).expect("month");
        assert_eq!(month.to_string(), "2025-01");

        assert!(resolve_month(&["January".to_string()], today).is_err());
    }

    #[test]
    fn initial_week_contains_today_when_in_focus() {
        let month = MonthRef::new(2024, 6).expect("valid month");
        let grid = CalendarGrid::build(month, &[]);

        let june_15 = NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date");
        assert_eq!(initial_week_index(&grid, june_15), 2);

        // Today outside the focused month falls back to the first week.
        let july_1 = NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date");
        assert_eq!(initial_week_index(&grid, july_1), 0);
    }
}
