use anyhow::anyhow;
use serde::Serialize;

use crate::grid::{CalendarGrid, MonthRef};
use crate::schedule::DoorType;

pub const WEEK_VIEW_BREAKPOINT_PX: u32 = 768;
pub const DEFAULT_VIEWPORT_PX: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    Month,
    Week,
}

impl std::str::FromStr for PresentationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(PresentationMode::Month),
            "week" => Ok(PresentationMode::Week),
            other => Err(anyhow!("unknown mode: {other} (expected month or week)")),
        }
    }
}

// The automatic rule: narrow viewports collapse to the week list, unless the
// user has pinned a mode explicitly.
pub fn select_mode(viewport_px: u32, breakpoint_px: u32, state: &ViewState) -> PresentationMode {
    if state.manual_override {
        return state.mode;
    }
    if viewport_px <= breakpoint_px {
        PresentationMode::Week
    } else {
        PresentationMode::Month
    }
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub mode: PresentationMode,
    pub week_index: usize,
    pub manual_override: bool,
    pub door: DoorType,
    pub focus: MonthRef,
}

impl ViewState {
    pub fn new(door: DoorType, focus: MonthRef) -> Self {
        Self {
            mode: PresentationMode::Month,
            week_index: 0,
            manual_override: false,
            door,
            focus,
        }
    }

    pub fn set_mode(&mut self, mode: PresentationMode) {
        self.manual_override = true;
        if mode == PresentationMode::Week && self.mode != PresentationMode::Week {
            self.week_index = 0;
        }
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            PresentationMode::Month => PresentationMode::Week,
            PresentationMode::Week => PresentationMode::Month,
        };
        self.set_mode(next);
    }

    pub fn handle_resize(&mut self, viewport_px: u32, breakpoint_px: u32) {
        self.mode = select_mode(viewport_px, breakpoint_px, self);
    }

    pub fn next_week(&mut self, week_count: usize) {
        if self.week_index + 1 < week_count {
            self.week_index += 1;
        }
    }

    pub fn prev_week(&mut self) {
        if self.week_index > 0 {
            self.week_index -= 1;
        }
    }

    // Applied after every grid rebuild: a stale index from a longer month must
    // not escape the new bounds.
    pub fn clamp_week(&mut self, week_count: usize) {
        self.week_index = self.week_index.min(week_count.saturating_sub(1));
    }

    pub fn next_month(&mut self) {
        self.focus = self.focus.succ();
    }

    pub fn prev_month(&mut self) {
        self.focus = self.focus.pred();
    }

    pub fn set_door(&mut self, door: DoorType) {
        self.door = door;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub mode: PresentationMode,
    pub week_index: usize,
    pub week_count: usize,
}

impl ViewModel {
    pub fn of(state: &ViewState, grid: &CalendarGrid) -> Self {
        Self {
            mode: state.mode,
            week_index: state.week_index,
            week_count: grid.week_count(),
        }
    }

    pub fn has_prev_week(&self) -> bool {
        self.week_index > 0
    }

    pub fn has_next_week(&self) -> bool {
        self.week_index + 1 < self.week_count
    }
}

#[cfg(test)]
mod tests {
    use super::{PresentationMode, ViewModel, ViewState, WEEK_VIEW_BREAKPOINT_PX, select_mode};
    use crate::grid::{CalendarGrid, MonthRef};
    use crate::schedule::DoorType;

    fn state() -> ViewState {
        let focus = MonthRef::new(2024, 6).expect("valid month");
        ViewState::new(DoorType::Entrance, focus)
    }

    #[test]
    fn narrow_viewports_select_week_mode() {
        let st = state();
        assert_eq!(
            select_mode(500, WEEK_VIEW_BREAKPOINT_PX, &st),
            PresentationMode::Week
        );
        assert_eq!(
            select_mode(1200, WEEK_VIEW_BREAKPOINT_PX, &st),
            PresentationMode::Month
        );
    }

    #[test]
    fn breakpoint_is_inclusive() {
        let st = state();
        assert_eq!(select_mode(768, 768, &st), PresentationMode::Week);
        assert_eq!(select_mode(769, 768, &st), PresentationMode::Month);
    }

    #[test]
    fn manual_override_beats_the_viewport_rule() {
        let mut st = state();
        st.mode = PresentationMode::Month;
        st.manual_override = true;
        assert_eq!(select_mode(500, 768, &st), PresentationMode::Month);

        st.mode = PresentationMode::Week;
        assert_eq!(select_mode(1200, 768, &st), PresentationMode::Week);
    }

    #[test]
    fn toggling_latches_override_and_resets_index_entering_week() {
        let mut st = state();
        st.week_index = 3;
        st.toggle_mode();
        assert_eq!(st.mode, PresentationMode::Week);
        assert!(st.manual_override);
        assert_eq!(st.week_index, 0);
    }

    #[test]
    fn toggling_back_to_month_keeps_the_index() {
        let mut st = state();
        st.toggle_mode();
        st.next_week(5);
        st.next_week(5);
        st.toggle_mode();
        assert_eq!(st.mode, PresentationMode::Month);
        assert_eq!(st.week_index, 2);
    }

    #[test]
    fn resize_is_inert_under_manual_override() {
        let mut st = state();
        st.set_mode(PresentationMode::Month);
        st.handle_resize(500, 768);
        assert_eq!(st.mode, PresentationMode::Month);
        assert!(st.manual_override);
    }

    #[test]
    fn resize_switches_mode_but_never_touches_index_or_override() {
        let mut st = state();
        st.week_index = 2;
        st.handle_resize(500, 768);
        assert_eq!(st.mode, PresentationMode::Week);
        assert_eq!(st.week_index, 2);
        assert!(!st.manual_override);

        st.handle_resize(1400, 768);
        assert_eq!(st.mode, PresentationMode::Month);
        assert_eq!(st.week_index, 2);
        assert!(!st.manual_override);
    }

    #[test]
    fn week_navigation_is_a_no_op_at_the_edges() {
        let mut st = state();
        st.prev_week();
        assert_eq!(st.week_index, 0);

        for _ in 0..10 {
            st.next_week(5);
        }
        assert_eq!(st.week_index, 4);
    }

    #[test]
    fn clamp_pulls_a_stale_index_into_the_new_bounds() {
        let mut st = state();
        st.week_index = 5;
        st.clamp_week(5);
        assert_eq!(st.week_index, 4);

        st.clamp_week(4);
        assert_eq!(st.week_index, 3);

        st.week_index = 1;
        st.clamp_week(4);
        assert_eq!(st.week_index, 1);
    }

    #[test]
    fn month_navigation_moves_focus_and_preserves_view_flags() {
        let mut st = state();
        st.set_mode(PresentationMode::Week);
        st.next_week(5);
        st.next_month();
        assert_eq!(st.focus.to_string(), "2024-07");
        assert_eq!(st.mode, PresentationMode::Week);
        assert!(st.manual_override);
        assert_eq!(st.week_index, 1);

        st.prev_month();
        st.prev_month();
        assert_eq!(st.focus.to_string(), "2024-05");
    }

    #[test]
    fn door_switch_leaves_mode_and_index_alone() {
        let mut st = state();
        st.set_mode(PresentationMode::Week);
        st.next_week(5);
        st.set_door(DoorType::Interior);
        assert_eq!(st.door, DoorType::Interior);
        assert_eq!(st.mode, PresentationMode::Week);
        assert_eq!(st.week_index, 1);
    }

    #[test]
    fn view_model_reports_navigation_availability() {
        let focus = MonthRef::new(2024, 6).expect("valid month");
        let grid = CalendarGrid::build(focus, &[]);
        let mut st = state();
        st.set_mode(PresentationMode::Week);

        let vm = ViewModel::of(&st, &grid);
        assert_eq!(vm.week_count, 5);
        assert!(!vm.has_prev_week());
        assert!(vm.has_next_week());

        st.week_index = 4;
        let vm = ViewModel::of(&st, &grid);
        assert!(vm.has_prev_week());
        assert!(!vm.has_next_week());
    }

    #[test]
    fn mode_parses_from_cli_words() {
        assert_eq!(
            "week".parse::<PresentationMode>().expect("parse"),
            PresentationMode::Week
        );
        assert_eq!(
            "Month".parse::<PresentationMode>().expect("parse"),
            PresentationMode::Month
        );
        assert!("grid".parse::<PresentationMode>().is_err());
    }
}
