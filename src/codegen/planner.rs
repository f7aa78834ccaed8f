// NUFLIX Speedcode - Cycle-exact raster code generation for the Commodore 64
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Register update planning.
//!
//! Turns a frame into the per-row update lists and the deferred pool the
//! orchestrator schedules: every colour change between consecutive rows
//! becomes an update, plus the two fixed per-row writes (screen pointer and
//! FLI trigger) and the one-off writes of the frame (sprite moves and the
//! background colour below the split).

use super::colors::ColorSlot;
use super::constants::{ATTRIBUTE_HEIGHT, BUG_COLOR_SLOTS, SCREEN_HEIGHT, SPRITE_COUNT, UNDERLAY_COLUMNS};
use super::update::{sort_updates_by_time, RegisterUpdate};
use crate::frame::Frame;

/// Updates requested by a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Updates that have to happen in a given speedcode row, one list per
    /// attribute row, each sorted by window.
    pub rows: Vec<Vec<RegisterUpdate>>,
    /// Updates that may happen in any row up to their deadline.
    pub deferred: Vec<RegisterUpdate>,
}

/// Collect the register updates needed to display `frame`.
pub fn plan_updates(frame: &Frame) -> UpdatePlan {
    let bug = &frame.bug_colors;
    let underlay = &frame.underlay_colors;
    let mut rows = Vec::with_capacity(ATTRIBUTE_HEIGHT);
    let mut deferred = Vec::new();
    let mut previous: Vec<u8> = underlay[0].iter().map(|slot| slot.color()).collect();

    for y in 0..ATTRIBUTE_HEIGHT {
        let mut updates = Vec::new();
        let screen_y = y << 1;
        let next_screen_y = (screen_y + 2) as u16;

        for uy in (screen_y + 1..=screen_y + 2).filter(|&uy| uy < SCREEN_HEIGHT) {
            for column in 0..UNDERLAY_COLUMNS {
                let slot = underlay[uy][column];
                let color = slot.color();
                if color == previous[column] {
                    continue;
                }
                previous[column] = color;
                match slot {
                    ColorSlot::Set(_) => updates.push(RegisterUpdate::underlay_color(
                        column as u8,
                        color,
                        uy as u16,
                        None,
                    )),
                    ColorSlot::Unused(_) => {
                        // Unused until the column shows up again; never
                        // shown again means nothing to write.
                        let shown_at = (uy + 1..SCREEN_HEIGHT).find(|&last| underlay[last][column].is_set());
                        if let Some(last) = shown_at {
                            deferred.push(RegisterUpdate::underlay_color(
                                column as u8,
                                color,
                                uy as u16,
                                Some(last as u16),
                            ));
                        }
                    }
                }
            }
        }

        if y < ATTRIBUTE_HEIGHT - 1 {
            for s in 0..BUG_COLOR_SLOTS {
                let next = bug[y + 1][s];
                let color = next.color();
                if color == bug[y][s].color() {
                    continue;
                }
                match next {
                    ColorSlot::Set(_) => {
                        updates.push(RegisterUpdate::bug_color(s as u8, color, next_screen_y, None))
                    }
                    ColorSlot::Unused(_) => {
                        let last = (y + 2..ATTRIBUTE_HEIGHT)
                            .find(|&row| bug[row][s].color() != color)
                            .map_or(ATTRIBUTE_HEIGHT, |row| row - 1);
                        deferred.push(RegisterUpdate::bug_color(
                            s as u8,
                            color,
                            next_screen_y,
                            Some((last << 1) as u16),
                        ));
                    }
                }
            }
        }

        if frame.border_colors[y + 1] != frame.border_colors[y] {
            updates.push(RegisterUpdate::border_color(frame.border_colors[y + 1], next_screen_y));
        }
        updates.push(RegisterUpdate::screen_address(next_screen_y));
        updates.push(RegisterUpdate::fli_trigger(next_screen_y));
        sort_updates_by_time(&mut updates);
        rows.push(updates);
    }

    deferred.extend((0..SPRITE_COUNT as u8).map(RegisterUpdate::sprite_y));
    if frame.bottom_background != frame.top_background {
        deferred.push(RegisterUpdate::background_color(frame.bottom_background));
    }
    deferred.sort_by_key(|update| (update.screen_y, update.last_screen_y, update.address()));

    UpdatePlan { rows, deferred }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::update::RegisterKind;

    #[test]
    fn test_blank_frame_has_only_fixed_updates() {
        let plan = plan_updates(&Frame::blank());
        assert_eq!(plan.rows.len(), ATTRIBUTE_HEIGHT);
        assert!(plan.rows.iter().all(|row| row.len() == 2));
        assert_eq!(plan.deferred.len(), SPRITE_COUNT);
        assert!(plan.deferred.iter().all(|u| u.kind == RegisterKind::SpriteY));
    }

    #[test]
    fn test_visible_underlay_change_is_row_update() {
        let mut frame = Frame::blank();
        for row in 5..SCREEN_HEIGHT {
            frame.underlay_colors[row][3] = ColorSlot::Set(7);
        }
        let plan = plan_updates(&frame);
        // Screen row 5 belongs to attribute row 2 (rows 5 and 6).
        let update = plan.rows[2]
            .iter()
            .find(|u| u.kind == RegisterKind::UnderlayColor)
            .unwrap();
        assert_eq!(update.slot, 3);
        assert_eq!(update.screen_y, Some(5));
    }

    #[test]
    fn test_unused_underlay_change_is_deferred_until_shown() {
        let mut frame = Frame::blank();
        for row in 5..SCREEN_HEIGHT {
            frame.underlay_colors[row][1] = if row < 9 {
                ColorSlot::Unused(4)
            } else {
                ColorSlot::Set(4)
            };
        }
        let plan = plan_updates(&frame);
        let update = plan
            .deferred
            .iter()
            .find(|u| u.kind == RegisterKind::UnderlayColor)
            .unwrap();
        assert_eq!(update.screen_y, Some(5));
        assert_eq!(update.last_screen_y, Some(9));
    }

    #[test]
    fn test_unused_bug_change_deadline() {
        let mut frame = Frame::blank();
        frame.bug_colors[10][2] = ColorSlot::Unused(6);
        frame.bug_colors[11][2] = ColorSlot::Set(6);
        frame.bug_colors[12][2] = ColorSlot::Set(6);
        let plan = plan_updates(&frame);
        let update = plan
            .deferred
            .iter()
            .find(|u| u.kind == RegisterKind::BugColor)
            .unwrap();
        assert_eq!(update.screen_y, Some(20));
        // Colour holds through row 12, so row 12 is the deadline.
        assert_eq!(update.last_screen_y, Some(24));
    }

    #[test]
    fn test_background_change_joins_pool() {
        let mut frame = Frame::blank();
        frame.bottom_background = 6;
        let plan = plan_updates(&frame);
        assert_eq!(plan.deferred[0].kind, RegisterKind::BackgroundColor);
    }
}
