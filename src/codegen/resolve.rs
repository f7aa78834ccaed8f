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

//! Overflow resolution.
//!
//! When a row cannot fit its writes even without deferred work, the
//! orchestrator thins out the row with these heuristics, in order, until
//! one applies:
//!
//! 1. [`defer_bug_color_swap`]
//! 2. [`defer_bug_color_update`]
//! 3. [`remove_least_important_underlay_update`]
//!
//! Each heuristic either changes the row's update list (and possibly the
//! next row's list and the working colour tables) and reports what it did,
//! or leaves everything untouched and returns `None`.

use std::fmt;

use super::colors::{BugRow, ColorSlot, ColorTables};
use super::constants::{ATTRIBUTE_HEIGHT, BUG_COLOR_SLOTS, UNDERLAY_COLUMNS};
use super::update::{sort_updates_by_time, RegisterKind, RegisterUpdate, UpdateId};
use crate::distance::ColorDistance;

/// A change made to resolve an overflowing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Hires and multicolour bug slots swapping colours, postponed.
    BugSwapDeferred {
        row: usize,
        hires: RegisterUpdate,
        hires_kept: bool,
        multi: RegisterUpdate,
        multi_kept: bool,
    },
    /// A bug colour change postponed to the next row.
    BugDeferred {
        row: usize,
        update: RegisterUpdate,
        kept: bool,
    },
    /// The first of two underlay changes in a column dropped.
    UnderlayRemoved {
        row: usize,
        column: usize,
        update: RegisterUpdate,
    },
    /// Both underlay changes of a column dropped: the colour returns anyway.
    DoubleUnderlayRemoved {
        row: usize,
        column: usize,
        first: RegisterUpdate,
        second: RegisterUpdate,
    },
    /// The second underlay change of a column moved up to the first.
    UnderlayOverridden {
        row: usize,
        column: usize,
        update: RegisterUpdate,
        second: RegisterUpdate,
    },
    /// The only underlay change of a column dropped.
    SolitaryUnderlayRemoved {
        row: usize,
        column: usize,
        update: RegisterUpdate,
    },
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = |kept: bool| if kept { "keep" } else { "drop" };
        match self {
            Resolution::BugSwapDeferred {
                row,
                hires,
                hires_kept,
                multi,
                multi_kept,
            } => write!(
                f,
                "Deferring Bug Swap {} {} {} ({}) {} ({})",
                row,
                multi.slot,
                hires,
                verdict(*hires_kept),
                multi,
                verdict(*multi_kept)
            ),
            Resolution::BugDeferred { update, kept, .. } => {
                write!(f, "Deferring Bug {} {} ({})", update.slot, update, verdict(*kept))
            }
            Resolution::UnderlayRemoved { row, column, update } => {
                write!(f, "Removing Underlay {} {} {}", row, column, update)
            }
            Resolution::DoubleUnderlayRemoved {
                row,
                column,
                first,
                second,
            } => write!(
                f,
                "Removing Double Underlay {} {} {} + {}",
                row, column, first, second
            ),
            Resolution::UnderlayOverridden {
                row,
                column,
                update,
                second,
            } => write!(
                f,
                "Overriding Underlay {} {} {} -> {}",
                row, column, update, second.value
            ),
            Resolution::SolitaryUnderlayRemoved { row, column, update } => {
                write!(f, "Removing Solitary Underlay {} {} {}", row, column, update)
            }
        }
    }
}

fn take_update(updates: &mut Vec<RegisterUpdate>, id: UpdateId) -> Option<RegisterUpdate> {
    let index = updates.iter().position(|update| update.id == id)?;
    Some(updates.remove(index))
}

fn find_bug_update(updates: &[RegisterUpdate], slot: usize) -> Option<&RegisterUpdate> {
    updates
        .iter()
        .find(|update| update.kind == RegisterKind::BugColor && usize::from(update.slot) == slot)
}

/// Postpone a hires/multicolour bug slot swap.
///
/// Applies when row `y` changes the hires slot to the colour a multicolour
/// slot currently has, and that multicolour slot to the current hires
/// colour. Both writes leave the row; each one moves to the next row only
/// if its colour is still wanted two rows down.
pub fn defer_bug_color_swap(
    y: usize,
    current: &mut Vec<RegisterUpdate>,
    next: &mut Vec<RegisterUpdate>,
    tables: &ColorTables,
) -> Option<Resolution> {
    if y >= ATTRIBUTE_HEIGHT - 1 {
        return None;
    }
    let hires = find_bug_update(current, 0)?.clone();
    let multi_slot =
        (1..BUG_COLOR_SLOTS).find(|&slot| tables.bug(y, slot).color() == hires.value.nibble())?;
    let multi = find_bug_update(current, multi_slot)?.clone();
    if tables.bug(y, 0).color() != multi.value.nibble() {
        return None;
    }

    take_update(current, hires.id);
    take_update(current, multi.id);
    let still_wanted = |update: &RegisterUpdate, slot: usize| {
        y < ATTRIBUTE_HEIGHT - 2 && update.value.nibble() == tables.bug(y + 2, slot).color()
    };
    let hires_kept = still_wanted(&hires, 0);
    let multi_kept = still_wanted(&multi, multi_slot);
    if hires_kept {
        next.push(hires.clone());
    }
    if multi_kept {
        next.push(multi.clone());
    }
    sort_updates_by_time(next);

    Some(Resolution::BugSwapDeferred {
        row: y,
        hires,
        hires_kept,
        multi,
        multi_kept,
    })
}

/// Postpone the bug colour change whose absence in row `y + 1` costs
/// least. The change moves to the next row if row `y + 2` still shows its
/// colour, otherwise it is dropped.
pub fn defer_bug_color_update(
    y: usize,
    current: &mut Vec<RegisterUpdate>,
    next: &mut Vec<RegisterUpdate>,
    tables: &ColorTables,
    distance: &dyn ColorDistance,
) -> Option<Resolution> {
    if y >= ATTRIBUTE_HEIGHT - 1 {
        return None;
    }
    let mut best: Option<(u32, UpdateId)> = None;
    for update in current.iter().filter(|u| u.kind == RegisterKind::BugColor) {
        // The next row as it would look with this one change missing.
        let slots: BugRow = std::array::from_fn(|slot| {
            if slot == usize::from(update.slot) {
                tables.bug(y, slot)
            } else {
                tables.bug(y + 1, slot)
            }
        });
        let d = distance.bug_section_distance(y + 1, slots);
        if best.map_or(true, |(best_d, _)| d < best_d) {
            best = Some((d, update.id));
        }
    }

    let (_, id) = best?;
    let update = take_update(current, id)?;
    let kept = y < ATTRIBUTE_HEIGHT - 2
        && tables.bug(y + 2, usize::from(update.slot)) == ColorSlot::Set(update.value.nibble());
    if kept {
        next.push(update.clone());
    }
    sort_updates_by_time(next);

    Some(Resolution::BugDeferred { row: y, update, kept })
}

/// Drop or merge the underlay change that costs least.
///
/// Columns changing colour on both screen rows of `y` are considered
/// first: either the first change goes, or the second change is moved up
/// (both go when the column returns to its previous colour anyway). Failing
/// that, a column's only change goes if the column changes again right
/// after. The working tables are updated to what the screen will show.
pub fn remove_least_important_underlay_update(
    y: usize,
    updates: &mut Vec<RegisterUpdate>,
    tables: &mut ColorTables,
    distance: &dyn ColorDistance,
) -> Option<Resolution> {
    if y >= ATTRIBUTE_HEIGHT - 1 {
        return None;
    }
    let screen_y = (y << 1) + 1;
    let top = y << 1;
    let mut early: [Option<RegisterUpdate>; UNDERLAY_COLUMNS] = Default::default();
    let mut late: [Option<RegisterUpdate>; UNDERLAY_COLUMNS] = Default::default();
    for update in updates.iter().filter(|u| u.kind == RegisterKind::UnderlayColor) {
        let column = usize::from(update.slot);
        if update.is_early() {
            early[column] = Some(update.clone());
        } else {
            late[column] = Some(update.clone());
        }
    }

    // (column, whether the second change replaces the first, both changes)
    let mut best_d = u32::MAX;
    let mut changed: Option<(usize, bool, &RegisterUpdate, &RegisterUpdate)> = None;
    for (column, pair) in early.iter().zip(&late).enumerate() {
        let (Some(first), Some(second)) = pair else {
            continue;
        };
        let previous = tables.underlay(screen_y - 1, column).color();
        let following = tables.underlay(screen_y + 1, column).color();
        let d1 = distance.mid_section_distance(screen_y, column, previous);
        let mut d2 = distance.mid_section_distance(screen_y, column, following);
        if previous == following {
            // A one-row blip inside a longer run is the cheapest loss.
            d2 >>= 2;
        }
        if d2 < best_d {
            best_d = d2;
            changed = Some((column, true, first, second));
        }
        if d1 < best_d {
            best_d = d1;
            changed = Some((column, false, first, second));
        }
    }

    if let Some((column, replace, first, second)) = changed {
        let (first, second) = (first.clone(), second.clone());
        if !replace {
            take_update(updates, first.id);
            tables.set_underlay(top + 1, column, tables.underlay(top, column));
            return Some(Resolution::UnderlayRemoved {
                row: y,
                column,
                update: first,
            });
        }
        if tables.underlay(top, column) == tables.underlay(top + 2, column) {
            take_update(updates, first.id);
            take_update(updates, second.id);
            tables.set_underlay(top + 1, column, tables.underlay(top, column));
            return Some(Resolution::DoubleUnderlayRemoved {
                row: y,
                column,
                first,
                second,
            });
        }
        if let Some(update) = updates.iter_mut().find(|u| u.id == first.id) {
            update.value = second.value;
        }
        take_update(updates, second.id);
        tables.set_underlay(top + 1, column, tables.underlay(top + 2, column));
        return Some(Resolution::UnderlayOverridden {
            row: y,
            column,
            update: first,
            second,
        });
    }

    let mut best_d = u32::MAX;
    let mut chosen: Option<(usize, RegisterUpdate)> = None;
    for column in 0..UNDERLAY_COLUMNS {
        let Some(update) = early[column].as_ref().or(late[column].as_ref()) else {
            continue;
        };
        let following = tables.underlay(screen_y + 1, column).color();
        let after = tables.underlay(screen_y + 2, column).color();
        if after == following {
            continue;
        }
        let previous = tables.underlay(screen_y - 1, column).color();
        let mut d = distance.mid_section_distance(screen_y + 1, column, previous);
        if update.is_early() {
            d += distance.mid_section_distance(screen_y, column, previous);
        }
        if d < best_d {
            best_d = d;
            chosen = Some((column, update.clone()));
        }
    }

    let (column, update) = chosen?;
    take_update(updates, update.id);
    let shown = tables.underlay(top, column);
    tables.set_underlay(top + 1, column, shown);
    tables.set_underlay(top + 2, column, shown);
    Some(Resolution::SolitaryUnderlayRemoved {
        row: y,
        column,
        update,
    })
}
