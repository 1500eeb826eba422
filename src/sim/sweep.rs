//! Boundary sweeper
//!
//! Objects are recycled once they have fully left the playfield by a margin.
//! Only an unsliced normal object that falls out of the bottom, or off a side
//! after a classic upward throw, with no golden event running, costs a life.
//! Cross-screen throws are meant to leave by a side.

use super::state::{GameEvent, GameObject, GameState, ThrowPattern};
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH};
use crate::tuning::Tuning;

/// Which boundary an object crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Fall,
    Side,
    Top,
}

/// Boundary crossed by `obj`, if any
pub fn exit_of(tuning: &Tuning, obj: &GameObject) -> Option<Exit> {
    let p = obj.pos;
    // Fresh throws start below the bottom edge moving up
    if p.y > FIELD_HEIGHT + tuning.fall_margin && obj.vel.y > 0.0 {
        Some(Exit::Fall)
    } else if p.x < -tuning.side_margin || p.x > FIELD_WIDTH + tuning.side_margin {
        Some(Exit::Side)
    } else if p.y < -tuning.top_margin {
        Some(Exit::Top)
    } else {
        None
    }
}

/// Recycle every object that has left the field, charging misses
pub fn sweep(state: &mut GameState) {
    let focus = state.golden.focus();
    let golden_engaged = state.golden.is_engaged();

    let exits: Vec<_> = state
        .pool
        .iter_active()
        .filter(|o| Some(o.id) != focus)
        .filter_map(|o| {
            let exit = exit_of(&state.tuning, o)?;
            let counts = match exit {
                Exit::Fall => true,
                Exit::Side => o.pattern == ThrowPattern::Classic,
                Exit::Top => false,
            };
            let penalize = counts && !o.sliced && o.kind.is_normal() && !golden_engaged;
            Some((o.id, o.pos, penalize))
        })
        .collect();

    for (id, pos, penalize) in exits {
        state.pool.release(id);
        if penalize && !state.is_game_over() {
            state.emit(GameEvent::ObjectMissed { id, pos });
            state.lose_life();
        }
    }
}
