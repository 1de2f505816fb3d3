//! Power-up registry: the pluggable behavior units a ship can carry.
//!
//! Power-ups are a closed set of tagged variants rather than open callback
//! registrations. Each one stores its removal rule as plain data, and the
//! actions it overrides are tracked in an ordered per-action table on the
//! owning ship. The server drives the lifecycle (attach, one-time apply,
//! per-tick update, prune); this module only holds the data model.

use crate::protocol::Action;
use std::collections::HashMap;

/// Discriminates the power-up variants. A ship never carries two power-ups
/// of the same kind concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    /// A companion ship that mirrors its owner and doubles its fire.
    DualShip,
    /// Fire in four directions at once.
    QuadFire,
    /// Timed auto-fire along the owner's facing after death.
    FireControl,
}

/// When a power-up removes itself during its update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Removal {
    /// Remove once the owner's hp reaches zero.
    OwnerDead,
    /// Remove once any star lies within the stored distance of the owner.
    StarWithin(f64),
    /// Remove once the world tick counter passes the stored tick.
    TickReached(u64),
}

/// One behavior unit attached to a ship.
///
/// `applied` flips after the one-time apply hook has run; `active` is
/// cleared when the removal rule fires, and inactive power-ups are pruned at
/// the start of the next update pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub active: bool,
    pub applied: bool,
    pub removal: Removal,
    /// Companion entity spawned by the apply hook (dual ship only).
    pub duplicate_id: Option<u32>,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, removal: Removal) -> PowerUp {
        PowerUp {
            kind,
            active: true,
            applied: false,
            removal,
            duplicate_id: None,
        }
    }
}

/// Identifies which power-up behavior replaces the default handling of an
/// action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideFn {
    DualFire,
    QuadFire,
    ControlFire,
}

/// Per-action override table: action → ordered list of overrides.
///
/// When any overrides are registered for an action, the server runs all of
/// them in registration order instead of the default handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: HashMap<Action, Vec<OverrideFn>>,
}

impl OverrideTable {
    pub fn add(&mut self, action: Action, override_fn: OverrideFn) {
        self.entries.entry(action).or_default().push(override_fn);
    }

    /// Removes one registration of the given override. Returns whether it
    /// was present.
    pub fn remove(&mut self, action: Action, override_fn: OverrideFn) -> bool {
        if let Some(list) = self.entries.get_mut(&action) {
            if let Some(pos) = list.iter().position(|o| *o == override_fn) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// The overrides registered for an action, in registration order.
    pub fn get(&self, action: Action) -> &[OverrideFn] {
        self.entries
            .get(&action)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }
}
