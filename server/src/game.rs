//! The canonical world state and the per-tick simulation phases.
//!
//! Exactly one task owns the `World`; network tasks never touch entity
//! state. Collision checking is brute force by design; at this entity
//! count a spatial index buys nothing.

use crate::config::ServerSettings;
use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shared::component::{OverrideFn, PowerUpKind};
use shared::entity::{Projectile, Ship, Star};
use shared::math::Vec2;
use shared::protocol::{Action, CommandSet};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// How many random candidate points a spawn search tries before giving up
/// and using the last one sampled.
const SPAWN_ATTEMPTS: u32 = 15;

/// Monotonic id generator. Ships, duplicates and stars share one namespace;
/// projectiles get their own.
#[derive(Debug, Default)]
pub struct IdSource(AtomicU32);

impl IdSource {
    pub fn new() -> IdSource {
        IdSource(AtomicU32::new(0))
    }

    /// Returns the next id, starting from 1.
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// The authoritative game state.
pub struct World {
    pub(crate) settings: ServerSettings,
    pub ships: HashMap<u32, Ship>,
    /// Companion ships spawned by power-ups, outside the normal ship map.
    pub duplicates: HashMap<u32, Ship>,
    pub stars: HashMap<u32, Star>,
    pub projectiles: HashMap<u32, Projectile>,
    /// Ships currently waiting out their respawn countdown.
    pub dead_ships: HashSet<u32>,
    /// Every projectile id ever created, oldest first; drives the soft cap.
    projectile_remove_order: VecDeque<u32>,
    /// Extra lines drained once into the next snapshot (final dead-state
    /// records for reaped ships and torn-down duplicates).
    pending_lines: String,
    tick: u64,
    pub entity_ids: Arc<IdSource>,
    projectile_ids: IdSource,
    rng: StdRng,
}

impl World {
    pub fn new(settings: ServerSettings, entity_ids: Arc<IdSource>) -> World {
        let mut world = World {
            settings,
            ships: HashMap::new(),
            duplicates: HashMap::new(),
            stars: HashMap::new(),
            projectiles: HashMap::new(),
            dead_ships: HashSet::new(),
            projectile_remove_order: VecDeque::new(),
            pending_lines: String::new(),
            tick: 0,
            entity_ids,
            projectile_ids: IdSource::new(),
            rng: StdRng::from_entropy(),
        };
        let star_id = world.entity_ids.next();
        world.stars.insert(star_id, Star::new(star_id));
        world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Creates the ship for a session that completed its handshake. The
    /// ship id equals the session id.
    pub fn add_ship(&mut self, id: u32, name: String) {
        let loc = self.spawn_location();
        let ship = Ship::new(
            id,
            name,
            loc,
            self.settings.starting_ship_health,
            self.settings.respawn_delay,
        );
        info!(
            "Added ship {} ({}) at ({:.1}, {:.1})",
            id, ship.name, loc.x, loc.y
        );
        self.ships.insert(id, ship);
    }

    /// Tears down the ship of a reaped session: hp forced to zero, one
    /// final dead-state line queued for the next snapshot, then purged. A
    /// companion duplicate goes down with it.
    pub fn remove_session_ship(&mut self, id: u32) {
        self.dead_ships.remove(&id);
        let Some(mut ship) = self.ships.remove(&id) else {
            return;
        };
        ship.hp = 0;
        let duplicate_id = ship
            .power_ups
            .iter()
            .find(|p| p.kind == PowerUpKind::DualShip)
            .and_then(|p| p.duplicate_id);
        info!("Removed ship {} ({})", id, ship.name);
        self.queue_entity_line(&ship);
        if let Some(duplicate_id) = duplicate_id {
            if let Some(mut duplicate) = self.duplicates.remove(&duplicate_id) {
                duplicate.hp = 0;
                self.queue_entity_line(&duplicate);
            }
        }
    }

    /// Advances the world one tick. Phases run in a fixed order; `commands`
    /// holds each session's deduplicated actions for this tick.
    pub fn update(&mut self, commands: &[(u32, CommandSet)]) {
        self.tick += 1;
        self.update_dead_ship_timers();
        self.clear_thrusters();
        self.remove_dead_projectiles();
        self.update_power_ups();
        self.process_commands(commands);
        self.apply_forces();
        self.wrap_ships();
        self.collide_projectiles_with_ships();
        self.collide_projectiles_with_stars();
        self.kill_out_of_bounds_projectiles();
        self.evict_projectiles_past_cap();
        self.burn_ships_near_stars();
    }

    /// Serializes the full world state: ships, duplicates, projectiles,
    /// stars, then any pending final records, one JSON object per line.
    pub fn serialize(&mut self) -> String {
        let mut frame = String::new();
        push_entities(&mut frame, &self.ships);
        push_entities(&mut frame, &self.duplicates);
        push_entities(&mut frame, &self.projectiles);
        push_entities(&mut frame, &self.stars);
        frame.push_str(&std::mem::take(&mut self.pending_lines));
        frame
    }

    // ─── tick phases ───

    fn update_dead_ship_timers(&mut self) {
        let mut dead_ids: Vec<u32> = self.dead_ships.iter().copied().collect();
        dead_ids.sort_unstable();
        for id in dead_ids {
            let timer = match self.ships.get_mut(&id) {
                Some(ship) => {
                    ship.respawn_timer = ship.respawn_timer.saturating_sub(1);
                    ship.respawn_timer
                }
                None => continue,
            };
            if timer == 0 {
                let loc = self.spawn_location();
                let hp = self.settings.starting_ship_health;
                let delay = self.settings.respawn_delay;
                if let Some(ship) = self.ships.get_mut(&id) {
                    ship.hp = hp;
                    ship.velocity = Vec2::ZERO;
                    ship.loc = loc;
                    ship.respawn_timer = delay;
                }
            }
        }
        let ships = &self.ships;
        self.dead_ships
            .retain(|id| matches!(ships.get(id), Some(ship) if ship.hp == 0));
    }

    /// Thrust is re-asserted every tick; a thrust request arriving this
    /// tick turns it back on during command resolution.
    fn clear_thrusters(&mut self) {
        for ship in self.ships.values_mut() {
            ship.thrust = false;
        }
    }

    /// Projectiles marked dead last tick were broadcast once in their dead
    /// state; now they go away.
    fn remove_dead_projectiles(&mut self) {
        self.projectiles.retain(|_, proj| proj.alive);
    }

    fn process_commands(&mut self, commands: &[(u32, CommandSet)]) {
        for (id, set) in commands {
            // dead ships' buffers are consumed but have no effect
            if self.dead_ships.contains(id) || !self.ships.contains_key(id) {
                continue;
            }
            for action in Action::ALL {
                if !set.contains(action) {
                    continue;
                }
                let overrides: Vec<OverrideFn> = self
                    .ships
                    .get(id)
                    .map(|ship| ship.overrides.get(action).to_vec())
                    .unwrap_or_default();
                if overrides.is_empty() {
                    self.apply_default_action(*id, action);
                } else {
                    for override_fn in overrides {
                        self.run_override(*id, override_fn);
                    }
                }
            }
        }
    }

    fn apply_default_action(&mut self, id: u32, action: Action) {
        match action {
            Action::Fire => {
                if let Some((loc, dir)) = self.ship_pose(id) {
                    self.fire(id, loc, dir);
                }
            }
            Action::RotateRight => {
                let turn_rate = self.settings.turn_rate;
                if let Some(ship) = self.ships.get_mut(&id) {
                    ship.dir = ship.dir.rotated_deg(turn_rate);
                }
            }
            Action::RotateLeft => {
                let turn_rate = self.settings.turn_rate;
                if let Some(ship) = self.ships.get_mut(&id) {
                    ship.dir = ship.dir.rotated_deg(-turn_rate);
                }
            }
            Action::Thrust => {
                if let Some(ship) = self.ships.get_mut(&id) {
                    ship.thrust = true;
                }
            }
        }
    }

    pub(crate) fn run_override(&mut self, id: u32, override_fn: OverrideFn) {
        match override_fn {
            OverrideFn::DualFire => {
                let Some((loc, dir)) = self.ship_pose(id) else {
                    return;
                };
                self.fire(id, loc, dir);
                let duplicate_id = self
                    .ships
                    .get(&id)
                    .and_then(|ship| {
                        ship.power_ups
                            .iter()
                            .find(|p| p.kind == PowerUpKind::DualShip)
                    })
                    .and_then(|p| p.duplicate_id);
                if let Some(duplicate_id) = duplicate_id {
                    if let Some(dup) = self.duplicates.get(&duplicate_id) {
                        let (loc, dir) = (dup.loc, dup.dir);
                        self.fire(duplicate_id, loc, dir);
                    }
                }
            }
            OverrideFn::QuadFire => {
                let Some((loc, dir)) = self.ship_pose(id) else {
                    return;
                };
                let right = dir.perpendicular();
                self.fire(id, loc, dir);
                self.fire(id, loc, -dir);
                self.fire(id, loc, right);
                self.fire(id, loc, -right);
            }
            OverrideFn::ControlFire => {
                if let Some((loc, dir)) = self.ship_pose(id) {
                    self.fire(id, loc, dir);
                }
            }
        }
    }

    /// Creates a projectile if the fire gate is open this tick. Every
    /// existing projectile moves every tick, so creating one is firing it.
    pub fn fire(&mut self, owner: u32, loc: Vec2, dir: Vec2) {
        if self.tick % self.settings.projectile_fire_delay != 0 {
            return;
        }
        let id = self.projectile_ids.next();
        self.projectiles.insert(
            id,
            Projectile {
                id,
                loc,
                dir,
                alive: true,
                owner,
            },
        );
        self.projectile_remove_order.push_back(id);
    }

    fn apply_forces(&mut self) {
        let projectile_velocity = self.settings.projectile_velocity;
        for proj in self.projectiles.values_mut() {
            proj.loc += proj.dir * projectile_velocity;
        }

        let engine_strength = self.settings.engine_strength;
        let stars = &self.stars;
        for ship in self.ships.values_mut() {
            let mut acceleration = Vec2::ZERO;
            for star in stars.values() {
                acceleration += (star.loc - ship.loc).normalized() * star.mass;
            }
            if ship.thrust {
                acceleration += ship.dir * engine_strength;
            }
            ship.velocity += acceleration;
            ship.loc += ship.velocity;
        }
    }

    /// Crossing a bound negates that axis's coordinate, a point-reflection
    /// wrap rather than a torus wrap. Each axis is checked once per tick.
    fn wrap_ships(&mut self) {
        let bounds = self.settings.bounds();
        for ship in self.ships.values_mut() {
            if ship.loc.x > bounds || ship.loc.x < -bounds {
                ship.loc.negate_x();
            }
            if ship.loc.y > bounds || ship.loc.y < -bounds {
                ship.loc.negate_y();
            }
        }
    }

    fn collide_projectiles_with_ships(&mut self) {
        let radius = self.settings.ship_collision_radius;
        let mut ship_ids: Vec<u32> = self.ships.keys().copied().collect();
        ship_ids.sort_unstable();
        let mut proj_ids: Vec<u32> = self.projectiles.keys().copied().collect();
        proj_ids.sort_unstable();

        // first qualifying projectile per ship; a projectile claimed by
        // more than one ship resolves against only the last claimant
        let mut hits: HashMap<u32, u32> = HashMap::new();
        for &ship_id in &ship_ids {
            let loc = self.ships[&ship_id].loc;
            for &proj_id in &proj_ids {
                let proj = &self.projectiles[&proj_id];
                if proj.alive && (loc - proj.loc).length() < radius {
                    hits.insert(proj_id, ship_id);
                    break;
                }
            }
        }

        let mut resolved: Vec<(u32, u32)> = hits.into_iter().collect();
        resolved.sort_unstable();
        for (proj_id, ship_id) in resolved {
            self.resolve_projectile_hit(proj_id, ship_id);
        }
    }

    fn resolve_projectile_hit(&mut self, proj_id: u32, ship_id: u32) {
        let owner = match self.projectiles.get(&proj_id) {
            Some(proj) if proj.alive => proj.owner,
            _ => return,
        };
        let damage = self.settings.projectile_damage;
        let died = match self.ships.get_mut(&ship_id) {
            // a ship's own projectiles pass straight through it
            Some(ship) if ship.hp > 0 && owner != ship_id => {
                ship.hp -= damage;
                if let Some(proj) = self.projectiles.get_mut(&proj_id) {
                    proj.alive = false;
                }
                ship.hp == 0
            }
            _ => return,
        };
        if died {
            self.notify_ship_killed(ship_id, owner);
        }
    }

    /// Reaching exactly zero hp raises exactly one death notification.
    fn notify_ship_killed(&mut self, victim: u32, killer: u32) {
        if let Some(killer_ship) = self.ships.get_mut(&killer) {
            killer_ship.score += 1;
        } else if let Some(duplicate) = self.duplicates.get_mut(&killer) {
            duplicate.score += 1;
        }
        self.dead_ships.insert(victim);
        info!("Ship {} destroyed by {}", victim, killer);
    }

    fn collide_projectiles_with_stars(&mut self) {
        let radius = self.settings.star_collision_radius;
        let stars = &self.stars;
        for proj in self.projectiles.values_mut() {
            if proj.alive && stars.values().any(|s| (s.loc - proj.loc).length() < radius) {
                proj.alive = false;
            }
        }
    }

    fn kill_out_of_bounds_projectiles(&mut self) {
        let bounds = self.settings.bounds();
        for proj in self.projectiles.values_mut() {
            if proj.loc.x < -bounds
                || proj.loc.y < -bounds
                || bounds < proj.loc.x
                || bounds < proj.loc.y
            {
                proj.alive = false;
            }
        }
    }

    /// Soft cap: while the live count sits above the maximum, the oldest
    /// recorded id is marked dead. The id may already be gone, in which
    /// case the queue entry is spent and nothing else happens.
    fn evict_projectiles_past_cap(&mut self) {
        let mut count_above = self.projectiles.len() + 1;
        while count_above > self.settings.max_projectiles {
            count_above -= 1;
            match self.projectile_remove_order.pop_front() {
                Some(id) => {
                    if let Some(proj) = self.projectiles.get_mut(&id) {
                        proj.alive = false;
                    }
                }
                None => break,
            }
        }
    }

    /// Burns those who fly too close to the sun, projectiles or no.
    fn burn_ships_near_stars(&mut self) {
        let radius = self.settings.star_collision_radius;
        let stars = &self.stars;
        let dead_ships = &mut self.dead_ships;
        for ship in self.ships.values_mut() {
            if stars.values().any(|s| (s.loc - ship.loc).length() < radius) {
                ship.hp = 0;
                dead_ships.insert(ship.id);
            }
        }
    }

    // ─── helpers ───

    pub(crate) fn ship_pose(&self, id: u32) -> Option<(Vec2, Vec2)> {
        self.ships.get(&id).map(|ship| (ship.loc, ship.dir))
    }

    pub(crate) fn queue_entity_line<T: Serialize>(&mut self, entity: &T) {
        match serde_json::to_string(entity) {
            Ok(json) => {
                self.pending_lines.push_str(&json);
                self.pending_lines.push('\n');
            }
            Err(e) => error!("Failed to serialize entity: {}", e),
        }
    }

    /// Samples a spawn point, rejecting candidates within twice the ship
    /// collision radius of any ship or star. Gives up after a bounded
    /// number of tries and returns the last candidate.
    fn spawn_location(&mut self) -> Vec2 {
        let bounds = self.settings.universe_size / 2;
        let mut candidate = Vec2::new(bounds as f64, bounds as f64);
        for _ in 0..SPAWN_ATTEMPTS {
            let x = self.rng.gen_range(-bounds..bounds) as f64;
            let y = self.rng.gen_range(-bounds..bounds) as f64;
            candidate = Vec2::new(x, y);
            if !self.is_occupied(candidate) {
                return candidate;
            }
        }
        candidate
    }

    fn is_occupied(&self, loc: Vec2) -> bool {
        let separation = self.settings.ship_collision_radius * 2.0;
        self.ships
            .values()
            .any(|ship| (ship.loc - loc).length() < separation)
            || self
                .stars
                .values()
                .any(|star| (star.loc - loc).length() < separation)
    }
}

fn push_entities<T: Serialize>(frame: &mut String, entities: &HashMap<u32, T>) {
    let mut ids: Vec<u32> = entities.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        match serde_json::to_string(&entities[&id]) {
            Ok(json) => {
                frame.push_str(&json);
                frame.push('\n');
            }
            Err(e) => error!("Failed to serialize entity {}: {}", id, e),
        }
    }
}
