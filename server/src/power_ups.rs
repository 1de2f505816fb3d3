//! Power-up lifecycle: per-tick eligibility, one-time apply, per-tick
//! update, and pruning.
//!
//! Eligibility is re-evaluated from world state every tick; a kind is never
//! attached twice concurrently. The apply hook may spawn a companion entity
//! and register action overrides; the update hook re-evaluates the stored
//! removal rule and on satisfaction unregisters the overrides, clears the
//! activation flag and tears down any companion. Deactivated power-ups are
//! pruned at the start of the next update pass.

use crate::game::World;
use log::info;
use shared::component::{OverrideFn, PowerUp, PowerUpKind, Removal};
use shared::entity::Ship;
use shared::math::Vec2;
use shared::protocol::Action;

/// A ship clear of every star by this multiple of the star collision radius
/// qualifies for quad fire.
const QUAD_FIRE_STAR_FACTOR: f64 = 2.5;
/// How long the post-death auto-fire lasts.
const FIRE_CONTROL_SECS: u64 = 10;

impl World {
    pub(crate) fn update_power_ups(&mut self) {
        self.assign_power_ups();
        self.apply_power_ups();
        self.run_power_up_updates();
    }

    fn assign_power_ups(&mut self) {
        let quad_threshold = self.settings.star_collision_radius * QUAD_FIRE_STAR_FACTOR;
        let fire_control_expiry =
            self.tick() + (1000 / self.settings.tick_interval_ms) * FIRE_CONTROL_SECS;
        let star_locs: Vec<Vec2> = self.stars.values().map(|s| s.loc).collect();

        for ship in self.ships.values_mut() {
            // every third kill earns a wingman, lost again on death
            if ship.hp > 0
                && ship.score != 0
                && ship.score % 3 == 0
                && !ship.has_power_up(PowerUpKind::DualShip)
            {
                ship.attach(PowerUp::new(PowerUpKind::DualShip, Removal::OwnerDead));
            }

            let star_clear = !star_locs
                .iter()
                .any(|loc| (*loc - ship.loc).length() < quad_threshold);
            if star_clear && !ship.has_power_up(PowerUpKind::QuadFire) {
                ship.attach(PowerUp::new(
                    PowerUpKind::QuadFire,
                    Removal::StarWithin(quad_threshold),
                ));
            }

            if ship.hp == 0 && !ship.has_power_up(PowerUpKind::FireControl) {
                ship.attach(PowerUp::new(
                    PowerUpKind::FireControl,
                    Removal::TickReached(fire_control_expiry),
                ));
            }
        }
    }

    fn apply_power_ups(&mut self) {
        let mut ship_ids: Vec<u32> = self.ships.keys().copied().collect();
        ship_ids.sort_unstable();
        for ship_id in ship_ids {
            let unapplied: Vec<PowerUpKind> = match self.ships.get(&ship_id) {
                Some(ship) => ship
                    .power_ups
                    .iter()
                    .filter(|p| p.active && !p.applied)
                    .map(|p| p.kind)
                    .collect(),
                None => continue,
            };
            for kind in unapplied {
                match kind {
                    PowerUpKind::DualShip => self.apply_dual_ship(ship_id),
                    PowerUpKind::QuadFire => {
                        if let Some(ship) = self.ships.get_mut(&ship_id) {
                            ship.add_override(Action::Fire, OverrideFn::QuadFire);
                        }
                    }
                    PowerUpKind::FireControl => {
                        if let Some(ship) = self.ships.get_mut(&ship_id) {
                            ship.add_override(Action::Fire, OverrideFn::ControlFire);
                        }
                    }
                }
                if let Some(power_up) = self
                    .ships
                    .get_mut(&ship_id)
                    .and_then(|ship| ship.power_up_mut(kind))
                {
                    power_up.applied = true;
                }
            }
        }
    }

    fn apply_dual_ship(&mut self, owner_id: u32) {
        let Some(owner) = self.ships.get(&owner_id) else {
            return;
        };
        let duplicate_id = self.entity_ids.next();
        let mut duplicate = Ship::new(
            duplicate_id,
            format!("Bizarro{}", owner.name),
            owner.loc,
            self.settings.starting_ship_health,
            self.settings.respawn_delay,
        );
        mirror_owner(owner, &mut duplicate, self.settings.ship_collision_radius);
        info!("Ship {} gained wingman {}", owner_id, duplicate_id);
        self.duplicates.insert(duplicate_id, duplicate);
        if let Some(owner) = self.ships.get_mut(&owner_id) {
            owner.add_override(Action::Fire, OverrideFn::DualFire);
            if let Some(power_up) = owner.power_up_mut(PowerUpKind::DualShip) {
                power_up.duplicate_id = Some(duplicate_id);
            }
        }
    }

    fn run_power_up_updates(&mut self) {
        let mut ship_ids: Vec<u32> = self.ships.keys().copied().collect();
        ship_ids.sort_unstable();
        for ship_id in ship_ids {
            if let Some(ship) = self.ships.get_mut(&ship_id) {
                ship.power_ups.retain(|p| p.active);
            }
            let snapshot: Vec<PowerUp> = match self.ships.get(&ship_id) {
                Some(ship) => ship.power_ups.clone(),
                None => continue,
            };
            for power_up in snapshot {
                if self.removal_satisfied(ship_id, &power_up.removal) {
                    self.remove_power_up(ship_id, &power_up);
                } else {
                    self.run_power_up_tick(ship_id, &power_up);
                }
            }
        }
    }

    fn removal_satisfied(&self, ship_id: u32, removal: &Removal) -> bool {
        match removal {
            Removal::OwnerDead => self
                .ships
                .get(&ship_id)
                .map(|ship| ship.hp <= 0)
                .unwrap_or(true),
            Removal::StarWithin(distance) => match self.ships.get(&ship_id) {
                Some(ship) => self
                    .stars
                    .values()
                    .any(|s| (s.loc - ship.loc).length() < *distance),
                None => true,
            },
            Removal::TickReached(tick) => self.tick() > *tick,
        }
    }

    fn remove_power_up(&mut self, ship_id: u32, power_up: &PowerUp) {
        match power_up.kind {
            PowerUpKind::DualShip => {
                if let Some(ship) = self.ships.get_mut(&ship_id) {
                    ship.remove_override(Action::Fire, OverrideFn::DualFire);
                }
                if let Some(duplicate_id) = power_up.duplicate_id {
                    if let Some(mut duplicate) = self.duplicates.remove(&duplicate_id) {
                        duplicate.hp = 0;
                        // the client hears about the wingman's death once
                        self.queue_entity_line(&duplicate);
                    }
                }
            }
            PowerUpKind::QuadFire => {
                if let Some(ship) = self.ships.get_mut(&ship_id) {
                    ship.remove_override(Action::Fire, OverrideFn::QuadFire);
                }
            }
            PowerUpKind::FireControl => {
                if let Some(ship) = self.ships.get_mut(&ship_id) {
                    ship.remove_override(Action::Fire, OverrideFn::ControlFire);
                }
            }
        }
        if let Some(power_up) = self
            .ships
            .get_mut(&ship_id)
            .and_then(|ship| ship.power_up_mut(power_up.kind))
        {
            power_up.active = false;
        }
    }

    fn run_power_up_tick(&mut self, ship_id: u32, power_up: &PowerUp) {
        match power_up.kind {
            PowerUpKind::DualShip => {
                // forces may move the pair apart; re-derive the wingman
                // from the owner every tick
                if let Some(duplicate_id) = power_up.duplicate_id {
                    let owner = match self.ships.get(&ship_id) {
                        Some(owner) => owner.clone(),
                        None => return,
                    };
                    if let Some(duplicate) = self.duplicates.get_mut(&duplicate_id) {
                        mirror_owner(&owner, duplicate, self.settings.ship_collision_radius);
                    }
                }
            }
            PowerUpKind::QuadFire => {}
            PowerUpKind::FireControl => {
                // the ghost keeps shooting where it points
                if let Some((loc, dir)) = self.ship_pose(ship_id) {
                    self.fire(ship_id, loc, dir);
                }
            }
        }
    }
}

/// Copies the owner's motion state onto the duplicate, offset perpendicular
/// to the owner's facing by the ship diameter.
fn mirror_owner(owner: &Ship, duplicate: &mut Ship, ship_collision_radius: f64) {
    let offset = owner.dir.perpendicular() * (ship_collision_radius * 2.0);
    duplicate.loc = owner.loc - offset;
    duplicate.velocity = owner.velocity;
    duplicate.dir = owner.dir;
    duplicate.thrust = owner.thrust;
    duplicate.score = owner.score;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSettings;
    use crate::game::IdSource;
    use shared::protocol::CommandSet;
    use std::sync::Arc;

    fn test_world(settings: ServerSettings) -> World {
        World::new(settings, Arc::new(IdSource::new()))
    }

    fn add_ship_at(world: &mut World, name: &str, loc: Vec2) -> u32 {
        let id = world.entity_ids.next();
        world.add_ship(id, name.to_string());
        let ship = world.ships.get_mut(&id).unwrap();
        ship.loc = loc;
        ship.velocity = Vec2::ZERO;
        id
    }

    fn fire_only() -> CommandSet {
        CommandSet {
            fire: true,
            ..CommandSet::default()
        }
    }

    // between the burn radius (35) and the quad-fire threshold (87.5)
    fn near_star() -> Vec2 {
        Vec2::new(60.0, 0.0)
    }

    fn far_from_star() -> Vec2 {
        Vec2::new(250.0, 250.0)
    }

    #[test]
    fn test_dual_ship_attaches_on_score_multiple_of_three() {
        let mut world = test_world(ServerSettings::default());
        let id = add_ship_at(&mut world, "ace", near_star());
        world.ships.get_mut(&id).unwrap().score = 3;

        world.update(&[]);

        assert!(world.ships[&id].has_power_up(PowerUpKind::DualShip));
        assert_eq!(world.duplicates.len(), 1);
        let duplicate = world.duplicates.values().next().unwrap();
        assert_eq!(duplicate.name, "Bizarroace");
        assert_eq!(duplicate.score, 3);
        assert_eq!(duplicate.dir, world.ships[&id].dir);
        assert_eq!(
            world.ships[&id].overrides.get(Action::Fire),
            &[OverrideFn::DualFire]
        );
    }

    #[test]
    fn test_dual_ship_mirrors_owner_each_tick() {
        let mut world = test_world(ServerSettings::default());
        let id = add_ship_at(&mut world, "ace", near_star());
        world.ships.get_mut(&id).unwrap().score = 3;
        world.update(&[]);

        let thrust = CommandSet {
            thrust: true,
            rotate_right: true,
            ..CommandSet::default()
        };
        world.update(&[(id, thrust)]);
        world.update(&[]);

        let owner = &world.ships[&id];
        let duplicate = world.duplicates.values().next().unwrap();
        assert_eq!(duplicate.dir, owner.dir);
        assert_eq!(duplicate.score, owner.score);
        let separation = (owner.loc - duplicate.loc).length();
        // offset is the ship diameter, modulo one tick of drift
        assert!((separation - world.settings.ship_collision_radius * 2.0).abs() < 2.0);
    }

    #[test]
    fn test_dual_fire_shoots_from_both_ships() {
        let settings = ServerSettings {
            projectile_fire_delay: 1,
            ..ServerSettings::default()
        };
        let mut world = test_world(settings);
        let id = add_ship_at(&mut world, "ace", near_star());
        world.ships.get_mut(&id).unwrap().score = 3;
        world.update(&[]);
        let duplicate_id = *world.duplicates.keys().next().unwrap();

        world.update(&[(id, fire_only())]);

        let mut owners: Vec<u32> = world.projectiles.values().map(|p| p.owner).collect();
        owners.sort_unstable();
        assert_eq!(owners, vec![id, duplicate_id]);
    }

    #[test]
    fn test_dual_ship_lost_on_death_with_one_final_record() {
        let mut world = test_world(ServerSettings::default());
        let id = add_ship_at(&mut world, "ace", near_star());
        world.ships.get_mut(&id).unwrap().score = 3;
        world.update(&[]);
        let duplicate_id = *world.duplicates.keys().next().unwrap();

        world.ships.get_mut(&id).unwrap().hp = 0;
        world.dead_ships.insert(id);
        world.update(&[]);

        assert!(world.duplicates.is_empty());
        // the dual-fire override is gone (the death itself attaches the
        // auto-fire power-up, so the table need not be empty)
        assert!(!world.ships[&id]
            .overrides
            .get(Action::Fire)
            .contains(&OverrideFn::DualFire));

        let frame = world.serialize();
        let records: Vec<&str> = frame
            .lines()
            .filter(|line| line.contains(&format!("\"ship\":{}", duplicate_id)))
            .collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("\"hp\":0"));

        // dead owners don't re-earn the wingman, so the record never repeats
        world.update(&[]);
        assert!(world.duplicates.is_empty());
        assert!(!world
            .serialize()
            .contains(&format!("\"ship\":{}", duplicate_id)));
    }

    #[test]
    fn test_quad_fire_attaches_when_star_is_far() {
        let mut world = test_world(ServerSettings::default());
        let far = add_ship_at(&mut world, "rover", far_from_star());
        let near = add_ship_at(&mut world, "moth", near_star());

        world.update(&[]);

        assert!(world.ships[&far].has_power_up(PowerUpKind::QuadFire));
        assert!(!world.ships[&near].has_power_up(PowerUpKind::QuadFire));
    }

    #[test]
    fn test_quad_fire_shoots_four_ways() {
        let settings = ServerSettings {
            projectile_fire_delay: 1,
            ..ServerSettings::default()
        };
        let mut world = test_world(settings);
        let id = add_ship_at(&mut world, "rover", far_from_star());
        world.update(&[]);

        world.update(&[(id, fire_only())]);

        assert_eq!(world.projectiles.len(), 4);
        let dir = world.ships[&id].dir;
        let right = dir.perpendicular();
        for expected in [dir, -dir, right, -right] {
            assert!(
                world
                    .projectiles
                    .values()
                    .any(|p| (p.dir - expected).length() < 1e-9),
                "missing projectile along {:?}",
                expected
            );
        }
    }

    #[test]
    fn test_quad_fire_removed_when_star_comes_close() {
        let mut world = test_world(ServerSettings::default());
        let id = add_ship_at(&mut world, "rover", far_from_star());
        world.update(&[]);
        assert!(world.ships[&id].has_power_up(PowerUpKind::QuadFire));

        world.ships.get_mut(&id).unwrap().loc = near_star();
        world.ships.get_mut(&id).unwrap().velocity = Vec2::ZERO;
        world.update(&[]);

        assert!(world.ships[&id].overrides.get(Action::Fire).is_empty());
        // deactivated this pass, pruned at the start of the next
        world.ships.get_mut(&id).unwrap().loc = near_star();
        world.update(&[]);
        assert!(!world.ships[&id].has_power_up(PowerUpKind::QuadFire));
    }

    #[test]
    fn test_fire_control_auto_fires_then_expires() {
        let settings = ServerSettings {
            tick_interval_ms: 1000, // ten ticks of auto-fire
            projectile_fire_delay: 1,
            respawn_delay: 5,
            ..ServerSettings::default()
        };
        let mut world = test_world(settings);
        let id = add_ship_at(&mut world, "wraith", near_star());
        world.ships.get_mut(&id).unwrap().hp = 0;
        world.dead_ships.insert(id);

        world.update(&[]);
        assert!(world.ships[&id].has_power_up(PowerUpKind::FireControl));
        // the ghost fired without any command
        assert!(world.projectiles.values().any(|p| p.owner == id));

        // respawns at tick 5, expiry passes at tick 11; run well beyond it
        for _ in 0..12 {
            world.update(&[]);
        }
        assert!(!world.ships[&id].has_power_up(PowerUpKind::FireControl));
        assert!(!world.ships[&id]
            .overrides
            .get(Action::Fire)
            .contains(&OverrideFn::ControlFire));

        let live_before = world.projectiles.len();
        world.update(&[]);
        world.update(&[]);
        let created_after = world
            .projectiles
            .values()
            .filter(|p| p.owner == id && p.alive)
            .count();
        // nothing new once the power-up is gone and no commands arrive
        assert!(created_after <= live_before);
    }

    #[test]
    fn test_power_up_kind_never_attached_twice() {
        let mut world = test_world(ServerSettings::default());
        let id = add_ship_at(&mut world, "rover", far_from_star());

        world.update(&[]);
        world.ships.get_mut(&id).unwrap().loc = far_from_star();
        world.ships.get_mut(&id).unwrap().velocity = Vec2::ZERO;
        world.update(&[]);

        let quad_count = world.ships[&id]
            .power_ups
            .iter()
            .filter(|p| p.kind == PowerUpKind::QuadFire)
            .count();
        assert_eq!(quad_count, 1);
        assert_eq!(world.ships[&id].overrides.get(Action::Fire).len(), 1);
    }
}
