use shared::entity::{parse_entity, Projectile, Ship, Star, WireEntity};
use std::collections::HashMap;

/// The client's replica of the world, rebuilt from snapshot lines.
///
/// Ships are upserted as they arrive (a final hp=0 record simply leaves a
/// dead ship in place); projectiles are dropped as soon as the server
/// reports them dead or out of the visible universe.
pub struct ClientWorld {
    pub ships: HashMap<u32, Ship>,
    pub projectiles: HashMap<u32, Projectile>,
    pub stars: HashMap<u32, Star>,
    universe_size: i32,
}

impl ClientWorld {
    pub fn new(universe_size: i32) -> ClientWorld {
        ClientWorld {
            ships: HashMap::new(),
            projectiles: HashMap::new(),
            stars: HashMap::new(),
            universe_size,
        }
    }

    /// Folds one snapshot line into the replica. Lines that don't parse as
    /// an entity are ignored.
    pub fn apply_message(&mut self, line: &str) {
        match parse_entity(line) {
            Ok(WireEntity::Ship(ship)) => {
                self.ships.insert(ship.id, ship);
            }
            Ok(WireEntity::Projectile(proj)) => {
                let bounds = (self.universe_size / 2) as f64;
                if proj.alive && proj.loc.x.abs() < bounds && proj.loc.y.abs() < bounds {
                    self.projectiles.insert(proj.id, proj);
                } else {
                    self.projectiles.remove(&proj.id);
                }
            }
            Ok(WireEntity::Star(star)) => {
                self.stars.insert(star.id, star);
            }
            Err(_) => {}
        }
    }
}
