// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build a logical token ring.
//!
//! The builder creates the stations with unique random addresses, links each
//! station to the next one created (the last links back to the first), places
//! the initial token for a randomly chosen station on the medium and
//! registers all of the station processes with the engine.

use std::collections::HashSet;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tbs_engine::engine::Engine;
use tbs_engine::time::clock::{Clock, ClockTick};
use tbs_engine::types::SimError;
use tbs_track::entity::Entity;
use tbs_track::info;

use crate::arrival::ArrivalGenerator;
use crate::config::TokenBusConfig;
use crate::frame::{Address, Frame, TrafficClass};
use crate::mac::MacEngine;
use crate::medium::Medium;
use crate::station::Station;

pub struct TokenRing {
    pub medium: Rc<Medium>,
    pub stations: Vec<Rc<Station>>,
    pub macs: Vec<Rc<MacEngine>>,
    pub initial_holder: Address,
}

impl TokenRing {
    /// Look up a station by address.
    #[must_use]
    pub fn station(&self, address: Address) -> Option<&Rc<Station>> {
        self.stations.iter().find(|s| s.address() == address)
    }
}

/// Draw `count` distinct addresses, resampling on collision.
pub fn unique_addresses<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Address> {
    let mut seen = HashSet::with_capacity(count);
    let mut addresses = Vec::with_capacity(count);
    while addresses.len() < count {
        let address = Address::random(rng);
        if seen.insert(address) {
            addresses.push(address);
        }
    }
    addresses
}

/// Create the ring described by `config` under `parent` and register its
/// processes with the `engine`.
///
/// The `clock` must tick once per bit time on the medium.
pub fn build_ring(
    engine: &Engine,
    clock: &Clock,
    parent: &Rc<Entity>,
    config: &Rc<TokenBusConfig>,
) -> Result<TokenRing, SimError> {
    config.validate()?;

    let entity = Rc::new(Entity::new(parent, "ring"));
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

    let addresses = unique_addresses(config.num_stations, &mut rng);
    let rotation_deadline = ClockTick::new().set_tick(clock.us_to_ticks(config.trt_us));
    let stations: Vec<Rc<Station>> = addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            Rc::new(Station::new(
                &entity,
                i,
                *address,
                rotation_deadline,
                config.record_visits,
            ))
        })
        .collect();

    for (i, station) in stations.iter().enumerate() {
        station.set_next(addresses[(i + 1) % addresses.len()])?;
    }

    let initial_holder = addresses[rng.gen_range(0..addresses.len())];
    let token = Frame::new_token(
        &entity,
        ClockTick::new(),
        config.token_frame_bits(),
        None,
        initial_holder,
    );
    let medium = Rc::new(Medium::new(&entity, token));

    info!(entity ; "{} stations, token starts at {}", stations.len(), initial_holder);

    let mut macs = Vec::with_capacity(stations.len());
    for (i, station) in stations.iter().enumerate() {
        for class in TrafficClass::ALL {
            let generator = ArrivalGenerator::new(clock, station, i, class, config);
            engine.register(Rc::new(generator));
        }
        let mac = Rc::new(MacEngine::new(clock, station, &medium, config));
        engine.register(mac.clone());
        macs.push(mac);
    }

    Ok(TokenRing {
        medium,
        stations,
        macs,
        initial_holder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_unique() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let addresses = unique_addresses(500, &mut rng);
        let set: HashSet<_> = addresses.iter().collect();
        assert_eq!(set.len(), 500);
    }
}
