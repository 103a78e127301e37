// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Arrival generators.
//!
//! Each station has one [`ArrivalGenerator`] per traffic class. After an
//! optional start delay the generator repeatedly waits for the next
//! inter-arrival time, creates a frame and appends it to the station queue
//! for its class.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tbs_engine::time::clock::Clock;
use tbs_engine::traits::Runnable;
use tbs_engine::types::SimResult;
use tbs_track::entity::Entity;
use tbs_track::{debug, trace};

use crate::config::TokenBusConfig;
use crate::distributions::{frame_size_bits, inter_arrival_us};
use crate::frame::{Frame, TrafficClass};
use crate::station::Station;

/// Derive the seed of an arrival stream from the run seed.
///
/// Every station and class gets a different stream, none of which is the
/// stream used to build the ring.
#[must_use]
pub fn arrival_seed(seed: u64, station_index: usize, class: TrafficClass) -> u64 {
    seed ^ (((station_index as u64 + 1) << 1) | class.index() as u64)
}

pub struct ArrivalGenerator {
    pub entity: Rc<Entity>,
    station: Rc<Station>,
    class: TrafficClass,
    clock: Clock,
    config: Rc<TokenBusConfig>,
    rng: RefCell<Xoshiro256PlusPlus>,
}

impl ArrivalGenerator {
    #[must_use]
    pub fn new(
        clock: &Clock,
        station: &Rc<Station>,
        station_index: usize,
        class: TrafficClass,
        config: &Rc<TokenBusConfig>,
    ) -> Self {
        let entity = Rc::new(Entity::new(&station.entity, &format!("gen{class}")));
        let rng = Xoshiro256PlusPlus::seed_from_u64(arrival_seed(config.seed, station_index, class));
        Self {
            entity,
            station: station.clone(),
            class,
            clock: clock.clone(),
            config: config.clone(),
            rng: RefCell::new(rng),
        }
    }

    fn still_generating(&self) -> bool {
        match self.config.arrival_finish_us {
            Some(finish_us) => self.clock.time_now_us() < finish_us,
            None => true,
        }
    }
}

#[async_trait(?Send)]
impl Runnable for ArrivalGenerator {
    async fn run(&self) -> SimResult {
        let start_ticks = self.clock.us_to_ticks(self.config.arrival_start_us);
        self.clock.wait_ticks(start_ticks).await;

        while self.still_generating() {
            let interval_us = inter_arrival_us(
                &self.config,
                self.class,
                self.config.load,
                self.config.num_stations,
                &mut *self.rng.borrow_mut(),
            );
            let Some(interval_us) = interval_us else {
                debug!(self.entity ; "no load, nothing to generate");
                return Ok(());
            };
            self.clock
                .wait_ticks(self.clock.us_to_ticks(interval_us as f64))
                .await;

            let data_bits = frame_size_bits(&self.config, self.class, &mut *self.rng.borrow_mut());
            let frame = Frame::new_data(
                &self.entity,
                self.clock.tick_now(),
                self.config.overhead_bits + data_bits,
                self.station.next_sequence_id(),
                self.station.address(),
                self.class,
            );
            trace!(self.entity ; "generated {}", frame);
            self.station.enqueue(frame)?;
        }
        Ok(())
    }
}
