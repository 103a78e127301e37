// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The timed-token MAC engine of a station.
//!
//! # State machine
//!
//! ```text
//!            token for this station
//!   +------+ --------------------> +-------------------+
//!   | Idle |                       | TransmittingClassA|
//!   +------+ <--+                  +-------------------+
//!      ^  |     | poll step                  |
//!      |  +-----+                            v
//!      |                           +-------------------+
//!      |                           | TransmittingClassB|
//!      |                           +-------------------+
//!      |       +----------------+            |
//!      +-------| RelayingToken  | <----------+
//!              +----------------+
//! ```
//!
//! Class A frames are sent while the time since token receipt is less than
//! the token holding time. Class B frames are sent while the time is before
//! the rotation deadline, which is only reset when the token is relayed and
//! so carries over from one visit to the next. Both deadlines are only
//! checked between frames so a frame that has started is always completed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use tbs_engine::sim_error;
use tbs_engine::time::clock::{Clock, ClockTick};
use tbs_engine::traits::Runnable;
use tbs_engine::types::SimResult;
use tbs_track::entity::Entity;
use tbs_track::{debug, trace};

use crate::config::TokenBusConfig;
use crate::frame::{Frame, TrafficClass};
use crate::medium::Medium;
use crate::station::{Station, TokenVisit};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MacState {
    /// Sensing the medium for a token addressed to this station.
    #[default]
    Idle,
    TransmittingClassA,
    TransmittingClassB,
    RelayingToken,
}

impl fmt::Display for MacState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

pub struct MacEngine {
    pub entity: Rc<Entity>,
    station: Rc<Station>,
    medium: Rc<Medium>,
    clock: Clock,
    config: Rc<TokenBusConfig>,
    state: Cell<MacState>,
    ts_ticks: u64,
    trt_ticks: u64,
    poll_ticks: u64,
}

impl MacEngine {
    #[must_use]
    pub fn new(
        clock: &Clock,
        station: &Rc<Station>,
        medium: &Rc<Medium>,
        config: &Rc<TokenBusConfig>,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::new(&station.entity, "mac")),
            station: station.clone(),
            medium: medium.clone(),
            clock: clock.clone(),
            config: config.clone(),
            state: Cell::new(MacState::Idle),
            ts_ticks: clock.us_to_ticks(config.ts_us),
            trt_ticks: clock.us_to_ticks(config.trt_us),
            poll_ticks: config.poll_step_bits(),
        }
    }

    /// The current protocol state.
    #[must_use]
    pub fn state(&self) -> MacState {
        self.state.get()
    }

    fn set_state(&self, state: MacState) {
        trace!(self.entity ; "{} -> {}", self.state.get(), state);
        self.state.set(state);
    }

    /// Transmit queued frames of `class` while the time is before `deadline`.
    async fn serve_class(&self, class: TrafficClass, deadline: ClockTick) -> SimResult {
        while self.clock.tick_now() < deadline && !self.station.is_empty(class) {
            let Some(frame) = self.station.dequeue(class) else {
                break;
            };

            // One tick is one bit time
            self.clock.wait_ticks(frame.size_bits()).await;

            let now = self.clock.tick_now();
            let delay_us = self.clock.ticks_to_us(now.ticks_since(frame.created()));
            trace!(self.entity ; "sent {} after {:.1}us", frame, delay_us);
            self.station.record_delay(class, delay_us);
            self.medium.write(frame);
        }
        Ok(())
    }

    async fn relay_token(&self) -> SimResult {
        let Some(next_holder) = self.station.next() else {
            return sim_error!(format!(
                "{}: no next station to pass the token to",
                self.entity.full_name()
            ));
        };

        let token = Frame::new_token(
            &self.entity,
            self.clock.tick_now(),
            self.config.token_frame_bits(),
            Some(self.station.address()),
            next_holder,
        );
        self.clock.wait_ticks(token.size_bits()).await;
        trace!(self.entity ; "relay {}", token);
        self.medium.write(token);
        Ok(())
    }
}

#[async_trait(?Send)]
impl Runnable for MacEngine {
    async fn run(&self) -> SimResult {
        let address = self.station.address();
        let mut received = ClockTick::new();
        let mut class_a_done = ClockTick::new();
        let mut class_b_done = ClockTick::new();

        loop {
            match self.state.get() {
                MacState::Idle => {
                    if self.medium.read().is_token_for(address) {
                        received = self.clock.tick_now();
                        debug!(self.entity ; "token received ({} A, {} B queued)",
                            self.station.queue_len(TrafficClass::A),
                            self.station.queue_len(TrafficClass::B));
                        self.set_state(MacState::TransmittingClassA);
                    } else {
                        self.clock.wait_ticks(self.poll_ticks).await;
                    }
                }
                MacState::TransmittingClassA => {
                    let deadline = self.clock.tick_now() + self.ts_ticks;
                    self.serve_class(TrafficClass::A, deadline).await?;
                    class_a_done = self.clock.tick_now();
                    self.set_state(MacState::TransmittingClassB);
                }
                MacState::TransmittingClassB => {
                    let deadline = self.station.rotation_deadline();
                    self.serve_class(TrafficClass::B, deadline).await?;
                    class_b_done = self.clock.tick_now();
                    self.set_state(MacState::RelayingToken);
                }
                MacState::RelayingToken => {
                    self.station
                        .set_rotation_deadline(self.clock.tick_now() + self.trt_ticks);
                    self.relay_token().await?;
                    self.station.record_visit(TokenVisit {
                        received,
                        class_a_done,
                        class_b_done,
                        relayed: self.clock.tick_now(),
                    });
                    self.set_state(MacState::Idle);
                }
            }
        }
    }
}
