// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Frames carried by the medium.
//!
//! A [`Frame`] is either data generated by a station for one of the two
//! traffic classes, or the token which grants the right to transmit to the
//! station it is addressed to.

use std::fmt;
use std::rc::Rc;

use rand::Rng;
use tbs_engine::sim_error;
use tbs_engine::time::clock::ClockTick;
use tbs_engine::types::SimError;
use tbs_track::entity::Entity;
use tbs_track::id::Unique;
use tbs_track::{Id, create, create_id};

/// Smallest valid station address.
pub const MIN_ADDRESS: u32 = 10_000_000;
/// Largest valid station address.
pub const MAX_ADDRESS: u32 = 99_999_999;

/// An 8-digit station address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u32);

impl Address {
    /// Create an address, checking that it has exactly 8 digits.
    pub fn new(value: u32) -> Result<Self, SimError> {
        if !(MIN_ADDRESS..=MAX_ADDRESS).contains(&value) {
            return sim_error!(format!("Address {value} is not an 8 digit number"));
        }
        Ok(Self(value))
    }

    /// Draw an address uniformly from all 8-digit numbers.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(MIN_ADDRESS..=MAX_ADDRESS))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

/// The two traffic priority classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// High priority, served first within the token holding time.
    A,
    /// Best effort, served within the target rotation time.
    B,
}

impl TrafficClass {
    pub const ALL: [TrafficClass; 2] = [TrafficClass::A, TrafficClass::B];

    /// Index used to select per-class state.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            TrafficClass::A => 0,
            TrafficClass::B => 1,
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrafficClass::A => write!(f, "A"),
            TrafficClass::B => write!(f, "B"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Data { class: TrafficClass },
    Token { next_holder: Address },
}

#[derive(Clone, Debug)]
pub struct Frame {
    id: Id,
    created: ClockTick,
    size_bits: u64,
    sequence_id: u64,
    source: Option<Address>,
    kind: FrameKind,
}

impl Frame {
    /// Create a data frame generated by the station at `source`.
    #[must_use]
    pub fn new_data(
        created_by: &Rc<Entity>,
        created: ClockTick,
        size_bits: u64,
        sequence_id: u64,
        source: Address,
        class: TrafficClass,
    ) -> Self {
        let frame = Self {
            id: create_id!(created_by),
            created,
            size_bits,
            sequence_id,
            source: Some(source),
            kind: FrameKind::Data { class },
        };
        create!(created_by ; frame, size_bits);
        frame
    }

    /// Create a token addressed to `next_holder`.
    ///
    /// The initial token placed on the medium has no source.
    #[must_use]
    pub fn new_token(
        created_by: &Rc<Entity>,
        created: ClockTick,
        size_bits: u64,
        source: Option<Address>,
        next_holder: Address,
    ) -> Self {
        let frame = Self {
            id: create_id!(created_by),
            created,
            size_bits,
            sequence_id: 0,
            source,
            kind: FrameKind::Token { next_holder },
        };
        create!(created_by ; frame, size_bits);
        frame
    }

    #[must_use]
    pub fn created(&self) -> ClockTick {
        self.created
    }

    #[must_use]
    pub fn size_bits(&self) -> u64 {
        self.size_bits
    }

    #[must_use]
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    #[must_use]
    pub fn source(&self) -> Option<Address> {
        self.source
    }

    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Data frames are never individually addressed.
    #[must_use]
    pub fn destination(&self) -> Option<Address> {
        match self.kind {
            FrameKind::Data { .. } => None,
            FrameKind::Token { next_holder } => Some(next_holder),
        }
    }

    /// Tokens carry no traffic class.
    #[must_use]
    pub fn traffic_class(&self) -> Option<TrafficClass> {
        match self.kind {
            FrameKind::Data { class } => Some(class),
            FrameKind::Token { .. } => None,
        }
    }

    #[must_use]
    pub fn is_token(&self) -> bool {
        matches!(self.kind, FrameKind::Token { .. })
    }

    /// Returns true if this is a token granting `address` the right to send.
    #[must_use]
    pub fn is_token_for(&self, address: Address) -> bool {
        self.destination() == Some(address)
    }
}

impl Unique for Frame {
    fn id(&self) -> Id {
        self.id
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let source = match self.source {
            Some(address) => address.to_string(),
            None => "-".to_string(),
        };
        match self.kind {
            FrameKind::Data { class } => write!(
                f,
                "data{} #{} from {} ({} bits)",
                class, self.sequence_id, source, self.size_bits
            ),
            FrameKind::Token { next_holder } => {
                write!(f, "token {} -> {}", source, next_holder)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use tbs_track::entity::toplevel;
    use tbs_track::test_helpers::create_tracker;

    use super::*;

    #[test]
    fn address_range() {
        assert!(Address::new(9_999_999).is_err());
        assert!(Address::new(100_000_000).is_err());
        assert_eq!(Address::new(12_345_678).unwrap().to_string(), "12345678");

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..1000 {
            let address = Address::random(&mut rng);
            assert_eq!(address.to_string().len(), 8);
        }
    }

    #[test]
    fn kinds() {
        let tracker = create_tracker(file!());
        let top = toplevel(&tracker, "top");
        let a = Address::new(11_111_111).unwrap();
        let b = Address::new(22_222_222).unwrap();

        let data = Frame::new_data(&top, ClockTick::new(), 1208, 4, a, TrafficClass::B);
        assert_eq!(data.destination(), None);
        assert_eq!(data.traffic_class(), Some(TrafficClass::B));
        assert!(!data.is_token());
        assert!(!data.is_token_for(a));
        assert_eq!(data.to_string(), "dataB #4 from 11111111 (1208 bits)");

        let token = Frame::new_token(&top, ClockTick::new(), 368, None, b);
        assert_eq!(token.destination(), Some(b));
        assert_eq!(token.traffic_class(), None);
        assert_eq!(token.sequence_id(), 0);
        assert!(token.is_token_for(b));
        assert!(!token.is_token_for(a));
        assert_eq!(token.to_string(), "token - -> 22222222");
        assert_ne!(data.id(), token.id());
    }

    #[test]
    fn creation_events_carry_bits() {
        let (test_tracker, tracker) = tbs_track::test_init!(1);
        let top = toplevel(&tracker, "top");
        let a = Address::new(11_111_111).unwrap();

        let _data = Frame::new_data(&top, ClockTick::new(), 1208, 1, a, TrafficClass::A);
        let _token = Frame::new_token(&top, ClockTick::new(), 368, Some(a), a);
        tbs_track::test_helpers::check_and_clear(
            &test_tracker,
            &[
                "0: created 1, top, 0 bits",
                "1: created 2, dataA #1 from 11111111 \\(1208 bits\\), 1208 bits",
                "1: created 3, token 11111111 -> 11111111, 368 bits",
            ],
        );
    }
}
