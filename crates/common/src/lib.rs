//! Shared types for placeweave: arena ids, directions, ecosystems, and the
//! seeded random stream every generation stage draws from.

mod direction;
mod rng;
mod types;

pub use direction::Direction;
pub use rng::SeededRandom;
pub use types::{Connection, EcosystemId, PlaceId, Vertex, VertexId};
