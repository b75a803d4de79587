#[macro_use]
extern crate serde;

mod address;
mod ballot;
mod clock;
mod election;
mod error;
mod events;
mod lookup;
mod registry;
mod serde_hex;
mod store;
mod util;

pub use address::*;
pub use ballot::*;
pub use clock::*;
pub use election::*;
pub use error::*;
pub use events::*;
pub use lookup::*;
pub use registry::*;
pub use serde_hex::*;
pub use store::*;
pub use util::*;

#[cfg(test)]
mod tests;
