#![doc = include_str!("../README.md")]

pub mod adaptive;
mod bitmap;
pub mod draft;
pub mod error;
#[cfg(feature = "proptest")]
pub mod gen;
pub mod hamt;
pub mod hash;
pub mod map;
pub mod order;
pub mod owner;
pub mod recipe;
pub mod set;
pub mod value;
pub mod vector;

pub use adaptive::{is_wrapped, unwrap, wrap, wrap_ordered, Policy};
pub use draft::{transform, transform_with, Draft};
pub use error::Error;
pub use map::Map;
pub use recipe::{record_and_apply, record_and_apply_with, PathKey, Recorder};
pub use set::Set;
pub use value::Value;
pub use vector::Vector;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
