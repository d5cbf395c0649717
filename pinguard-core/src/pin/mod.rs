//! Pin identity, semantic configuration and register encoding
//!
//! The semantic [`PinConfiguration`] is what callers ask for; the
//! [`RegisterEncoding`] is what the hardware stores. Only the codec
//! converts between the two.

pub mod codec;
pub mod configuration;
pub mod identity;
pub mod registers;

pub use codec::{decode, encode, CodecError, RegisterEncoding};
pub use configuration::{
    Direction, DriveStrength, Level, PinConfiguration, Pull, SenseMode, Unsupported,
};
pub use identity::{PinError, PinIdentity, Port};
