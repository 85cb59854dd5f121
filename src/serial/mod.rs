//! Typed polymorphic binary serialization.
//!
//! The wire format interoperates bit-for-bit with the Java peer: big-endian
//! primitives, length-prefixed strings, and framed embedded objects carrying
//! a class hierarchy string for cross-version instantiation.

mod archive;
mod factory;
mod serializable;

pub use archive::{ArchiveError, MAX_ARCHIVE_SIZE, ReadArchive, WriteArchive};
pub use factory::ObjectFactory;
pub use serializable::{Serializable, read_class, write_class};
