//! Serializable contract and class-layer framing.
//!
//! Every type that travels the wire declares a class hierarchy string
//! (comma-separated dotted names, most-specific first) and reads/writes its
//! fields in declared order. Each class layer packs its own fields into a
//! nested length-prefixed body, so a reader that knows fewer layers, or
//! fewer fields of a layer, skips what it does not understand.

use std::any::Any;

use super::archive::{ArchiveError, ReadArchive, WriteArchive};

pub trait Serializable: Send + Sync + 'static {
    /// Comma-separated list of dotted class names, most-specific first.
    /// Example: `"varieties.GrannySmith,plants.fruits.Apple"`.
    fn hierarchy(&self) -> String;

    /// Prototype method: a blank, default-constructed instance.
    fn new_instance(&self) -> Box<dyn Serializable>;

    /// Writes every class layer, base first.
    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError>;

    /// Reads every class layer, base first, skipping layers the stream does
    /// not carry.
    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError>;

    /// Concrete-type access for callers that consume a decoded object.
    fn as_any(&self) -> &dyn Any;

    /// Messages override this to expose their post-decode action. Types that
    /// are not messages return themselves unchanged.
    fn into_message(self: Box<Self>) -> Result<Box<dyn crate::net::Message>, Box<dyn Serializable>>;

    /// Runnable simulation requests override this. Types that are not
    /// requests return themselves unchanged.
    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::simulation::SimulationRequest>, Box<dyn Serializable>>;
}

impl std::fmt::Debug for dyn Serializable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Serializable({})", self.hierarchy())
    }
}

/// Packs one class layer: the fields are written into their own archive,
/// which is then emitted as a single length-prefixed body.
pub fn write_class<F>(
    archive: &mut WriteArchive,
    name: &str,
    fields: F,
) -> Result<(), ArchiveError>
where
    F: FnOnce(&mut WriteArchive) -> Result<(), ArchiveError>,
{
    let mut body = WriteArchive::new();
    fields(&mut body)?;
    archive.write_bytes(name, body.as_slice())
}

/// Unpacks one class layer. A stream written by an older peer may end before
/// this layer; the fields then keep their defaults.
pub fn read_class<'a, F>(
    archive: &mut ReadArchive<'a>,
    name: &str,
    fields: F,
) -> Result<(), ArchiveError>
where
    F: FnOnce(&mut ReadArchive<'a>) -> Result<(), ArchiveError>,
{
    if archive.remaining() == 0 {
        return Ok(());
    }
    let data = archive.read_bytes(name)?;
    let mut body = archive.nested(data);
    fields(&mut body)
}
