//! Binary archive codec (big-endian, self-delimiting).
//!
//! Stores data in a streaming way: order of storage is the entire schema.
//! For all-ways compatibility, older members are written and read first,
//! and base class layers are written and read before derived ones.

use thiserror::Error;
use time::{Date, Month, PrimitiveDateTime, Time};

use super::factory::ObjectFactory;
use super::serializable::Serializable;

/// Hard cap on a single archive, and therefore on a single wire frame.
pub const MAX_ARCHIVE_SIZE: usize = 1024 * 1024;

const INITIAL_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("writing {name}: archive overflow: {requested} bytes exceeds the 1 MiB cap")]
    Overflow { name: String, requested: usize },
    #[error("reading {name}: end of stream: pos={position} len={length} wanted={wanted}")]
    EndOfStream {
        name: String,
        position: usize,
        length: usize,
        wanted: usize,
    },
    #[error("reading {name}: negative length: {length}")]
    NegativeLength { name: String, length: i32 },
    #[error("reading {name}: unknown type: {hierarchy}")]
    UnknownType { name: String, hierarchy: String },
    #[error("reading {name}: invalid timestamp field {field}={value}")]
    InvalidTime {
        name: String,
        field: &'static str,
        value: i32,
    },
}

/// A growable write buffer with a cursor at its end.
///
/// Field names are carried for error and trace context only; they are never
/// written to the stream.
pub struct WriteArchive {
    data: Vec<u8>,
}

impl Default for WriteArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteArchive {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn ensure_space(&mut self, name: &str, extra: usize) -> Result<(), ArchiveError> {
        let requested = self.data.len().saturating_add(extra);
        if requested > MAX_ARCHIVE_SIZE {
            return Err(ArchiveError::Overflow {
                name: name.to_string(),
                requested,
            });
        }
        Ok(())
    }

    pub fn write_i32(&mut self, name: &str, value: i32) -> Result<(), ArchiveError> {
        self.ensure_space(name, 4)?;
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// The big-endian int32 whose bits are the IEEE-754 single-precision
    /// representation.
    pub fn write_f32(&mut self, name: &str, value: f32) -> Result<(), ArchiveError> {
        self.write_i32(name, value.to_bits() as i32)
    }

    pub fn write_bool(&mut self, name: &str, value: bool) -> Result<(), ArchiveError> {
        self.write_i32(name, if value { 1 } else { 0 })
    }

    /// int32 length prefix followed by the raw bytes.
    pub fn write_bytes(&mut self, name: &str, value: &[u8]) -> Result<(), ArchiveError> {
        let length = i32::try_from(value.len()).map_err(|_| ArchiveError::Overflow {
            name: name.to_string(),
            requested: value.len(),
        })?;
        self.write_i32(name, length)?;
        self.ensure_space(name, value.len())?;
        self.data.extend_from_slice(value);
        Ok(())
    }

    pub fn write_string(&mut self, name: &str, value: &str) -> Result<(), ArchiveError> {
        self.write_bytes(name, value.as_bytes())
    }

    /// Seven int32 fields: year, month, day, hours, minutes, seconds and the
    /// microsecond fraction. Both peers of a deployment must agree on the
    /// microsecond unit.
    pub fn write_time(&mut self, name: &str, value: PrimitiveDateTime) -> Result<(), ArchiveError> {
        self.write_i32(name, value.year())?;
        self.write_i32(name, u8::from(value.month()) as i32)?;
        self.write_i32(name, value.day() as i32)?;
        self.write_i32(name, value.hour() as i32)?;
        self.write_i32(name, value.minute() as i32)?;
        self.write_i32(name, value.second() as i32)?;
        self.write_i32(name, value.microsecond() as i32)
    }

    /// A framed embedded archive: `[hierarchy][body]` emitted as a single
    /// length-prefixed blob. A null object is the empty blob.
    pub fn write_object(
        &mut self,
        name: &str,
        value: Option<&dyn Serializable>,
    ) -> Result<(), ArchiveError> {
        let mut nested = WriteArchive::new();
        if let Some(value) = value {
            nested.write_string(name, &value.hierarchy())?;
            value.write_to(&mut nested)?;
        }
        self.write_bytes(name, nested.as_slice())
    }
}

/// A read cursor over a borrowed byte slice.
///
/// The factory is optional so that frame headers can be parsed without one;
/// decoding an embedded object without a factory reports the type unknown.
pub struct ReadArchive<'a> {
    factory: Option<&'a ObjectFactory>,
    data: &'a [u8],
    position: usize,
}

impl<'a> ReadArchive<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            factory: None,
            data,
            position: 0,
        }
    }

    pub fn with_factory(factory: &'a ObjectFactory, data: &'a [u8]) -> Self {
        Self {
            factory: Some(factory),
            data,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub(crate) fn nested(&self, data: &'a [u8]) -> ReadArchive<'a> {
        ReadArchive {
            factory: self.factory,
            data,
            position: 0,
        }
    }

    fn take(&mut self, name: &str, wanted: usize) -> Result<&'a [u8], ArchiveError> {
        if wanted > self.remaining() {
            return Err(ArchiveError::EndOfStream {
                name: name.to_string(),
                position: self.position,
                length: self.data.len(),
                wanted,
            });
        }
        let slice = &self.data[self.position..self.position + wanted];
        self.position += wanted;
        Ok(slice)
    }

    pub fn read_i32(&mut self, name: &str) -> Result<i32, ArchiveError> {
        let bytes = self.take(name, 4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self, name: &str) -> Result<f32, ArchiveError> {
        Ok(f32::from_bits(self.read_i32(name)? as u32))
    }

    /// Any nonzero value reads as true.
    pub fn read_bool(&mut self, name: &str) -> Result<bool, ArchiveError> {
        Ok(self.read_i32(name)? != 0)
    }

    pub fn read_bytes(&mut self, name: &str) -> Result<&'a [u8], ArchiveError> {
        let length = self.read_i32(name)?;
        if length < 0 {
            return Err(ArchiveError::NegativeLength {
                name: name.to_string(),
                length,
            });
        }
        self.take(name, length as usize)
    }

    pub fn read_string(&mut self, name: &str) -> Result<String, ArchiveError> {
        let bytes = self.read_bytes(name)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_time(&mut self, name: &str) -> Result<PrimitiveDateTime, ArchiveError> {
        let year = self.read_i32(name)?;
        let month = self.read_i32(name)?;
        let day = self.read_i32(name)?;
        let hours = self.read_i32(name)?;
        let minutes = self.read_i32(name)?;
        let seconds = self.read_i32(name)?;
        let micros = self.read_i32(name)?;

        let invalid = |field: &'static str, value: i32| ArchiveError::InvalidTime {
            name: name.to_string(),
            field,
            value,
        };

        let month = u8::try_from(month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or_else(|| invalid("month", month))?;
        let day_u8 = u8::try_from(day).map_err(|_| invalid("day", day))?;
        let date =
            Date::from_calendar_date(year, month, day_u8).map_err(|_| invalid("day", day))?;

        let hours_u8 = u8::try_from(hours).map_err(|_| invalid("hours", hours))?;
        let minutes_u8 = u8::try_from(minutes).map_err(|_| invalid("minutes", minutes))?;
        let seconds_u8 = u8::try_from(seconds).map_err(|_| invalid("seconds", seconds))?;
        let micros_u32 = u32::try_from(micros).map_err(|_| invalid("fraction", micros))?;
        let clock = Time::from_hms_micro(hours_u8, minutes_u8, seconds_u8, micros_u32)
            .map_err(|_| invalid("fraction", micros))?;

        Ok(PrimitiveDateTime::new(date, clock))
    }

    /// Decodes a framed embedded object. The empty blob is a null object.
    pub fn read_object(&mut self, name: &str) -> Result<Option<Box<dyn Serializable>>, ArchiveError> {
        let data = self.read_bytes(name)?;
        if data.is_empty() {
            return Ok(None);
        }

        let mut nested = self.nested(data);
        let hierarchy = nested.read_string(name)?;
        let instance = self.factory.and_then(|factory| factory.create(&hierarchy));
        let Some(mut instance) = instance else {
            return Err(ArchiveError::UnknownType {
                name: name.to_string(),
                hierarchy,
            });
        };

        instance.read_from(&mut nested)?;
        Ok(Some(instance))
    }
}
