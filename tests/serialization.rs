//! Cross-version serialization compatibility.
//!
//! Three vintages of the same wire type exercise both skew directions:
//! - `OriginalPoint` — the first shipped `shapes.Point`
//! - `WidePoint` — a later `shapes.Point` with an appended field
//! - `ColoredPoint` — a derivation adding its own class layer

use std::any::Any;

use aquarians_rs::serial::{
    ArchiveError, ObjectFactory, ReadArchive, Serializable, WriteArchive, read_class, write_class,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct OriginalPoint {
    x: i32,
    y: i32,
}

impl OriginalPoint {
    fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Serializable for OriginalPoint {
    fn hierarchy(&self) -> String {
        "shapes.Point".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(OriginalPoint::default())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "Point", |body| {
            body.write_i32("X", self.x)?;
            body.write_i32("Y", self.y)
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "Point", |body| {
            self.x = body.read_i32("X")?;
            self.y = body.read_i32("Y")?;
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::net::Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}

/// A later application version appended `z` to the Point class.
#[derive(Clone, Debug, Default, PartialEq)]
struct WidePoint {
    x: i32,
    y: i32,
    z: i32,
}

impl Serializable for WidePoint {
    fn hierarchy(&self) -> String {
        "shapes.Point".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(WidePoint::default())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "Point", |body| {
            body.write_i32("X", self.x)?;
            body.write_i32("Y", self.y)?;
            body.write_i32("Z", self.z)
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "Point", |body| {
            self.x = body.read_i32("X")?;
            self.y = body.read_i32("Y")?;
            if body.remaining() == 0 {
                return Ok(());
            }
            self.z = body.read_i32("Z")?;
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::net::Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct ColoredPoint {
    x: i32,
    y: i32,
    color: i32,
    alpha: i32,
}

impl ColoredPoint {
    fn new(x: i32, y: i32, color: i32, alpha: i32) -> Self {
        Self { x, y, color, alpha }
    }
}

impl Serializable for ColoredPoint {
    fn hierarchy(&self) -> String {
        "shapes.ColoredPoint,shapes.Point".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(ColoredPoint::default())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "Point", |body| {
            body.write_i32("X", self.x)?;
            body.write_i32("Y", self.y)
        })?;
        write_class(archive, "ColoredPoint", |body| {
            body.write_i32("Color", self.color)?;
            body.write_i32("Alpha", self.alpha)
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "Point", |body| {
            self.x = body.read_i32("X")?;
            self.y = body.read_i32("Y")?;
            Ok(())
        })?;
        read_class(archive, "ColoredPoint", |body| {
            self.color = body.read_i32("Color")?;
            self.alpha = body.read_i32("Alpha")?;
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::net::Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn aquarians_rs::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}

/// The first application version: only the original Point exists.
fn old_factory() -> ObjectFactory {
    let mut factory = ObjectFactory::new();
    factory.register(Box::new(OriginalPoint::default()));
    factory
}

/// The current version: ColoredPoint is the Point everyone instantiates.
fn new_factory() -> ObjectFactory {
    let mut factory = ObjectFactory::new();
    factory.register(Box::new(ColoredPoint::default()));
    factory
}

fn encode(value: &dyn Serializable) -> Vec<u8> {
    let mut archive = WriteArchive::new();
    archive.write_object("point", Some(value)).unwrap();
    archive.into_bytes()
}

fn decode<T: Clone + 'static>(factory: &ObjectFactory, bytes: &[u8]) -> T {
    let mut reader = ReadArchive::with_factory(factory, bytes);
    let object = reader.read_object("point").unwrap().unwrap();
    object.as_any().downcast_ref::<T>().unwrap().clone()
}

#[test]
fn same_version_round_trips() {
    let point = ColoredPoint::new(1, 2, 3, 4);
    let decoded: ColoredPoint = decode(&new_factory(), &encode(&point));
    assert_eq!(decoded, point);
}

#[test]
fn reencoding_a_decoded_object_is_stable() {
    let point = ColoredPoint::new(5, 6, 7, 8);
    let first: ColoredPoint = decode(&new_factory(), &encode(&point));
    let second: ColoredPoint = decode(&new_factory(), &encode(&first));
    assert_eq!(second, first);
}

#[test]
fn old_stream_reads_into_the_new_type() {
    // Version 1 wrote a plain Point; version 3 resolves it to a ColoredPoint
    // whose extra layer keeps its defaults.
    let old = OriginalPoint::new(1, 2);
    let decoded: ColoredPoint = decode(&new_factory(), &encode(&old));
    assert_eq!(decoded, ColoredPoint::new(1, 2, 0, 0));
}

#[test]
fn new_stream_reads_into_the_old_type() {
    // Version 3 wrote a ColoredPoint; version 1 resolves the base token and
    // never looks at the trailing layer.
    let new = ColoredPoint::new(1, 2, 3, 4);
    let decoded: OriginalPoint = decode(&old_factory(), &encode(&new));
    assert_eq!(decoded, OriginalPoint::new(1, 2));
}

#[test]
fn appended_fields_are_discarded_by_an_older_reader() {
    let wide = WidePoint { x: 7, y: 9, z: 11 };
    let decoded: OriginalPoint = decode(&old_factory(), &encode(&wide));
    assert_eq!(decoded, OriginalPoint::new(7, 9));
}

#[test]
fn appended_fields_default_for_a_newer_reader() {
    let mut factory = ObjectFactory::new();
    factory.register(Box::new(WidePoint::default()));

    let old = OriginalPoint::new(7, 9);
    let decoded: WidePoint = decode(&factory, &encode(&old));
    assert_eq!(decoded, WidePoint { x: 7, y: 9, z: 0 });
}

#[test]
fn unknown_hierarchy_reports_the_type() {
    let point = OriginalPoint::new(1, 2);
    let bytes = encode(&point);

    let factory = ObjectFactory::new();
    let mut reader = ReadArchive::with_factory(&factory, &bytes);
    let err = reader.read_object("point").unwrap_err();
    match err {
        ArchiveError::UnknownType { hierarchy, .. } => assert_eq!(hierarchy, "shapes.Point"),
        other => panic!("unexpected error: {other}"),
    }
}
