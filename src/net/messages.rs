//! Wire messages of the simulation protocol.

use std::any::Any;

use crate::serial::{
    ArchiveError, ReadArchive, Serializable, WriteArchive, read_class, write_class,
};
use crate::simulation::SimulationResult;

use super::connection::Connection;
use super::message::Message;

/// Frames a top-level message for the wire: the leading 4 bytes of the
/// returned buffer are the size prefix the receiver parses first.
pub fn encode_message(message: &dyn Serializable) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = WriteArchive::new();
    archive.write_object("message", Some(message))?;
    Ok(archive.into_bytes())
}

/// Client request: either submit the carried simulation or stop the running
/// one.
#[derive(Default)]
pub struct SimulationRequestMessage {
    stop_requested: bool,
    request: Option<Box<dyn Serializable>>,
}

impl SimulationRequestMessage {
    pub fn request(request: Box<dyn Serializable>) -> Self {
        Self {
            stop_requested: false,
            request: Some(request),
        }
    }

    pub fn stop() -> Self {
        Self {
            stop_requested: true,
            request: None,
        }
    }
}

impl Serializable for SimulationRequestMessage {
    fn hierarchy(&self) -> String {
        "net.SimulationRequestMessage".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(SimulationRequestMessage::default())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "SimulationRequestMessage", |body| {
            body.write_bool("StopRequested", self.stop_requested)?;
            body.write_object("Request", self.request.as_deref())
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "SimulationRequestMessage", |body| {
            self.stop_requested = body.read_bool("StopRequested")?;
            self.request = body.read_object("Request")?;
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(self: Box<Self>) -> Result<Box<dyn Message>, Box<dyn Serializable>> {
        Ok(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}

impl Message for SimulationRequestMessage {
    fn execute(self: Box<Self>, connection: &Connection) {
        let engine = connection.engine();
        if self.stop_requested {
            engine.request_simulation_stop();
            return;
        }

        let Some(request) = self.request else {
            tracing::warn!("{}: simulation request carries no payload", connection.name());
            return;
        };
        match request.into_simulation() {
            Ok(request) => engine.request_simulation(request),
            Err(other) => tracing::warn!(
                "{}: not a runnable simulation: {}",
                connection.name(),
                other.hierarchy()
            ),
        }
    }
}

/// Server reply: progress countdown, with the result attached on the
/// terminal update.
#[derive(Clone, Default)]
pub struct SimulationResultMessage {
    percent_remaining: f64,
    result: Option<SimulationResult>,
}

impl SimulationResultMessage {
    pub fn new(percent_remaining: f64, result: Option<SimulationResult>) -> Self {
        Self {
            percent_remaining,
            result,
        }
    }

    pub fn percent_remaining(&self) -> f64 {
        self.percent_remaining
    }

    pub fn result(&self) -> Option<&SimulationResult> {
        self.result.as_ref()
    }
}

impl Serializable for SimulationResultMessage {
    fn hierarchy(&self) -> String {
        "net.SimulationResultMessage".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(SimulationResultMessage::default())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "SimulationResultMessage", |body| {
            body.write_f32("PercentRemaining", self.percent_remaining as f32)?;
            body.write_object(
                "Result",
                self.result.as_ref().map(|r| r as &dyn Serializable),
            )
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "SimulationResultMessage", |body| {
            self.percent_remaining = body.read_f32("PercentRemaining")? as f64;
            self.result = body
                .read_object("Result")?
                .and_then(|object| object.as_any().downcast_ref::<SimulationResult>().cloned());
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(self: Box<Self>) -> Result<Box<dyn Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::ObjectFactory;
    use crate::simulation::BlackScholes;

    fn factory() -> ObjectFactory {
        let mut factory = ObjectFactory::new();
        factory.register(Box::new(SimulationRequestMessage::default()));
        factory.register(Box::new(SimulationResultMessage::default()));
        factory.register(Box::new(SimulationResult::new()));
        factory.register(Box::new(BlackScholes::new()));
        factory
    }

    #[test]
    fn request_message_round_trips_its_payload() {
        let mut option = BlackScholes::new();
        option.is_call = true;
        option.spot_price = 100.0;
        option.strike_price = 95.0;
        option.simulations_count = 500;
        option.pricing_model = crate::simulation::MODEL_BLACK_SCHOLES_SPOT;

        let message = SimulationRequestMessage::request(Box::new(option));
        let bytes = encode_message(&message).unwrap();

        let factory = factory();
        let mut reader = ReadArchive::with_factory(&factory, &bytes);
        let decoded = reader.read_object("message").unwrap().unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<SimulationRequestMessage>()
            .unwrap();
        assert!(!decoded.stop_requested);

        let request = decoded.request.as_ref().unwrap();
        let request = request.as_any().downcast_ref::<BlackScholes>().unwrap();
        assert!(request.is_call);
        assert_eq!(request.spot_price, 100.0);
        assert_eq!(request.strike_price, 95.0);
        assert_eq!(request.simulations_count, 500);
    }

    #[test]
    fn stop_message_carries_no_request() {
        let bytes = encode_message(&SimulationRequestMessage::stop()).unwrap();

        let factory = factory();
        let mut reader = ReadArchive::with_factory(&factory, &bytes);
        let decoded = reader.read_object("message").unwrap().unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<SimulationRequestMessage>()
            .unwrap();
        assert!(decoded.stop_requested);
        assert!(decoded.request.is_none());
    }

    #[test]
    fn result_message_round_trips() {
        let mut result = SimulationResult::new();
        result.add(vec![(1.0, 2.0), (3.0, 4.0)]);
        let message = SimulationResultMessage::new(0.25, Some(result.clone()));
        let bytes = encode_message(&message).unwrap();

        let factory = factory();
        let mut reader = ReadArchive::with_factory(&factory, &bytes);
        let decoded = reader.read_object("message").unwrap().unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<SimulationResultMessage>()
            .unwrap();
        assert_eq!(decoded.percent_remaining(), 0.25);
        assert_eq!(decoded.result(), Some(&result));
    }

    #[test]
    fn null_result_decodes_as_none() {
        let message = SimulationResultMessage::new(0.5, None);
        let bytes = encode_message(&message).unwrap();

        let factory = factory();
        let mut reader = ReadArchive::with_factory(&factory, &bytes);
        let decoded = reader.read_object("message").unwrap().unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<SimulationResultMessage>()
            .unwrap();
        assert!(decoded.result().is_none());
    }
}
