//! Simulation results: a list of (x, y) graphs.

use std::any::Any;

use crate::serial::{
    ArchiveError, ReadArchive, Serializable, WriteArchive, read_class, write_class,
};

pub type Graph = Vec<(f64, f64)>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationResult {
    graphs: Vec<Graph>,
}

impl SimulationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, graph: Graph) {
        self.graphs.push(graph);
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }
}

impl Serializable for SimulationResult {
    fn hierarchy(&self) -> String {
        "simulation.SimulationResult".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(SimulationResult::new())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "SimulationResult", |body| {
            body.write_i32("Graphs", self.graphs.len() as i32)?;
            for graph in &self.graphs {
                body.write_i32("Points", graph.len() as i32)?;
                for &(x, y) in graph {
                    body.write_f32("X", x as f32)?;
                    body.write_f32("Y", y as f32)?;
                }
            }
            Ok(())
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "SimulationResult", |body| {
            let graphs = body.read_i32("Graphs")?;
            if graphs < 0 {
                return Err(ArchiveError::NegativeLength {
                    name: "Graphs".to_string(),
                    length: graphs,
                });
            }
            for _ in 0..graphs {
                let points = body.read_i32("Points")?;
                if points < 0 {
                    return Err(ArchiveError::NegativeLength {
                        name: "Points".to_string(),
                        length: points,
                    });
                }
                let mut graph = Graph::with_capacity(points as usize);
                for _ in 0..points {
                    let x = body.read_f32("X")? as f64;
                    let y = body.read_f32("Y")? as f64;
                    graph.push((x, y));
                }
                self.graphs.push(graph);
            }
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::net::Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::simulation::SimulationRequest>, Box<dyn Serializable>> {
        Err(self)
    }
}
