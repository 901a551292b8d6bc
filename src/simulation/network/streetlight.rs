use crate::simulation::error::{Result, SimError};
use crate::simulation::id::{Id, IdStore};
use crate::simulation::io::streetlights::IOStreetlight;
use crate::simulation::network::{Link, Network};

#[derive(Debug)]
pub struct Streetlight {
    pub id: Id<Streetlight>,
    pub link: Id<Link>,
    /// Relative position along the road in [0, 1], if the input provides one.
    pub position: Option<f64>,
}

/// The streetlights of a city. Every light is attached to a road of the network it was
/// created with; this is checked once when the list is built.
#[derive(Debug, Default)]
pub struct Streetlights {
    pub ids: IdStore<Streetlight>,
    pub lights: Vec<Streetlight>,
}

impl Streetlights {
    pub fn from_io(network: &Network, io_lights: Vec<IOStreetlight>) -> Result<Self> {
        let mut result = Streetlights::default();
        for (index, io_light) in io_lights.into_iter().enumerate() {
            let link = Self::find_link(network, &io_light.from, &io_light.to)?;
            if let Some(position) = io_light.position {
                if !(0. ..=1.).contains(&position) {
                    return Err(SimError::InvalidGraph(format!(
                        "Streetlight #{} on {} -> {} has position {position} outside [0, 1]",
                        index + 1,
                        io_light.from,
                        io_light.to
                    )));
                }
            }
            result.add(link, io_light.position);
        }
        Ok(result)
    }

    fn find_link(network: &Network, from: &str, to: &str) -> Result<Id<Link>> {
        let link = network
            .find_node(from)
            .zip(network.find_node(to))
            .and_then(|(f, t)| network.link_between(f, t));
        match link {
            Some(l) => Ok(l.id),
            None => Err(SimError::InvalidGraph(format!(
                "Streetlight references road {from} -> {to}, which is not part of the graph"
            ))),
        }
    }

    pub fn add(&mut self, link: Id<Link>, position: Option<f64>) -> Id<Streetlight> {
        let external = format!("sl_{:05}", self.lights.len() + 1);
        let (id, _) = self.ids.create_id(&external);
        self.lights.push(Streetlight { id, link, position });
        id
    }

    pub fn name(&self, id: Id<Streetlight>) -> &str {
        self.ids.external(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Streetlight> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
