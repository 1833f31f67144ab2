/*!
The catalogue owns every stop and bus of the network together with the road
distances between stop pairs.

Storage is append-only: stops and buses live in plain vectors and every
cross-reference is a [`StopId`] / [`BusId`] index into them, so handles stay
valid for the lifetime of the catalogue and serialize as bare integers.

# Structs
- `Catalogue`: the arena plus name and stop-to-bus indexes.
- `Stop`: a named geographic point.
- `Bus`: a named line with its raw and expanded routes and cached statistics.
- `BusStat`: per-bus statistics derived once at insertion.
*/

use geo::Point;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::sphere;
use crate::Error;

/// Index of a stop inside [`Catalogue::stops`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StopId(pub u32);

/// Index of a bus inside [`Catalogue::buses`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BusId(pub u32);

impl StopId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BusId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named geographic point served by zero or more buses.
///
/// `location` is a [`geo::Point`] with `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    pub location: Point<f64>,
}

/// Statistics of a bus over its expanded route, computed once in
/// [`Catalogue::add_bus`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusStat {
    pub stop_count: usize,
    pub unique_stops: usize,
    pub road_length: f64,
    pub curvature: f64,
}

/// A bus line.
///
/// `raw_route` is the stop sequence as provided. `route` is the expanded
/// sequence actually driven: identical to `raw_route` for roundtrip buses,
/// `raw_route` followed by its reverse minus the duplicated pivot otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub name: String,
    pub raw_route: Vec<StopId>,
    pub route: Vec<StopId>,
    pub terminal: StopId,
    pub is_roundtrip: bool,
    pub stat: BusStat,
}

#[derive(Debug, Default)]
pub struct Catalogue {
    stops: Vec<Stop>,
    buses: Vec<Bus>,
    stop_index: HashMap<String, StopId>,
    bus_index: HashMap<String, BusId>,
    stop_to_buses: Vec<HashSet<BusId>>,
    distances: HashMap<(StopId, StopId), f64>,
}

impl Catalogue {
    /// Registers a stop under a previously unseen name.
    pub fn add_stop(&mut self, name: &str, latitude: f64, longitude: f64) -> Result<StopId, Error> {
        if self.stop_index.contains_key(name) {
            return Err(Error::DuplicateStop(name.to_owned()));
        }

        let id = StopId(self.stops.len() as u32);
        self.stops.push(Stop {
            name: name.to_owned(),
            location: Point::new(longitude, latitude),
        });
        self.stop_index.insert(name.to_owned(), id);
        self.stop_to_buses.push(HashSet::new());

        Ok(id)
    }

    /// Registers the directed road distance in metres between two stops.
    pub fn set_distance(&mut self, from: StopId, to: StopId, metres: f64) {
        self.distances.insert((from, to), metres);
    }

    /// Road distance between two stops.
    ///
    /// Falls back to the opposite direction when only that one was recorded.
    pub fn distance(&self, from: StopId, to: StopId) -> Result<f64, Error> {
        self.distances
            .get(&(from, to))
            .or_else(|| self.distances.get(&(to, from)))
            .copied()
            .ok_or_else(|| {
                Error::UnknownDistance(
                    self.stops[from.index()].name.clone(),
                    self.stops[to.index()].name.clone(),
                )
            })
    }

    /// Registers a bus line over already registered stops.
    ///
    /// Expands the route, derives [`BusStat`] and updates the stop-to-bus
    /// index. Every consecutive stop pair of the expanded route must have a
    /// road distance.
    pub fn add_bus(
        &mut self,
        name: &str,
        raw_route: Vec<StopId>,
        is_roundtrip: bool,
    ) -> Result<BusId, Error> {
        let Some(&terminal) = raw_route.last() else {
            return Err(Error::EmptyRoute(name.to_owned()));
        };

        let mut route = raw_route.clone();
        if !is_roundtrip {
            route.extend(raw_route.iter().rev().skip(1));
        }

        let mut road_length = 0.0;
        let mut great_circle = 0.0;
        for (&from, &to) in route.iter().tuple_windows() {
            road_length += self.distance(from, to)?;
            great_circle += sphere::distance(
                self.stops[from.index()].location,
                self.stops[to.index()].location,
            );
        }

        let stat = BusStat {
            stop_count: route.len(),
            unique_stops: route.iter().collect::<HashSet<_>>().len(),
            road_length,
            curvature: road_length / great_circle,
        };

        let id = BusId(self.buses.len() as u32);
        for &stop in &route {
            self.stop_to_buses[stop.index()].insert(id);
        }
        self.bus_index.insert(name.to_owned(), id);
        self.buses.push(Bus {
            name: name.to_owned(),
            raw_route,
            route,
            terminal,
            is_roundtrip,
            stat,
        });

        Ok(id)
    }

    #[must_use]
    pub fn find_stop(&self, name: &str) -> Option<StopId> {
        self.stop_index.get(name).copied()
    }

    #[must_use]
    pub fn find_bus(&self, name: &str) -> Option<BusId> {
        self.bus_index.get(name).copied()
    }

    #[must_use]
    pub fn stop(&self, id: StopId) -> &Stop {
        &self.stops[id.index()]
    }

    #[must_use]
    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id.index()]
    }

    /// All stops in insertion order.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// All buses in insertion order.
    #[must_use]
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    /// Names of the buses serving a stop, sorted lexicographically.
    pub fn buses_for_stop(&self, name: &str) -> Result<Vec<&str>, Error> {
        let id = self
            .find_stop(name)
            .ok_or_else(|| Error::UnknownStop(name.to_owned()))?;

        let mut names: Vec<&str> = self.stop_to_buses[id.index()]
            .iter()
            .map(|bus| self.buses[bus.index()].name.as_str())
            .collect();
        names.sort_unstable();

        Ok(names)
    }

    /// Whether at least one bus passes through the stop.
    #[must_use]
    pub fn stop_served(&self, id: StopId) -> bool {
        !self.stop_to_buses[id.index()].is_empty()
    }

    /// All recorded road distances, in unspecified order.
    pub fn distances(&self) -> impl Iterator<Item = (StopId, StopId, f64)> + '_ {
        self.distances
            .iter()
            .map(|(&(from, to), &metres)| (from, to, metres))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stops() -> (Catalogue, StopId, StopId) {
        let mut catalogue = Catalogue::default();
        let a = catalogue.add_stop("Universam", 55.611087, 37.208290).unwrap();
        let b = catalogue.add_stop("Prazhskaya", 55.595884, 37.209755).unwrap();
        (catalogue, a, b)
    }

    #[test]
    fn duplicate_stop_is_rejected() {
        let (mut catalogue, _, _) = two_stops();

        assert!(matches!(
            catalogue.add_stop("Universam", 0.0, 0.0),
            Err(Error::DuplicateStop(name)) if name == "Universam"
        ));
    }

    #[test]
    fn distance_falls_back_to_reverse_direction() {
        let (mut catalogue, a, b) = two_stops();
        catalogue.set_distance(a, b, 3900.0);

        assert_eq!(catalogue.distance(a, b).unwrap(), 3900.0);
        assert_eq!(catalogue.distance(b, a).unwrap(), 3900.0);

        catalogue.set_distance(b, a, 4100.0);
        assert_eq!(catalogue.distance(b, a).unwrap(), 4100.0);
        assert_eq!(catalogue.distance(a, b).unwrap(), 3900.0);
    }

    #[test]
    fn missing_distance_is_an_error() {
        let (catalogue, a, b) = two_stops();

        assert!(matches!(
            catalogue.distance(a, b),
            Err(Error::UnknownDistance(_, _))
        ));
    }

    #[test]
    fn roundtrip_bus_stat() {
        let (mut catalogue, a, b) = two_stops();
        catalogue.set_distance(a, b, 3900.0);
        catalogue.set_distance(b, a, 3900.0);
        let bus = catalogue.add_bus("256", vec![a, b, a], true).unwrap();

        let stat = catalogue.bus(bus).stat;
        assert_eq!(stat.stop_count, 3);
        assert_eq!(stat.unique_stops, 2);
        assert!(approx::abs_diff_eq!(stat.road_length, 7800.0));
        // Great-circle length of the loop is about 2 * 1693 m.
        assert!(approx::abs_diff_eq!(stat.curvature, 2.3036, epsilon = 5e-3));
    }

    #[test]
    fn linear_bus_route_is_expanded() {
        let mut catalogue = Catalogue::default();
        let t = catalogue
            .add_stop("Tolstopaltsevo", 55.611087, 37.208290)
            .unwrap();
        let m = catalogue
            .add_stop("Marushkino", 55.595884, 37.209755)
            .unwrap();
        let r = catalogue
            .add_stop("Rasskazovka", 55.632761, 37.333324)
            .unwrap();
        catalogue.set_distance(t, m, 2600.0);
        catalogue.set_distance(m, r, 1950.0);

        let bus = catalogue.add_bus("750", vec![t, m, r], false).unwrap();

        let bus = catalogue.bus(bus);
        assert_eq!(bus.route, vec![t, m, r, m, t]);
        assert_eq!(bus.terminal, r);
        assert_eq!(bus.stat.stop_count, 5);
        assert_eq!(bus.stat.unique_stops, 3);
        assert!(approx::abs_diff_eq!(bus.stat.road_length, 9100.0));
    }

    #[test]
    fn empty_route_is_rejected() {
        let mut catalogue = Catalogue::default();

        assert!(matches!(
            catalogue.add_bus("777", Vec::new(), true),
            Err(Error::EmptyRoute(name)) if name == "777"
        ));
    }

    #[test]
    fn buses_for_stop_are_sorted_by_name() {
        let (mut catalogue, a, b) = two_stops();
        catalogue.set_distance(a, b, 3900.0);
        catalogue.add_bus("828", vec![a, b, a], true).unwrap();
        catalogue.add_bus("256", vec![a, b, a], true).unwrap();

        assert_eq!(catalogue.buses_for_stop("Universam").unwrap(), ["256", "828"]);
        assert!(matches!(
            catalogue.buses_for_stop("Nowhere"),
            Err(Error::UnknownStop(_))
        ));
    }
}
