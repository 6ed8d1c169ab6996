use placeweave_common::{Direction, EcosystemId, PlaceId};
use placeweave_kernel::{Components, PlaceGraph};
use std::collections::BTreeMap;
use std::fmt;

/// Read-only queries against a place graph for debugging and the CLI.
pub struct GraphInspector;

impl GraphInspector {
    /// Produce a summary of the graph.
    pub fn summary(graph: &PlaceGraph) -> GraphSummary {
        let components = Components::of(graph);
        let degrees: Vec<usize> = graph.places().iter().map(|p| p.degree()).collect();
        let exits = graph.exit_count();
        GraphSummary {
            places: graph.len(),
            exits,
            reciprocal_exits: graph.reciprocal_exit_count(),
            components: components.count(),
            largest_component: components.largest().map_or(0, |c| components.members(c).len()),
            isolated: degrees.iter().filter(|&&d| d == 0).count(),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            mean_degree: if degrees.is_empty() {
                0.0
            } else {
                exits as f64 / degrees.len() as f64
            },
        }
    }

    /// Check the structural invariants of a finished world.
    pub fn validate(graph: &PlaceGraph) -> ValidationReport {
        let components = Components::of(graph).count();
        let mut issues = Vec::new();
        if components > 1 {
            issues.push(Issue::Disconnected { components });
        }

        for place in graph.places() {
            let compass = place.compass_degree();
            if compass > 8 {
                issues.push(Issue::CompassOverflow {
                    place: place.id,
                    degree: compass,
                });
            }

            let mut targets: BTreeMap<PlaceId, Direction> = BTreeMap::new();
            for (dir, exit) in &place.exits {
                if *dir == Direction::Unknown {
                    issues.push(Issue::UnknownDirection { place: place.id });
                }
                if exit.direction != *dir {
                    issues.push(Issue::MislabelledExit {
                        place: place.id,
                        slot: *dir,
                        recorded: exit.direction,
                    });
                }
                if exit.to == place.id {
                    issues.push(Issue::SelfLoop { place: place.id });
                    continue;
                }
                if graph.get(exit.to).is_none() {
                    issues.push(Issue::Dangling {
                        place: place.id,
                        direction: *dir,
                        to: exit.to,
                    });
                    continue;
                }
                if let Some(first) = targets.insert(exit.to, *dir) {
                    issues.push(Issue::DuplicateExit {
                        place: place.id,
                        to: exit.to,
                        directions: (first, *dir),
                    });
                }
            }
        }

        for (from, direction, to) in graph.one_way_exits() {
            if graph.get(to).is_some() && from != to {
                issues.push(Issue::OneWay {
                    from,
                    direction,
                    to,
                });
            }
        }

        tracing::debug!(places = graph.len(), issues = issues.len(), "graph validated");
        ValidationReport { components, issues }
    }

    /// Number of places for each exit count.
    pub fn degree_histogram(graph: &PlaceGraph) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for place in graph.places() {
            *histogram.entry(place.degree()).or_insert(0) += 1;
        }
        histogram
    }

    /// Places and exits per ecosystem.
    pub fn ecosystem_breakdown(graph: &PlaceGraph) -> BTreeMap<EcosystemId, EcosystemTally> {
        let mut breakdown: BTreeMap<EcosystemId, EcosystemTally> = BTreeMap::new();
        for place in graph.places() {
            let tally = breakdown.entry(place.ecology.ecosystem).or_default();
            tally.places += 1;
            tally.exits += place.degree();
            tally.cross_ecosystem_exits += place
                .exits
                .values()
                .filter(|e| {
                    graph
                        .get(e.to)
                        .is_some_and(|far| far.ecology.ecosystem != place.ecology.ecosystem)
                })
                .count();
        }
        breakdown
    }
}

/// Summary of a place graph for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    pub places: usize,
    pub exits: usize,
    pub reciprocal_exits: usize,
    pub components: usize,
    pub largest_component: usize,
    pub isolated: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph: places={} exits={} reciprocal={} components={} largest={} isolated={} degree(mean={:.2}, max={})",
            self.places,
            self.exits,
            self.reciprocal_exits,
            self.components,
            self.largest_component,
            self.isolated,
            self.mean_degree,
            self.max_degree,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EcosystemTally {
    pub places: usize,
    pub exits: usize,
    /// Exits whose target lies in a different ecosystem.
    pub cross_ecosystem_exits: usize,
}

/// A single broken invariant found by [`GraphInspector::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    Disconnected {
        components: usize,
    },
    CompassOverflow {
        place: PlaceId,
        degree: usize,
    },
    UnknownDirection {
        place: PlaceId,
    },
    MislabelledExit {
        place: PlaceId,
        slot: Direction,
        recorded: Direction,
    },
    SelfLoop {
        place: PlaceId,
    },
    Dangling {
        place: PlaceId,
        direction: Direction,
        to: PlaceId,
    },
    DuplicateExit {
        place: PlaceId,
        to: PlaceId,
        directions: (Direction, Direction),
    },
    OneWay {
        from: PlaceId,
        direction: Direction,
        to: PlaceId,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Disconnected { components } => {
                write!(f, "graph splits into {components} components")
            }
            Issue::CompassOverflow { place, degree } => {
                write!(f, "{place} has {degree} compass exits")
            }
            Issue::UnknownDirection { place } => write!(f, "{place} has an unknown exit"),
            Issue::MislabelledExit {
                place,
                slot,
                recorded,
            } => write!(f, "{place} stores a {recorded} exit under {slot}"),
            Issue::SelfLoop { place } => write!(f, "{place} leads to itself"),
            Issue::Dangling {
                place,
                direction,
                to,
            } => write!(f, "{place} {direction} leads to missing {to}"),
            Issue::DuplicateExit {
                place,
                to,
                directions: (a, b),
            } => write!(f, "{place} reaches {to} both {a} and {b}"),
            Issue::OneWay {
                from,
                direction,
                to,
            } => write!(f, "{from} {direction} -> {to} has no way back"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub components: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid ({} component)", self.components);
        }
        writeln!(f, "{} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}
