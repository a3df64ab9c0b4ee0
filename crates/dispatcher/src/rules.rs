//! Ordered predicate tables
//!
//! A table is evaluated top to bottom and the first matching rule wins. Each
//! rule names one or more targets (multicast); a target may carry its own
//! guard, evaluated after the rule matched (binary archival is the case in
//! point).

use std::fmt;

use contracts::{DeliveryMessage, Destination, EventRecord, RouteId, RoutingFacts};

/// Branch condition over routing facts
pub type Predicate = fn(&RoutingFacts) -> bool;

/// One destination selected by a rule
#[derive(Clone)]
pub struct Target {
    pub destination: Destination,
    pub guard: Option<Predicate>,
}

impl Target {
    pub fn to(destination: Destination) -> Self {
        Self {
            destination,
            guard: None,
        }
    }

    /// Only deliver when `guard` holds
    pub fn when(destination: Destination, guard: Predicate) -> Self {
        Self {
            destination,
            guard: Some(guard),
        }
    }

    fn admits(&self, facts: &RoutingFacts) -> bool {
        self.guard.is_none_or(|guard| guard(facts))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("destination", &self.destination)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// `(predicate, targets)` pair
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: Predicate,
    pub targets: Vec<Target>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("targets", &self.targets)
            .finish()
    }
}

/// Result of evaluating a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Name of the matching rule, `otherwise` for the fallback
    pub rule: &'static str,
    pub destinations: Vec<Destination>,
}

/// First-match-wins rule table
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: Vec<Target>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; earlier rules take precedence
    pub fn rule(mut self, name: &'static str, predicate: Predicate, targets: Vec<Target>) -> Self {
        self.rules.push(Rule {
            name,
            predicate,
            targets,
        });
        self
    }

    /// Targets used when no rule matches (default: none)
    pub fn otherwise(mut self, targets: Vec<Target>) -> Self {
        self.fallback = targets;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every destination the table can ever select
    pub fn destinations(&self) -> Vec<Destination> {
        let mut all: Vec<Destination> = self
            .rules
            .iter()
            .flat_map(|r| r.targets.iter())
            .chain(self.fallback.iter())
            .map(|t| t.destination.clone())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    /// Evaluate the table for `facts`
    pub fn select(&self, facts: &RoutingFacts) -> Selection {
        let (rule, targets) = self
            .rules
            .iter()
            .find(|r| (r.predicate)(facts))
            .map(|r| (r.name, r.targets.as_slice()))
            .unwrap_or(("otherwise", self.fallback.as_slice()));

        Selection {
            rule,
            destinations: targets
                .iter()
                .filter(|t| t.admits(facts))
                .map(|t| t.destination.clone())
                .collect(),
        }
    }
}

/// Apply the exclusion filter, then the table.
///
/// Excluded resources yield no destinations; this is a normal outcome, not
/// an error.
pub fn dispatch(
    route_id: RouteId,
    record: &EventRecord,
    facts: &RoutingFacts,
    rules: &RuleTable,
) -> Vec<(Destination, DeliveryMessage)> {
    if facts.is_under_excluded_container {
        return Vec::new();
    }

    rules
        .select(facts)
        .destinations
        .into_iter()
        .map(|destination| {
            let message = DeliveryMessage::from_record(route_id, destination.clone(), record);
            (destination, message)
        })
        .collect()
}
