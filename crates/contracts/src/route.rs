//! RouteId - the four independently enabled pipelines

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Destination, RouterError};

static INDEXING_DESTINATIONS: [Destination; 2] =
    [Destination::UPDATE_INDEX, Destination::DELETE_INDEX];
static FORWARDING_DESTINATIONS: [Destination; 1] = [Destination::FORWARD_HTTP];
static SERIALIZATION_DESTINATIONS: [Destination; 4] = [
    Destination::UPDATE_METADATA,
    Destination::UPDATE_BINARY,
    Destination::DELETE_METADATA,
    Destination::DELETE_BINARY,
];
static FIXITY_DESTINATIONS: [Destination; 2] =
    [Destination::FIXITY_SUCCESS, Destination::FIXITY_FAILURE];

/// Pipeline identifier, used as the `route_id` in logs and dead letters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteId {
    Indexing,
    Forwarding,
    Serialization,
    Fixity,
}

impl RouteId {
    pub const ALL: [RouteId; 4] = [
        RouteId::Indexing,
        RouteId::Forwarding,
        RouteId::Serialization,
        RouteId::Fixity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexing => "indexing",
            Self::Forwarding => "forwarding",
            Self::Serialization => "serialization",
            Self::Fixity => "fixity",
        }
    }

    /// Every destination the route can select
    pub fn destinations(&self) -> &'static [Destination] {
        match self {
            Self::Indexing => &INDEXING_DESTINATIONS,
            Self::Forwarding => &FORWARDING_DESTINATIONS,
            Self::Serialization => &SERIALIZATION_DESTINATIONS,
            Self::Fixity => &FIXITY_DESTINATIONS,
        }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteId {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|route| route.as_str() == s)
            .ok_or_else(|| RouterError::configuration("route", format!("unknown route '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_id() {
        assert_eq!("fixity".parse::<RouteId>().unwrap(), RouteId::Fixity);
        assert!("audit".parse::<RouteId>().is_err());
    }

    #[test]
    fn test_route_destinations() {
        assert!(RouteId::Serialization
            .destinations()
            .contains(&Destination::DELETE_BINARY));
        assert_eq!(RouteId::Forwarding.destinations(), &[Destination::FORWARD_HTTP]);
    }
}
