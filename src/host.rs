//! Host board boundary.
//!
//! The host applies commands one at a time and may refuse any of them. Its
//! failures are collected verbatim; nothing here tries to interpret them.

use std::convert::Infallible;
use std::fmt;

use kbplacer_route::NetConnection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::report::{PlacementCommand, Report};

pub trait BoardSink {
    type Error: fmt::Display;

    fn apply_footprint(&mut self, command: &PlacementCommand) -> Result<(), Self::Error>;
    fn apply_connection(&mut self, connection: &NetConnection) -> Result<(), Self::Error>;
}

/// A command the host rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostFailure {
    /// Footprint reference, or `NET FROM->TO` for a connection.
    pub item: String,
    pub message: String,
}

/// Apply every placement, then every connection. One rejected command never
/// stops the rest.
pub fn apply_report<S: BoardSink>(report: &Report, sink: &mut S) -> Vec<HostFailure> {
    let mut failures = Vec::new();
    for command in &report.placements {
        if let Err(err) = sink.apply_footprint(command) {
            warn!(reference = %command.reference, %err, "host rejected footprint");
            failures.push(HostFailure {
                item: command.reference.clone(),
                message: err.to_string(),
            });
        }
    }
    for connection in &report.connections {
        if let Err(err) = sink.apply_connection(connection) {
            let item = format!("{} {}->{}", connection.net, connection.from, connection.to);
            warn!(%item, %err, "host rejected connection");
            failures.push(HostFailure {
                item,
                message: err.to_string(),
            });
        }
    }
    debug!(failures = failures.len(), "report applied");
    failures
}

/// Sink that only remembers what it was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    pub footprints: Vec<PlacementCommand>,
    pub connections: Vec<NetConnection>,
}

impl BoardSink for RecordingSink {
    type Error = Infallible;

    fn apply_footprint(&mut self, command: &PlacementCommand) -> Result<(), Self::Error> {
        self.footprints.push(command.clone());
        Ok(())
    }

    fn apply_connection(&mut self, connection: &NetConnection) -> Result<(), Self::Error> {
        self.connections.push(connection.clone());
        Ok(())
    }
}
