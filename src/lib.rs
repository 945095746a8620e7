//! Junction Rules Library
//!
//! Classifies road junctions and propagates priority signs, lane arrows and
//! lane connections across a road network. The engine works on any host that
//! implements the network and rule sink traits; an in-memory host is included.

pub mod network;
