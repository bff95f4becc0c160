//! Shared building blocks for the inventory server.

pub mod storage;
