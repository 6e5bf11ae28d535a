//! Tool definitions, one directory per toolset.
//!
//! Each toolset exposes a `handlers` function returning its tools in the
//! order they are advertised.

pub mod bilibili;
pub mod ip;
pub mod location;
pub mod notification;
pub mod power;
pub mod speed;
pub mod translate;
pub mod web;
