//! Generated protobuf types for `proto/webcast.proto`, compiled by `build.rs`.

#![allow(clippy::derive_partial_eq_without_eq)]

include!(concat!(env!("OUT_DIR"), "/webcast.rs"));
