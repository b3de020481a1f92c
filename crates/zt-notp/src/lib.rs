// SPDX-License-Identifier: MIT OR Apache-2.0
//! NOTP (Nitro Object Transfer Protocol): a symmetric, bidirectional, framed
//! protocol for synchronizing content-addressed object stores between a
//! Leader (source of truth) and a Follower (catching up) over any
//! full-duplex byte transport (`spec.md` §4.3, L4-L5).
//!
//! Layering within this crate:
//! - [`frame`] — the wire frame: magic/version/kind/flags/streamID/packetID/length.
//! - [`packet`] — typed packet bodies (Hello, RefAdvertise, ObjectData, ...).
//! - [`transport`] — the pluggable [`transport::Transport`] trait the FSMs are generic over.
//! - [`closure`] — the reachable-OID-closure walk used by both roles.
//! - [`handler`] — the host-callback contract ([`handler::HostHandler`]) for per-state side effects.
//! - [`fsm`] — [`fsm::run_leader`] and [`fsm::run_follower`], the state machines themselves.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Reachable-OID-closure walk shared by both roles.
pub mod closure;
/// NOTP wire frame codec.
pub mod frame;
/// Leader/Follower state machines.
pub mod fsm;
/// Host handler contract and bag type.
pub mod handler;
/// Typed packet bodies.
pub mod packet;
/// Pluggable transport trait and reference implementation.
pub mod transport;

pub use closure::{missing_from, reachable_closure};
pub use frame::{Frame, FrameError, FrameFlags, PacketKind};
pub use fsm::{run_follower, run_leader, Flow, FollowerOutcome, LeaderOutcome, NotpError, NotpState};
pub use handler::{Bag, HandlerOutcome, HostHandler, NoopHandler};
pub use transport::{ChannelTransport, Transport, TransportError, DEFAULT_TIMEOUT};
