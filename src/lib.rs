//! # tightbuf — semantic front end for the Tight Buffer layout DSL
//!
//! Turns the syntax tree of a packet layout schema into a validated,
//! inheritance-aware model for a code/serializer generator. No encoding or
//! decoding happens here.
//!
//! ## DSL structure
//!
//! - **Packets**: named records, optionally deriving from an earlier packet
//!   under a condition on the parent's fields
//! - **always**: a scalar (`_`, `sint` or `uint`) with a width in bits or bytes
//!   (byte order `be`/`le`) and a repetition count
//! - **optional**: fields present when a condition holds
//! - **variable**: a tagged union of `case` arms and one `otherwise` arm
//!
//! Widths, counts and condition operands may reference an earlier `always`
//! field with `&name`.
//!
//! ## Example DSL
//!
//! ```text
//! Payload {
//!   always header uint : 4 bits;
//!   always subtype uint : 4 bits;
//! }
//!
//! P2 : Payload (&header == 1) { }
//!
//! P2_generic : P2 (&subtype == 3) {
//!   always len uint : 1 bytes;
//!   variable body {
//!     case (&len < 4) |SHORT: 0| { always s uint : 2 bytes be; }
//!     otherwise |LONG: 1| { always l uint : 4 bytes be; }
//!   }
//!   optional trailer when (&len > 8) { always crc uint : 2 bytes le; }
//! }
//! ```
//!
//! ## Usage
//!
//! [`compile`] parses and builds a source; every semantic problem is collected
//! as a [`Diagnostic`] instead of stopping at the first one.

pub mod ast;
pub mod builder;
pub mod compile;
pub mod condition;
pub mod cst;
pub mod data;
pub mod diagnostics;
pub mod dump;
pub mod error;
pub mod scope;

pub use ast::{Always, Arm, Child, Field, FieldKind, Module, Optional, Packet, PacketId, Tag, Variable, Variant};
pub use builder::{build_module, BuildOptions, Builder};
pub use compile::{compile, compile_file, compile_with, Compilation};
pub use condition::{Condition, ConjOp, Expr, RelOp, Value};
pub use data::{Data, DataType, Endianness, Size, Unit, Width};
pub use diagnostics::{CountingSink, Diagnostic, DiagnosticSink, Location};
pub use dump::dump_module;
pub use error::{AstError, CompileError, Unresolved, VariantConflict};
pub use scope::{FieldRef, Scope, ScopeArena, ScopeId};
