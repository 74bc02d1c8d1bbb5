//! Indented text rendering of a built module (one line per packet, field and arm).
//!
//! ```text
//! packet Payload
//!   always header uint : 4 bits
//! packet P2 : Payload when (header == 1)
//! ```

use crate::ast::{Field, Module, Packet};
use crate::scope::ScopeId;
use std::fmt::Write;

const INDENT: &str = "  ";

/// Render every packet of `module` in declaration order.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    for (_, packet) in module.packets() {
        dump_packet(module, packet, &mut out);
    }
    out
}

/// Header line of a packet: identifier, parent and inheritance condition.
pub fn packet_header(module: &Module, packet: &Packet) -> String {
    let mut line = format!("packet {}", packet.ident());
    if let Some(parent) = packet.parent() {
        let _ = write!(line, " : {}", module.packet(parent).ident());
    }
    if let Some(cond) = packet.condition() {
        let _ = write!(line, " when {}", cond);
    }
    line
}

fn dump_packet(module: &Module, packet: &Packet, out: &mut String) {
    out.push_str(&packet_header(module, packet));
    out.push('\n');
    dump_scope(module, packet.scope(), 1, out);
}

fn dump_scope(module: &Module, scope: ScopeId, depth: usize, out: &mut String) {
    for field in module.scopes()[scope].fields() {
        dump_field(module, field, depth, out);
    }
}

fn dump_field(module: &Module, field: &Field, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match field {
        Field::Always(a) => {
            let _ = writeln!(out, "{}always {} {}", pad, a.ident, a.data);
        }
        Field::Optional(o) => {
            let _ = writeln!(out, "{}optional {} when {}", pad, o.ident, o.condition);
            dump_scope(module, o.scope, depth + 1, out);
        }
        Field::Variable(v) => {
            let _ = writeln!(out, "{}variable {}", pad, v.ident);
            for arm in v.arms() {
                match &arm.condition {
                    Some(c) => {
                        let _ = writeln!(out, "{}{}case {} {}", pad, INDENT, c, arm.variant.tag);
                    }
                    None => {
                        let _ = writeln!(out, "{}{}otherwise {}", pad, INDENT, arm.variant.tag);
                    }
                }
                dump_scope(module, arm.variant.scope, depth + 2, out);
            }
        }
    }
}
