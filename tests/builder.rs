//! Syntax tree to model: inheritance, scoping, diagnostics and error tolerance.

use std::io::Write;

use tightbuf::{
    build_module, compile, compile_file, cst, dump_module, AstError, CountingSink, Field,
    FieldKind, Module, Packet, ScopeId, Size, Unresolved, VariantConflict,
};

const PAYLOAD: &str = r#"
// Base record: two bit-fields.
Payload {
    always header uint : 4 bits;
    always subtype uint : 4 bits;
}

P2 : Payload (&header == 1) { }

P2_generic : P2 (&subtype == 3) {
    always len uint : 1 bytes;
    variable body {
        case (&len < 4) |SHORT: 0| { always short_value uint : 2 bytes be; }
        case (&len < 8) |MEDIUM: 1| { always medium_value uint : 4 bytes be; }
        otherwise |LONG: 2| { always long_value uint : 8 bytes le; }
    }
    optional trailer when (&len > 8 && !&header) {
        always crc uint : 2 bytes;
    }
}
"#;

fn build(source: &str) -> (Module, Vec<tightbuf::Diagnostic>) {
    let tree = cst::parse(source).expect("parse");
    let mut diagnostics = Vec::new();
    let module = build_module(tree, &mut diagnostics);
    (module, diagnostics)
}

fn field<'m>(module: &'m Module, scope: ScopeId, ident: &str) -> &'m Field {
    module.scopes()[scope]
        .get(ident)
        .unwrap_or_else(|| panic!("field {} missing", ident))
}

// ==================== Round trip ====================

#[test]
fn payload_hierarchy_builds_cleanly() {
    let (m, d) = build(PAYLOAD);
    assert!(d.is_empty(), "{:?}", d);
    assert_eq!(m.len(), 3);

    let payload = m.packet_id("Payload").expect("Payload");
    let p2 = m.packet_id("P2").expect("P2");
    let generic = m.packet_id("P2_generic").expect("P2_generic");
    assert_eq!(m.ancestors(generic), vec![p2, payload]);

    let lineage: Vec<_> = m.scopes().lineage(m.packet(generic).scope()).collect();
    assert_eq!(
        lineage,
        vec![
            m.packet(generic).scope(),
            m.packet(p2).scope(),
            m.packet(payload).scope()
        ]
    );

    assert_eq!(
        m.packet(p2).condition().map(|c| c.to_string()).as_deref(),
        Some("(header == 1)")
    );
    assert_eq!(m.packet(payload).children().len(), 1);
    assert_eq!(m.packet(payload).children()[0].packet, p2);
    assert_eq!(m.packet(p2).children()[0].packet, generic);
}

#[test]
fn inheritance_condition_resolves_in_parent_scope() {
    let (m, _) = build(PAYLOAD);
    let generic = m.get("P2_generic").expect("P2_generic");
    let cond = generic.condition().expect("condition");
    let refs = cond.references();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].ident, "subtype");
    assert_eq!(refs[0].scope, m.get("Payload").expect("Payload").scope());
}

#[test]
fn variable_and_optional_structure() {
    let (m, _) = build(PAYLOAD);
    let scope = m.get("P2_generic").expect("P2_generic").scope();
    let idents: Vec<_> = m.scopes()[scope].fields().iter().map(Field::ident).collect();
    assert_eq!(idents, vec!["len", "body", "trailer"]);

    let body = field(&m, scope, "body").as_variable().expect("variable");
    let arms: Vec<_> = body
        .arms()
        .iter()
        .map(|a| (a.variant.tag.label.as_str(), a.variant.tag.value, a.condition.is_some()))
        .collect();
    assert_eq!(
        arms,
        vec![("SHORT", 0, true), ("MEDIUM", 1, true), ("LONG", 2, false)]
    );
    let expected = [("short_value", 16), ("medium_value", 32), ("long_value", 64)];
    for (arm, (ident, bits)) in body.arms().iter().zip(expected) {
        assert_eq!(m.scopes()[arm.variant.scope].parent(), Some(scope));
        let data = &field(&m, arm.variant.scope, ident).as_always().expect("always").data;
        assert_eq!(data.element_bits(), Some(bits));
    }

    let trailer = field(&m, scope, "trailer").as_optional().expect("optional");
    assert_eq!(trailer.condition.to_string(), "((len > 8) && !header)");
    assert_eq!(m.scopes()[trailer.scope].parent(), Some(scope));
    assert!(m.scopes()[trailer.scope].contains("crc"));
}

#[test]
fn separate_builders_build_equivalent_modules() {
    let (a, _) = build(PAYLOAD);
    let (b, _) = build(PAYLOAD);
    assert_eq!(dump_module(&a), dump_module(&b));
    let idents = |m: &Module| m.packets().map(|(_, p)| p.ident().to_string()).collect::<Vec<_>>();
    assert_eq!(idents(&a), idents(&b));
}

#[test]
fn size_reference_points_at_declaring_scope() {
    let (m, d) = build(
        "Base { always n uint : 1 bytes; }
         Sub : Base { optional o when (&n) { always data uint : 1 bytes : &n; } }",
    );
    assert!(d.is_empty(), "{:?}", d);
    let sub = m.get("Sub").expect("Sub").scope();
    let o = field(&m, sub, "o").as_optional().expect("optional");
    let data = &field(&m, o.scope, "data").as_always().expect("always").data;
    match &data.count {
        Size::Field(r) => assert_eq!(r.scope, m.get("Base").expect("Base").scope()),
        other => panic!("expected field count, got {:?}", other),
    }
}

// ==================== Diagnostics ====================

#[test]
fn unknown_parent_is_reported_once_and_packet_kept() {
    let (m, d) = build("Orphan : Missing (&x == 1) { always a uint : 8 bits; }");
    assert_eq!(d.len(), 1);
    assert_eq!(
        d[0].error,
        AstError::UnresolvedParent {
            packet: "Orphan".to_string(),
            parent: "Missing".to_string(),
        }
    );
    assert_eq!(d[0].location.line, 1);
    let orphan = m.get("Orphan").expect("registered");
    assert_eq!(orphan.parent(), None);
    assert!(orphan.condition().is_none());
    assert_eq!(m.scopes()[orphan.scope()].len(), 1);
}

#[test]
fn redefinitions_do_not_stop_the_walk() {
    let (m, d) = build(
        "A {
            always x uint : 1 bytes;
            always x uint : 2 bytes;
            always y uint : 1 bytes;
         }
         A { always z uint : 1 bytes; }
         B { always w uint : 1 bytes; }",
    );
    let errors: Vec<_> = d.iter().map(|d| d.error.clone()).collect();
    assert_eq!(
        errors,
        vec![
            AstError::FieldRedefinition("x".to_string()),
            AstError::PacketRedefinition("A".to_string()),
        ]
    );
    assert_eq!(d[0].location.line, 3);
    assert_eq!(m.len(), 2);
    let a = m.get("A").expect("A").scope();
    assert_eq!(m.scopes()[a].len(), 2);
    assert!(m.get("B").is_some());
}

#[test]
fn derived_packet_cannot_redeclare_parent_field() {
    let (_, d) = build("Base { always id uint : 1 bytes; } Sub : Base { always id uint : 1 bytes; }");
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].error, AstError::FieldRedefinition("id".to_string()));
}

#[test]
fn sibling_blocks_may_reuse_identifiers() {
    let (_, d) = build(
        "P {
            always k uint : 1 bytes;
            optional a when (&k == 1) { always bar uint : 1 bytes; }
            optional b when (&k == 2) { always bar uint : 1 bytes; }
            variable v {
                case (&k == 3) |X: 0| { always bar uint : 1 bytes; }
                otherwise |Y: 1| { always bar uint : 1 bytes; }
            }
         }",
    );
    assert!(d.is_empty(), "{:?}", d);
}

#[test]
fn references_into_sibling_blocks_do_not_resolve() {
    let (_, d) = build(
        "P {
            optional a when (1) { always n uint : 1 bytes; }
            always data uint : 1 bytes : &n;
         }",
    );
    assert_eq!(d.len(), 1);
    assert_eq!(
        d[0].error,
        AstError::UnresolvedReference {
            ident: "n".to_string(),
            reason: Unresolved::NotVisible,
        }
    );
}

#[test]
fn references_to_non_scalars_are_rejected() {
    let (m, d) = build(
        "P {
            variable v { otherwise |A: 0| { } }
            optional o when (&v) { always x uint : 1 bytes; }
         }",
    );
    assert_eq!(d.len(), 1);
    assert_eq!(
        d[0].error,
        AstError::UnresolvedReference {
            ident: "v".to_string(),
            reason: Unresolved::NotScalar(FieldKind::Variable),
        }
    );
    let scope = m.get("P").expect("P").scope();
    assert!(!m.scopes()[scope].contains("o"));
}

#[test]
fn unresolved_size_drops_the_field() {
    let (m, d) = build("P { always data uint : &len bytes; always next uint : 1 bytes; }");
    assert_eq!(d.len(), 1);
    let scope = m.get("P").expect("P").scope();
    assert!(!m.scopes()[scope].contains("data"));
    assert!(m.scopes()[scope].contains("next"));
}

#[test]
fn malformed_descriptor_is_reported() {
    let (m, d) = build("P { always a uint; always b sint : 2 bits; }");
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].error, AstError::MalformedDescriptor("a".to_string()));
    let scope = m.get("P").expect("P").scope();
    assert_eq!(m.scopes()[scope].len(), 1);
}

#[test]
fn variant_conflicts_are_reported_per_arm() {
    let (m, d) = build(
        "P {
            always k uint : 1 bytes;
            variable v {
                case (&k == 1) |A: 0| { }
                case (&k == 1) |B: 1| { }
                case (&k == 2) |A: 2| { }
                case (&k == 3) |C: 0| { }
                otherwise |D: 3| { }
            }
         }",
    );
    let conflicts: Vec<_> = d
        .iter()
        .map(|d| match &d.error {
            AstError::VariantRedefinition { conflict, .. } => conflict.clone(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        conflicts,
        vec![
            VariantConflict::DuplicateCondition("(k == 1)".to_string()),
            VariantConflict::DuplicateLabel("A".to_string()),
            VariantConflict::DuplicateValue(0),
        ]
    );
    let scope = m.get("P").expect("P").scope();
    let v = m.scopes()[scope].get("v").and_then(Field::as_variable).expect("v");
    assert_eq!(v.len(), 2);
}

#[test]
fn ambiguous_subtypes_are_reported() {
    let (m, d) = build(
        "Base { always t uint : 1 bytes; }
         A : Base (&t == 1) { }
         B : Base (&t == 1) { }",
    );
    assert_eq!(d.len(), 1);
    assert!(matches!(d[0].error, AstError::DispatchConflict { .. }));
    assert_eq!(m.len(), 3);
    assert_eq!(m.get("Base").map(|p| p.children().len()), Some(1));
    assert_eq!(m.get("B").and_then(Packet::parent), m.packet_id("Base"));
}

#[test]
fn unresolved_subtype_conditions_add_no_dispatch_edge() {
    let (m, d) = build("Base { } A : Base (&x == 1) { } B : Base (&y == 1) { }");
    let errors: Vec<_> = d.iter().map(|d| d.error.clone()).collect();
    assert_eq!(
        errors,
        vec![
            AstError::UnresolvedReference {
                ident: "x".to_string(),
                reason: Unresolved::NotVisible,
            },
            AstError::UnresolvedReference {
                ident: "y".to_string(),
                reason: Unresolved::NotVisible,
            },
        ]
    );
    let base = m.packet_id("Base");
    assert!(m.get("Base").expect("Base").children().is_empty());
    for ident in ["A", "B"] {
        let packet = m.get(ident).expect("registered");
        assert_eq!(packet.parent(), base);
        assert!(packet.condition().is_none());
    }
}

#[test]
fn unconditioned_subtype_still_dispatches() {
    let (m, d) = build("Base { } Sub : Base { }");
    assert!(d.is_empty(), "{:?}", d);
    let children = m.get("Base").expect("Base").children();
    assert_eq!(children.len(), 1);
    assert!(children[0].condition.is_none());
}

#[test]
fn out_of_range_literals_are_reported() {
    let (_, d) = build(
        "P {
            always a uint : 99999999999999999999 bits;
            variable v { otherwise |T: 0xFFFFFFFFFFFFFFFF| { } }
         }",
    );
    assert_eq!(d.len(), 2);
    assert!(d.iter().all(|d| matches!(d.error, AstError::IntegerOutOfRange(_))));
}

#[test]
fn counting_sink_counts() {
    let tree = cst::parse("A : X { } B : Y { }").expect("parse");
    let mut sink = CountingSink::default();
    let m = build_module(tree, &mut sink);
    assert_eq!(sink.count, 2);
    assert_eq!(m.len(), 2);
}

// ==================== Driver ====================

#[test]
fn compile_file_reads_source() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(PAYLOAD.as_bytes()).expect("write");
    let compilation = compile_file(file.path()).expect("compile");
    assert!(compilation.is_valid());
    assert_eq!(compilation.into_module().expect("module").len(), 3);
}

#[test]
fn diagnostics_render_with_location() {
    let c = compile("P {\n  always a uint;\n}").expect("syntax ok");
    assert_eq!(
        c.diagnostics[0].to_string(),
        "2:12: error: malformed descriptor for field `a`: neither width nor count given"
    );
}

#[cfg(feature = "serde")]
#[test]
fn module_serializes_to_json() {
    let c = compile(PAYLOAD).expect("compile");
    let json = serde_json::to_value(&c.module).expect("serialize");
    assert_eq!(json["packets"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["packets"][1]["ident"], "P2");
}
