// SPDX-License-Identifier: MIT OR Apache-2.0
use zt_core::{
    ActionRef, AuthorizationModel, AuthorizationRequest, CodeTypeId, EntityRef, Oid,
    PolicyStoreRef,
};

#[test]
fn oid_round_trips_through_json() {
    let oid = Oid::of(b"tests/contract_types");
    let json = serde_json::to_string(&oid).unwrap();
    let back: Oid = serde_json::from_str(&json).unwrap();
    assert_eq!(oid, back);
}

#[test]
fn authorization_request_round_trips_through_json() {
    let req = AuthorizationRequest {
        authorization_model: AuthorizationModel {
            zone_id: 42,
            policy_store: PolicyStoreRef {
                kind: Some("ledger".into()),
                id: "ledger-1".into(),
            },
            principal: None,
            entities: None,
        },
        subject: Some(EntityRef {
            entity_type: "User".into(),
            id: "alice".into(),
            source: None,
            properties: serde_json::Value::Null,
        }),
        resource: Some(EntityRef {
            entity_type: "Document".into(),
            id: "doc-1".into(),
            source: None,
            properties: serde_json::Value::Null,
        }),
        action: Some(ActionRef {
            name: "view".into(),
            properties: serde_json::Value::Null,
        }),
        context: serde_json::Value::Null,
        evaluations: vec![],
    };

    let json = serde_json::to_string(&req).unwrap();
    let back: AuthorizationRequest = serde_json::from_str(&json).unwrap();
    let expanded = back.expand();
    assert_eq!(expanded.len(), 1);
    assert_eq!(expanded[0].subject.id, "alice");
    assert_eq!(expanded[0].resource.id, "doc-1");
    assert_eq!(expanded[0].action.name, "view");
}

#[test]
fn code_type_id_covers_every_spec_value() {
    for (v, expected) in [
        (1u16, CodeTypeId::Schema),
        (2, CodeTypeId::Policy),
        (10, CodeTypeId::Commit),
        (11, CodeTypeId::Tree),
        (20, CodeTypeId::RawBlob),
    ] {
        assert_eq!(CodeTypeId::from_u16(v).unwrap(), expected);
    }
    assert!(CodeTypeId::from_u16(3).is_err());
    assert!(CodeTypeId::from_u16(0).is_err());
}
