//! Message Module Tests
//!
//! ## Test Scopes
//! - **Decoding**: Each wire tag decodes to its own variant.
//! - **Rejection**: Non-objects, missing/unknown tags and malformed bodies fail with
//!   a distinct error and never produce an envelope.
//! - **Types**: Request ids, roles and kind tags.

#[cfg(test)]
mod tests {
    use crate::messages::*;
    use serde_json::json;

    fn decode_value(value: serde_json::Value) -> Result<Envelope, DecodeError> {
        decode(value.to_string().as_bytes())
    }

    // ============================================================
    // DECODING
    // ============================================================

    #[test]
    fn test_decode_execute() {
        let envelope = decode_value(json!({
            "type": "execute",
            "function_id": "f1",
            "method": "run"
        }))
        .unwrap();

        assert_eq!(
            envelope,
            Envelope::Execute(Execute {
                function_id: "f1".to_string(),
                method: "run".to_string(),
                request_id: None,
            })
        );
        assert_eq!(envelope.kind(), MessageKind::Execute);
    }

    #[test]
    fn test_decode_execute_response() {
        let envelope = decode_value(json!({
            "type": "execute_response",
            "request_id": "req-1",
            "code": 0,
            "result": "ok"
        }))
        .unwrap();

        match envelope {
            Envelope::ExecuteResponse(response) => {
                assert_eq!(response.request_id, RequestId::from("req-1"));
                assert_eq!(response.code, codes::OK);
                assert_eq!(response.result, "ok");
            }
            other => panic!("Expected execute_response, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_roll_call_without_fields() {
        let envelope = decode_value(json!({"type": "roll_call"})).unwrap();

        assert_eq!(envelope, Envelope::RollCall(RollCall::default()));
    }

    #[test]
    fn test_decode_roll_call_response_role() {
        let envelope = decode_value(json!({
            "type": "roll_call_response",
            "code": 0,
            "role": "worker",
            "request_id": "req-7"
        }))
        .unwrap();

        match envelope {
            Envelope::RollCallResponse(response) => {
                assert_eq!(response.role, Role::Worker);
                assert_eq!(response.request_id, Some(RequestId::from("req-7")));
                assert!(response.function_id.is_empty());
            }
            other => panic!("Expected roll_call_response, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_health_ping_and_install() {
        let ping = decode_value(json!({"type": "health_ping", "code": 0})).unwrap();
        assert_eq!(ping.kind(), MessageKind::HealthPing);

        let install = decode_value(json!({
            "type": "install_function",
            "manifest_url": "http://example.invalid/f1.json"
        }))
        .unwrap();
        assert_eq!(
            install,
            Envelope::InstallFunction(InstallFunction {
                manifest_url: "http://example.invalid/f1.json".to_string()
            })
        );
    }

    #[test]
    fn test_encoded_envelope_carries_type_tag() {
        let bytes = encode(&Envelope::HealthPing(HealthPing { code: codes::OK })).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "health_ping");
        assert_eq!(value["code"], 0);
    }

    #[test]
    fn test_encode_omits_absent_correlation_fields() {
        let bytes = encode(&Envelope::RollCall(RollCall::default())).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value, json!({"type": "roll_call"}));
    }

    #[test]
    fn test_execute_survives_encode_decode() {
        let original = Envelope::Execute(Execute {
            function_id: "f1".to_string(),
            method: "run".to_string(),
            request_id: Some(RequestId::from("req-42")),
        });

        let decoded = decode(&encode(&original).unwrap()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_every_kind_survives_encode_decode_with_empty_strings() {
        let envelopes = vec![
            Envelope::HealthPing(HealthPing { code: codes::OK }),
            Envelope::Execute(Execute {
                function_id: String::new(),
                method: String::new(),
                request_id: None,
            }),
            Envelope::ExecuteResponse(ExecuteResponse {
                request_id: RequestId::from(""),
                code: codes::EXECUTION_FAILED,
                result: String::new(),
            }),
            Envelope::RollCall(RollCall::default()),
            Envelope::RollCallResponse(RollCallResponse {
                code: codes::OK,
                role: Role::Head,
                request_id: None,
                function_id: String::new(),
            }),
            Envelope::InstallFunction(InstallFunction {
                manifest_url: String::new(),
            }),
        ];

        for original in envelopes {
            let bytes = encode(&original).unwrap();
            assert_eq!(decode(&bytes).unwrap(), original);
            // Deterministic encoding.
            assert_eq!(encode(&original).unwrap(), bytes);
        }
    }

    // ============================================================
    // REJECTION
    // ============================================================

    #[test]
    fn test_decode_rejects_invalid_json() {
        let result = decode(b"{not json");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode_value(json!(["execute"])),
            Err(DecodeError::NotAnObject)
        ));
        assert!(matches!(
            decode_value(json!("execute")),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        let result = decode_value(json!({"function_id": "f1", "method": "run"}));
        assert!(matches!(result, Err(DecodeError::MissingType)));
    }

    #[test]
    fn test_decode_rejects_non_string_type() {
        let result = decode_value(json!({"type": 7}));
        assert!(matches!(result, Err(DecodeError::InvalidType)));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let result = decode_value(json!({"type": "shutdown_everything"}));

        match result {
            Err(DecodeError::UnknownType(tag)) => assert_eq!(tag, "shutdown_everything"),
            other => panic!("Expected UnknownType, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        // Known tag, wrong shape: execute without a method.
        let result = decode_value(json!({"type": "execute", "function_id": "f1"}));

        match result {
            Err(DecodeError::Malformed { kind, .. }) => assert_eq!(kind, MessageKind::Execute),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_field_type() {
        let result = decode_value(json!({"type": "health_ping", "code": "zero"}));
        assert!(matches!(
            result,
            Err(DecodeError::Malformed {
                kind: MessageKind::HealthPing,
                ..
            })
        ));
    }

    // ============================================================
    // TYPES
    // ============================================================

    #[test]
    fn test_request_id_is_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_kind_tags_are_unique_and_resolvable() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_tag("Execute"), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("head".parse::<Role>(), Ok(Role::Head));
        assert_eq!(" Worker ".parse::<Role>(), Ok(Role::Worker));
        assert!("leader".parse::<Role>().is_err());
        assert_eq!(Role::Head.to_string(), "head");
    }
}
