//! Edge case and boundary condition tests for inbound commands

use rs_loconode::{
    hal::MockDriver, parsing::AttributeError, Identity, LocoNode, MessageOutcome, NodeState,
    ParseError, RejectReason,
};

fn node() -> LocoNode<MockDriver> {
    LocoNode::new(Identity::new(42).unwrap(), MockDriver::new())
}

/// Handle `payload` on a node that is cruising, and check nothing moved.
fn assert_no_effect(payload: &[u8]) -> MessageOutcome {
    let mut node = node();
    node.handle_message(br#"<lc id="t" addr="42" dir="true" V="10" V_max="100"/>"#);
    for k in 0..5 {
        node.tick(k * 50).unwrap();
    }
    let before: NodeState = node.state();
    let power_calls = node.driver().power_calls;

    let outcome = node.handle_message(payload);
    node.tick(250).unwrap();

    assert_eq!(node.state(), before);
    assert_eq!(node.driver().power_calls, power_calls);
    outcome
}

// ============================================================================
// Malformed payloads
// ============================================================================

#[test]
fn empty_payload() {
    assert_eq!(
        assert_no_effect(b""),
        MessageOutcome::Malformed(ParseError::Empty)
    );
    assert_eq!(
        assert_no_effect(b"  \n\t"),
        MessageOutcome::Malformed(ParseError::Empty)
    );
}

#[test]
fn invalid_utf8() {
    assert_eq!(
        assert_no_effect(&[0x3c, 0xff, 0xfe, 0x3e]),
        MessageOutcome::Malformed(ParseError::InvalidUtf8)
    );
}

#[test]
fn truncated_element() {
    assert!(matches!(
        assert_no_effect(br#"<lc id="t" addr="42""#),
        MessageOutcome::Malformed(ParseError::Malformed(_))
    ));
}

#[test]
fn two_top_level_elements() {
    assert!(matches!(
        assert_no_effect(br#"<sys cmd="stop"/><sys cmd="go"/>"#),
        MessageOutcome::Malformed(ParseError::Malformed(_))
    ));
}

#[test]
fn unknown_kind() {
    assert_eq!(
        assert_no_effect(br#"<clock hour="12"/>"#),
        MessageOutcome::Rejected(RejectReason::UnknownKind("clock".into()))
    );
}

#[test]
fn nested_command_is_not_top_level() {
    assert_eq!(
        assert_no_effect(br#"<batch><sys cmd="stop"/></batch>"#),
        MessageOutcome::Rejected(RejectReason::UnknownKind("batch".into()))
    );
}

// ============================================================================
// Address filtering
// ============================================================================

#[test]
fn other_address() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="43" dir="true" V="99" V_max="100"/>"#),
        MessageOutcome::Rejected(RejectReason::AddressMismatch {
            address: 43,
            identity: 42
        })
    );
}

#[test]
fn function_for_other_address() {
    assert!(matches!(
        assert_no_effect(br#"<fn id="t" addr="41" fnchanged="1" fnchangedstate="true"/>"#),
        MessageOutcome::Rejected(RejectReason::AddressMismatch { .. })
    ));
}

#[test]
fn non_numeric_address() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="loco42" dir="true" V="99" V_max="100"/>"#),
        MessageOutcome::Rejected(RejectReason::Attribute {
            kind: "lc",
            source: AttributeError::WrongType {
                name: "addr",
                value: "loco42".into()
            }
        })
    );
}

#[test]
fn padded_address_accepted() {
    let mut node = node();
    let outcome =
        node.handle_message(br#"<lc id="t" addr=" 42 " dir="true" V="10" V_max="100"/>"#);
    assert!(outcome.is_applied());
}

// ============================================================================
// Loco attribute boundaries
// ============================================================================

#[test]
fn negative_velocity() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="42" dir="true" V="-5" V_max="100"/>"#),
        MessageOutcome::Rejected(RejectReason::NegativeVelocity(-5))
    );
}

#[test]
fn zero_scale() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="42" dir="true" V="0" V_max="0"/>"#),
        MessageOutcome::Rejected(RejectReason::InvalidVelocityScale(0))
    );
}

#[test]
fn bad_direction_flag() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="42" dir="forward" V="5" V_max="100"/>"#),
        MessageOutcome::Rejected(RejectReason::InvalidFlag {
            name: "dir",
            value: "forward".into()
        })
    );
}

#[test]
fn missing_scale() {
    assert_eq!(
        assert_no_effect(br#"<lc id="t" addr="42" dir="true" V="5"/>"#),
        MessageOutcome::Rejected(RejectReason::Attribute {
            kind: "lc",
            source: AttributeError::Missing("V_max")
        })
    );
}

#[test]
fn velocity_above_scale_clamped() {
    let mut node = node();
    node.handle_message(br#"<lc id="t" addr="42" dir="false" V="150" V_max="100"/>"#);
    assert_eq!(node.state().target_speed, -100);
}

#[test]
fn full_speed_maps_to_full_range() {
    let mut node = node();
    node.handle_message(br#"<lc id="t" addr="42" dir="false" V="100" V_max="100"/>"#);
    for k in 0..60 {
        node.tick(k * 50).unwrap();
    }
    assert_eq!(node.state().current_speed, -100);
    assert_eq!(node.driver().power, [-1023, -1023]);
}

// ============================================================================
// Function attribute boundaries
// ============================================================================

#[test]
fn function_index_zero() {
    assert_eq!(
        assert_no_effect(br#"<fn id="t" addr="42" fnchanged="0" fnchangedstate="true"/>"#),
        MessageOutcome::Rejected(RejectReason::FunctionOutOfRange { index: 0, count: 8 })
    );
}

#[test]
fn function_index_past_last() {
    assert_eq!(
        assert_no_effect(br#"<fn id="t" addr="42" fnchanged="9" fnchangedstate="true"/>"#),
        MessageOutcome::Rejected(RejectReason::FunctionOutOfRange { index: 9, count: 8 })
    );
}

#[test]
fn last_function_index() {
    let mut node = node();
    node.handle_message(br#"<fn id="t" addr="42" fnchanged="8" fnchangedstate="true"/>"#);
    node.tick(0).unwrap();
    assert!(node.driver().outputs[7]);
}

#[test]
fn bad_function_state() {
    assert_eq!(
        assert_no_effect(br#"<fn id="t" addr="42" fnchanged="1" fnchangedstate="on"/>"#),
        MessageOutcome::Rejected(RejectReason::InvalidFlag {
            name: "fnchangedstate",
            value: "on".into()
        })
    );
}

// ============================================================================
// System commands
// ============================================================================

#[test]
fn system_without_cmd() {
    assert_eq!(
        assert_no_effect(br#"<sys/>"#),
        MessageOutcome::Rejected(RejectReason::Attribute {
            kind: "sys",
            source: AttributeError::Missing("cmd")
        })
    );
}

#[test]
fn repeated_stop_is_harmless() {
    let mut node = node();
    node.handle_message(br#"<sys cmd="stop"/>"#);
    node.handle_message(br#"<sys cmd="ebreak"/>"#);
    node.tick(0).unwrap();
    assert!(node.state().override_active);

    node.handle_message(br#"<sys cmd="go"/>"#);
    assert!(!node.state().override_active);
}

#[test]
fn go_without_override() {
    let mut node = node();
    assert!(node.handle_message(br#"<sys cmd="go"/>"#).is_applied());
    assert!(!node.state().override_active);
}

#[test]
fn system_commands_are_not_addressed() {
    let mut node = node();
    assert!(node
        .handle_message(br#"<sys cmd="stop" addr="7"/>"#)
        .is_applied());
    assert!(node.state().override_active);
}

// ============================================================================
// Driver failures
// ============================================================================

#[test]
fn failed_actuation_is_retried() {
    let mut node = node();
    node.handle_message(br#"<fn id="t" addr="42" fnchanged="1" fnchangedstate="true"/>"#);

    node.driver_mut().fail = true;
    assert!(node.tick(0).is_err());
    assert!(!node.state().actual[0]);

    node.driver_mut().fail = false;
    node.tick(10).unwrap();
    assert!(node.state().actual[0]);
    assert!(node.driver().outputs[0]);
}
