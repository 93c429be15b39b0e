//! A node driving each driver family over `embedded-hal` test doubles.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use rs_loconode::hal::{
    DualHBridge, DualLogic, HBridgeChannel, IrFrame, IrSignal, LightBinding, LogicChannel,
    MockIrTransmitter,
};
use rs_loconode::{ActuationDriver, Identity, LocoNode, PfOutput};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug)]
struct Pwm {
    duty: u16,
    max: u16,
}

impl Pwm {
    fn new(max: u16) -> Self {
        Self { duty: 0, max }
    }
}

impl PwmErrorType for Pwm {
    type Error = Infallible;
}

impl SetDutyCycle for Pwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty = duty;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Pin {
    high: bool,
}

impl PinErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

fn drive<D: ActuationDriver>(node: &mut LocoNode<D>, payload: &[u8], from: u64, ticks: u64) -> u64
where
    D::Error: core::fmt::Debug,
{
    node.handle_message(payload);
    let mut t = from;
    for _ in 0..ticks {
        node.tick(t).unwrap();
        t += 50;
    }
    t
}

fn identity() -> Identity {
    Identity::new(42).unwrap()
}

// ============================================================================
// Dual H-bridge
// ============================================================================

#[test]
fn hbridge_follows_direction() {
    let driver = DualHBridge::new(
        vec![HBridgeChannel {
            forward: Pwm::new(1000),
            reverse: Pwm::new(1000),
        }],
        vec![Pin::default(), Pin::default(), Pin::default()],
    );
    let mut node = LocoNode::new(identity(), driver);

    let t = drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="50" V_max="100"/>"#,
        0,
        30,
    );
    let channel = node.driver().channel(0).unwrap();
    assert_eq!((channel.forward.duty, channel.reverse.duty), (500, 0));
    assert!(node.driver().light(0).unwrap().high);
    assert!(!node.driver().light(2).unwrap().high);

    drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="false" V="100" V_max="100"/>"#,
        t,
        100,
    );
    let channel = node.driver().channel(0).unwrap();
    assert_eq!((channel.forward.duty, channel.reverse.duty), (0, 1000));
    assert!(node.driver().light(2).unwrap().high);
}

#[test]
fn hbridge_override_idles_both_inputs() {
    let driver = DualHBridge::new(
        vec![HBridgeChannel {
            forward: Pwm::new(255),
            reverse: Pwm::new(255),
        }],
        Vec::<Pin>::new(),
    );
    let mut node = LocoNode::new(identity(), driver);

    let t = drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="20" V_max="20"/>"#,
        0,
        20,
    );
    assert_eq!(node.driver().channel(0).unwrap().forward.duty, 255);

    drive(&mut node, br#"<sys cmd="ebreak"/>"#, t, 1);
    let channel = node.driver().channel(0).unwrap();
    assert_eq!((channel.forward.duty, channel.reverse.duty), (0, 0));
}

// ============================================================================
// Dual logic
// ============================================================================

#[test]
fn logic_sets_phase_and_enable() {
    let driver = DualLogic::new(
        vec![LogicChannel {
            phase: Pin::default(),
            enable: Pwm::new(1000),
        }],
        vec![Pin::default()],
    );
    let mut node = LocoNode::new(identity(), driver);

    let t = drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="false" V="10" V_max="10"/>"#,
        0,
        10,
    );
    let channel = node.driver().channel(0).unwrap();
    assert!(channel.phase.high);
    assert_eq!(channel.enable.duty, 1000);

    drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="5" V_max="10"/>"#,
        t,
        20,
    );
    let channel = node.driver().channel(0).unwrap();
    assert!(!channel.phase.high);
    assert_eq!(channel.enable.duty, 500);
}

// ============================================================================
// Power Functions IR
// ============================================================================

fn ir_node() -> LocoNode<IrSignal<MockIrTransmitter, Pin>> {
    let driver = IrSignal::new(
        MockIrTransmitter::new(),
        1,
        vec![PfOutput::Red],
        vec![LightBinding::Ir(PfOutput::Blue), LightBinding::Unbound],
    );
    LocoNode::new(identity(), driver)
}

#[test]
fn ir_scales_to_seven_steps() {
    let mut node = ir_node();
    drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="100" V_max="100"/>"#,
        0,
        60,
    );
    assert_eq!(
        node.driver().transmitter().last_for(PfOutput::Red),
        Some(IrFrame::Level {
            channel: 1,
            output: PfOutput::Red,
            level: 7
        })
    );
}

#[test]
fn ir_headlight_on_receiver_port() {
    let mut node = ir_node();
    drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="10" V_max="100"/>"#,
        0,
        1,
    );
    assert_eq!(
        node.driver().transmitter().last_for(PfOutput::Blue),
        Some(IrFrame::Level {
            channel: 1,
            output: PfOutput::Blue,
            level: 7
        })
    );

    // F2 has nothing attached
    drive(
        &mut node,
        br#"<fn id="t" addr="42" fnchanged="2" fnchangedstate="true"/>"#,
        50,
        1,
    );
    assert!(node.state().actual[1]);
}

#[test]
fn ir_override_sends_brake() {
    let mut node = ir_node();
    let t = drive(
        &mut node,
        br#"<lc id="t" addr="42" dir="true" V="50" V_max="100"/>"#,
        0,
        30,
    );
    drive(&mut node, br#"<sys cmd="stop"/>"#, t, 1);
    assert_eq!(
        node.driver().transmitter().last_for(PfOutput::Red),
        Some(IrFrame::Brake {
            channel: 1,
            output: PfOutput::Red
        })
    );
}
