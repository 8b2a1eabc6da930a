/// Minimal wire protocol shared by the end-to-end tests.
use slipstream_core::{ByteReader, ByteWriter, Message, Protocol, QosType, Serde, SerdeErr, Vec3};

/// Connection-level chatter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChatLine {
    pub text: String,
}

impl Message for ChatLine {
    const QOS: QosType = QosType::Unreliable;

    fn ser(&self, writer: &mut ByteWriter) {
        self.text.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.text = String::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.text.clear();
    }
}

/// Per-object movement update.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SetVelocity {
    pub velocity: Vec3,
}

impl Message for SetVelocity {
    const QOS: QosType = QosType::Unreliable;

    fn ser(&self, writer: &mut ByteWriter) {
        self.velocity.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.velocity = Vec3::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.velocity = Vec3::ZERO;
    }
}

/// Per-object label, doubling as a buffered spawn message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetLabel {
    pub label: String,
}

impl Message for SetLabel {
    const QOS: QosType = QosType::ReliableOrdered;

    fn ser(&self, writer: &mut ByteWriter) {
        self.label.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.label = String::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.label.clear();
    }
}

/// Every peer in a test registers the same types in the same order.
pub fn protocol() -> Protocol {
    let mut protocol = Protocol::builder();
    protocol
        .add_message::<ChatLine>()
        .add_object_message::<SetVelocity>()
        .add_object_message::<SetLabel>();
    protocol.build()
}
