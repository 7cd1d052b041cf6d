//! Typed messages decoded through a registry.
//!
//! ```sh
//! cargo run -p packeteer --example message-dispatch
//! ```

use packeteer::frame::{
    BodyError, BodyReader, BodyWriter, FrameReader, FrameWriter, Message, MessageRegistry, Result,
};

struct Chat {
    room: String,
    text: String,
}

impl Message for Chat {
    const ID: i32 = 1;

    fn sub_id(&self) -> Option<&str> {
        Some(&self.room)
    }

    fn write_body(&self, out: &mut BodyWriter) -> std::result::Result<(), BodyError> {
        out.write_str(&self.text)?;
        Ok(())
    }

    fn read_body(
        sub_id: Option<&str>,
        input: &mut BodyReader,
    ) -> std::result::Result<Self, BodyError> {
        Ok(Chat {
            room: sub_id.unwrap_or_default().to_string(),
            text: input.read_string()?,
        })
    }
}

struct Presence {
    online: bool,
    since: i64,
}

impl Message for Presence {
    const ID: i32 = 2;

    fn write_body(&self, out: &mut BodyWriter) -> std::result::Result<(), BodyError> {
        out.write_bool(self.online).write_i64(self.since);
        Ok(())
    }

    fn read_body(
        _sub_id: Option<&str>,
        input: &mut BodyReader,
    ) -> std::result::Result<Self, BodyError> {
        Ok(Presence {
            online: input.read_bool()?,
            since: input.read_i64()?,
        })
    }
}

enum Inbound {
    Chat(Chat),
    Presence(Presence),
}

impl From<Chat> for Inbound {
    fn from(m: Chat) -> Self {
        Inbound::Chat(m)
    }
}

impl From<Presence> for Inbound {
    fn from(m: Presence) -> Self {
        Inbound::Presence(m)
    }
}

fn main() -> Result<()> {
    let mut writer = FrameWriter::new(Vec::new());
    writer.write_message(&Presence {
        online: true,
        since: 1_700_000_000_000,
    })?;
    writer.write_message(&Chat {
        room: "general".into(),
        text: "hello".into(),
    })?;
    let bytes = writer.into_inner();

    let mut registry = MessageRegistry::<Inbound>::new();
    registry.register::<Chat>().register::<Presence>();

    let mut reader = FrameReader::buffered(&bytes[..]);
    for frame in reader.frames() {
        match registry.dispatch(&frame?)? {
            Inbound::Chat(chat) => println!("[{}] {}", chat.room, chat.text),
            Inbound::Presence(p) => println!("online={} since={}", p.online, p.since),
        }
    }
    Ok(())
}
