use crate::error::Result;
use crate::sequencer::{AudioContext, Sequence, Voice};
use crate::types::{SessionClock, Token};
use log::{debug, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Audio backend that drives an external synth over OSC.
///
/// Every sequencer call becomes one or more messages under `/tonetype/seq/`:
///
/// - `new  [id, tempo, voice_json]`
/// - `push [id, token, hz, secs]` per token; rests send hz 0
/// - `play [id, when]`
/// - `stop [id]`
#[derive(Clone)]
pub struct OscContext {
    socket: Arc<UdpSocket>,
    target: String,
    clock: SessionClock,
    next_id: Arc<AtomicI32>,
}

impl OscContext {
    pub fn new(target: String, clock: SessionClock) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        info!("OSC sequencer → {}", target);
        Ok(Self {
            socket: Arc::new(socket),
            target,
            clock,
            next_id: Arc::new(AtomicI32::new(0)),
        })
    }

    fn send(&self, addr: &str, args: Vec<OscType>) -> Result<()> {
        let msg = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = rosc::encoder::encode(&msg)?;
        self.socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

impl AudioContext for OscContext {
    type Sequence = OscSequence;

    fn current_time(&self) -> f64 {
        self.clock.now_secs()
    }

    fn create_sequence(&self, tempo: u32, voice: &Voice, tokens: &[Token]) -> Result<OscSequence> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let voice_json = serde_json::to_string(voice)?;
        self.send(
            "/tonetype/seq/new",
            vec![
                OscType::Int(id),
                OscType::Int(tempo as i32),
                OscType::String(voice_json),
            ],
        )?;
        debug!("OSC seq {} ({}) created", id, voice.name);

        let mut seq = OscSequence {
            id,
            tempo,
            ctx: self.clone(),
        };
        if !tokens.is_empty() {
            seq.push(tokens)?;
        }
        Ok(seq)
    }
}

pub struct OscSequence {
    id: i32,
    tempo: u32,
    ctx: OscContext,
}

impl Sequence for OscSequence {
    fn push(&mut self, tokens: &[Token]) -> Result<()> {
        for token in tokens {
            self.ctx.send("/tonetype/seq/push", push_args(self.id, self.tempo, token))?;
        }
        Ok(())
    }

    fn play(&mut self, when: f64) -> Result<()> {
        self.ctx.send(
            "/tonetype/seq/play",
            vec![OscType::Int(self.id), OscType::Double(when)],
        )
    }

    fn stop(&mut self) -> Result<()> {
        self.ctx.send("/tonetype/seq/stop", vec![OscType::Int(self.id)])
    }
}

fn push_args(id: i32, tempo: u32, token: &Token) -> Vec<OscType> {
    vec![
        OscType::Int(id),
        OscType::String(token.to_string()),
        OscType::Float(token.frequency_hz().unwrap_or(0.0) as f32),
        OscType::Float(token.seconds(tempo) as f32),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::bassline;
    use crate::types::{NoteValue, Pitch};
    use std::time::Duration;

    fn recv_message(sock: &UdpSocket) -> OscMessage {
        let mut buf = [0u8; rosc::decoder::MTU];
        let (n, _) = sock.recv_from(&mut buf).unwrap();
        match rosc::decoder::decode_udp(&buf[..n]).unwrap().1 {
            OscPacket::Message(m) => m,
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_push_args() {
        let t = Token::note(Pitch::A, 4, NoteValue::Eighth);
        let args = push_args(3, 120, &t);
        assert_eq!(args[0], OscType::Int(3));
        assert_eq!(args[1], OscType::String("A4 e".into()));
        assert_eq!(args[2], OscType::Float(440.0));
        assert_eq!(args[3], OscType::Float(0.25));

        let rest = push_args(0, 120, &Token::rest(NoteValue::Half));
        assert_eq!(rest[2], OscType::Float(0.0));
    }

    #[test]
    fn test_messages_reach_target() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let ctx = OscContext::new(target, SessionClock::new()).unwrap();
        let bass = bassline();
        let mut seq = ctx.create_sequence(120, &Voice::bass(), &bass[..1]).unwrap();
        seq.stop().unwrap();

        let new = recv_message(&listener);
        assert_eq!(new.addr, "/tonetype/seq/new");
        assert_eq!(new.args[0], OscType::Int(0));
        assert_eq!(new.args[1], OscType::Int(120));

        let push = recv_message(&listener);
        assert_eq!(push.addr, "/tonetype/seq/push");
        assert_eq!(push.args[1], OscType::String("D3 q".into()));

        let stop = recv_message(&listener);
        assert_eq!(stop.addr, "/tonetype/seq/stop");
        assert_eq!(stop.args, vec![OscType::Int(0)]);
    }
}
