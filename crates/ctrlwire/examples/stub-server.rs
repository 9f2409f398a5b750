//! In-memory control endpoint for trying the client locally.
//!
//! Answers GET and SET against a variable map, replies ERROR for unknown
//! variables and pushes a TRAP to every new connection.
//!
//! Run with:
//!   cargo run --example stub-server -- 127.0.0.1:4259
//!
//! In another terminal:
//!   cargo run --features cli -- set subscriber.create 001010000000001
//!   cargo run --features cli -- get subscriber.by-imsi-001010000000001.msisdn

use std::collections::HashMap;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use ctrlwire::frame::{decode_message, FrameError, FrameReader, Message, Verb};

type Store = Arc<Mutex<HashMap<String, String>>>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4259".to_string());
    let listener = TcpListener::bind(&addr)?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let store: Store = Arc::new(Mutex::new(HashMap::new()));
    for stream in listener.incoming() {
        let stream = stream?;
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_default();
            eprintln!("Client connected: {peer}");
            if let Err(e) = serve(stream, &store) {
                eprintln!("Client {peer} failed: {e}");
            }
        });
    }
    Ok(())
}

fn serve(stream: TcpStream, store: &Store) -> Result<(), FrameError> {
    let mut writer = stream.try_clone()?;
    let mut reader = FrameReader::new(stream);

    let hello = Message::new("0", Verb::Trap, "stub.connected", Some("1"));
    writer.write_all(&hello.encode()?)?;

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => {
                eprintln!("Client disconnected");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let reply = match decode_message(&frame.payload) {
            Ok(command) => answer(&command, store),
            Err(e) => {
                eprintln!("Ignoring malformed command: {e}");
                continue;
            }
        };
        eprintln!("{reply}");
        writer.write_all(&reply.encode()?)?;
    }
}

fn answer(command: &Message, store: &Store) -> Message {
    let mut vars = match store.lock() {
        Ok(vars) => vars,
        Err(poisoned) => poisoned.into_inner(),
    };
    match (command.verb, command.value.as_deref()) {
        (Verb::Get, _) => match vars.get(&command.variable) {
            Some(value) => Message::new(
                command.id.as_str(),
                Verb::GetReply,
                command.variable.as_str(),
                Some(value.as_str()),
            ),
            None => Message::error(command.id.as_str(), "Command not found"),
        },
        (Verb::Set, Some(value)) => {
            vars.insert(command.variable.clone(), value.to_string());
            Message::new(
                command.id.as_str(),
                Verb::SetReply,
                command.variable.as_str(),
                Some(value),
            )
        }
        _ => Message::error(command.id.as_str(), "Command not supported"),
    }
}
