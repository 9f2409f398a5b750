use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ctrlwire_client::{connect, connect_with_config, ClientConfig, ClientError, MismatchField};
use ctrlwire_frame::{decode_message, FrameReader, Message, Verb};

struct Stub {
    reader: FrameReader<TcpStream>,
    writer: TcpStream,
}

impl Stub {
    fn recv(&mut self) -> Message {
        let frame = self.reader.read_frame().expect("stub should read a frame");
        decode_message(&frame.payload).expect("client should send valid commands")
    }

    fn send(&mut self, message: &Message) {
        let wire = message.encode().expect("stub message should encode");
        self.writer.write_all(&wire).expect("stub should write");
    }
}

fn spawn_stub<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(Stub) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("stub should bind");
    let port = listener.local_addr().expect("bound address").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("stub should accept");
        let writer = stream.try_clone().expect("stream should clone");
        script(Stub {
            reader: FrameReader::new(stream),
            writer,
        });
    });
    (port, handle)
}

#[test]
fn get_end_to_end() {
    let (port, stub) = spawn_stub(|mut stub| {
        let cmd = stub.recv();
        assert_eq!(cmd.to_string(), "1 GET foo.bar");
        stub.send(&Message::new(cmd.id, Verb::GetReply, "foo.bar", Some("hello")));
    });

    let mut client = connect("127.0.0.1", port).expect("client should connect");
    let reply = client.send_command("foo.bar", None).expect("command should succeed");

    assert_eq!(reply.value(), Some("hello"));
    assert_eq!(reply.raw.as_ref(), b"1 GET_REPLY foo.bar hello");

    client.close();
    client.close();
    stub.join().expect("stub thread should complete");
}

#[test]
fn trap_pushed_before_command_is_drained() {
    let (ready_tx, ready_rx) = mpsc::channel();
    let (port, stub) = spawn_stub(move |mut stub| {
        stub.send(&Message::new(
            "0",
            Verb::Trap,
            "subscriber.alarm",
            Some("raised"),
        ));
        ready_tx.send(()).expect("test should be listening");

        let cmd = stub.recv();
        stub.send(&Message::new(
            cmd.id,
            Verb::SetReply,
            "subscriber.create",
            Some("001010000000001"),
        ));
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut client = connect("127.0.0.1", port)
        .expect("client should connect")
        .with_notification_handler(move |msg| sink.lock().unwrap().push(msg.clone()));

    ready_rx.recv().expect("stub should push the trap");
    thread::sleep(Duration::from_millis(50));

    let reply = client
        .set("subscriber.create", "001010000000001")
        .expect("command should succeed");

    assert_eq!(reply.verb(), Verb::SetReply);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].verb, Verb::Trap);
    assert_eq!(seen[0].variable, "subscriber.alarm");
    assert_eq!(seen[0].value.as_deref(), Some("raised"));

    drop(seen);
    client.close();
    stub.join().expect("stub thread should complete");
}

#[test]
fn explicit_drain_returns_queued_traps() {
    let (ready_tx, ready_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let (port, stub) = spawn_stub(move |mut stub| {
        stub.send(&Message::new("0", Verb::Trap, "bts.0.oml", Some("down")));
        stub.send(&Message::new("0", Verb::Trap, "bts.0.oml", Some("up")));
        ready_tx.send(()).expect("test should be listening");
        let _ = done_rx.recv();
    });

    let mut client = connect("127.0.0.1", port).expect("client should connect");
    ready_rx.recv().expect("stub should push traps");
    thread::sleep(Duration::from_millis(50));

    let drained = client.drain_notifications().expect("drain should succeed");
    let values: Vec<_> = drained.iter().filter_map(|m| m.value.as_deref()).collect();
    assert_eq!(values, vec!["down", "up"]);

    done_tx.send(()).expect("stub should be waiting");
    stub.join().expect("stub thread should complete");
}

#[test]
fn mismatched_echo_is_reported() {
    let (port, stub) = spawn_stub(|mut stub| {
        let cmd = stub.recv();
        stub.send(&Message::new(cmd.id, Verb::SetReply, "x", Some("6")));
    });

    let mut client = connect("127.0.0.1", port).expect("client should connect");
    let err = client.set("x", "5").expect_err("value mismatch should fail");

    match err {
        ClientError::Mismatch {
            field,
            expected,
            actual,
        } => {
            assert_eq!(field, MismatchField::Value);
            assert_eq!(expected, "5");
            assert_eq!(actual, "6");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
    stub.join().expect("stub thread should complete");
}

#[test]
fn silent_peer_times_out() {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let (port, stub) = spawn_stub(move |mut stub| {
        let _ = stub.recv();
        let _ = done_rx.recv();
    });

    let config = ClientConfig {
        reply_timeout: Some(Duration::from_millis(100)),
        ..ClientConfig::default()
    };
    let mut client = connect_with_config("127.0.0.1", port, &config).expect("client should connect");
    let err = client.get("never.answered").expect_err("should time out");
    assert!(matches!(err, ClientError::Timeout(_)));

    done_tx.send(()).expect("stub should be waiting");
    stub.join().expect("stub thread should complete");
}

#[test]
fn peer_disconnect_fails_command() {
    let (port, stub) = spawn_stub(|mut stub| {
        let _ = stub.recv();
    });

    let mut client = connect("127.0.0.1", port).expect("client should connect");
    let err = client.get("foo.bar").expect_err("disconnect should fail the command");
    assert!(matches!(err, ClientError::Transport(_)));
    stub.join().expect("stub thread should complete");
}

#[test]
fn two_commands_on_one_session() {
    let (port, stub) = spawn_stub(|mut stub| {
        for value in ["a", "b"] {
            let cmd = stub.recv();
            stub.send(&Message::new(cmd.id, Verb::GetReply, cmd.variable, Some(value)));
        }
    });

    let mut client = connect("127.0.0.1", port).expect("client should connect");
    let first = client.get("subscriber.count").expect("first command");
    let second = client.get("subscriber.count").expect("second command");

    assert_eq!((first.id(), first.value()), ("1", Some("a")));
    assert_eq!((second.id(), second.value()), ("2", Some("b")));
    stub.join().expect("stub thread should complete");
}
