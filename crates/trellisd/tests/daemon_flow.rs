//! End-to-end exercise of the daemon over a TCP reply socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use serde_json::{Value, json};

use trellis_config::SocketEndpoint;
use trellis_plugins::{CallArgs, PluginError, PluginRegistry, PluginTransaction};
use trellis_protocol::Record;
use trellisd::{ReplyListener, ReplyListenerHandle, RequestHandler, SqliteEngine};

fn demo_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register_op("math:add", |args: CallArgs| -> Result<Value, PluginError> {
            let CallArgs::Positional(values) = args else {
                return Err(PluginError::invocation("math:add takes positional args"));
            };
            let total: i64 = values.iter().filter_map(Value::as_i64).sum();
            Ok(json!(total))
        })
        .expect("register op");
    registry
        .register_hook("tag", "Note", note_tagger)
        .expect("register hook");
    registry
        .register_provider(
            "oauth",
            |action: &str, _param: &Value| -> Result<Value, PluginError> {
                Ok(json!({"handled": action}))
            },
        )
        .expect("register provider");
    registry
}

fn note_tagger(
    record: &mut Record,
    _original: Option<&Record>,
    _tx: &mut dyn PluginTransaction,
) -> Result<(), PluginError> {
    record.set("tagged", json!(true));
    Ok(())
}

fn start_daemon() -> (SocketAddr, ReplyListenerHandle) {
    let registry = demo_registry();
    let engine = SqliteEngine::open_in_memory().expect("open engine");
    let dispatcher = trellisd::Dispatcher::new(Arc::new(registry), Arc::new(engine));
    let listener =
        ReplyListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
    let addr = listener.local_addr().expect("local address");
    let handler: Arc<dyn RequestHandler> = Arc::new(dispatcher);
    let handle = listener.start(handler).expect("start listener");
    (addr, handle)
}

fn roundtrip(addr: SocketAddr, request: &Value) -> Value {
    let mut client = TcpStream::connect(addr).expect("connect client");
    let mut frame = serde_json::to_vec(request).expect("encode request");
    frame.push(b'\n');
    client.write_all(&frame).expect("write request");
    let mut line = String::new();
    BufReader::new(&client)
        .read_line(&mut line)
        .expect("read response");
    serde_json::from_str(&line).expect("decode response")
}

#[test]
fn full_request_cycle_over_tcp() {
    let (addr, handle) = start_daemon();

    let manifest = roundtrip(addr, &json!({"kind": "init"}));
    let entries = manifest["result"].as_array().expect("manifest entries");
    assert_eq!(entries.len(), 3);

    let sum = roundtrip(
        addr,
        &json!({"kind": "op", "name": "math:add", "param": {"args": [40, 2]}}),
    );
    assert_eq!(sum, json!({"result": 42}));

    let tagged = roundtrip(
        addr,
        &json!({
            "kind": "hook",
            "name": "tag",
            "param": {"record": {"_id": "Note/7", "body": "hi"}}
        }),
    );
    assert_eq!(
        tagged,
        json!({"result": {"_id": "Note/7", "body": "hi", "tagged": true}})
    );

    let provided = roundtrip(
        addr,
        &json!({"kind": "provider", "name": "oauth", "param": {"action": "login"}}),
    );
    assert_eq!(provided, json!({"result": {"handled": "login"}}));

    let unknown = roundtrip(addr, &json!({"kind": "mystery", "name": "x"}));
    assert_eq!(unknown["error"]["type"], "unknown_kind");

    // A failing request never breaks the loop for the next client.
    let still_alive = roundtrip(addr, &json!({"kind": "init"}));
    assert!(still_alive.get("result").is_some());

    handle.shutdown();
    handle.join().expect("join listener");
}
