use std::{
    net::{TcpListener, TcpStream},
    sync::{
        mpsc::{self, Receiver, RecvError, Sender},
        Arc, Mutex,
    },
    thread::spawn,
};

use log::{debug, warn};
use tungstenite::{
    accept_hdr,
    handshake::server::{Request, Response},
    Message, WebSocket,
};

use crate::streamer;

type Peers = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Serves the engine over websockets.
///
/// Command lines arrive on `/ws/control`; reply lines are broadcast to
/// every peer connected on `/ws/snapshots`. The returned halves plug into
/// a [`streamer::Streamer`] exactly like the stdio ones.
pub fn service(
    addr: &str,
) -> (
    impl Iterator<Item = Result<String, RecvError>>,
    impl FnMut(String),
) {
    let (command_producer, command_receiver) = mpsc::channel::<String>();
    let (reply_producer, reply_receiver) = mpsc::channel::<String>();
    let addr = addr.to_string();
    spawn(move || start_server(&addr, command_producer, reply_receiver));
    streamer::channels(command_receiver, reply_producer)
}

fn start_server(addr: &str, command_producer: Sender<String>, reply_receiver: Receiver<String>) {
    let peers: Peers = Arc::new(Mutex::new(vec![]));
    start_dispatcher(peers.clone(), reply_receiver);
    start_websockets(addr, peers, command_producer);
}

fn start_websockets(addr: &str, peers: Peers, command_producer: Sender<String>) {
    let server = TcpListener::bind(addr).unwrap();
    for stream in server.incoming() {
        let peers = peers.clone();
        let command_producer = command_producer.clone();
        spawn(move || {
            let (path, websocket) = get_websocket(stream);
            if path.ends_with("/ws/control") {
                handle_command_receiver(websocket, command_producer)
            } else if path.ends_with("/ws/snapshots") {
                handle_snapshot_peer(websocket, peers)
            }
        });
    }
}

fn get_websocket(stream: Result<TcpStream, std::io::Error>) -> (String, WebSocket<TcpStream>) {
    let mut path: String = String::new();
    let callback = |req: &Request, response: Response| {
        path = String::from(req.uri().path());
        Ok(response)
    };
    let websocket = accept_hdr(stream.unwrap(), callback).unwrap();
    (path, websocket)
}

fn handle_snapshot_peer(websocket: WebSocket<TcpStream>, peers: Peers) {
    let mut peers = peers.lock().unwrap();
    peers.push(websocket);
}

fn handle_command_receiver(mut websocket: WebSocket<TcpStream>, command_producer: Sender<String>) {
    spawn(move || loop {
        let msg = websocket.read_message();
        match msg {
            Ok(message) => {
                if !read_command(message, &command_producer) {
                    break;
                }
            }
            Err(reason) => {
                warn!("control socket closed: {}", reason);
                break;
            }
        };
    });
}

fn read_command(message: Message, command_producer: &Sender<String>) -> bool {
    match message {
        Message::Text(txt) => {
            if let Err(reason) = command_producer.send(txt) {
                warn!("command channel closed: {:?}", reason);
            }
            true
        }
        Message::Binary(_) => {
            warn!("unsupported binary message.");
            true
        }
        Message::Close(_) => false,
        _ => true,
    }
}

fn start_dispatcher(peers: Peers, reply_receiver: Receiver<String>) {
    spawn(move || {
        for msg in reply_receiver {
            let mut peers = peers.lock().unwrap();
            peers.retain_mut(|peer| send_reply(peer, msg.clone()));
        }
    });
}

fn send_reply(peer: &mut WebSocket<TcpStream>, msg: String) -> bool {
    if peer.can_write() {
        if let Err(reason) = peer.write_message(Message::Text(msg)) {
            debug!("snapshot peer dropped: {:?}", reason);
        }
        true
    } else {
        false
    }
}
