//! Test helpers for integration tests
//!
//! Provides a fake gateway that accepts real WebSocket connections, a
//! mocked REST API answering `GET /gateway/bot`, and a way to run a client
//! in the background.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chat_client::{Client, ClientResult};
use chat_common::ClientConfig;
use chat_gateway::{GatewayMessage, OpCode};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::gateway_bot_body;

/// Longest any helper waits for the client to act
pub const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts gateway connections on a local port
pub struct FakeGateway {
    listener: TcpListener,
    addr: SocketAddr,
}

impl FakeGateway {
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// Base URL handed out by the mocked `GET /gateway/bot`
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for the client's next connection
    pub async fn accept(&self) -> Result<GatewayPeer> {
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .context("client never connected")??;
        let ws = accept_async(stream).await?;
        Ok(GatewayPeer { ws })
    }
}

/// Server side of one gateway connection
pub struct GatewayPeer {
    ws: WebSocketStream<TcpStream>,
}

impl GatewayPeer {
    pub async fn send(&mut self, message: &GatewayMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn hello(&mut self, interval_ms: u64) -> Result<()> {
        self.send(&GatewayMessage::hello(interval_ms)).await
    }

    pub async fn dispatch(&mut self, event: &str, seq: u64, data: Value) -> Result<()> {
        self.send(&GatewayMessage::dispatch(event, seq, data)).await
    }

    pub async fn heartbeat_ack(&mut self) -> Result<()> {
        self.send(&GatewayMessage::heartbeat_ack()).await
    }

    /// Next frame from the client
    pub async fn recv(&mut self) -> Result<GatewayMessage> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("client sent nothing")?;
            match message {
                Some(Ok(Message::Text(text))) => {
                    return Ok(serde_json::from_str(&text)?);
                }
                Some(Ok(Message::Close(frame))) => bail!("client closed: {frame:?}"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("client went away"),
            }
        }
    }

    /// Next frame with opcode `op`, skipping heartbeats in between
    pub async fn recv_op(&mut self, op: OpCode) -> Result<GatewayMessage> {
        loop {
            let message = self.recv().await?;
            if message.op == op {
                return Ok(message);
            }
            if message.op != OpCode::Heartbeat {
                bail!("expected {op}, got {message}");
            }
        }
    }

    /// Read until the client's close frame and return its code
    pub async fn expect_close(&mut self) -> Result<u16> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("client never closed")?;
            match message {
                Some(Ok(Message::Close(Some(frame)))) => return Ok(u16::from(frame.code)),
                Some(Ok(Message::Close(None))) => bail!("close frame without a code"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("connection dropped without a close frame"),
            }
        }
    }

    /// Close the connection from the server side
    pub async fn close(mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws.close(Some(frame)).await?;
        // Drain until the client acknowledges
        while let Ok(Some(Ok(_))) = tokio::time::timeout(STEP_TIMEOUT, self.ws.next()).await {}
        Ok(())
    }
}

/// Mocked REST API that points clients at `gateway`
pub async fn mock_api(gateway: &FakeGateway) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_bot_body(&gateway.url())))
        .mount(&server)
        .await;
    server
}

/// A client driven by a background task
pub struct RunningClient {
    pub client: Arc<Client>,
    pub task: JoinHandle<ClientResult<()>>,
}

impl RunningClient {
    pub async fn start(config: ClientConfig) -> Result<Self> {
        let client = Arc::new(Client::connect(config).await?);
        Ok(Self::run(client))
    }

    /// Run an already built client, so handlers can be registered first
    pub fn run(client: Arc<Client>) -> Self {
        let runner = Arc::clone(&client);
        let task = tokio::spawn(async move { runner.run().await });
        Self { client, task }
    }

    /// Wait for `run()` to return
    pub async fn finished(self) -> Result<ClientResult<()>> {
        Ok(tokio::time::timeout(STEP_TIMEOUT, self.task)
            .await
            .context("client kept running")??)
    }
}

/// Poll `check` until it holds or the step timeout passes
pub async fn eventually<F>(mut check: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while !check() {
        if tokio::time::Instant::now() > deadline {
            bail!("condition never held");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
