//! Line-delimited JSON-RPC host for the catalog.
//!
//! One [`Session`] per connection owns that connection's protocol negotiation;
//! the [`ToolRegistry`] is shared read-only by every connection.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead, FramedWrite, LinesCodec,
};
use uuid::Uuid;

use crate::{
    app::{negotiator::ProtocolNegotiator, registry::ToolRegistry, tool_list},
    domain::revision::ProtocolRevision,
    infra::metrics,
    shared::{
        error::RpcError,
        types::{
            CallToolParams, CallToolResult, DEFAULT_MAX_FRAME_BYTES, Implementation,
            InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
        },
    },
};

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    negotiator: ProtocolNegotiator,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            negotiator: ProtocolNegotiator::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn negotiator(&self) -> &ProtocolNegotiator {
        &self.negotiator
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.negotiator.revision()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbound unit read off the wire. Lines stay raw bytes; UTF-8 is checked by
/// the JSON decoder.
#[derive(Debug, PartialEq)]
enum Frame {
    Line(Bytes),
    Oversized,
}

/// Newline framing with a length cap. An oversized line is skipped up to its
/// terminator and surfaced as [`Frame::Oversized`]; the stream keeps going.
struct FrameDecoder {
    inner: AnyDelimiterCodec,
}

impl FrameDecoder {
    fn new(max_len: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_len),
        }
    }

    fn lift(
        decoded: Result<Option<Bytes>, AnyDelimiterCodecError>,
    ) -> Result<Option<Frame>, AnyDelimiterCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Frame::Oversized)),
            Err(err) => Err(err),
        }
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        Self::lift(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        Self::lift(self.inner.decode_eof(src))
    }
}

#[derive(Clone)]
pub struct CatalogServer {
    registry: Arc<ToolRegistry>,
    server_info: Implementation,
    max_frame_bytes: usize,
}

impl CatalogServer {
    pub fn new(registry: Arc<ToolRegistry>, server_name: impl Into<String>) -> Self {
        metrics::set_registered_tools(registry.len());
        Self {
            registry,
            server_info: Implementation {
                name: server_name.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit.max(1);
        self
    }

    /// Serves one connection until the reader is exhausted.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut session = Session::new();
        tracing::info!(session = %session.id, "connection opened");
        let mut frames = FramedRead::new(reader, FrameDecoder::new(self.max_frame_bytes));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());
        while let Some(frame) = frames.next().await {
            let response = match frame.context("read json-rpc frame")? {
                Frame::Line(line) if line.iter().all(u8::is_ascii_whitespace) => continue,
                Frame::Line(line) => self.handle_line(&mut session, &line),
                Frame::Oversized => {
                    tracing::warn!(
                        session = %session.id,
                        limit = self.max_frame_bytes,
                        "oversized frame discarded"
                    );
                    Some(JsonRpcResponse::failure(
                        Value::Null,
                        &RpcError::Parse(format!("frame exceeds {} bytes", self.max_frame_bytes)),
                    ))
                }
            };
            if let Some(response) = response {
                let encoded = serde_json::to_string(&response).context("encode response")?;
                sink.send(encoded).await.context("write json-rpc frame")?;
            }
        }
        tracing::info!(session = %session.id, "connection closed");
        Ok(())
    }

    pub fn handle_line(&self, session: &mut Session, line: &[u8]) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_slice(line) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(session = %session.id, %err, "unparsable frame");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    &RpcError::Parse(err.to_string()),
                ));
            }
        };
        let id = raw.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(raw) {
            Ok(request) => self.handle(session, request),
            Err(err) => Some(JsonRpcResponse::failure(
                id,
                &RpcError::InvalidRequest(err.to_string()),
            )),
        }
    }

    /// Dispatches one request. Notifications never produce a response.
    pub fn handle(&self, session: &mut Session, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        tracing::debug!(session = %session.id, %method, notification, "request received");
        let outcome = self.dispatch(session, &method, params);
        if notification {
            if let Err(err) = outcome {
                tracing::debug!(session = %session.id, %method, %err, "notification failed");
            }
            return None;
        }
        let id = id.unwrap_or_default();
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                tracing::warn!(session = %session.id, %method, %err, "request failed");
                JsonRpcResponse::failure(id, &err)
            }
        })
    }

    fn dispatch(
        &self,
        session: &mut Session,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, RpcError> {
        match method {
            "initialize" => self.initialize(session, params),
            "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(session),
            "tools/call" => self.call_tool(session, params),
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, session: &mut Session, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params
            .map(serde_json::from_value::<InitializeParams>)
            .transpose()
            .unwrap_or_else(|err| {
                tracing::warn!(session = %session.id, %err, "malformed initialize params");
                None
            })
            .unwrap_or_default();

        let repeated = session.negotiator.is_negotiated();
        let revision = session.negotiator.negotiate(&params.protocol_version);
        if repeated {
            tracing::warn!(
                session = %session.id,
                claimed = %params.protocol_version,
                revision = revision.as_str(),
                "repeated initialize; revision stays fixed"
            );
        } else {
            metrics::record_handshake(revision.as_str());
            tracing::info!(
                session = %session.id,
                claimed = %params.protocol_version,
                revision = revision.as_str(),
                client = ?params.client_info,
                "protocol negotiated"
            );
        }

        let result = InitializeResult {
            protocol_version: revision.protocol_version().into(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.server_info.clone(),
        };
        serde_json::to_value(result).map_err(|err| RpcError::Internal(err.to_string()))
    }

    fn list_tools(&self, session: &Session) -> Result<Value, RpcError> {
        if !session.negotiator.is_negotiated() {
            tracing::debug!(session = %session.id, "tools/list before handshake; assuming modern");
        }
        let response = tool_list::build(self.registry.get_all(), session.revision());
        metrics::record_tool_list();
        tracing::info!(
            session = %session.id,
            count = response.tools.len(),
            "tools/list served"
        );
        serde_json::to_value(response).map_err(|err| RpcError::Internal(err.to_string()))
    }

    fn call_tool(&self, session: &Session, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| RpcError::InvalidParams("missing tools/call params".into()))
            .and_then(|raw| {
                serde_json::from_value(raw).map_err(|err| RpcError::InvalidParams(err.to_string()))
            })?;
        let arguments = Value::Object(params.arguments.unwrap_or_default());
        let result = match self.registry.call(&params.name, arguments) {
            Some(Ok(value)) => {
                metrics::record_tool_call("ok");
                CallToolResult::structured(value)
            }
            Some(Err(err)) => {
                metrics::record_tool_call("error");
                tracing::warn!(session = %session.id, tool = %params.name, %err, "tool failed");
                CallToolResult::error(err.to_string())
            }
            None => {
                metrics::record_tool_call("unknown");
                return Err(RpcError::UnknownTool(params.name));
            }
        };
        serde_json::to_value(result).map_err(|err| RpcError::Internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::demo_tools::demo_registry,
        domain::{registration::ReregistrationPolicy, revision::LEGACY_PROTOCOL_VERSION},
    };
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn server() -> CatalogServer {
        CatalogServer::new(
            Arc::new(demo_registry(ReregistrationPolicy::default())),
            "test-catalog",
        )
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, Some(params))
    }

    #[test]
    fn initialize_reports_negotiated_token() {
        let server = server();
        let mut session = Session::new();
        let response = server
            .handle(
                &mut session,
                request(1, "initialize", json!({"protocolVersion": "2099-01-01"})),
            )
            .expect("response");
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], json!("2025-03-26"));
        assert_eq!(result["serverInfo"]["name"], json!("test-catalog"));
        assert_eq!(session.revision(), ProtocolRevision::Modern);
    }

    #[test]
    fn malformed_initialize_params_negotiate_modern() {
        let server = server();
        let mut session = Session::new();
        let response = server
            .handle(&mut session, request(1, "initialize", json!(["not", "an", "object"])))
            .expect("response");
        assert!(response.error.is_none());
        assert_eq!(session.revision(), ProtocolRevision::Modern);
        assert!(session.negotiator().is_negotiated());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let first = Session::new();
        let second = Session::default();
        assert_ne!(first.id(), second.id());
        assert!(!second.negotiator().is_negotiated());
    }

    #[test]
    fn notifications_get_no_response() {
        let server = server();
        let mut session = Session::new();
        let note = JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: None,
            method: "notifications/initialized".into(),
            params: None,
        };
        assert!(note.is_notification());
        assert!(server.handle(&mut session, note).is_none());

        let unknown = JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: None,
            method: "notifications/cancelled".into(),
            params: None,
        };
        assert!(server.handle(&mut session, unknown).is_none());
    }

    #[test]
    fn protocol_errors_carry_json_rpc_codes() {
        let server = server();
        let mut session = Session::new();
        let parse = server.handle_line(&mut session, b"{not json").expect("response");
        assert_eq!(parse.error.expect("error").code, -32700);

        let invalid = server
            .handle_line(&mut session, br#"{"jsonrpc":"2.0","id":4}"#)
            .expect("response");
        assert_eq!(invalid.id, json!(4));
        assert_eq!(invalid.error.expect("error").code, -32600);

        let unknown_method = server
            .handle(&mut session, request(5, "resources/list", json!({})))
            .expect("response");
        assert_eq!(unknown_method.error.expect("error").code, -32601);

        let unknown_tool = server
            .handle(&mut session, request(6, "tools/call", json!({"name": "nope"})))
            .expect("response");
        let err = unknown_tool.error.expect("error");
        assert_eq!(err.code, -32602);
        assert_eq!(err.data, Some(json!({"tool": "nope"})));
    }

    #[test]
    fn tool_failures_are_results_not_errors() {
        let server = server();
        let mut session = Session::new();
        let response = server
            .handle(
                &mut session,
                request(7, "tools/call", json!({"name": "echo", "arguments": {}})),
            )
            .expect("response");
        assert!(response.error.is_none());
        let result = response.result.expect("result");
        assert_eq!(result["isError"], json!(true));

        let ok = server
            .handle(
                &mut session,
                request(8, "tools/call", json!({"name": "echo", "arguments": {"msg": "hi"}})),
            )
            .expect("response")
            .result
            .expect("result");
        assert_eq!(ok["isError"], json!(false));
        assert_eq!(ok["structuredContent"], json!({"echoed": "hi"}));
    }

    async fn roundtrip<R, W>(reader: &mut BufReader<R>, writer: &mut W, message: Value) -> Value
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = serde_json::to_string(&message).unwrap();
        line.push('\n');
        writer.write_all(line.as_bytes()).await.unwrap();
        let mut reply = String::new();
        reader.read_line(&mut reply).await.unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[tokio::test]
    async fn concurrent_connections_negotiate_independently() {
        let server = server();
        let (legacy_client, legacy_server) = tokio::io::duplex(64 * 1024);
        let (modern_client, modern_server) = tokio::io::duplex(64 * 1024);
        for stream in [legacy_server, modern_server] {
            let server = server.clone();
            tokio::spawn(async move {
                let (read, write) = tokio::io::split(stream);
                server.serve(read, write).await
            });
        }

        let (legacy_read, mut legacy_write) = tokio::io::split(legacy_client);
        let mut legacy_read = BufReader::new(legacy_read);
        let (modern_read, mut modern_write) = tokio::io::split(modern_client);
        let mut modern_read = BufReader::new(modern_read);

        let legacy_init = roundtrip(
            &mut legacy_read,
            &mut legacy_write,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": LEGACY_PROTOCOL_VERSION}}),
        )
        .await;
        let modern_init = roundtrip(
            &mut modern_read,
            &mut modern_write,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26"}}),
        )
        .await;
        assert_eq!(legacy_init["result"]["protocolVersion"], json!("2024-11-05"));
        assert_eq!(modern_init["result"]["protocolVersion"], json!("2025-03-26"));

        let list = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
        let legacy_tools = roundtrip(&mut legacy_read, &mut legacy_write, list.clone()).await;
        let modern_tools = roundtrip(&mut modern_read, &mut modern_write, list).await;
        // Both shapes are emitted on every connection.
        assert_eq!(legacy_tools["result"], modern_tools["result"]);
        assert!(legacy_tools["result"]["tools"][0]["annotations"].is_object());
    }

    async fn send_raw<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) {
        writer.write_all(bytes).await.unwrap();
    }

    async fn read_reply<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> Value {
        let mut reply = String::new();
        reader.read_line(&mut reply).await.unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    fn spawn_connection(server: CatalogServer) -> tokio::io::DuplexStream {
        let (client, stream) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            server.serve(read, write).await
        });
        client
    }

    #[tokio::test]
    async fn invalid_utf8_line_gets_parse_error_and_session_continues() {
        let client = spawn_connection(server());
        let (read, mut write) = tokio::io::split(client);
        let mut read = BufReader::new(read);

        send_raw(&mut write, b"\xff\xfe\n").await;
        let parse = read_reply(&mut read).await;
        assert_eq!(parse["id"], Value::Null);
        assert_eq!(parse["error"]["code"], json!(-32700));

        send_raw(
            &mut write,
            b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
        )
        .await;
        let tools = read_reply(&mut read).await;
        assert_eq!(tools["id"], json!(2));
        assert!(tools["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn oversized_line_is_rejected_and_session_continues() {
        let client = spawn_connection(server().with_max_frame_bytes(64));
        let (read, mut write) = tokio::io::split(client);
        let mut read = BufReader::new(read);

        let mut oversized = vec![b'x'; 200];
        oversized.push(b'\n');
        send_raw(&mut write, &oversized).await;
        let rejected = read_reply(&mut read).await;
        assert_eq!(rejected["id"], Value::Null);
        assert_eq!(rejected["error"]["code"], json!(-32700));
        assert!(
            rejected["error"]["message"]
                .as_str()
                .is_some_and(|message| message.contains("64 bytes"))
        );

        let ping = roundtrip(
            &mut read,
            &mut write,
            json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
        )
        .await;
        assert_eq!(ping["id"], json!(3));
        assert_eq!(ping["result"], json!({}));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let client = spawn_connection(server());
        let (read, mut write) = tokio::io::split(client);
        let mut read = BufReader::new(read);

        send_raw(&mut write, b"\n  \r\n").await;
        let ping = roundtrip(
            &mut read,
            &mut write,
            json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}),
        )
        .await;
        assert_eq!(ping["id"], json!(9));
    }
}
