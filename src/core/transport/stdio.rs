//! STDIO transport implementation.
//!
//! Standard input/output transport for MCP - the default and recommended
//! mode. Messages are newline-delimited JSON. Tool calls run concurrently
//! with further reads so a cancellation notification can reach a running
//! call; every other message is handled in arrival order.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{Transport, TransportError, TransportResult};
use crate::core::McpServer;
use crate::core::protocol::{JsonRpcResponse, parse_message};
use crate::core::session::{Session, TransportKind};

/// Capacity of the outgoing response queue.
const OUTBOUND_CAPACITY: usize = 64;

/// STDIO transport handler.
#[derive(Debug, Default)]
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Serve one session over an arbitrary byte stream pair.
    ///
    /// Returns when `reader` reaches end of input and every in-flight call
    /// has answered, or with an error as soon as writing fails.
    pub async fn serve<R, W>(server: &McpServer, reader: R, writer: W) -> TransportResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let session = server.open_session(TransportKind::Stdio);
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOUND_CAPACITY);
        let mut writer_task = tokio::spawn(write_responses(writer, rx));
        let mut calls = JoinSet::new();
        let mut reader = BufReader::new(reader);
        // Partial reads stay in `buf` when another branch wins the select.
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    match read {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            session.close();
                            calls.abort_all();
                            return Err(e.into());
                        }
                    }
                    match std::str::from_utf8(&buf) {
                        Ok(line) => dispatch_line(&session, &tx, &mut calls, line).await,
                        Err(_) => {
                            warn!("Discarding line that is not valid UTF-8");
                            let response =
                                JsonRpcResponse::parse_error("Parse error: invalid UTF-8");
                            let _ = tx.send(response).await;
                        }
                    }
                    buf.clear();
                }
                Some(_) = calls.join_next(), if !calls.is_empty() => {}
                written = &mut writer_task => {
                    error!("STDIO writer stopped, closing session {}", session.id());
                    session.close();
                    calls.abort_all();
                    return flatten(written);
                }
            }
        }

        debug!("stdin closed, waiting for {} in-flight call(s)", calls.len());
        while calls.join_next().await.is_some() {}
        session.close();
        drop(tx);

        flatten(writer_task.await)
    }
}

impl StdioTransport {
    /// Run the STDIO transport on the process's stdin and stdout.
    async fn run_stdio(server: McpServer) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");
        Self::serve(&server, tokio::io::stdin(), tokio::io::stdout()).await?;
        info!("STDIO transport finished");
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn description(&self) -> String {
        "STDIO (newline-delimited JSON)".to_string()
    }

    async fn run(self: Box<Self>, server: McpServer) -> TransportResult<()> {
        Self::run_stdio(server).await
    }
}

async fn dispatch_line(
    session: &Arc<Session>,
    tx: &mpsc::Sender<JsonRpcResponse>,
    calls: &mut JoinSet<()>,
    line: &str,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let message = match parse_message(line) {
        Ok(message) => message,
        Err(response) => {
            warn!("Discarding malformed line");
            let _ = tx.send(response).await;
            return;
        }
    };

    if message.is_tool_call() {
        let session = Arc::clone(session);
        let tx = tx.clone();
        calls.spawn(async move {
            if let Some(response) = session.handle(message).await {
                let _ = tx.send(response).await;
            }
        });
    } else if let Some(response) = session.handle(message).await {
        let _ = tx.send(response).await;
    }
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

fn flatten(joined: Result<TransportResult<()>, tokio::task::JoinError>) -> TransportResult<()> {
    joined.map_err(|e| TransportError::connection(format!("writer task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::core::error::ErrorKind;
    use crate::domains::tools::{ParamType, Parameter, Tool, ToolRegistry};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    async fn run_script(server: &McpServer, input: &str) -> (TransportResult<()>, Vec<Value>) {
        run_bytes(server, input.as_bytes()).await
    }

    async fn run_bytes(server: &McpServer, input: &[u8]) -> (TransportResult<()>, Vec<Value>) {
        let (mut client, server_side) = tokio::io::duplex(64 * 1024);
        let result = StdioTransport::serve(server, input, server_side).await;

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        let responses = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (result, responses)
    }

    fn script(lines: &[Value]) -> String {
        lines.iter().map(|l| format!("{l}\n")).collect()
    }

    fn initialize(id: i64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26", "clientInfo": {"name": "test"}}
        })
    }

    #[tokio::test]
    async fn test_full_exchange() {
        let server = McpServer::new(Config::default());
        let input = script(&[
            initialize(1),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "sum", "arguments": {"a": 2, "b": 3}}}),
        ]);

        let (result, responses) = run_script(&server, &input).await;
        assert!(result.is_ok());
        assert_eq!(responses.len(), 3);

        assert_eq!(responses[0]["id"], json!(1));
        assert!(responses[0]["result"]["capabilities"]["tools"].is_object());
        assert_eq!(responses[1]["result"]["tools"][0]["name"], json!("sum"));
        assert_eq!(responses[2]["id"], json!(3));
        assert_eq!(responses[2]["result"]["structuredContent"]["result"], json!(5));
        assert_eq!(responses[2]["result"]["isError"], json!(false));
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines() {
        let server = McpServer::new(Config::default());
        let input = format!(
            "\n{}\n   \nthis is not json\n{}\n",
            initialize(1),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})
        );

        let (result, responses) = run_script(&server, &input).await;
        assert!(result.is_ok());
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[1]["error"]["code"], json!(-32700));
        assert_eq!(responses[1]["id"], Value::Null);
        assert_eq!(responses[2]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_parse_error() {
        let server = McpServer::new(Config::default());
        let mut input = Vec::new();
        input.extend_from_slice(format!("{}\n", initialize(1)).as_bytes());
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"jsonrpc\": \"2.0\", \"id\": 2, \"method\": \"ping\"}");

        let (result, responses) = run_bytes(&server, &input).await;
        assert!(result.is_ok());
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[1]["error"]["code"], json!(-32700));
        assert_eq!(responses[1]["id"], Value::Null);
        assert_eq!(responses[2]["id"], json!(2));
        assert_eq!(responses[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_call_before_initialize() {
        let server = McpServer::new(Config::default());
        let input = script(&[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})]);

        let (_, responses) = run_script(&server, &input).await;
        assert_eq!(responses[0]["error"]["code"], json!(-32600));
        assert_eq!(responses[0]["error"]["data"]["kind"], json!("ProtocolError"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_data() {
        let server = McpServer::new(Config::default());
        let input = script(&[
            initialize(1),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "sum", "arguments": {"a": "x", "b": 1}}}),
        ]);

        let (_, responses) = run_script(&server, &input).await;
        let result = &responses[1]["result"];
        assert_eq!(result["isError"], json!(true));
        assert_eq!(
            result["structuredContent"]["error"]["kind"],
            json!("InvalidArguments")
        );
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_reads() {
        let registry = ToolRegistry::new()
            .with_tool(
                Tool::builder("wait")
                    .param(Parameter::optional("ms", ParamType::Integer, 50))
                    .returns(ParamType::Boolean)
                    .handler(|args| async move {
                        let ms = args.get_i64("ms")? as u64;
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        Ok(json!(true))
                    })
                    .build(),
            )
            .unwrap();
        let server = McpServer::with_registry(Config::default(), registry);
        let input = script(&[
            initialize(1),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "wait"}}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
        ]);

        let (result, responses) = run_script(&server, &input).await;
        assert!(result.is_ok());
        let ids: Vec<_> = responses.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3), json!(2)]);
        assert_eq!(responses[2]["result"]["structuredContent"]["result"], json!(true));
    }

    #[tokio::test]
    async fn test_broken_pipe_is_transport_failure() {
        let server = McpServer::new(Config::default());
        let (client, server_side) = tokio::io::duplex(64);
        drop(client);

        let input = script(&[initialize(1)]);
        let err = StdioTransport::serve(&server, input.as_bytes(), server_side)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
