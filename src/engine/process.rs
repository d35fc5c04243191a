//! One external UCI subprocess.
//!
//! Owns the child's stdin/stdout, translates high-level calls
//! (`start`/`configure`/`search`/`stop`) into the UCI text protocol, and
//! normalizes engine-reported scores to white's perspective.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::uci::{self, NormalizedEval, Score};
use crate::types::{Color, EngineKind};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const LINE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported platform for engine binary: {0}")]
    UnsupportedPlatform(String),
    #[error("failed to spawn engine subprocess: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("engine handshake timed out")]
    HandshakeTimeout,
    #[error("engine search timed out")]
    EngineTimeout,
    #[error("engine subprocess died")]
    EngineDied,
    #[error("engine is not ready")]
    NotReady,
    #[error("UCI protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("engine pool has been shut down")]
    PoolUnavailable,
}

/// One candidate move returned by a completed search, still carrying only
/// engine-reported data (no classification label — that's applied by the
/// Suggestion Handler's external classifier).
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub multipv: u32,
    pub mv: String,
    pub pv: Vec<String>,
    pub depth: u32,
    pub eval: NormalizedEval,
}

/// Exactly one of `nodes`/`depth`/`movetime` per the spec's "exactly one"
/// constraint on `go`.
#[derive(Debug, Clone, Copy)]
pub enum SearchLimits {
    Nodes(u64),
    Depth(u32),
    MoveTimeMs(u64),
}

impl SearchLimits {
    fn go_command(self) -> String {
        match self {
            Self::Nodes(n) => format!("go nodes {n}"),
            Self::Depth(d) => format!("go depth {d}"),
            Self::MoveTimeMs(t) => format!("go movetime {t}"),
        }
    }
}

/// Either a starting position plus move history, or a raw FEN (§4.1: prefer
/// `startpos moves ...` when history is available to preserve repetition /
/// 50-move context).
#[derive(Debug, Clone)]
pub enum SearchPosition {
    StartposMoves(Vec<String>),
    Fen(String),
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub position: SearchPosition,
    pub side_to_move: Color,
    pub multi_pv: u32,
    pub limits: SearchLimits,
}

/// Binary path selection by `(os, arch, kind)`. Only the host's own
/// `(os, arch)` is ever looked up at runtime; this takes them as parameters
/// so it stays a pure, testable function.
pub fn engine_binary_path(
    binary_dir: &Path,
    os: &str,
    arch: &str,
    kind: EngineKind,
) -> Result<std::path::PathBuf, EngineError> {
    let supported = matches!(
        (os, arch),
        ("linux", "x86_64") | ("linux", "aarch64") | ("macos", "x86_64") | ("macos", "aarch64")
    );
    if !supported {
        return Err(EngineError::UnsupportedPlatform(format!("{os}/{arch}")));
    }
    let file_name = match kind {
        EngineKind::Suggestion => "suggestion-engine",
        EngineKind::Analysis => "analysis-engine",
    };
    Ok(binary_dir.join(format!("{file_name}-{os}-{arch}")))
}

enum Line {
    Text(String),
    Eof,
}

pub struct EngineProcess {
    pub id: u32,
    pub kind: EngineKind,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    lines: mpsc::Receiver<Line>,
    reader_task: tokio::task::JoinHandle<()>,
    ready: bool,
}

impl EngineProcess {
    /// Spawn the subprocess and run the `uci` / `uciok` handshake.
    pub async fn start(id: u32, kind: EngineKind, binary: &Path) -> Result<Self, EngineError> {
        let mut child = Command::new(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdin = BufWriter::new(child.stdin.take().ok_or(EngineError::Spawn(
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "engine stdin closed"),
        ))?);
        let stdout = BufReader::new(child.stdout.take().ok_or(EngineError::Spawn(
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "engine stdout closed"),
        ))?);

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let reader_task = tokio::spawn(read_lines(stdout, tx));

        let mut engine = Self {
            id,
            kind,
            child,
            stdin,
            lines: rx,
            reader_task,
            ready: false,
        };

        engine.send_command("uci").await?;
        engine
            .wait_for(HANDSHAKE_TIMEOUT, |line| line == "uciok")
            .await
            .map_err(|e| match e {
                EngineError::EngineTimeout => EngineError::HandshakeTimeout,
                other => other,
            })?;
        engine.ready = true;
        info!(engine_id = id, %kind, "engine ready");
        Ok(engine)
    }

    async fn send_command(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(engine_id = self.id, command = cmd, "-> engine");
        self.stdin
            .write_all(cmd.as_bytes())
            .await
            .map_err(EngineError::Io)?;
        self.stdin.write_all(b"\n").await.map_err(EngineError::Io)?;
        self.stdin.flush().await.map_err(EngineError::Io)
    }

    /// Read lines until `pred` matches one, or the UCI/search timeout fires.
    async fn wait_for(
        &mut self,
        max_wait: Duration,
        pred: impl Fn(&str) -> bool,
    ) -> Result<(), EngineError> {
        timeout(max_wait, async {
            loop {
                match self.lines.recv().await {
                    Some(Line::Text(line)) => {
                        if pred(&line) {
                            return Ok(());
                        }
                    }
                    Some(Line::Eof) | None => return Err(EngineError::EngineDied),
                }
            }
        })
        .await
        .unwrap_or(Err(EngineError::EngineTimeout))
    }

    /// `setoption name K value V` for each option, then `isready`/`readyok`.
    pub async fn configure(&mut self, options: &[(String, String)]) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        for (name, value) in options {
            self.send_command(&format!("setoption name {name} value {value}"))
                .await?;
        }
        self.send_command("isready").await?;
        self.wait_for(HANDSHAKE_TIMEOUT, |line| line == "readyok")
            .await
    }

    /// Run one search to completion and return the top-K candidates.
    pub async fn search(&mut self, req: SearchRequest) -> Result<Vec<RawCandidate>, EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        self.send_command("ucinewgame").await?;
        self.send_command("isready").await?;
        self.wait_for(HANDSHAKE_TIMEOUT, |line| line == "readyok")
            .await?;

        match &req.position {
            SearchPosition::StartposMoves(moves) if moves.is_empty() => {
                self.send_command("position startpos").await?;
            }
            SearchPosition::StartposMoves(moves) => {
                self.send_command(&format!("position startpos moves {}", moves.join(" ")))
                    .await?;
            }
            SearchPosition::Fen(fen) => {
                self.send_command(&format!("position fen {fen}")).await?;
            }
        }

        self.send_command(&req.limits.go_command()).await?;

        let result = timeout(SEARCH_TIMEOUT, self.collect_search(req.multi_pv, req.side_to_move)).await;
        match result {
            Ok(inner) => inner,
            Err(_) => {
                // Open question resolution (a): force the search to finish
                // rather than killing the engine outright.
                warn!(engine_id = self.id, "search timed out, sending stop");
                self.send_command("stop").await?;
                let forced = timeout(
                    HANDSHAKE_TIMEOUT,
                    self.collect_search(req.multi_pv, req.side_to_move),
                )
                .await;
                match forced {
                    Ok(Ok(candidates)) => Ok(candidates),
                    _ => Err(EngineError::EngineTimeout),
                }
            }
        }
    }

    async fn collect_search(
        &mut self,
        multi_pv: u32,
        side_to_move: Color,
    ) -> Result<Vec<RawCandidate>, EngineError> {
        use std::collections::HashMap;
        let mut by_multipv: HashMap<u32, RawCandidate> = HashMap::new();

        loop {
            match self.lines.recv().await {
                Some(Line::Text(line)) => {
                    if let Some((mv, _ponder)) = uci::parse_bestmove_line(&line) {
                        let _ = mv;
                        break;
                    }
                    if let Some(info) = uci::parse_info_line(&line) {
                        let Some(score) = info.score else { continue };
                        if info.pv.is_empty() {
                            continue;
                        }
                        let eval = uci::normalize_to_white(side_to_move, score, info.wdl_permille);
                        by_multipv.insert(
                            info.multipv,
                            RawCandidate {
                                multipv: info.multipv,
                                mv: info.pv[0].clone(),
                                pv: info.pv,
                                depth: info.depth.unwrap_or(0),
                                eval,
                            },
                        );
                    }
                }
                Some(Line::Eof) | None => return Err(EngineError::EngineDied),
            }
        }

        let mut candidates: Vec<RawCandidate> = by_multipv.into_values().collect();
        candidates.sort_by_key(|c| c.multipv);
        candidates.truncate(multi_pv.max(1) as usize);
        if candidates.is_empty() {
            return Err(EngineError::ProtocolViolation(
                "search produced bestmove with no info lines".into(),
            ));
        }
        Ok(candidates)
    }

    /// `quit` then terminate the subprocess.
    pub async fn stop(mut self) {
        let _ = self.send_command("quit").await;
        self.ready = false;
        self.reader_task.abort();
        let _ = tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await;
        let _ = self.child.start_kill();
    }
}

async fn read_lines(mut stdout: BufReader<tokio::process::ChildStdout>, tx: mpsc::Sender<Line>) {
    let mut buf = String::new();
    loop {
        buf.clear();
        match stdout.read_line(&mut buf).await {
            Ok(0) => {
                let _ = tx.send(Line::Eof).await;
                return;
            }
            Ok(_) => {
                let trimmed = buf.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(Line::Text(trimmed)).await.is_err() {
                    return;
                }
            }
            Err(_) => {
                let _ = tx.send(Line::Eof).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_path_rejects_unsupported_platform() {
        let err = engine_binary_path(Path::new("./engines"), "windows", "x86_64", EngineKind::Suggestion);
        assert!(matches!(err, Err(EngineError::UnsupportedPlatform(_))));
    }

    #[test]
    fn binary_path_supported_platform() {
        let path = engine_binary_path(Path::new("./engines"), "linux", "x86_64", EngineKind::Analysis)
            .expect("supported");
        assert_eq!(path, Path::new("./engines/analysis-engine-linux-x86_64"));
    }
}
