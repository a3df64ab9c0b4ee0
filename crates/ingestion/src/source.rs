//! Inbound message sources
//!
//! The broker itself is external. A bridge delivers messages as JSON lines
//! (file or stdin); tests feed messages from memory.

use std::path::PathBuf;

use async_channel::Sender;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, warn};

use contracts::RouterError;

use crate::message::RawMessage;

/// Where JSON-lines messages come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Stdin,
    File(PathBuf),
}

/// Reads one message per line and forwards it to the ingestion channel
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    input: LineInput,
}

impl JsonLinesSource {
    pub fn new(input: LineInput) -> Self {
        Self { input }
    }

    /// `-` selects stdin
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::new(LineInput::Stdin)
        } else {
            Self::new(LineInput::File(PathBuf::from(arg)))
        }
    }

    /// Read until EOF or until the receiving side closes.
    ///
    /// Unparseable lines are logged and skipped. Returns the number of
    /// messages forwarded.
    #[instrument(name = "json_lines_source_run", skip(self, tx), fields(input = ?self.input))]
    pub async fn run(self, tx: Sender<RawMessage>) -> Result<u64, RouterError> {
        match self.input {
            LineInput::Stdin => forward_lines(BufReader::new(tokio::io::stdin()), tx).await,
            LineInput::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                forward_lines(BufReader::new(file), tx).await
            }
        }
    }
}

async fn forward_lines<R>(reader: R, tx: Sender<RawMessage>) -> Result<u64, RouterError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut forwarded = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match RawMessage::from_json_line(&line) {
            Ok(message) => {
                if tx.send(message).await.is_err() {
                    debug!(line = line_no, "ingestion channel closed, stopping source");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping unparseable message line");
            }
        }
    }

    info!(forwarded, "message source exhausted");
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_source_skips_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"headers": {{"org.fcrepo.jms.identifier": "/a"}}}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"headers": {{"org.fcrepo.jms.identifier": "/b"}}}}"#).unwrap();

        let (tx, rx) = async_channel::bounded(10);
        let source = JsonLinesSource::new(LineInput::File(file.path().to_path_buf()));
        let forwarded = source.run(tx).await.unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(rx.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let (tx, _rx) = async_channel::bounded(1);
        let source = JsonLinesSource::from_arg("/nonexistent/relay/input.jsonl");
        assert!(matches!(source.run(tx).await, Err(RouterError::Io(_))));
    }
}
