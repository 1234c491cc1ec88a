use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Buffered line-by-line iteration.
    Lines,
    /// Fixed-size byte chunks; memory stays bounded by the chunk size plus the
    /// longest line.
    Chunked { chunk_size: usize },
}

/// Reassembles lines from arbitrarily split byte chunks.
///
/// Splitting happens on raw bytes so a UTF-8 sequence cut by a chunk boundary
/// is decoded only once it is whole.
#[derive(Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends completed lines from `chunk` to `out`, keeping the unterminated tail.
    pub fn push(&mut self, chunk: &[u8], out: &mut VecDeque<String>) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            if self.pending.is_empty() {
                out.push_back(decode(strip_cr(head)));
            } else {
                self.pending.extend_from_slice(head);
                out.push_back(decode(strip_cr(&self.pending)));
                self.pending.clear();
            }
            rest = &tail[1..];
        }
        self.pending.extend_from_slice(rest);
    }

    /// Flushes whatever is left after the last newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

struct ChunkedReader {
    file: File,
    buf: Vec<u8>,
    splitter: LineSplitter,
    ready: VecDeque<String>,
}

impl ChunkedReader {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            let n = self.file.read(&mut self.buf).await?;
            if n == 0 {
                return Ok(self.splitter.finish());
            }
            self.splitter.push(&self.buf[..n], &mut self.ready);
        }
    }
}

enum State {
    Lines(Lines<BufReader<File>>),
    Chunked(ChunkedReader),
    Done,
}

/// Lines of one log file, read lazily.
///
/// Any I/O failure is written to stderr with the path, remembered for
/// [`LineSource::into_error`], and ends the sequence. Lines already yielded stay valid.
pub struct LineSource {
    path: PathBuf,
    state: State,
    lines_read: u64,
    error: Option<String>,
}

impl LineSource {
    pub async fn open(path: &Path, strategy: ReadStrategy) -> Self {
        let mut source = Self {
            path: path.to_path_buf(),
            state: State::Done,
            lines_read: 0,
            error: None,
        };
        match open_state(path, strategy).await {
            Ok(state) => source.state = state,
            Err(e) => source.fail(e),
        }
        source
    }

    pub async fn next_line(&mut self) -> Option<String> {
        let next = match &mut self.state {
            State::Done => return None,
            State::Lines(lines) => lines.next_line().await,
            State::Chunked(reader) => reader.next_line().await,
        };
        match next {
            Ok(Some(line)) => {
                self.lines_read += 1;
                Some(line)
            }
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn into_error(self) -> Option<String> {
        self.error
    }

    fn fail(&mut self, e: io::Error) {
        eprintln!("[logtally] {}: {e}", self.path.display());
        self.error = Some(e.to_string());
        self.state = State::Done;
    }
}

async fn open_state(path: &Path, strategy: ReadStrategy) -> io::Result<State> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.is_dir() {
        return Err(io::Error::other("is a directory"));
    }
    let file = File::open(path).await?;
    Ok(match strategy {
        ReadStrategy::Lines => State::Lines(BufReader::new(file).lines()),
        ReadStrategy::Chunked { chunk_size } => State::Chunked(ChunkedReader {
            file,
            buf: vec![0; chunk_size.max(1)],
            splitter: LineSplitter::new(),
            ready: VecDeque::new(),
        }),
    })
}
