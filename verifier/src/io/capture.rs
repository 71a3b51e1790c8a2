//! Arrival-ordered capture of child stdout/stderr.

/// Which pipe a chunk arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Accumulates output chunks until the first terminal event freezes it.
///
/// The accumulator is owned by the executor's select loop, which is the only
/// place chunks and terminal events are processed, so checking and clearing
/// `capturing` needs no lock.
#[derive(Debug)]
pub struct OutputAccumulator {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    combined: Vec<u8>,
    capturing: bool,
    dropped_chunks: usize,
}

/// Frozen accumulator contents, lossily decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub combined: String,
}

impl Default for OutputAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            combined: Vec::new(),
            capturing: true,
            dropped_chunks: 0,
        }
    }

    /// Append a chunk. Returns `false` (and discards the chunk) once frozen.
    pub fn push(&mut self, stream: StreamKind, chunk: &[u8]) -> bool {
        if !self.capturing {
            self.dropped_chunks += 1;
            return false;
        }
        match stream {
            StreamKind::Stdout => self.stdout.extend_from_slice(chunk),
            StreamKind::Stderr => self.stderr.extend_from_slice(chunk),
        }
        self.combined.extend_from_slice(chunk);
        true
    }

    /// Stop capturing. Idempotent.
    pub fn freeze(&mut self) {
        self.capturing = false;
    }

    /// Chunks rejected after the freeze point.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped_chunks
    }

    /// Freeze and decode. Chunks are concatenated as bytes before decoding so
    /// multi-byte characters split across reads survive intact.
    pub fn finish(mut self) -> CapturedOutput {
        self.freeze();
        CapturedOutput {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            combined: String::from_utf8_lossy(&self.combined).into_owned(),
        }
    }
}
