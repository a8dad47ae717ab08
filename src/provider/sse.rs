//! Incremental parser for `text/event-stream` bodies.

/// Buffers partial chunks and emits the data payload of each complete
/// event. Event-type and comment lines are ignored; the completion API
/// only uses `data:` lines.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the data payloads of any complete events.
    ///
    /// Events are delimited by a blank line; multiple `data:` lines in one
    /// event are joined with newlines.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.find("\n\n") {
            let event: String = self.buffer.drain(..pos + 2).collect();

            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }

        payloads
    }

    /// Whether a partial event is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}
