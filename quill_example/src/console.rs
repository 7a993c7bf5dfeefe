use quill_llm::{ChatHost, ChatMessage};
use std::io::{self, Stdout, Write};

/// Terminal chat view.
///
/// Streamed text is printed as it grows: each partial update writes only the
/// characters not yet on screen. Completed messages are collected in
/// `appended` for the caller to move into its history.
pub struct ConsoleHost<W = Stdout> {
    out: W,
    shown: usize,
    streamed: bool,
    pub appended: Vec<ChatMessage>,
}

impl ConsoleHost<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: 0,
            streamed: false,
            appended: Vec::new(),
        }
    }

    /// Move the collected messages out, leaving the host empty
    pub fn take_appended(&mut self) -> Vec<ChatMessage> {
        std::mem::take(&mut self.appended)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        // Terminal write failures are ignored
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> ChatHost for ConsoleHost<W> {
    fn append_message(&mut self, message: ChatMessage) {
        // Buffered replies never printed a partial, so show them whole
        if !self.streamed && message.visible && !message.text.is_empty() {
            let text = format!("{}\n", message.text);
            self.write(&text);
        }
        self.appended.push(message);
    }

    fn update_partial(&mut self, text: &str) {
        if text.is_empty() {
            if self.streamed {
                self.write("\n");
            }
            self.shown = 0;
            self.streamed = false;
            return;
        }

        let suffix = text.get(self.shown..).unwrap_or(text).to_string();
        self.write(&suffix);
        self.shown = text.len();
        self.streamed = true;
    }

    fn notify(&mut self, notice: &str) {
        // A failed stream leaves its partial on screen; end that line
        if self.streamed {
            self.write("\n");
        }
        self.shown = 0;
        self.streamed = false;
        eprintln!("! {}", notice);
    }
}
