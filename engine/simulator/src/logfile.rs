//! The XML simulation log.
//!
//! A scoped, indent-tracking writer producing one `<simulation>` document:
//! an `<iteration index="…">` per iteration, a `<playahead>` per candidate,
//! and `<ply>` elements inside it. One tab per nesting level. The header
//! and footer are idempotent, and the footer is guaranteed on drop so an
//! aborted batch still leaves well-formed output.
//!
//! Rollouts never touch the sink directly: they render their `<ply>`
//! elements into a per-message buffer (see [`PlyElement`]) and the
//! simulator writes whole elements during incorporation.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use game_core::Move;

/// Nesting depth of `<ply>` elements inside the document.
const PLY_DEPTH: usize = 3;

/// Indent-tracking writer for the simulation log.
pub struct XmlLog {
    writer: Box<dyn Write + Send>,
    has_header: bool,
    failed: bool,
}

impl XmlLog {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            has_header: false,
            failed: false,
        }
    }

    /// Open a log file, truncating or appending.
    pub fn to_file(path: &Path, append: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    fn line(&mut self, depth: usize, text: &str) {
        if self.failed {
            return;
        }
        let result = (|| -> io::Result<()> {
            for _ in 0..depth {
                self.writer.write_all(b"\t")?;
            }
            self.writer.write_all(text.as_bytes())?;
            self.writer.write_all(b"\n")
        })();
        if let Err(err) = result {
            warn!(%err, "simulation log write failed, disabling log");
            self.failed = true;
        }
    }

    fn raw(&mut self, text: &str) {
        if self.failed {
            return;
        }
        if let Err(err) = self.writer.write_all(text.as_bytes()) {
            warn!(%err, "simulation log write failed, disabling log");
            self.failed = true;
        }
    }

    /// Write the document header once.
    pub fn write_header(&mut self) {
        if !self.has_header {
            self.line(0, "<simulation>");
            self.has_header = true;
        }
    }

    /// Close the document; a no-op when no header is open.
    pub fn write_footer(&mut self) {
        if self.has_header {
            self.line(0, "</simulation>");
            self.has_header = false;
            if !self.failed {
                let _ = self.writer.flush();
            }
        }
    }

    pub fn begin_iteration(&mut self, index: u64) {
        self.write_header();
        self.line(1, &format!("<iteration index=\"{index}\">"));
    }

    pub fn end_iteration(&mut self) {
        self.line(1, "</iteration>");
    }

    /// Write one candidate's element: the buffered plies and, on actual
    /// game termination, the final win indicator.
    pub fn playahead(&mut self, plies: &str, gameover_win: Option<f64>) {
        self.line(2, "<playahead>");
        self.raw(plies);
        if let Some(win) = gameover_win {
            self.line(PLY_DEPTH, &format!("<gameover win=\"{win}\"/>"));
        }
        self.line(2, "</playahead>");
    }

    pub fn close(&mut self) {
        self.write_footer();
    }
}

impl Drop for XmlLog {
    fn drop(&mut self) {
        self.write_footer();
    }
}

impl std::fmt::Debug for XmlLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlLog")
            .field("has_header", &self.has_header)
            .field("failed", &self.failed)
            .finish()
    }
}

/// One `<ply>` element, rendered into a rollout's message buffer.
#[derive(Debug)]
pub(crate) struct PlyElement {
    index: usize,
    rack: String,
    mv: String,
    player_consideration: Option<f64>,
    shared_consideration: Option<f64>,
}

impl PlyElement {
    pub fn new(index: usize, rack: String, mv: &Move) -> Self {
        let letters: String = mv.tiles().iter().map(|t| t.letter()).collect();
        let mut line = format!("<move action=\"{}\"", mv.action());
        if !letters.is_empty() {
            line.push_str(&format!(" tiles=\"{letters}\""));
        }
        line.push_str(&format!(" score=\"{}\"", mv.score));
        if mv.is_bingo {
            line.push_str(" bingo=\"true\"");
        }
        line.push_str("/>");

        Self {
            index,
            rack,
            mv: line,
            player_consideration: None,
            shared_consideration: None,
        }
    }

    pub fn player_consideration(&mut self, value: f64) {
        self.player_consideration = Some(value);
    }

    pub fn shared_consideration(&mut self, value: f64) {
        self.shared_consideration = Some(value);
    }

    pub fn render_into(&self, out: &mut String) {
        let tabs = "\t".repeat(PLY_DEPTH);
        out.push_str(&format!("{tabs}<ply index=\"{}\">\n", self.index));
        out.push_str(&format!("{tabs}\t<rack tiles=\"{}\"/>\n", self.rack));
        out.push_str(&format!("{tabs}\t{}\n", self.mv));
        if let Some(value) = self.player_consideration {
            out.push_str(&format!("{tabs}\t<pc value=\"{value}\"/>\n"));
        }
        if let Some(value) = self.shared_consideration {
            out.push_str(&format!("{tabs}\t<sc value=\"{value}\"/>\n"));
        }
        out.push_str(&format!("{tabs}</ply>\n"));
    }
}
