//! Indentation-tracking text sink shared by every emission routine (spec
//! §4.8: "the emitter maintains no state beyond indent level and 'last
//! element kind'"). Modeled as a thin wrapper over a `String` rather than
//! the element/visitor hierarchy `cgen`'s generator uses, since this
//! emitter renders directly to text instead of building an intermediate
//! tree of `Element`s first.

use crate::options::{BracePlacement, Options};

/// The kind of the most recently emitted top-level item, tracked only to
/// decide whether a blank line separates it from the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastElementKind {
    None,
    Include,
    ContainerDeclaration,
    Macro,
    TypeDeclaration,
    ForwardDeclaration,
    GlobalVariable,
    FunctionBody,
}

pub struct Writer<'a> {
    pub options: &'a Options,
    buf: String,
    depth: usize,
    pub last: LastElementKind,
}

impl<'a> Writer<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            options,
            buf: String::new(),
            depth: 0,
            last: LastElementKind::None,
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn pad(&mut self) {
        for _ in 0..self.depth * self.options.indent_width {
            self.buf.push(' ');
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.pad();
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Separator between distinct top-level element groups: a
    /// blank line when the previous group differs in kind from `next`, none
    /// when the sequence is uninterrupted.
    pub fn separate(&mut self, next: LastElementKind) {
        if self.last != LastElementKind::None && self.last != next {
            self.blank();
        }
        self.last = next;
    }

    /// Opens a brace-delimited block, honoring `brace_placement`.
    pub fn open_block(&mut self, header: &str) {
        self.pad();
        match self.options.brace_placement {
            BracePlacement::Attach => {
                self.buf.push_str(header);
                self.buf.push_str(" {\n");
            }
            BracePlacement::NextLine => {
                self.buf.push_str(header);
                self.buf.push('\n');
                self.pad();
                self.buf.push_str("{\n");
            }
        }
        self.indent();
    }

    pub fn close_block(&mut self) {
        self.dedent();
        self.pad();
        self.buf.push_str("}\n");
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
