pub type FileId = u64;

/// Source region of a syntax node.
///
/// `lo`/`hi` are byte offsets; `line`/`column` and `end_line`/`end_column` are 1-based
/// positions used by tooling queries. Trees assembled in code without a parser carry
/// [`Span::null`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span {
            file,
            lo,
            hi,
            ..Span::default()
        }
    }

    pub fn null() -> Span {
        Span::default()
    }

    /// A span covering `start..=end` as (line, column) pairs.
    pub fn lines(file: FileId, start: (u32, u32), end: (u32, u32)) -> Span {
        Span {
            file,
            lo: 0,
            hi: 0,
            line: start.0,
            column: start.1,
            end_line: end.0,
            end_column: end.1,
        }
    }

    pub fn is_null(&self) -> bool {
        self.lo == 0 && self.hi == 0 && self.line == 0
    }

    pub fn has_position(&self) -> bool {
        self.line != 0
    }

    pub fn contains(&self, line: u32, column: u32) -> bool {
        if !self.has_position() {
            return false;
        }
        let point = (line, column);
        (self.line, self.column) <= point && point <= (self.end_line, self.end_column)
    }

    /// True when `self` lies inside `other`, used to pick the innermost of two hits.
    pub fn within(&self, other: &Span) -> bool {
        (other.line, other.column) <= (self.line, self.column)
            && (self.end_line, self.end_column) <= (other.end_line, other.end_column)
    }
}
