//! Source regions.

use std::cmp::Ordering;
use std::fmt;

use crate::counter::Counter;

/// Role of a region in the coverage map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Executable code measured by the region's counter.
    Code,
    /// Non-executable span inside a counted region (whitespace, comments).
    Gap,
    /// Site of a macro or inlined-file expansion.
    Expansion { expanded_file_id: u32 },
    /// Code compiled out (e.g. conditional compilation).
    Skip,
}

impl RegionKind {
    /// Position among regions sharing the same start and end.
    pub const fn sort_priority(self) -> u8 {
        match self {
            Self::Expansion { .. } => 0,
            Self::Code => 1,
            Self::Gap => 2,
            Self::Skip => 3,
        }
    }

    /// Kind name used in logs and dumps.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::Gap => "Gap",
            Self::Expansion { .. } => "Expansion",
            Self::Skip => "Skip",
        }
    }
}

/// A source span with the counter measuring it.
///
/// Lines and columns are 1-based. `file_id` (and the expansion target) name
/// files by the ids listed in the function's file id mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub file_id: u32,
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
    /// Ignored for expansion and skipped regions.
    pub counter: Counter,
    pub kind: RegionKind,
}

impl Region {
    pub const fn new(
        file_id: u32,
        (line_start, column_start): (u32, u32),
        (line_end, column_end): (u32, u32),
        counter: Counter,
        kind: RegionKind,
    ) -> Self {
        Self {
            file_id,
            line_start,
            column_start,
            line_end,
            column_end,
            counter,
            kind,
        }
    }

    /// Region of executed code counted by `counter`.
    pub const fn code(file_id: u32, start: (u32, u32), end: (u32, u32), counter: Counter) -> Self {
        Self::new(file_id, start, end, counter, RegionKind::Code)
    }

    /// Whitespace between code regions; llvm-cov skips it when picking
    /// a line's count.
    pub const fn gap(file_id: u32, start: (u32, u32), end: (u32, u32), counter: Counter) -> Self {
        Self::new(file_id, start, end, counter, RegionKind::Gap)
    }

    /// Macro or inline expansion whose body lives in `expanded_file_id`.
    pub const fn expansion(
        file_id: u32,
        start: (u32, u32),
        end: (u32, u32),
        expanded_file_id: u32,
    ) -> Self {
        Self::new(
            file_id,
            start,
            end,
            Counter::Zero,
            RegionKind::Expansion { expanded_file_id },
        )
    }

    /// Skipped source such as inactive preprocessor blocks. Carries no counter.
    pub const fn skip(file_id: u32, start: (u32, u32), end: (u32, u32)) -> Self {
        Self::new(file_id, start, end, Counter::Zero, RegionKind::Skip)
    }

    /// `(line, column)` where the region starts.
    pub const fn start(&self) -> (u32, u32) {
        (self.line_start, self.column_start)
    }

    /// `(line, column)` where the region ends.
    pub const fn end(&self) -> (u32, u32) {
        (self.line_end, self.column_end)
    }

    /// Order within one file: start, then end, then kind priority.
    pub fn cmp_position(&self, other: &Self) -> Ordering {
        self.start()
            .cmp(&other.start())
            .then_with(|| self.end().cmp(&other.end()))
            .then_with(|| self.kind.sort_priority().cmp(&other.kind.sort_priority()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file {}", self.file_id)?;
        if let RegionKind::Expansion { expanded_file_id } = self.kind {
            write!(f, " expand to {expanded_file_id}")?;
        }
        write!(
            f,
            ": {} {}:{} -> {}:{}",
            self.kind.name(),
            self.line_start,
            self.column_start,
            self.line_end,
            self.column_end
        )?;
        if matches!(self.kind, RegionKind::Code | RegionKind::Gap) {
            write!(f, " ({})", self.counter)?;
        }
        Ok(())
    }
}
