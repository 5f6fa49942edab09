//! Source regions collected from the frontend.

use std::fmt;

use covmap_ir::FunctionId;

/// What a source region represents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceRegionKind {
    /// Executable code counted by the region's own counter.
    Code,
    /// Whitespace between code regions, e.g. after a `return`.
    Gap,
    /// Site that pulls in the regions of another file.
    Expansion { expanded_file: String },
}

impl SourceRegionKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::Gap => "Gap",
            Self::Expansion { .. } => "Expansion",
        }
    }
}

/// A span in a source file, 1-based and inclusive of its start.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceRegion {
    pub file: String,
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
    pub kind: SourceRegionKind,
}

impl SourceRegion {
    pub fn new(
        file: impl Into<String>,
        (line_start, column_start): (u32, u32),
        (line_end, column_end): (u32, u32),
        kind: SourceRegionKind,
    ) -> Self {
        Self {
            file: file.into(),
            line_start,
            column_start,
            line_end,
            column_end,
            kind,
        }
    }

    pub fn code(file: impl Into<String>, start: (u32, u32), end: (u32, u32)) -> Self {
        Self::new(file, start, end, SourceRegionKind::Code)
    }

    pub fn gap(file: impl Into<String>, start: (u32, u32), end: (u32, u32)) -> Self {
        Self::new(file, start, end, SourceRegionKind::Gap)
    }

    pub fn expansion(
        file: impl Into<String>,
        start: (u32, u32),
        end: (u32, u32),
        expanded_file: impl Into<String>,
    ) -> Self {
        let expanded_file = expanded_file.into();
        Self::new(file, start, end, SourceRegionKind::Expansion { expanded_file })
    }
}

impl fmt::Display for SourceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if let SourceRegionKind::Expansion { expanded_file } = &self.kind {
            write!(f, " expand to {expanded_file}")?;
        }
        write!(
            f,
            ": {} {}, {} -> {}, {}",
            self.kind.name(),
            self.line_start,
            self.column_start,
            self.line_end,
            self.column_end
        )
    }
}

/// Regions of one function. A region's counter is its index in `regions`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionRegions {
    /// PGO name of the function.
    pub symbol: String,
    /// The function's definition in the module, once it exists.
    pub function: Option<FunctionId>,
    pub structural_hash: u64,
    pub regions: Vec<SourceRegion>,
}

impl FunctionRegions {
    pub fn new(symbol: impl Into<String>, regions: Vec<SourceRegion>) -> Self {
        Self {
            symbol: symbol.into(),
            function: None,
            structural_hash: 0,
            regions,
        }
    }

    #[must_use]
    pub const fn with_function(mut self, function: FunctionId) -> Self {
        self.function = Some(function);
        self
    }

    #[must_use]
    pub const fn with_structural_hash(mut self, hash: u64) -> Self {
        self.structural_hash = hash;
        self
    }

    /// Multi-line listing of the regions, for debug logs.
    pub fn dump(&self) -> String {
        let mut out = format!("{} regions:", self.symbol);
        for (index, region) in self.regions.iter().enumerate() {
            out.push_str(&format!("\n  #{index} -> ({region})"));
        }
        out
    }
}

/// Functions collected from one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRegionInfo {
    pub file: String,
    /// Module (library) the file belongs to.
    pub module: String,
    pub functions: Vec<FunctionRegions>,
}

impl FileRegionInfo {
    pub fn new(
        file: impl Into<String>,
        module: impl Into<String>,
        functions: Vec<FunctionRegions>,
    ) -> Self {
        Self {
            file: file.into(),
            module: module.into(),
            functions,
        }
    }
}
