//! Global variables.

use crate::constant::Constant;
use crate::types::Type;

/// Handle to a global variable inside a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

/// Symbol linkage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    #[default]
    External,
    AvailableExternally,
    LinkOnceAny,
    LinkOnceOdr,
    WeakAny,
    WeakOdr,
    Internal,
    Private,
    ExternalWeak,
}

impl Linkage {
    /// Local symbols are not visible outside their object file.
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Internal | Self::Private)
    }

    pub const fn is_link_once(self) -> bool {
        matches!(self, Self::LinkOnceAny | Self::LinkOnceOdr)
    }
}

/// Symbol visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
}

/// Global variable definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalVar {
    pub name: String,
    pub ty: Type,
    pub initializer: Constant,
    pub linkage: Linkage,
    pub visibility: Visibility,
    /// Read-only data.
    pub constant: bool,
    /// Object file section, if pinned.
    pub section: Option<String>,
    /// Alignment in bytes, if explicit.
    pub alignment: Option<u32>,
    /// COMDAT group name.
    pub comdat: Option<String>,
}

impl GlobalVar {
    /// Create a constant global whose type is taken from the initializer.
    pub fn constant(name: impl Into<String>, initializer: Constant, linkage: Linkage) -> Self {
        Self {
            name: name.into(),
            ty: initializer.ty(),
            initializer,
            linkage,
            visibility: Visibility::Default,
            constant: true,
            section: None,
            alignment: None,
            comdat: None,
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    #[must_use]
    pub const fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = Some(alignment);
        self
    }

    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_comdat(mut self, comdat: impl Into<String>) -> Self {
        self.comdat = Some(comdat.into());
        self
    }
}
