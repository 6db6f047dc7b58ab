use crate::attributes::AttributeSet;
use crate::error::{FatError, Result};

/// Size of the kernel's dirent name slot; names must be strictly shorter.
pub const DEFAULT_MAX_NAME_LEN: usize = 256;

/// What a run does to each path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// No change requested: print attributes.
    Print,
    /// Add and/or remove attribute bits.
    Modify,
}

/// Configuration for one fatattr run.
#[derive(Debug, Clone)]
pub struct FatattrConfig {
    /// Bits to set on every processed path.
    pub attrs_to_add: AttributeSet,
    /// Bits to clear on every processed path. Disjoint from `attrs_to_add`.
    pub attrs_to_remove: AttributeSet,
    /// Descend into directories below the top level.
    pub recursive: bool,
    /// Print before/after attributes in Modify mode.
    pub verbose: bool,
    /// Entry names of this length or longer are rejected.
    pub max_name_len: usize,
}

impl FatattrConfig {
    pub fn builder() -> FatattrConfigBuilder {
        FatattrConfigBuilder {
            attrs_to_add: AttributeSet::empty(),
            attrs_to_remove: AttributeSet::empty(),
            recursive: false,
            verbose: false,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }

    pub fn mode(&self) -> RunMode {
        if self.attrs_to_add.is_empty() && self.attrs_to_remove.is_empty() {
            RunMode::Print
        } else {
            RunMode::Modify
        }
    }

    /// Whether a directory named on the command line has its entries processed.
    ///
    /// Printing always lists top-level directories; modifying only descends
    /// when recursion was asked for.
    pub fn top_level_descent(&self) -> bool {
        match self.mode() {
            RunMode::Print => true,
            RunMode::Modify => self.recursive,
        }
    }
}

/// Builder for [`FatattrConfig`].
#[derive(Debug, Clone)]
pub struct FatattrConfigBuilder {
    attrs_to_add: AttributeSet,
    attrs_to_remove: AttributeSet,
    recursive: bool,
    verbose: bool,
    max_name_len: usize,
}

impl FatattrConfigBuilder {
    pub fn add(mut self, attrs: AttributeSet) -> Self {
        self.attrs_to_add |= attrs;
        self
    }

    pub fn remove(mut self, attrs: AttributeSet) -> Self {
        self.attrs_to_remove |= attrs;
        self
    }

    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    pub fn verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }

    pub fn max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len.max(1);
        self
    }

    /// Finish the config. Rejects a bit that is both added and removed.
    pub fn build(self) -> Result<FatattrConfig> {
        if self.attrs_to_add.intersects(self.attrs_to_remove) {
            return Err(FatError::OverlappingChanges);
        }
        Ok(FatattrConfig {
            attrs_to_add: self.attrs_to_add,
            attrs_to_remove: self.attrs_to_remove,
            recursive: self.recursive,
            verbose: self.verbose,
            max_name_len: self.max_name_len,
        })
    }
}
