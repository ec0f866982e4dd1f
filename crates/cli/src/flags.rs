use clap::ValueEnum;
use contextpack_core::{SortKey, SortOrder, Strategy, TruncateMode};

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum StrategyFlag {
    Drop,
    Truncate,
    Hybrid,
}

impl StrategyFlag {
    pub(crate) const fn as_domain(self) -> Strategy {
        match self {
            StrategyFlag::Drop => Strategy::Drop,
            StrategyFlag::Truncate => Strategy::Truncate,
            StrategyFlag::Hybrid => Strategy::Hybrid,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum TruncateModeFlag {
    None,
    Simple,
    Smart,
    Structure,
}

impl TruncateModeFlag {
    pub(crate) const fn as_domain(self) -> TruncateMode {
        match self {
            TruncateModeFlag::None => TruncateMode::None,
            TruncateModeFlag::Simple => TruncateMode::Simple,
            TruncateModeFlag::Smart => TruncateMode::Smart,
            TruncateModeFlag::Structure => TruncateMode::Structure,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum SortKeyFlag {
    Name,
    Mtime,
    Ctime,
}

impl SortKeyFlag {
    pub(crate) const fn as_domain(self) -> SortKey {
        match self {
            SortKeyFlag::Name => SortKey::Name,
            SortKeyFlag::Mtime => SortKey::Mtime,
            SortKeyFlag::Ctime => SortKey::Ctime,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum SortOrderFlag {
    Asc,
    Desc,
}

impl SortOrderFlag {
    pub(crate) const fn as_domain(self) -> SortOrder {
        match self {
            SortOrderFlag::Asc => SortOrder::Asc,
            SortOrderFlag::Desc => SortOrder::Desc,
        }
    }
}
