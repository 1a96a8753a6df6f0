//! Table events - facts emitted by the order manager after each committed mutation

use super::snapshot::TableOrder;
use super::types::{OrderLine, TableNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table event
///
/// Every variant carries the full post-mutation order so an observer can
/// apply it without any prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableEvent {
    /// 开台: first lines sent to an empty table
    Created { order: TableOrder },
    /// 加菜: lines appended to an active order
    Grown {
        order: TableOrder,
        added: Vec<OrderLine>,
    },
    /// 结台/清台: order closed, table is empty again
    Closed { order: TableOrder },
    /// 换台: order moved from `source` to `target`
    Transferred {
        source: TableNumber,
        target: TableNumber,
        order: TableOrder,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableEventKind {
    Created,
    Grown,
    Closed,
    Transferred,
}

impl fmt::Display for TableEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Grown => write!(f, "GROWN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Transferred => write!(f, "TRANSFERRED"),
        }
    }
}

impl TableEvent {
    pub fn kind(&self) -> TableEventKind {
        match self {
            Self::Created { .. } => TableEventKind::Created,
            Self::Grown { .. } => TableEventKind::Grown,
            Self::Closed { .. } => TableEventKind::Closed,
            Self::Transferred { .. } => TableEventKind::Transferred,
        }
    }

    pub fn order(&self) -> &TableOrder {
        match self {
            Self::Created { order }
            | Self::Grown { order, .. }
            | Self::Closed { order }
            | Self::Transferred { order, .. } => order,
        }
    }

    /// Tables whose state this event changes
    pub fn tables(&self) -> Vec<TableNumber> {
        match self {
            Self::Transferred { source, target, .. } => vec![*source, *target],
            other => vec![other.order().table_number],
        }
    }
}
