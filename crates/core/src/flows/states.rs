use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answers::{FenceType, SurfaceSplit, TwoWaySplit, Wish};
use crate::flows::script::StepId;

/// Wish sub-flows that ask their own questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubFlow {
    Fencing,
    Decking,
    Irrigation,
}

impl SubFlow {
    /// Fixed visiting order.
    pub const PRIORITY: [SubFlow; 3] = [Self::Fencing, Self::Decking, Self::Irrigation];

    pub fn for_wish(wish: Wish) -> Option<Self> {
        match wish {
            Wish::Fencing => Some(Self::Fencing),
            Wish::Decking => Some(Self::Decking),
            Wish::Irrigation => Some(Self::Irrigation),
            Wish::Pool | Wish::Pond | Wish::Other => None,
        }
    }

    pub fn entry_step(self) -> StepId {
        match self {
            Self::Fencing => StepId::FenceTypes,
            Self::Decking => StepId::DeckingTier,
            Self::Irrigation => StepId::IrrigationScope,
        }
    }
}

/// Sub-flows still to visit. The front entry is the one in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQueue(VecDeque<SubFlow>);

impl PendingQueue {
    pub fn from_wishes(wishes: &[Wish]) -> Self {
        let selected: Vec<SubFlow> = wishes.iter().copied().filter_map(SubFlow::for_wish).collect();
        Self(SubFlow::PRIORITY.into_iter().filter(|flow| selected.contains(flow)).collect())
    }

    pub fn current(&self) -> Option<SubFlow> {
        self.0.front().copied()
    }

    /// Finishes the current sub-flow and returns the next one, if any.
    pub fn finish_current(&mut self) -> Option<SubFlow> {
        self.0.pop_front();
        self.current()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FenceStage {
    Length,
    Gate { length_m: Decimal },
}

/// Position inside the repeatable fencing sub-flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FenceCursor {
    pub current: FenceType,
    pub stage: FenceStage,
    pub remaining: VecDeque<FenceType>,
}

impl FenceCursor {
    pub fn start(mut types: VecDeque<FenceType>) -> Option<Self> {
        let current = types.pop_front()?;
        Some(Self { current, stage: FenceStage::Length, remaining: types })
    }

    /// Cursor for the next selected type, or `None` when all are visited.
    pub fn next(&self) -> Option<Self> {
        Self::start(self.remaining.clone())
    }
}

/// A custom split awaiting the customer's confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingSplit {
    PavingGreen(TwoWaySplit),
    LawnPlanting(TwoWaySplit),
    Surfaces(SurfaceSplit),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    At(StepId),
    /// Driveway share entered, waiting for the paths share.
    PathsShare { driveway_pct: u8 },
    Confirm(PendingSplit),
    Fence(FenceCursor),
    Complete,
}

impl Cursor {
    pub fn step_id(&self) -> Option<StepId> {
        match self {
            Self::At(step) => Some(*step),
            Self::PathsShare { .. } => Some(StepId::PathsPct),
            Self::Confirm(PendingSplit::PavingGreen(_)) => Some(StepId::PavingGreenConfirm),
            Self::Confirm(PendingSplit::LawnPlanting(_)) => Some(StepId::LawnPlantingConfirm),
            Self::Confirm(PendingSplit::Surfaces(_)) => Some(StepId::SurfaceConfirm),
            Self::Fence(FenceCursor { stage: FenceStage::Length, .. }) => Some(StepId::FenceLength),
            Self::Fence(FenceCursor { stage: FenceStage::Gate { .. }, .. }) => {
                Some(StepId::FenceGate)
            }
            Self::Complete => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub cursor: Cursor,
    pub pending: PendingQueue,
}

impl Default for FlowState {
    fn default() -> Self {
        Self { cursor: Cursor::At(StepId::GardenArea), pending: PendingQueue::default() }
    }
}

impl FlowState {
    pub fn is_complete(&self) -> bool {
        self.cursor == Cursor::Complete
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::{FenceCursor, FenceStage, PendingQueue, SubFlow};
    use crate::domain::answers::{FenceType, Wish};

    #[test]
    fn pending_queue_uses_fixed_priority_not_selection_order() {
        let mut queue =
            PendingQueue::from_wishes(&[Wish::Irrigation, Wish::Pond, Wish::Fencing]);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.current(), Some(SubFlow::Fencing));
        assert_eq!(queue.finish_current(), Some(SubFlow::Irrigation));
        assert_eq!(queue.finish_current(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn fence_cursor_walks_selected_types_in_order() {
        let cursor = FenceCursor::start(VecDeque::from([FenceType::DesignScreen, FenceType::Hedge]))
            .expect("two types selected");
        assert_eq!(cursor.current, FenceType::DesignScreen);
        assert_eq!(cursor.stage, FenceStage::Length);

        let next = cursor.next().expect("hedge remains");
        assert_eq!(next.current, FenceType::Hedge);
        assert!(next.next().is_none());
    }
}
