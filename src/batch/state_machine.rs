use crate::core::error::CropError;

/// 跳过原因，对应单张图片的可恢复失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DecodeFailure,
    NotFound,
    DegenerateCrop,
    ArchiveFailure,
}

impl SkipReason {
    /// 把单张图片的错误归类；致命错误返回 None
    pub fn from_error(err: &CropError) -> Option<Self> {
        match err {
            CropError::Decode(_) | CropError::Io(_) => Some(SkipReason::DecodeFailure),
            CropError::NotFound => Some(SkipReason::NotFound),
            CropError::DegenerateCrop | CropError::Encode(_) => Some(SkipReason::DegenerateCrop),
            CropError::Archive(_) => Some(SkipReason::ArchiveFailure),
            CropError::Config(_) => Some(SkipReason::DecodeFailure),
            CropError::ArchiveMisuse(_) | CropError::InvalidTransition(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Analyzed,
    Reviewed,
    Finalized,
    Archived,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEvent {
    Analyze,
    Review,
    Finalize,
    Archive,
    Fail(SkipReason),
}

impl ItemState {
    pub fn new() -> Self {
        ItemState::Pending
    }

    /// 非法顺序是流水线编排错误，直接返回致命错误
    pub fn transition(&self, event: ItemEvent) -> Result<ItemState, CropError> {
        match (self, event) {
            (ItemState::Pending, ItemEvent::Analyze) => Ok(ItemState::Analyzed),
            (ItemState::Analyzed, ItemEvent::Review) => Ok(ItemState::Reviewed),
            (ItemState::Analyzed | ItemState::Reviewed, ItemEvent::Finalize) => {
                Ok(ItemState::Finalized)
            }
            (ItemState::Finalized, ItemEvent::Archive) => Ok(ItemState::Archived),
            (state, ItemEvent::Fail(reason)) if !state.is_terminal() => {
                Ok(ItemState::Skipped(reason))
            }
            (state, event) => Err(CropError::InvalidTransition(format!(
                "{:?} -> {:?}",
                state, event
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Archived | ItemState::Skipped(_))
    }
}

impl Default for ItemState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_review() {
        let mut state = ItemState::new();
        for event in [
            ItemEvent::Analyze,
            ItemEvent::Review,
            ItemEvent::Finalize,
            ItemEvent::Archive,
        ] {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, ItemState::Archived);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_review_is_optional() {
        let state = ItemState::Pending
            .transition(ItemEvent::Analyze)
            .unwrap()
            .transition(ItemEvent::Finalize)
            .unwrap();
        assert_eq!(state, ItemState::Finalized);
    }

    #[test]
    fn test_skip_from_pending_and_analyzed() {
        let skipped = ItemState::Pending
            .transition(ItemEvent::Fail(SkipReason::DecodeFailure))
            .unwrap();
        assert_eq!(skipped, ItemState::Skipped(SkipReason::DecodeFailure));

        let skipped = ItemState::Analyzed
            .transition(ItemEvent::Fail(SkipReason::NotFound))
            .unwrap();
        assert!(matches!(skipped, ItemState::Skipped(SkipReason::NotFound)));
    }

    #[test]
    fn test_archive_before_finalize_is_invalid() {
        let err = ItemState::Analyzed
            .transition(ItemEvent::Archive)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_terminal_states_reject_events() {
        assert!(ItemState::Archived
            .transition(ItemEvent::Fail(SkipReason::NotFound))
            .is_err());
        assert!(ItemState::Skipped(SkipReason::NotFound)
            .transition(ItemEvent::Analyze)
            .is_err());
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            SkipReason::from_error(&CropError::DegenerateCrop),
            Some(SkipReason::DegenerateCrop)
        );
        assert_eq!(
            SkipReason::from_error(&CropError::ArchiveMisuse("x".into())),
            None
        );
    }
}
