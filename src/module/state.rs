//! Module lifecycle.

use std::fmt;

/// Uninitialized → Ready → (Updating → Rendering) → Ready, terminal Disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Uninitialized,
    Ready,
    Updating,
    Rendering,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Initialize,
    BeginUpdate,
    BeginRender,
    FinishRender,
    /// A failed update or render returns the module to Ready
    Abort,
    Dispose,
}

impl Transition {
    pub fn verb(self) -> &'static str {
        match self {
            Transition::Initialize => "initialize",
            Transition::BeginUpdate => "update",
            Transition::BeginRender => "render",
            Transition::FinishRender => "finish rendering",
            Transition::Abort => "abort the tick",
            Transition::Dispose => "dispose",
        }
    }
}

impl ModuleState {
    /// Target state, or `None` if the transition is not allowed from here
    pub fn apply(self, transition: Transition) -> Option<ModuleState> {
        use ModuleState::*;
        match (self, transition) {
            (Uninitialized, Transition::Initialize) => Some(Ready),
            (Ready, Transition::BeginUpdate) => Some(Updating),
            (Updating, Transition::BeginRender) => Some(Rendering),
            (Rendering, Transition::FinishRender) => Some(Ready),
            (Updating | Rendering, Transition::Abort) => Some(Ready),
            (_, Transition::Dispose) => Some(Disposed),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleState::Uninitialized => "uninitialized",
            ModuleState::Ready => "ready",
            ModuleState::Updating => "updating",
            ModuleState::Rendering => "rendering",
            ModuleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_cycle_returns_to_ready() {
        let state = ModuleState::Uninitialized
            .apply(Transition::Initialize)
            .and_then(|s| s.apply(Transition::BeginUpdate))
            .and_then(|s| s.apply(Transition::BeginRender))
            .and_then(|s| s.apply(Transition::FinishRender));
        assert_eq!(state, Some(ModuleState::Ready));
    }

    #[test]
    fn test_render_requires_update() {
        assert_eq!(ModuleState::Ready.apply(Transition::BeginRender), None);
        assert_eq!(ModuleState::Uninitialized.apply(Transition::BeginUpdate), None);
    }

    #[test]
    fn test_abort_returns_to_ready_mid_tick_only() {
        assert_eq!(ModuleState::Updating.apply(Transition::Abort), Some(ModuleState::Ready));
        assert_eq!(ModuleState::Rendering.apply(Transition::Abort), Some(ModuleState::Ready));
        assert_eq!(ModuleState::Ready.apply(Transition::Abort), None);
        assert_eq!(ModuleState::Uninitialized.apply(Transition::Abort), None);
    }

    #[test]
    fn test_disposed_is_terminal() {
        for t in [
            Transition::Initialize,
            Transition::BeginUpdate,
            Transition::BeginRender,
            Transition::FinishRender,
            Transition::Abort,
        ] {
            assert_eq!(ModuleState::Disposed.apply(t), None);
        }
        assert_eq!(
            ModuleState::Disposed.apply(Transition::Dispose),
            Some(ModuleState::Disposed)
        );
    }

    #[test]
    fn test_dispose_from_any_state() {
        for s in [
            ModuleState::Uninitialized,
            ModuleState::Ready,
            ModuleState::Updating,
            ModuleState::Rendering,
        ] {
            assert_eq!(s.apply(Transition::Dispose), Some(ModuleState::Disposed));
        }
    }
}
