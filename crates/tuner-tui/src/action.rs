//! Action enum: every user intent the App dispatches.

use tuner_core::protocol::Command;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Tuner,
    Spectrum,
    Cards,
    Narrative,
    ChoicePrompt,
    HelpOverlay,
}

impl ComponentId {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tuner => "TUNER",
            Self::Spectrum => "SPECTRUM",
            Self::Cards => "CARDS",
            Self::Narrative => "LOVE RADIO",
            Self::ChoicePrompt => "CHOICE",
            Self::HelpOverlay => "HELP",
        }
    }
}

/// All actions that can flow through the front-end.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Forward a command to the core loop.
    Send(Command),

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    SelectUp,
    SelectDown,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,
    /// Freeze or resume the spectrum animation.
    ToggleSpectrumFreeze,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
