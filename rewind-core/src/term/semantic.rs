use super::osc::OscEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShellPhase {
    #[default]
    Unknown,
    DrawingPrompt,
    AtPrompt,
    Running,
}

/// Prompt vs running, as reported by the shell's OSC 133 markers.
#[derive(Debug, Clone, Default)]
pub struct ShellState {
    pub phase: ShellPhase,
    pub last_exit: Option<i32>,
    /// At least one OSC 133 marker has been seen on this stream.
    pub integrated: bool,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, ev: &OscEvent) {
        match ev {
            OscEvent::PromptStart => self.phase = ShellPhase::DrawingPrompt,
            OscEvent::PromptEnd => self.phase = ShellPhase::AtPrompt,
            OscEvent::CommandExecuted => self.phase = ShellPhase::Running,
            OscEvent::CommandFinished { exit_code } => {
                self.last_exit = *exit_code;
            }
            OscEvent::Other(_) => return,
        }
        self.integrated = true;
    }

    /// Input was sent; whatever the markers said before no longer holds.
    pub fn command_submitted(&mut self) {
        self.phase = ShellPhase::Running;
        self.last_exit = None;
    }

    pub fn at_prompt(&self) -> bool {
        self.phase == ShellPhase::AtPrompt
    }
}
