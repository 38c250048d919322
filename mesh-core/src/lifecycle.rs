//! Lifecycle controller state: Created -> Running <-> Stopped -> Destroyed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopped,
    Destroyed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Tracks the controller state and rejects transitions the lifecycle does not allow.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Created,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn transition(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
        use LifecycleState::*;
        let allowed = matches!(
            (self.state, to),
            (Created, Running)
                | (Running, Stopped)
                | (Stopped, Running)
                | (Created, Destroyed)
                | (Stopped, Destroyed)
        );
        if !allowed {
            return Err(LifecycleError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn full_cycle() {
        let mut l = Lifecycle::new();
        assert_eq!(l.state(), Created);
        l.transition(Running).unwrap();
        l.transition(Stopped).unwrap();
        l.transition(Running).unwrap();
        l.transition(Stopped).unwrap();
        l.transition(Destroyed).unwrap();
        assert_eq!(l.state(), Destroyed);
    }

    #[test]
    fn destroy_requires_stopped() {
        let mut l = Lifecycle::new();
        l.transition(Running).unwrap();
        let err = l.transition(Destroyed).unwrap_err();
        assert_eq!(err.from, Running);
        assert_eq!(err.to.to_string(), "destroyed");
        assert_eq!(l.state(), Running);
    }

    #[test]
    fn destroyed_is_terminal() {
        let mut l = Lifecycle::new();
        l.transition(Destroyed).unwrap();
        assert!(l.transition(Running).is_err());
        assert!(l.transition(Stopped).is_err());
    }

    #[test]
    fn double_stop_rejected() {
        let mut l = Lifecycle::new();
        l.transition(Running).unwrap();
        l.transition(Stopped).unwrap();
        assert!(l.transition(Stopped).is_err());
    }
}
