//! Actions control the traversal of a statement tree.
use fg_ir::Stmt;
use fg_utils::FgResult;

pub type VisResult = FgResult<Action>;

/// Result of visiting one statement node.
pub enum Action {
    /// Continue traversal.
    Continue,
    /// Globally abort traversal.
    Stop,
    /// Skip this node's children but continue with siblings.
    SkipChildren,
    /// Replace the current node. If returned from a `start_*` hook, the
    /// replacement's children are not visited.
    Change(Box<Stmt>),
}

impl Action {
    pub(super) fn and_then<F>(self, mut next: F) -> VisResult
    where
        F: FnMut() -> VisResult,
    {
        match self {
            Action::Continue => next(),
            Action::Change(_) | Action::Stop | Action::SkipChildren => Ok(self),
        }
    }

    pub fn change(stmt: Stmt) -> Self {
        Action::Change(Box::new(stmt))
    }

    pub(super) fn apply_change(self, node: &mut Stmt) -> Action {
        match self {
            Action::Change(s) => {
                *node = *s;
                Action::Continue
            }
            action => action,
        }
    }

    pub(super) fn pop(self) -> Self {
        match self {
            Action::SkipChildren => Action::Continue,
            x => x,
        }
    }
}
