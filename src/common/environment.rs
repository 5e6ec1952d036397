use std::collections::HashMap;

/// Handle to a frame in an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(pub usize);

#[derive(Debug)]
struct Frame<T> {
    bindings: HashMap<String, T>,
    parent: Option<EnvId>,
}

/// Stack of name -> info frames. Each frame points at its lexical parent, so
/// lookups follow the parent chain from the active frame rather than the push
/// order. The info payload is a runtime value for the interpreter and a type
/// for the type checker.
///
/// Frames are pushed and popped in strict LIFO order in time, even though the
/// active frame may be switched to a declaration's defining frame in between.
#[derive(Debug)]
pub struct Environment<T> {
    frames: Vec<Frame<T>>,
    active: Option<EnvId>,
}

impl<T> Default for Environment<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Environment<T> {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            active: None,
        }
    }

    pub fn active_env(&self) -> Option<EnvId> {
        self.active
    }

    pub fn set_active_env(&mut self, env: Option<EnvId>) {
        self.active = env;
    }

    /// Pushes an empty frame whose parent is the active frame and activates it.
    pub fn push_environment(&mut self) -> EnvId {
        let id = EnvId(self.frames.len());
        self.frames.push(Frame {
            bindings: HashMap::new(),
            parent: self.active,
        });
        self.active = Some(id);
        id
    }

    /// Removes the active frame and activates its parent.
    pub fn pop_environment(&mut self) {
        let Some(id) = self.active else {
            return;
        };

        debug_assert_eq!(id.0 + 1, self.frames.len(), "popped frame is not the newest");

        self.active = self.frames[id.0].parent;
        self.frames.truncate(id.0);
    }

    fn frame_of(&self, name: &str) -> Option<EnvId> {
        let mut current = self.active;
        while let Some(id) = current {
            let frame = &self.frames[id.0];
            if frame.bindings.contains_key(name) {
                return Some(id);
            }
            current = frame.parent;
        }

        None
    }

    /// Binds `name` in the active frame, shadowing any outer binding. With no
    /// active frame a root frame is opened first.
    pub fn declare(&mut self, name: &str, info: T) {
        let id = match self.active {
            Some(id) => id,
            None => self.push_environment(),
        };

        self.frames[id.0].bindings.insert(name.to_string(), info);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        let id = self.frame_of(name)?;
        self.frames[id.0].bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let id = self.frame_of(name)?;
        self.frames[id.0].bindings.get_mut(name)
    }

    /// Overwrites the nearest visible binding of `name`. Returns false when
    /// no such binding exists.
    pub fn assign(&mut self, name: &str, info: T) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = info;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_to_outer_frames() {
        let mut env = Environment::new();
        env.push_environment();
        env.declare("x", 1);
        env.push_environment();
        env.declare("y", 2);

        assert_eq!(env.get("x"), Some(&1));
        assert_eq!(env.get("y"), Some(&2));

        env.pop_environment();
        assert_eq!(env.get("y"), None);
        assert_eq!(env.get("x"), Some(&1));
    }

    #[test]
    fn test_shadowing_and_assign() {
        let mut env = Environment::new();
        env.push_environment();
        env.declare("x", 1);
        env.push_environment();
        env.declare("x", 10);

        assert!(env.assign("x", 11));
        assert_eq!(env.get("x"), Some(&11));

        env.pop_environment();
        assert_eq!(env.get("x"), Some(&1));
        assert!(!env.assign("missing", 0));
    }

    #[test]
    fn test_frame_pushed_from_defining_env_skips_caller_frames() {
        let mut env = Environment::new();
        let global = env.push_environment();
        env.declare("g", 0);

        // caller frame with a local that the callee must not see
        let caller = env.push_environment();
        env.declare("local", 1);

        env.set_active_env(Some(global));
        env.push_environment();
        env.declare("param", 2);

        assert_eq!(env.get("g"), Some(&0));
        assert_eq!(env.get("param"), Some(&2));
        assert_eq!(env.get("local"), None);

        env.pop_environment();
        assert_eq!(env.active_env(), Some(global));
        assert_eq!(env.get("local"), None);

        env.set_active_env(Some(caller));
        assert_eq!(env.get("local"), Some(&1));
    }

    #[test]
    fn test_declare_without_frame_opens_root() {
        let mut env = Environment::new();
        env.declare("x", 1);

        let root = env.active_env();
        assert_eq!(root, Some(EnvId(0)));
        assert_eq!(env.get("x"), Some(&1));

        env.pop_environment();
        assert_eq!(env.active_env(), None);
        assert_eq!(env.get("x"), None);
    }
}
